use async_trait::async_trait;

use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_stubs::job::Job;
use dcr_stubs::image::BuildStatus;
use dcr_stubs::config::MinioConfig;

use crate::utils::k8s::{self, K8sClient};
use crate::utils::{dockerfile, naming};

use super::{parse_image_info, ImageBuilder};

const KANIKO_IMAGE: &str = "gcr.io/kaniko-project/executor:latest";
const KANIKO_MEMORY: &str = "6000M";
/// Finished build jobs are garbage collected after a day
const TTL_SECONDS_AFTER_FINISHED: u32 = 24 * 3600;

/// Image builder running kaniko as a kubernetes batch job
#[derive(Clone, Debug)]
pub struct Kaniko {
  k8s: K8sClient,
  minio: Option<MinioConfig>,
}

impl Kaniko {
  pub fn new(k8s: K8sClient, minio: Option<MinioConfig>) -> Self {
    Self { k8s, minio }
  }

  /// Arguments of the kaniko executor for a job
  pub fn gen_args(
    job: &Job,
    base_image: &str,
    destination: &str,
  ) -> Vec<String> {
    let mut args = vec![
      "--dockerfile=Dockerfile".to_owned(),
      "--reproducible".to_owned(),
      "--compressed-caching=false".to_owned(),
      "--cache=true".to_owned(),
      "--cache-ttl=72h".to_owned(),
      format!("--context={}", job.build_context_path),
      format!("--destination={destination}"),
      format!("--build-arg=OUTPUT_SIGNED_URL={}", job.output_put_signed_url),
      format!("--build-arg=JUPYTER_FILENAME={}", job.jupyter_file_name),
      format!("--build-arg=USER_WORKSPACE={}-workspace", job.creator),
      format!("--build-arg=BASE_IMAGE={base_image}"),
      format!(
        "--build-arg=CUSTOMTOKEN_SIGNED_URL={}",
        job.custom_token_put_signed_url
      ),
    ];
    if let Some(keys) = dockerfile::allow_env_override(&job.allow_env_keys()) {
      args.push(format!(
        "--label={}={keys}",
        dockerfile::ALLOW_ENV_OVERRIDE_LABEL
      ));
    }
    args
  }

  fn gen_env(&self) -> Vec<serde_json::Value> {
    let Some(minio) = &self.minio else {
      return Vec::new();
    };
    [
      ("AWS_ACCESS_KEY_ID", minio.access_key_id.clone()),
      ("AWS_SECRET_ACCESS_KEY", minio.secret_access_key.clone()),
      ("S3_ENDPOINT", format!("http://{}", minio.endpoint)),
      ("AWS_REGION", "us-east-1".to_owned()),
      ("S3_FORCE_PATH_STYLE", "true".to_owned()),
    ]
    .into_iter()
    .map(|(name, value)| serde_json::json!({ "name": name, "value": value }))
    .collect()
  }

  /// Kubernetes batch job building the image of a job
  pub fn gen_manifest(
    &self,
    job: &Job,
    base_image: &str,
    destination: &str,
  ) -> serde_json::Value {
    serde_json::json!({
      "apiVersion": "batch/v1",
      "kind": "Job",
      "metadata": {
        "name": naming::build_job_name(&job.uuid),
        "namespace": self.k8s.namespace,
      },
      "spec": {
        "ttlSecondsAfterFinished": TTL_SECONDS_AFTER_FINISHED,
        "template": {
          "spec": {
            "serviceAccountName": k8s::POD_SERVICE_ACCOUNT,
            "restartPolicy": "Never",
            "containers": [{
              "name": "kaniko",
              "image": KANIKO_IMAGE,
              "args": Self::gen_args(job, base_image, destination),
              "env": self.gen_env(),
              "resources": {
                "requests": { "memory": KANIKO_MEMORY },
              },
            }],
          },
        },
      },
    })
  }

  /// Read the digest pushed by the first pod of the build that reports one
  async fn get_image_info(
    &self,
    job_name: &str,
  ) -> IoResult<dcr_stubs::image::ImageInfo> {
    let pods = self
      .k8s
      .list_job_pods(job_name)
      .await
      .map_err(|err| err.map_err_context(|| "Kaniko"))?;
    log::debug!("kaniko: {job_name} has {} pod(s)", pods.items.len());
    let mut last_err =
      IoError::not_found("Kaniko", format!("no pod found for {job_name}"));
    for pod in pods.items {
      let Some(pod_name) = pod.metadata.name else {
        continue;
      };
      let logs = self
        .k8s
        .read_pod_logs(&pod_name)
        .await
        .map_err(|err| err.map_err_context(|| "Kaniko"))?;
      match parse_image_info(&logs) {
        Ok(info) => return Ok(info),
        Err(err) => last_err = err,
      }
    }
    Err(last_err)
  }
}

#[async_trait(?Send)]
impl ImageBuilder for Kaniko {
  async fn build_image(
    &self,
    job: &Job,
    base_image: &str,
    destination: &str,
  ) -> IoResult<()> {
    let manifest = self.gen_manifest(job, base_image, destination);
    self
      .k8s
      .create_job(&manifest)
      .await
      .map_err(|err| err.map_err_context(|| "Kaniko"))?;
    log::info!(
      "kaniko: job {} building {destination}",
      naming::build_job_name(&job.uuid)
    );
    Ok(())
  }

  async fn check_status(&self, uuid: &str) -> IoResult<BuildStatus> {
    let job_name = naming::build_job_name(uuid);
    let k8s_job = self
      .k8s
      .get_job(&job_name)
      .await
      .map_err(|err| err.map_err_context(|| "Kaniko"))?;
    let Some(condition) = k8s_job.conditions().first() else {
      log::debug!("kaniko: {job_name} is still running");
      return Ok(BuildStatus::Running);
    };
    log::debug!("kaniko: {job_name} condition {}", condition.kind);
    match condition.kind.as_str() {
      "Complete" | "SuccessCriteriaMet" => {
        let info = self.get_image_info(&job_name).await?;
        log::info!("kaniko: {job_name} pushed {}", info.image);
        if let Err(err) = self.k8s.delete_job(&job_name).await {
          log::warn!("kaniko: unable to delete {job_name}: {err}");
        }
        Ok(BuildStatus::Succeeded(info))
      }
      "Failed" | "FailureTarget" => {
        log::warn!("kaniko: {job_name} failed");
        Ok(BuildStatus::Failed)
      }
      _ => Ok(BuildStatus::Running),
    }
  }
}
