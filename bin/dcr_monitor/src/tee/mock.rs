use std::collections::BTreeMap;

use async_trait::async_trait;

use dcr_error::io::{FromIo, IoResult};
use dcr_stubs::instance::InstanceStatus;

use crate::models::K8sJob;
use crate::utils::k8s::{self, K8sClient};

use super::TeeProvider;

const LOCAL_REGISTRY: &str = "localhost:5000";
/// Finished stand-in instances are garbage collected after 3 hours
const TTL_SECONDS_AFTER_FINISHED: u32 = 3 * 3600;

/// Tee backend running the image as a plain kubernetes job.
/// Nothing is attested, it is meant for local clusters and tests.
#[derive(Clone, Debug)]
pub struct MockTee {
  k8s: K8sClient,
}

/// Pull the image from the registry exposed on the node
fn local_image(image: &str) -> String {
  match image.split_once('/') {
    Some((_, path)) => format!("{LOCAL_REGISTRY}/{path}"),
    None => format!("{LOCAL_REGISTRY}/{image}"),
  }
}

/// `RUNNING` while a pod is active, `TERMINATED` once the job finished
pub fn job_instance_status(job: &K8sJob) -> InstanceStatus {
  if job.active() > 0 {
    return InstanceStatus::Running;
  }
  let finished = job.succeeded() > 0
    || job.failed() > 0
    || job.conditions().iter().any(|condition| {
      condition.status == "True"
        && (condition.kind == "Complete" || condition.kind == "Failed")
    });
  if finished {
    InstanceStatus::Terminated
  } else {
    InstanceStatus::Provisioning
  }
}

impl MockTee {
  pub fn new(k8s: K8sClient) -> Self {
    Self { k8s }
  }

  pub fn gen_manifest(
    &self,
    name: &str,
    image: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> serde_json::Value {
    let mut env = extra_envs
      .iter()
      .map(|(key, value)| serde_json::json!({ "name": key, "value": value }))
      .collect::<Vec<_>>();
    env.push(serde_json::json!({ "name": "TEE_BACKEND", "value": "MOCK" }));
    serde_json::json!({
      "apiVersion": "batch/v1",
      "kind": "Job",
      "metadata": {
        "name": name,
        "namespace": self.k8s.namespace,
      },
      "spec": {
        "ttlSecondsAfterFinished": TTL_SECONDS_AFTER_FINISHED,
        "template": {
          "spec": {
            "restartPolicy": "Never",
            "serviceAccountName": k8s::POD_SERVICE_ACCOUNT,
            "containers": [{
              "name": "tee",
              "image": local_image(image),
              "env": env,
            }],
          },
        },
      },
    })
  }
}

#[async_trait(?Send)]
impl TeeProvider for MockTee {
  async fn launch_instance(
    &self,
    name: &str,
    image: &str,
    _digest: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> IoResult<()> {
    let manifest = self.gen_manifest(name, image, extra_envs);
    self
      .k8s
      .create_job(&manifest)
      .await
      .map_err(|err| err.map_err_context(|| "Mock tee"))?;
    log::info!("mock_tee: instance {name} created");
    Ok(())
  }

  async fn get_instance_status(&self, name: &str) -> IoResult<InstanceStatus> {
    let job = self
      .k8s
      .get_job(name)
      .await
      .map_err(|err| err.map_err_context(|| "Mock tee"))?;
    Ok(job_instance_status(&job))
  }

  async fn clean_up_instance(&self, name: &str) -> IoResult<()> {
    match self.k8s.delete_job(name).await {
      Ok(()) => {
        log::info!("mock_tee: instance {name} deleted");
        Ok(())
      }
      Err(err) if err.is_not_found() => {
        log::debug!("mock_tee: instance {name} already deleted");
        Ok(())
      }
      Err(err) => Err(err.map_err_context(|| "Mock tee")),
    }
  }
}
