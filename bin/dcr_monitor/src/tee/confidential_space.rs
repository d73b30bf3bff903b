use std::collections::BTreeMap;

use async_trait::async_trait;
use ntex::time::Millis;

use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_stubs::config::GcpConfig;
use dcr_stubs::instance::InstanceStatus;

use crate::models::{ComputeInstance, ComputeOperation};
use crate::utils::gcp::{self, GcpAuth};
use crate::utils::http_client::RestClient;
use crate::utils::naming;

use super::{operator_service_account, TeeProvider, WorkloadIdentity};

const MACHINE_TYPE: &str = "n2d-standard-2";
const DISK_SIZE_GB: u32 = 50;
const IMAGE_PROJECT: &str = "projects/confidential-space-images/global/images";
const IMAGE: &str = "confidential-space-240200";
const DEBUG_IMAGE: &str = "confidential-space-debug-240200";
/// The operation wait endpoint holds requests up to 2 minutes
const API_TIMEOUT_SECS: u32 = 150;

/// Tee backend running job images in GCP Confidential Space instances
#[derive(Debug)]
pub struct ConfidentialSpace {
  gcp: GcpConfig,
  auth: GcpAuth,
  compute: RestClient,
  identity: WorkloadIdentity,
}

impl ConfidentialSpace {
  pub fn new(gcp: &GcpConfig, auth: GcpAuth) -> Self {
    let timeout = Millis::from_secs(API_TIMEOUT_SECS);
    let compute = RestClient::new("Compute", gcp::COMPUTE_URL, timeout);
    let iam = RestClient::new("IAM", gcp::IAM_URL, timeout);
    Self::with_clients(gcp, auth, compute, iam)
  }

  pub fn with_clients(
    gcp: &GcpConfig,
    auth: GcpAuth,
    compute: RestClient,
    iam: RestClient,
  ) -> Self {
    Self {
      gcp: gcp.clone(),
      auth,
      compute,
      identity: WorkloadIdentity::new(gcp, iam),
    }
  }

  async fn authorize(&self) -> IoResult<()> {
    let token = self.auth.token().await?;
    self.compute.set_bearer(&token);
    self.identity.set_bearer(&token);
    Ok(())
  }

  fn instances_path(&self) -> String {
    format!(
      "/projects/{}/zones/{}/instances",
      self.gcp.project, self.gcp.zone
    )
  }

  /// ## Gen instance
  ///
  /// Compute engine instance running `image` in confidential space.
  /// The launcher reads the image and its environment from the `tee-*`
  /// metadata.
  ///
  pub fn gen_instance(
    &self,
    name: &str,
    image: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> serde_json::Value {
    let GcpConfig {
      project,
      region,
      zone,
      env,
      debug,
    } = &self.gcp;
    let source_image = if *debug { DEBUG_IMAGE } else { IMAGE };
    let mut items = vec![
      ("tee-container-log-redirect".to_owned(), debug.to_string()),
      ("tee-image-reference".to_owned(), image.to_owned()),
      ("tee-env-EXECUTION_STAGE".to_owned(), "2".to_owned()),
      ("tee-env-DEPLOYMENT_ENV".to_owned(), env.clone()),
      ("tee-env-PROJECT_ID".to_owned(), project.clone()),
      ("tee-env-KEY_LOCATION".to_owned(), region.clone()),
    ];
    items.extend(
      extra_envs
        .iter()
        .map(|(key, value)| (format!("tee-env-{key}"), value.clone())),
    );
    let metadata = items
      .into_iter()
      .map(|(key, value)| serde_json::json!({ "key": key, "value": value }))
      .collect::<Vec<_>>();
    serde_json::json!({
      "name": name,
      "machineType": format!("zones/{zone}/machineTypes/{MACHINE_TYPE}"),
      "confidentialInstanceConfig": {
        "enableConfidentialCompute": true,
      },
      "shieldedInstanceConfig": {
        "enableSecureBoot": true,
      },
      "scheduling": {
        "onHostMaintenance": "TERMINATE",
      },
      "canIpForward": false,
      "tags": {
        "items": ["tee-instance"],
      },
      "metadata": {
        "items": metadata,
      },
      "serviceAccounts": [{
        "email": operator_service_account(&self.gcp),
        "scopes": ["https://www.googleapis.com/auth/cloud-platform"],
      }],
      "disks": [{
        "boot": true,
        "autoDelete": true,
        "diskSizeGb": DISK_SIZE_GB.to_string(),
        "initializeParams": {
          "sourceImage": format!("{IMAGE_PROJECT}/{source_image}"),
        },
      }],
      "networkInterfaces": [{
        "network": format!(
          "{}/projects/{project}/global/networks/dcr-{env}-network",
          gcp::COMPUTE_URL
        ),
        "subnetwork": format!(
          "{}/projects/{project}/regions/{region}/subnetworks/dcr-{env}-subnetwork",
          gcp::COMPUTE_URL
        ),
        "accessConfigs": [{
          "name": "external-nat",
          "type": "ONE_TO_ONE_NAT",
        }],
      }],
    })
  }

  /// Wait for a zonal operation to be done and surface its errors
  async fn wait_operation(&self, mut op: ComputeOperation) -> IoResult<()> {
    while !op.is_done() {
      let path = format!(
        "/projects/{}/zones/{}/operations/{}/wait",
        self.gcp.project, self.gcp.zone, op.name
      );
      let res = self
        .compute
        .send_post(&path, None::<&serde_json::Value>)
        .await
        .map_err(|err| err.map_err_context(|| "Compute operation"))?;
      op = self.compute.res_json(res).await?;
    }
    match op.error_message() {
      Some(msg) => Err(IoError::interrupted("Compute operation", msg)),
      None => Ok(()),
    }
  }

  async fn insert_instance(
    &self,
    name: &str,
    image: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> IoResult<()> {
    let body = self.gen_instance(name, image, extra_envs);
    let res = self
      .compute
      .send_post(&self.instances_path(), Some(&body))
      .await
      .map_err(|err| err.map_err_context(|| "Confidential space"))?;
    let op: ComputeOperation = self.compute.res_json(res).await?;
    self.wait_operation(op).await
  }

  async fn delete_instance(&self, name: &str) -> IoResult<()> {
    let path = format!("{}/{name}", self.instances_path());
    let res = match self
      .compute
      .send_delete(&path, None::<&serde_json::Value>)
      .await
    {
      Ok(res) => res,
      Err(err) if err.is_not_found() => {
        log::debug!("confidential_space: instance {name} already deleted");
        return Ok(());
      }
      Err(err) => return Err(err.map_err_context(|| "Confidential space")),
    };
    let op: ComputeOperation = self.compute.res_json(res).await?;
    self.wait_operation(op).await?;
    log::info!("confidential_space: instance {name} deleted");
    Ok(())
  }
}

#[async_trait(?Send)]
impl TeeProvider for ConfidentialSpace {
  async fn launch_instance(
    &self,
    name: &str,
    image: &str,
    digest: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> IoResult<()> {
    self.authorize().await?;
    let provider_id = naming::wip_provider_id(name);
    self.identity.create_provider(&provider_id, digest).await?;
    if let Err(err) = self.insert_instance(name, image, extra_envs).await {
      log::error!("confidential_space: instance {name} not created: {err}");
      if let Err(err) = self.identity.delete_provider(&provider_id).await {
        log::warn!(
          "confidential_space: rollback of provider {provider_id}: {err}"
        );
      }
      return Err(err);
    }
    log::info!("confidential_space: instance {name} running {image}");
    Ok(())
  }

  async fn get_instance_status(&self, name: &str) -> IoResult<InstanceStatus> {
    self.authorize().await?;
    let path = format!("{}/{name}", self.instances_path());
    let res = self
      .compute
      .send_get(&path)
      .await
      .map_err(|err| err.map_err_context(|| "Confidential space"))?;
    let instance: ComputeInstance = self.compute.res_json(res).await?;
    Ok(instance.status)
  }

  async fn clean_up_instance(&self, name: &str) -> IoResult<()> {
    self.authorize().await?;
    self
      .identity
      .delete_provider(&naming::wip_provider_id(name))
      .await?;
    self.delete_instance(name).await
  }
}
