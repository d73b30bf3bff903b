use std::collections::BTreeMap;

use async_trait::async_trait;

use dcr_error::io::IoResult;
use dcr_stubs::instance::InstanceStatus;

mod mock;
pub use mock::*;

mod workload_identity;
pub use workload_identity::*;

mod confidential_space;
pub use confidential_space::*;

/// Backend provisioning the attested instances running job images
#[async_trait(?Send)]
pub trait TeeProvider {
  /// Start `image` pinned at `digest` as the instance `name`.
  /// `extra_envs` are exposed to the workload at runtime.
  async fn launch_instance(
    &self,
    name: &str,
    image: &str,
    digest: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> IoResult<()>;

  /// Lifecycle state of the instance `name`, `NotFound` is an error
  async fn get_instance_status(&self, name: &str) -> IoResult<InstanceStatus>;

  /// Delete the instance `name` and what was created for it.
  /// Deleting an instance that does not exist succeeds.
  async fn clean_up_instance(&self, name: &str) -> IoResult<()>;
}

/// Tee backend selected at startup
pub enum TeeBackend {
  ConfidentialSpace(ConfidentialSpace),
  Mock(MockTee),
}

#[async_trait(?Send)]
impl TeeProvider for TeeBackend {
  async fn launch_instance(
    &self,
    name: &str,
    image: &str,
    digest: &str,
    extra_envs: &BTreeMap<String, String>,
  ) -> IoResult<()> {
    match self {
      TeeBackend::ConfidentialSpace(tee) => {
        tee.launch_instance(name, image, digest, extra_envs).await
      }
      TeeBackend::Mock(tee) => {
        tee.launch_instance(name, image, digest, extra_envs).await
      }
    }
  }

  async fn get_instance_status(&self, name: &str) -> IoResult<InstanceStatus> {
    match self {
      TeeBackend::ConfidentialSpace(tee) => tee.get_instance_status(name).await,
      TeeBackend::Mock(tee) => tee.get_instance_status(name).await,
    }
  }

  async fn clean_up_instance(&self, name: &str) -> IoResult<()> {
    match self {
      TeeBackend::ConfidentialSpace(tee) => tee.clean_up_instance(name).await,
      TeeBackend::Mock(tee) => tee.clean_up_instance(name).await,
    }
  }
}
