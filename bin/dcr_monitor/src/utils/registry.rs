use dcr_stubs::config::{MonitorConfig, RegistryKind};

const MINIKUBE_REGISTRY: &str = "registry.kube-system.svc.cluster.local";

/// Registry the builder pushes job images to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
  kind: RegistryKind,
  url: String,
}

impl Registry {
  pub fn new(config: &MonitorConfig) -> Self {
    let url = match config.registry {
      RegistryKind::Gcp => format!(
        "us-docker.pkg.dev/{}/dcr-{}-user-images",
        config.gcp.project, config.gcp.env
      ),
      RegistryKind::Minikube => MINIKUBE_REGISTRY.to_owned(),
    };
    Self {
      kind: config.registry,
      url,
    }
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  /// Image every job image is built on
  pub fn base_image(&self) -> String {
    match self.kind {
      RegistryKind::Gcp => format!("{}/manatee-executor-base:latest", self.url),
      RegistryKind::Minikube => format!("{}/executor:latest", self.url),
    }
  }

  /// Tag the image of a job is pushed to
  pub fn destination(&self, creator: &str, uuid: &str) -> String {
    format!("{}/{creator}-{uuid}:latest", self.url)
  }
}
