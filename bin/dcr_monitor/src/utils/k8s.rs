use ntex::http;
use ntex::time::Millis;
use openssl::ssl::{SslConnector, SslMethod};

use dcr_error::io::{FromIo, IoError, IoResult};
use dcr_error::http_client::HttpClientResult;

use crate::models::{K8sJob, PodList};

use super::http_client::RestClient;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
/// Service account of the pods we create
pub const POD_SERVICE_ACCOUNT: &str = "dcr-k8s-pod-sa";

/// Namespace of the pod we are running in, when running in a cluster
pub fn read_service_account_namespace() -> Option<String> {
  std::fs::read_to_string(format!("{SERVICE_ACCOUNT_DIR}/namespace"))
    .ok()
    .map(|namespace| namespace.trim().to_owned())
    .filter(|namespace| !namespace.is_empty())
}

fn read_service_account_token() -> IoResult<String> {
  let token = std::fs::read_to_string(format!("{SERVICE_ACCOUNT_DIR}/token"))
    .map_err(|err| err.map_err_context(|| "Kubernetes token"))?;
  Ok(token.trim().to_owned())
}

/// Tls connector trusting the cluster ca, speaking http/1.1 only
fn tls_connector(ca_file: &str) -> IoResult<SslConnector> {
  let mut ssl = SslConnector::builder(SslMethod::tls()).map_err(|err| {
    std::io::Error::from(err).map_err_context(|| "Kubernetes tls")
  })?;
  ssl.set_ca_file(ca_file).map_err(|err| {
    std::io::Error::from(err).map_err_context(|| "Kubernetes ca")
  })?;
  ssl.set_alpn_protos(b"\x08http/1.1").map_err(|err| {
    std::io::Error::from(err).map_err_context(|| "Kubernetes alpn")
  })?;
  Ok(ssl.build())
}

/// Client of the kubernetes api server we are running under
#[derive(Clone, Debug)]
pub struct K8sClient {
  pub namespace: String,
  rest: RestClient,
}

impl K8sClient {
  /// Connect using the service account mounted in the pod
  pub fn in_cluster(namespace: &str) -> IoResult<Self> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
      IoError::not_found("Kubernetes", "KUBERNETES_SERVICE_HOST is not set")
    })?;
    let port =
      std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or("443".to_owned());
    let ssl = tls_connector(&format!("{SERVICE_ACCOUNT_DIR}/ca.crt"))?;
    let connector = http::client::Connector::default()
      .openssl(ssl)
      .timeout(Millis::from_secs(10))
      .finish();
    let client = http::client::Client::build()
      .connector(connector)
      .timeout(Millis::from_secs(60))
      .finish();
    let host = if host.contains(':') {
      format!("[{host}]")
    } else {
      host
    };
    let url = format!("https://{host}:{port}");
    Ok(Self::with_rest(
      namespace,
      RestClient::with_client("Kubernetes", &url, client),
    ))
  }

  pub fn with_rest(namespace: &str, rest: RestClient) -> Self {
    Self {
      namespace: namespace.to_owned(),
      rest,
    }
  }

  /// Projected tokens are rotated by the kubelet, read it back before each call
  fn refresh_token(&self) {
    match read_service_account_token() {
      Ok(token) => self.rest.set_bearer(&token),
      Err(err) => log::warn!("kubernetes: {err}"),
    }
  }

  fn jobs_path(&self) -> String {
    format!("/apis/batch/v1/namespaces/{}/jobs", self.namespace)
  }

  pub async fn create_job(
    &self,
    manifest: &serde_json::Value,
  ) -> HttpClientResult<K8sJob> {
    self.refresh_token();
    let res = self.rest.send_post(&self.jobs_path(), Some(manifest)).await?;
    self.rest.res_json(res).await
  }

  pub async fn get_job(&self, name: &str) -> HttpClientResult<K8sJob> {
    self.refresh_token();
    let path = format!("{}/{name}", self.jobs_path());
    let res = self.rest.send_get(&path).await?;
    self.rest.res_json(res).await
  }

  /// Delete a job and, before the job itself, its pods
  pub async fn delete_job(&self, name: &str) -> HttpClientResult<()> {
    self.refresh_token();
    let path = format!("{}/{name}", self.jobs_path());
    let options = serde_json::json!({
      "apiVersion": "v1",
      "kind": "DeleteOptions",
      "propagationPolicy": "Foreground",
    });
    self.rest.send_delete(&path, Some(&options)).await?;
    Ok(())
  }

  /// Pods created by the job `job_name`
  pub async fn list_job_pods(
    &self,
    job_name: &str,
  ) -> HttpClientResult<PodList> {
    self.refresh_token();
    let path = format!(
      "/api/v1/namespaces/{}/pods?labelSelector=job-name%3D{job_name}",
      self.namespace
    );
    let res = self.rest.send_get(&path).await?;
    self.rest.res_json(res).await
  }

  pub async fn read_pod_logs(
    &self,
    pod_name: &str,
  ) -> HttpClientResult<String> {
    self.refresh_token();
    let path =
      format!("/api/v1/namespaces/{}/pods/{pod_name}/log", self.namespace);
    let res = self.rest.send_get(&path).await?;
    self.rest.res_text(res).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_ca_is_an_error() {
    let Err(err) = tls_connector("/nonexistent/ca.crt") else {
      panic!("a missing ca file must not build a connector");
    };
    assert!(err.to_string().contains("Kubernetes ca"));
  }

  #[test]
  fn outside_cluster_is_an_error() {
    if std::env::var("KUBERNETES_SERVICE_HOST").is_ok() {
      return;
    }
    let err = K8sClient::in_cluster("dcr").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
  }
}
