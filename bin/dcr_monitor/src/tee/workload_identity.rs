use dcr_error::io::{FromIo, IoResult};
use dcr_stubs::config::GcpConfig;

use crate::utils::http_client::RestClient;

const OIDC_ISSUER: &str = "https://confidentialcomputing.googleapis.com/";
const STS_AUDIENCE: &str = "https://sts.googleapis.com";

/// Service account the confidential space instances run as
pub fn operator_service_account(gcp: &GcpConfig) -> String {
  format!(
    "dcr-{}-cvm-sa@{}.iam.gserviceaccount.com",
    gcp.env, gcp.project
  )
}

/// ## Attribute condition
///
/// Only a confidential space instance running the image `digest` as the
/// operator service account may assert the identity of the provider.
/// Production images must additionally run a `STABLE` confidential space.
///
pub fn attribute_condition(gcp: &GcpConfig, digest: &str) -> String {
  let mut condition = format!(
    "assertion.submods.container.image_digest == '{digest}' \
     && '{}' in assertion.google_service_accounts \
     && assertion.swname == 'CONFIDENTIAL_SPACE'",
    operator_service_account(gcp)
  );
  if !gcp.debug {
    condition.push_str(
      " && 'STABLE' in assertion.submods.confidential_space.support_attributes",
    );
  }
  condition
}

/// Workload identity pool providers of the pool `dcr-<env>-pool`
#[derive(Clone, Debug)]
pub struct WorkloadIdentity {
  gcp: GcpConfig,
  rest: RestClient,
}

impl WorkloadIdentity {
  pub fn new(gcp: &GcpConfig, rest: RestClient) -> Self {
    Self {
      gcp: gcp.clone(),
      rest,
    }
  }

  pub fn set_bearer(&self, token: &str) {
    self.rest.set_bearer(token);
  }

  fn providers_path(&self) -> String {
    format!(
      "/projects/{}/locations/global/workloadIdentityPools/dcr-{}-pool/providers",
      self.gcp.project, self.gcp.env
    )
  }

  pub fn gen_provider(&self, id: &str, digest: &str) -> serde_json::Value {
    serde_json::json!({
      "displayName": id,
      "description": format!("attested image sha256:{digest}"),
      "attributeMapping": {
        "google.subject": "assertion.sub",
      },
      "attributeCondition": attribute_condition(&self.gcp, digest),
      "oidc": {
        "issuerUri": OIDC_ISSUER,
        "allowedAudiences": [STS_AUDIENCE],
      },
    })
  }

  /// Create the provider `id` trusting `digest`.
  /// A provider left over with the same id gets its condition replaced.
  pub async fn create_provider(&self, id: &str, digest: &str) -> IoResult<()> {
    let body = self.gen_provider(id, digest);
    let path = format!(
      "{}?workloadIdentityPoolProviderId={id}",
      self.providers_path()
    );
    match self.rest.send_post(&path, Some(&body)).await {
      Ok(_) => {
        log::info!("confidential_space: identity provider {id} created");
        Ok(())
      }
      Err(err) if err.is_conflict() => {
        log::info!(
          "confidential_space: identity provider {id} exists, updating"
        );
        let path = format!(
          "{}/{id}?updateMask=attributeCondition",
          self.providers_path()
        );
        self
          .rest
          .send_patch(&path, Some(&body))
          .await
          .map_err(|err| err.map_err_context(|| "Workload identity"))?;
        Ok(())
      }
      Err(err) => Err(err.map_err_context(|| "Workload identity")),
    }
  }

  /// Delete the provider `id`, succeeds when it does not exist
  pub async fn delete_provider(&self, id: &str) -> IoResult<()> {
    let path = format!("{}/{id}", self.providers_path());
    match self.rest.send_delete(&path, None::<&serde_json::Value>).await {
      Ok(_) => {
        log::info!("confidential_space: identity provider {id} deleted");
        Ok(())
      }
      Err(err) if err.is_not_found() => Ok(()),
      Err(err) => Err(err.map_err_context(|| "Workload identity")),
    }
  }
}

#[cfg(test)]
mod tests {
  use ntex::time::Millis;

  use super::*;

  fn gcp(debug: bool) -> GcpConfig {
    GcpConfig {
      project: "dcr-project".to_owned(),
      debug,
      ..Default::default()
    }
  }

  #[test]
  fn condition_pins_digest() {
    let condition = attribute_condition(&gcp(false), "abc123");
    assert_eq!(
      condition,
      "assertion.submods.container.image_digest == 'abc123' \
       && 'dcr-dev-cvm-sa@dcr-project.iam.gserviceaccount.com' in assertion.google_service_accounts \
       && assertion.swname == 'CONFIDENTIAL_SPACE' \
       && 'STABLE' in assertion.submods.confidential_space.support_attributes"
    );
  }

  #[test]
  fn debug_condition_is_relaxed() {
    let condition = attribute_condition(&gcp(true), "abc123");
    assert!(!condition.contains("STABLE"));
    assert!(condition.contains("image_digest == 'abc123'"));
  }

  #[ntex::test]
  async fn provider_body() {
    let rest = RestClient::new("IAM", "https://iam", Millis::from_secs(1));
    let wip = WorkloadIdentity::new(&gcp(false), rest);
    let body = wip.gen_provider("alice-1234", "abc123");
    assert_eq!(body["displayName"], "alice-1234");
    assert_eq!(body["attributeMapping"]["google.subject"], "assertion.sub");
    assert_eq!(body["oidc"]["issuerUri"], OIDC_ISSUER);
    assert_eq!(body["oidc"]["allowedAudiences"][0], STS_AUDIENCE);
    assert_eq!(
      wip.providers_path(),
      "/projects/dcr-project/locations/global/workloadIdentityPools/dcr-dev-pool/providers"
    );
  }
}
