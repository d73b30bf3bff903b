use std::cell::RefCell;

use ntex::time::Millis;

use dcr_error::io::{IoError, IoResult};

use crate::models::AccessToken;

use super::http_client::RestClient;

pub const COMPUTE_URL: &str = "https://compute.googleapis.com/compute/v1";
pub const IAM_URL: &str = "https://iam.googleapis.com/v1";
const METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1";
/// Refresh the token this many seconds before it expires
const EXPIRY_MARGIN: i64 = 60;

#[derive(Clone, Debug)]
pub struct CachedToken {
  pub token: String,
  pub expires_at: chrono::NaiveDateTime,
}

/// Source of the oauth access token sent to google apis
#[derive(Debug)]
pub enum GcpAuth {
  /// Token of the default service account from the metadata server
  Metadata {
    rest: RestClient,
    cached: RefCell<Option<CachedToken>>,
  },
  /// Token given through `GOOGLE_OAUTH_ACCESS_TOKEN`
  Static(String),
}

impl GcpAuth {
  pub fn from_env() -> Self {
    match std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
      Ok(token) if !token.is_empty() => GcpAuth::Static(token),
      _ => GcpAuth::Metadata {
        rest: RestClient::new(
          "GCP metadata",
          METADATA_URL,
          Millis::from_secs(10),
        ),
        cached: RefCell::new(None),
      },
    }
  }

  /// Valid access token, fetched again shortly before expiry
  pub async fn token(&self) -> IoResult<String> {
    let (rest, cached) = match self {
      GcpAuth::Static(token) => return Ok(token.clone()),
      GcpAuth::Metadata { rest, cached } => (rest, cached),
    };
    let now = chrono::Utc::now().naive_utc();
    if let Some(token) = cached.borrow().as_ref() {
      if token.expires_at > now {
        return Ok(token.token.clone());
      }
    }
    let req = rest
      .get("/instance/service-accounts/default/token")
      .header("Metadata-Flavor", "Google");
    let res = rest.send(req).await?;
    let token: AccessToken = rest.res_json(res).await?;
    if token.access_token.is_empty() {
      return Err(IoError::invalid_data(
        "GCP metadata",
        "empty access token",
      ));
    }
    let validity = (token.expires_in - EXPIRY_MARGIN).max(0);
    cached.replace(Some(CachedToken {
      token: token.access_token.clone(),
      expires_at: now + chrono::Duration::seconds(validity),
    }));
    log::debug!("gcp: access token refreshed, valid for {validity}s");
    Ok(token.access_token)
  }
}
