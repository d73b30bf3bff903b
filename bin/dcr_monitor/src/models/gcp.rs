use serde::Deserialize;

use dcr_stubs::instance::InstanceStatus;

/// Access token served by the metadata server
#[derive(Clone, Debug, Deserialize)]
pub struct AccessToken {
  pub access_token: String,
  /// Seconds the token is valid for
  pub expires_in: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OperationErrorItem {
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OperationError {
  #[serde(default)]
  pub errors: Vec<OperationErrorItem>,
}

/// Zonal compute engine long running operation
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperation {
  pub name: String,
  /// `PENDING`, `RUNNING` or `DONE`
  pub status: String,
  #[serde(default)]
  pub error: Option<OperationError>,
}

impl ComputeOperation {
  pub fn is_done(&self) -> bool {
    self.status == "DONE"
  }

  /// Messages of the errors the operation ended with
  pub fn error_message(&self) -> Option<String> {
    let error = self.error.as_ref()?;
    if error.errors.is_empty() {
      return None;
    }
    let messages = error
      .errors
      .iter()
      .map(|item| format!("{}: {}", item.code, item.message))
      .collect::<Vec<_>>();
    Some(messages.join(", "))
  }
}

/// The part of a compute engine instance we read back
#[derive(Clone, Debug, Deserialize)]
pub struct ComputeInstance {
  pub name: String,
  pub status: InstanceStatus,
}
