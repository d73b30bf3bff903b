#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle state of a TEE instance as reported by its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum InstanceStatus {
  Provisioning,
  Staging,
  Running,
  Stopping,
  Stopped,
  Suspending,
  Suspended,
  Repairing,
  Terminated,
  #[cfg_attr(feature = "serde", serde(other))]
  Unknown,
}

impl InstanceStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      InstanceStatus::Provisioning => "PROVISIONING",
      InstanceStatus::Staging => "STAGING",
      InstanceStatus::Running => "RUNNING",
      InstanceStatus::Stopping => "STOPPING",
      InstanceStatus::Stopped => "STOPPED",
      InstanceStatus::Suspending => "SUSPENDING",
      InstanceStatus::Suspended => "SUSPENDED",
      InstanceStatus::Repairing => "REPAIRING",
      InstanceStatus::Terminated => "TERMINATED",
      InstanceStatus::Unknown => "UNKNOWN",
    }
  }
}

impl std::fmt::Display for InstanceStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for InstanceStatus {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let status = match s {
      "PROVISIONING" => InstanceStatus::Provisioning,
      "STAGING" => InstanceStatus::Staging,
      "RUNNING" => InstanceStatus::Running,
      "STOPPING" => InstanceStatus::Stopping,
      "STOPPED" => InstanceStatus::Stopped,
      "SUSPENDING" => InstanceStatus::Suspending,
      "SUSPENDED" => InstanceStatus::Suspended,
      "REPAIRING" => InstanceStatus::Repairing,
      "TERMINATED" => InstanceStatus::Terminated,
      _ => InstanceStatus::Unknown,
    };
    Ok(status)
  }
}
