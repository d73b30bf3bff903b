use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle of a job.
/// The success path is
/// `Created -> ImageBuilding -> VMWaiting -> VMRunning -> VMFinished`
/// and every `*Failed` status is terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JobStatus {
  #[default]
  Created,
  ImageBuilding,
  ImageBuildingFailed,
  VMWaiting,
  VMRunning,
  VMFinished,
  VMFailed,
  VMLaunchFailed,
}

impl JobStatus {
  /// Statuses a job never leaves
  pub const TERMINAL: [JobStatus; 4] = [
    JobStatus::VMFinished,
    JobStatus::VMFailed,
    JobStatus::ImageBuildingFailed,
    JobStatus::VMLaunchFailed,
  ];

  pub fn is_terminal(&self) -> bool {
    Self::TERMINAL.contains(self)
  }

  pub fn is_in_progress(&self) -> bool {
    !self.is_terminal()
  }

  /// Terminal statuses after which a backend instance may still be alive.
  /// A launch that errored or timed out may have provisioned one anyway.
  pub fn requires_cleanup(&self) -> bool {
    matches!(
      self,
      JobStatus::VMFinished | JobStatus::VMFailed | JobStatus::VMLaunchFailed
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      JobStatus::Created => "Created",
      JobStatus::ImageBuilding => "ImageBuilding",
      JobStatus::ImageBuildingFailed => "ImageBuildingFailed",
      JobStatus::VMWaiting => "VMWaiting",
      JobStatus::VMRunning => "VMRunning",
      JobStatus::VMFinished => "VMFinished",
      JobStatus::VMFailed => "VMFailed",
      JobStatus::VMLaunchFailed => "VMLaunchFailed",
    }
  }
}

impl std::fmt::Display for JobStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for JobStatus {
  type Err = std::io::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Created" => Ok(JobStatus::Created),
      "ImageBuilding" => Ok(JobStatus::ImageBuilding),
      "ImageBuildingFailed" => Ok(JobStatus::ImageBuildingFailed),
      "VMWaiting" => Ok(JobStatus::VMWaiting),
      "VMRunning" => Ok(JobStatus::VMRunning),
      "VMFinished" => Ok(JobStatus::VMFinished),
      "VMFailed" => Ok(JobStatus::VMFailed),
      "VMLaunchFailed" => Ok(JobStatus::VMLaunchFailed),
      _ => Err(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid job status {s}"),
      )),
    }
  }
}

/// Job partial is used by the submission path to create a new job
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct JobPartial {
  /// Tenant submitting the job
  pub creator: String,
  /// Notebook executed inside the instance
  pub jupyter_file_name: String,
  /// Location of the tarball holding the workspace and the Dockerfile
  pub build_context_path: String,
  /// Signed url the instance uploads the executed notebook to
  pub output_put_signed_url: String,
  /// Signed url the instance uploads the attestation token to
  pub custom_token_put_signed_url: String,
  /// Environment the job owner allowed to be injected at runtime
  #[cfg_attr(feature = "serde", serde(default))]
  pub extra_envs: BTreeMap<String, String>,
}

/// A confidential computing job as persisted by the store
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct Job {
  pub uuid: String,
  pub creator: String,
  pub status: JobStatus,
  pub jupyter_file_name: String,
  pub build_context_path: String,
  pub output_put_signed_url: String,
  pub custom_token_put_signed_url: String,
  /// Image reference pinned by digest, set when the build succeeded
  #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
  pub docker_image: Option<String>,
  #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
  pub docker_image_digest: Option<String>,
  /// Join key with the backend instance, set once the instance is launched
  #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
  pub instance_name: Option<String>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub extra_envs: BTreeMap<String, String>,
  pub created_at: chrono::NaiveDateTime,
  pub updated_at: chrono::NaiveDateTime,
}

impl Job {
  /// Create a job in `Created` status from a partial
  pub fn from_partial(uuid: &str, partial: &JobPartial) -> Self {
    let now = chrono::Utc::now().naive_utc();
    Job {
      uuid: uuid.to_owned(),
      creator: partial.creator.clone(),
      status: JobStatus::Created,
      jupyter_file_name: partial.jupyter_file_name.clone(),
      build_context_path: partial.build_context_path.clone(),
      output_put_signed_url: partial.output_put_signed_url.clone(),
      custom_token_put_signed_url: partial.custom_token_put_signed_url.clone(),
      docker_image: None,
      docker_image_digest: None,
      instance_name: None,
      extra_envs: partial.extra_envs.clone(),
      created_at: now,
      updated_at: now,
    }
  }

  /// Keys the job owner allowed to override at runtime, sorted
  pub fn allow_env_keys(&self) -> Vec<String> {
    self.extra_envs.keys().cloned().collect()
  }

  /// Time elapsed since the job was submitted
  pub fn age(&self, now: chrono::NaiveDateTime) -> chrono::Duration {
    now - self.created_at
  }
}
