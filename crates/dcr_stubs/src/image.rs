#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a successful image build
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct ImageInfo {
  /// Image reference including the digest `<ref>@sha256:<hex>`
  pub image: String,
  /// Hex encoded sha256 content digest
  pub digest: String,
}

/// State of an image build as reported by the builder backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
  /// The build is still running
  Running,
  /// The build terminated without producing an image
  Failed,
  /// The build pushed an image
  Succeeded(ImageInfo),
}

impl BuildStatus {
  pub fn is_done(&self) -> bool {
    !matches!(self, BuildStatus::Running)
  }
}
