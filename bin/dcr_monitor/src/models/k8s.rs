use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sJobCondition {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub status: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sJobStatus {
  #[serde(default)]
  pub active: Option<i32>,
  #[serde(default)]
  pub succeeded: Option<i32>,
  #[serde(default)]
  pub failed: Option<i32>,
  #[serde(default)]
  pub conditions: Option<Vec<K8sJobCondition>>,
}

/// The part of a `batch/v1` Job we read back
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sJob {
  #[serde(default)]
  pub metadata: ObjectMeta,
  #[serde(default)]
  pub status: Option<K8sJobStatus>,
}

impl K8sJob {
  pub fn conditions(&self) -> &[K8sJobCondition] {
    self
      .status
      .as_ref()
      .and_then(|status| status.conditions.as_deref())
      .unwrap_or_default()
  }

  pub fn active(&self) -> i32 {
    self
      .status
      .as_ref()
      .and_then(|status| status.active)
      .unwrap_or_default()
  }

  pub fn succeeded(&self) -> i32 {
    self
      .status
      .as_ref()
      .and_then(|status| status.succeeded)
      .unwrap_or_default()
  }

  pub fn failed(&self) -> i32 {
    self
      .status
      .as_ref()
      .and_then(|status| status.failed)
      .unwrap_or_default()
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Pod {
  #[serde(default)]
  pub metadata: ObjectMeta,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PodList {
  #[serde(default)]
  pub items: Vec<Pod>,
}
