//! Alertmanager webhook payload types.
//!
//! Reference: <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Annotation naming the task definition to run when the group fires.
pub const FIRING_JOB_ANNOTATION: &str = "firing_job";
/// Annotation naming the task definition to run when the group resolves.
pub const RESOLVED_JOB_ANNOTATION: &str = "resolved_job";

pub const STATUS_FIRING: &str = "firing";
pub const STATUS_RESOLVED: &str = "resolved";

/// One webhook delivery from Alertmanager.
///
/// Every field is optional on the wire; absent or `null` values decode to their zero value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertEvent {
    pub version: String,
    pub group_key: String,
    pub truncated_alerts: u64,
    pub status: String,
    pub receiver: String,
    #[serde(deserialize_with = "nullable")]
    pub group_labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable")]
    pub common_labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable")]
    pub common_annotations: BTreeMap<String, String>,
    #[serde(rename = "externalURL")]
    pub external_url: String,
    #[serde(deserialize_with = "nullable")]
    pub alerts: Vec<AlertRecord>,
}

/// A single alert inside a delivery. Carried for completeness; routing reads only the
/// group-common labels and annotations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertRecord {
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable")]
    pub annotations: BTreeMap<String, String>,
    pub starts_at: String,
    #[serde(alias = "EndsAt")]
    pub ends_at: String,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl AlertEvent {
    pub fn from_slice(body: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// `alertname` common label, used for logging only.
    pub fn alert_name(&self) -> &str {
        self.common_labels
            .get("alertname")
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Task definition key for this delivery's status transition.
    ///
    /// `firing` reads `firing_job`, `resolved` reads `resolved_job`. Any other status, or
    /// a missing/empty annotation for the current status, yields `None`.
    pub fn task_key(&self) -> Option<&str> {
        let annotation = match self.status.as_str() {
            STATUS_FIRING => FIRING_JOB_ANNOTATION,
            STATUS_RESOLVED => RESOLVED_JOB_ANNOTATION,
            _ => return None,
        };
        self.common_annotations
            .get(annotation)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}
