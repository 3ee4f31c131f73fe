//! Wire shapes of the provisioning API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Nanoseconds.
pub type Duration = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedAlertRule {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    #[serde(rename = "orgID")]
    pub org_id: i64,
    #[serde(rename = "folderUID")]
    pub folder_uid: String,
    #[serde(rename = "ruleGroup")]
    pub rule_group: String,
    pub title: String,
    pub condition: String,
    pub data: Vec<AlertQuery>,
    #[serde(default = "epoch")]
    pub updated: DateTime<Utc>,
    #[serde(rename = "noDataState")]
    pub no_data_state: String,
    #[serde(rename = "execErrState")]
    pub exec_err_state: String,
    #[serde(rename = "for")]
    pub for_ns: Duration,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub provenance: String,
    #[serde(rename = "isPaused", default)]
    pub is_paused: bool,
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeTimeRange {
    pub from: Duration,
    pub to: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    #[serde(default)]
    pub relative_time_range: RelativeTimeRange,
    pub datasource_uid: String,
    /// Datasource specific query, passed through untouched.
    #[serde(default)]
    pub model: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleGroup {
    pub title: String,
    pub folder_uid: String,
    /// Evaluation interval in seconds.
    pub interval: i64,
    #[serde(default)]
    pub rules: Vec<ProvisionedAlertRule>,
}
