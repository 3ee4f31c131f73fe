//! Org-scoped alert rule model.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ProvisioningError;

/// What a rule reports when its queries return no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoDataState {
    Alerting,
    NoData,
    Ok,
}

impl NoDataState {
    pub fn as_str(self) -> &'static str {
        match self {
            NoDataState::Alerting => "Alerting",
            NoDataState::NoData => "NoData",
            NoDataState::Ok => "OK",
        }
    }
}

impl std::str::FromStr for NoDataState {
    type Err = ProvisioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Alerting" => Ok(NoDataState::Alerting),
            "NoData" => Ok(NoDataState::NoData),
            "OK" => Ok(NoDataState::Ok),
            _ => Err(ProvisioningError::InvalidEnum {
                field: "noDataState",
                value: s.to_string(),
            }),
        }
    }
}

/// What a rule reports when evaluation itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionErrorState {
    Alerting,
    Error,
    Ok,
}

impl ExecutionErrorState {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionErrorState::Alerting => "Alerting",
            ExecutionErrorState::Error => "Error",
            ExecutionErrorState::Ok => "OK",
        }
    }
}

impl std::str::FromStr for ExecutionErrorState {
    type Err = ProvisioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Alerting" => Ok(ExecutionErrorState::Alerting),
            "Error" => Ok(ExecutionErrorState::Error),
            "OK" => Ok(ExecutionErrorState::Ok),
            _ => Err(ProvisioningError::InvalidEnum {
                field: "execErrState",
                value: s.to_string(),
            }),
        }
    }
}

/// Who owns a provisioned object. `None` means it is editable in the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Provenance {
    #[default]
    None,
    Api,
    File,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::None => "",
            Provenance::Api => "api",
            Provenance::File => "file",
        }
    }
}

impl std::str::FromStr for Provenance {
    type Err = ProvisioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Provenance::None),
            "api" => Ok(Provenance::Api),
            "file" => Ok(Provenance::File),
            _ => Err(ProvisioningError::InvalidEnum {
                field: "provenance",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelativeTimeRange {
    pub from: Duration,
    pub to: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertQuery {
    pub ref_id: String,
    pub query_type: String,
    pub relative_time_range: RelativeTimeRange,
    pub datasource_uid: String,
    pub model: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    /// Folder the rule lives in.
    pub namespace_uid: String,
    pub rule_group: String,
    pub title: String,
    /// `ref_id` of the query whose result decides firing.
    pub condition: String,
    pub data: Vec<AlertQuery>,
    pub updated: DateTime<Utc>,
    pub no_data_state: NoDataState,
    pub exec_err_state: ExecutionErrorState,
    pub for_duration: Duration,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub is_paused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRuleGroup {
    pub title: String,
    pub folder_uid: String,
    pub interval: Duration,
    pub provenance: Provenance,
    pub rules: Vec<AlertRule>,
}
