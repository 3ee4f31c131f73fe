use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle position of a dashboard alert.
///
/// # Examples
///
/// ```
/// use dashalert_common::types::AlertState;
///
/// let state: AlertState = "No_Data".parse().unwrap();
/// assert_eq!(state, AlertState::NoData);
/// assert_eq!(state.to_string(), "no_data");
/// assert!("sleeping".parse::<AlertState>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Unknown,
    Ok,
    Paused,
    Alerting,
    Pending,
    NoData,
    Error,
}

impl AlertState {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertState::Unknown => "unknown",
            AlertState::Ok => "ok",
            AlertState::Paused => "paused",
            AlertState::Alerting => "alerting",
            AlertState::Pending => "pending",
            AlertState::NoData => "no_data",
            AlertState::Error => "error",
        }
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(AlertState::Unknown),
            "ok" => Ok(AlertState::Ok),
            "paused" => Ok(AlertState::Paused),
            "alerting" => Ok(AlertState::Alerting),
            "pending" => Ok(AlertState::Pending),
            "no_data" => Ok(AlertState::NoData),
            "error" => Ok(AlertState::Error),
            _ => Err(format!("unknown alert state: {s}")),
        }
    }
}

/// Role of a user inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgRole {
    Admin,
    Editor,
    Viewer,
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgRole::Admin => write!(f, "Admin"),
            OrgRole::Editor => write!(f, "Editor"),
            OrgRole::Viewer => write!(f, "Viewer"),
        }
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(OrgRole::Admin),
            "editor" => Ok(OrgRole::Editor),
            "viewer" => Ok(OrgRole::Viewer),
            _ => Err(format!("unknown org role: {s}")),
        }
    }
}

/// The principal on whose behalf a read is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: i64,
    pub org_role: OrgRole,
    pub login: String,
}

impl SignedInUser {
    pub fn new(org_id: i64, org_role: OrgRole) -> Self {
        Self {
            user_id: 0,
            org_id,
            org_role,
            login: String::new(),
        }
    }
}

/// A persisted alert attached to one dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub version: i64,
    pub org_id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub name: String,
    pub message: String,
    pub severity: String,
    pub settings: Value,
    /// Evaluation interval in seconds.
    pub frequency: i64,
    /// Seconds a condition must hold before the alert fires.
    pub for_secs: i64,
    pub eval_data: Option<Value>,
    pub eval_date: Option<DateTime<Utc>>,
    pub execution_error: String,
    pub state: AlertState,
    pub new_state_date: DateTime<Utc>,
    pub state_changes: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Read-only projection from the parent dashboard.
    pub dashboard_uid: String,
    /// Read-only projection from the parent dashboard.
    pub dashboard_slug: String,
}

/// Incoming alert definition for a save-set.
///
/// There is no id field: alerts are matched to stored rows by
/// `(org_id, dashboard_id, panel_id)` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub org_id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default = "empty_document")]
    pub settings: Value,
    pub frequency: i64,
    #[serde(default)]
    pub for_secs: i64,
    #[serde(default)]
    pub eval_data: Option<Value>,
    #[serde(default)]
    pub eval_date: Option<DateTime<Utc>>,
}

fn empty_document() -> Value {
    Value::Object(serde_json::Map::new())
}

impl NewAlert {
    /// A minimal definition with empty settings and one-second frequency.
    pub fn new(org_id: i64, dashboard_id: i64, panel_id: i64, name: impl Into<String>) -> Self {
        Self {
            org_id,
            dashboard_id,
            panel_id,
            name: name.into(),
            message: String::new(),
            severity: String::new(),
            settings: empty_document(),
            frequency: 1,
            for_secs: 0,
            eval_data: None,
            eval_date: None,
        }
    }
}

/// Compact per-panel state view of a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStateInfo {
    pub id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub state: AlertState,
    pub new_state_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: i64,
    pub org_id: i64,
    pub uid: String,
    pub slug: String,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub org_id: i64,
    pub login: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub is_disabled: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to login and then email.
    pub fn name_or_fallback(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        if !self.login.is_empty() {
            return &self.login;
        }
        &self.email
    }
}
