use chrono::{DateTime, FixedOffset, Utc};
use dashalert_common::types::{Alert, AlertState, AlertStateInfo, NewAlert, SignedInUser};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::access::ensure_org_read;
use crate::entities::alert::{self, Column, Entity};
use crate::entities::dashboard;
use crate::error::{map_write_err, AlertError, Result};
use crate::metrics::ALL_ORGS;
use crate::store::{cancellable, ensure_not_cancelled, AlertRepository};

/// Replace the complete alert set of one dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAlertsCommand {
    pub org_id: i64,
    pub dashboard_id: i64,
    pub user_id: i64,
    pub alerts: Vec<NewAlert>,
}

/// What a save-set did, partition by partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAlertsSummary {
    pub inserted: u64,
    pub updated: u64,
    /// Matched an existing row whose stored attributes were already equal.
    pub unchanged: u64,
    pub deleted: u64,
}

/// Alert list filter. An empty `dashboard_ids` matches every dashboard of the org.
#[derive(Debug, Clone)]
pub struct AlertsQuery {
    pub org_id: i64,
    pub dashboard_ids: Vec<i64>,
    pub panel_id: Option<i64>,
    pub states: Vec<AlertState>,
    pub name_contains: Option<String>,
    pub limit: Option<u64>,
    pub user: SignedInUser,
}

impl AlertsQuery {
    pub fn new(org_id: i64, user: SignedInUser) -> Self {
        Self {
            org_id,
            dashboard_ids: Vec::new(),
            panel_id: None,
            states: Vec::new(),
            name_contains: None,
            limit: None,
            user,
        }
    }

    pub fn dashboards(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.dashboard_ids = ids.into_iter().collect();
        self
    }

    pub fn panel(mut self, panel_id: i64) -> Self {
        self.panel_id = Some(panel_id);
        self
    }

    pub fn states(mut self, states: impl IntoIterator<Item = AlertState>) -> Self {
        self.states = states.into_iter().collect();
        self
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAlertStateCommand {
    pub alert_id: i64,
    pub state: AlertState,
    /// Stored as `execution_error` when `state` is [`AlertState::Error`].
    pub error: Option<String>,
    pub eval_data: Option<Value>,
}

impl SetAlertStateCommand {
    pub fn new(alert_id: i64, state: AlertState) -> Self {
        Self {
            alert_id,
            state,
            error: None,
            eval_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseAlertCommand {
    pub org_id: i64,
    pub alert_ids: Vec<i64>,
    pub paused: bool,
}

impl PauseAlertCommand {
    pub fn single(org_id: i64, alert_id: i64, paused: bool) -> Self {
        Self {
            org_id,
            alert_ids: vec![alert_id],
            paused,
        }
    }
}

fn decode_document(column: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| AlertError::Storage(DbErr::Json(format!("column {column}: {e}"))))
}

fn to_alert(m: alert::Model, dash: Option<&dashboard::Model>) -> Result<Alert> {
    let state = m
        .state
        .parse::<AlertState>()
        .map_err(|e| AlertError::Storage(DbErr::Type(e)))?;
    let settings = decode_document("settings", &m.settings)?;
    let eval_data = m
        .eval_data
        .as_deref()
        .map(|raw| decode_document("eval_data", raw))
        .transpose()?;
    Ok(Alert {
        id: m.id,
        version: m.version,
        org_id: m.org_id,
        dashboard_id: m.dashboard_id,
        panel_id: m.panel_id,
        name: m.name,
        message: m.message,
        severity: m.severity,
        settings,
        frequency: m.frequency,
        for_secs: m.for_secs,
        eval_data,
        eval_date: m.eval_date.map(|d| d.with_timezone(&Utc)),
        execution_error: m.execution_error,
        state,
        new_state_date: m.new_state_date.with_timezone(&Utc),
        state_changes: m.state_changes,
        created: m.created.with_timezone(&Utc),
        updated: m.updated.with_timezone(&Utc),
        dashboard_uid: dash.map(|d| d.uid.clone()).unwrap_or_default(),
        dashboard_slug: dash.map(|d| d.slug.clone()).unwrap_or_default(),
    })
}

fn validate_save_command(cmd: &SaveAlertsCommand) -> Result<()> {
    let mut panels = HashSet::with_capacity(cmd.alerts.len());
    for a in &cmd.alerts {
        if a.org_id != cmd.org_id || a.dashboard_id != cmd.dashboard_id {
            return Err(AlertError::Invalid(format!(
                "alert for panel {} belongs to dashboard {} of org {}, expected dashboard {} of org {}",
                a.panel_id, a.dashboard_id, a.org_id, cmd.dashboard_id, cmd.org_id
            )));
        }
        if a.name.trim().is_empty() {
            return Err(AlertError::Invalid(format!(
                "alert for panel {} has an empty name",
                a.panel_id
            )));
        }
        if a.frequency < 1 {
            return Err(AlertError::Invalid(format!(
                "alert for panel {} has frequency {}, must be at least 1 second",
                a.panel_id, a.frequency
            )));
        }
        if a.for_secs < 0 {
            return Err(AlertError::Invalid(format!(
                "alert for panel {} has a negative pending duration",
                a.panel_id
            )));
        }
        if a.settings.is_null() {
            return Err(AlertError::Invalid(format!(
                "alert for panel {} has no settings document",
                a.panel_id
            )));
        }
        if !panels.insert(a.panel_id) {
            return Err(AlertError::Invalid(format!(
                "panel {} appears more than once",
                a.panel_id
            )));
        }
    }
    Ok(())
}

fn same_instant(stored: Option<DateTime<FixedOffset>>, incoming: Option<DateTime<Utc>>) -> bool {
    stored.map(|d| d.with_timezone(&Utc)) == incoming
}

fn same_document(stored: Option<&str>, incoming: Option<&Value>) -> bool {
    match (stored, incoming) {
        (None, None) => true,
        (Some(raw), Some(v)) => serde_json::from_str::<Value>(raw).is_ok_and(|s| &s == v),
        _ => false,
    }
}

/// Whether saving `incoming` over `current` would change any mutable column.
fn contains_updates(current: &alert::Model, incoming: &NewAlert) -> bool {
    current.name != incoming.name
        || current.message != incoming.message
        || current.severity != incoming.severity
        || current.frequency != incoming.frequency
        || current.for_secs != incoming.for_secs
        || !same_document(Some(&current.settings), Some(&incoming.settings))
        || !same_document(current.eval_data.as_deref(), incoming.eval_data.as_ref())
        || !same_instant(current.eval_date, incoming.eval_date)
}

impl AlertRepository {
    /// Reconciles the stored alerts of one dashboard with `cmd.alerts`.
    ///
    /// Matching is by panel id. New panels are inserted in state `unknown`,
    /// matched panels have their definition overwritten while keeping id,
    /// state, state date and execution error, and panels missing from the
    /// command are deleted. All of it commits atomically or not at all.
    pub async fn save_alerts(
        &self,
        cmd: &SaveAlertsCommand,
        token: &CancellationToken,
    ) -> Result<SaveAlertsSummary> {
        validate_save_command(cmd)?;
        let org = cmd.org_id.to_string();
        let started = Instant::now();
        let result = cancellable(token, self.save_alerts_tx(cmd, token)).await;
        self.observe_write(&org, started, result.is_ok());

        let summary = result?;
        tracing::info!(
            org_id = cmd.org_id,
            dashboard_id = cmd.dashboard_id,
            user_id = cmd.user_id,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            "Saved dashboard alerts"
        );
        Ok(summary)
    }

    async fn save_alerts_tx(
        &self,
        cmd: &SaveAlertsCommand,
        token: &CancellationToken,
    ) -> Result<SaveAlertsSummary> {
        let now = self.clock().now().fixed_offset();
        let txn = self.db().begin().await?;

        dashboard::Entity::find_by_id(cmd.dashboard_id)
            .filter(dashboard::Column::OrgId.eq(cmd.org_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AlertError::not_found("dashboard", cmd.dashboard_id))?;

        let mut existing: HashMap<i64, alert::Model> = Entity::find()
            .filter(Column::OrgId.eq(cmd.org_id))
            .filter(Column::DashboardId.eq(cmd.dashboard_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| (m.panel_id, m))
            .collect();

        let mut summary = SaveAlertsSummary::default();

        let incoming_panels: HashSet<i64> = cmd.alerts.iter().map(|a| a.panel_id).collect();
        let stale: Vec<i64> = existing
            .values()
            .filter(|m| !incoming_panels.contains(&m.panel_id))
            .map(|m| m.id)
            .collect();
        if !stale.is_empty() {
            let res = Entity::delete_many()
                .filter(Column::Id.is_in(stale))
                .exec(&txn)
                .await?;
            summary.deleted = res.rows_affected;
        }

        for incoming in &cmd.alerts {
            match existing.remove(&incoming.panel_id) {
                Some(current) => {
                    if !contains_updates(&current, incoming) {
                        summary.unchanged += 1;
                        continue;
                    }
                    let version = current.version;
                    let mut am: alert::ActiveModel = current.into();
                    am.version = Set(version + 1);
                    am.name = Set(incoming.name.clone());
                    am.message = Set(incoming.message.clone());
                    am.severity = Set(incoming.severity.clone());
                    am.settings = Set(incoming.settings.to_string());
                    am.frequency = Set(incoming.frequency);
                    am.for_secs = Set(incoming.for_secs);
                    am.eval_data = Set(incoming.eval_data.as_ref().map(Value::to_string));
                    am.eval_date = Set(incoming.eval_date.map(|d| d.fixed_offset()));
                    am.updated = Set(now);
                    am.update(&txn).await?;
                    summary.updated += 1;
                }
                None => {
                    let am = alert::ActiveModel {
                        id: Set(dashalert_common::id::next_id()),
                        version: Set(0),
                        org_id: Set(cmd.org_id),
                        dashboard_id: Set(cmd.dashboard_id),
                        panel_id: Set(incoming.panel_id),
                        name: Set(incoming.name.clone()),
                        message: Set(incoming.message.clone()),
                        severity: Set(incoming.severity.clone()),
                        settings: Set(incoming.settings.to_string()),
                        frequency: Set(incoming.frequency),
                        for_secs: Set(incoming.for_secs),
                        eval_data: Set(incoming.eval_data.as_ref().map(Value::to_string)),
                        eval_date: Set(incoming.eval_date.map(|d| d.fixed_offset())),
                        execution_error: Set(String::new()),
                        state: Set(AlertState::Unknown.as_str().to_string()),
                        new_state_date: Set(now),
                        state_changes: Set(0),
                        created: Set(now),
                        updated: Set(now),
                    };
                    am.insert(&txn).await.map_err(|e| {
                        map_write_err(e, || {
                            format!(
                                "alert for panel {} of dashboard {} already exists",
                                incoming.panel_id, cmd.dashboard_id
                            )
                        })
                    })?;
                    summary.inserted += 1;
                }
            }
        }

        ensure_not_cancelled(token)?;
        txn.commit().await?;
        Ok(summary)
    }

    /// Lists alerts visible to `query.user`, joined with their dashboard.
    pub async fn query_alerts(
        &self,
        query: &AlertsQuery,
        token: &CancellationToken,
    ) -> Result<Vec<Alert>> {
        ensure_org_read(&query.user, query.org_id)?;
        cancellable(token, async {
            let mut q = Entity::find()
                .find_also_related(dashboard::Entity)
                .filter(Column::OrgId.eq(query.org_id));
            if !query.dashboard_ids.is_empty() {
                q = q.filter(Column::DashboardId.is_in(query.dashboard_ids.clone()));
            }
            if let Some(panel_id) = query.panel_id {
                q = q.filter(Column::PanelId.eq(panel_id));
            }
            if !query.states.is_empty() {
                q = q.filter(Column::State.is_in(query.states.iter().map(|s| s.as_str())));
            }
            if let Some(needle) = query.name_contains.as_deref() {
                q = q.filter(Column::Name.contains(needle));
            }
            q = q.order_by_asc(Column::Id);
            if let Some(limit) = query.limit {
                q = q.limit(limit);
            }
            let rows = q.all(self.db()).await?;
            rows.into_iter()
                .map(|(m, d)| to_alert(m, d.as_ref()))
                .collect::<Result<Vec<_>>>()
        })
        .await
    }

    pub async fn get_alert_by_id(&self, id: i64) -> Result<Alert> {
        let (m, d) = Entity::find_by_id(id)
            .find_also_related(dashboard::Entity)
            .one(self.db())
            .await?
            .ok_or_else(|| AlertError::not_found("alert", id))?;
        to_alert(m, d.as_ref())
    }

    pub async fn get_alert_states_for_dashboard(
        &self,
        org_id: i64,
        dashboard_id: i64,
    ) -> Result<Vec<AlertStateInfo>> {
        let rows = Entity::find()
            .filter(Column::OrgId.eq(org_id))
            .filter(Column::DashboardId.eq(dashboard_id))
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter()
            .map(|m| {
                Ok(AlertStateInfo {
                    id: m.id,
                    dashboard_id: m.dashboard_id,
                    panel_id: m.panel_id,
                    state: m
                        .state
                        .parse()
                        .map_err(|e| AlertError::Storage(DbErr::Type(e)))?,
                    new_state_date: m.new_state_date.with_timezone(&Utc),
                })
            })
            .collect()
    }

    /// Every alert across all organizations, oldest id first.
    pub async fn list_all_alerts(&self) -> Result<Vec<Alert>> {
        let rows = Entity::find()
            .find_also_related(dashboard::Entity)
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter()
            .map(|(m, d)| to_alert(m, d.as_ref()))
            .collect()
    }

    pub async fn count_alerts(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }

    /// Moves an alert to `cmd.state`.
    ///
    /// Paused alerts reject every transition with [`AlertError::Conflict`];
    /// unpausing is the only way out. `paused` itself is not a valid target:
    /// it is refused as [`AlertError::Invalid`] before any row is read, so no
    /// org is known and neither the transition nor the write counters move.
    pub async fn set_alert_state(
        &self,
        cmd: &SetAlertStateCommand,
        token: &CancellationToken,
    ) -> Result<Alert> {
        if cmd.state == AlertState::Paused {
            return Err(AlertError::Invalid(
                "alerts are paused through the pause operations, not set-state".to_string(),
            ));
        }
        let started = Instant::now();
        let mut org_id = None;
        let result = cancellable(token, self.set_alert_state_tx(cmd, token, &mut org_id)).await;
        let org = org_id.map_or_else(|| "unknown".to_string(), |id| id.to_string());
        self.observe_write(&org, started, result.is_ok());

        match &result {
            Ok(_) => self.metrics().record_transition(&org),
            Err(AlertError::Conflict(_)) => self.metrics().record_transition_failed(&org),
            Err(_) => {}
        }
        result
    }

    async fn set_alert_state_tx(
        &self,
        cmd: &SetAlertStateCommand,
        token: &CancellationToken,
        org_id: &mut Option<i64>,
    ) -> Result<Alert> {
        let txn = self.db().begin().await?;
        let current = Entity::find_by_id(cmd.alert_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AlertError::not_found("alert", cmd.alert_id))?;
        *org_id = Some(current.org_id);

        let paused = AlertState::Paused.as_str();
        if current.state == paused {
            return Err(AlertError::Conflict(format!(
                "alert {} is paused and cannot change state",
                cmd.alert_id
            )));
        }

        let now = self.clock().now().fixed_offset();
        let mut update = Entity::update_many()
            .col_expr(Column::State, Expr::value(cmd.state.as_str()))
            .col_expr(Column::NewStateDate, Expr::value(now))
            .col_expr(
                Column::StateChanges,
                Expr::col(Column::StateChanges).add(1),
            )
            .filter(Column::Id.eq(cmd.alert_id))
            .filter(Column::State.ne(paused));
        if let Some(eval_data) = &cmd.eval_data {
            update = update.col_expr(Column::EvalData, Expr::value(eval_data.to_string()));
        }
        if cmd.state == AlertState::Error {
            update = update.col_expr(
                Column::ExecutionError,
                Expr::value(cmd.error.clone().unwrap_or_default()),
            );
        }

        // Compare-and-set: a concurrent pause between the read and this write
        // leaves zero matching rows.
        let res = update.exec(&txn).await?;
        if res.rows_affected == 0 {
            return Err(AlertError::Conflict(format!(
                "alert {} was paused concurrently",
                cmd.alert_id
            )));
        }

        let (m, d) = Entity::find_by_id(cmd.alert_id)
            .find_also_related(dashboard::Entity)
            .one(&txn)
            .await?
            .ok_or_else(|| AlertError::not_found("alert", cmd.alert_id))?;

        ensure_not_cancelled(token)?;
        txn.commit().await?;

        tracing::debug!(
            alert_id = cmd.alert_id,
            from = %current.state,
            to = %cmd.state,
            "Alert state changed"
        );
        to_alert(m, d.as_ref())
    }

    /// Pauses or unpauses the listed alerts of one org.
    ///
    /// Unpausing resets the state to `unknown`. The state date is bumped on
    /// every call, even when the state does not change. Returns the number of
    /// alerts touched; ids outside the org are ignored.
    pub async fn pause_alert(
        &self,
        cmd: &PauseAlertCommand,
        token: &CancellationToken,
    ) -> Result<u64> {
        if cmd.alert_ids.is_empty() {
            return Err(AlertError::Invalid(
                "pause requires at least one alert id".to_string(),
            ));
        }
        let org = cmd.org_id.to_string();
        let started = Instant::now();
        let result = cancellable(token, async {
            let now = self.clock().now().fixed_offset();
            let txn = self.db().begin().await?;
            let res = Entity::update_many()
                .col_expr(Column::State, Expr::value(pause_target(cmd.paused).as_str()))
                .col_expr(Column::NewStateDate, Expr::value(now))
                .filter(Column::OrgId.eq(cmd.org_id))
                .filter(Column::Id.is_in(cmd.alert_ids.clone()))
                .exec(&txn)
                .await?;
            ensure_not_cancelled(token)?;
            txn.commit().await?;
            Ok::<_, AlertError>(res.rows_affected)
        })
        .await;
        self.observe_write(&org, started, result.is_ok());

        let affected = result?;
        if affected > 0 {
            self.metrics().record_transition(&org);
        }
        tracing::info!(
            org_id = cmd.org_id,
            paused = cmd.paused,
            affected,
            "Alert pause state updated"
        );
        Ok(affected)
    }

    /// Pauses or unpauses every alert of every org.
    pub async fn pause_all_alerts(&self, paused: bool, token: &CancellationToken) -> Result<u64> {
        let started = Instant::now();
        let result = cancellable(token, async {
            let now = self.clock().now().fixed_offset();
            let txn = self.db().begin().await?;
            let res = Entity::update_many()
                .col_expr(Column::State, Expr::value(pause_target(paused).as_str()))
                .col_expr(Column::NewStateDate, Expr::value(now))
                .exec(&txn)
                .await?;
            ensure_not_cancelled(token)?;
            txn.commit().await?;
            Ok::<_, AlertError>(res.rows_affected)
        })
        .await;
        self.observe_write(ALL_ORGS, started, result.is_ok());

        let affected = result?;
        if affected > 0 {
            self.metrics().record_transition(ALL_ORGS);
        }
        tracing::info!(paused, affected, "Pause state updated for all alerts");
        Ok(affected)
    }
}

fn pause_target(paused: bool) -> AlertState {
    if paused {
        AlertState::Paused
    } else {
        AlertState::Unknown
    }
}
