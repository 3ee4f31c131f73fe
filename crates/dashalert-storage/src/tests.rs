use crate::error::AlertError;
use crate::metrics::{HistorianMetrics, ALL_ORGS};
use crate::store::{
    AlertRepository, AlertsQuery, CreateUserCommand, NewDashboard, PauseAlertCommand,
    SaveAlertsCommand, SetAlertStateCommand,
};
use dashalert_common::clock::StepClock;
use dashalert_common::error::ErrorKind;
use dashalert_common::types::{AlertState, Dashboard, NewAlert, OrgRole, SignedInUser};
use sea_orm::ConnectionTrait;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct CountingMetrics {
    backend_info: AtomicU64,
    transitions: AtomicU64,
    transitions_failed: AtomicU64,
    writes: AtomicU64,
    writes_failed: AtomicU64,
}

impl HistorianMetrics for CountingMetrics {
    fn record_backend_info(&self, _backend: &str) {
        self.backend_info.fetch_add(1, Ordering::SeqCst);
    }

    fn record_transition(&self, _org: &str) {
        self.transitions.fetch_add(1, Ordering::SeqCst);
    }

    fn record_transition_failed(&self, _org: &str) {
        self.transitions_failed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_write(&self, _org: &str, _duration: Duration, success: bool) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.writes_failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn setup() -> (TempDir, AlertRepository, Arc<CountingMetrics>) {
    dashalert_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("alerts.db").display());
    let metrics = Arc::new(CountingMetrics::default());
    let repo = AlertRepository::connect(&url, Arc::new(StepClock::default()), metrics.clone())
        .await
        .unwrap();
    (dir, repo, metrics)
}

async fn dashboard(repo: &AlertRepository, org_id: i64, title: &str) -> Dashboard {
    repo.save_dashboard(
        &NewDashboard {
            org_id,
            title: title.to_string(),
            uid: None,
        },
        &CancellationToken::new(),
    )
    .await
    .unwrap()
}

fn save_cmd(dash: &Dashboard, panels: &[i64]) -> SaveAlertsCommand {
    SaveAlertsCommand {
        org_id: dash.org_id,
        dashboard_id: dash.id,
        user_id: 1,
        alerts: panels
            .iter()
            .map(|p| NewAlert::new(dash.org_id, dash.id, *p, format!("panel {p}")))
            .collect(),
    }
}

fn admin_query(dash: &Dashboard) -> AlertsQuery {
    AlertsQuery::new(dash.org_id, SignedInUser::new(dash.org_id, OrgRole::Admin))
        .dashboards([dash.id])
}

#[tokio::test]
async fn create_alert_starts_unknown_with_dashboard_projection() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();

    let mut alert = NewAlert::new(1, dash.id, 1, "Alerting title");
    alert.message = "Alerting message".to_string();
    alert.eval_data = Some(json!({"test": "test"}));
    let cmd = SaveAlertsCommand {
        org_id: 1,
        dashboard_id: dash.id,
        user_id: 1,
        alerts: vec![alert],
    };
    let summary = repo.save_alerts(&cmd, &token).await.unwrap();
    assert_eq!(summary.inserted, 1);

    let alerts = repo.query_alerts(&admin_query(&dash), &token).await.unwrap();
    assert_eq!(alerts.len(), 1);
    let a = &alerts[0];
    assert_eq!(a.state, AlertState::Unknown);
    assert_eq!(a.name, "Alerting title");
    assert_eq!(a.message, "Alerting message");
    assert_eq!(a.eval_data.as_ref().unwrap()["test"], "test");
    assert_eq!(a.execution_error, "");
    assert_eq!(a.dashboard_slug, "dashboard-with-alerts");
    assert_eq!(a.dashboard_uid, dash.uid);
    assert_eq!(a.settings, json!({}));
}

#[tokio::test]
async fn set_state_advances_state_date() {
    let (_dir, repo, metrics) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1]), &token).await.unwrap();
    let before = repo.query_alerts(&admin_query(&dash), &token).await.unwrap()[0].clone();

    let after = repo
        .set_alert_state(&SetAlertStateCommand::new(before.id, AlertState::Ok), &token)
        .await
        .unwrap();
    assert_eq!(after.state, AlertState::Ok);
    assert!(after.new_state_date > before.new_state_date);
    assert_eq!(after.state_changes, before.state_changes + 1);
    assert_eq!(metrics.transitions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paused_alerts_reject_transitions_until_unpaused() {
    let (_dir, repo, metrics) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1]), &token).await.unwrap();
    let id = repo.query_alerts(&admin_query(&dash), &token).await.unwrap()[0].id;
    let initial = repo.get_alert_by_id(id).await.unwrap();

    let paused = repo.pause_all_alerts(true, &token).await.unwrap();
    assert_eq!(paused, 1);
    let after_pause = repo.get_alert_by_id(id).await.unwrap();
    assert_eq!(after_pause.state, AlertState::Paused);
    assert!(after_pause.new_state_date > initial.new_state_date);

    let err = repo
        .set_alert_state(&SetAlertStateCommand::new(id, AlertState::Ok), &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(metrics.transitions_failed.load(Ordering::SeqCst), 1);

    let after_rejected = repo.get_alert_by_id(id).await.unwrap();
    assert_eq!(after_rejected.state, AlertState::Paused);
    assert_eq!(after_rejected.new_state_date, after_pause.new_state_date);
    assert_eq!(after_rejected.state_changes, after_pause.state_changes);

    repo.pause_all_alerts(false, &token).await.unwrap();
    let after_unpause = repo.get_alert_by_id(id).await.unwrap();
    assert_eq!(after_unpause.state, AlertState::Unknown);
    assert!(after_unpause.new_state_date > after_pause.new_state_date);

    repo.set_alert_state(&SetAlertStateCommand::new(id, AlertState::Alerting), &token)
        .await
        .unwrap();
}

#[tokio::test]
async fn save_set_removes_panels_missing_from_the_command() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();

    repo.save_alerts(&save_cmd(&dash, &[1, 2, 3]), &token).await.unwrap();
    assert_eq!(repo.query_alerts(&admin_query(&dash), &token).await.unwrap().len(), 3);

    let summary = repo.save_alerts(&save_cmd(&dash, &[1, 2]), &token).await.unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.unchanged, 2);
    let alerts = repo.query_alerts(&admin_query(&dash), &token).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.panel_id != 3));
}

#[tokio::test]
async fn delete_dashboard_removes_its_alerts() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let other = dashboard(&repo, 1, "Another dashboard").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1]), &token).await.unwrap();
    repo.save_alerts(&save_cmd(&other, &[1]), &token).await.unwrap();

    let removed = repo.delete_dashboard(1, dash.id, &token).await.unwrap();
    assert_eq!(removed, 1);
    assert!(repo.query_alerts(&admin_query(&dash), &token).await.unwrap().is_empty());
    assert_eq!(repo.query_alerts(&admin_query(&other), &token).await.unwrap().len(), 1);

    let err = repo.delete_dashboard(1, dash.id, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_keeps_identity_and_state() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1]), &token).await.unwrap();
    let original = repo.query_alerts(&admin_query(&dash), &token).await.unwrap()[0].clone();

    let mut cmd = SetAlertStateCommand::new(original.id, AlertState::Error);
    cmd.error = Some("datasource timeout".to_string());
    let errored = repo.set_alert_state(&cmd, &token).await.unwrap();
    assert_eq!(errored.execution_error, "datasource timeout");

    let mut update = save_cmd(&dash, &[1]);
    update.alerts[0].name = "renamed".to_string();
    update.alerts[0].frequency = 60;
    let summary = repo.save_alerts(&update, &token).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.inserted, 0);

    let updated = repo.get_alert_by_id(original.id).await.unwrap();
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.frequency, 60);
    assert_eq!(updated.version, original.version + 1);
    assert_eq!(updated.state, AlertState::Error);
    assert_eq!(updated.new_state_date, errored.new_state_date);
    assert_eq!(updated.execution_error, "datasource timeout");
    assert_eq!(updated.created, original.created);
    assert!(updated.updated > original.updated);
}

#[tokio::test]
async fn unchanged_save_is_a_no_op() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1, 2]), &token).await.unwrap();
    let before = repo.query_alerts(&admin_query(&dash), &token).await.unwrap();

    let summary = repo.save_alerts(&save_cmd(&dash, &[1, 2]), &token).await.unwrap();
    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.updated + summary.inserted + summary.deleted, 0);
    assert_eq!(repo.query_alerts(&admin_query(&dash), &token).await.unwrap(), before);
}

#[tokio::test]
async fn save_rejects_alerts_of_another_dashboard() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();

    let mut cmd = save_cmd(&dash, &[1]);
    cmd.alerts[0].dashboard_id = dash.id + 1;
    let err = repo.save_alerts(&cmd, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let mut dup = save_cmd(&dash, &[1, 1]);
    dup.alerts[1].name = "second".to_string();
    let err = repo.save_alerts(&dup, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(repo.count_alerts().await.unwrap(), 0);
}

#[tokio::test]
async fn save_for_missing_dashboard_is_not_found() {
    let (_dir, repo, metrics) = setup().await;
    let cmd = SaveAlertsCommand {
        org_id: 1,
        dashboard_id: 4242,
        user_id: 1,
        alerts: vec![NewAlert::new(1, 4242, 1, "orphan")],
    };
    let err = repo.save_alerts(&cmd, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, AlertError::NotFound { entity: "dashboard", .. }));
    assert_eq!(metrics.writes_failed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dashboard_of_another_org_is_not_found() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();

    let err = repo.delete_dashboard(2, dash.id, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(repo.get_dashboard(2, dash.id).await.is_err());
    assert_eq!(repo.get_dashboard(1, dash.id).await.unwrap(), dash);
}

#[tokio::test]
async fn viewers_read_their_org_only() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1, 2]), &token).await.unwrap();

    let viewer = AlertsQuery::new(1, SignedInUser::new(1, OrgRole::Viewer));
    assert_eq!(repo.query_alerts(&viewer, &token).await.unwrap().len(), 2);

    let outsider = AlertsQuery::new(1, SignedInUser::new(2, OrgRole::Admin));
    let err = repo.query_alerts(&outsider, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn query_filters_combine() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    let mut cmd = save_cmd(&dash, &[1, 2, 3]);
    cmd.alerts[2].name = "disk full".to_string();
    repo.save_alerts(&cmd, &token).await.unwrap();

    let all = repo.query_alerts(&admin_query(&dash), &token).await.unwrap();
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    repo.set_alert_state(&SetAlertStateCommand::new(all[0].id, AlertState::Alerting), &token)
        .await
        .unwrap();

    let alerting = admin_query(&dash).states([AlertState::Alerting]);
    let found = repo.query_alerts(&alerting, &token).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, all[0].id);

    let by_name = admin_query(&dash).name_contains("disk");
    assert_eq!(repo.query_alerts(&by_name, &token).await.unwrap()[0].panel_id, 3);

    let by_panel = admin_query(&dash).panel(2);
    assert_eq!(repo.query_alerts(&by_panel, &token).await.unwrap().len(), 1);

    let limited = admin_query(&dash).limit(2);
    assert_eq!(repo.query_alerts(&limited, &token).await.unwrap().len(), 2);

    let states = repo.get_alert_states_for_dashboard(1, dash.id).await.unwrap();
    assert_eq!(states.len(), 3);
    assert_eq!(states[0].state, AlertState::Alerting);
}

#[tokio::test]
async fn cancelled_token_leaves_store_untouched() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    token.cancel();

    let err = repo.save_alerts(&save_cmd(&dash, &[1, 2]), &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(repo.count_alerts().await.unwrap(), 0);

    let err = repo.pause_all_alerts(true, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn pause_validates_and_scopes_to_org() {
    let (_dir, repo, metrics) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let foreign = dashboard(&repo, 2, "Foreign dashboard").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1]), &token).await.unwrap();
    repo.save_alerts(&save_cmd(&foreign, &[1]), &token).await.unwrap();
    let ours = repo.query_alerts(&admin_query(&dash), &token).await.unwrap()[0].id;
    let theirs = repo.query_alerts(&admin_query(&foreign), &token).await.unwrap()[0].id;

    let empty = PauseAlertCommand {
        org_id: 1,
        alert_ids: Vec::new(),
        paused: true,
    };
    assert_eq!(repo.pause_alert(&empty, &token).await.unwrap_err().kind(), ErrorKind::Invalid);

    let cmd = PauseAlertCommand {
        org_id: 1,
        alert_ids: vec![ours, theirs],
        paused: true,
    };
    assert_eq!(repo.pause_alert(&cmd, &token).await.unwrap(), 1);
    assert_eq!(repo.get_alert_by_id(ours).await.unwrap().state, AlertState::Paused);
    assert_eq!(repo.get_alert_by_id(theirs).await.unwrap().state, AlertState::Unknown);

    let err = repo
        .set_alert_state(&SetAlertStateCommand::new(ours, AlertState::Paused), &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(metrics.transitions_failed.load(Ordering::SeqCst), 0);

    let unpause = PauseAlertCommand::single(1, ours, false);
    assert_eq!(repo.pause_alert(&unpause, &token).await.unwrap(), 1);
    assert_eq!(repo.get_alert_by_id(ours).await.unwrap().state, AlertState::Unknown);
    assert_eq!(metrics.transitions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn set_state_on_missing_alert_is_not_found() {
    let (_dir, repo, metrics) = setup().await;
    let err = repo
        .set_alert_state(
            &SetAlertStateCommand::new(12345, AlertState::Ok),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(metrics.transitions_failed.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.backend_info.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pause_all_spans_organizations() {
    let (_dir, repo, _) = setup().await;
    let a = dashboard(&repo, 1, "Org one").await;
    let b = dashboard(&repo, 2, "Org two").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&a, &[1, 2]), &token).await.unwrap();
    repo.save_alerts(&save_cmd(&b, &[1]), &token).await.unwrap();

    assert_eq!(repo.pause_all_alerts(true, &token).await.unwrap(), 3);
    let all = repo.list_all_alerts().await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|a| a.state == AlertState::Paused));
    assert_eq!(ALL_ORGS, "all");
}

#[tokio::test]
async fn duplicate_dashboard_uid_conflicts() {
    let (_dir, repo, _) = setup().await;
    let token = CancellationToken::new();
    let new = NewDashboard {
        org_id: 1,
        title: "Ops".to_string(),
        uid: Some("ops-uid".to_string()),
    };
    repo.save_dashboard(&new, &token).await.unwrap();
    let err = repo.save_dashboard(&new, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let other_org = NewDashboard { org_id: 2, ..new };
    assert!(repo.save_dashboard(&other_org, &token).await.is_ok());
}

#[tokio::test]
async fn user_lifecycle() {
    let (_dir, repo, _) = setup().await;
    let cmd = CreateUserCommand {
        org_id: 1,
        login: "admin".to_string(),
        email: "admin@localhost".to_string(),
        is_admin: true,
        ..Default::default()
    };
    let user = repo.create_user(&cmd).await.unwrap();
    assert_eq!(user.name_or_fallback(), "admin");

    let err = repo.create_user(&cmd).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let found = repo.get_user_by_login("admin").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert!(repo.get_user_by_login("nobody").await.unwrap().is_none());

    assert!(repo.delete_user(user.id).await.unwrap());
    assert!(!repo.delete_user(user.id).await.unwrap());
    assert_eq!(repo.get_user_by_id(user.id).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn single_pause_and_unpause_always_advance_state_date() {
    let (_dir, repo, _) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1]), &token).await.unwrap();
    let id = repo.query_alerts(&admin_query(&dash), &token).await.unwrap()[0].id;
    let mut last = repo.get_alert_by_id(id).await.unwrap().new_state_date;

    for (paused, expected) in [
        (true, AlertState::Paused),
        (true, AlertState::Paused),
        (false, AlertState::Unknown),
    ] {
        let cmd = PauseAlertCommand::single(1, id, paused);
        assert_eq!(repo.pause_alert(&cmd, &token).await.unwrap(), 1);
        let alert = repo.get_alert_by_id(id).await.unwrap();
        assert_eq!(alert.state, expected);
        assert!(alert.new_state_date > last);
        last = alert.new_state_date;
    }
}

#[tokio::test]
async fn failed_save_rolls_back_deletes_and_updates() {
    let (_dir, repo, metrics) = setup().await;
    let dash = dashboard(&repo, 1, "Dashboard with alerts").await;
    let token = CancellationToken::new();
    repo.save_alerts(&save_cmd(&dash, &[1, 2]), &token).await.unwrap();
    let before = repo.query_alerts(&admin_query(&dash), &token).await.unwrap();

    repo.db()
        .execute_unprepared(
            "CREATE TRIGGER reject_panel_3 BEFORE INSERT ON alerts WHEN NEW.panel_id = 3 \
             BEGIN SELECT RAISE(ABORT, 'panel 3 rejected'); END;",
        )
        .await
        .unwrap();

    // panel 2 is deleted and panel 1 updated before the insert of panel 3 fails
    let mut cmd = save_cmd(&dash, &[1, 3]);
    cmd.alerts[0].name = "renamed".to_string();
    let err = repo.save_alerts(&cmd, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(metrics.writes_failed.load(Ordering::SeqCst), 1);

    let after = repo.query_alerts(&admin_query(&dash), &token).await.unwrap();
    assert_eq!(after, before);
    let rows: Vec<(i64, String)> = after.iter().map(|a| (a.panel_id, a.name.clone())).collect();
    assert_eq!(
        rows,
        vec![(1, "panel 1".to_string()), (2, "panel 2".to_string())]
    );
}
