mod common;

use dashalert_common::types::{AlertState, NewAlert};
use dashalert_server::commands;
use dashalert_storage::{NewDashboard, SaveAlertsCommand};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn pause_commands_update_the_report() {
    let ctx = common::build_test_context().unwrap();
    let repo = commands::open_repository(&ctx.config).await.unwrap();
    let token = CancellationToken::new();

    let dash = repo
        .save_dashboard(
            &NewDashboard {
                org_id: 1,
                title: "Ops".to_string(),
                uid: None,
            },
            &token,
        )
        .await
        .unwrap();
    let cmd = SaveAlertsCommand {
        org_id: 1,
        dashboard_id: dash.id,
        user_id: 1,
        alerts: vec![
            NewAlert::new(1, dash.id, 1, "cpu"),
            NewAlert::new(1, dash.id, 2, "disk"),
        ],
    };
    repo.save_alerts(&cmd, &token).await.unwrap();
    assert_eq!(
        commands::report(&repo).await.unwrap(),
        commands::StoreReport { alerts: 2, paused: 0 }
    );

    assert_eq!(commands::pause_all(&repo, true, &token).await.unwrap(), 2);
    assert_eq!(commands::report(&repo).await.unwrap().paused, 2);

    let id = repo.list_all_alerts().await.unwrap()[0].id;
    assert_eq!(commands::pause(&repo, 1, vec![id], false, &token).await.unwrap(), 1);
    assert_eq!(repo.get_alert_by_id(id).await.unwrap().state, AlertState::Unknown);
    assert_eq!(commands::pause(&repo, 2, vec![id], true, &token).await.unwrap(), 0);
}

#[test]
fn parse_ids_rejects_garbage() {
    let ids = commands::parse_ids(&["1".to_string(), "42".to_string()]).unwrap();
    assert_eq!(ids, vec![1, 42]);
    assert!(commands::parse_ids(&["x".to_string()]).is_err());
}

#[test]
fn check_provisioning_normalises_a_group() {
    let group = r#"{
        "title": "hosts",
        "folderUid": "infra",
        "interval": 60,
        "rules": [{
            "uid": "cpu-high",
            "orgID": 1,
            "folderUID": "infra",
            "ruleGroup": "hosts",
            "title": "CPU high",
            "condition": "A",
            "data": [{"refId": "A", "datasourceUid": "prom", "model": {"expr": "up"}}],
            "noDataState": "OK",
            "execErrState": "Alerting",
            "for": 60000000000
        }]
    }"#;
    let out = commands::check_provisioning(group).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["rules"][0]["for"], 60_000_000_000i64);
    assert_eq!(value["rules"][0]["provenance"], "");

    let bad = group.replace("\"OK\"", "\"Sometimes\"");
    assert!(commands::check_provisioning(&bad).is_err());
}
