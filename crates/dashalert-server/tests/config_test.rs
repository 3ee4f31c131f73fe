use dashalert_server::config::ServerConfig;

#[test]
fn empty_config_takes_defaults() {
    let config = ServerConfig::from_toml("").unwrap();
    assert_eq!(config.database.data_dir, "data");
    assert_eq!(
        config.database.connection_url(),
        "sqlite://data/dashalert.db?mode=rwc"
    );
    assert_eq!(config.id.machine_id, 1);
    assert!(!config.metrics.enabled);
    assert_eq!(config.log_directive(), "dashalert=info");
}

#[test]
fn explicit_sections_are_parsed() {
    let config = ServerConfig::from_toml(
        r#"
log_level = "dashalert=debug"

[database]
url = "postgres://alert:secret@db:5432/alerts"

[id]
machine_id = 3
node_id = 7

[metrics]
enabled = true
listen_addr = "127.0.0.1:9464"
"#,
    )
    .unwrap();
    assert_eq!(config.log_directive(), "dashalert=debug");
    assert_eq!(config.id.node_id, 7);
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.listen_addr.unwrap().port(), 9464);
    assert_eq!(
        config.database.redacted_url(),
        "postgres://alert:***@db:5432/alerts"
    );
}

#[test]
fn out_of_range_snowflake_ids_are_rejected() {
    let err = ServerConfig::from_toml("[id]\nmachine_id = 40\n").unwrap_err();
    assert!(err.to_string().contains("machine_id"));
}

#[test]
fn load_reports_missing_file() {
    let err = ServerConfig::load("/nonexistent/dashalert.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
