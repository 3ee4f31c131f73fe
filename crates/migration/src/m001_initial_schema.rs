use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // dashboards before alerts
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY NOT NULL,
    org_id INTEGER NOT NULL,
    login TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL DEFAULT '',
    is_admin INTEGER NOT NULL DEFAULT 0,
    is_disabled INTEGER NOT NULL DEFAULT 0,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_org_id ON users(org_id);

CREATE TABLE IF NOT EXISTS dashboards (
    id INTEGER PRIMARY KEY NOT NULL,
    org_id INTEGER NOT NULL,
    uid TEXT NOT NULL,
    slug TEXT NOT NULL,
    title TEXT NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_dashboards_org_uid ON dashboards(org_id, uid);

CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    org_id INTEGER NOT NULL,
    dashboard_id INTEGER NOT NULL REFERENCES dashboards(id) ON DELETE CASCADE,
    panel_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    severity TEXT NOT NULL DEFAULT '',
    settings TEXT NOT NULL DEFAULT '{}',
    frequency INTEGER NOT NULL,
    for_secs INTEGER NOT NULL DEFAULT 0,
    eval_data TEXT,
    eval_date TEXT,
    execution_error TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT 'unknown',
    new_state_date TEXT NOT NULL,
    state_changes INTEGER NOT NULL DEFAULT 0,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_alerts_org_dashboard_panel ON alerts(org_id, dashboard_id, panel_id);
CREATE INDEX IF NOT EXISTS idx_alerts_org_dashboard ON alerts(org_id, dashboard_id);
CREATE INDEX IF NOT EXISTS idx_alerts_state ON alerts(state);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alerts;
DROP TABLE IF EXISTS dashboards;
DROP TABLE IF EXISTS users;
";
