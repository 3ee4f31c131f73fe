use chrono::Utc;
use dashalert_common::text::{short_uid, slugify};
use dashalert_common::types::Dashboard;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::entities::alert;
use crate::entities::dashboard::{self, Column, Entity};
use crate::error::{map_write_err, AlertError, Result};
use crate::store::{cancellable, ensure_not_cancelled, AlertRepository};

/// Dashboard creation request. A missing `uid` is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDashboard {
    pub org_id: i64,
    pub title: String,
    #[serde(default)]
    pub uid: Option<String>,
}

fn to_dashboard(m: dashboard::Model) -> Dashboard {
    Dashboard {
        id: m.id,
        org_id: m.org_id,
        uid: m.uid,
        slug: m.slug,
        title: m.title,
        created: m.created.with_timezone(&Utc),
        updated: m.updated.with_timezone(&Utc),
    }
}

impl AlertRepository {
    pub async fn save_dashboard(
        &self,
        new: &NewDashboard,
        token: &CancellationToken,
    ) -> Result<Dashboard> {
        if new.title.trim().is_empty() {
            return Err(AlertError::Invalid("dashboard title must not be empty".to_string()));
        }
        let uid = new.uid.clone().unwrap_or_else(short_uid);
        cancellable(token, async {
            let now = self.clock().now().fixed_offset();
            let am = dashboard::ActiveModel {
                id: Set(dashalert_common::id::next_id()),
                org_id: Set(new.org_id),
                uid: Set(uid.clone()),
                slug: Set(slugify(&new.title)),
                title: Set(new.title.clone()),
                created: Set(now),
                updated: Set(now),
            };
            let model = am.insert(self.db()).await.map_err(|e| {
                map_write_err(e, || {
                    format!("dashboard uid '{uid}' already exists in org {}", new.org_id)
                })
            })?;
            tracing::info!(org_id = new.org_id, id = model.id, slug = %model.slug, "Dashboard created");
            Ok::<_, AlertError>(to_dashboard(model))
        })
        .await
    }

    pub async fn get_dashboard(&self, org_id: i64, id: i64) -> Result<Dashboard> {
        Entity::find_by_id(id)
            .filter(Column::OrgId.eq(org_id))
            .one(self.db())
            .await?
            .map(to_dashboard)
            .ok_or_else(|| AlertError::not_found("dashboard", id))
    }

    /// Deletes a dashboard together with all of its alerts in one transaction.
    ///
    /// Returns the number of alerts removed.
    pub async fn delete_dashboard(
        &self,
        org_id: i64,
        dashboard_id: i64,
        token: &CancellationToken,
    ) -> Result<u64> {
        let org = org_id.to_string();
        let started = Instant::now();
        let result = cancellable(token, async {
            let txn = self.db().begin().await?;
            Entity::find_by_id(dashboard_id)
                .filter(Column::OrgId.eq(org_id))
                .one(&txn)
                .await?
                .ok_or_else(|| AlertError::not_found("dashboard", dashboard_id))?;

            let removed = alert::Entity::delete_many()
                .filter(alert::Column::OrgId.eq(org_id))
                .filter(alert::Column::DashboardId.eq(dashboard_id))
                .exec(&txn)
                .await?;
            Entity::delete_by_id(dashboard_id).exec(&txn).await?;

            ensure_not_cancelled(token)?;
            txn.commit().await?;
            Ok::<_, AlertError>(removed.rows_affected)
        })
        .await;
        self.observe_write(&org, started, result.is_ok());

        let removed = result?;
        tracing::info!(org_id, dashboard_id, alerts_removed = removed, "Dashboard deleted");
        Ok(removed)
    }
}
