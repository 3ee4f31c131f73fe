use chrono::Utc;
use dashalert_common::types::User;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::user::{self, Column, Entity};
use crate::error::{map_write_err, AlertError, Result};
use crate::store::AlertRepository;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserCommand {
    pub org_id: i64,
    pub login: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_disabled: bool,
}

fn to_user(m: user::Model) -> User {
    User {
        id: m.id,
        org_id: m.org_id,
        login: m.login,
        email: m.email,
        name: m.name,
        is_admin: m.is_admin,
        is_disabled: m.is_disabled,
        created: m.created.with_timezone(&Utc),
        updated: m.updated.with_timezone(&Utc),
    }
}

impl AlertRepository {
    pub async fn create_user(&self, cmd: &CreateUserCommand) -> Result<User> {
        if cmd.login.trim().is_empty() && cmd.email.trim().is_empty() {
            return Err(AlertError::Invalid(
                "user needs a login or an email".to_string(),
            ));
        }
        // login falls back to email
        let login = if cmd.login.trim().is_empty() {
            cmd.email.clone()
        } else {
            cmd.login.clone()
        };
        let now = self.clock().now().fixed_offset();
        let am = user::ActiveModel {
            id: Set(dashalert_common::id::next_id()),
            org_id: Set(cmd.org_id),
            login: Set(login.clone()),
            email: Set(cmd.email.clone()),
            name: Set(cmd.name.clone()),
            is_admin: Set(cmd.is_admin),
            is_disabled: Set(cmd.is_disabled),
            created: Set(now),
            updated: Set(now),
        };
        let model = am
            .insert(self.db())
            .await
            .map_err(|e| map_write_err(e, || format!("user already exists: {login}")))?;
        Ok(to_user(model))
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Login.eq(login))
            .one(self.db())
            .await?;
        Ok(model.map(to_user))
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<User> {
        Entity::find_by_id(id)
            .one(self.db())
            .await?
            .map(to_user)
            .ok_or_else(|| AlertError::not_found("user", id))
    }

    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}
