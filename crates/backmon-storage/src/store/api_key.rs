use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};

use backmon_common::types::ApiKey;

use crate::entities::api_key::{self, Column, Entity};
use crate::error::Result;
use crate::store::DbStorage;
use crate::{ApiKeyUpdate, NewApiKey};

fn to_api_key(m: api_key::Model) -> ApiKey {
    ApiKey {
        id: m.id,
        key: m.key,
        name: m.name,
        device_id: m.device_id,
        created_at: m.created_at.with_timezone(&Utc),
        expires_at: m.expires_at.map(|t| t.with_timezone(&Utc)),
        last_used: m.last_used.map(|t| t.with_timezone(&Utc)),
        is_active: m.is_active,
    }
}

impl DbStorage {
    pub(crate) async fn get_api_keys_impl(&self) -> Result<Vec<ApiKey>> {
        let rows = Entity::find().order_by_asc(Column::Id).all(self.db()).await?;
        Ok(rows.into_iter().map(to_api_key).collect())
    }

    pub(crate) async fn get_api_key_impl(&self, id: i32) -> Result<Option<ApiKey>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_api_key))
    }

    pub(crate) async fn get_api_key_by_value_impl(&self, key: &str) -> Result<Option<ApiKey>> {
        let model = Entity::find()
            .filter(Column::Key.eq(key))
            .one(self.db())
            .await?;
        Ok(model.map(to_api_key))
    }

    pub(crate) async fn create_api_key_impl(&self, new: NewApiKey) -> Result<ApiKey> {
        let am = api_key::ActiveModel {
            key: Set(new.key),
            name: Set(new.name),
            device_id: Set(new.device_id),
            created_at: Set(Utc::now().fixed_offset()),
            expires_at: Set(new.expires_at.map(|t| t.fixed_offset())),
            last_used: Set(None),
            is_active: Set(new.is_active),
            ..Default::default()
        };
        Ok(to_api_key(am.insert(self.db()).await?))
    }

    pub(crate) async fn update_api_key_impl(
        &self,
        id: i32,
        update: ApiKeyUpdate,
    ) -> Result<Option<ApiKey>> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut active: api_key::ActiveModel = model.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(device_id) = update.device_id {
            active.device_id = Set(Some(device_id));
        }
        if let Some(expires_at) = update.expires_at {
            active.expires_at = Set(Some(expires_at.fixed_offset()));
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        let updated = active.update(self.db()).await?;
        Ok(Some(to_api_key(updated)))
    }

    pub(crate) async fn delete_api_key_impl(&self, id: i32) -> Result<bool> {
        let result = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(result.rows_affected > 0)
    }

    pub(crate) async fn validate_api_key_impl(&self, key: &str) -> Result<bool> {
        let Some(model) = Entity::find()
            .filter(Column::Key.eq(key))
            .one(self.db())
            .await?
        else {
            tracing::debug!("api key rejected: unknown key");
            return Ok(false);
        };

        if !model.is_active {
            tracing::debug!(key_id = model.id, "api key rejected: inactive");
            return Ok(false);
        }
        let now = Utc::now();
        if let Some(expires_at) = model.expires_at {
            if expires_at.with_timezone(&Utc) < now {
                tracing::debug!(key_id = model.id, "api key rejected: expired");
                return Ok(false);
            }
        }

        let mut active: api_key::ActiveModel = model.into();
        active.last_used = Set(Some(now.fixed_offset()));
        active.update(self.db()).await?;
        Ok(true)
    }
}
