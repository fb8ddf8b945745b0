use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait, QueryOrder, QuerySelect,
};

use backmon_common::types::{Alert, Severity};

use crate::entities::alert::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::DbStorage;
use crate::NewAlert;

pub(crate) fn to_alert(m: alert::Model) -> Result<Alert> {
    let severity = m
        .severity
        .parse::<Severity>()
        .map_err(|_| StorageError::InvalidValue {
            column: "severity",
            value: m.severity.clone(),
        })?;
    Ok(Alert {
        id: m.id,
        device_id: m.device_id,
        title: m.title,
        message: m.message,
        severity,
        time: m.time.with_timezone(&Utc),
        is_read: m.is_read,
    })
}

pub(crate) async fn insert<C: ConnectionTrait>(conn: &C, new: &NewAlert) -> Result<Alert> {
    let am = alert::ActiveModel {
        device_id: Set(new.device_id),
        title: Set(new.title.clone()),
        message: Set(new.message.clone()),
        severity: Set(new.severity.to_string()),
        time: Set(new.time.fixed_offset()),
        is_read: Set(false),
        ..Default::default()
    };
    to_alert(am.insert(conn).await?)
}

impl DbStorage {
    pub(crate) async fn get_alerts_impl(&self) -> Result<Vec<Alert>> {
        let rows = Entity::find()
            .order_by_desc(Column::Time)
            .order_by_desc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_alert).collect()
    }

    pub(crate) async fn get_recent_alerts_impl(&self, limit: usize) -> Result<Vec<Alert>> {
        let rows = Entity::find()
            .order_by_desc(Column::Time)
            .order_by_desc(Column::Id)
            .limit(limit as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_alert).collect()
    }

    pub(crate) async fn mark_alert_as_read_impl(&self, id: i32) -> Result<Option<Alert>> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        // Marking an already-read alert is a no-op, not an error.
        if model.is_read {
            return Ok(Some(to_alert(model)?));
        }
        let mut active: alert::ActiveModel = model.into();
        active.is_read = Set(true);
        let updated = active.update(self.db()).await?;
        Ok(Some(to_alert(updated)?))
    }
}
