use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};

use backmon_common::types::Device;

use crate::entities::device::{self, Column, Entity};
use crate::error::Result;
use crate::store::DbStorage;
use crate::NewDevice;

pub(crate) fn to_device(m: device::Model) -> Device {
    Device {
        id: m.id,
        hostname: m.hostname,
        ip: m.ip,
        device_type: m.device_type,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

/// Exact, case-sensitive lookup. Generic over the connection so the
/// ingestion transaction can reuse it.
pub(crate) async fn find_by_hostname<C: ConnectionTrait>(
    conn: &C,
    hostname: &str,
) -> Result<Option<Device>> {
    let model = Entity::find()
        .filter(Column::Hostname.eq(hostname))
        .one(conn)
        .await?;
    Ok(model.map(to_device))
}

pub(crate) async fn insert<C: ConnectionTrait>(conn: &C, new: &NewDevice) -> Result<Device> {
    let am = device::ActiveModel {
        hostname: Set(new.hostname.clone()),
        ip: Set(new.ip.clone()),
        device_type: Set(new.device_type.clone()),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    Ok(to_device(am.insert(conn).await?))
}

impl DbStorage {
    pub(crate) async fn get_devices_impl(&self) -> Result<Vec<Device>> {
        let rows = Entity::find().order_by_asc(Column::Id).all(self.db()).await?;
        Ok(rows.into_iter().map(to_device).collect())
    }

    pub(crate) async fn get_device_impl(&self, id: i32) -> Result<Option<Device>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_device))
    }
}
