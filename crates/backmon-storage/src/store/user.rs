use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use backmon_common::types::User;

use crate::entities::user::{self, Column, Entity};
use crate::error::Result;
use crate::store::DbStorage;
use crate::NewUser;

fn to_user(m: user::Model) -> User {
    User {
        id: m.id,
        username: m.username,
        password: m.password,
        role: m.role,
    }
}

impl DbStorage {
    pub(crate) async fn get_user_impl(&self, id: i32) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_user))
    }

    pub(crate) async fn get_user_by_username_impl(&self, username: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Username.eq(username))
            .one(self.db())
            .await?;
        Ok(model.map(to_user))
    }

    pub(crate) async fn create_user_impl(&self, new: NewUser) -> Result<User> {
        let am = user::ActiveModel {
            username: Set(new.username),
            password: Set(new.password),
            role: Set(new.role),
            ..Default::default()
        };
        Ok(to_user(am.insert(self.db()).await?))
    }
}
