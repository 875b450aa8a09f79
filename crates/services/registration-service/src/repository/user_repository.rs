//! SeaORM-backed user directory.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, SqlErr};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::client::UserDirectory;
use common::{AppError, AppResult};
use domain::{RegistrationProfile, User};

/// Concrete implementation of UserDirectory over the users table
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        result
            .map(User::try_from)
            .transpose()
            .map_err(|e| AppError::persistence(format!("corrupt user row: {e}")))
    }

    async fn create(&self, profile: RegistrationProfile) -> AppResult<User> {
        let active_model = ActiveModel::from_profile(Uuid::new_v4(), profile, chrono::Utc::now());

        let model = active_model.insert(&self.db).await.map_err(insert_error)?;
        User::try_from(model).map_err(|e| AppError::persistence(format!("corrupt user row: {e}")))
    }
}

fn insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::conflict("User with this email already exists")
        }
        _ => AppError::persistence(err.to_string()),
    }
}
