use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, Set};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entities::user;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
        }
    }
}

pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    format!("{digest:x}")
}

impl User {
    pub async fn exists<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let count = user::Entity::find_by_id(id).count(db).await?;
        Ok(count > 0)
    }

    /// Inserts user `id` with `secret`, or rotates the secret if the user exists.
    pub async fn ensure<C: ConnectionTrait>(db: &C, id: i64, secret: &str) -> Result<Self, DbErr> {
        let secret_hash = hash_secret(secret);
        match user::Entity::find_by_id(id).one(db).await? {
            Some(record) if record.secret_hash == secret_hash => Ok(Self::from(record)),
            Some(record) => {
                let mut active: user::ActiveModel = record.into();
                active.secret_hash = Set(secret_hash);
                let updated = active.update(db).await?;
                tracing::info!(user_id = id, "Rotated user secret");
                Ok(Self::from(updated))
            }
            None => {
                let active = user::ActiveModel {
                    id: Set(id),
                    secret_hash: Set(secret_hash),
                    created_at: Set(Utc::now()),
                };
                let model = active.insert(db).await?;
                Ok(Self::from(model))
            }
        }
    }

    /// Returns the user when `secret` matches the stored digest.
    pub async fn authenticate<C: ConnectionTrait>(
        db: &C,
        id: i64,
        secret: &str,
    ) -> Result<Option<Self>, DbErr> {
        let Some(record) = user::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };
        if record.secret_hash != hash_secret(secret) {
            return Ok(None);
        }
        Ok(Some(Self::from(record)))
    }
}
