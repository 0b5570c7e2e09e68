use crate::database::Database;
use crate::error::StorageError;
use crate::model::{ProviderIdentity, User};
use chrono::Utc;
use log::info;
use sqlx::sqlite::SqlitePool;

const SELECT_USER: &str = "SELECT id, user_id, provider, created_at, updated_at FROM users";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Look a user up by internal id.
    pub async fn get(&self, id: i64) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Look a user up by the subject id `provider` issued. The same subject
    /// under another provider is a different user.
    pub async fn get_by_provider_id(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{} WHERE user_id = ? AND provider = ?",
            SELECT_USER
        ))
        .bind(user_id)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Register a new user. Fails when the identity is already registered.
    pub async fn create(&self, identity: &ProviderIdentity) -> Result<User, StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO users (user_id, provider, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&identity.user_id)
        .bind(&identity.provider)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Registered user {} via {}", user.id, user.provider);
        Ok(user)
    }

    /// Resolve `identity` to a user, registering it on first sight.
    pub async fn find_or_create(&self, identity: &ProviderIdentity) -> Result<User, StorageError> {
        if let Some(user) = self
            .get_by_provider_id(&identity.user_id, &identity.provider)
            .await?
        {
            return Ok(user);
        }

        match self.create(identity).await {
            Ok(user) => Ok(user),
            // Another sign-in registered the same subject between lookup and insert.
            Err(StorageError::Database(sqlx::Error::Database(e))) if e.is_unique_violation() => self
                .get_by_provider_id(&identity.user_id, &identity.provider)
                .await?
                .ok_or(StorageError::Database(sqlx::Error::RowNotFound)),
            Err(e) => Err(e),
        }
    }
}
