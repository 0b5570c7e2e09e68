//! SQLite connection pool and schema migrations.

mod json_array;

pub use json_array::JsonArray;

use crate::error::StorageError;
use log::{debug, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// Subject ids are only unique within one identity provider.
const USERS_COLUMNS: &str = "(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        provider TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, provider)
    )";

const CREATE_RECIPES: &str = "
    CREATE TABLE IF NOT EXISTS recipes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        ingredients TEXT NOT NULL,
        number_of_ingredients INTEGER NOT NULL,
        directions TEXT NOT NULL,
        prep_time TEXT NOT NULL,
        cook_time TEXT NOT NULL,
        servings INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )";

const CREATE_RECIPES_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_recipes_user_id ON recipes (user_id)";

/// Columns added after the first release: (table, column, statement).
///
/// SQLite has no `ADD COLUMN IF NOT EXISTS`, so each one is applied only when
/// `PRAGMA table_info` does not list it yet.
const COLUMN_MIGRATIONS: &[(&str, &str, &str)] = &[(
    "recipes",
    "notes",
    "ALTER TABLE recipes ADD COLUMN notes TEXT NOT NULL DEFAULT ''",
)];

/// Shared handle to the recipe database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `path` and bring the schema up to date.
    pub async fn connect(
        path: impl AsRef<Path>,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Concurrent requests otherwise hit transient "database is locked" errors.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Opened recipe database at {}", path.display());

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    /// Single-connection in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create missing tables, rekey a legacy `users` table and apply additive
    /// column migrations. Idempotent.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let create_users = format!("CREATE TABLE IF NOT EXISTS users {}", USERS_COLUMNS);
        for statement in [create_users.as_str(), CREATE_RECIPES, CREATE_RECIPES_OWNER_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        if self.users_keyed_by_subject_only().await? {
            self.rebuild_users_with_identity_key().await?;
        }

        for &(table, column, statement) in COLUMN_MIGRATIONS {
            if self.column_exists(table, column).await? {
                continue;
            }
            debug!("Adding column {}.{}", table, column);
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, StorageError> {
        let columns: Vec<(i32, String, String, i32, Option<String>, i32)> =
            sqlx::query_as(&format!("PRAGMA table_info({})", table))
                .fetch_all(&self.pool)
                .await?;

        Ok(columns.iter().any(|(_, name, _, _, _, _)| name == column))
    }

    /// True for databases created when `users.user_id` alone was unique.
    async fn users_keyed_by_subject_only(&self) -> Result<bool, StorageError> {
        let indexes: Vec<(i64, String, i64, String, i64)> =
            sqlx::query_as("PRAGMA index_list(users)")
                .fetch_all(&self.pool)
                .await?;

        for (_, name, unique, _, _) in &indexes {
            if *unique != 1 {
                continue;
            }
            let columns: Vec<(i64, i64, Option<String>)> =
                sqlx::query_as(&format!("PRAGMA index_info(\"{}\")", name))
                    .fetch_all(&self.pool)
                    .await?;

            if columns.len() == 1 && columns[0].2.as_deref() == Some("user_id") {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// SQLite cannot drop a column constraint, so the table is copied into one
    /// keyed by `(user_id, provider)`. Ids are kept, so recipe owners stay valid.
    async fn rebuild_users_with_identity_key(&self) -> Result<(), StorageError> {
        info!("Rekeying users by (user_id, provider)");

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("CREATE TABLE users_rekeyed {}", USERS_COLUMNS))
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO users_rekeyed (id, user_id, provider, created_at, updated_at)
             SELECT id, user_id, provider, created_at, updated_at FROM users",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("DROP TABLE users").execute(&mut *tx).await?;
        sqlx::query("ALTER TABLE users_rekeyed RENAME TO users")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_in_memory_schema_has_notes_column() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.column_exists("recipes", "notes").await.unwrap());
        assert!(db.column_exists("users", "provider").await.unwrap());
        assert!(!db.column_exists("recipes", "rating").await.unwrap());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
        assert!(db.column_exists("recipes", "notes").await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recipes.db");

        // Schema as it looked before the notes column existed.
        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .unwrap();
            sqlx::query(CREATE_RECIPES).execute(&pool).await.unwrap();
            sqlx::query(
                "INSERT INTO recipes (user_id, title, ingredients, number_of_ingredients, directions, prep_time, cook_time, servings)
                 VALUES (1, 'Old Bread', '[\"flour\"]', 1, '[\"bake\"]', '', '', 2)",
            )
            .execute(&pool)
            .await
            .unwrap();
            pool.close().await;
        }

        let db = Database::connect(&path, 2).await.unwrap();
        let row = sqlx::query("SELECT title, notes FROM recipes")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("title"), "Old Bread");
        assert_eq!(row.get::<String, _>("notes"), "");
        db.close().await;

        // Reopening must not try to add the column again.
        let reopened = Database::connect(&path, 2).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_connect_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("recipes.db");

        let db = Database::connect(&path, 1).await.unwrap();
        assert!(path.exists());
        assert!(db.column_exists("recipes", "notes").await.unwrap());
        db.close().await;
    }

    #[tokio::test]
    async fn test_users_are_keyed_by_subject_and_provider() {
        let db = Database::in_memory().await.unwrap();
        assert!(!db.users_keyed_by_subject_only().await.unwrap());

        for provider in ["google", "github"] {
            sqlx::query("INSERT INTO users (user_id, provider) VALUES ('12345', ?)")
                .bind(provider)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let duplicate = sqlx::query("INSERT INTO users (user_id, provider) VALUES ('12345', 'google')")
            .execute(db.pool())
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_legacy_users_table_is_rekeyed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.db");

        // Users table as it looked when the subject id alone was unique.
        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .unwrap();
            sqlx::query(
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE,
                    provider TEXT NOT NULL,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
                )",
            )
            .execute(&pool)
            .await
            .unwrap();
            sqlx::query("INSERT INTO users (id, user_id, provider) VALUES (7, '12345', 'google')")
                .execute(&pool)
                .await
                .unwrap();
            pool.close().await;
        }

        let db = Database::connect(&path, 1).await.unwrap();
        assert!(!db.users_keyed_by_subject_only().await.unwrap());

        let kept: (i64, String) =
            sqlx::query_as("SELECT id, provider FROM users WHERE user_id = '12345'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(kept, (7, "google".to_string()));

        sqlx::query("INSERT INTO users (user_id, provider) VALUES ('12345', 'github')")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let reopened = Database::connect(&path, 1).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
