use crate::db::models::{DbProfile, encode_timestamp};
use crate::db::schema::SQLITE_INIT;
use crate::error::VaultError;
use crate::types::ids::{PrincipalId, ProfileId};
use crate::types::profile::ConnectionProfile;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::str::FromStr;
use std::time::Duration;

pub type SqlitePool = Pool<Sqlite>;

// Writers take the RESERVED lock up front; a deferred read-then-write
// transaction cannot wait on a busy lock and fails immediately instead.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_PROFILE: &str = r#"SELECT id, owner_id, name, kind, host, port, database_name,
       username, encrypted_secret, created_at, updated_at
       FROM user_connections"#;

/// Row-level access to `principals` and `user_connections`.
///
/// Knows nothing about ownership rules; callers pass the checks to run
/// inside each transaction.
#[derive(Clone)]
pub struct ProfilesStorage {
    pool: SqlitePool,
}

impl ProfilesStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool with foreign keys enforced and create the schema.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, VaultError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(connect_opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), VaultError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Returns true when the principal was not known before.
    pub async fn insert_principal(
        &self,
        id: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<bool, VaultError> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_principal(&mut *conn, id, now).await
    }

    /// Delete the principal; the FK cascade removes its profiles.
    /// Returns how many profiles went with it, or `None` if it was unknown.
    pub async fn delete_principal(&self, id: PrincipalId) -> Result<Option<u64>, VaultError> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let (profiles,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_connections WHERE owner_id = ?")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        let deleted = sqlx::query("DELETE FROM principals WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok((deleted > 0).then_some(profiles.max(0) as u64))
    }

    /// Insert a profile, registering its owner first if needed.
    pub async fn insert(&self, profile: &ConnectionProfile) -> Result<(), VaultError> {
        let row = DbProfile::from(profile);
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        Self::ensure_principal(&mut *tx, profile.owner_id, profile.created_at).await?;
        sqlx::query(
            r#"
            INSERT INTO user_connections (
                id, owner_id, name, kind, host, port, database_name,
                username, encrypted_secret, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.id)
        .bind(row.owner_id)
        .bind(row.name)
        .bind(row.kind)
        .bind(row.host)
        .bind(row.port)
        .bind(row.database_name)
        .bind(row.username)
        .bind(row.encrypted_secret)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: ProfileId) -> Result<Option<ConnectionProfile>, VaultError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut *conn, id).await
    }

    /// Newest first; equal timestamps fall back to insertion order.
    pub async fn list_by_owner(
        &self,
        owner: PrincipalId,
    ) -> Result<Vec<ConnectionProfile>, VaultError> {
        let rows: Vec<DbProfile> = sqlx::query_as(&format!(
            "{SELECT_PROFILE} WHERE owner_id = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| ConnectionProfile::try_from(row).map_err(VaultError::from))
            .collect()
    }

    /// Read-modify-write in one transaction. `modify` sees the stored row and
    /// returns the row to persist; an error aborts without writing.
    pub async fn update_with<F>(&self, id: ProfileId, modify: F) -> Result<ConnectionProfile, VaultError>
    where
        F: FnOnce(ConnectionProfile) -> Result<ConnectionProfile, VaultError>,
    {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let current = Self::fetch_by_id(&mut *tx, id)
            .await?
            .ok_or(VaultError::NotFound)?;
        let next = modify(current)?;
        let row = DbProfile::from(&next);
        sqlx::query(
            r#"UPDATE user_connections SET
                name = ?,
                kind = ?,
                host = ?,
                port = ?,
                database_name = ?,
                username = ?,
                encrypted_secret = ?,
                updated_at = ?
              WHERE id = ?"#,
        )
        .bind(row.name)
        .bind(row.kind)
        .bind(row.host)
        .bind(row.port)
        .bind(row.database_name)
        .bind(row.username)
        .bind(row.encrypted_secret)
        .bind(row.updated_at)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(next)
    }

    /// Delete after `check` approves the stored row. Returns the removed row.
    pub async fn delete_with<F>(&self, id: ProfileId, check: F) -> Result<ConnectionProfile, VaultError>
    where
        F: FnOnce(&ConnectionProfile) -> Result<(), VaultError>,
    {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let current = Self::fetch_by_id(&mut *tx, id)
            .await?
            .ok_or(VaultError::NotFound)?;
        check(&current)?;
        sqlx::query("DELETE FROM user_connections WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(current)
    }

    async fn fetch_by_id(
        conn: &mut SqliteConnection,
        id: ProfileId,
    ) -> Result<Option<ConnectionProfile>, VaultError> {
        let row: Option<DbProfile> = sqlx::query_as(&format!("{SELECT_PROFILE} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(ConnectionProfile::try_from).transpose()?)
    }

    async fn ensure_principal(
        conn: &mut SqliteConnection,
        id: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<bool, VaultError> {
        let inserted = sqlx::query(
            "INSERT INTO principals (id, created_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(id.to_string())
        .bind(encode_timestamp(&now))
        .execute(&mut *conn)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }
}
