//! CRUD over the encrypted `credentials` table.

use std::path::{Path, PathBuf};

use {
    chrono::{DateTime, Utc},
    sqlx::SqlitePool,
    tracing::{debug, info},
};

use crate::{
    db::{self, OpenMode},
    error::{Result, StoreError},
    models::{CredentialPatch, CredentialRecord, NewCredential},
};

type CredentialRow = (String, String, String, Option<String>, i64, i64);

const SELECT_COLUMNS: &str = "id, username, password, website, created_at_ms, updated_at_ms";

/// An open handle to the encrypted credential database.
///
/// Cheap to clone; clones share the connection pool. Each write is a single
/// statement, so SQLite's single-writer lock serialises concurrent callers.
#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl CredentialStore {
    /// Create a brand-new encrypted database at `path`.
    ///
    /// Anything already at `path` is deleted first: a new key means a new
    /// store, and a plaintext or differently-keyed file would be unreadable.
    pub async fn create(path: &Path, key: &[u8; 32]) -> Result<Self> {
        let pool = db::connect(path, key, OpenMode::Fresh).await?;
        crate::run_migrations(&pool).await?;
        info!(path = %path.display(), "created encrypted credential store");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing encrypted database.
    ///
    /// Fails with [`StoreError::Missing`] when there is no file and
    /// [`StoreError::WrongKey`] when `key` does not decrypt it.
    pub async fn open(path: &Path, key: &[u8; 32]) -> Result<Self> {
        let pool = db::connect(path, key, OpenMode::Existing).await?;
        crate::run_migrations(&pool).await?;
        info!(path = %path.display(), "opened encrypted credential store");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!(path = %self.path.display(), "credential store closed");
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest applied schema migration, if any.
    pub async fn schema_version(&self) -> Result<Option<i64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// All credentials, newest first.
    pub async fn list(&self) -> Result<Vec<CredentialRecord>> {
        let rows: Vec<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials ORDER BY created_at_ms DESC, seq DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<CredentialRecord>> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_record).transpose()
    }

    /// Insert a credential; the store assigns the id and both timestamps.
    pub async fn create_credential(&self, input: NewCredential) -> Result<CredentialRecord> {
        input.validate()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let row: CredentialRow = sqlx::query_as(&format!(
            "INSERT INTO credentials (id, username, password, website, created_at_ms, updated_at_ms)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&id)
        .bind(&input.username)
        .bind(&input.password)
        .bind(&input.website)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = %id, "credential created");
        into_record(row)
    }

    /// Apply a partial update. Returns `None` when `id` is unknown.
    ///
    /// The modification timestamp is refreshed even when the patch is empty.
    pub async fn update_credential(
        &self,
        id: &str,
        patch: CredentialPatch,
    ) -> Result<Option<CredentialRecord>> {
        patch.validate()?;

        let (set_website, website) = match patch.website {
            Some(website) => (true, website),
            None => (false, None),
        };
        let now = Utc::now().timestamp_millis();
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "UPDATE credentials SET
                 username      = COALESCE(?1, username),
                 password      = COALESCE(?2, password),
                 website       = CASE WHEN ?3 THEN ?4 ELSE website END,
                 updated_at_ms = MAX(?5, created_at_ms)
             WHERE id = ?6
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&patch.username)
        .bind(&patch.password)
        .bind(set_website)
        .bind(&website)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            debug!(id = %id, "credential updated");
        }
        row.map(into_record).transpose()
    }

    /// Delete a credential. Returns whether a row was removed.
    pub async fn delete_credential(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM credentials WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        debug!(id = %id, deleted, "credential delete");
        Ok(deleted)
    }
}

fn into_record(row: CredentialRow) -> Result<CredentialRecord> {
    let (id, username, password, website, created_at_ms, updated_at_ms) = row;
    let created_at = timestamp(&id, created_at_ms)?;
    let updated_at = timestamp(&id, updated_at_ms)?;
    Ok(CredentialRecord {
        id,
        username,
        password,
        website,
        created_at,
        updated_at,
    })
}

fn timestamp(id: &str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::corrupt_record(id, format!("timestamp out of range: {ms}")))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x5A; 32];

    async fn make_store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::create(&dir.path().join("database.pmdb"), &KEY)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn create_then_get() {
        let (_dir, store) = make_store().await;
        let created = store
            .create_credential(NewCredential::new("alice", "s3cret").with_website("example.com"))
            .await
            .unwrap();

        assert!(uuid::Uuid::parse_str(&created.id).is_ok());
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.password, "s3cret");
        assert_eq!(fetched.website.as_deref(), Some("example.com"));
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let (_dir, store) = make_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (_dir, store) = make_store().await;
        let first = store
            .create_credential(NewCredential::new("first", "a"))
            .await
            .unwrap();
        let second = store
            .create_credential(NewCredential::new("second", "b"))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let (_dir, store) = make_store().await;
        let created = store
            .create_credential(NewCredential::new("alice", "old").with_website("site.test"))
            .await
            .unwrap();

        let updated = store
            .update_credential(&created.id, CredentialPatch {
                password: Some("new".into()),
                ..Default::default()
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.password, "new");
        assert_eq!(updated.website.as_deref(), Some("site.test"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_can_clear_website() {
        let (_dir, store) = make_store().await;
        let created = store
            .create_credential(NewCredential::new("alice", "pw").with_website("site.test"))
            .await
            .unwrap();

        let updated = store
            .update_credential(&created.id, CredentialPatch {
                website: Some(None),
                ..Default::default()
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.website, None);
    }

    #[tokio::test]
    async fn update_unknown_is_none() {
        let (_dir, store) = make_store().await;
        let result = store
            .update_credential("missing", CredentialPatch {
                username: Some("x".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn invalid_fields_never_reach_the_database() {
        let (_dir, store) = make_store().await;
        let err = store
            .create_credential(NewCredential::new("", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let (_dir, store) = make_store().await;
        let created = store
            .create_credential(NewCredential::new("alice", "pw"))
            .await
            .unwrap();

        assert!(store.delete_credential(&created.id).await.unwrap());
        assert!(!store.delete_credential(&created.id).await.unwrap());
        assert!(store.get(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn migrations_are_recorded() {
        let (_dir, store) = make_store().await;
        assert_eq!(store.schema_version().await.unwrap(), Some(20260301000000));
    }
}
