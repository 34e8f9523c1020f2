//! SQLCipher connection setup over sqlx.
//!
//! The derived key is handed to SQLCipher as a raw 256-bit key
//! (`PRAGMA key = "x'<hex>'"`), so SQLCipher skips its own KDF and every
//! page of the database file is encrypted with it. sqlx sends the `key`
//! pragma before any other statement on each new connection.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use {
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    },
    tracing::{debug, info},
    zeroize::Zeroizing,
};

use crate::error::{Result, StoreError};

/// Extended result code SQLite reports when a page cannot be decrypted.
const SQLITE_NOTADB: &str = "26";

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether the database file must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    /// Discard whatever is at the path and start an empty database.
    Fresh,
    /// Open an existing database; a missing file is an error.
    Existing,
}

/// Connect to the encrypted database at `path` and verify the key.
pub(crate) async fn connect(path: &Path, key: &[u8; 32], mode: OpenMode) -> Result<SqlitePool> {
    match mode {
        OpenMode::Fresh => {
            remove_database_files(path).await?;
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
        },
        OpenMode::Existing => {
            if !tokio::fs::try_exists(path).await? {
                return Err(StoreError::Missing {
                    path: path.to_path_buf(),
                });
            }
        },
    }

    let key_hex = Zeroizing::new(hex::encode(key));
    let key_pragma = Zeroizing::new(format!("\"x'{}'\"", key_hex.as_str()));
    // sqlx keeps its own copy of every pragma for reconnects. That copy lives
    // as long as the pool and is not zeroized on close.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(mode == OpenMode::Fresh)
        .pragma("key", key_pragma.as_str().to_owned())
        .pragma("cipher_page_size", "4096")
        .pragma("cipher_hmac_algorithm", "HMAC_SHA512")
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(classify)?;

    let cipher_version: Option<String> = sqlx::query_scalar("PRAGMA cipher_version")
        .fetch_optional(&pool)
        .await
        .map_err(classify)?;
    if cipher_version.as_deref().is_none_or(|v| v.trim().is_empty()) {
        pool.close().await;
        return Err(StoreError::CipherUnavailable);
    }

    // The first real read is where a wrong key surfaces.
    if let Err(e) = sqlx::query("SELECT count(*) FROM sqlite_master")
        .execute(&pool)
        .await
    {
        pool.close().await;
        return Err(classify(e));
    }

    debug!(path = %path.display(), ?cipher_version, "encrypted database connected");
    Ok(pool)
}

/// Remove the database file and its WAL/SHM siblings, ignoring absent files.
pub(crate) async fn remove_database_files(path: &Path) -> Result<()> {
    for candidate in [
        path.to_path_buf(),
        sidecar(path, "-wal"),
        sidecar(path, "-shm"),
    ] {
        match tokio::fs::remove_file(&candidate).await {
            Ok(()) => info!(path = %candidate.display(), "removed existing database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn classify(err: sqlx::Error) -> StoreError {
    if is_not_a_database(&err) {
        StoreError::WrongKey
    } else {
        StoreError::Database(err)
    }
}

fn is_not_a_database(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(SQLITE_NOTADB)
                || db.message().contains("file is not a database")
        },
        _ => false,
    }
}
