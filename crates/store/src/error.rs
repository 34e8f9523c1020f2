use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// `open` was asked for a database file that does not exist.
    #[error("credential database not found: {}", path.display())]
    Missing { path: PathBuf },

    /// SQLCipher could not decrypt the first page with the supplied key.
    #[error("credential database cannot be decrypted with this key")]
    WrongKey,

    /// The linked SQLite library has no SQLCipher support.
    #[error("sqlcipher is not available in this build")]
    CipherUnavailable,

    /// A record field failed validation before reaching the database.
    #[error("{message}")]
    InvalidField { message: String },

    /// A stored row could not be mapped back to a record.
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    #[must_use]
    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self::InvalidField {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn corrupt_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
