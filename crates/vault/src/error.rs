//! Vault error types.

use std::{path::PathBuf, time::Duration};

use {passvault_store::StoreError, tracing::error};

use crate::policy::PolicyViolation;

/// Errors produced by vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The proposed master passphrase does not meet the policy.
    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),

    /// A vault configuration already exists.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// No (complete) vault configuration exists.
    #[error("vault is not initialized")]
    NotInitialized,

    #[error("incorrect master password")]
    IncorrectPassphrase,

    /// Too many failed unlock attempts; `remaining` is the time left.
    #[error("too many failed attempts, try again in {} minutes", minutes_ceil(*remaining))]
    LockedOut { remaining: Duration },

    /// A credential operation was attempted while the vault is locked.
    #[error("vault is locked")]
    NotUnlocked,

    /// KDF parameters that cannot be used for derivation.
    #[error("invalid key derivation parameters: {0}")]
    InvalidKdfParams(String),

    /// Throttle settings that would switch the lockout off.
    #[error("invalid unlock throttle settings: {0}")]
    InvalidThrottle(String),

    /// The persisted vault configuration exists but cannot be used.
    #[error("vault configuration at {path} is unreadable: {reason}")]
    CorruptConfig { path: PathBuf, reason: String },

    /// Sealing or unsealing the configuration artifact failed.
    #[error("key protection failed: {0}")]
    KeyProtection(String),

    /// Filesystem failure on the configuration artifact.
    #[error("vault configuration i/o on {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encrypted record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A blocking derivation task panicked or was cancelled.
    #[error("key derivation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    #[must_use]
    pub fn corrupt_config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptConfig {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn key_protection(reason: impl std::fmt::Display) -> Self {
        Self::KeyProtection(reason.to_string())
    }

    /// Whether this error comes from persistence rather than caller input.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        match self {
            Self::CorruptConfig { .. }
            | Self::KeyProtection(_)
            | Self::ConfigIo { .. }
            | Self::Task(_) => true,
            Self::Store(err) => !matches!(err, StoreError::InvalidField { .. }),
            _ => false,
        }
    }

    /// Message suitable for showing to the person at the keyboard.
    ///
    /// Storage failures are logged in full and replaced with a generic
    /// message so file paths and driver errors never reach the UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PolicyViolation(violation) => violation.to_string(),
            Self::AlreadyInitialized => "Vault is already initialized".into(),
            Self::NotInitialized => "Vault is not initialized".into(),
            Self::IncorrectPassphrase => "Incorrect master password".into(),
            Self::LockedOut { remaining } => format!(
                "Too many failed attempts. Please try again in {} minutes.",
                minutes_ceil(*remaining)
            ),
            Self::NotUnlocked => "Vault is locked".into(),
            Self::Store(StoreError::InvalidField { message }) => message.clone(),
            other => {
                error!(error = %other, "vault storage failure");
                "Vault storage is unavailable; see logs for details".into()
            },
        }
    }
}

/// Whole minutes, rounded up, with a floor of one.
fn minutes_ceil(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60).max(1)
}
