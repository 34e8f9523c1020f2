//! Master-password gate for the passvault credential store.
//!
//! A passphrase is stretched with PBKDF2 into two unrelated values: a
//! verifier that is persisted (sealed) in the vault config, and a key that
//! opens the SQLCipher-encrypted record store and is never written down.
//! Unlock attempts go through an in-memory throttle that locks the vault
//! out for a while after repeated failures.

pub mod clock;
pub mod config_store;
pub mod error;
pub mod kdf;
pub mod key_wrap;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod policy;
pub mod throttle;
pub mod vault;

#[cfg(feature = "platform-keyring")]
pub use key_wrap::PlatformKeyring;
pub use {
    clock::{Clock, ManualClock, SystemClock},
    config_store::{ConfigStore, VaultConfig},
    error::{Result, VaultError},
    kdf::KdfParams,
    key_wrap::{DevelopmentKey, KeyProtector},
    policy::PolicyViolation,
    throttle::{ThrottlePolicy, UnlockThrottle},
    vault::{Vault, VaultBuilder, VaultPaths, VaultStatus},
};
