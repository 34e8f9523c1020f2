//! Config schema types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level passvault configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassvaultConfig {
    pub vault: VaultSettings,
    pub storage: StorageSettings,
}

/// How the persisted vault configuration is protected at rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyProtection {
    /// Fixed key compiled into the binary. Offers no real secrecy.
    #[default]
    Development,
    /// Random key held by the operating system credential store.
    Platform,
}

impl KeyProtection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Platform => "platform",
        }
    }
}

impl std::fmt::Display for KeyProtection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyProtection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "platform" | "keyring" => Ok(Self::Platform),
            other => Err(format!(
                "unknown key protection \"{other}\" (expected \"development\" or \"platform\")"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    pub key_protection: KeyProtection,
    /// Service name used for the platform keyring entry.
    pub keyring_service: String,
    /// PBKDF2 iteration count for newly initialized vaults.
    pub kdf_iterations: u32,
    pub throttle: ThrottleSettings,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            key_protection: KeyProtection::default(),
            keyring_service: "passvault".into(),
            kdf_iterations: 600_000,
            throttle: ThrottleSettings::default(),
        }
    }
}

/// Unlock throttle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    /// Consecutive failed unlocks before the lockout starts.
    pub max_attempts: u32,
    pub lockout_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 15 * 60,
        }
    }
}

/// Where the vault keeps its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the vault files. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub config_file_name: String,
    pub database_file_name: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            config_file_name: "vault.json".into(),
            database_file_name: "database.pmdb".into(),
        }
    }
}

impl StorageSettings {
    /// The configured data directory, or the platform default.
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::loader::default_data_dir)
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.config_file_name)
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.database_file_name)
    }
}
