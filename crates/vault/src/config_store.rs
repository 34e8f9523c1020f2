//! Persistent vault configuration: salt, verifier and KDF parameters.
//!
//! On disk the file is a small JSON envelope naming the key protector, with
//! the actual settings sealed inside:
//!
//! ```json
//! { "version": 1, "protection": "platform", "sealed": "<base64>" }
//! ```
//!
//! A config that is absent or was never completely written reads as "not
//! initialized". Anything else that cannot be read is an error.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
    zeroize::Zeroizing,
};

use crate::{
    error::{Result, VaultError},
    kdf::{KdfParams, VERIFIER_LEN},
    key_wrap::{self, KeyProtector},
};

/// Envelope format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Associated data binding sealed blobs to this artifact.
const CONFIG_AAD: &[u8] = b"passvault-vault-config";

/// The persisted vault settings.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub salt: Vec<u8>,
    pub verifier: [u8; VERIFIER_LEN],
    pub kdf: KdfParams,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("salt_len", &self.salt.len())
            .field("verifier", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Envelope {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    protection: String,
    #[serde(default)]
    sealed: String,
}

/// What lives inside the sealed blob. Every field is optional so a
/// half-written config can be told apart from a corrupt one.
#[derive(Default, Serialize, Deserialize)]
struct SealedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kdf: Option<KdfParams>,
}

/// Reads and writes the vault configuration file.
pub struct ConfigStore {
    path: PathBuf,
    protector: Arc<dyn KeyProtector>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, protector: Arc<dyn KeyProtector>) -> Self {
        Self {
            path: path.into(),
            protector,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn protector_id(&self) -> &'static str {
        self.protector.id()
    }

    /// Whether any file exists at the config path, complete or not.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the config. `Ok(None)` when absent or incomplete.
    pub fn load(&self) -> Result<Option<VaultConfig>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(VaultError::ConfigIo {
                    path: self.path.clone(),
                    source,
                });
            },
        };
        if raw.trim().is_empty() {
            warn!(path = %self.path.display(), "vault config is empty, treating as uninitialized");
            return Ok(None);
        }

        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|e| VaultError::corrupt_config(&self.path, format!("invalid json: {e}")))?;
        if envelope.sealed.trim().is_empty() {
            warn!(path = %self.path.display(), "vault config has no sealed settings, treating as uninitialized");
            return Ok(None);
        }
        if envelope.version != FORMAT_VERSION {
            return Err(VaultError::corrupt_config(
                &self.path,
                format!("unsupported format version {}", envelope.version),
            ));
        }
        if envelope.protection != self.protector.id() {
            return Err(VaultError::corrupt_config(
                &self.path,
                format!(
                    "sealed with \"{}\" key protection but \"{}\" is configured",
                    envelope.protection,
                    self.protector.id()
                ),
            ));
        }

        let key = self.protector.wrapping_key()?;
        let plaintext = key_wrap::unseal(&key, &envelope.sealed, CONFIG_AAD)?;
        let settings: SealedSettings = serde_json::from_slice(&plaintext).map_err(|e| {
            VaultError::corrupt_config(&self.path, format!("invalid sealed settings: {e}"))
        })?;

        self.decode(settings)
    }

    fn decode(&self, settings: SealedSettings) -> Result<Option<VaultConfig>> {
        let (Some(hash_hex), Some(salt_hex)) = (
            settings.verification_hash.filter(|h| !h.is_empty()),
            settings.salt.filter(|s| !s.is_empty()),
        ) else {
            warn!(path = %self.path.display(), "vault config is incomplete, treating as uninitialized");
            return Ok(None);
        };

        let hash = Zeroizing::new(hex::decode(hash_hex).map_err(|e| {
            VaultError::corrupt_config(&self.path, format!("verification hash: {e}"))
        })?);
        let verifier: [u8; VERIFIER_LEN] = hash.as_slice().try_into().map_err(|_| {
            VaultError::corrupt_config(
                &self.path,
                format!(
                    "verification hash is {} bytes, expected {VERIFIER_LEN}",
                    hash.len()
                ),
            )
        })?;
        let salt = hex::decode(salt_hex)
            .map_err(|e| VaultError::corrupt_config(&self.path, format!("salt: {e}")))?;

        let kdf = settings.kdf.unwrap_or_default();
        kdf.validate()?;

        Ok(Some(VaultConfig {
            salt,
            verifier,
            kdf,
        }))
    }

    /// Persist a new config. Never replaces an existing file.
    ///
    /// The file is written to a temporary sibling with owner-only
    /// permissions, then linked into place so readers never see a partial
    /// write and a concurrent writer cannot be clobbered.
    pub fn save(&self, config: &VaultConfig) -> Result<()> {
        let settings = SealedSettings {
            verification_hash: Some(hex::encode(config.verifier)),
            salt: Some(hex::encode(&config.salt)),
            kdf: Some(config.kdf),
        };
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&settings).map_err(VaultError::key_protection)?,
        );
        let key = self.protector.provision()?;
        let envelope = Envelope {
            version: FORMAT_VERSION,
            protection: self.protector.id().to_string(),
            sealed: key_wrap::seal(&key, &plaintext, CONFIG_AAD)?,
        };
        let data =
            serde_json::to_vec_pretty(&envelope).map_err(VaultError::key_protection)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let temp_path = self.temp_path();
        let linked = write_owner_only(&temp_path, &data)
            .and_then(|()| std::fs::hard_link(&temp_path, &self.path));
        if let Err(e) = std::fs::remove_file(&temp_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %temp_path.display(), error = %e, "failed to remove temp vault config");
        }

        match linked {
            Ok(()) => {
                info!(path = %self.path.display(), protection = self.protector.id(), "vault config saved");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(VaultError::AlreadyInitialized)
            },
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// Remove a config file that exists but is incomplete.
    ///
    /// Returns whether a file was removed. A complete config is left alone.
    pub fn discard_incomplete(&self) -> Result<bool> {
        if !self.exists() || self.load()?.is_some() {
            return Ok(false);
        }
        self.remove()?;
        info!(path = %self.path.display(), "discarded incomplete vault config");
        Ok(true)
    }

    /// Delete the config file unconditionally.
    pub(crate) fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "vault config removed");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.path
            .with_extension(format!("tmp.{}.{nanos}", std::process::id()))
    }

    fn io_error(&self, source: std::io::Error) -> VaultError {
        VaultError::ConfigIo {
            path: self.path.clone(),
            source,
        }
    }
}

fn write_owner_only(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
