//! Vault lifecycle: initialize, unlock, lock, and gated credential access.

use std::{path::PathBuf, sync::Arc};

use {
    passvault_config::{KeyProtection, PassvaultConfig},
    passvault_store::{CredentialPatch, CredentialRecord, CredentialStore, NewCredential, StoreError},
    tokio::sync::{Mutex, RwLock},
    tracing::{debug, error, info, warn},
    zeroize::Zeroizing,
};

#[cfg(feature = "metrics")]
use crate::metrics as vault_metrics;
#[cfg(feature = "platform-keyring")]
use crate::key_wrap::PlatformKeyring;
use crate::{
    clock::{Clock, SystemClock},
    config_store::{ConfigStore, VaultConfig},
    error::{Result, VaultError},
    kdf::{self, KdfParams},
    key_wrap::{DevelopmentKey, KeyProtector},
    policy,
    throttle::{ThrottleDecision, ThrottlePolicy, UnlockThrottle},
};

/// Vault status exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    /// No master passphrase has been set.
    Uninitialized,
    /// Initialized, but the record store is closed.
    Locked,
    /// The record store is open.
    Unlocked,
}

/// Files owned by a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub config: PathBuf,
    pub database: PathBuf,
}

impl VaultPaths {
    /// `vault.json` and `database.pmdb` inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            config: dir.join("vault.json"),
            database: dir.join("database.pmdb"),
        }
    }
}

/// Builder for [`Vault`].
pub struct VaultBuilder {
    paths: VaultPaths,
    protector: Option<Arc<dyn KeyProtector>>,
    kdf: KdfParams,
    throttle: ThrottlePolicy,
    clock: Arc<dyn Clock>,
}

impl VaultBuilder {
    #[must_use]
    pub fn protector(mut self, protector: Arc<dyn KeyProtector>) -> Self {
        self.protector = Some(protector);
        self
    }

    /// KDF parameters for newly initialized vaults. Existing vaults keep
    /// the parameters recorded in their config.
    #[must_use]
    pub fn kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    #[must_use]
    pub fn throttle(mut self, throttle: ThrottlePolicy) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Falls back to [`DevelopmentKey`] when no protector was set.
    pub fn build(self) -> Vault {
        let protector = self
            .protector
            .unwrap_or_else(|| Arc::new(DevelopmentKey::new()));
        Vault {
            config_store: ConfigStore::new(self.paths.config, protector),
            database_path: self.paths.database,
            kdf: self.kdf,
            clock: self.clock,
            throttle: Mutex::new(UnlockThrottle::new(self.throttle)),
            store: RwLock::new(None),
        }
    }
}

/// The master-password gate in front of the credential store.
///
/// The throttle mutex also serialises `initialize`, `unlock` and `lock`, so
/// lifecycle transitions never interleave. The encryption key only lives on
/// the stack of the call that opens the store.
pub struct Vault {
    config_store: ConfigStore,
    database_path: PathBuf,
    kdf: KdfParams,
    clock: Arc<dyn Clock>,
    throttle: Mutex<UnlockThrottle>,
    store: RwLock<Option<CredentialStore>>,
}

impl Vault {
    pub fn builder(paths: VaultPaths) -> VaultBuilder {
        VaultBuilder {
            paths,
            protector: None,
            kdf: KdfParams::default(),
            throttle: ThrottlePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build a vault from loaded configuration.
    pub fn from_config(config: &PassvaultConfig) -> Result<Self> {
        let settings = &config.vault;
        let protector: Arc<dyn KeyProtector> = match settings.key_protection {
            KeyProtection::Development => Arc::new(DevelopmentKey::new()),
            #[cfg(feature = "platform-keyring")]
            KeyProtection::Platform => Arc::new(PlatformKeyring::new(
                settings.keyring_service.clone(),
                PlatformKeyring::DEFAULT_ACCOUNT,
            )),
            #[cfg(not(feature = "platform-keyring"))]
            KeyProtection::Platform => {
                return Err(VaultError::key_protection(
                    "platform key protection is not compiled in (enable the `platform-keyring` feature)",
                ));
            },
        };

        let kdf = KdfParams {
            iterations: settings.kdf_iterations,
        };
        kdf.validate()?;

        let paths = VaultPaths {
            config: config.storage.config_path(),
            database: config.storage.database_path(),
        };
        debug!(
            config = %paths.config.display(),
            database = %paths.database.display(),
            protection = protector.id(),
            "vault configured"
        );

        let throttle = ThrottlePolicy {
            max_attempts: settings.throttle.max_attempts,
            lockout: std::time::Duration::from_secs(settings.throttle.lockout_secs),
        };
        throttle.validate()?;

        Ok(Self::builder(paths)
            .protector(protector)
            .kdf(kdf)
            .throttle(throttle)
            .build())
    }

    #[must_use]
    pub fn config_path(&self) -> &std::path::Path {
        self.config_store.path()
    }

    #[must_use]
    pub fn database_path(&self) -> &std::path::Path {
        &self.database_path
    }

    /// Id of the key protector sealing the config, e.g. `"development"`.
    #[must_use]
    pub fn key_protection(&self) -> &'static str {
        self.config_store.protector_id()
    }

    /// Whether a complete vault configuration exists.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.config_store.load()?.is_some())
    }

    /// Whether the credential store is open.
    pub async fn is_unlocked(&self) -> bool {
        self.store.read().await.is_some()
    }

    pub async fn status(&self) -> Result<VaultStatus> {
        if self.is_unlocked().await {
            return Ok(VaultStatus::Unlocked);
        }
        if self.is_initialized()? {
            Ok(VaultStatus::Locked)
        } else {
            Ok(VaultStatus::Uninitialized)
        }
    }

    /// Consecutive failed unlocks since the last reset.
    pub async fn failed_attempts(&self) -> u32 {
        self.throttle.lock().await.failed_attempts()
    }

    /// Create the vault: set the master passphrase and an empty store.
    ///
    /// On success the vault is unlocked.
    pub async fn initialize(&self, passphrase: &str) -> Result<()> {
        let _lifecycle = self.throttle.lock().await;

        if self.config_store.load()?.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        policy::validate(passphrase)?;
        self.config_store.discard_incomplete()?;

        let secret = Zeroizing::new(passphrase.as_bytes().to_vec());
        let params = self.kdf;
        let (config, key) = tokio::task::spawn_blocking(move || -> Result<_> {
            let salt = kdf::generate_salt();
            let verifier = kdf::derive_verifier(&secret, &salt, &params)?;
            let key = kdf::derive_encryption_key(&secret, &salt, &params)?;
            let config = VaultConfig {
                salt: salt.to_vec(),
                verifier: *verifier,
                kdf: params,
            };
            Ok((config, key))
        })
        .await??;

        #[cfg(feature = "metrics")]
        metrics::counter!(vault_metrics::KEY_DERIVATIONS_TOTAL).increment(1);
        self.config_store.save(&config)?;

        let store = match CredentialStore::create(&self.database_path, &key).await {
            Ok(store) => store,
            Err(e) => {
                if let Err(rollback) = self.config_store.remove() {
                    error!(error = %rollback, "failed to roll back vault config");
                }
                return Err(e.into());
            },
        };

        let mut slot = self.store.write().await;
        if let Some(previous) = slot.replace(store) {
            previous.close().await;
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(vault_metrics::INITIALIZATIONS_TOTAL).increment(1);
        info!(
            iterations = params.iterations,
            "vault initialized and unlocked"
        );
        Ok(())
    }

    /// Verify the master passphrase and open the credential store.
    ///
    /// During a lockout this fails without reading the config or deriving
    /// anything. Unlocking an already unlocked vault still verifies the
    /// passphrase.
    pub async fn unlock(&self, passphrase: &str) -> Result<()> {
        let mut throttle = self.throttle.lock().await;

        if let ThrottleDecision::Denied { retry_after } = throttle.check_at(self.clock.now()) {
            #[cfg(feature = "metrics")]
            metrics::counter!(vault_metrics::LOCKED_OUT_REJECTIONS_TOTAL).increment(1);
            warn!(
                retry_after_secs = retry_after.as_secs(),
                "unlock refused during lockout"
            );
            return Err(VaultError::LockedOut {
                remaining: retry_after,
            });
        }

        let config = self
            .config_store
            .load()?
            .ok_or(VaultError::NotInitialized)?;

        #[cfg(feature = "metrics")]
        metrics::counter!(vault_metrics::UNLOCK_ATTEMPTS_TOTAL).increment(1);

        // Lifecycle ops hold the throttle lock, so the store cannot open or
        // close between this check and the end of the call.
        let needs_key = self.store.read().await.is_none();
        let secret = Zeroizing::new(passphrase.as_bytes().to_vec());
        let verified = tokio::task::spawn_blocking(move || -> Result<_> {
            let candidate = kdf::derive_verifier(&secret, &config.salt, &config.kdf)?;
            if !kdf::verify(&config.verifier, &candidate[..]) {
                return Ok(None);
            }
            if !needs_key {
                return Ok(Some(None));
            }
            kdf::derive_encryption_key(&secret, &config.salt, &config.kdf)
                .map(|key| Some(Some(key)))
        })
        .await??;

        let Some(derived) = verified else {
            #[cfg(feature = "metrics")]
            metrics::counter!(vault_metrics::UNLOCK_FAILURES_TOTAL).increment(1);
            return Err(match throttle.record_failure_at(self.clock.now()) {
                Some(lockout) => {
                    #[cfg(feature = "metrics")]
                    metrics::counter!(vault_metrics::LOCKOUTS_TOTAL).increment(1);
                    VaultError::LockedOut { remaining: lockout }
                },
                None => {
                    warn!(
                        failed_attempts = throttle.failed_attempts(),
                        "incorrect master password"
                    );
                    VaultError::IncorrectPassphrase
                },
            });
        };
        throttle.record_success();

        let Some(key) = derived else {
            debug!("vault already unlocked");
            return Ok(());
        };
        #[cfg(feature = "metrics")]
        metrics::counter!(vault_metrics::KEY_DERIVATIONS_TOTAL).increment(1);

        let mut slot = self.store.write().await;

        let store = match CredentialStore::open(&self.database_path, &key).await {
            Ok(store) => store,
            Err(StoreError::Missing { path }) => {
                warn!(
                    path = %path.display(),
                    "credential database missing, starting an empty one"
                );
                CredentialStore::create(&self.database_path, &key).await?
            },
            Err(e) => return Err(e.into()),
        };
        *slot = Some(store);

        info!("vault unlocked");
        Ok(())
    }

    /// Close the credential store. A no-op when already locked.
    pub async fn lock(&self) {
        let _lifecycle = self.throttle.lock().await;
        let previous = self.store.write().await.take();
        if let Some(store) = previous {
            store.close().await;
            info!("vault locked");
        }
    }

    pub async fn list_credentials(&self) -> Result<Vec<CredentialRecord>> {
        let store = self.open_store("list").await?;
        Ok(store.list().await?)
    }

    pub async fn get_credential(&self, id: &str) -> Result<Option<CredentialRecord>> {
        let store = self.open_store("get").await?;
        Ok(store.get(id).await?)
    }

    pub async fn create_credential(&self, input: NewCredential) -> Result<CredentialRecord> {
        let store = self.open_store("create").await?;
        Ok(store.create_credential(input).await?)
    }

    /// Returns `None` when `id` is unknown.
    pub async fn update_credential(
        &self,
        id: &str,
        patch: CredentialPatch,
    ) -> Result<Option<CredentialRecord>> {
        let store = self.open_store("update").await?;
        Ok(store.update_credential(id, patch).await?)
    }

    /// Returns whether a credential was removed.
    pub async fn delete_credential(&self, id: &str) -> Result<bool> {
        let store = self.open_store("delete").await?;
        Ok(store.delete_credential(id).await?)
    }

    async fn open_store(&self, op: &'static str) -> Result<CredentialStore> {
        #[cfg(feature = "metrics")]
        metrics::counter!(vault_metrics::CREDENTIAL_OPERATIONS_TOTAL, "op" => op).increment(1);
        let store = self.store.read().await.clone();
        store.ok_or_else(|| {
            debug!(op, "credential operation while locked");
            VaultError::NotUnlocked
        })
    }
}
