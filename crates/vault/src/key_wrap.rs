//! Protection of the vault configuration artifact at rest.
//!
//! The serialized configuration (salt, verifier, KDF parameters) is sealed
//! with XChaCha20-Poly1305 under a 32-byte wrapping key. Where that key
//! comes from is the job of a [`KeyProtector`]:
//!
//! - [`PlatformKeyring`] keeps a random key in the OS credential store
//!   (feature `platform-keyring`)
//! - [`DevelopmentKey`] uses a fixed key compiled into the binary; anyone with
//!   the binary can unseal the file, so it only deters casual inspection
//!
//! Sealed blob layout, base64-encoded:
//! `[version: 1 byte][nonce: 24 bytes][ciphertext + Poly1305 tag: N + 16 bytes]`.

#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use {
    base64::Engine,
    rand::RngCore,
    sha2::{Digest, Sha256},
    tracing::warn,
    zeroize::Zeroizing,
};

use crate::error::{Result, VaultError};

/// Version tag for XChaCha20-Poly1305 sealed blobs.
pub const SEAL_VERSION: u8 = 0x01;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Supplies the key that seals the vault configuration.
pub trait KeyProtector: Send + Sync {
    /// Stable identifier recorded next to the sealed artifact.
    fn id(&self) -> &'static str;

    /// Return the existing wrapping key. Missing key material is an error.
    fn wrapping_key(&self) -> Result<Zeroizing<[u8; 32]>>;

    /// Return the wrapping key, creating it first if none exists yet.
    fn provision(&self) -> Result<Zeroizing<[u8; 32]>> {
        self.wrapping_key()
    }
}

/// Encrypt `plaintext` under `key`, bound to `aad`.
#[allow(deprecated)]
pub fn seal(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<String> {
    let cipher = XChaCha20Poly1305::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload {
            msg: plaintext,
            aad,
        })
        .map_err(VaultError::key_protection)?;

    let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    blob.push(SEAL_VERSION);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(blob))
}

/// Decrypt a blob produced by [`seal`] with the same `key` and `aad`.
#[allow(deprecated)]
pub fn unseal(key: &[u8; 32], sealed_b64: &str, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let blob = base64::engine::general_purpose::STANDARD
        .decode(sealed_b64.trim())
        .map_err(VaultError::key_protection)?;

    let Some((&version, rest)) = blob.split_first() else {
        return Err(VaultError::key_protection("sealed blob is empty"));
    };
    if version != SEAL_VERSION {
        return Err(VaultError::key_protection(format!(
            "unsupported seal version: {version:#04x}, expected {SEAL_VERSION:#04x}"
        )));
    }
    if rest.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::key_protection("sealed blob is truncated"));
    }

    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), Payload {
            msg: ciphertext,
            aad,
        })
        .map(Zeroizing::new)
        .map_err(|_| VaultError::key_protection("sealed blob failed authentication"))
}

/// Fixed, publicly known wrapping key for development builds.
#[derive(Debug)]
pub struct DevelopmentKey {
    key: Zeroizing<[u8; 32]>,
}

impl DevelopmentKey {
    pub const ID: &'static str = "development";

    const SEED: &'static [u8] = b"passvault-development-config-key";

    #[must_use]
    pub fn new() -> Self {
        warn!(
            "vault configuration is sealed with the built-in development key; \
             use platform key protection outside development"
        );
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&Sha256::digest(Self::SEED));
        Self { key }
    }
}

impl Default for DevelopmentKey {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyProtector for DevelopmentKey {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn wrapping_key(&self) -> Result<Zeroizing<[u8; 32]>> {
        Ok(self.key.clone())
    }
}

/// Wrapping key held in the operating system's credential store.
#[cfg(feature = "platform-keyring")]
#[derive(Debug, Clone)]
pub struct PlatformKeyring {
    service: String,
    account: String,
}

#[cfg(feature = "platform-keyring")]
impl PlatformKeyring {
    pub const ID: &'static str = "platform";

    pub const DEFAULT_ACCOUNT: &'static str = "vault-config-key";

    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| VaultError::key_protection(format!("keyring init: {e}")))
    }

    fn load(&self) -> Result<Option<Zeroizing<[u8; 32]>>> {
        let encoded = match self.entry()?.get_password() {
            Ok(encoded) => Zeroizing::new(encoded),
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(VaultError::key_protection(format!("load key: {e}"))),
        };
        let decoded = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| VaultError::key_protection(format!("decode key: {e}")))?,
        );
        if decoded.len() != 32 {
            return Err(VaultError::key_protection(format!(
                "stored key has wrong length: {} (expected 32)",
                decoded.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&decoded);
        Ok(Some(key))
    }
}

#[cfg(feature = "platform-keyring")]
impl KeyProtector for PlatformKeyring {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn wrapping_key(&self) -> Result<Zeroizing<[u8; 32]>> {
        self.load()?.ok_or_else(|| {
            VaultError::key_protection(format!(
                "no wrapping key in the platform keyring for {}/{}",
                self.service, self.account
            ))
        })
    }

    fn provision(&self) -> Result<Zeroizing<[u8; 32]>> {
        if let Some(key) = self.load()? {
            return Ok(key);
        }
        let mut key = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(key.as_mut());
        let encoded = Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(*key));
        self.entry()?
            .set_password(&encoded)
            .map_err(|e| VaultError::key_protection(format!("store key: {e}")))?;
        tracing::info!(service = %self.service, "provisioned vault wrapping key in platform keyring");
        Ok(key)
    }
}
