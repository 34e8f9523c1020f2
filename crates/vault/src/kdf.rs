//! PBKDF2 derivation of the passphrase verifier and the store key.
//!
//! Both outputs come from the same passphrase and salt but use different
//! PRFs and lengths, so neither can be computed from the other:
//!
//! - verifier: PBKDF2-HMAC-SHA512, 64 bytes, persisted in the vault config
//! - encryption key: PBKDF2-HMAC-SHA256, 32 bytes, never persisted

use {
    rand::RngCore,
    sha2::{Sha256, Sha512},
    subtle::ConstantTimeEq,
    zeroize::Zeroizing,
};

use crate::error::{Result, VaultError};

/// Iteration count used for new vaults.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Length of the random per-vault salt, in bytes.
pub const SALT_LEN: usize = 32;

/// Length of the persisted verifier, in bytes.
pub const VERIFIER_LEN: usize = 64;

/// Length of the store encryption key, in bytes.
pub const KEY_LEN: usize = 32;

/// PBKDF2 parameters stored alongside the salt and verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(VaultError::InvalidKdfParams(
                "iteration count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Derive the 64-byte verifier that proves knowledge of the passphrase.
pub fn derive_verifier(
    passphrase: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; VERIFIER_LEN]>> {
    params.validate()?;
    let mut output = Zeroizing::new([0u8; VERIFIER_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha512>(passphrase, salt, params.iterations, output.as_mut());
    Ok(output)
}

/// Derive the 32-byte key that opens the encrypted record store.
pub fn derive_encryption_key(
    passphrase: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    params.validate()?;
    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, params.iterations, output.as_mut());
    Ok(output)
}

/// Compare a candidate verifier against the stored one in constant time.
///
/// Slices of different lengths never match.
#[must_use]
pub fn verify(expected: &[u8], candidate: &[u8]) -> bool {
    expected.ct_eq(candidate).into()
}

/// Generate a fresh random salt.
#[must_use]
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
