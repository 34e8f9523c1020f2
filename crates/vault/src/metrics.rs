//! Metric names recorded by the vault.

/// Vaults created
pub const INITIALIZATIONS_TOTAL: &str = "passvault_vault_initializations_total";
/// Unlock calls that reached passphrase verification
pub const UNLOCK_ATTEMPTS_TOTAL: &str = "passvault_vault_unlock_attempts_total";
/// Unlock calls rejected for a wrong passphrase
pub const UNLOCK_FAILURES_TOTAL: &str = "passvault_vault_unlock_failures_total";
/// Encryption keys derived to create or open the credential store
pub const KEY_DERIVATIONS_TOTAL: &str = "passvault_vault_key_derivations_total";
/// Lockouts started
pub const LOCKOUTS_TOTAL: &str = "passvault_vault_lockouts_total";
/// Unlock calls refused without verification during a lockout
pub const LOCKED_OUT_REJECTIONS_TOTAL: &str = "passvault_vault_locked_out_rejections_total";
/// Credential operations, labelled by `op`
pub const CREDENTIAL_OPERATIONS_TOTAL: &str = "passvault_credential_operations_total";
