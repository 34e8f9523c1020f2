//! Configuration loading, validation, and env substitution.
//!
//! Config files: `passvault.toml`, `passvault.yaml`, or `passvault.json`,
//! searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file text, plus `PASSVAULT_*` overrides applied after parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        ENV_DATA_DIR, ENV_KEY_PROTECTION, LoadedConfig, apply_env_overrides, config_dir,
        default_data_dir, discover_and_load, find_config_file, load_config,
    },
    schema::{KeyProtection, PassvaultConfig, StorageSettings, ThrottleSettings, VaultSettings},
    validate::{Diagnostic, Severity, ValidationResult, validate_config, validate_file},
};
