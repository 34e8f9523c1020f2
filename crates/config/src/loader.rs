use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    env_subst::substitute_env,
    schema::{KeyProtection, PassvaultConfig},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "passvault.toml",
    "passvault.yaml",
    "passvault.yml",
    "passvault.json",
];

/// Overrides `storage.data_dir`.
pub const ENV_DATA_DIR: &str = "PASSVAULT_DATA_DIR";
/// Overrides `vault.key_protection`.
pub const ENV_KEY_PROTECTION: &str = "PASSVAULT_KEY_PROTECTION";

/// A loaded configuration and the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: PassvaultConfig,
    pub path: Option<PathBuf>,
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PassvaultConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./passvault.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/passvault/passvault.{toml,yaml,yml,json}`
///
/// No file means defaults. A file that exists but does not parse is an
/// error: silently falling back could point the vault at another data dir.
pub fn discover_and_load() -> anyhow::Result<LoadedConfig> {
    let (mut config, path) = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            (load_config(&path)?, Some(path))
        },
        None => {
            debug!("no config file found, using defaults");
            (PassvaultConfig::default(), None)
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(LoadedConfig { config, path })
}

/// Apply `PASSVAULT_*` overrides on top of a parsed config.
pub fn apply_env_overrides(
    config: &mut PassvaultConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
        info!(data_dir = %dir, "data dir overridden from {ENV_DATA_DIR}");
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(value) = lookup(ENV_KEY_PROTECTION).filter(|v| !v.trim().is_empty()) {
        let protection: KeyProtection = value
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{ENV_KEY_PROTECTION}: {e}"))?;
        info!(%protection, "key protection overridden from {ENV_KEY_PROTECTION}");
        config.vault.key_protection = protection;
    }
    Ok(())
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (e.g. `~/.config/passvault/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "passvault").map(|d| d.config_dir().to_path_buf())
}

/// Platform data directory for vault files, or `./.passvault` when the
/// platform has no home directory.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "passvault")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".passvault"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PassvaultConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Parse raw config text into a JSON value tree for validation.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
