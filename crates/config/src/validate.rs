//! Configuration validation.
//!
//! Reports unknown or misspelled keys, type errors, and settings that make
//! the vault unusable or weaker than it looks.

use std::path::{Path, PathBuf};

use crate::schema::{KeyProtection, PassvaultConfig};

/// Iteration counts below this draw a warning.
pub const MIN_RECOMMENDED_ITERATIONS: u32 = 100_000;

/// Longest accepted lockout (30 days).
pub const MAX_LOCKOUT_SECS: u64 = 30 * 24 * 60 * 60;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "security" or "value"
    pub category: &'static str,
    /// Dotted path, e.g. "vault.throttle.max_attempts"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Shape of the known configuration keys.
enum KnownKeys {
    Struct(&'static [(&'static str, KnownKeys)]),
    Leaf,
}

const THROTTLE_KEYS: KnownKeys =
    KnownKeys::Struct(&[("max_attempts", KnownKeys::Leaf), ("lockout_secs", KnownKeys::Leaf)]);

const SCHEMA: KnownKeys = KnownKeys::Struct(&[
    (
        "vault",
        KnownKeys::Struct(&[
            ("key_protection", KnownKeys::Leaf),
            ("keyring_service", KnownKeys::Leaf),
            ("kdf_iterations", KnownKeys::Leaf),
            ("throttle", THROTTLE_KEYS),
        ]),
    ),
    (
        "storage",
        KnownKeys::Struct(&[
            ("data_dir", KnownKeys::Leaf),
            ("config_file_name", KnownKeys::Leaf),
            ("database_file_name", KnownKeys::Leaf),
        ]),
    ),
]);

/// Validate a config file on disk.
#[must_use]
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = match std::fs::read_to_string(path) {
        Ok(raw) => validate_str(&crate::env_subst::substitute_env(&raw), path),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(path.to_path_buf());
    result
}

/// Validate raw config text; the format is taken from `path`'s extension.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match crate::loader::parse_config_value(raw, path) {
        Ok(value) => value,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &SCHEMA, "", &mut diagnostics);

    match serde_json::from_value::<PassvaultConfig>(value) {
        Ok(config) => diagnostics.extend(validate_config(&config).diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on an already parsed config.
#[must_use]
pub fn validate_config(config: &PassvaultConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let vault = &config.vault;

    if vault.kdf_iterations == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "vault.kdf_iterations",
            "must be at least 1",
        ));
    } else if vault.kdf_iterations < MIN_RECOMMENDED_ITERATIONS {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "security",
            "vault.kdf_iterations",
            format!(
                "{} iterations makes offline guessing cheap; use at least {MIN_RECOMMENDED_ITERATIONS}",
                vault.kdf_iterations
            ),
        ));
    }

    if vault.throttle.max_attempts == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "vault.throttle.max_attempts",
            "must be at least 1",
        ));
    }
    if vault.throttle.lockout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "vault.throttle.lockout_secs",
            "must be at least 1",
        ));
    }
    if vault.throttle.lockout_secs > MAX_LOCKOUT_SECS {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "vault.throttle.lockout_secs",
            format!("must be at most {MAX_LOCKOUT_SECS}"),
        ));
    }

    if vault.key_protection == KeyProtection::Development {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "security",
            "vault.key_protection",
            "development protection seals the vault config with a key built into the binary",
        ));
    }
    if vault.key_protection == KeyProtection::Platform && vault.keyring_service.trim().is_empty()
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "vault.keyring_service",
            "must not be empty when key_protection is \"platform\"",
        ));
    }

    let storage = &config.storage;
    for (key, name) in [
        ("storage.config_file_name", &storage.config_file_name),
        ("storage.database_file_name", &storage.database_file_name),
    ] {
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "value",
                key,
                "must be a plain file name",
            ));
        }
    }
    if storage.config_file_name == storage.database_file_name {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "storage.database_file_name",
            "must differ from storage.config_file_name",
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(map), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.iter().find(|(name, _)| *name == key.as_str()) {
            Some((_, child_schema)) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
                let message = match suggest(key, &names, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            },
        }
    }
}

/// Levenshtein edit distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| (1..=max_distance).contains(d))
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn toml(raw: &str) -> ValidationResult {
        validate_str(raw, Path::new("passvault.toml"))
    }

    fn platform_config() -> PassvaultConfig {
        let mut config = PassvaultConfig::default();
        config.vault.key_protection = KeyProtection::Platform;
        config
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("vault", "vault"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("vualt", "vault"), 2);
        assert_eq!(levenshtein("storag", "storage"), 1);
    }

    #[test]
    fn platform_defaults_have_no_diagnostics() {
        assert!(validate_config(&platform_config()).diagnostics.is_empty());
    }

    #[test]
    fn development_protection_is_flagged() {
        let result = validate_config(&PassvaultConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(result.diagnostics[0].path, "vault.key_protection");
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = toml("[vualt]\nkdf_iterations = 1\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(d.path, "vualt");
        assert!(d.message.contains("did you mean \"vault\""));
    }

    #[test]
    fn unknown_nested_key_with_suggestion() {
        let result = toml("[vault.throttle]\nmax_attempt = 3\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(d.path, "vault.throttle.max_attempt");
        assert!(d.message.contains("max_attempts"));
    }

    #[test]
    fn zero_limits_are_errors() {
        let mut config = platform_config();
        config.vault.throttle.max_attempts = 0;
        config.vault.throttle.lockout_secs = 0;
        config.vault.kdf_iterations = 0;
        let result = validate_config(&config);
        assert_eq!(result.count(Severity::Error), 3);
    }

    #[test]
    fn oversized_lockout_is_an_error() {
        let mut config = platform_config();
        config.vault.throttle.lockout_secs = u64::MAX;
        let result = validate_config(&config);
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.diagnostics[0].path, "vault.throttle.lockout_secs");
    }

    #[test]
    fn low_iterations_warned() {
        let mut config = platform_config();
        config.vault.kdf_iterations = 10_000;
        let result = validate_config(&config);
        assert!(!result.has_errors());
        assert_eq!(result.diagnostics[0].category, "security");
    }

    #[test]
    fn file_names_must_be_plain_and_distinct() {
        let mut config = platform_config();
        config.storage.config_file_name = "../vault.json".into();
        config.storage.database_file_name = "../vault.json".into();
        let result = validate_config(&config);
        assert_eq!(result.count(Severity::Error), 3);
    }

    #[test]
    fn syntax_error_detected() {
        let result = toml("[vault\n");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_detected() {
        let result = toml("[vault]\nkdf_iterations = \"many\"\n");
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn yaml_is_validated_too() {
        let result = validate_str(
            "vault:\n  key_protection: platform\n  kdf_iterations: 600000\n",
            Path::new("passvault.yaml"),
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn validate_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passvault.toml");
        std::fs::write(&path, "[vault]\nkey_protection = \"platform\"\n").unwrap();
        let result = validate_file(&path);
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(!result.has_errors());
    }
}
