use {
    anyhow::Result,
    clap::Subcommand,
    std::path::{Path, PathBuf},
    tracing::warn,
};

use passvault_config::{
    LoadedConfig, PassvaultConfig, Severity, ValidationResult, apply_env_overrides,
    discover_and_load, find_config_file, load_config, validate_config, validate_file,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration as JSON.
    Show,
}

/// Load `explicit` when given, otherwise discover a config file. Env
/// overrides apply first, then `data_dir`.
pub fn load(explicit: Option<&Path>, data_dir: Option<PathBuf>) -> Result<LoadedConfig> {
    let mut loaded = match explicit {
        Some(path) => {
            let mut config = load_config(path)?;
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            LoadedConfig {
                config,
                path: Some(path.to_path_buf()),
            }
        },
        None => discover_and_load()?,
    };
    if let Some(dir) = data_dir {
        loaded.config.storage.data_dir = Some(dir);
    }
    Ok(loaded)
}

/// Refuse to start on a config with validation errors; log its warnings.
pub fn ensure_valid(config: &PassvaultConfig) -> Result<()> {
    let result = validate_config(config);
    let mut errors = Vec::new();
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => errors.push(format!("{}: {}", d.path, d.message)),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => {},
        }
    }
    if !errors.is_empty() {
        anyhow::bail!("invalid configuration: {}", errors.join("; "));
    }
    Ok(())
}

pub fn handle_config(
    action: ConfigAction,
    explicit: Option<&Path>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => {
            let path = explicit.map(Path::to_path_buf).or_else(find_config_file);
            check(path.as_deref(), verbose)
        },
        ConfigAction::Show => {
            let loaded = load(explicit, data_dir)?;
            println!("{}", serde_json::to_string_pretty(&loaded.config)?);
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(path: Option<&Path>, verbose: bool) -> Result<()> {
    let result: ValidationResult = match path {
        Some(path) => {
            eprintln!("Checking {}\n", path.display());
            validate_file(path)
        },
        None => {
            eprintln!("No config file found; checking defaults.\n");
            validate_config(&PassvaultConfig::default())
        },
    };

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!(
                "  {BOLD}{color}{}{RESET} {}: {}",
                d.severity, d.path, d.message
            );
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if result.has_errors() {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}
