use anyhow::{Context, Result};
use metakit::IntrospectorConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application configuration of a process that hosts an introspector.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Settings handed to `metakit::init`.
    #[serde(default)]
    pub introspection: IntrospectorConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Base directory for relative log file paths. Empty means the current directory.
    #[serde(default)]
    pub log_dir: String,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/metakit.log"
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

impl Section {
    /// Console-only section at `level`.
    pub fn console(level: &str) -> Self {
        Self {
            console_level: level.to_string(),
            file: String::new(),
            file_level: String::new(),
            max_age_days: None,
            max_backups: None,
            max_size_mb: None,
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert("default".to_string(), Section::console("warn"));
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            introspection: IntrospectorConfig::default(),
            logging: Some(default_logging_config()),
            log_dir: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Logging stays None unless YAML/ENV provide it.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // Example: METAKIT__LOG_DIR=/var/log/metakit maps to log_dir
            .merge(Env::prefixed("METAKIT__").split("__"));

        figment.extract().with_context(|| {
            format!(
                "Failed to extract config from '{}'",
                config_path.as_ref().display()
            )
        })
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let logging = self.logging.get_or_insert_with(default_logging_config);
        let default_section = logging
            .entry("default".to_string())
            .or_insert_with(|| Section::console("warn"));
        default_section.console_level = match args.verbose {
            0 => default_section.console_level.clone(), // keep
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        };
    }

    /// Directory that relative log paths are resolved against.
    pub fn log_base_dir(&self) -> PathBuf {
        if self.log_dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.log_dir)
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub print_config: bool,
    pub verbose: u8,
}
