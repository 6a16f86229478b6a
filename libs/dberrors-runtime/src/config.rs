use anyhow::{Context, Result};
use dberrors::Dialect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variables with this prefix override the file, e.g. `DBERRORS__OUTPUT=text`.
pub const ENV_PREFIX: &str = "DBERRORS__";

/// Application configuration for the `dberrors` tools.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// How classification results are printed.
    #[serde(default)]
    pub output: OutputFormat,
    /// Dialect used when the command line does not name one.
    #[serde(default)]
    pub default_dialect: Option<Dialect>,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown output format '{0}' (expected 'json' or 'text')")]
pub struct OutputFormatParseError(String);

impl FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            _ => Err(OutputFormatParseError(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        })
    }
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    /// Empty disables the file sink.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    /// Rotated files older than this are removed. Ignored when `max_backups` is set.
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Create a default logging configuration.
///
/// Console output stays at `warn` so diagnostics do not drown the classification result.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert("default".to_string(), default_section());
    logging
}

fn default_section() -> Section {
    Section {
        console_level: "warn".to_string(),
        file: String::new(),
        file_level: "debug".to_string(),
        max_age_days: Some(7),
        max_backups: Some(3),
        max_size_mb: Some(100),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            default_dialect: None,
            logging: Some(default_logging_config()),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        Self::load_with_env_prefix(config_path.as_ref(), ENV_PREFIX)
    }

    fn load_with_env_prefix(config_path: &Path, env_prefix: &str) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        if !config_path.exists() {
            anyhow::bail!("config file '{}' does not exist", config_path.display());
        }

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path))
            // Example: DBERRORS__DEFAULT_DIALECT=mysql maps to default_dialect
            .merge(Env::prefixed(env_prefix).split("__"));

        figment.extract().with_context(|| {
            format!(
                "Failed to extract config from figment ({})",
                config_path.display()
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
        if let Some(format) = args.format {
            self.output = format;
        }
        if let Some(dialect) = args.dialect {
            self.default_dialect = Some(dialect);
        }

        // Set logging level based on verbose flags for "default" section.
        let logging = self.logging.get_or_insert_with(default_logging_config);
        let section = logging
            .entry("default".to_string())
            .or_insert_with(default_section);
        section.console_level = match args.verbose {
            0 => section.console_level.clone(), // keep
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        };
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub print_config: bool,
    pub verbose: u8,
    pub format: Option<OutputFormat>,
    pub dialect: Option<Dialect>,
}
