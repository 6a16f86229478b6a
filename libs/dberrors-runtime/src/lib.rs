//! Process plumbing shared by the `dberrors` binaries: layered configuration and logging.

pub mod config;
pub mod logging;

pub use config::{AppConfig, CliArgs, LoggingConfig, OutputFormat, Section};
pub use logging::init_logging_from_config;
