use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dberrors::{CanonicalError, Dialect, MssqlError, MySqlError, PgError, SharedError, SqliteError};
use dberrors_runtime::{AppConfig, CliArgs, OutputFormat};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// dberrors - classify native database errors into canonical violation kinds
#[derive(Parser)]
#[command(name = "dberrors")]
#[command(about = "Classify native database errors into canonical violation kinds")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one native error given as a JSON object
    Classify {
        /// Dialect of the error (postgres, mysql, sqlite, mssql); falls back to the configured default
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// File holding the JSON error; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format (json or text), overrides the configured one
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },
    /// List supported dialects
    Dialects,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (dialect, format) = match &cli.command {
        Some(Commands::Classify {
            dialect, format, ..
        }) => (*dialect, *format),
        _ => (None, None),
    };

    // CLI args passed down to config
    let args = CliArgs {
        print_config: cli.print_config,
        verbose: cli.verbose,
        format,
        dialect,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    // Relative log files live next to the config file.
    let logging_config = config.logging.clone().unwrap_or_default();
    let base_dir = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    dberrors_runtime::init_logging_from_config(&logging_config, &base_dir);
    tracing::debug!(output = %config.output, "dberrors starting");

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command {
        Some(Commands::Classify { input, .. }) => classify_command(&config, input.as_deref()),
        Some(Commands::Dialects) => {
            for dialect in Dialect::ALL {
                println!("{dialect}");
            }
            Ok(())
        }
        None => anyhow::bail!("no command given; run `dberrors --help` for usage"),
    }
}

fn classify_command(config: &AppConfig, input: Option<&Path>) -> Result<()> {
    let dialect = config
        .default_dialect
        .context("no dialect given: pass --dialect or set default_dialect in the config")?;

    let raw = read_input(input)?;
    let err = decode_native(dialect, &raw)?;
    tracing::info!(%dialect, error = %err, "classifying");

    let canonical = dberrors::classify(dialect, &err);
    println!("{}", render(canonical.as_ref(), config.output)?);
    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read error JSON from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse the JSON object into the native error type of `dialect`.
fn decode_native(dialect: Dialect, raw: &str) -> Result<SharedError> {
    let context = || format!("input is not a valid {dialect} error object");
    let err: SharedError = match dialect {
        Dialect::Postgres => Arc::new(serde_json::from_str::<PgError>(raw).with_context(context)?),
        Dialect::MySql => Arc::new(serde_json::from_str::<MySqlError>(raw).with_context(context)?),
        Dialect::Sqlite => {
            let mut e = serde_json::from_str::<SqliteError>(raw).with_context(context)?;
            // Callers often only know the extended code.
            if e.code == 0 && e.extended_code != 0 {
                e.code = e.extended_code & 0xff;
            }
            Arc::new(e)
        }
        Dialect::Mssql => Arc::new(serde_json::from_str::<MssqlError>(raw).with_context(context)?),
    };
    Ok(err)
}

fn render(canonical: Option<&CanonicalError>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&canonical).context("Failed to serialize result")
        }
        OutputFormat::Text => Ok(match canonical {
            Some(c) => format!("{}: {}", c.kind(), c),
            None => "no canonical interpretation".to_string(),
        }),
    }
}
