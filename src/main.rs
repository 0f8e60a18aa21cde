use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wrappy::cli::{Cli, Commands};
use wrappy::types::config::Config;
use wrappy::WrappyResult;

fn main() -> WrappyResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    // Determine log level: CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("wrappy={}", log_level)
            .parse()
            .unwrap_or_else(|_| "wrappy=info".parse().expect("fallback directive is valid")),
    );

    let (text_layer, json_layer) = if config.general.log_format == "json" {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(filter)
        .init();

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            wrappy::cli::commands::init(path)?;
        }
        Commands::Inspect { snapshot, limit } => {
            wrappy::cli::commands::inspect(&snapshot, limit)?;
        }
        Commands::Factorial { values } => {
            wrappy::cli::commands::factorial(&values, &config)?;
        }
        Commands::Version => {
            wrappy::cli::commands::version();
        }
    }

    Ok(())
}
