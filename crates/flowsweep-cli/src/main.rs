//! flowsweep CLI - Retention cleanup for Prefect metadata databases.

use clap::Parser;
use flowsweep_cli::commands;
use flowsweep_cli::config::PREFECT_DATABASE_ENV;
use flowsweep_cli::{log_filter, Cli, Command, Config, Formatter};
use flowsweep_domain::DatabaseTarget;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> flowsweep_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing (log to stderr, stdout carries command output)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    // Load config
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = cli.backup_dir {
        config.backup.directory = dir;
    }

    // Determine output format
    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Status => {
            let target = resolve_target(&config, cli.database.as_deref())?;
            commands::execute_status(&config, &target, &formatter)?
        }
        Command::Cleanup(args) => {
            let target = resolve_target(&config, cli.database.as_deref())?;
            commands::execute_cleanup(args, &config, &target, &formatter)?
        }
        Command::Backup(args) => {
            let target = resolve_target(&config, cli.database.as_deref())?;
            commands::execute_backup(args, &config, &target, &formatter)?
        }
        Command::Watch(args) => {
            let target = resolve_target(&config, cli.database.as_deref())?;
            commands::execute_watch(args, &config, &target, &formatter).await?
        }
        Command::Order => commands::execute_order(&formatter)?,
        Command::Policies => commands::execute_policies(&formatter)?,
    }

    Ok(())
}

/// Database from `--database`, the Prefect environment, or the config file.
fn resolve_target(config: &Config, flag: Option<&str>) -> flowsweep_cli::Result<DatabaseTarget> {
    let prefect_env = std::env::var(PREFECT_DATABASE_ENV).ok();
    let target = config.resolve_database(flag, prefect_env.as_deref())?;
    tracing::info!("Using database {}", target.identity());
    Ok(target)
}
