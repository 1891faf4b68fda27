use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use afk_core::{PlainFormatter, SettingsResolver};
use afk_db::{Database, Panel};
use afk_engine::{Engine, Ports};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use afk_cli::commands::accrual::{self, Action};
use afk_cli::commands::util::parse_instant;
use afk_cli::commands::{admin, stats, user};
use afk_cli::{AdminAction, Cli, Commands, Config, ConfigAction, UserAction};

/// Load configuration from the optional file path.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(())
}

/// Open the panel database, ensuring the parent directory exists.
fn open_panel(config: &Config) -> Result<Arc<Panel>> {
    ensure_parent(&config.panel_database_path)?;
    let panel = Panel::open_with_timeout(&config.panel_database_path, config.busy_timeout())
        .context("failed to open panel database")?;
    Ok(Arc::new(panel))
}

/// Open both databases and wire the engine to the panel.
fn open_engine(config: &Config) -> Result<Engine> {
    let panel = open_panel(config)?;
    ensure_parent(&config.database_path)?;
    let db = Database::open_with_timeout(&config.database_path, config.busy_timeout())
        .context("failed to open database")?;
    let ports = Ports::from_panel(&panel, formatter(config));
    Ok(Engine::new(db, ports, SettingsResolver::new(config.plugin_id.clone())))
}

fn formatter(config: &Config) -> PlainFormatter {
    PlainFormatter::new(config.currency_prefix.clone(), config.currency_suffix.clone())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout stays a single JSON document
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let now = match cli.at.as_deref() {
        Some(at) => parse_instant(at, Utc::now())?,
        None => Utc::now(),
    };

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    let config = load_config(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    let success = match command {
        Commands::Work { user } => {
            accrual::run(&mut stdout, &mut open_engine(&config)?, Action::Work, *user, now)?
        }
        Commands::Start { user } => {
            accrual::run(&mut stdout, &mut open_engine(&config)?, Action::Start, *user, now)?
        }
        Commands::Stop { user } => {
            accrual::run(&mut stdout, &mut open_engine(&config)?, Action::Stop, *user, now)?
        }
        Commands::Claim { user } => {
            accrual::run(&mut stdout, &mut open_engine(&config)?, Action::Claim, *user, now)?
        }
        Commands::Accrue { user } => {
            accrual::run(&mut stdout, &mut open_engine(&config)?, Action::Accrue, *user, now)?
        }
        Commands::Status { user, session } => {
            let action = if *session {
                Action::SessionStatus
            } else {
                Action::Status
            };
            accrual::run(&mut stdout, &mut open_engine(&config)?, action, *user, now)?
        }
        Commands::Stats { user, text } => {
            stats::run(&mut stdout, &mut open_engine(&config)?, *user, now, *text)?
        }
        Commands::Admin(action) => {
            let engine = open_engine(&config)?;
            match action {
                AdminAction::Stats => admin::stats(&mut stdout, &engine, now)?,
                AdminAction::Config(ConfigAction::Show) => admin::show_config(&mut stdout, &engine)?,
                AdminAction::Config(ConfigAction::Set { key, value }) => {
                    admin::set_config(&mut stdout, &engine, key, value)?
                }
            }
        }
        Commands::User(action) => {
            let panel = open_panel(&config)?;
            match action {
                UserAction::Add { user, name } => user::add(&mut stdout, &panel, *user, name)?,
                UserAction::Balance { user } => {
                    user::balance(&mut stdout, &panel, &formatter(&config), *user)?
                }
            }
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
