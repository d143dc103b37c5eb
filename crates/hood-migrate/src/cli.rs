//! Command-line interface of the `hood` tool and of project runner binaries.
//!
//! The `hood` binary scaffolds files and forwards the `db:*` commands to the
//! project's runner binary, which calls [`run`] with its compiled
//! migrations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hood::config::{CONFIG_PATH, DEFAULT_ENV, ENV_VAR};
use hood::{Config, Dialect, Environments, Hood, HoodError, Registry};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::runner::Runner;
use crate::scaffold::{self, MIGRATIONS_DIR, RUNNER_BIN};

/// Database commands, run in-process by a runner binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum DbCommand {
    /// Apply pending migrations.
    #[command(name = "db:migrate")]
    Migrate,

    /// Roll back the last applied migration.
    #[command(name = "db:rollback")]
    Rollback,

    /// Show the current version and pending migrations.
    #[command(name = "db:status")]
    Status,

    /// Print the schema produced by all migrations as model declarations.
    ///
    /// The schema is replayed from the migrations, not read from the
    /// database.
    #[command(name = "db:schema")]
    Schema,
}

impl DbCommand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Migrate => "db:migrate",
            Self::Rollback => "db:rollback",
            Self::Status => "db:status",
            Self::Schema => "db:schema",
        }
    }
}

/// Arguments of a project runner binary.
#[derive(Debug, Parser)]
#[command(name = "migrate", about = "Run the migrations of a hood project", long_about = None)]
pub struct RunnerCli {
    /// Config file with one entry per environment.
    #[arg(short, long, default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// Environment to use from the config file.
    #[arg(short, long, env = ENV_VAR, default_value = DEFAULT_ENV)]
    pub env: String,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: DbCommand,
}

/// Arguments of the `hood` tool.
#[derive(Debug, Parser)]
#[command(name = "hood", author, version, long_about = None)]
#[command(about = "Migrations and configuration for hood projects")]
pub struct HoodCli {
    /// Migrations directory, relative to the project root.
    #[arg(short, long, default_value = MIGRATIONS_DIR)]
    pub migrations_dir: PathBuf,

    /// Config file with one entry per environment.
    #[arg(short, long, default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// Environment to use from the config file.
    #[arg(short, long, env = ENV_VAR, default_value = DEFAULT_ENV)]
    pub env: String,

    /// Name of the project's runner binary.
    #[arg(short, long, default_value = RUNNER_BIN)]
    pub runner: String,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: HoodCommand,
}

#[derive(Debug, Subcommand)]
pub enum HoodCommand {
    /// Create an empty migration and register it.
    #[command(name = "create:migration")]
    CreateMigration {
        /// Migration name, e.g. `create_users`.
        name: String,
    },

    /// Create the config file template.
    #[command(name = "create:config")]
    CreateConfig,

    #[command(flatten)]
    Db(DbCommand),
}

/// Installs the global log subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Entry point of a runner binary: parses the command line and runs the
/// command against the configured environment.
///
/// # Errors
///
/// Returns the first error; the binary exits non-zero.
pub async fn run(runner: Runner) -> anyhow::Result<()> {
    let cli = RunnerCli::parse();
    init_logging(cli.verbose)?;
    execute(&runner, &cli.config, &cli.env, cli.command).await
}

/// Runs one database command with `runner`.
///
/// # Errors
///
/// Returns config, connection and migration errors.
pub async fn execute(
    runner: &Runner,
    config: &Path,
    env: &str,
    command: DbCommand,
) -> anyhow::Result<()> {
    let registry = Registry::with_defaults();
    let envs = Environments::load(config)?;
    let Config { driver, source } = envs.get(env)?;
    let dialect = registry
        .get(driver)
        .ok_or_else(|| HoodError::UnknownDialect(driver.clone()))?;
    let mut hood = Hood::open(&registry, driver, source)
        .await
        .with_context(|| format!("cannot open environment '{env}'"))?;
    let result = dispatch_db(runner, &mut hood, dialect, command).await;
    hood.close().await;
    result
}

async fn dispatch_db(
    runner: &Runner,
    hood: &mut Hood,
    dialect: Arc<dyn Dialect>,
    command: DbCommand,
) -> anyhow::Result<()> {
    match command {
        DbCommand::Migrate => {
            let applied = runner.migrate(hood).await?;
            println!("applied {} migrations", applied.len());
        }
        DbCommand::Rollback => match runner.rollback(hood).await? {
            Some(stamp) => println!("rolled back {stamp}"),
            None => println!("nothing to roll back"),
        },
        DbCommand::Status => {
            let current = runner.status(hood).await?;
            println!("current version: {current}");
            for migration in runner.pending(current) {
                println!("  pending {} {}", migration.timestamp(), migration.name());
            }
        }
        DbCommand::Schema => print!("{}", runner.schema(dialect).await?.declaration()),
    }
    Ok(())
}

/// Arguments passed to the runner binary for `command`.
fn runner_args(cli: &HoodCli, command: DbCommand) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--quiet".to_string(),
        "--bin".to_string(),
        cli.runner.clone(),
        "--".to_string(),
        "--config".to_string(),
        cli.config.display().to_string(),
        "--env".to_string(),
        cli.env.clone(),
    ];
    if cli.verbose {
        args.push("--verbose".to_string());
    }
    args.push(command.as_str().to_string());
    args
}

/// Runs a command of the `hood` tool from the project root.
///
/// # Errors
///
/// Returns scaffolding errors, or an error if the runner binary fails.
pub async fn dispatch(cli: &HoodCli) -> anyhow::Result<()> {
    match &cli.command {
        HoodCommand::CreateMigration { name } => {
            let stamp = chrono::Utc::now().timestamp();
            let path = scaffold::create_migration(&cli.migrations_dir, name, stamp)?;
            println!("created migration {}", path.display());
            let root = Path::new(".");
            if let Some(bin) = scaffold::create_runner(root, &cli.migrations_dir, &cli.runner)? {
                println!("created runner {}", bin.display());
            }
        }
        HoodCommand::CreateConfig => {
            scaffold::create_config(&cli.config)?;
            println!("created config {}", cli.config.display());
        }
        HoodCommand::Db(command) => {
            let args = runner_args(cli, *command);
            info!(runner = %cli.runner, command = command.as_str(), "running migrations");
            let status = tokio::process::Command::new("cargo")
                .args(&args)
                .status()
                .await
                .context("cannot start cargo")?;
            if !status.success() {
                bail!("{} failed with {status}", command.as_str());
            }
        }
    }
    Ok(())
}
