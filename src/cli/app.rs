//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{deps, task};
use crate::domain::{find_next, DependencyError, ErrorKind, IdError, StoreError};
use crate::storage::{Config, ConfigError, Project, ProjectError, StorageError};

#[derive(Parser)]
#[command(name = "taskmap")]
#[command(author, version, about = "Dependency-aware task lists that never go cyclic")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Task file to operate on (defaults to the project's .taskmap/tasks.json)
    #[arg(long, global = true, env = "TASKMAP_FILE")]
    pub file: Option<PathBuf>,

    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Never clear subtask dependencies to keep a parent startable
    #[arg(long, global = true)]
    pub no_enforce_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskmap project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Manage tasks and subtasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage, validate and repair dependencies
    #[command(subcommand)]
    Deps(deps::DepsCommands),

    /// Show the next task to work on
    Next,
}

/// Main entry point for the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format);

    match execute(cli, &config, &output) {
        Ok(code) => Ok(code),
        Err(err) if output.is_json() => {
            output.error(&format!("{:#}", err), error_kind(&err));
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err),
    }
}

fn execute(cli: Cli, config: &Config, output: &Output) -> Result<ExitCode> {
    if let Commands::Init { path } = &cli.command {
        let project = Project::init(path)?;
        output.success(&format!(
            "Initialized taskmap project at {}",
            project.root().display()
        ));
        return Ok(ExitCode::SUCCESS);
    }

    let session = Session::open(cli.file, config, cli.no_enforce_progress)?;

    let code = match cli.command {
        Commands::Init { .. } => ExitCode::SUCCESS,
        Commands::Task(cmd) => task::run(cmd, &session, output)?,
        Commands::Deps(cmd) => deps::run(cmd, &session, output)?,
        Commands::Next => next(&session, output)?,
    };

    debug!("command completed");
    Ok(code)
}

/// Installs the stderr subscriber. `--verbose` wins over the environment.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("taskmap=debug")
    } else {
        EnvFilter::try_from_env("TASKMAP_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("taskmap=warn"))
    };

    // A subscriber may already be set when embedded; keep the existing one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Finds the error category anywhere in the context chain
fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<DependencyError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<StoreError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<StorageError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<IdError>() {
            Some(e.kind())
        } else if cause.downcast_ref::<ConfigError>().is_some() {
            Some(ErrorKind::Validation)
        } else if let Some(e) = cause.downcast_ref::<ProjectError>() {
            Some(match e {
                ProjectError::NotInProject => ErrorKind::NotFound,
                ProjectError::CreateFailed(_) => ErrorKind::Io,
            })
        } else {
            None
        }
    })
}

fn next(session: &Session, output: &Output) -> Result<ExitCode> {
    let store = session.load()?;
    let item = find_next(&store);

    if output.is_json() {
        output.data(&item);
        return Ok(ExitCode::SUCCESS);
    }

    match item {
        Some(item) => {
            println!("Next: {} - {}", item.id, item.title);
            println!("Status: {}", item.status);
            println!("Priority: {}", item.priority);
            if let Some(parent) = item.parent_id {
                println!("Parent: {}", parent);
            }
            if !item.dependencies.is_empty() {
                let deps: Vec<String> = item.dependencies.iter().map(|d| d.to_string()).collect();
                println!("Depends on: {}", deps.join(", "));
            }
        }
        None => println!("No eligible task"),
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;
    use anyhow::Context;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn error_kind_looks_through_context() {
        let err = Err::<(), _>(StoreError::HasSubtasks(3))
            .context("Failed to demote")
            .unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::StateConflict));

        let err = anyhow::Error::new(DependencyError::NotFound(NodeId::task(9)));
        assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));

        assert_eq!(error_kind(&anyhow::anyhow!("plain")), None);
    }
}
