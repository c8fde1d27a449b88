mod config;
mod plan_cmds;
mod task_cmds;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cellplan_core::{PlanError, TaskStatus};
use cellplan_sheets::SheetsConfig;

use config::{CellplanConfig, CliOverrides};

#[derive(Parser)]
#[command(name = "cellplan", about = "Markdown task plans stored in a spreadsheet cell")]
struct Cli {
    /// Use a local JSON file instead of the spreadsheet API
    #[arg(long, global = true)]
    local: Option<PathBuf>,

    /// Spreadsheet ID (overrides CELLPLAN_SPREADSHEET_ID env var)
    #[arg(long, global = true)]
    spreadsheet_id: Option<String>,

    /// Cell holding the plan, e.g. `_plan!A1` (overrides CELLPLAN_PLAN_CELL)
    #[arg(long, global = true)]
    plan_cell: Option<String>,

    /// Fail on the first remote error instead of retrying
    #[arg(long, global = true)]
    no_retry: bool,

    /// Refuse to write if the plan changed since it was read
    #[arg(long, global = true)]
    check_version: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a cellplan config file (uses --spreadsheet-id and --plan-cell)
    Init {
        /// OAuth access token for the spreadsheet API
        #[arg(long)]
        access_token: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show the next todo task
    Next,
    /// List tasks flagged for review
    Review,
    /// Change a task's status
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Plan notes
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show the decoded plan
    Show,
    /// Print the raw markdown stored in the plan cell
    Raw,
    /// Create a plan from a TOML file, replacing any existing plan
    Create {
        /// Path to the plan TOML file
        file: PathBuf,
    },
    /// Write the starter plan if the cell is empty
    Init,
    /// Show task counts by status
    Status,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Start a todo, blocked or review task
    Start {
        /// Step id, e.g. 1.2
        step: String,
    },
    /// Complete a task in progress
    Done { step: String },
    /// Block a task in progress
    Block {
        step: String,
        /// Why the task cannot continue
        reason: String,
    },
    /// Flag a task in progress for review
    Flag {
        step: String,
        /// What the reviewer should look at
        note: String,
    },
    /// Set any status, bypassing the transition rules
    Set {
        step: String,
        /// doing, done, blocked or review
        status: TaskStatus,
        /// Reason or note (required for blocked and review)
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum NotesCommands {
    /// Append a line to the plan notes
    Add {
        /// Text to append
        line: String,
    },
}

/// Execute the `cellplan init` command: write config file.
fn cmd_init(
    spreadsheet_id: Option<&str>,
    plan_cell: Option<&str>,
    access_token: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let Some(spreadsheet_id) = spreadsheet_id else {
        anyhow::bail!("`cellplan init` needs --spreadsheet-id");
    };
    let plan_cell = plan_cell.unwrap_or(SheetsConfig::DEFAULT_PLAN_CELL);
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    plan_cell
        .parse::<cellplan_sheets::CellRef>()
        .map_err(|e| anyhow::anyhow!("invalid plan cell {plan_cell:?}: {e}"))?;

    let has_token = access_token.is_some();
    let cfg = config::ConfigFile {
        sheets: config::SheetsSection {
            spreadsheet_id: spreadsheet_id.to_string(),
            plan_cell: Some(plan_cell.to_string()),
            api_base: None,
        },
        auth: config::AuthSection { access_token },
        ..config::ConfigFile::default()
    };

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  sheets.spreadsheet_id = {spreadsheet_id}");
    println!("  sheets.plan_cell = {plan_cell}");
    if has_token {
        println!("  auth.access_token = (set)");
    }
    println!();
    println!("Next: run `cellplan plan init` to write a starter plan.");

    Ok(())
}

/// Hint printed under an error, by error class.
fn hint(err: &PlanError) -> Option<String> {
    if err.is_retry_exhausted() {
        return Some("the spreadsheet service is unavailable or rate limited; try again later".into());
    }
    if err.is_fatal_remote() {
        return Some(
            "check that the spreadsheet is shared with this account and the access token is valid"
                .into(),
        );
    }
    match err {
        PlanError::NoPlan => Some(
            "create a plan first: `cellplan plan create <file.toml>` or `cellplan plan init`".into(),
        ),
        PlanError::TaskNotFound { available, .. } if available.is_empty() => {
            Some("the plan has no tasks".into())
        }
        PlanError::TaskNotFound { available, .. } => {
            Some(format!("available steps: {}", available.join(", ")))
        }
        PlanError::InvalidTransition { .. } => {
            Some("use `cellplan task set` to force a status".into())
        }
        PlanError::MissingAnnotation { .. } => {
            Some("pass a non-empty reason or note".into())
        }
        PlanError::StaleWrite { .. } => {
            Some("the plan was edited by someone else; re-run the command".into())
        }
        PlanError::Remote(_) => None,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init {
        access_token,
        force,
    } = cli.command
    {
        return cmd_init(
            cli.spreadsheet_id.as_deref(),
            cli.plan_cell.as_deref(),
            access_token,
            force,
        );
    }

    let overrides = CliOverrides {
        local: cli.local,
        spreadsheet_id: cli.spreadsheet_id,
        plan_cell: cli.plan_cell,
        no_retry: cli.no_retry,
        check_version: cli.check_version,
    };
    let resolved = CellplanConfig::resolve(&overrides)?;
    let store = resolved.store()?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Plan { command } => plan_cmds::run_plan_command(command, &store).await,
        Commands::Next => task_cmds::cmd_next(&store).await,
        Commands::Review => task_cmds::cmd_review(&store).await,
        Commands::Task { command } => task_cmds::run_task_command(command, &store).await,
        Commands::Notes {
            command: NotesCommands::Add { line },
        } => plan_cmds::cmd_notes_add(&store, &line).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        if let Some(text) = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<PlanError>())
            .and_then(hint)
        {
            eprintln!("hint: {text}");
        }
        std::process::exit(1);
    }
}
