//! CLI handlers for `cellplan plan` and `cellplan notes` subcommands.
//!
//! Implements:
//! - `cellplan plan show`            -- print the decoded plan
//! - `cellplan plan raw`             -- print the stored markdown
//! - `cellplan plan create <file>`   -- create a plan from a TOML file
//! - `cellplan plan init`            -- write the starter plan into an empty cell
//! - `cellplan plan status`          -- task counts by status
//! - `cellplan notes add <line>`     -- append to the notes section

use std::path::Path;

use anyhow::{Context, Result};

use cellplan_core::plan::parse_plan_file;
use cellplan_core::{Plan, PlanError, PlanProgress, PlanStore, Task, TaskStatus};

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, store: &PlanStore) -> Result<()> {
    match command {
        PlanCommands::Show => cmd_show(store).await,
        PlanCommands::Raw => cmd_raw(store).await,
        PlanCommands::Create { file } => cmd_create(store, &file).await,
        PlanCommands::Init => cmd_init(store).await,
        PlanCommands::Status => cmd_status(store).await,
    }
}

/// Fetch the plan, turning an empty cell into [`PlanError::NoPlan`].
pub async fn require_plan(store: &PlanStore) -> Result<Plan> {
    Ok(store.get_plan().await?.ok_or(PlanError::NoPlan)?)
}

// -----------------------------------------------------------------------
// Formatting helpers
// -----------------------------------------------------------------------

/// One-line rendering of a task for terminal output.
pub fn describe_task(task: &Task) -> String {
    let mut line = format!("[{}] {} {}", task.status.marker(), task.step, task.title);
    match task.status {
        TaskStatus::Done => {
            if let Some(date) = task.completed_date {
                line.push_str(&format!("  (done {date})"));
            }
        }
        TaskStatus::Blocked => {
            if let Some(reason) = &task.blocked_reason {
                line.push_str(&format!("  (blocked: {reason})"));
            }
        }
        TaskStatus::Review => {
            if let Some(note) = &task.review_note {
                line.push_str(&format!("  (review: {note})"));
            }
        }
        TaskStatus::Todo | TaskStatus::Doing => {}
    }
    line
}

fn progress_line(progress: &PlanProgress) -> String {
    format!(
        "{}/{} done ({} todo, {} doing, {} blocked, {} review)",
        progress.done,
        progress.total(),
        progress.todo,
        progress.doing,
        progress.blocked,
        progress.review
    )
}

// -----------------------------------------------------------------------
// cellplan plan show
// -----------------------------------------------------------------------

async fn cmd_show(store: &PlanStore) -> Result<()> {
    let plan = require_plan(store).await?;

    println!("Plan: {}", plan.title);
    println!("Goal: {}", plan.goal);
    println!("Progress: {}", progress_line(&plan.progress()));

    if let Some(analysis) = &plan.analysis {
        let fields = [
            ("Spreadsheet", &analysis.spreadsheet),
            ("Key sheets", &analysis.key_sheets),
            ("Read", &analysis.read_range),
            ("Write", &analysis.write_range),
            ("Current state", &analysis.current_state),
        ];
        println!();
        println!("Analysis:");
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {label}: {value}");
            }
        }
    }

    if let Some(questions) = plan.questions.as_ref().filter(|q| !q.is_empty()) {
        println!();
        println!("Questions:");
        for question in questions {
            println!("  - {question}");
        }
    }

    for phase in &plan.phases {
        println!();
        println!("Phase {}: {}", phase.number, phase.name);
        if phase.tasks.is_empty() {
            println!("  (no tasks)");
        }
        for task in &phase.tasks {
            println!("  {}", describe_task(task));
        }
    }

    if !plan.notes.is_empty() {
        println!();
        println!("Notes:");
        for line in plan.notes.lines() {
            println!("  {line}");
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------
// cellplan plan raw
// -----------------------------------------------------------------------

async fn cmd_raw(store: &PlanStore) -> Result<()> {
    let plan = require_plan(store).await?;
    print!("{}", plan.raw);
    if !plan.raw.ends_with('\n') {
        println!();
    }
    Ok(())
}

// -----------------------------------------------------------------------
// cellplan plan create <file>
// -----------------------------------------------------------------------

/// Read a plan TOML file from disk, validate it and overwrite the plan cell.
async fn cmd_create(store: &PlanStore, file_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read plan file: {}", file_path.display()))?;

    let template = parse_plan_file(&content)
        .with_context(|| format!("failed to parse plan file: {}", file_path.display()))?;

    let plan = store.create_plan(&template).await?;

    println!("Plan created in {}.", store.cell().cell());
    println!();
    println!("  Title:  {}", plan.title);
    println!("  Phases: {}", plan.phases.len());
    println!("  Tasks:  {}", plan.progress().total());
    Ok(())
}

// -----------------------------------------------------------------------
// cellplan plan init
// -----------------------------------------------------------------------

async fn cmd_init(store: &PlanStore) -> Result<()> {
    if store.init_workspace().await? {
        println!("Starter plan written to {}.", store.cell().cell());
    } else {
        println!(
            "A plan already exists in {}; left unchanged.",
            store.cell().cell()
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// cellplan plan status
// -----------------------------------------------------------------------

async fn cmd_status(store: &PlanStore) -> Result<()> {
    let plan = require_plan(store).await?;
    let progress = plan.progress();

    println!("Plan: {}", plan.title);
    println!("Progress: {}", progress_line(&progress));
    for phase in &plan.phases {
        let done = phase
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count();
        println!(
            "  Phase {}: {}  {done}/{}",
            phase.number,
            phase.name,
            phase.tasks.len()
        );
    }
    if progress.is_complete() {
        println!("All tasks done.");
    }
    Ok(())
}

// -----------------------------------------------------------------------
// cellplan notes add <line>
// -----------------------------------------------------------------------

pub async fn cmd_notes_add(store: &PlanStore, line: &str) -> Result<()> {
    store.append_notes(line).await?;
    println!("Note added.");
    Ok(())
}
