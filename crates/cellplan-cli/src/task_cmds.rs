//! CLI handlers for task queries and `cellplan task` subcommands.

use anyhow::{Result, bail};

use cellplan_core::{PlanStore, Task, TaskStatus, Transition};

use crate::TaskCommands;
use crate::plan_cmds::{describe_task, require_plan};

/// Dispatch a `TaskCommands` variant to the appropriate handler.
pub async fn run_task_command(command: TaskCommands, store: &PlanStore) -> Result<()> {
    let task = match command {
        TaskCommands::Start { step } => store.start(&step).await?,
        TaskCommands::Done { step } => store.complete(&step).await?,
        TaskCommands::Block { step, reason } => store.block(&step, &reason).await?,
        TaskCommands::Flag { step, note } => store.flag_review(&step, &note).await?,
        TaskCommands::Set { step, status, note } => {
            let transition = transition_for(status, note)?;
            store.update_task(&step, transition).await?
        }
    };
    print_updated(&task);
    Ok(())
}

/// Build the transition for `task set`.
fn transition_for(status: TaskStatus, note: Option<String>) -> Result<Transition> {
    let note = note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
    Ok(match (status, note) {
        (TaskStatus::Doing, _) => Transition::Doing,
        (TaskStatus::Done, _) => Transition::Done,
        (TaskStatus::Blocked, Some(reason)) => Transition::Blocked { reason },
        (TaskStatus::Review, Some(note)) => Transition::Review { note },
        (TaskStatus::Blocked | TaskStatus::Review, None) => {
            bail!("status {status} needs --note")
        }
        (TaskStatus::Todo, _) => bail!("tasks cannot be moved back to todo"),
    })
}

fn print_updated(task: &Task) {
    println!("Task {} is now {}.", task.step, task.status);
    println!("  {}", describe_task(task));
}

// -----------------------------------------------------------------------
// cellplan next
// -----------------------------------------------------------------------

pub async fn cmd_next(store: &PlanStore) -> Result<()> {
    let plan = require_plan(store).await?;
    match cellplan_core::TaskStateMachine::next_task(&plan) {
        Some(task) => println!("{}", describe_task(task)),
        None if plan.progress().is_complete() => println!("All tasks done."),
        None => println!("No todo tasks."),
    }
    Ok(())
}

// -----------------------------------------------------------------------
// cellplan review
// -----------------------------------------------------------------------

pub async fn cmd_review(store: &PlanStore) -> Result<()> {
    let tasks = store.get_review_tasks().await?;
    if tasks.is_empty() {
        println!("No tasks awaiting review.");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", describe_task(task));
    }
    Ok(())
}
