//! Plan store: the plan state machine bound to one remote cell.
//!
//! Every operation re-reads the cell; nothing is cached between calls.
//! Mutations run decode -> edit -> write strictly in sequence and never
//! retry on their own. Retries happen below, in [`ResilientCell`].

mod version;

pub use version::PlanVersion;

use cellplan_sheets::ResilientCell;
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::error::PlanError;
use crate::plan::{
    Plan, PlanProgress, PlanTemplate, Task, append_note, decode, render_plan, set_task_mark,
    starter_template,
};
use crate::state::{TaskStateMachine, Transition};

/// How mutations guard against concurrent writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Write unconditionally. A concurrent edit made between read and
    /// write is silently lost.
    #[default]
    LastWriteWins,
    /// Re-read the cell just before writing and fail with
    /// [`PlanError::StaleWrite`] if its content changed.
    CheckVersion,
}

/// A decoded plan together with the version of the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPlan {
    pub plan: Plan,
    pub version: PlanVersion,
}

/// High-level plan operations over a single plan cell.
#[derive(Debug, Clone)]
pub struct PlanStore {
    cell: ResilientCell,
    mode: WriteMode,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl PlanStore {
    pub fn new(cell: ResilientCell) -> Self {
        Self {
            cell,
            mode: WriteMode::default(),
            today: local_today,
        }
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the date source used for completion dates.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn cell(&self) -> &ResilientCell {
        &self.cell
    }

    pub fn write_mode(&self) -> WriteMode {
        self.mode
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current plan, or `None` when the cell is empty.
    pub async fn get_plan(&self) -> Result<Option<Plan>, PlanError> {
        let text = self.cell.read().await?;
        Ok(decode(&text))
    }

    /// Current plan with the version token needed by [`Self::update_task_if`].
    pub async fn get_plan_versioned(&self) -> Result<Option<VersionedPlan>, PlanError> {
        let text = self.cell.read().await?;
        let version = PlanVersion::of(&text);
        Ok(decode(&text).map(|plan| VersionedPlan { plan, version }))
    }

    /// First todo task, skipping blocked and review tasks.
    pub async fn get_next_task(&self) -> Result<Option<Task>, PlanError> {
        Ok(self
            .get_plan()
            .await?
            .and_then(|plan| TaskStateMachine::next_task(&plan).cloned()))
    }

    pub async fn get_review_tasks(&self) -> Result<Vec<Task>, PlanError> {
        Ok(self
            .get_plan()
            .await?
            .map(|plan| {
                TaskStateMachine::review_tasks(&plan)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn progress(&self) -> Result<Option<PlanProgress>, PlanError> {
        Ok(self.get_plan().await?.map(|plan| plan.progress()))
    }

    // -----------------------------------------------------------------------
    // Whole-plan writes
    // -----------------------------------------------------------------------

    /// Render `template` and overwrite whatever the cell holds.
    pub async fn create_plan(&self, template: &PlanTemplate) -> Result<Plan, PlanError> {
        let text = render_plan(template);
        self.cell.write(&text).await?;
        info!(
            cell = %self.cell.cell(),
            title = %template.title,
            phases = template.phases.len(),
            "plan created"
        );
        decode(&text).ok_or(PlanError::NoPlan)
    }

    /// Write the starter plan if the cell is empty. Returns whether a plan
    /// was written.
    pub async fn init_workspace(&self) -> Result<bool, PlanError> {
        let text = self.cell.read().await?;
        if decode(&text).is_some() {
            debug!(cell = %self.cell.cell(), "plan already present, leaving it alone");
            return Ok(false);
        }
        self.create_plan(&starter_template()).await?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Task mutations
    // -----------------------------------------------------------------------

    /// Apply any transition to task `step`, without checking the
    /// transition graph.
    pub async fn update_task(&self, step: &str, transition: Transition) -> Result<Task, PlanError> {
        self.mutate_task(step, transition, None, false).await
    }

    /// Like [`Self::update_task`], but fail with [`PlanError::StaleWrite`]
    /// unless the cell still holds the plan at `expected`.
    pub async fn update_task_if(
        &self,
        step: &str,
        transition: Transition,
        expected: &PlanVersion,
    ) -> Result<Task, PlanError> {
        self.mutate_task(step, transition, Some(expected), false)
            .await
    }

    /// `todo`, `blocked` or `review` -> `doing`.
    pub async fn start(&self, step: &str) -> Result<Task, PlanError> {
        self.mutate_task(step, Transition::Doing, None, true).await
    }

    /// `doing` -> `done`, stamped with today's date.
    pub async fn complete(&self, step: &str) -> Result<Task, PlanError> {
        self.mutate_task(step, Transition::Done, None, true).await
    }

    /// `doing` -> `blocked`.
    pub async fn block(&self, step: &str, reason: &str) -> Result<Task, PlanError> {
        self.mutate_task(step, Transition::blocked(reason), None, true)
            .await
    }

    /// `doing` -> `review`.
    pub async fn flag_review(&self, step: &str, note: &str) -> Result<Task, PlanError> {
        self.mutate_task(step, Transition::review(note), None, true)
            .await
    }

    /// Append a line to the notes section, creating it if needed.
    pub async fn append_notes(&self, line: &str) -> Result<(), PlanError> {
        let text = self.cell.read().await?;
        if decode(&text).is_none() {
            return Err(PlanError::NoPlan);
        }
        let version = PlanVersion::of(&text);
        let updated = append_note(&text, line);
        self.write_checked(&version, &updated).await?;
        info!(cell = %self.cell.cell(), "note appended");
        Ok(())
    }

    async fn mutate_task(
        &self,
        step: &str,
        transition: Transition,
        expected: Option<&PlanVersion>,
        enforce_graph: bool,
    ) -> Result<Task, PlanError> {
        if transition
            .annotation()
            .is_some_and(|text| text.trim().is_empty())
        {
            return Err(PlanError::MissingAnnotation {
                step: step.to_owned(),
                status: transition.target(),
            });
        }

        let text = self.cell.read().await?;
        let version = PlanVersion::of(&text);

        if let Some(expected) = expected.filter(|expected| **expected != version) {
            return Err(PlanError::StaleWrite {
                expected: expected.clone(),
                actual: version,
            });
        }

        let plan = decode(&text).ok_or(PlanError::NoPlan)?;
        let task = plan
            .find_task(step)
            .ok_or_else(|| PlanError::TaskNotFound {
                step: step.to_owned(),
                available: plan.steps(),
            })?;

        let from = task.status;
        let to = transition.target();
        if enforce_graph && !TaskStateMachine::is_valid_transition(from, to) {
            return Err(PlanError::InvalidTransition {
                step: step.to_owned(),
                from,
                to,
            });
        }

        let mark = transition.into_mark((self.today)());
        let updated = set_task_mark(&text, step, &mark);
        self.write_checked(&version, &updated).await?;
        info!(cell = %self.cell.cell(), step, %from, %to, "task updated");

        decode(&updated)
            .and_then(|plan| plan.find_task(step).cloned())
            .ok_or_else(|| PlanError::TaskNotFound {
                step: step.to_owned(),
                available: plan.steps(),
            })
    }

    /// Write `updated`, which was computed from text at `base`.
    async fn write_checked(&self, base: &PlanVersion, updated: &str) -> Result<(), PlanError> {
        if self.mode == WriteMode::CheckVersion {
            let current = PlanVersion::of(&self.cell.read().await?);
            if current != *base {
                return Err(PlanError::StaleWrite {
                    expected: base.clone(),
                    actual: current,
                });
            }
        }
        self.cell.write(updated).await?;
        Ok(())
    }
}
