//! Structured plan model decoded from the markdown cell.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status of a task, stored as the character between the checkbox brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
    Blocked,
    Review,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        Self::Todo,
        Self::Doing,
        Self::Done,
        Self::Blocked,
        Self::Review,
    ];

    /// The checkbox marker character.
    pub fn marker(self) -> char {
        match self {
            Self::Todo => ' ',
            Self::Doing => '/',
            Self::Done => 'x',
            Self::Blocked => '>',
            Self::Review => '!',
        }
    }

    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Todo),
            '/' => Some(Self::Doing),
            'x' => Some(Self::Done),
            '>' => Some(Self::Blocked),
            '!' => Some(Self::Review),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Review => "review",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "doing" => Ok(Self::Doing),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            "review" => Ok(Self::Review),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task status: {0:?} (expected todo, doing, done, blocked, or review)")]
pub struct TaskStatusParseError(pub String);

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// Trailing annotation carried by a task line. Which variant is valid is
/// tied to the task's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Annotation {
    /// `✅ YYYY-MM-DD` on done tasks.
    Completed(NaiveDate),
    /// `— reason` on blocked tasks.
    BlockedReason(String),
    /// `— note` on review tasks.
    ReviewNote(String),
}

/// Status marker plus the single annotation it carries, ready to be
/// written onto a task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMark {
    pub status: TaskStatus,
    pub annotation: Option<Annotation>,
}

impl TaskMark {
    pub fn todo() -> Self {
        Self::bare(TaskStatus::Todo)
    }

    pub fn doing() -> Self {
        Self::bare(TaskStatus::Doing)
    }

    pub fn done(on: NaiveDate) -> Self {
        Self {
            status: TaskStatus::Done,
            annotation: Some(Annotation::Completed(on)),
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Blocked,
            annotation: Some(Annotation::BlockedReason(reason.into())),
        }
    }

    pub fn review(note: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Review,
            annotation: Some(Annotation::ReviewNote(note.into())),
        }
    }

    fn bare(status: TaskStatus) -> Self {
        Self {
            status,
            annotation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan, Phase, Task
// ---------------------------------------------------------------------------

/// A single task line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// 0-based source line index. Only meaningful for editing the text it
    /// was decoded from.
    pub line: usize,
    /// Number of the phase the task appears under.
    pub phase: u32,
    /// Dotted step id, e.g. `"1.2"` or `"2.1.3"`.
    pub step: String,
    pub status: TaskStatus,
    /// Description with any annotation stripped.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
}

impl Task {
    /// The annotation this task carries, if any.
    pub fn annotation(&self) -> Option<Annotation> {
        if let Some(date) = self.completed_date {
            return Some(Annotation::Completed(date));
        }
        if let Some(reason) = &self.blocked_reason {
            return Some(Annotation::BlockedReason(reason.clone()));
        }
        self.review_note
            .as_ref()
            .map(|note| Annotation::ReviewNote(note.clone()))
    }
}

/// A `### Phase N: name` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub number: u32,
    pub name: String,
    pub tasks: Vec<Task>,
}

/// Contents of the `## Analysis` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_sheets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
}

/// The decoded plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub title: String,
    pub goal: String,
    pub analysis: Option<Analysis>,
    pub questions: Option<Vec<String>>,
    pub phases: Vec<Phase>,
    /// Text of the `## Notes` section; empty when the section is absent.
    pub notes: String,
    /// Exact markdown this plan was decoded from.
    pub raw: String,
}

impl Plan {
    /// All tasks in phase order, then line order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|phase| phase.tasks.iter())
    }

    pub fn find_task(&self, step: &str) -> Option<&Task> {
        self.tasks().find(|task| task.step == step)
    }

    /// Step ids in document order.
    pub fn steps(&self) -> Vec<String> {
        self.tasks().map(|task| task.step.clone()).collect()
    }

    /// Task counts by status.
    pub fn progress(&self) -> PlanProgress {
        let mut progress = PlanProgress::default();
        for task in self.tasks() {
            match task.status {
                TaskStatus::Todo => progress.todo += 1,
                TaskStatus::Doing => progress.doing += 1,
                TaskStatus::Done => progress.done += 1,
                TaskStatus::Blocked => progress.blocked += 1,
                TaskStatus::Review => progress.review += 1,
            }
        }
        progress
    }
}

/// Per-status task counts for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub todo: usize,
    pub doing: usize,
    pub done: usize,
    pub blocked: usize,
    pub review: usize,
}

impl PlanProgress {
    pub fn total(&self) -> usize {
        self.todo + self.doing + self.done + self.blocked + self.review
    }

    /// True when every task is done (and there is at least one).
    pub fn is_complete(&self) -> bool {
        self.total() > 0 && self.done == self.total()
    }
}
