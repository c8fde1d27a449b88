//! Task state machine.
//!
//! The transition graph is only enforced by the convenience operations
//! (`start`, `complete`, `block`, `flag_review`). The raw
//! [`PlanStore::update_task`](crate::store::PlanStore::update_task) path
//! applies any [`Transition`] to any task.

use chrono::NaiveDate;

use crate::plan::{Plan, Task, TaskMark, TaskStatus};

/// A requested status change, carrying the annotation text it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Doing,
    Done,
    Blocked { reason: String },
    Review { note: String },
}

impl Transition {
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked {
            reason: reason.into(),
        }
    }

    pub fn review(note: impl Into<String>) -> Self {
        Self::Review { note: note.into() }
    }

    /// Status the task ends up in.
    pub fn target(&self) -> TaskStatus {
        match self {
            Self::Doing => TaskStatus::Doing,
            Self::Done => TaskStatus::Done,
            Self::Blocked { .. } => TaskStatus::Blocked,
            Self::Review { .. } => TaskStatus::Review,
        }
    }

    /// Reason or note text, for transitions that carry one.
    pub fn annotation(&self) -> Option<&str> {
        match self {
            Self::Blocked { reason } => Some(reason),
            Self::Review { note } => Some(note),
            Self::Doing | Self::Done => None,
        }
    }

    /// Resolve to the marker and annotation written on the task line.
    /// `today` is used as the completion date.
    pub fn into_mark(self, today: NaiveDate) -> TaskMark {
        match self {
            Self::Doing => TaskMark::doing(),
            Self::Done => TaskMark::done(today),
            Self::Blocked { reason } => TaskMark::blocked(reason),
            Self::Review { note } => TaskMark::review(note),
        }
    }
}

/// The task state machine.
///
/// Enforces the valid transition graph:
///
/// ```text
/// todo    -> doing    (start)
/// doing   -> done     (complete)
/// doing   -> blocked  (block, with reason)
/// doing   -> review   (flag for review, with note)
/// blocked -> doing    (start, reason cleared)
/// review  -> doing    (start, note cleared)
/// ```
///
/// `done` is terminal.
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Check whether a transition from `from` to `to` is a valid edge
    /// in the state graph.
    pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
        matches!(
            (from, to),
            (TaskStatus::Todo, TaskStatus::Doing)
                | (TaskStatus::Doing, TaskStatus::Done)
                | (TaskStatus::Doing, TaskStatus::Blocked)
                | (TaskStatus::Doing, TaskStatus::Review)
                | (TaskStatus::Blocked, TaskStatus::Doing)
                | (TaskStatus::Review, TaskStatus::Doing)
        )
    }

    /// First todo task in phase then line order. Blocked and review tasks
    /// are skipped even when they come first.
    pub fn next_task(plan: &Plan) -> Option<&Task> {
        plan.tasks().find(|task| task.status == TaskStatus::Todo)
    }

    /// All review tasks in phase then line order.
    pub fn review_tasks(plan: &Plan) -> Vec<&Task> {
        plan.tasks()
            .filter(|task| task.status == TaskStatus::Review)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::decode;

    #[test]
    fn valid_edges() {
        use TaskStatus::*;
        let valid = [
            (Todo, Doing),
            (Doing, Done),
            (Doing, Blocked),
            (Doing, Review),
            (Blocked, Doing),
            (Review, Doing),
        ];
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                assert_eq!(
                    TaskStateMachine::is_valid_transition(from, to),
                    valid.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn done_is_terminal() {
        for to in TaskStatus::ALL {
            assert!(!TaskStateMachine::is_valid_transition(TaskStatus::Done, to));
        }
    }

    #[test]
    fn next_task_skips_blocked_and_review() {
        let plan = decode(
            "### Phase 1: A\n- [>] 1.1 a — wait\n- [ ] 1.2 b\n- [!] 1.3 c — look\n",
        )
        .unwrap();
        assert_eq!(TaskStateMachine::next_task(&plan).unwrap().step, "1.2");

        let review: Vec<&str> = TaskStateMachine::review_tasks(&plan)
            .iter()
            .map(|t| t.step.as_str())
            .collect();
        assert_eq!(review, vec!["1.3"]);
    }

    #[test]
    fn next_task_none_when_nothing_todo() {
        let plan = decode("### Phase 1: A\n- [x] 1.1 a\n- [/] 1.2 b\n").unwrap();
        assert!(TaskStateMachine::next_task(&plan).is_none());
        assert!(TaskStateMachine::review_tasks(&plan).is_empty());
    }

    #[test]
    fn transition_marks() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(Transition::Done.into_mark(today), TaskMark::done(today));
        assert_eq!(
            Transition::blocked("why").into_mark(today),
            TaskMark::blocked("why")
        );
        assert_eq!(Transition::review("n").target(), TaskStatus::Review);
    }
}
