//! Markdown task plans kept in a single spreadsheet cell.
//!
//! - [`plan`]: the codec between plan markdown and the [`Plan`] model.
//! - [`state`]: the task transition graph and task selection.
//! - [`store`]: [`PlanStore`], which runs plan operations against a
//!   [`cellplan_sheets::ResilientCell`].

pub mod error;
pub mod plan;
pub mod state;
pub mod store;

pub use error::PlanError;
pub use plan::{Plan, PlanProgress, PlanTemplate, Task, TaskStatus};
pub use state::{TaskStateMachine, Transition};
pub use store::{PlanStore, PlanVersion, VersionedPlan, WriteMode};
