//! Plan codec: markdown to [`Plan`] and back.
//!
//! [`decode`] never fails on malformed input. Encoding has two paths:
//! [`render_plan`] for whole-plan creation and [`set_task_mark`] for
//! single-line task edits that leave the rest of the text untouched.

pub mod edit;
pub mod line;
pub mod model;
pub mod parser;
pub mod render;
pub mod toml_format;

pub use edit::{append_note, set_task_mark};
pub use model::{
    Analysis, Annotation, Phase, Plan, PlanProgress, Task, TaskMark, TaskStatus,
    TaskStatusParseError,
};
pub use parser::decode;
pub use render::{format_task_line, render_plan, starter_template};
pub use toml_format::{PhaseTemplate, PlanFileError, PlanTemplate, parse_plan_file};
