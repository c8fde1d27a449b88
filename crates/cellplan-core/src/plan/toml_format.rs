//! Plan templates and the TOML plan definition file.
//!
//! A [`PlanTemplate`] is what `create_plan` renders into markdown. It can be
//! built in code or loaded from a file such as:
//!
//! ```toml
//! title = "Quarterly budget"
//! goal = "Produce a clean summary sheet"
//! questions = ["Which currency should totals use?"]
//!
//! [analysis]
//! spreadsheet = "Finance 2024"
//! read_range = "Raw!A1:F200"
//!
//! [[phases]]
//! name = "Prepare"
//! steps = ["Inspect raw data", "Normalize dates"]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Analysis;

/// Input to whole-plan creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTemplate {
    pub title: String,
    pub goal: String,
    /// Rendered as placeholders when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    #[serde(default)]
    pub phases: Vec<PhaseTemplate>,
}

/// One phase of a template; step numbers are assigned when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTemplate {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl PlanTemplate {
    pub fn new(title: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            goal: goal.into(),
            analysis: None,
            questions: Vec::new(),
            phases: Vec::new(),
        }
    }

    /// Append a phase with the given step descriptions.
    pub fn phase<I, S>(mut self, name: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phases.push(PhaseTemplate {
            name: name.into(),
            steps: steps.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// Errors that can occur while loading a plan definition file.
#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("plan title must not be empty")]
    EmptyTitle,

    #[error("phase {0} has no name")]
    UnnamedPhase(usize),

    #[error("plan must contain at least one phase")]
    NoPhases,
}

/// Parse and validate a TOML plan definition.
pub fn parse_plan_file(content: &str) -> Result<PlanTemplate, PlanFileError> {
    let template: PlanTemplate = toml::from_str(content)?;

    if template.title.trim().is_empty() {
        return Err(PlanFileError::EmptyTitle);
    }
    if template.phases.is_empty() {
        return Err(PlanFileError::NoPhases);
    }
    if let Some(idx) = template.phases.iter().position(|p| p.name.trim().is_empty()) {
        return Err(PlanFileError::UnnamedPhase(idx + 1));
    }

    Ok(template)
}
