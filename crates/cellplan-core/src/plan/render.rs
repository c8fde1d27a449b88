//! Markdown rendering for whole-plan creation and single task lines.

use std::fmt::Write as _;

use super::line::{
    ANALYSIS_HEADER, ANNOTATION_DASH, DATE_FORMAT, DONE_MARK, GOAL_PREFIX, NOTES_HEADER,
    PHASE_PREFIX, QUESTIONS_HEADER, TITLE_PREFIX,
};
use super::model::{Analysis, Annotation, TaskMark};
use super::toml_format::PlanTemplate;

const PLACEHOLDER: &str = "TBD";
const NO_QUESTIONS: &str = "_None yet._";

/// Render a fresh plan. Every task starts as todo and is numbered
/// `{phase}.{step}` from 1 in template order.
///
/// Embedded newlines in template strings are flattened to spaces so each
/// value stays on its own line.
pub fn render_plan(template: &PlanTemplate) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{TITLE_PREFIX} {}", single_line(&template.title));
    let _ = writeln!(out, "{GOAL_PREFIX} {}", single_line(&template.goal));
    out.push('\n');

    let analysis = template.analysis.clone().unwrap_or_default();
    render_analysis(&mut out, &analysis);
    out.push('\n');

    let _ = writeln!(out, "{QUESTIONS_HEADER}");
    if template.questions.is_empty() {
        let _ = writeln!(out, "{NO_QUESTIONS}");
    }
    for question in &template.questions {
        let _ = writeln!(out, "- {}", single_line(question));
    }
    out.push('\n');

    for (phase_idx, phase) in template.phases.iter().enumerate() {
        let number = phase_idx + 1;
        let _ = writeln!(out, "{PHASE_PREFIX}{number}: {}", single_line(&phase.name));
        for (step_idx, step) in phase.steps.iter().enumerate() {
            let step_id = format!("{number}.{}", step_idx + 1);
            let line = format_task_line("", &step_id, &single_line(step), &TaskMark::todo());
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{NOTES_HEADER}");
    out
}

fn render_analysis(out: &mut String, analysis: &Analysis) {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(single_line)
            .unwrap_or_else(|| PLACEHOLDER.to_owned())
    };
    let _ = writeln!(out, "{ANALYSIS_HEADER}");
    let _ = writeln!(out, "- Spreadsheet: {}", field(&analysis.spreadsheet));
    let _ = writeln!(out, "- Key sheets: {}", field(&analysis.key_sheets));
    let _ = writeln!(out, "- Target ranges:");
    let _ = writeln!(out, "  - Read: {}", field(&analysis.read_range));
    let _ = writeln!(out, "  - Write: {}", field(&analysis.write_range));
    let _ = writeln!(out, "- Current state: {}", field(&analysis.current_state));
}

/// Format one task line, without a terminator.
pub fn format_task_line(indent: &str, step: &str, title: &str, mark: &TaskMark) -> String {
    let mut line = format!("{indent}- [{}] {step}", mark.status.marker());
    if !title.is_empty() {
        line.push(' ');
        line.push_str(title);
    }
    match &mark.annotation {
        Some(Annotation::Completed(date)) => {
            let _ = write!(line, " {DONE_MARK} {}", date.format(DATE_FORMAT));
        }
        Some(Annotation::BlockedReason(text)) | Some(Annotation::ReviewNote(text)) => {
            let _ = write!(line, " {ANNOTATION_DASH} {}", annotation_text(text));
        }
        None => {}
    }
    line
}

/// The plan written into an empty workspace.
pub fn starter_template() -> PlanTemplate {
    PlanTemplate::new(
        "Getting started",
        "Describe what this workspace should accomplish",
    )
    .phase(
        "Discovery",
        [
            "Inspect the spreadsheet structure",
            "Confirm the goal and target ranges with the user",
        ],
    )
    .phase("Execution", ["Break the work into concrete steps"])
}

/// Reason or note text as written after the separator: one line, with no
/// em-dash of its own.
fn annotation_text(text: &str) -> String {
    single_line(text).replace(ANNOTATION_DASH, "-")
}

pub(crate) fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
