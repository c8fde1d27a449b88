//! Markdown plan decoder.
//!
//! Decoding is lenient by construction: anything that does not match the
//! grammar in [`super::line`] is treated as free text of whatever section
//! is open, so malformed input produces a sparser [`Plan`] rather than an
//! error. The only distinguished outcome is an empty cell, which decodes
//! to `None` ("no plan yet").

use std::collections::HashSet;

use tracing::debug;

use super::line::{LineKind, Section, SectionKind, scan, split_annotation, step_phase};
use super::model::{Analysis, Annotation, Phase, Plan, Task};

/// Decode plan markdown. Returns `None` only for blank input.
pub fn decode(markdown: &str) -> Option<Plan> {
    if markdown.trim().is_empty() {
        return None;
    }

    let mut plan = Plan {
        title: String::new(),
        goal: String::new(),
        analysis: None,
        questions: None,
        phases: Vec::new(),
        notes: String::new(),
        raw: markdown.to_owned(),
    };
    let mut seen_title = false;
    let mut seen_goal = false;
    let mut steps: HashSet<String> = HashSet::new();
    let mut note_lines: Vec<&str> = Vec::new();
    // Index into plan.phases of the phase currently receiving tasks.
    let mut current_phase: Option<usize> = None;

    for scanned in scan(markdown) {
        match scanned.kind {
            LineKind::Title(title) if !seen_title => {
                plan.title = title.to_owned();
                seen_title = true;
            }
            LineKind::Goal(goal) if !seen_goal => {
                plan.goal = goal.to_owned();
                seen_goal = true;
            }
            LineKind::Title(_) | LineKind::Goal(_) => {}
            LineKind::SectionHeader(kind) => {
                current_phase = None;
                match kind {
                    SectionKind::Analysis => {
                        plan.analysis.get_or_insert_with(Analysis::default);
                    }
                    SectionKind::Questions => {
                        plan.questions.get_or_insert_with(Vec::new);
                    }
                    SectionKind::Notes => {}
                }
            }
            LineKind::PhaseHeader { number, name } => {
                let existing = plan.phases.iter().position(|p| p.number == number);
                current_phase = Some(match existing {
                    Some(idx) => {
                        debug!(phase = number, "phase header repeated, merging tasks");
                        idx
                    }
                    None => {
                        plan.phases.push(Phase {
                            number,
                            name: name.to_owned(),
                            tasks: Vec::new(),
                        });
                        plan.phases.len() - 1
                    }
                });
            }
            LineKind::Task(line) => {
                let Some(idx) = current_phase else {
                    continue;
                };
                if !steps.insert(line.step.to_owned()) {
                    debug!(step = line.step, line = scanned.index, "duplicate step ignored");
                    continue;
                }
                let phase = &mut plan.phases[idx];
                if step_phase(line.step) != Some(phase.number) {
                    debug!(
                        step = line.step,
                        phase = phase.number,
                        "step numbered for another phase, kept under its header"
                    );
                }
                let (title, annotation) = split_annotation(line.status, line.text);
                let mut task = Task {
                    line: scanned.index,
                    phase: phase.number,
                    step: line.step.to_owned(),
                    status: line.status,
                    title: title.to_owned(),
                    completed_date: None,
                    blocked_reason: None,
                    review_note: None,
                };
                match annotation {
                    Some(Annotation::Completed(date)) => task.completed_date = Some(date),
                    Some(Annotation::BlockedReason(reason)) => task.blocked_reason = Some(reason),
                    Some(Annotation::ReviewNote(note)) => task.review_note = Some(note),
                    None => {}
                }
                phase.tasks.push(task);
            }
            LineKind::Text(text) => match scanned.section {
                Section::Named(SectionKind::Analysis) => {
                    if let Some(analysis) = plan.analysis.as_mut() {
                        apply_analysis_line(analysis, text);
                    }
                }
                Section::Named(SectionKind::Questions) => {
                    if let (Some(questions), Some(q)) =
                        (plan.questions.as_mut(), parse_list_item(text))
                    {
                        questions.push(q.to_owned());
                    }
                }
                Section::Named(SectionKind::Notes) => note_lines.push(text),
                Section::Preamble | Section::Phase(_) => {}
            },
        }
    }

    plan.notes = join_trimmed_block(&note_lines);
    Some(plan)
}

/// Fill one `- Key: value` line of the Analysis section.
fn apply_analysis_line(analysis: &mut Analysis, line: &str) {
    let Some(item) = parse_list_item(line) else {
        return;
    };
    let Some((key, value)) = item.split_once(':') else {
        return;
    };
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let slot = match key.trim().to_ascii_lowercase().as_str() {
        "spreadsheet" => &mut analysis.spreadsheet,
        "key sheets" => &mut analysis.key_sheets,
        "read" => &mut analysis.read_range,
        "write" => &mut analysis.write_range,
        "current state" => &mut analysis.current_state,
        _ => return,
    };
    *slot = Some(value.to_owned());
}

fn parse_list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let item = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))?
        .trim();
    (!item.is_empty()).then_some(item)
}

/// Join lines, dropping blank lines at the start and end.
fn join_trimmed_block(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
