//! Tagged-line grammar for plan markdown.
//!
//! Every line is classified on its own by [`classify_line`], then
//! [`scan`] walks the document once, tracking which section is open, and
//! demotes classifications that are only meaningful in certain sections
//! (a task line outside a phase is plain text, a `Goal:` line inside the
//! notes is plain text). The decoder and the line editor both consume
//! this scan, so they always agree on which line is which task.

use chrono::NaiveDate;

use super::model::{Annotation, TaskStatus};

pub const TITLE_PREFIX: &str = "# Plan:";
pub const GOAL_PREFIX: &str = "Goal:";
pub const ANALYSIS_HEADER: &str = "## Analysis";
pub const QUESTIONS_HEADER: &str = "## Questions for User";
pub const NOTES_HEADER: &str = "## Notes";
pub const PHASE_PREFIX: &str = "### Phase ";
pub const DONE_MARK: char = '✅';
pub const ANNOTATION_DASH: char = '—';
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The `##` sections with fixed names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Analysis,
    Questions,
    Notes,
}

/// Section open at a given line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Before any section header: title and goal live here.
    Preamble,
    Named(SectionKind),
    Phase(u32),
}

/// A `- [c] N.M text` line, split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLine<'a> {
    /// Leading whitespace before the list dash.
    pub indent: &'a str,
    pub status: TaskStatus,
    pub step: &'a str,
    /// Everything after the step, annotation included.
    pub text: &'a str,
}

/// Classification of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Title(&'a str),
    Goal(&'a str),
    SectionHeader(SectionKind),
    PhaseHeader { number: u32, name: &'a str },
    Task(TaskLine<'a>),
    Text(&'a str),
}

/// One classified line with its position and enclosing section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    pub index: usize,
    /// Section the line belongs to. Headers belong to the section they open.
    pub section: Section,
    pub kind: LineKind<'a>,
}

/// Split text into lines without their `\n` / `\r\n` terminators.
///
/// Yields the same number of items as `text.split_inclusive('\n')`, which
/// the editor relies on to map indices back to byte ranges.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n').map(strip_terminator)
}

pub fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Classify a line with no knowledge of its surroundings.
///
/// Checked in order: plan title, goal, section headers, phase header,
/// task line, otherwise text.
pub fn classify_line(line: &str) -> LineKind<'_> {
    if let Some(title) = line.strip_prefix(TITLE_PREFIX) {
        return LineKind::Title(title.trim());
    }
    if let Some(goal) = line.strip_prefix(GOAL_PREFIX) {
        return LineKind::Goal(goal.trim());
    }
    match line.trim_end() {
        ANALYSIS_HEADER => return LineKind::SectionHeader(SectionKind::Analysis),
        QUESTIONS_HEADER => return LineKind::SectionHeader(SectionKind::Questions),
        NOTES_HEADER => return LineKind::SectionHeader(SectionKind::Notes),
        _ => {}
    }
    if let Some((number, name)) = parse_phase_header(line) {
        return LineKind::PhaseHeader { number, name };
    }
    if let Some(task) = parse_task_line(line) {
        return LineKind::Task(task);
    }
    LineKind::Text(line)
}

/// Classify every line of `text`, tracking the open section.
pub fn scan(text: &str) -> Vec<ScannedLine<'_>> {
    let mut section = Section::Preamble;
    let mut out = Vec::new();

    for (index, line) in split_lines(text).enumerate() {
        let kind = match classify_line(line) {
            LineKind::SectionHeader(kind) => {
                section = Section::Named(kind);
                LineKind::SectionHeader(kind)
            }
            LineKind::PhaseHeader { number, name } => {
                section = Section::Phase(number);
                LineKind::PhaseHeader { number, name }
            }
            kind @ (LineKind::Title(_) | LineKind::Goal(_)) if section == Section::Preamble => kind,
            kind @ LineKind::Task(_) if matches!(section, Section::Phase(_)) => kind,
            LineKind::Title(_) | LineKind::Goal(_) | LineKind::Task(_) => LineKind::Text(line),
            text @ LineKind::Text(_) => text,
        };
        out.push(ScannedLine {
            index,
            section,
            kind,
        });
    }

    out
}

fn parse_phase_header(line: &str) -> Option<(u32, &str)> {
    let rest = line.strip_prefix(PHASE_PREFIX)?;
    let (number, name) = rest.split_once(':')?;
    let number: u32 = number.trim().parse().ok()?;
    if number == 0 {
        return None;
    }
    Some((number, name.trim()))
}

fn parse_task_line(line: &str) -> Option<TaskLine<'_>> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let rest = body.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let status = TaskStatus::from_marker(chars.next()?)?;
    let rest = chars.as_str().strip_prefix(']')?;

    // At least one space between the checkbox and the step.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();

    let step_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let step = &rest[..step_end];
    if !is_step(step) {
        return None;
    }
    let text = rest[step_end..].trim_start();

    Some(TaskLine {
        indent,
        status,
        step,
        text,
    })
}

/// A dotted step id with two or three numeric segments.
pub fn is_step(step: &str) -> bool {
    let segments: Vec<&str> = step.split('.').collect();
    (2..=3).contains(&segments.len())
        && segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
}

/// First segment of a step id as a phase number.
pub fn step_phase(step: &str) -> Option<u32> {
    step.split('.').next()?.parse().ok()
}

/// Split task text into its title and the annotation its status allows.
///
/// Only the annotation matching `status` is recognized: an em-dash in the
/// title of a todo task stays part of the title. Blocked and review text
/// splits at the last em-dash, since reasons and notes are written without
/// one.
pub fn split_annotation(status: TaskStatus, text: &str) -> (&str, Option<Annotation>) {
    let text = text.trim_end();
    match status {
        TaskStatus::Done => match text.rfind(DONE_MARK) {
            Some(pos) => {
                let title = text[..pos].trim_end();
                let date = text[pos + DONE_MARK.len_utf8()..].trim();
                if date.is_empty() {
                    (title, None)
                } else {
                    match NaiveDate::parse_from_str(date, DATE_FORMAT) {
                        Ok(date) => (title, Some(Annotation::Completed(date))),
                        Err(_) => (text, None),
                    }
                }
            }
            None => (text, None),
        },
        TaskStatus::Blocked | TaskStatus::Review => match text.rsplit_once(ANNOTATION_DASH) {
            Some((title, note)) => {
                let title = title.trim_end();
                let note = note.trim();
                if note.is_empty() {
                    (title, None)
                } else if status == TaskStatus::Blocked {
                    (title, Some(Annotation::BlockedReason(note.to_owned())))
                } else {
                    (title, Some(Annotation::ReviewNote(note.to_owned())))
                }
            }
            None => (text, None),
        },
        TaskStatus::Todo | TaskStatus::Doing => (text, None),
    }
}
