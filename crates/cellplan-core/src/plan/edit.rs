//! Pure line edits on plan markdown.
//!
//! Edits never re-render the document. They locate one line through the
//! shared [`scan`] and splice a replacement in, so every other byte of the
//! input (including `\r\n` terminators and hand-written formatting) is
//! preserved.

use tracing::debug;

use super::line::{LineKind, NOTES_HEADER, Section, SectionKind, scan, split_annotation};
use super::model::TaskMark;
use super::render::{format_task_line, single_line};

/// Rewrite the status marker and annotation of task `step`.
///
/// The task's previous annotation is stripped before the new one is
/// appended. Returns the input unchanged when no such task exists.
pub fn set_task_mark(text: &str, step: &str, mark: &TaskMark) -> String {
    let target = scan(text).into_iter().find_map(|scanned| match scanned.kind {
        LineKind::Task(task) if task.step == step => Some((scanned.index, task)),
        _ => None,
    });
    let Some((index, task)) = target else {
        debug!(step, "task line not found, text unchanged");
        return text.to_owned();
    };

    let (title, _) = split_annotation(task.status, task.text);
    let replacement = format_task_line(task.indent, task.step, title, mark);

    let mut out = String::with_capacity(text.len() + replacement.len());
    for (i, piece) in text.split_inclusive('\n').enumerate() {
        if i == index {
            out.push_str(&replacement);
            out.push_str(terminator(piece));
        } else {
            out.push_str(piece);
        }
    }
    out
}

/// Append one line of free text to the notes.
///
/// The line goes right after the last non-blank line of the final
/// `## Notes` section; when there is none, a trailing section is created.
/// Phases are never touched.
pub fn append_note(text: &str, note: &str) -> String {
    let note = single_line(note);
    let scanned = scan(text);

    let header = scanned
        .iter()
        .rposition(|l| matches!(l.kind, LineKind::SectionHeader(SectionKind::Notes)));

    let Some(header) = header else {
        let mut out = text.to_owned();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(NOTES_HEADER);
        out.push('\n');
        out.push_str(&note);
        out.push('\n');
        return out;
    };

    let anchor = scanned[header..]
        .iter()
        .take_while(|l| l.section == Section::Named(SectionKind::Notes))
        .filter(|l| match l.kind {
            LineKind::Text(t) => !t.trim().is_empty(),
            _ => true,
        })
        .map(|l| l.index)
        .last()
        .unwrap_or(header);

    let mut out = String::with_capacity(text.len() + note.len() + 1);
    for (i, piece) in text.split_inclusive('\n').enumerate() {
        out.push_str(piece);
        if i == anchor {
            if terminator(piece).is_empty() {
                out.push('\n');
            }
            out.push_str(&note);
            out.push('\n');
        }
    }
    out
}

fn terminator(piece: &str) -> &str {
    if piece.ends_with("\r\n") {
        "\r\n"
    } else if piece.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
