//! Line-oriented parser for the patch document format.
//!
//! ```text
//! *** Begin Patch
//! *** Update File: <path>
//! @@ <optional label>
//!  <context line>
//! -<removed line>
//! +<added line>
//! *** Add File: <path>
//! +<content line>
//! *** Delete File: <path>
//! *** End Patch
//! ```
//!
//! Parsing is tolerant inside update sections: lines without a recognized
//! prefix are dropped (or kept as context, see [`UnprefixedLinePolicy`]) and
//! a missing `*** End Patch` simply ends the scan at end of input.

use crate::{Action, Hunk, HunkLine, PatchConfig, PatchError, UnprefixedLinePolicy};

const BEGIN_PATCH_MARKER: &str = "*** Begin Patch";
const END_PATCH_MARKER: &str = "*** End Patch";
const UPDATE_FILE_MARKER: &str = "*** Update File: ";
const ADD_FILE_MARKER: &str = "*** Add File: ";
const DELETE_FILE_MARKER: &str = "*** Delete File: ";
const SECTION_PREFIX: &str = "***";
const HUNK_MARKER: &str = "@@";

pub fn parse_patch(document: &str) -> Result<Vec<Action>, PatchError> {
    parse_patch_with(document, &PatchConfig::default())
}

pub fn parse_patch_with(document: &str, config: &PatchConfig) -> Result<Vec<Action>, PatchError> {
    let lines = split_document_lines(document);
    if !lines
        .first()
        .is_some_and(|line| line.starts_with(BEGIN_PATCH_MARKER))
    {
        return Err(PatchError::syntax(
            1,
            format!("patch must start with '{}'", BEGIN_PATCH_MARKER),
        ));
    }

    let mut actions = Vec::new();
    let mut saw_end_marker = false;
    let mut idx = 1usize;
    while idx < lines.len() {
        let line = lines[idx];
        if line == END_PATCH_MARKER {
            saw_end_marker = true;
            break;
        }

        if let Some(path) = line.strip_prefix(UPDATE_FILE_MARKER) {
            let (hunks, next) = parse_update_section(&lines, idx + 1, config);
            if hunks.is_empty() {
                return Err(PatchError::syntax(
                    idx + 1,
                    format!("update section for '{}' contains no hunks", path),
                ));
            }
            tracing::debug!(path, hunks = hunks.len(), "parsed update section");
            actions.push(Action::UpdateFile {
                path: path.to_string(),
                hunks,
            });
            idx = next;
            continue;
        }

        if let Some(path) = line.strip_prefix(ADD_FILE_MARKER) {
            let (content, next) = parse_add_section(&lines, idx + 1)?;
            actions.push(Action::AddFile {
                path: path.to_string(),
                content,
            });
            idx = next;
            continue;
        }

        if let Some(path) = line.strip_prefix(DELETE_FILE_MARKER) {
            actions.push(Action::DeleteFile {
                path: path.to_string(),
            });
            idx += 1;
            continue;
        }

        if line.is_empty() || line.starts_with(HUNK_MARKER) {
            idx += 1;
            continue;
        }

        return Err(PatchError::syntax(
            idx + 1,
            format!("unrecognized line outside any section: '{}'", line),
        ));
    }

    if config.require_end_marker && !saw_end_marker {
        return Err(PatchError::syntax(
            lines.len(),
            format!("patch must end with '{}'", END_PATCH_MARKER),
        ));
    }

    Ok(actions)
}

/// Splits on `\n`, dropping a `\r` left over from `\r\n` endings.
///
/// A trailing line terminator yields a final empty line, so joining the
/// result with `\n` restores the (normalized) input.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

fn split_document_lines(document: &str) -> Vec<&str> {
    split_lines(document).collect()
}

fn parse_update_section(
    lines: &[&str],
    start: usize,
    config: &PatchConfig,
) -> (Vec<Hunk>, usize) {
    let mut hunks = Vec::new();
    let mut idx = start;
    while idx < lines.len() {
        let line = lines[idx];
        if line.starts_with(SECTION_PREFIX) {
            break;
        }

        let (label, body_start) = if let Some(label) = line.strip_prefix(HUNK_MARKER) {
            (hunk_label(label), idx + 1)
        } else if starts_with_hunk_prefix(line) {
            (None, idx)
        } else {
            idx += 1;
            continue;
        };

        let (hunk_lines, next) = collect_hunk_lines(lines, body_start, config.unprefixed_lines);
        idx = next;
        if hunk_lines.is_empty() {
            continue;
        }
        tracing::debug!(lines = hunk_lines.len(), label = ?label, "parsed hunk");
        hunks.push(Hunk {
            label,
            lines: hunk_lines,
        });
    }
    (hunks, idx)
}

fn collect_hunk_lines(
    lines: &[&str],
    start: usize,
    policy: UnprefixedLinePolicy,
) -> (Vec<HunkLine>, usize) {
    let mut hunk_lines = Vec::new();
    let mut idx = start;
    while idx < lines.len() {
        let line = lines[idx];
        if line.starts_with(SECTION_PREFIX) || line.starts_with(HUNK_MARKER) {
            break;
        }
        if let Some(parsed) = parse_hunk_line(line, policy) {
            hunk_lines.push(parsed);
        }
        idx += 1;
    }
    (hunk_lines, idx)
}

fn parse_hunk_line(line: &str, policy: UnprefixedLinePolicy) -> Option<HunkLine> {
    if let Some(text) = line.strip_prefix(' ') {
        return Some(HunkLine::Context(text.to_string()));
    }
    if let Some(text) = line.strip_prefix('+') {
        return Some(HunkLine::Add(text.to_string()));
    }
    if let Some(text) = line.strip_prefix('-') {
        return Some(HunkLine::Remove(text.to_string()));
    }
    if line.is_empty() {
        return Some(HunkLine::Context(String::new()));
    }
    match policy {
        UnprefixedLinePolicy::Skip => None,
        UnprefixedLinePolicy::Context => Some(HunkLine::Context(line.to_string())),
    }
}

fn parse_add_section(lines: &[&str], start: usize) -> Result<(String, usize), PatchError> {
    let mut content = Vec::new();
    let mut idx = start;
    while idx < lines.len() {
        let line = lines[idx];
        if line.starts_with(SECTION_PREFIX) {
            break;
        }
        if let Some(text) = line.strip_prefix('+') {
            content.push(text);
        } else if line.is_empty() {
            content.push("");
        } else {
            return Err(PatchError::syntax(
                idx + 1,
                format!("invalid line in add section: '{}'", line),
            ));
        }
        idx += 1;
    }
    Ok((content.join("\n"), idx))
}

fn starts_with_hunk_prefix(line: &str) -> bool {
    line.starts_with([' ', '+', '-'])
}

fn hunk_label(raw: &str) -> Option<String> {
    let label = raw.trim();
    (!label.is_empty()).then(|| label.to_string())
}
