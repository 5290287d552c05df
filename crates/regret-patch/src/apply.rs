//! Hunk application.
//!
//! A hunk with at least one context line is applied positionally, walking a
//! cursor over the original from its first line. A hunk without context is
//! a search and replace keyed on its first removed line. Neither path ever
//! fails: disagreements with the original are recorded as [`Recovery`]
//! entries and the caller decides whether to tolerate them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::split_lines;
use crate::{Hunk, HunkLine};

/// A place where the applier trusted the hunk over the original content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recovery {
    /// A context line did not match; its text was emitted and the cursor stalled.
    ContextMismatch {
        hunk_line: usize,
        expected: String,
        found: Option<String>,
    },
    /// A removed line did not match; nothing was emitted or consumed.
    RemovalSkipped {
        hunk_line: usize,
        expected: String,
        found: Option<String>,
    },
    /// A context-free hunk's first removed line is not in the original; the hunk was dropped.
    RemovalNotFound { expected: String },
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovery::ContextMismatch {
                hunk_line,
                expected,
                found,
            } => write!(
                f,
                "context line {} expected '{}' but found {}",
                hunk_line + 1,
                expected,
                describe_found(found.as_deref())
            ),
            Recovery::RemovalSkipped {
                hunk_line,
                expected,
                found,
            } => write!(
                f,
                "removed line {} expected '{}' but found {}",
                hunk_line + 1,
                expected,
                describe_found(found.as_deref())
            ),
            Recovery::RemovalNotFound { expected } => {
                write!(f, "removed line '{}' not found in file", expected)
            }
        }
    }
}

fn describe_found(found: Option<&str>) -> String {
    match found {
        Some(text) => format!("'{}'", text),
        None => "end of file".to_string(),
    }
}

/// Which algorithm a hunk went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HunkStrategy {
    Positional,
    /// Context-free hunk with no removals; added lines went before the whole file.
    Prepend,
    Replace { matched_at: usize, removed: usize },
    /// Context-free hunk whose removal could not be located; output equals input.
    Unmatched,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HunkApplication {
    pub lines: Vec<String>,
    pub strategy: HunkStrategy,
    pub recoveries: Vec<Recovery>,
}

impl HunkApplication {
    pub fn is_clean(&self) -> bool {
        self.recoveries.is_empty()
    }
}

pub fn apply_hunk(original: &[String], hunk: &Hunk) -> HunkApplication {
    if hunk.has_context() {
        apply_positional(original, hunk)
    } else {
        apply_search_replace(original, hunk)
    }
}

/// Applies `hunks` in order to `original` and rejoins with `\n`, tolerating every mismatch.
pub fn apply_update_file(original: &str, hunks: &[Hunk]) -> String {
    hunks
        .iter()
        .fold(split_content_lines(original), |lines, hunk| {
            apply_hunk(&lines, hunk).lines
        })
        .join("\n")
}

pub fn split_content_lines(content: &str) -> Vec<String> {
    split_lines(content).map(str::to_string).collect()
}

fn apply_search_replace(original: &[String], hunk: &Hunk) -> HunkApplication {
    let added = hunk.added_lines().map(str::to_string);
    let Some(first_removal) = hunk
        .lines
        .iter()
        .position(|line| matches!(line, HunkLine::Remove(_)))
    else {
        return HunkApplication {
            lines: added.chain(original.iter().cloned()).collect(),
            strategy: HunkStrategy::Prepend,
            recoveries: Vec::new(),
        };
    };

    let expected = hunk.lines[first_removal].text();
    let Some(matched_at) = original.iter().position(|line| line == expected) else {
        tracing::debug!(expected, "context-free hunk did not match");
        return HunkApplication {
            lines: original.to_vec(),
            strategy: HunkStrategy::Unmatched,
            recoveries: vec![Recovery::RemovalNotFound {
                expected: expected.to_string(),
            }],
        };
    };

    // Only the run of removals starting at the first one is consumed.
    let removed = hunk.lines[first_removal..]
        .iter()
        .take_while(|line| matches!(line, HunkLine::Remove(_)))
        .count();
    let resume_at = (matched_at + removed).min(original.len());

    let lines = original[..matched_at]
        .iter()
        .cloned()
        .chain(added)
        .chain(original[resume_at..].iter().cloned())
        .collect();
    HunkApplication {
        lines,
        strategy: HunkStrategy::Replace {
            matched_at,
            removed,
        },
        recoveries: Vec::new(),
    }
}

/// Effect of one hunk line on the positional cursor.
#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    /// Emit the original line and advance.
    Keep(&'a str),
    /// Emit the hunk's context text, leave the cursor where it is.
    Stall(&'a str),
    /// Advance without emitting.
    Drop,
    /// Neither emit nor advance.
    Hold(&'a str),
    Insert(&'a str),
}

fn step<'a>(current: Option<&str>, line: &'a HunkLine) -> Step<'a> {
    match line {
        HunkLine::Context(text) if current == Some(text.as_str()) => Step::Keep(text),
        HunkLine::Context(text) => Step::Stall(text),
        HunkLine::Remove(text) if current == Some(text.as_str()) => Step::Drop,
        HunkLine::Remove(text) => Step::Hold(text),
        HunkLine::Add(text) => Step::Insert(text),
    }
}

#[derive(Default)]
struct Positional {
    output: Vec<String>,
    cursor: usize,
    recoveries: Vec<Recovery>,
}

fn apply_positional(original: &[String], hunk: &Hunk) -> HunkApplication {
    let folded = hunk
        .lines
        .iter()
        .enumerate()
        .fold(Positional::default(), |mut state, (hunk_line, line)| {
            let current = original.get(state.cursor).map(String::as_str);
            match step(current, line) {
                Step::Keep(text) => {
                    state.output.push(text.to_string());
                    state.cursor += 1;
                }
                Step::Stall(text) => {
                    state.output.push(text.to_string());
                    state.recoveries.push(Recovery::ContextMismatch {
                        hunk_line,
                        expected: text.to_string(),
                        found: current.map(str::to_string),
                    });
                }
                Step::Drop => state.cursor += 1,
                Step::Hold(text) => state.recoveries.push(Recovery::RemovalSkipped {
                    hunk_line,
                    expected: text.to_string(),
                    found: current.map(str::to_string),
                }),
                Step::Insert(text) => state.output.push(text.to_string()),
            }
            state
        });

    let Positional {
        mut output,
        cursor,
        recoveries,
    } = folded;
    output.extend(original.iter().skip(cursor).cloned());
    HunkApplication {
        lines: output,
        strategy: HunkStrategy::Positional,
        recoveries,
    }
}
