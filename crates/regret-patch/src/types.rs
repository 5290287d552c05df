use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One file-level instruction parsed from a patch document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    UpdateFile { path: String, hunks: Vec<Hunk> },
    AddFile { path: String, content: String },
    DeleteFile { path: String },
}

impl Action {
    pub fn path(&self) -> &str {
        match self {
            Action::UpdateFile { path, .. }
            | Action::AddFile { path, .. }
            | Action::DeleteFile { path } => path,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Action::UpdateFile { .. } => "update",
            Action::AddFile { .. } => "add",
            Action::DeleteFile { .. } => "delete",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Text following the `@@` marker, if the hunk had one. Never used for matching.
    pub label: Option<String>,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    pub fn new(lines: Vec<HunkLine>) -> Self {
        Self { label: None, lines }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn has_context(&self) -> bool {
        self.lines
            .iter()
            .any(|line| matches!(line, HunkLine::Context(_)))
    }

    pub fn added_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            HunkLine::Add(text) => Some(text.as_str()),
            HunkLine::Context(_) | HunkLine::Remove(_) => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "text", rename_all = "snake_case")]
pub enum HunkLine {
    Context(String),
    Add(String),
    Remove(String),
}

impl HunkLine {
    pub fn text(&self) -> &str {
        match self {
            HunkLine::Context(text) | HunkLine::Add(text) | HunkLine::Remove(text) => text,
        }
    }
}

/// Everything a successful application pass wants the caller to persist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub updated: BTreeMap<String, String>,
    pub added: BTreeMap<String, String>,
    pub deleted: BTreeSet<String>,
}

impl ApplyResult {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    pub fn touched_paths(&self) -> BTreeSet<&str> {
        self.updated
            .keys()
            .chain(self.added.keys())
            .chain(self.deleted.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.extend(self.added.keys().map(|path| format!("A {}", path)));
        lines.extend(self.updated.keys().map(|path| format!("M {}", path)));
        lines.extend(self.deleted.iter().map(|path| format!("D {}", path)));
        lines
    }
}

/// Read-only view of the caller's current file contents.
pub trait FileMap {
    fn content(&self, path: &str) -> Option<&str>;

    fn contains(&self, path: &str) -> bool {
        self.content(path).is_some()
    }
}

impl FileMap for HashMap<String, String> {
    fn content(&self, path: &str) -> Option<&str> {
        self.get(path).map(String::as_str)
    }
}

impl FileMap for BTreeMap<String, String> {
    fn content(&self, path: &str) -> Option<&str> {
        self.get(path).map(String::as_str)
    }
}
