use crate::Recovery;
use thiserror::Error;

/// Top-level error type for the regret-patch crate.
///
/// Any of these aborts the whole parse or apply call; nothing is partially
/// applied.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("patch syntax error at line {line_number}: {message}")]
    Syntax { line_number: usize, message: String },
    #[error("file not found: '{0}'")]
    MissingFile(String),
    #[error("file already exists: '{0}'")]
    FileExists(String),
    #[error("hunk {hunk_index} of '{path}' rejected in strict mode: {recovery}")]
    HunkRejected {
        path: String,
        hunk_index: usize,
        recovery: Recovery,
    },
}

impl PatchError {
    pub(crate) fn syntax(line_number: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line_number,
            message: message.into(),
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}
