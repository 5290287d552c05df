use serde::{Deserialize, Serialize};

/// How the applier treats hunks that do not line up with the original.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Trust the hunk and keep going; mismatches surface only as events.
    #[default]
    Lenient,
    /// The first fuzzy recovery inside a hunk fails the whole call.
    Strict,
}

/// What the parser does with a non-empty hunk line lacking a `' '`, `+` or `-` prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnprefixedLinePolicy {
    #[default]
    Skip,
    Context,
}

/// Runtime configuration for parsing and applying patches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub mode: ApplyMode,
    pub unprefixed_lines: UnprefixedLinePolicy,
    pub require_end_marker: bool,
}

impl PatchConfig {
    pub fn strict() -> Self {
        Self {
            mode: ApplyMode::Strict,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.mode == ApplyMode::Strict
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}
