//! Spotting patch documents inside free-form assistant replies.

use once_cell::sync::Lazy;
use regex::Regex;

static BEGIN_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\*\*\* Begin Patch").expect("begin marker regex is valid"));
static END_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*\* End Patch").expect("end marker regex is valid"));
static END_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\*\*\* End Patch\r?$").expect("end line regex is valid"));
static UPDATE_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*\* Update File: ([^\r\n]+)").expect("update target regex is valid")
});

const END_PATCH_LEN: usize = "*** End Patch".len();

/// True when some line starts with `*** Begin Patch` and `*** End Patch` appears anywhere.
pub fn looks_like_patch(text: &str) -> bool {
    BEGIN_LINE.is_match(text) && END_MARKER.is_match(text)
}

/// Returns the patch document embedded in `text`, without surrounding prose or fences.
///
/// The slice runs from the first `*** Begin Patch` line through the first
/// `*** End Patch` line after it, or to the end of `text` when there is none.
pub fn extract_patch(text: &str) -> Option<&str> {
    let begin = BEGIN_LINE.find(text)?.start();
    let rest = &text[begin..];
    let end = END_LINE
        .find(rest)
        .map_or(rest.len(), |found| found.start() + END_PATCH_LEN);
    Some(&rest[..end])
}

/// The first path named by an `*** Update File:` directive, for labelling.
pub fn patch_target(text: &str) -> Option<&str> {
    UPDATE_TARGET
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|path| path.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "Sure, here is the change:\n\n```\n*** Begin Patch\n*** Update File: app.js \n-a\n+b\n*** End Patch\n```\nLet me know!";

    #[test]
    fn looks_like_patch_requires_both_markers() {
        assert!(looks_like_patch(REPLY));
        assert!(!looks_like_patch("*** Begin Patch\n-a\n+b\n"));
        assert!(!looks_like_patch("text *** Begin Patch\n*** End Patch"));
    }

    #[test]
    fn extract_patch_strips_prose_and_fences() {
        let patch = extract_patch(REPLY).expect("patch should be found");
        assert_eq!(
            patch,
            "*** Begin Patch\n*** Update File: app.js \n-a\n+b\n*** End Patch"
        );
    }

    #[test]
    fn extract_patch_runs_to_end_without_end_marker() {
        let text = "intro\n*** Begin Patch\n*** Delete File: x.js\n";
        assert_eq!(
            extract_patch(text),
            Some("*** Begin Patch\n*** Delete File: x.js\n")
        );
        assert_eq!(extract_patch("no patch here"), None);
    }

    #[test]
    fn patch_target_returns_trimmed_first_update_path() {
        assert_eq!(patch_target(REPLY), Some("app.js"));
        assert_eq!(patch_target("*** Add File: a.js"), None);
    }
}
