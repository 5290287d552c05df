//! Patch language and application engine for assistant-authored file edits.
//!
//! An assistant answers an edit request with a compact patch document
//! instead of whole file bodies. This crate parses such documents into
//! [`Action`]s and applies them to the caller's current file contents,
//! producing an [`ApplyResult`] the caller persists however it likes.
//!
//! ```
//! use std::collections::HashMap;
//!
//! let files = HashMap::from([("app.js".to_string(), "let a = 1;\nlet b = 2;".to_string())]);
//! let patch = "*** Begin Patch\n*** Update File: app.js\n-let b = 2;\n+let b = 3;\n*** End Patch";
//!
//! let result = regret_patch::apply_patch(patch, &files).unwrap();
//! assert_eq!(result.updated["app.js"], "let a = 1;\nlet b = 3;");
//! ```

pub mod apply;
pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod events;
pub mod parser;
pub mod types;

pub use apply::*;
pub use config::*;
pub use detect::*;
pub use engine::*;
pub use errors::*;
pub use events::*;
pub use parser::*;
pub use types::*;
