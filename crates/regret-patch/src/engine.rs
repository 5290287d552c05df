use std::sync::Arc;

use crate::apply::split_content_lines;
use crate::{
    Action, ApplyResult, FileMap, Hunk, PatchConfig, PatchError, PatchEvent, PatchEventEmitter,
    SharedPatchEventEmitter, TracingEventEmitter, apply_hunk, parse_patch_with,
};

/// Parses and applies patch documents under one configuration.
///
/// The engine holds no file state: every call receives the caller's current
/// file contents and returns fresh results, so one engine can serve any
/// number of threads.
#[derive(Clone)]
pub struct PatchEngine {
    config: PatchConfig,
    emitter: SharedPatchEventEmitter,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new(PatchConfig::default())
    }
}

impl PatchEngine {
    pub fn new(config: PatchConfig) -> Self {
        Self::with_emitter(config, Arc::new(TracingEventEmitter))
    }

    pub fn with_emitter(config: PatchConfig, emitter: SharedPatchEventEmitter) -> Self {
        Self { config, emitter }
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    pub fn parse(&self, document: &str) -> Result<Vec<Action>, PatchError> {
        let actions =
            parse_patch_with(document, &self.config).map_err(|error| self.reject(error))?;
        self.emitter.emit(&PatchEvent::Parsed {
            actions: actions.len(),
        });
        Ok(actions)
    }

    /// Parses `document` and applies every action against `files`.
    ///
    /// Either every action succeeds and the full result is returned, or the
    /// first failure is returned and nothing is.
    pub fn apply<M>(&self, document: &str, files: &M) -> Result<ApplyResult, PatchError>
    where
        M: FileMap + ?Sized,
    {
        let actions = self.parse(document)?;
        self.apply_actions(&actions, files)
    }

    pub fn apply_actions<M>(
        &self,
        actions: &[Action],
        files: &M,
    ) -> Result<ApplyResult, PatchError>
    where
        M: FileMap + ?Sized,
    {
        let mut result = ApplyResult::default();
        let mut file_events = Vec::with_capacity(actions.len());
        for action in actions {
            let event = self
                .apply_action(action, files, &mut result)
                .map_err(|error| self.reject(error))?;
            file_events.push(event);
        }
        // File events only go out once the whole document has applied.
        for event in &file_events {
            self.emitter.emit(event);
        }
        Ok(result)
    }

    /// Folds `hunks` over `original`, honouring the configured [`ApplyMode`](crate::ApplyMode).
    pub fn update_file(
        &self,
        path: &str,
        original: &str,
        hunks: &[Hunk],
    ) -> Result<String, PatchError> {
        let mut lines = split_content_lines(original);
        for (hunk_index, hunk) in hunks.iter().enumerate() {
            let applied = apply_hunk(&lines, hunk);
            if let Some(recovery) = applied.recoveries.first()
                && self.config.is_strict()
            {
                return Err(PatchError::HunkRejected {
                    path: path.to_string(),
                    hunk_index,
                    recovery: recovery.clone(),
                });
            }

            for recovery in &applied.recoveries {
                self.emitter.emit(&PatchEvent::FuzzyRecovery {
                    path: path.to_string(),
                    hunk_index,
                    recovery: recovery.clone(),
                });
            }
            self.emitter.emit(&PatchEvent::HunkApplied {
                path: path.to_string(),
                hunk_index,
                strategy: applied.strategy,
            });
            lines = applied.lines;
        }
        Ok(lines.join("\n"))
    }

    fn apply_action<M>(
        &self,
        action: &Action,
        files: &M,
        result: &mut ApplyResult,
    ) -> Result<PatchEvent, PatchError>
    where
        M: FileMap + ?Sized,
    {
        let path = action.path().to_string();
        match action {
            Action::UpdateFile { hunks, .. } => {
                let Some(original) = files.content(&path) else {
                    return Err(PatchError::MissingFile(path));
                };
                let updated = self.update_file(&path, original, hunks)?;
                result.updated.insert(path.clone(), updated);
                Ok(PatchEvent::FileUpdated { path })
            }
            Action::AddFile { content, .. } => {
                if files.contains(&path) {
                    return Err(PatchError::FileExists(path));
                }
                result.added.insert(path.clone(), content.clone());
                Ok(PatchEvent::FileAdded { path })
            }
            Action::DeleteFile { .. } => {
                if !files.contains(&path) {
                    return Err(PatchError::MissingFile(path));
                }
                result.deleted.insert(path.clone());
                Ok(PatchEvent::FileDeleted { path })
            }
        }
    }

    fn reject(&self, error: PatchError) -> PatchError {
        self.emitter.emit(&PatchEvent::Rejected {
            reason: error.to_string(),
        });
        error
    }
}

/// Parses and applies `document` with the default, lenient configuration.
pub fn apply_patch<M>(document: &str, files: &M) -> Result<ApplyResult, PatchError>
where
    M: FileMap + ?Sized,
{
    PatchEngine::default().apply(document, files)
}
