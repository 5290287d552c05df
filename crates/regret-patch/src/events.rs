use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::{HunkStrategy, Recovery};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchEvent {
    Parsed {
        actions: usize,
    },
    HunkApplied {
        path: String,
        hunk_index: usize,
        strategy: HunkStrategy,
    },
    FuzzyRecovery {
        path: String,
        hunk_index: usize,
        recovery: Recovery,
    },
    /// File events are held back until every action in the document has
    /// applied, so a rejected document never reports them.
    FileUpdated {
        path: String,
    },
    FileAdded {
        path: String,
    },
    FileDeleted {
        path: String,
    },
    Rejected {
        reason: String,
    },
}

/// Receives diagnostics while a patch is parsed and applied.
pub trait PatchEventEmitter: Send + Sync {
    fn emit(&self, event: &PatchEvent);
}

impl<F> PatchEventEmitter for F
where
    F: Fn(&PatchEvent) + Send + Sync,
{
    fn emit(&self, event: &PatchEvent) {
        self(event)
    }
}

pub type SharedPatchEventEmitter = Arc<dyn PatchEventEmitter>;

#[derive(Default)]
pub struct NoopEventEmitter;

impl PatchEventEmitter for NoopEventEmitter {
    fn emit(&self, _event: &PatchEvent) {}
}

/// Forwards events to `tracing`; fuzzy recoveries and rejections log at `warn`.
#[derive(Default)]
pub struct TracingEventEmitter;

impl PatchEventEmitter for TracingEventEmitter {
    fn emit(&self, event: &PatchEvent) {
        match event {
            PatchEvent::Parsed { actions } => tracing::debug!(actions, "patch parsed"),
            PatchEvent::HunkApplied {
                path,
                hunk_index,
                strategy,
            } => tracing::debug!(%path, hunk_index, ?strategy, "hunk applied"),
            PatchEvent::FuzzyRecovery {
                path,
                hunk_index,
                recovery,
            } => tracing::warn!(%path, hunk_index, %recovery, "hunk did not match cleanly"),
            PatchEvent::FileUpdated { path } => tracing::debug!(%path, "file updated"),
            PatchEvent::FileAdded { path } => tracing::debug!(%path, "file added"),
            PatchEvent::FileDeleted { path } => tracing::debug!(%path, "file deleted"),
            PatchEvent::Rejected { reason } => tracing::warn!(%reason, "patch rejected"),
        }
    }
}

#[derive(Clone, Default)]
pub struct BufferedEventEmitter {
    inner: Arc<Mutex<Vec<PatchEvent>>>,
}

impl BufferedEventEmitter {
    pub fn snapshot(&self) -> Vec<PatchEvent> {
        let guard = self.inner.lock().expect("buffered emitter mutex poisoned");
        guard.clone()
    }
}

impl PatchEventEmitter for BufferedEventEmitter {
    fn emit(&self, event: &PatchEvent) {
        let mut guard = self.inner.lock().expect("buffered emitter mutex poisoned");
        guard.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_event_emitter_stores_emitted_events() {
        let emitter = BufferedEventEmitter::default();
        emitter.emit(&PatchEvent::FileAdded {
            path: "a.js".to_string(),
        });

        let events = emitter.snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            PatchEvent::FileAdded {
                path: "a.js".to_string(),
            }
        );
    }

    #[test]
    fn noop_event_emitter_accepts_events_silently() {
        let emitter: SharedPatchEventEmitter = Arc::new(NoopEventEmitter);
        emitter.emit(&PatchEvent::Rejected {
            reason: "ignored".to_string(),
        });
    }

    #[test]
    fn closure_emitter_receives_events() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = seen.clone();
        let emitter = move |_event: &PatchEvent| {
            *counter.lock().expect("counter mutex poisoned") += 1;
        };

        emitter.emit(&PatchEvent::Parsed { actions: 2 });
        emitter.emit(&PatchEvent::Parsed { actions: 0 });
        assert_eq!(*seen.lock().expect("counter mutex poisoned"), 2);
    }

    #[test]
    fn patch_event_serializes_with_kind_tag() {
        let json = serde_json::to_value(PatchEvent::FuzzyRecovery {
            path: "a.js".to_string(),
            hunk_index: 0,
            recovery: Recovery::RemovalNotFound {
                expected: "x".to_string(),
            },
        })
        .expect("event should serialize");
        assert_eq!(json["kind"], "fuzzy_recovery");
        assert_eq!(json["recovery"]["kind"], "removal_not_found");
    }
}
