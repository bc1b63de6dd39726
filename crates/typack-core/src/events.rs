//! Compilation diagnostics
//!
//! The compiler reports non-fatal observations (currently only stripped
//! reference directives) through an [`Emitter`] supplied by the caller.
//! The default emitter drops everything, so library use stays silent.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A diagnostic event observed during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A triple-slash reference directive was stripped from a loaded file.
    Reference {
        /// The directive's target (its `path` or `types` attribute).
        reference: String,
        /// The file the directive was removed from.
        path: PathBuf,
    },
}

/// Sink for [`Event`]s.
#[derive(Clone, Default)]
pub struct Emitter {
    sink: Option<Arc<dyn Fn(&Event) + Send + Sync>>,
}

impl Emitter {
    /// Create an emitter that forwards every event to `sink`.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// Report an event. A no-op for the default emitter.
    pub fn emit(&self, event: &Event) {
        if let Some(sink) = &self.sink {
            sink(event);
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("sink", &self.sink.as_ref().map(|_| "..."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_default_emitter_is_silent() {
        let emitter = Emitter::default();
        emitter.emit(&Event::Reference {
            reference: "node.d.ts".to_string(),
            path: PathBuf::from("a.d.ts"),
        });
    }

    #[test]
    fn test_emitter_forwards_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let emitter = Emitter::new(move |event| sink.lock().unwrap().push(event.clone()));

        let event = Event::Reference {
            reference: "globals.d.ts".to_string(),
            path: PathBuf::from("lib/index.d.ts"),
        };
        emitter.emit(&event);

        assert_eq!(seen.lock().unwrap().as_slice(), &[event]);
    }
}
