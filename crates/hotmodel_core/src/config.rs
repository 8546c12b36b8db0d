//! Per-tree engine configuration.
//!
//! A `HotConfig` is handed to a root node at construction and lives in that
//! root's listener registry. Nothing here is process-global.

use crate::node::listener::{DiagnosticSink, LogSink};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Default bound on nested fires before delivery is skipped.
pub const DEFAULT_MAX_FIRE_DEPTH: usize = 64;

/// Settings shared by every node of one tree.
#[derive(Clone)]
pub struct HotConfig {
    max_fire_depth: usize,
    sink: Rc<dyn DiagnosticSink>,
}

impl HotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many fires may nest (listeners mutating the model) before
    /// further delivery is skipped. Values below 1 are raised to 1.
    pub fn with_max_fire_depth(mut self, depth: usize) -> Self {
        self.max_fire_depth = depth.max(1);
        self
    }

    /// Replaces the diagnostic sink that observes fires and listener failures.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Rc::new(sink);
        self
    }

    pub fn max_fire_depth(&self) -> usize {
        self.max_fire_depth
    }

    pub fn sink(&self) -> &Rc<dyn DiagnosticSink> {
        &self.sink
    }
}

impl Default for HotConfig {
    fn default() -> Self {
        Self {
            max_fire_depth: DEFAULT_MAX_FIRE_DEPTH,
            sink: Rc::new(LogSink),
        }
    }
}

impl Debug for HotConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotConfig")
            .field("max_fire_depth", &self.max_fire_depth)
            .finish_non_exhaustive()
    }
}
