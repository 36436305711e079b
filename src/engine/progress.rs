// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use crate::backends::TracingProgress;
use crate::traits::ProgressSink;

/// A [`ProgressSink`] bound to one node's instance path.
///
/// Cheap to clone; tasks receive one through their context.
#[derive(Clone)]
pub struct ProgressHandle {
    sink: Arc<dyn ProgressSink>,
    node: String,
}

impl ProgressHandle {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            node: String::new(),
        }
    }

    /// Reports to the log through [`TracingProgress`].
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingProgress))
    }

    /// Same sink, reporting for `node`.
    pub fn for_node(&self, node: impl Into<String>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            node: node.into(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn start(&self) {
        self.sink.start(&self.node);
    }

    /// `value` is a fraction in `0.0..=1.0`; values outside are clamped.
    pub fn set_value(&self, value: f64, message: &str) {
        self.sink
            .set_value(&self.node, value.clamp(0.0, 1.0), message);
    }

    pub fn stop(&self, message: &str) {
        self.sink.stop(&self.node, message);
    }

    pub fn add_message(&self, text: &str) {
        self.sink.add_message(&self.node, text);
    }
}

impl Default for ProgressHandle {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("node", &self.node)
            .finish()
    }
}
