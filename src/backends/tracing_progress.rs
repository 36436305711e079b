// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::traits::ProgressSink;

/// Progress sink that writes every report as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn start(&self, node: &str) {
        tracing::debug!(node, "progress started");
    }

    fn set_value(&self, node: &str, value: f64, message: &str) {
        tracing::debug!(node, value, message, "progress");
    }

    fn stop(&self, node: &str, message: &str) {
        tracing::debug!(node, message, "progress stopped");
    }

    fn add_message(&self, node: &str, text: &str) {
        tracing::info!(node, "{}", text);
    }
}
