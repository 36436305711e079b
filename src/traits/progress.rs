// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Receives progress of running nodes. `node` is the instance path of the node.
pub trait ProgressSink: Send + Sync {
    fn start(&self, node: &str);

    fn set_value(&self, node: &str, value: f64, message: &str);

    fn stop(&self, node: &str, message: &str);

    fn add_message(&self, node: &str, text: &str);
}
