// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability for structured logging and tracing.
//!
//! Diagnostic and operational log lines are message structs with a `Display`
//! implementation instead of format strings scattered through the code. Each
//! message also knows its level and fields through [`messages::StructuredLog`].
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - node scheduling and execution events
//! * `messages::builder` - graph construction, rebuild and persistence
//! * `messages::validation` - graph description validation
//!
//! # Usage
//!
//! ```rust
//! use protograph::observability::messages::engine::NodeStarted;
//! use protograph::observability::messages::StructuredLog;
//!
//! NodeStarted { node: "p > load", kind: "task" }.log();
//! ```

pub mod messages;

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::consts::DEFAULT_LOG_FILTER;

static INIT: Once = Once::new();

/// Installs a global `fmt` subscriber once per process.
///
/// The filter comes from `RUST_LOG` and falls back to [`DEFAULT_LOG_FILTER`].
/// Later calls are no-ops, and an already installed subscriber is left alone.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let _ = fmt().with_env_filter(filter).with_target(true).try_init();
    });
}

/// Same as [`init_tracing`] but writes through the test harness capture.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
