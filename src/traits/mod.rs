// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod codec;
pub mod progress;
pub mod store;
pub mod task;

pub use codec::ResourceCodec;
pub use progress::ProgressSink;
pub use store::{NodeRecord, NodeStore, PortRecord};
pub use task::{PreRunCheck, Task};
