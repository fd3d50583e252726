// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod event;
pub mod sink;

pub use event::BrokerEvent;
pub use sink::{FrameSink, WriterSink};
