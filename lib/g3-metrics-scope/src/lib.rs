/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod random;
pub use random::MersenneTwister;

pub mod types;
pub use types::{MetricKind, MetricValue};

mod record;
pub use record::{MetricId, MetricOptions, MetricRecord};

mod config;
pub use config::{BufferPolicy, FlushInterval, ScopeConfig};

mod scope;
pub use scope::{ConsumerId, MetricsConsumer, StatsScope};

mod sink;
pub use sink::LineSink;
