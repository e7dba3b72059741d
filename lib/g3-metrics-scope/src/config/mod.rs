/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use crate::types::{MetricExtras, MetricTagMap};

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushInterval {
    /// Flush right after every push.
    Synchronous,
    Periodic(Duration),
    /// Only explicit flush calls deliver metrics.
    Disabled,
}

impl FlushInterval {
    /// `0` is synchronous, a negative value disables periodic flushing.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => FlushInterval::Synchronous,
            ms if ms < 0 => FlushInterval::Disabled,
            ms => FlushInterval::Periodic(Duration::from_millis(ms as u64)),
        }
    }

    pub fn period(&self) -> Option<Duration> {
        match self {
            FlushInterval::Periodic(d) => Some(*d),
            _ => None,
        }
    }
}

impl Default for FlushInterval {
    fn default() -> Self {
        FlushInterval::Periodic(DEFAULT_FLUSH_INTERVAL)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Max records held by a scope, the oldest is dropped on overflow.
    /// `None` or `Some(0)` means unbounded.
    pub max: Option<usize>,
    pub flush_interval: FlushInterval,
    /// Keep records in the buffer after they have been delivered.
    pub keep_metrics: bool,
    pub auto_start_flushing: bool,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        BufferPolicy {
            max: None,
            flush_interval: FlushInterval::default(),
            keep_metrics: false,
            auto_start_flushing: true,
        }
    }
}

impl BufferPolicy {
    pub(crate) fn limit(&self) -> Option<usize> {
        self.max.filter(|n| *n > 0)
    }

    /// Policy of a scope created under a scope using this policy.
    pub(crate) fn for_child(&self) -> Self {
        BufferPolicy {
            max: self.max,
            flush_interval: FlushInterval::Disabled,
            keep_metrics: true,
            auto_start_flushing: self.auto_start_flushing,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScopeConfig {
    pub prefix: Vec<String>,
    pub sample_rate: Option<f64>,
    pub tags: MetricTagMap,
    pub extras: MetricExtras,
    /// Ignored by child scopes, which inherit the policy of their parent.
    pub metrics: BufferPolicy,
}

impl ScopeConfig {
    pub fn with_prefix<S: Into<String>>(prefix: S) -> Self {
        ScopeConfig {
            prefix: vec![prefix.into()],
            ..Default::default()
        }
    }

    pub fn prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.add_tag(key, value);
        self
    }

    pub fn extra<K: Into<String>, V: Into<serde_json::Value>>(mut self, key: K, value: V) -> Self {
        self.extras.add_extra(key, value);
        self
    }

    pub fn metrics(mut self, policy: BufferPolicy) -> Self {
        self.metrics = policy;
        self
    }

    pub fn max_metrics(mut self, max: usize) -> Self {
        self.metrics.max = Some(max);
        self
    }

    pub fn flush_interval(mut self, interval: FlushInterval) -> Self {
        self.metrics.flush_interval = interval;
        self
    }

    pub fn keep_metrics(mut self, keep: bool) -> Self {
        self.metrics.keep_metrics = keep;
        self
    }

    pub fn auto_start_flushing(mut self, enable: bool) -> Self {
        self.metrics.auto_start_flushing = enable;
        self
    }
}
