/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, Weak};

use crate::config::{BufferPolicy, ScopeConfig};
use crate::random::MersenneTwister;
use crate::record::{MetricOptions, MetricRecord};
use crate::types::{
    MetricExtras, MetricKind, MetricName, MetricTagMap, MetricValue, effective_sample_rate,
};

mod buffer;
use buffer::MetricBuffer;

mod consumer;
use consumer::ConsumerRegistry;
pub use consumer::{ConsumerId, MetricsConsumer};

mod flush;

mod metric;

mod timer;
use timer::FlushTimer;

struct ScopeDefaults {
    prefix: MetricName,
    sample_rate: Option<f64>,
    tags: MetricTagMap,
    extras: MetricExtras,
}

pub(crate) struct ScopeInner {
    defaults: Mutex<ScopeDefaults>,
    policy: BufferPolicy,
    buffer: Mutex<MetricBuffer>,
    consumers: Mutex<ConsumerRegistry>,
    sampler: Mutex<MersenneTwister>,
    children: Mutex<Vec<StatsScope>>,
    parent: Weak<ScopeInner>,
    flushing: AtomicBool,
    timer: Mutex<Option<FlushTimer>>,
}

/// A node of the metrics scope tree.
///
/// Records are buffered in the scope they were created in. A flush on any
/// scope delivers everything buffered in its own subtree to the consumers
/// registered on that scope, each record at most once per consumer.
///
/// The handle is cheap to clone, all clones refer to the same scope.
#[derive(Clone)]
pub struct StatsScope {
    inner: Arc<ScopeInner>,
}

impl StatsScope {
    /// Create a root scope.
    ///
    /// With a periodic flush interval and `auto_start_flushing` set, the
    /// flush timer is spawned on the current tokio runtime.
    pub fn new(config: ScopeConfig) -> Self {
        let defaults = ScopeDefaults {
            prefix: MetricName::new(config.prefix),
            sample_rate: config.sample_rate,
            tags: config.tags,
            extras: config.extras,
        };
        let scope = StatsScope::build(defaults, config.metrics, Weak::new());
        if scope.inner.policy.auto_start_flushing {
            scope.start_flush_interval();
        }
        scope
    }

    fn build(defaults: ScopeDefaults, policy: BufferPolicy, parent: Weak<ScopeInner>) -> Self {
        StatsScope {
            inner: Arc::new(ScopeInner {
                defaults: Mutex::new(defaults),
                policy,
                buffer: Mutex::new(MetricBuffer::default()),
                consumers: Mutex::new(ConsumerRegistry::default()),
                sampler: Mutex::new(MersenneTwister::default()),
                children: Mutex::new(Vec::new()),
                parent,
                flushing: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Create a scope below this one.
    ///
    /// The child prefix is this scope's prefix as it is now, followed by the
    /// configured one. Tags and extras are merged over the ones of this
    /// scope, the sample rate is only taken from `config`. The buffer policy of `config` is ignored: the child keeps its
    /// records after a flush and never flushes on its own, its records are
    /// delivered when an ancestor flushes.
    pub fn create_scope(&self, config: ScopeConfig) -> StatsScope {
        let defaults = {
            let parent = self.inner.defaults.lock().unwrap();
            let mut prefix = parent.prefix.clone();
            for node in config.prefix {
                prefix.push(node);
            }
            ScopeDefaults {
                prefix,
                sample_rate: effective_sample_rate(config.sample_rate),
                tags: parent.tags.merged(&config.tags),
                extras: parent.extras.merged(&config.extras),
            }
        };

        let child = StatsScope::build(
            defaults,
            self.inner.policy.for_child(),
            Arc::downgrade(&self.inner),
        );
        self.inner.children.lock().unwrap().push(child.clone());
        child
    }

    pub fn parent(&self) -> Option<StatsScope> {
        self.inner.parent.upgrade().map(|inner| StatsScope { inner })
    }

    pub fn root(&self) -> StatsScope {
        let mut scope = self.clone();
        while let Some(parent) = scope.parent() {
            scope = parent;
        }
        scope
    }

    pub fn children(&self) -> Vec<StatsScope> {
        self.inner.children.lock().unwrap().clone()
    }

    /// This scope followed by all its descendants, depth first.
    pub(crate) fn subtree(&self) -> Vec<StatsScope> {
        let mut scopes = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(scope) = stack.pop() {
            let children = scope.children();
            stack.extend(children.into_iter().rev());
            scopes.push(scope);
        }
        scopes
    }

    pub fn same_scope(&self, other: &StatsScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The dotted prefix of this scope.
    pub fn prefix(&self) -> String {
        self.inner.defaults.lock().unwrap().prefix.dotted()
    }

    pub fn policy(&self) -> &BufferPolicy {
        &self.inner.policy
    }

    /// Append segments to the prefix of this scope.
    ///
    /// Existing child scopes keep the prefix they were created with.
    pub fn set_name<I, S>(&self, nodes: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut defaults = self.inner.defaults.lock().unwrap();
        for node in nodes {
            defaults.prefix.push(node);
        }
        self
    }

    /// Merge tags into the scope default tags.
    pub fn set_tags(&self, tags: &MetricTagMap) -> &Self {
        self.inner.defaults.lock().unwrap().tags.merge(tags);
        self
    }

    pub fn has_tags(&self) -> bool {
        !self.inner.defaults.lock().unwrap().tags.is_empty()
    }

    pub fn tags(&self) -> MetricTagMap {
        self.inner.defaults.lock().unwrap().tags.clone()
    }

    pub fn add_consumer(&self, consumer: Arc<dyn MetricsConsumer>) -> ConsumerId {
        self.inner.consumers.lock().unwrap().add(consumer)
    }

    pub fn add_consumer_fn<F>(&self, f: F) -> ConsumerId
    where
        F: Fn(&MetricRecord) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_consumer(Arc::new(f))
    }

    /// Unregister a consumer, unknown ids are ignored.
    pub fn remove_consumer(&self, id: ConsumerId) -> &Self {
        self.inner.consumers.lock().unwrap().remove(id);
        self
    }

    pub fn consumer_count(&self) -> usize {
        self.inner.consumers.lock().unwrap().len()
    }

    /// Reseed the generator used for sampling decisions of this scope.
    pub fn seed_sampling(&self, seed: u32) -> &Self {
        self.inner.sampler.lock().unwrap().seed(seed);
        self
    }

    /// Start the periodic flush, replacing a running one.
    ///
    /// Does nothing unless the flush interval is periodic.
    pub fn start_flush_interval(&self) -> &Self {
        if let Some(period) = self.inner.policy.flush_interval.period() {
            let timer = FlushTimer::spawn(Arc::downgrade(&self.inner), period);
            *self.inner.timer.lock().unwrap() = timer;
        }
        self
    }

    /// Stop the periodic flush. Buffered records stay until the next flush.
    pub fn stop_flush_interval(&self) -> &Self {
        self.inner.timer.lock().unwrap().take();
        self
    }

    pub fn is_flush_interval_running(&self) -> bool {
        self.inner.timer.lock().unwrap().is_some()
    }

    /// Records buffered in this scope.
    pub fn buffered(&self) -> Vec<MetricRecord> {
        self.inner.buffer.lock().unwrap().snapshot()
    }

    pub fn buffered_count(&self) -> usize {
        self.inner.buffer.lock().unwrap().len()
    }

    /// Records buffered in this scope and all its descendants, oldest first.
    pub fn metrics(&self) -> Vec<MetricRecord> {
        let mut records: Vec<MetricRecord> = self
            .subtree()
            .iter()
            .flat_map(|scope| scope.buffered())
            .collect();
        records.sort_by_key(|r| (r.emitted_at(), r.id()));
        records
    }

    fn new_record(
        &self,
        kind: MetricKind,
        name: &str,
        value: MetricValue,
        options: &MetricOptions,
    ) -> MetricRecord {
        let defaults = self.inner.defaults.lock().unwrap();
        let mut full_name = defaults.prefix.clone();
        full_name.push(name);
        MetricRecord::new(
            kind,
            full_name,
            value,
            effective_sample_rate(options.sample_rate).or(defaults.sample_rate),
            defaults.tags.merged(&options.tags),
            defaults.extras.merged(&options.extras),
        )
    }
}

#[cfg(test)]
fn collect_lines(scope: &StatsScope) -> (ConsumerId, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let id = scope.add_consumer_fn(move |r: &MetricRecord| {
        sink.lock().unwrap().push(r.to_string());
        Ok(())
    });
    (id, lines)
}

#[cfg(test)]
fn manual_scope(config: ScopeConfig) -> StatsScope {
    StatsScope::new(config.flush_interval(crate::config::FlushInterval::Disabled))
}
