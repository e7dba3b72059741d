/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};

use crate::record::{MetricId, MetricRecord};

/// Receiver of delivered metrics.
///
/// An error returned here is handed back to whoever triggered the flush and
/// stops the rest of that flush pass.
pub trait MetricsConsumer: Send + Sync {
    fn consume(&self, record: &MetricRecord) -> anyhow::Result<()>;
}

impl<F> MetricsConsumer for F
where
    F: Fn(&MetricRecord) -> anyhow::Result<()> + Send + Sync,
{
    fn consume(&self, record: &MetricRecord) -> anyhow::Result<()> {
        self(record)
    }
}

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

impl ConsumerId {
    fn next() -> Self {
        ConsumerId(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

struct ConsumerEntry {
    consumer: Arc<dyn MetricsConsumer>,
    // grows with every delivered record, never pruned
    consumed: IndexSet<MetricId>,
}

#[derive(Default)]
pub(super) struct ConsumerRegistry {
    inner: IndexMap<ConsumerId, ConsumerEntry>,
}

impl ConsumerRegistry {
    pub(super) fn add(&mut self, consumer: Arc<dyn MetricsConsumer>) -> ConsumerId {
        let id = ConsumerId::next();
        self.inner.insert(
            id,
            ConsumerEntry {
                consumer,
                consumed: IndexSet::new(),
            },
        );
        id
    }

    pub(super) fn remove(&mut self, id: ConsumerId) -> bool {
        self.inner.shift_remove(&id).is_some()
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.inner.len()
    }

    /// Consumers that have not yet seen this record.
    pub(super) fn pending(&self, id: MetricId) -> Vec<(ConsumerId, Arc<dyn MetricsConsumer>)> {
        self.inner
            .iter()
            .filter(|(_, e)| !e.consumed.contains(&id))
            .map(|(cid, e)| (*cid, e.consumer.clone()))
            .collect()
    }

    /// Record the delivery. Returns false if the consumer is gone or has
    /// already been given this record.
    pub(super) fn mark_consumed(&mut self, consumer: ConsumerId, id: MetricId) -> bool {
        match self.inner.get_mut(&consumer) {
            Some(e) => e.consumed.insert(id),
            None => false,
        }
    }

    #[cfg(test)]
    pub(super) fn has_consumed(&self, consumer: ConsumerId, id: MetricId) -> bool {
        self.inner
            .get(&consumer)
            .map(|e| e.consumed.contains(&id))
            .unwrap_or(false)
    }
}
