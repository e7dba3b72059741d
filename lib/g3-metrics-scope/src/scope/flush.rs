/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use super::StatsScope;
use crate::record::MetricRecord;

struct FlushGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlushGuard { flag })
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct FlushStats {
    scopes: usize,
    delivered: usize,
}

impl StatsScope {
    /// Deliver everything buffered in this scope and its descendants to the
    /// consumers of this scope.
    ///
    /// Each descendant is flushed first, so its own consumers get served too.
    /// Delivered records are dropped from their buffer unless that scope
    /// keeps metrics. Calling this while the same scope is already flushing
    /// is a no-op.
    ///
    /// The first consumer error aborts the pass and is returned unchanged.
    /// Records already dropped before the failure stay dropped.
    pub fn flush(&self) -> anyhow::Result<()> {
        let Some(_guard) = FlushGuard::acquire(&self.inner.flushing) else {
            return Ok(());
        };

        let mut stats = FlushStats::default();
        for member in self.subtree() {
            if !member.same_scope(self) {
                member.flush()?;
            }
            self.deliver_buffered(&member, &mut stats)?;
        }

        if stats.delivered > 0 {
            debug!(
                "flushed {} metrics from {} scopes under '{}'",
                stats.delivered,
                stats.scopes,
                self.prefix()
            );
        }
        Ok(())
    }

    fn deliver_buffered(&self, member: &StatsScope, stats: &mut FlushStats) -> anyhow::Result<()> {
        let records = member.inner.buffer.lock().unwrap().snapshot();
        stats.scopes += 1;

        let keep = member.inner.policy.keep_metrics;
        for record in records {
            if self.send(&record)? {
                stats.delivered += 1;
            }
            if !keep {
                member.inner.buffer.lock().unwrap().remove(record.id());
            }
        }
        Ok(())
    }

    /// Hand one record to every consumer that has not seen it yet.
    ///
    /// A sampled record costs one draw on every call, whether or not any
    /// consumer is still pending, and the outcome is shared by all of them.
    /// Returns whether the record reached at least one consumer.
    fn send(&self, record: &MetricRecord) -> anyhow::Result<bool> {
        let selected = self.sample(record);
        let pending = self.inner.consumers.lock().unwrap().pending(record.id());

        let mut sent = false;
        for (consumer_id, consumer) in pending {
            let first_time = self
                .inner
                .consumers
                .lock()
                .unwrap()
                .mark_consumed(consumer_id, record.id());
            if !first_time || !selected {
                continue;
            }
            consumer.consume(record)?;
            sent = true;
        }
        Ok(sent)
    }

    fn sample(&self, record: &MetricRecord) -> bool {
        match record.sample_rate() {
            Some(rate) => self.inner.sampler.lock().unwrap().next_uniform() <= rate,
            None => true,
        }
    }
}
