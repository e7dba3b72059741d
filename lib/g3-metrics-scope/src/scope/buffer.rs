/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;

use log::trace;

use crate::record::{MetricId, MetricRecord};
use crate::types::MetricName;

#[derive(Default)]
pub(super) struct MetricBuffer {
    records: VecDeque<MetricRecord>,
}

impl MetricBuffer {
    /// Append a record, dropping the oldest one if `limit` is exceeded.
    pub(super) fn push(&mut self, record: MetricRecord, limit: Option<usize>) {
        self.records.push_back(record);
        if let Some(max) = limit
            && self.records.len() > max
            && let Some(evicted) = self.records.pop_front()
        {
            trace!(
                "metric buffer full ({max}), drop {} {}",
                evicted.id(),
                evicted.name()
            );
        }
    }

    pub(super) fn find_counter_mut(&mut self, name: &MetricName) -> Option<&mut MetricRecord> {
        self.records.iter_mut().find(|r| r.is_counter_named(name))
    }

    pub(super) fn remove(&mut self, id: MetricId) -> bool {
        match self.records.iter().position(|r| r.id() == id) {
            Some(p) => {
                self.records.remove(p);
                true
            }
            None => false,
        }
    }

    pub(super) fn snapshot(&self) -> Vec<MetricRecord> {
        self.records.iter().cloned().collect()
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.records.len()
    }
}
