/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::types::{
    MetricExtras, MetricKind, MetricName, MetricTagMap, MetricValue, effective_sample_rate,
    write_f64,
};

static NEXT_METRIC_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId(u64);

impl MetricId {
    fn next() -> Self {
        MetricId(NEXT_METRIC_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metric-{}", self.0)
    }
}

/// Per call overrides of the scope defaults.
#[derive(Clone, Debug, Default)]
pub struct MetricOptions {
    pub sample_rate: Option<f64>,
    pub tags: MetricTagMap,
    pub extras: MetricExtras,
}

impl MetricOptions {
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.add_tag(key, value);
        self
    }

    pub fn with_extra<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.extras.add_extra(key, value);
        self
    }
}

/// One observation.
///
/// The id and kind are fixed at construction. Only a counter's value moves
/// afterwards, when increments are folded into a still buffered record.
#[derive(Clone, Debug)]
pub struct MetricRecord {
    id: MetricId,
    kind: MetricKind,
    name: Arc<MetricName>,
    pub(crate) value: MetricValue,
    sample_rate: Option<f64>,
    tags: Arc<MetricTagMap>,
    extras: Arc<MetricExtras>,
    emitted_at: DateTime<Utc>,
}

impl MetricRecord {
    pub fn new(
        kind: MetricKind,
        name: MetricName,
        value: MetricValue,
        sample_rate: Option<f64>,
        tags: MetricTagMap,
        extras: MetricExtras,
    ) -> Self {
        MetricRecord {
            id: MetricId::next(),
            kind,
            name: Arc::new(name),
            value,
            sample_rate: effective_sample_rate(sample_rate),
            tags: Arc::new(tags),
            extras: Arc::new(extras),
            emitted_at: Utc::now(),
        }
    }

    #[inline]
    pub fn id(&self) -> MetricId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &MetricName {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> MetricValue {
        self.value
    }

    #[inline]
    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    #[inline]
    pub fn tags(&self) -> &MetricTagMap {
        &self.tags
    }

    #[inline]
    pub fn extras(&self) -> &MetricExtras {
        &self.extras
    }

    #[inline]
    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }

    pub(crate) fn is_counter_named(&self, name: &MetricName) -> bool {
        self.kind == MetricKind::Counter && self.name.matches(name)
    }
}

/// The statsd line form:
/// `<name>:<value>|<type>[|@<sample rate>][|#<k>:<v>,...]`
impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}|{}", self.name, self.value, self.kind.as_str())?;
        if let Some(rate) = self.sample_rate {
            f.write_str("|@")?;
            write_f64(f, rate)?;
        }
        if !self.tags.is_empty() {
            f.write_str("|#")?;
            fmt::Display::fmt(&self.tags, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: MetricKind, value: MetricValue) -> MetricRecord {
        MetricRecord::new(
            kind,
            MetricName::new(["test"]),
            value,
            None,
            MetricTagMap::default(),
            MetricExtras::default(),
        )
    }

    #[test]
    fn unique_id() {
        let r1 = record(MetricKind::Counter, MetricValue::Signed(1));
        let r2 = record(MetricKind::Counter, MetricValue::Signed(1));
        assert_ne!(r1.id(), r2.id());
        assert!(r1.id() < r2.id());
        assert_eq!(r1.clone().id(), r1.id());
    }

    #[test]
    fn format_kinds() {
        let v = MetricValue::Signed(1);
        assert_eq!(record(MetricKind::Counter, v).to_string(), "test:1|c");
        assert_eq!(record(MetricKind::Gauge, v).to_string(), "test:1|g");
        assert_eq!(record(MetricKind::Timing, v).to_string(), "test:1|ms");
        assert_eq!(record(MetricKind::Set, v).to_string(), "test:1|s");
        assert_eq!(record(MetricKind::Histogram, v).to_string(), "test:1|h");
        assert_eq!(
            record(MetricKind::Timing, MetricValue::Double(12.5)).to_string(),
            "test:12.5|ms"
        );
    }

    #[test]
    fn format_sample_rate_and_tags() {
        let r = MetricRecord::new(
            MetricKind::Counter,
            MetricName::new(["app", "requests"]),
            MetricValue::Signed(1),
            Some(0.5),
            MetricTagMap::default().with_tag("env", "prod"),
            MetricExtras::default().with_extra("hidden", true),
        );
        assert_eq!(r.to_string(), "app.requests:1|c|@0.5|#env:prod");

        let r = MetricRecord::new(
            MetricKind::Gauge,
            MetricName::new(["", "cpu"]),
            MetricValue::Double(0.75),
            Some(0.0),
            MetricTagMap::default().with_tag("a", "1").with_tag("b", "2"),
            MetricExtras::default(),
        );
        assert_eq!(r.sample_rate(), None);
        assert_eq!(r.to_string(), "cpu:0.75|g|#a:1,b:2");

        let r = MetricRecord::new(
            MetricKind::Counter,
            MetricName::new(["hits"]),
            MetricValue::Signed(3),
            Some(1.0),
            MetricTagMap::default(),
            MetricExtras::default(),
        );
        assert_eq!(r.to_string(), "hits:3|c|@1");
    }
}
