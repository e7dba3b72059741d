/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Instant;

use super::StatsScope;
use crate::config::FlushInterval;
use crate::record::{MetricOptions, MetricRecord};
use crate::types::{MetricKind, MetricValue};

/// Recording calls.
///
/// All of them return the error of the first failing consumer when the scope
/// flushes synchronously on push.
impl StatsScope {
    pub fn count<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.count_with_options(name, value, &MetricOptions::default())
    }

    pub fn count_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.record(MetricKind::Counter, name, value.into(), options)
    }

    /// Add to the buffered counter of the same name, or record a new one.
    ///
    /// Only the resolved name is compared. Tags and sample rate of the call
    /// are used only if a new record has to be created.
    pub fn increment<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.increment_with_options(name, value, &MetricOptions::default())
    }

    pub fn increment_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.adjust_counter(name, value.into(), options)
    }

    pub fn decrement<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.decrement_with_options(name, value, &MetricOptions::default())
    }

    pub fn decrement_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.adjust_counter(name, -value.into(), options)
    }

    pub fn gauge<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.gauge_with_options(name, value, &MetricOptions::default())
    }

    pub fn gauge_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.record(MetricKind::Gauge, name, value.into(), options)
    }

    pub fn timing<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.timing_with_options(name, value, &MetricOptions::default())
    }

    pub fn timing_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.record(MetricKind::Timing, name, value.into(), options)
    }

    pub fn set<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.set_with_options(name, value, &MetricOptions::default())
    }

    pub fn set_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.record(MetricKind::Set, name, value.into(), options)
    }

    pub fn histogram<T: Into<MetricValue>>(&self, name: &str, value: T) -> anyhow::Result<()> {
        self.histogram_with_options(name, value, &MetricOptions::default())
    }

    pub fn histogram_with_options<T: Into<MetricValue>>(
        &self,
        name: &str,
        value: T,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        self.record(MetricKind::Histogram, name, value.into(), options)
    }

    /// Start measuring, each call of the returned closure records the
    /// milliseconds elapsed since this call as a timing metric.
    pub fn start_timer(
        &self,
        name: &str,
        options: MetricOptions,
    ) -> impl Fn() -> anyhow::Result<()> + Send + Sync + 'static {
        let scope = self.clone();
        let name = name.to_string();
        let started_at = Instant::now();
        move || {
            let elapsed = started_at.elapsed().as_secs_f64() * 1000.0;
            scope.timing_with_options(&name, elapsed, &options)
        }
    }

    fn record(
        &self,
        kind: MetricKind,
        name: &str,
        value: MetricValue,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        let record = self.new_record(kind, name, value, options);
        self.push_metric(record)
    }

    fn adjust_counter(
        &self,
        name: &str,
        delta: MetricValue,
        options: &MetricOptions,
    ) -> anyhow::Result<()> {
        let record = self.new_record(MetricKind::Counter, name, delta, options);
        {
            let mut buffer = self.inner.buffer.lock().unwrap();
            if let Some(found) = buffer.find_counter_mut(record.name()) {
                found.value += delta;
                return Ok(());
            }
            buffer.push(record, self.inner.policy.limit());
        }
        self.flush_after_push()
    }

    /// Append to the buffer of this scope.
    pub fn push_metric(&self, record: MetricRecord) -> anyhow::Result<()> {
        self.inner
            .buffer
            .lock()
            .unwrap()
            .push(record, self.inner.policy.limit());
        self.flush_after_push()
    }

    fn flush_after_push(&self) -> anyhow::Result<()> {
        if self.inner.policy.flush_interval == FlushInterval::Synchronous {
            self.flush()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScopeConfig;
    use crate::scope::{collect_lines, manual_scope};
    use crate::types::MetricTagMap;

    fn scope() -> StatsScope {
        manual_scope(ScopeConfig::default())
    }

    fn lines(scope: &StatsScope) -> Vec<String> {
        scope.buffered().iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn record_kinds() {
        let scope = scope();
        scope.count("test", 1).unwrap();
        scope.gauge("test", 1).unwrap();
        scope.timing("test", 1).unwrap();
        scope.set("test", 1).unwrap();
        scope.histogram("test", 1).unwrap();
        assert_eq!(
            lines(&scope),
            vec!["test:1|c", "test:1|g", "test:1|ms", "test:1|s", "test:1|h"]
        );
    }

    #[test]
    fn increment_existing() {
        let scope = scope();
        scope.count("test", 1).unwrap();
        scope.increment("test", 1).unwrap();
        assert_eq!(scope.buffered_count(), 1);
        assert_eq!(scope.buffered()[0].value(), MetricValue::Signed(2));
    }

    #[test]
    fn decrement_existing() {
        let scope = scope();
        scope.count("test", 1).unwrap();
        scope.decrement("test", 1).unwrap();
        assert_eq!(scope.buffered_count(), 1);
        assert_eq!(scope.buffered()[0].value(), MetricValue::Signed(0));
    }

    #[test]
    fn negative_deltas() {
        let scope = scope();
        scope.count("test", 1).unwrap();
        scope.increment("test", -1).unwrap();
        assert_eq!(scope.buffered()[0].value(), MetricValue::Signed(0));

        let scope = self::scope();
        scope.count("test", 1).unwrap();
        scope.decrement("test", -1).unwrap();
        assert_eq!(scope.buffered()[0].value(), MetricValue::Signed(2));
    }

    #[test]
    fn counter_sum() {
        let scope = manual_scope(ScopeConfig::with_prefix("app"));
        let deltas = [5i64, -2, 7, 1, -11, 3];
        let mut expected = 0;
        for (i, d) in deltas.iter().enumerate() {
            if i % 2 == 0 {
                scope.increment("hits", *d).unwrap();
                expected += d;
            } else {
                scope.decrement("hits", *d).unwrap();
                expected -= d;
            }
        }
        let records = scope.buffered();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value(), MetricValue::Signed(expected));
        assert_eq!(records[0].name().dotted(), "app.hits");
    }

    #[test]
    fn increment_without_record() {
        let scope = scope();
        scope.decrement("test", 3).unwrap();
        scope.gauge("other", 1).unwrap();
        scope.increment("other", 1).unwrap();
        assert_eq!(lines(&scope), vec!["test:-3|c", "other:1|g", "other:1|c"]);
    }

    #[test]
    fn increment_after_flush_starts_fresh() {
        let scope = scope();
        scope.increment("test", 2).unwrap();
        scope.flush().unwrap();
        assert_eq!(scope.buffered_count(), 0);
        scope.increment("test", 1).unwrap();
        assert_eq!(lines(&scope), vec!["test:1|c"]);
    }

    #[test]
    fn increment_ignores_tags() {
        let scope = scope();
        scope
            .increment_with_options("req", 1, &MetricOptions::default().with_tag("path", "/a"))
            .unwrap();
        scope
            .increment_with_options(
                "req",
                1,
                &MetricOptions::default()
                    .with_tag("path", "/b")
                    .with_sample_rate(0.1),
            )
            .unwrap();
        assert_eq!(lines(&scope), vec!["req:2|c|#path:/a"]);
    }

    #[test]
    fn prefix() {
        let scope = manual_scope(ScopeConfig::with_prefix("test"));
        scope.count("test", 1).unwrap();
        assert_eq!(lines(&scope), vec!["test.test:1|c"]);

        let scope = manual_scope(ScopeConfig::default().prefix(["test", "test2"]));
        scope.count("test", 1).unwrap();
        assert_eq!(lines(&scope), vec!["test.test2.test:1|c"]);
    }

    #[test]
    fn scope_tags() {
        let scope = manual_scope(ScopeConfig::default().tag("env", "prod"));
        scope.count("req", 1).unwrap();
        assert_eq!(lines(&scope), vec!["req:1|c|#env:prod"]);
    }

    #[test]
    fn call_site_tags_win() {
        let scope = manual_scope(ScopeConfig::default().tag("env", "prod").tag("app", "x"));
        scope
            .count_with_options("req", 1, &MetricOptions::default().with_tag("env", "dev"))
            .unwrap();
        assert_eq!(lines(&scope), vec!["req:1|c|#env:dev,app:x"]);
        assert_eq!(scope.tags(), MetricTagMap::default().with_tag("env", "prod").with_tag("app", "x"));
    }

    #[test]
    fn sample_rate() {
        let scope = manual_scope(ScopeConfig::default().sample_rate(0.5));
        scope.count("test", 1).unwrap();
        assert_eq!(lines(&scope), vec!["test:1|c|@0.5"]);

        let scope = self::scope();
        scope
            .count_with_options("test", 1, &MetricOptions::default().with_sample_rate(0.5))
            .unwrap();
        scope
            .count_with_options(
                "test",
                1,
                &MetricOptions::default()
                    .with_sample_rate(0.5)
                    .with_tag("test", "test"),
            )
            .unwrap();
        assert_eq!(lines(&scope), vec!["test:1|c|@0.5", "test:1|c|@0.5|#test:test"]);

        // zero falls back to the scope default
        let scope = manual_scope(ScopeConfig::default().sample_rate(0.25));
        scope
            .gauge_with_options("g", 1, &MetricOptions::default().with_sample_rate(0.0))
            .unwrap();
        assert_eq!(lines(&scope), vec!["g:1|g|@0.25"]);
    }

    #[test]
    fn extras_not_rendered() {
        let scope = manual_scope(ScopeConfig::default().extra("trace", "t1"));
        scope
            .count_with_options("req", 1, &MetricOptions::default().with_extra("span", 7))
            .unwrap();
        let record = &scope.buffered()[0];
        assert_eq!(record.to_string(), "req:1|c");
        assert_eq!(record.extras().len(), 2);
    }

    #[test]
    fn evict_oldest() {
        let scope = manual_scope(ScopeConfig::default().max_metrics(2));
        scope.count("a", 1).unwrap();
        scope.count("b", 1).unwrap();
        scope.count("c", 1).unwrap();
        assert_eq!(lines(&scope), vec!["b:1|c", "c:1|c"]);
    }

    #[test]
    fn synchronous_flush() {
        let scope = StatsScope::new(ScopeConfig::default().flush_interval(FlushInterval::Synchronous));
        let (_, delivered) = collect_lines(&scope);

        scope.count("test", 1).unwrap();
        assert_eq!(delivered.lock().unwrap().len(), 1);
        scope.gauge("test", 1).unwrap();
        assert_eq!(delivered.lock().unwrap().len(), 2);
        scope.timing("test", 1).unwrap();
        assert_eq!(delivered.lock().unwrap().len(), 3);
        assert_eq!(scope.buffered_count(), 0);
    }

    #[test]
    fn synchronous_flush_error() {
        let scope = StatsScope::new(ScopeConfig::default().flush_interval(FlushInterval::Synchronous));
        scope.add_consumer_fn(|_r: &MetricRecord| Err(anyhow::anyhow!("consumer down")));
        let e = scope.count("test", 1).unwrap_err();
        assert_eq!(e.to_string(), "consumer down");
    }

    #[test]
    fn timer() {
        let scope = scope();
        let stop = scope.start_timer("elapsed", MetricOptions::default().with_tag("op", "x"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        stop().unwrap();

        let records = scope.buffered();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), MetricKind::Timing);
        assert!(records[0].value().as_f64() >= 5.0);
        assert_eq!(records[0].tags().get("op"), Some("x"));
    }

    #[test]
    fn timer_called_twice() {
        let scope = scope();
        let lap = scope.start_timer("lap", MetricOptions::default());
        std::thread::sleep(std::time::Duration::from_millis(2));
        lap().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(3));
        lap().unwrap();

        let records = scope.buffered();
        assert_eq!(records.len(), 2);
        let first = records[0].value().as_f64();
        let second = records[1].value().as_f64();
        assert!(first >= 2.0);
        assert!(second >= first + 3.0);
    }
}
