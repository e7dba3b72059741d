/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::{self, Write};

use indexmap::IndexMap;
use serde_json::Value;

/// Tags attached to a metric, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricTagMap {
    inner: IndexMap<String, String>,
}

impl MetricTagMap {
    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.add_tag(key, value);
        self
    }

    /// Insert a tag, an existing key keeps its position but takes the new value.
    pub fn add_tag<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn merge(&mut self, other: &MetricTagMap) {
        for (k, v) in &other.inner {
            self.inner.insert(k.clone(), v.clone());
        }
    }

    pub fn merged(&self, other: &MetricTagMap) -> Self {
        let mut map = self.clone();
        map.merge(other);
        map
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Renders as `k1:v1,k2:v2`.
impl fmt::Display for MetricTagMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.inner.iter();
        let Some((name, value)) = iter.next() else {
            return Ok(());
        };
        f.write_str(name)?;
        f.write_char(':')?;
        f.write_str(value)?;

        for (name, value) in iter {
            f.write_char(',')?;
            f.write_str(name)?;
            f.write_char(':')?;
            f.write_str(value)?;
        }
        Ok(())
    }
}

/// Free-form values carried along with a metric for consumer use.
///
/// They never show up in the statsd line form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricExtras {
    inner: IndexMap<String, Value>,
}

impl MetricExtras {
    pub fn with_extra<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.add_extra(key, value);
        self
    }

    pub fn add_extra<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn merge(&mut self, other: &MetricExtras) {
        for (k, v) in &other.inner {
            self.inner.insert(k.clone(), v.clone());
        }
    }

    pub fn merged(&self, other: &MetricExtras) -> Self {
        let mut map = self.clone();
        map.merge(other);
        map
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
