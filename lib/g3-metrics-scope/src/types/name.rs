/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::{self, Write};

use smallvec::SmallVec;

/// Dotted metric name, kept as the segments it was built from.
///
/// Empty segments are skipped when the name is read, so a scope without
/// prefix does not produce a leading `.`.
#[derive(Debug, Clone, Default)]
pub struct MetricName {
    nodes: SmallVec<[String; 4]>,
}

impl MetricName {
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetricName {
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push<S: Into<String>>(&mut self, node: S) {
        self.nodes.push(node.into());
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().next().is_none()
    }

    /// Join the non-empty segments with `.`.
    pub fn dotted(&self) -> String {
        self.to_string()
    }

    fn dotted_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.nodes().enumerate().flat_map(|(i, n)| {
            let sep = if i > 0 { Some('.') } else { None };
            sep.into_iter().chain(n.chars())
        })
    }

    /// Compare the dotted form without allocating.
    pub fn matches(&self, other: &MetricName) -> bool {
        self.dotted_chars().eq(other.dotted_chars())
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.nodes();
        let Some(n) = iter.next() else {
            return Ok(());
        };
        f.write_str(n)?;
        for n in iter {
            f.write_char('.')?;
            f.write_str(n)?;
        }
        Ok(())
    }
}

impl PartialEq for MetricName {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for MetricName {}
