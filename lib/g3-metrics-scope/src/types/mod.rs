/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

mod name;
pub use name::MetricName;

mod value;
pub use value::MetricValue;
pub(crate) use value::write_f64;

mod tag;
pub use tag::{MetricExtras, MetricTagMap};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown metric type code: {0}")]
    UnknownKind(String),
    #[error("sample rate {0} is out of range (0, 1]")]
    SampleRateOutOfRange(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Timing,
    Set,
    Histogram,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "c",
            MetricKind::Gauge => "g",
            MetricKind::Timing => "ms",
            MetricKind::Set => "s",
            MetricKind::Histogram => "h",
        }
    }
}

impl FromStr for MetricKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(MetricKind::Counter),
            "g" => Ok(MetricKind::Gauge),
            "ms" => Ok(MetricKind::Timing),
            "s" => Ok(MetricKind::Set),
            "h" => Ok(MetricKind::Histogram),
            _ => Err(ParseError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse the rates that mean "always deliver" into `None`.
///
/// Zero and NaN are treated as unset, so they fall through to the next
/// default in the chain.
pub(crate) fn effective_sample_rate(rate: Option<f64>) -> Option<f64> {
    rate.filter(|r| *r != 0.0 && !r.is_nan())
}

pub fn check_sample_rate(rate: f64) -> Result<f64, ParseError> {
    if rate > 0.0 && rate <= 1.0 {
        Ok(rate)
    } else {
        Err(ParseError::SampleRateOutOfRange(rate))
    }
}
