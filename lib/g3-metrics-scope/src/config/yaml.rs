/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError as HumanizeError;
use yaml_rust::{Yaml, yaml};

use super::{BufferPolicy, FlushInterval, ScopeConfig};
use crate::types::{MetricExtras, MetricTagMap, check_sample_rate};

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        _ => Err(anyhow!(
            "yaml value type for 'string' should be 'string', 'integer', 'real' or 'boolean'"
        )),
    }
}

fn as_f64(v: &Yaml) -> anyhow::Result<f64> {
    match v {
        Yaml::Real(s) | Yaml::String(s) => {
            f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))
        }
        Yaml::Integer(i) => Ok(*i as f64),
        _ => Err(anyhow!("yaml value type for 'f64' should be 'real' or 'integer'")),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::Boolean(b) => Ok(*b),
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!(
            "yaml value type for 'bool' should be 'boolean' / 'string' / 'integer'"
        )),
    }
}

fn as_prefix(v: &Yaml) -> anyhow::Result<Vec<String>> {
    match v {
        Yaml::Array(seq) => {
            let mut nodes = Vec::with_capacity(seq.len());
            for (i, v) in seq.iter().enumerate() {
                let node = as_string(v).context(format!("invalid prefix value for #{i}"))?;
                nodes.push(node);
            }
            Ok(nodes)
        }
        _ => Ok(vec![as_string(v)?]),
    }
}

fn as_tag_map(v: &Yaml) -> anyhow::Result<MetricTagMap> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for 'tags' should be 'map'"));
    };
    let mut tags = MetricTagMap::default();
    foreach_kv(map, |k, v| {
        let value = as_string(v)?;
        tags.add_tag(k, value);
        Ok(())
    })?;
    Ok(tags)
}

fn as_json_value(v: &Yaml) -> anyhow::Result<serde_json::Value> {
    use serde_json::Value;

    match v {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(*b)),
        Yaml::Integer(i) => Ok(Value::from(*i)),
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("f64 value {f} can not be represented in json"))
        }
        Yaml::String(s) => Ok(Value::String(s.to_string())),
        Yaml::Array(seq) => {
            let values = seq
                .iter()
                .map(as_json_value)
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(Value::Array(values))
        }
        Yaml::Hash(map) => {
            let mut obj = serde_json::Map::new();
            foreach_kv(map, |k, v| {
                obj.insert(k.to_string(), as_json_value(v)?);
                Ok(())
            })?;
            Ok(Value::Object(obj))
        }
        _ => Err(anyhow!("unsupported yaml value type")),
    }
}

fn as_extras(v: &Yaml) -> anyhow::Result<MetricExtras> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for 'extras' should be 'map'"));
    };
    let mut extras = MetricExtras::default();
    foreach_kv(map, |k, v| {
        extras.add_extra(k, as_json_value(v)?);
        Ok(())
    })?;
    Ok(extras)
}

impl FlushInterval {
    /// Numbers are taken as milliseconds, with `0` and negative values
    /// keeping their special meaning. Strings may be humanized durations.
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        match v {
            Yaml::Integer(ms) => Ok(FlushInterval::from_millis(*ms)),
            Yaml::Boolean(false) => Ok(FlushInterval::Disabled),
            Yaml::String(s) => match s.to_lowercase().as_str() {
                "sync" | "synchronous" | "immediate" => Ok(FlushInterval::Synchronous),
                "disabled" | "never" | "none" => Ok(FlushInterval::Disabled),
                _ => match humanize_rs::duration::parse(s) {
                    Ok(d) if d.is_zero() => Ok(FlushInterval::Synchronous),
                    Ok(d) => Ok(FlushInterval::Periodic(d)),
                    Err(HumanizeError::MissingUnit) => {
                        let ms = i64::from_str(s)
                            .map_err(|e| anyhow!("invalid millisecond value: {e}"))?;
                        Ok(FlushInterval::from_millis(ms))
                    }
                    Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
                },
            },
            Yaml::Real(s) => {
                let ms = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
                if ms < 0.0 {
                    return Ok(FlushInterval::Disabled);
                }
                let d = Duration::try_from_secs_f64(ms / 1000.0).map_err(anyhow::Error::new)?;
                if d.is_zero() {
                    Ok(FlushInterval::Synchronous)
                } else {
                    Ok(FlushInterval::Periodic(d))
                }
            }
            _ => Err(anyhow!(
                "yaml value type for 'flush interval' should be 'integer', 'string' or 'real'"
            )),
        }
    }
}

impl BufferPolicy {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut policy = BufferPolicy::default();
            foreach_kv(map, |k, v| policy.set_by_yaml_kv(k, v))?;
            Ok(policy)
        } else {
            Err(anyhow!("yaml value type for 'metrics policy' should be 'map'"))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "max" | "max_metrics" => {
                self.max = match v {
                    Yaml::Null => None,
                    Yaml::Integer(i) => {
                        let max = usize::try_from(*i)
                            .map_err(|e| anyhow!("invalid usize value for key {k}: {e}"))?;
                        Some(max)
                    }
                    Yaml::String(s) if s == "unbounded" => None,
                    _ => return Err(anyhow!("invalid value for key {k}")),
                };
            }
            "flush_interval" | "flush_interval_ms" => {
                self.flush_interval = FlushInterval::parse_yaml(v)
                    .context(format!("invalid flush interval value for key {k}"))?;
            }
            "keep_metrics" => {
                self.keep_metrics =
                    as_bool(v).context(format!("invalid bool value for key {k}"))?;
            }
            "auto_start_flushing" | "auto_start" => {
                self.auto_start_flushing =
                    as_bool(v).context(format!("invalid bool value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}

impl ScopeConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = ScopeConfig::default();
            foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            Ok(config)
        } else {
            Err(anyhow!("yaml value type for 'stats scope config' should be 'map'"))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "prefix" => {
                self.prefix = as_prefix(v).context(format!("invalid prefix value for key {k}"))?;
            }
            "sample_rate" => {
                let rate = as_f64(v).context(format!("invalid f64 value for key {k}"))?;
                let rate = check_sample_rate(rate)?;
                self.sample_rate = Some(rate);
            }
            "tags" => {
                self.tags = as_tag_map(v).context(format!("invalid tags value for key {k}"))?;
            }
            "extras" => {
                self.extras = as_extras(v).context(format!("invalid extras value for key {k}"))?;
            }
            "metrics" => {
                self.metrics = BufferPolicy::parse_yaml(v)
                    .context(format!("invalid metrics policy value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}
