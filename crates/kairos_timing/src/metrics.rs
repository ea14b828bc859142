//! Consolidated STA metrics.
//!
//! The flow writes one JSON document of metrics keyed by name. Per-corner
//! values carry a `__corner:<name>` suffix, e.g.
//! `timing__setup__ws__corner:nom_ss_100C_1v60`. Keys without a suffix are
//! global.

use crate::error::TimingError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

const CORNER_SUFFIX: &str = "__corner:";

/// Worst setup slack metric name.
pub const SETUP_WS: &str = "timing__setup__ws";

/// Worst hold slack metric name.
pub const HOLD_WS: &str = "timing__hold__ws";

/// The full metrics document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaMetrics {
    entries: BTreeMap<String, Value>,
}

impl StaMetrics {
    /// Parses either a flat object or one nested under a `metrics` key.
    pub fn from_json(text: &str) -> Result<Self, TimingError> {
        let doc: Value =
            serde_json::from_str(text).map_err(|e| TimingError::Metrics(e.to_string()))?;
        let object = match doc {
            Value::Object(mut map) => match map.remove("metrics") {
                Some(Value::Object(inner)) => inner,
                Some(_) => {
                    return Err(TimingError::Metrics(
                        "'metrics' is not an object".to_string(),
                    ))
                }
                None => map,
            },
            _ => {
                return Err(TimingError::Metrics(
                    "top level is not an object".to_string(),
                ))
            }
        };
        Ok(Self {
            entries: object.into_iter().collect(),
        })
    }

    /// Metrics without a corner suffix.
    pub fn global(&self) -> BTreeMap<&str, &Value> {
        self.entries
            .iter()
            .filter(|(k, _)| !k.contains(CORNER_SUFFIX))
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    /// Names of every corner that has at least one metric.
    pub fn corners(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .entries
            .keys()
            .filter_map(|k| k.split_once(CORNER_SUFFIX).map(|(_, c)| c))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Metrics for one corner, with the suffix stripped from each name.
    pub fn corner(&self, name: &str) -> Result<CornerMetrics, TimingError> {
        let suffix = format!("{CORNER_SUFFIX}{name}");
        let values: BTreeMap<String, Value> = self
            .entries
            .iter()
            .filter_map(|(k, v)| k.strip_suffix(&suffix).map(|base| (base.to_string(), v.clone())))
            .collect();
        if values.is_empty() {
            return Err(TimingError::MissingCorner(name.to_string()));
        }
        Ok(CornerMetrics {
            corner: name.to_string(),
            values,
        })
    }
}

/// Metrics for a single corner.
#[derive(Clone, Debug, PartialEq)]
pub struct CornerMetrics {
    /// Corner name.
    pub corner: String,
    values: BTreeMap<String, Value>,
}

impl CornerMetrics {
    /// Raw metric value by base name.
    pub fn get(&self, metric: &str) -> Option<&Value> {
        self.values.get(metric)
    }

    /// Metric value as a float, if present and numeric.
    pub fn get_f64(&self, metric: &str) -> Option<f64> {
        self.get(metric).and_then(Value::as_f64)
    }

    /// Worst setup slack.
    pub fn setup_ws(&self) -> Option<f64> {
        self.get_f64(SETUP_WS)
    }

    /// Worst hold slack.
    pub fn hold_ws(&self) -> Option<f64> {
        self.get_f64(HOLD_WS)
    }

    /// `true` if either worst slack is negative.
    pub fn violated(&self) -> bool {
        self.setup_ws().is_some_and(|s| s < 0.0) || self.hold_ws().is_some_and(|s| s < 0.0)
    }
}
