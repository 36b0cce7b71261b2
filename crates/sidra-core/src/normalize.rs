//! Normalization of upstream IBGE aggregate payloads into [`ReportRecord`]s.
//!
//! The upstream API answers in two shapes: older endpoints carry a flat
//! `valor` field per item; the aggregates API nests values under
//! `resultados[].series[]`. Each item is classified into an explicit
//! [`ValueSource`] before extraction so unknown shapes surface as
//! `Unrecognized` instead of silently falling through.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::report::ReportRecord;

/// Where an item's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Item carries a top-level `valor` field.
    Flat(Value),
    /// Item nests values under `resultados[0].series`.
    Series(Vec<SeriesEntry>),
    /// Neither shape matched; no value is extracted.
    Unrecognized,
}

/// One entry of a `series` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesEntry {
    #[serde(default)]
    pub localidade: Option<SeriesLocality>,
    #[serde(default)]
    pub serie: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesLocality {
    #[serde(default)]
    pub nivel: Option<Value>,
    #[serde(default)]
    pub nome: Option<String>,
}

/// Classify a raw aggregate item into its value-bearing shape.
pub fn classify(item: &Value) -> ValueSource {
    if let Some(valor) = item.get("valor") {
        return ValueSource::Flat(valor.clone());
    }

    let series = item
        .get("resultados")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .and_then(|r| r.get("series"));

    match series {
        Some(series) => match serde_json::from_value::<Vec<SeriesEntry>>(series.clone()) {
            Ok(entries) => ValueSource::Series(entries),
            Err(_) => ValueSource::Unrecognized,
        },
        None => ValueSource::Unrecognized,
    }
}

/// Pick the value out of a series: the first entry that names a locality
/// level wins, and within it the first period key of its `serie` map.
/// Iteration order is the upstream document order; when several entries
/// qualify the first match is kept. This is a documented lossy
/// simplification, not a faithful transform of the whole series.
fn extract_series_value(entries: &[SeriesEntry]) -> Option<Value> {
    entries
        .iter()
        .find(|entry| {
            entry
                .localidade
                .as_ref()
                .and_then(|loc| loc.nivel.as_ref())
                .is_some()
        })
        .and_then(|entry| entry.serie.values().next().cloned())
}

fn display_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn nested_name(item: &Value, field: &str) -> String {
    item.get(field)
        .and_then(|v| v.get("nome"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Normalize one raw aggregate item into a flat report record.
pub fn normalize_item(item: &Value) -> ReportRecord {
    let locality = {
        let name = nested_name(item, "localidade");
        if name.is_empty() {
            "Brasil".to_string()
        } else {
            name
        }
    };

    let value = match classify(item) {
        ValueSource::Flat(valor) => Some(valor),
        ValueSource::Series(entries) => extract_series_value(&entries),
        ValueSource::Unrecognized => None,
    };

    ReportRecord {
        id: display_string(item.get("id")),
        variable: nested_name(item, "variavel"),
        unit: nested_name(item, "unidade"),
        locality,
        period: display_string(item.get("periodo")),
        value,
        ..Default::default()
    }
}

/// Normalize a sequence of raw aggregate items, preserving order.
pub fn normalize_items(items: &[Value]) -> Vec<ReportRecord> {
    items.iter().map(normalize_item).collect()
}

/// Normalize a whole upstream body. Non-array bodies yield no records.
pub fn normalize_value(body: &Value) -> Vec<ReportRecord> {
    match body.as_array() {
        Some(items) => normalize_items(items),
        None => Vec::new(),
    }
}
