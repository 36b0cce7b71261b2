//! Format exporter: turns normalized report records into a download body.
//!
//! CSV and JSON are produced in-process. XLSX and PDF are delegated to a
//! [`ReportWriter`] collaborator; this module only selects the writer and
//! the transport metadata (MIME type, filename extension).

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{CoreError, Result};
use crate::report::{ReportFormat, ReportRecord};

/// Title/subtitle pair passed to binary report writers.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub subtitle: String,
}

impl ReportMeta {
    /// Meta with a generation-timestamp subtitle.
    pub fn new(title: impl Into<String>) -> Self {
        let generated = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            title: title.into(),
            subtitle: format!("Gerado em {generated}"),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }
}

impl Default for ReportMeta {
    fn default() -> Self {
        Self::new("Relatório de Dados IBGE")
    }
}

/// Collaborator that renders records into a binary document. The portal
/// does not ship spreadsheet/PDF engines of its own; production deployments
/// plug real generators in behind this trait.
pub trait ReportWriter: Send + Sync {
    fn write_xlsx(&self, records: &[ReportRecord], meta: &ReportMeta) -> Result<Vec<u8>>;
    fn write_pdf(&self, records: &[ReportRecord], meta: &ReportMeta) -> Result<Vec<u8>>;
}

/// Default writer: renders the same tabular text for both binary formats.
/// Stand-in for external generation libraries, matching the original
/// portal's placeholder exporters.
pub struct TabularWriter;

impl ReportWriter for TabularWriter {
    fn write_xlsx(&self, records: &[ReportRecord], _meta: &ReportMeta) -> Result<Vec<u8>> {
        Ok(to_csv(records)?.into_bytes())
    }

    fn write_pdf(&self, records: &[ReportRecord], meta: &ReportMeta) -> Result<Vec<u8>> {
        let table = to_csv(records)?;
        Ok(format!("{}\n{}\n\n{}", meta.title, meta.subtitle, table).into_bytes())
    }
}

/// A serialized report body plus its transport metadata.
#[derive(Debug, Clone)]
pub struct Export {
    pub body: Bytes,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Serialize records to CSV.
///
/// The header row is the keys of the first record; rows emit values in the
/// same key order (records are assumed homogeneous). String values
/// containing a comma are wrapper-quoted; embedded quotes and newlines are
/// NOT escaped — a documented limitation carried over from the original
/// exporter.
pub fn to_csv<T: Serialize>(records: &[T]) -> Result<String> {
    let maps: Vec<Map<String, Value>> = records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::invalid_parameter(format!(
                "CSV export requires object records, got {other}"
            ))),
        })
        .collect::<Result<_>>()?;

    let Some(first) = maps.first() else {
        return Ok(String::new());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut lines = vec![headers.join(",")];

    for map in &maps {
        let row: Vec<String> = headers.iter().map(|key| csv_cell(map.get(*key))).collect();
        lines.push(row.join(","));
    }

    Ok(lines.join("\n"))
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) if s.contains(',') => format!("\"{s}\""),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Export records in the requested format.
pub fn export(
    records: &[ReportRecord],
    format: ReportFormat,
    meta: &ReportMeta,
    writer: &dyn ReportWriter,
) -> Result<Export> {
    let body = match format {
        ReportFormat::Json => {
            let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
            let envelope = json!({
                "titulo": meta.title,
                "timestamp": timestamp,
                "count": records.len(),
                "data": records,
            });
            Bytes::from(serde_json::to_vec(&envelope)?)
        }
        ReportFormat::Csv => Bytes::from(to_csv(records)?),
        ReportFormat::Xlsx => Bytes::from(writer.write_xlsx(records, meta)?),
        ReportFormat::Pdf => Bytes::from(writer.write_pdf(records, meta)?),
    };

    Ok(Export {
        body,
        content_type: format.content_type(),
        extension: format.extension(),
    })
}
