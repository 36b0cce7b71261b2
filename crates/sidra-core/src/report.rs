use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// One flattened report row, normalized from the heterogeneous upstream
/// aggregate payloads. Serialized field names follow the IBGE portal
/// convention consumed by the frontend (Portuguese keys).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReportRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "variavel", default)]
    pub variable: String,
    #[serde(rename = "unidade", default)]
    pub unit: String,
    #[serde(rename = "localidade", default)]
    pub locality: String,
    #[serde(rename = "periodo", default)]
    pub period: String,
    /// Extracted value; absent when no locality-bearing series entry was
    /// found. Kept as raw JSON because the upstream mixes strings and
    /// numbers.
    #[serde(rename = "valor", skip_serializing_if = "Option::is_none", default)]
    pub value: Option<Value>,
    /// Report-type column appended by the typed report handlers.
    #[serde(
        rename = "tipo_relatorio",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub report_kind: Option<String>,
    /// Indicator column appended by the custom report flattening.
    #[serde(rename = "indicador", skip_serializing_if = "Option::is_none", default)]
    pub indicator: Option<String>,
    /// Education level column appended by the education report.
    #[serde(
        rename = "nivel_ensino",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub education_level: Option<String>,
}

impl ReportRecord {
    pub fn with_report_kind(mut self, kind: impl Into<String>) -> Self {
        self.report_kind = Some(kind.into());
        self
    }

    pub fn with_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.indicator = Some(indicator.into());
        self
    }

    pub fn with_education_level(mut self, level: impl Into<String>) -> Self {
        self.education_level = Some(level.into());
        self
    }
}

/// Supported export formats for report endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Xlsx,
    Pdf,
}

impl ReportFormat {
    /// MIME type used for the response `Content-Type`.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            Self::Pdf => "application/pdf",
        }
    }

    /// File extension used in the `Content-Disposition` filename.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "excel" is accepted as an alias for xlsx, mirroring the formats
        // the original portal advertised.
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            other => Err(CoreError::unsupported_format(other)),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Xlsx => write!(f, "xlsx"),
            Self::Pdf => write!(f, "pdf"),
        }
    }
}
