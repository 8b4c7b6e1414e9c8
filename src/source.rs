//! Record sources: one uniform shape over CSV and JSON uploads.
//!
//! Both the inference engine and the row converter consume [`RawRecord`]s
//! (ordered raw-name to optional-text pairs) so neither needs to know which
//! format produced them. The two implementations carry the format-specific
//! malformation policies: [`CsvSource`] drops rows whose field count differs
//! from the header during a full read, while [`JsonSource`] treats a
//! non-object array element as fatal.

use std::path::Path;

use clap::ValueEnum;
use log::warn;
use serde_json::Value as JsonValue;

use crate::{error::PipelineError, tokenizer::tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum SourceFormat {
    Csv,
    Json,
}

impl SourceFormat {
    /// Picks the format from an explicit flag, falling back to the file
    /// extension (`.json` means JSON, anything else is treated as CSV).
    pub fn resolve(path: &Path, provided: Option<SourceFormat>) -> SourceFormat {
        provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SourceFormat::Json,
            _ => SourceFormat::Csv,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One record in source order: raw field names paired with their raw text.
/// `None` marks an absent value (blank CSV cell, explicit JSON null).
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: Vec<(String, Option<String>)>,
}

impl RawRecord {
    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.push((name.into(), value));
    }

    /// The raw text for `name`, when the key is present with a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Result of reading every record in a document. `skipped` counts rows the
/// source dropped under its lenient policy (CSV shape mismatches).
#[derive(Debug)]
pub struct ReadOutcome {
    pub records: Vec<RawRecord>,
    pub skipped: usize,
}

pub trait RecordSource {
    /// Reads at most `limit` records from the front of the document.
    fn sample(&self, limit: usize) -> Result<Vec<RawRecord>, PipelineError>;

    /// Reads the entire document, applying the format's malformation policy.
    fn read_all(&self) -> Result<ReadOutcome, PipelineError>;
}

/// Opens `text` as a record source in the requested format, running the
/// format's structural checks up front.
pub fn open_source(
    text: &str,
    format: SourceFormat,
) -> Result<Box<dyn RecordSource>, PipelineError> {
    match format {
        SourceFormat::Csv => Ok(Box::new(CsvSource::parse(text)?)),
        SourceFormat::Json => Ok(Box::new(JsonSource::parse(text)?)),
    }
}

pub struct CsvSource {
    headers: Vec<String>,
    /// Raw data lines; tokenized on demand so sampling never pays for the
    /// whole document.
    lines: Vec<String>,
}

impl CsvSource {
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header_line = lines
            .next()
            .ok_or_else(|| PipelineError::MalformedInput("CSV input is empty".to_string()))?;
        let header_line = header_line.strip_prefix('\u{feff}').unwrap_or(header_line);
        let headers = tokenize(header_line);
        let lines: Vec<String> = lines.map(|line| line.to_string()).collect();
        if lines.is_empty() {
            return Err(PipelineError::MalformedInput(
                "CSV input needs a header row and at least one data row".to_string(),
            ));
        }
        Ok(Self { headers, lines })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Pairs a tokenized row with the header, position by position. Blank
    /// cells and positions past the end of a short row become `None`; cells
    /// past the header width are ignored.
    fn record_from(&self, row: &[String]) -> RawRecord {
        let mut record = RawRecord::default();
        for (idx, name) in self.headers.iter().enumerate() {
            let cell = row
                .get(idx)
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .map(|cell| cell.to_string());
            record.push(name.clone(), cell);
        }
        record
    }
}

impl RecordSource for CsvSource {
    fn sample(&self, limit: usize) -> Result<Vec<RawRecord>, PipelineError> {
        Ok(self
            .lines
            .iter()
            .take(limit)
            .map(|line| self.record_from(&tokenize(line)))
            .collect())
    }

    fn read_all(&self) -> Result<ReadOutcome, PipelineError> {
        let mut records = Vec::with_capacity(self.lines.len());
        let mut skipped = 0usize;
        for (idx, line) in self.lines.iter().enumerate() {
            let row = tokenize(line);
            if row.len() != self.headers.len() {
                warn!(
                    "Skipping row {}: expected {} field(s) but found {}",
                    idx + 2,
                    self.headers.len(),
                    row.len()
                );
                skipped += 1;
                continue;
            }
            records.push(self.record_from(&row));
        }
        Ok(ReadOutcome { records, skipped })
    }
}

#[derive(Debug)]
pub struct JsonSource {
    elements: Vec<JsonValue>,
}

impl JsonSource {
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let document: JsonValue = serde_json::from_str(text)?;
        let elements = match document {
            JsonValue::Object(_) => vec![document],
            JsonValue::Array(elements) => {
                if elements.is_empty() {
                    return Err(PipelineError::MalformedInput(
                        "JSON array contains no records".to_string(),
                    ));
                }
                elements
            }
            _ => {
                return Err(PipelineError::MalformedInput(
                    "JSON input must be an object or an array of objects".to_string(),
                ));
            }
        };
        Ok(Self { elements })
    }

    fn record_from(element: &JsonValue) -> Option<RawRecord> {
        let object = element.as_object()?;
        let mut record = RawRecord::default();
        for (key, value) in object {
            record.push(key.clone(), stringify_scalar(value));
        }
        Some(record)
    }
}

/// Renders a JSON leaf as raw text for classification and conversion.
/// Nested arrays/objects are carried as their JSON text; only flat scalar
/// fields are meaningfully typed.
fn stringify_scalar(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(flag) => Some(flag.to_string()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::String(text) => Some(text.clone()),
        nested => Some(nested.to_string()),
    }
}

impl RecordSource for JsonSource {
    fn sample(&self, limit: usize) -> Result<Vec<RawRecord>, PipelineError> {
        let mut records = Vec::new();
        for element in self.elements.iter().take(limit) {
            let record = Self::record_from(element).ok_or_else(|| {
                PipelineError::MalformedInput("JSON array elements must be objects".to_string())
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn read_all(&self) -> Result<ReadOutcome, PipelineError> {
        let mut records = Vec::with_capacity(self.elements.len());
        for (idx, element) in self.elements.iter().enumerate() {
            let record = Self::record_from(element).ok_or_else(|| {
                PipelineError::InvalidRecord(format!("Array element {idx} is not a JSON object"))
            })?;
            records.push(record);
        }
        Ok(ReadOutcome {
            records,
            skipped: 0,
        })
    }
}
