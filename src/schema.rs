//! Schema model and the inference engine.
//!
//! This module owns [`SchemaField`] (the typed, named, nullability-tagged
//! column the warehouse understands), the [`FieldType`]/[`FieldMode`]
//! enumerations, JSON persistence for the operator-editable schema preview,
//! and [`infer_schema`], which samples a bounded prefix of an uploaded
//! document to propose a schema.
//!
//! ## Responsibilities
//!
//! - Fixed warehouse type/mode tokens (never free text)
//! - Schema preview saving, loading, and validation of hand edits
//! - Bounded sampling (first 10 records) over CSV and JSON sources
//! - Per-column type voting and nullability detection

use std::{
    collections::HashSet,
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    classify::TypeTally,
    error::PipelineError,
    identifier::sanitize,
    source::{RecordSource, SourceFormat, open_source},
};

/// Upper bound on records read during inference, regardless of document size.
pub const SAMPLE_ROWS: usize = 10;

/// Column type as the warehouse spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Date => "DATE",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column nullability. Inference emits REQUIRED or NULLABLE; REPEATED is
/// accepted on hand-edited schemas and passed through to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Required,
    Nullable,
    Repeated,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Required => "REQUIRED",
            FieldMode::Nullable => "NULLABLE",
            FieldMode::Repeated => "REPEATED",
        }
    }
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: FieldMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<SchemaField>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("Writing schema JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: Schema = serde_json::from_reader(reader).context("Parsing schema JSON")?;
        schema.validate()?;
        Ok(schema)
    }

    /// Rejects schemas a hand edit has broken: empty field lists, names that
    /// are not in sanitized form, and duplicate names.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.fields.is_empty(), "Schema contains no fields");
        let mut seen = HashSet::new();
        for field in &self.fields {
            ensure!(!field.name.is_empty(), "Schema contains an unnamed field");
            ensure!(
                sanitize(&field.name) == field.name,
                "Field name '{}' is not a valid column identifier",
                field.name
            );
            ensure!(
                seen.insert(field.name.as_str()),
                "Field name '{}' appears more than once",
                field.name
            );
        }
        Ok(())
    }
}

/// Infers a schema from the first [`SAMPLE_ROWS`] records of `text`.
pub fn infer_schema(text: &str, format: SourceFormat) -> Result<Schema, PipelineError> {
    let source = open_source(text, format)?;
    infer_from_source(source.as_ref())
}

/// Inference over an already-opened source, shared by both formats: union
/// the field names across the sample in first-seen order, vote a type per
/// field, and mark a field REQUIRED only when every sampled record supplied
/// a value for it.
pub fn infer_from_source(source: &dyn RecordSource) -> Result<Schema, PipelineError> {
    let sample = source.sample(SAMPLE_ROWS)?;

    let mut names: Vec<String> = Vec::new();
    for record in &sample {
        for name in record.names() {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
    }

    let mut fields = Vec::with_capacity(names.len());
    for raw_name in &names {
        let mut tally = TypeTally::new();
        let mut required = true;
        for record in &sample {
            match record.get(raw_name) {
                Some(value) => tally.record(value),
                None => required = false,
            }
        }
        fields.push(SchemaField {
            name: sanitize(raw_name),
            field_type: tally.decide(),
            mode: if required {
                FieldMode::Required
            } else {
                FieldMode::Nullable
            },
            description: None,
        });
    }

    Ok(Schema { fields })
}
