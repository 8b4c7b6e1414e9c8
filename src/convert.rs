//! Row conversion: the full-document re-parse that follows schema preview.
//!
//! Unlike inference, which stops after a bounded sample, conversion walks
//! every record and coerces each raw value with [`convert_value`]. Field
//! names pass through the same sanitizer as inference, so converted keys
//! always line up with the inferred schema for the same raw header or key.

use log::warn;

use crate::{
    data::{Row, convert_value},
    error::PipelineError,
    identifier::sanitize,
    source::{RecordSource, SourceFormat, open_source},
};

/// Every convertible row of the document, plus the count of rows the source
/// dropped under its lenient policy.
#[derive(Debug)]
pub struct Conversion {
    pub rows: Vec<Row>,
    pub skipped_rows: usize,
}

/// Converts the entire document into typed rows.
pub fn convert_all(text: &str, format: SourceFormat) -> Result<Conversion, PipelineError> {
    let source = open_source(text, format)?;
    convert_from_source(source.as_ref())
}

pub fn convert_from_source(source: &dyn RecordSource) -> Result<Conversion, PipelineError> {
    let outcome = source.read_all()?;
    if outcome.skipped > 0 {
        warn!(
            "Dropped {} row(s) whose field count did not match the header",
            outcome.skipped
        );
    }

    let mut rows = Vec::with_capacity(outcome.records.len());
    for record in &outcome.records {
        let mut row = Row::new();
        for (name, value) in record.iter() {
            row.insert(sanitize(name), convert_value(value));
        }
        rows.push(row);
    }

    Ok(Conversion {
        rows,
        skipped_rows: outcome.skipped,
    })
}
