//! Value type classification over sampled column values.
//!
//! Each sampled value casts votes into a [`TypeTally`]; once a column's
//! sample is exhausted, [`TypeTally::decide`] picks the column type. A value
//! matching the boolean token set also votes integer when it is numeric
//! (`1`/`0`), so flag-like columns mixed with ordinary integers resolve to
//! INTEGER rather than flip-flopping between the two.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::FieldType;

/// Minimum share of classified values a type needs to win a column.
const WINNER_THRESHOLD_PERCENT: usize = 70;

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "1", "0", "yes", "no", "y", "n"];

pub(crate) static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("integer pattern"));

pub(crate) static FLOAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").expect("float pattern"));

static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").expect("timestamp pattern"));

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})$").expect("date pattern"));

/// True for values the classifier and converter treat as absent: blank text
/// and the literal `null` token in any casing.
pub(crate) fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Per-column vote counter, consumed once per inferred field.
#[derive(Debug, Clone, Default)]
pub struct TypeTally {
    classified: usize,
    integer: usize,
    float: usize,
    boolean: usize,
    timestamp: usize,
    date: usize,
    unclassified: usize,
}

impl TypeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values that contributed votes (blanks and nulls excluded).
    pub fn classified(&self) -> usize {
        self.classified
    }

    pub fn record(&mut self, value: &str) {
        let trimmed = value.trim();
        if is_null_token(trimmed) {
            return;
        }
        self.classified += 1;

        let lowered = trimmed.to_ascii_lowercase();
        let mut matched = false;

        if BOOLEAN_TOKENS.contains(&lowered.as_str()) {
            self.boolean += 1;
            matched = true;
        }
        if INTEGER_PATTERN.is_match(trimmed) {
            self.integer += 1;
            matched = true;
        } else if FLOAT_PATTERN.is_match(trimmed) {
            self.float += 1;
            matched = true;
        } else if TIMESTAMP_PATTERN.is_match(trimmed) {
            self.timestamp += 1;
            matched = true;
        } else if DATE_PATTERN.is_match(trimmed) {
            self.date += 1;
            matched = true;
        }

        if !matched {
            self.unclassified += 1;
        }
    }

    fn clears_threshold(&self, votes: usize) -> bool {
        votes * 100 >= self.classified * WINNER_THRESHOLD_PERCENT
    }

    /// Picks the winning type: the first of INTEGER, FLOAT, BOOLEAN,
    /// TIMESTAMP, DATE to clear the threshold, otherwise STRING.
    pub fn decide(&self) -> FieldType {
        if self.classified == 0 {
            return FieldType::String;
        }
        let ranked = [
            (FieldType::Integer, self.integer),
            (FieldType::Float, self.float),
            (FieldType::Boolean, self.boolean),
            (FieldType::Timestamp, self.timestamp),
            (FieldType::Date, self.date),
        ];
        for (field_type, votes) in ranked {
            if self.clears_threshold(votes) {
                return field_type;
            }
        }
        FieldType::String
    }
}

/// Classifies a column from its sampled values in one call.
pub fn classify<I, S>(values: I) -> FieldType
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tally = TypeTally::new();
    for value in values {
        tally.record(value.as_ref());
    }
    tally.decide()
}
