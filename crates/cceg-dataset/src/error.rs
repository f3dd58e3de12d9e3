//! Error types for the cceg-dataset crate.
//!
//! Each failure family gets its own semantic enum so callers can tell a bad
//! request apart from a broken catalog or a failed write. Everything funnels
//! into [`GenerationError`] for callers that only need to report.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::layer::Layer;
use crate::validation::Violation;

/// Errors raised for an invalid generation request or configuration.
///
/// These are fatal: generation never starts when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The generation request file could not be read.
    #[error("failed to read generation request at '{path}': {message}")]
    IoError {
        /// Path to the request file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The generation request JSON is malformed or has out-of-range values.
    #[error("invalid generation request JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// A layer was requested with a record count of zero.
    #[error("record count for the {layer} layer must be positive")]
    ZeroCount {
        /// Layer whose count was zero.
        layer: Layer,
    },

    /// A record count overflows the quota arithmetic.
    #[error("record count {count} is too large")]
    CountTooLarge {
        /// The offending count.
        count: usize,
    },

    /// A record index lies outside the requested range.
    #[error("record index {index} is outside the requested range of {count} records")]
    IndexOutOfRange {
        /// Index that was requested.
        index: usize,
        /// Number of records in the plan.
        count: usize,
    },

    /// A vocabulary catalog contains no elements.
    #[error("catalog '{catalog}' is empty")]
    EmptyCatalog {
        /// Name of the empty catalog.
        catalog: &'static str,
    },

    /// The distribution policy name is not recognised.
    #[error("unknown distribution policy '{value}' (expected quota-exact or expectation-only)")]
    UnknownDistributionPolicy {
        /// The rejected policy name.
        value: String,
    },

    /// The validation policy name is not recognised.
    #[error("unknown validation policy '{value}' (expected abort or drop)")]
    UnknownValidationPolicy {
        /// The rejected policy name.
        value: String,
    },

    /// Layered settings could not be loaded.
    #[error("failed to load settings: {message}")]
    Settings {
        /// Description of the loader failure.
        message: String,
    },

    /// A configured path is not valid UTF-8.
    #[error("path '{path}' is not valid UTF-8")]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}

/// Errors raised when the built-in catalogs disagree with each other.
///
/// These indicate a defect in the shipped tables and are never recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogIntegrityError {
    /// A pattern id emitted by the vocabulary has no catalog entry.
    #[error("pattern '{pattern_id}' has no pattern catalog entry")]
    MissingPattern {
        /// The unresolved pattern id.
        pattern_id: String,
    },

    /// Two catalog entries share a pattern id.
    #[error("pattern '{pattern_id}' is defined more than once")]
    DuplicatePattern {
        /// The duplicated pattern id.
        pattern_id: String,
    },

    /// A round-robin catalog entry is filed under the wrong parent.
    #[error("{catalog} entry {index} belongs to '{actual}' but position requires '{expected}'")]
    MisalignedEntry {
        /// Name of the misaligned catalog.
        catalog: &'static str,
        /// Position of the entry.
        index: usize,
        /// Parent required by the position.
        expected: &'static str,
        /// Parent declared by the entry.
        actual: &'static str,
    },
}

/// A synthesized record that failed schema validation.
///
/// Carries every violation found so callers can batch-report data quality
/// issues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{record_id} (index {index}) failed validation: {}", summarize(.violations))]
pub struct RecordValidationError {
    /// Layer the record was projected into.
    pub layer: Layer,
    /// Zero-based record index.
    pub index: usize,
    /// Identifier assigned to the record.
    pub record_id: String,
    /// Every violation found in the record.
    pub violations: Vec<Violation>,
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while encoding or persisting a layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    /// A file could not be written.
    #[error("failed to write '{path}': {message}")]
    WriteError {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// A record could not be encoded as JSON.
    #[error("failed to encode {record_id}: {message}")]
    EncodeError {
        /// Identifier of the record.
        record_id: String,
        /// Description of the encoder error.
        message: String,
    },

    /// Two records in one layer share an identifier.
    #[error("duplicate record id {record_id}")]
    DuplicateRecordId {
        /// The repeated identifier.
        record_id: String,
    },

    /// A record from another layer was handed to a layer stream.
    #[error("{record_id} does not belong to the {expected} layer")]
    LayerMismatch {
        /// Identifier of the stray record.
        record_id: String,
        /// Layer being serialized.
        expected: Layer,
    },
}

/// Umbrella error for dataset generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The request or configuration is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The built-in catalogs are inconsistent.
    #[error(transparent)]
    CatalogIntegrity(#[from] CatalogIntegrityError),

    /// Records failed validation under the abort policy.
    #[error(
        "{} {layer} record(s) failed validation; first: {}",
        .rejected.len(),
        first_rejection(.rejected)
    )]
    RejectedRecords {
        /// Layer being generated.
        layer: Layer,
        /// Every rejected record.
        rejected: Vec<RecordValidationError>,
    },

    /// Encoding or writing a layer failed.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

fn first_rejection(rejected: &[RecordValidationError]) -> String {
    rejected
        .first()
        .map_or_else(String::new, ToString::to_string)
}
