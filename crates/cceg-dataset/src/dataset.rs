//! Dataset generation and persistence.
//!
//! [`DatasetGenerator`] drives the whole pipeline for each layer: build the
//! distribution plan, synthesize and project every index in parallel,
//! validate each record, then serialize the survivors in index order.
//! [`Dataset::write_to_dir`] persists the result as three JSONL files plus
//! the schema document.

use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::atomic_io::write_atomic;
use crate::distribution::{DistributionPlan, DistributionPolicy, LabelTally};
use crate::error::{
    ConfigurationError, GenerationError, RecordValidationError, SerializationError,
};
use crate::layer::{Layer, LayerRecord, project};
use crate::patterns::PatternCatalog;
use crate::request::GenerationRequest;
use crate::schema::{LayerSchema, schema_document};
use crate::serializer::serialize;
use crate::synthesizer::UnitSynthesizer;
use crate::unit::{ComplianceStatus, Severity};
use crate::validation::validate;
use crate::vocabulary::Vocabulary;

/// File name of the bundled schema document.
pub const SCHEMA_FILE_NAME: &str = "cceg.schema.json";

/// What to do with a synthesized record that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Fail the layer and report every rejected record.
    #[default]
    Abort,
    /// Exclude rejected records and report them alongside the output.
    Drop,
}

impl ValidationPolicy {
    /// Returns the configuration name of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "drop" => Ok(Self::Drop),
            _ => Err(ConfigurationError::UnknownValidationPolicy {
                value: value.to_owned(),
            }),
        }
    }
}

/// Policies applied during generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// How statuses and severities are assigned.
    pub distribution: DistributionPolicy,
    /// How invalid records are handled.
    pub validation: ValidationPolicy,
}

/// One serialized layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOutput {
    /// Layer the bytes belong to.
    pub layer: Layer,
    /// JSONL bytes, one record per line in index order.
    pub bytes: Vec<u8>,
    /// Number of records written.
    pub record_count: usize,
    /// Records excluded under [`ValidationPolicy::Drop`].
    pub rejected: Vec<RecordValidationError>,
    /// Statuses and severities of the written records. Only the execution
    /// layer carries these labels; other layers leave the tally empty.
    pub tally: LabelTally,
}

/// The generated dataset, held in memory until written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    layers: Vec<LayerOutput>,
    schema: Vec<u8>,
}

impl Dataset {
    /// Layer outputs in intent, execution, remediation order.
    #[must_use]
    pub fn layers(&self) -> &[LayerOutput] {
        &self.layers
    }

    /// Returns the output for `layer`.
    #[must_use]
    pub fn layer(&self, layer: Layer) -> Option<&LayerOutput> {
        self.layers.iter().find(|output| output.layer == layer)
    }

    /// Pretty-printed schema document bytes.
    #[must_use]
    pub fn schema_bytes(&self) -> &[u8] {
        &self.schema
    }

    /// Writes every layer file and the schema document into `dir`.
    ///
    /// Files are written one at a time, each atomically. The first failure
    /// stops the remaining writes; files already written stay intact.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::WriteError`] for the file that failed.
    pub fn write_to_dir(&self, dir: &Dir) -> Result<(), SerializationError> {
        for output in &self.layers {
            let path = Utf8Path::new(output.layer.file_name());
            write_atomic(dir, path, &output.bytes)?;
            info!(
                layer = %output.layer,
                file = %path,
                records = output.record_count,
                "wrote layer file"
            );
        }
        write_atomic(dir, Utf8Path::new(SCHEMA_FILE_NAME), &self.schema)?;
        info!(file = SCHEMA_FILE_NAME, "wrote schema document");
        Ok(())
    }
}

/// Creates `path` if needed and opens it as a capability directory.
///
/// # Errors
///
/// Returns [`SerializationError::WriteError`] if the directory cannot be
/// created or opened.
pub fn open_output_dir(path: &Utf8Path) -> Result<Dir, SerializationError> {
    let write_error = |err: std::io::Error| SerializationError::WriteError {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    Dir::create_ambient_dir_all(path, ambient_authority()).map_err(write_error)?;
    Dir::open_ambient_dir(path, ambient_authority()).map_err(write_error)
}

/// Generates dataset layers from the built-in catalogs.
///
/// # Example
///
/// ```
/// use cceg_dataset::{DatasetGenerator, GenerationOptions, Layer};
///
/// let generator = DatasetGenerator::new(GenerationOptions::default()).expect("catalogs");
/// let output = generator
///     .generate_layer(42, Layer::Execution, 5)
///     .expect("generation succeeds");
///
/// assert_eq!(output.record_count, 5);
/// assert!(output.bytes.starts_with(br#"{"record_id":"EXEC_000001""#));
/// ```
#[derive(Debug, Clone)]
pub struct DatasetGenerator {
    vocabulary: Vocabulary,
    patterns: PatternCatalog,
    options: GenerationOptions,
}

enum Checked {
    Accepted {
        record: LayerRecord,
        status: ComplianceStatus,
        severity: Severity,
    },
    Rejected(RecordValidationError),
}

impl DatasetGenerator {
    /// Loads the built-in catalogs and checks them against each other.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::CatalogIntegrity`] or
    /// [`GenerationError::Configuration`] if the catalogs are inconsistent.
    pub fn new(options: GenerationOptions) -> Result<Self, GenerationError> {
        Self::with_catalogs(Vocabulary::builtin(), PatternCatalog::builtin()?, options)
    }

    /// Uses the supplied catalogs after checking them.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`UnitSynthesizer::new`].
    pub fn with_catalogs(
        vocabulary: Vocabulary,
        patterns: PatternCatalog,
        options: GenerationOptions,
    ) -> Result<Self, GenerationError> {
        UnitSynthesizer::new(&vocabulary, &patterns)?;
        Ok(Self {
            vocabulary,
            patterns,
            options,
        })
    }

    /// Returns the generation options.
    #[must_use]
    pub const fn options(&self) -> GenerationOptions {
        self.options
    }

    /// Generates all three layers for `request`.
    ///
    /// # Errors
    ///
    /// Returns the first error any layer raises.
    pub fn generate(&self, request: &GenerationRequest) -> Result<Dataset, GenerationError> {
        let layers = Layer::ALL
            .into_iter()
            .map(|layer| self.generate_layer(request.seed(), layer, request.counts().get(layer)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut schema =
            serde_json::to_vec_pretty(&schema_document()).map_err(|err| {
                SerializationError::EncodeError {
                    record_id: SCHEMA_FILE_NAME.to_owned(),
                    message: err.to_string(),
                }
            })?;
        schema.push(b'\n');
        Ok(Dataset { layers, schema })
    }

    /// Generates `count` records for `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroCount`] when `count` is zero,
    /// [`GenerationError::RejectedRecords`] when records fail validation
    /// under [`ValidationPolicy::Abort`], and any synthesis or serialization
    /// error.
    pub fn generate_layer(
        &self,
        seed: u64,
        layer: Layer,
        count: usize,
    ) -> Result<LayerOutput, GenerationError> {
        if count == 0 {
            return Err(ConfigurationError::ZeroCount { layer }.into());
        }
        let synthesizer = UnitSynthesizer::new(&self.vocabulary, &self.patterns)?;
        let plan = DistributionPlan::new(self.options.distribution, seed, count)?;
        let schema = LayerSchema::with_vocabulary(layer, &self.vocabulary);

        let checked = (0..count)
            .into_par_iter()
            .map(|index| check_record(&synthesizer, &plan, &schema, seed, index, layer))
            .collect::<Result<Vec<_>, GenerationError>>()?;

        let mut records = Vec::with_capacity(count);
        let mut rejected = Vec::new();
        let mut tally = LabelTally::default();
        for outcome in checked {
            match outcome {
                Checked::Accepted {
                    record,
                    status,
                    severity,
                } => {
                    if layer.carries_labels() {
                        tally.record(status, severity);
                    }
                    records.push(record);
                }
                Checked::Rejected(error) => rejected.push(error),
            }
        }

        if !rejected.is_empty() {
            match self.options.validation {
                ValidationPolicy::Abort => {
                    warn!(layer = %layer, rejected = rejected.len(), "aborting layer");
                    return Err(GenerationError::RejectedRecords { layer, rejected });
                }
                ValidationPolicy::Drop => {
                    for error in &rejected {
                        warn!(
                            layer = %layer,
                            record_id = %error.record_id,
                            error = %error,
                            "dropping invalid record"
                        );
                    }
                }
            }
        }

        let record_count = records.len();
        let bytes = serialize(records, layer)?;
        info!(
            layer = %layer,
            seed,
            records = record_count,
            rejected = rejected.len(),
            policy = %plan.policy(),
            "generated layer"
        );
        Ok(LayerOutput {
            layer,
            bytes,
            record_count,
            rejected,
            tally,
        })
    }
}

fn check_record(
    synthesizer: &UnitSynthesizer<'_>,
    plan: &DistributionPlan,
    schema: &LayerSchema,
    seed: u64,
    index: usize,
    layer: Layer,
) -> Result<Checked, GenerationError> {
    let unit = synthesizer.synthesize(seed, index, plan)?;
    let record = project(&unit, layer);
    let value = serde_json::to_value(&record).map_err(|err| SerializationError::EncodeError {
        record_id: record.record_id().to_owned(),
        message: err.to_string(),
    })?;
    let violations = validate(&value, schema);
    if violations.is_empty() {
        Ok(Checked::Accepted {
            record,
            status: unit.compliance_state.status,
            severity: unit.labeling.severity,
        })
    } else {
        Ok(Checked::Rejected(RecordValidationError {
            layer,
            index,
            record_id: record.record_id().to_owned(),
            violations,
        }))
    }
}

#[cfg(test)]
mod tests {
    //! Covers layer generation, policies and the zero-count guard.

    use rstest::{fixture, rstest};

    use super::*;
    use crate::request::LayerCounts;

    #[fixture]
    fn generator() -> DatasetGenerator {
        DatasetGenerator::new(GenerationOptions::default()).expect("catalogs are consistent")
    }

    fn lines(bytes: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(bytes)
            .expect("utf-8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[rstest]
    #[case("abort", ValidationPolicy::Abort)]
    #[case("Drop", ValidationPolicy::Drop)]
    fn parses_validation_policy(#[case] name: &str, #[case] expected: ValidationPolicy) {
        assert_eq!(name.parse::<ValidationPolicy>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_validation_policy() {
        assert_eq!(
            "ignore".parse::<ValidationPolicy>(),
            Err(ConfigurationError::UnknownValidationPolicy {
                value: "ignore".to_owned()
            })
        );
    }

    #[rstest]
    fn zero_count_is_a_configuration_error(generator: DatasetGenerator) {
        assert_eq!(
            generator.generate_layer(42, Layer::Remediation, 0),
            Err(ConfigurationError::ZeroCount {
                layer: Layer::Remediation
            }
            .into())
        );
    }

    #[rstest]
    #[case(Layer::Intent, 0)]
    #[case(Layer::Execution, 25)]
    #[case(Layer::Remediation, 0)]
    fn layers_emit_every_requested_record(
        generator: DatasetGenerator,
        #[case] layer: Layer,
        #[case] tallied: usize,
    ) {
        let output = generator.generate_layer(7, layer, 25).expect("generation");
        assert_eq!(output.record_count, 25);
        assert!(output.rejected.is_empty());
        assert_eq!(output.tally.total(), tallied);
        assert_eq!(lines(&output.bytes).len(), 25);
    }

    #[rstest]
    fn quota_policy_hits_targets_exactly(generator: DatasetGenerator) {
        let output = generator
            .generate_layer(3, Layer::Execution, 100)
            .expect("generation");
        assert_eq!(output.tally.status_count(ComplianceStatus::Compliant), 15);
        assert_eq!(output.tally.status_count(ComplianceStatus::NonCompliant), 70);
        assert_eq!(
            output.tally.status_count(ComplianceStatus::PartiallyCompliant),
            15
        );
        assert_eq!(output.tally.severity_count(Severity::Low), 20);
        assert_eq!(output.tally.severity_count(Severity::Medium), 30);
        assert_eq!(output.tally.severity_count(Severity::High), 30);
        assert_eq!(output.tally.severity_count(Severity::Critical), 20);
    }

    #[rstest]
    fn generation_is_byte_identical_across_runs(generator: DatasetGenerator) {
        let request = GenerationRequest::new(
            11,
            LayerCounts {
                intent: 8,
                execution: 13,
                remediation: 5,
            },
        )
        .expect("valid request");
        let first = generator.generate(&request).expect("first run");
        let second = generator.generate(&request).expect("second run");
        assert_eq!(first, second);
        assert_eq!(first.layers().len(), 3);
    }

    #[rstest]
    fn schema_document_is_bundled(generator: DatasetGenerator) {
        let request = GenerationRequest::new(
            1,
            LayerCounts {
                intent: 1,
                execution: 1,
                remediation: 1,
            },
        )
        .expect("valid request");
        let dataset = generator.generate(&request).expect("generation");
        let schema: serde_json::Value =
            serde_json::from_slice(dataset.schema_bytes()).expect("schema json");
        assert!(schema.pointer("/definitions/intent").is_some());
        assert!(schema.pointer("/definitions/remediation").is_some());
    }
}
