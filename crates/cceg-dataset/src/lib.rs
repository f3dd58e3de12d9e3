//! Deterministic synthesis of the Cloud Compliance Execution Graph dataset.
//!
//! Every record starts life as a Compliance Execution Unit: a complete
//! description of one control, the cloud resource it governs, the failure
//! pattern observed there and how to fix it. Units are pure functions of a
//! global seed and a record index, so the same request always produces the
//! same bytes, regardless of how many threads built them.
//!
//! Each unit is projected into one of three layers:
//!
//! - **Intent** (`INT_`): vendor-neutral control intent and standard mappings
//! - **Execution** (`EXEC_`): the AWS resource, pattern and compliance state
//! - **Remediation** (`REMED_`): the fix playbook, its cost and automation
//!   signals
//!
//! Projected records are checked against per-layer schemas before they are
//! serialized as JSONL.
//!
//! # Example
//!
//! ```
//! use cceg_dataset::{DatasetGenerator, GenerationOptions, GenerationRequest, Layer};
//!
//! let json = r#"{"seed": 42, "counts": {"intent": 3, "execution": 5, "remediation": 2}}"#;
//! let request = GenerationRequest::from_json(json).expect("valid request");
//!
//! let generator = DatasetGenerator::new(GenerationOptions::default()).expect("catalogs");
//! let dataset = generator.generate(&request).expect("generation succeeds");
//!
//! let execution = dataset.layer(Layer::Execution).expect("execution layer");
//! assert_eq!(execution.record_count, 5);
//! ```

mod atomic_io;
mod dataset;
mod distribution;
mod draw;
mod error;
mod layer;
mod patterns;
mod request;
mod schema;
mod serializer;
mod settings;
mod synthesizer;
mod unit;
mod validation;
mod vocabulary;

pub use dataset::{
    Dataset, DatasetGenerator, GenerationOptions, LayerOutput, SCHEMA_FILE_NAME,
    ValidationPolicy, open_output_dir,
};
pub use distribution::{
    DistributionPlan, DistributionPolicy, LabelTally, SEVERITY_TARGETS, STATUS_TARGETS,
    largest_remainder_quotas,
};
pub use draw::{DRAW_SCHEME_VERSION, DrawStream, QuotaLane, RecordDraws, round2};
pub use error::{
    CatalogIntegrityError, ConfigurationError, GenerationError, RecordValidationError,
    SerializationError,
};
pub use layer::{
    ExecutionRecord, IntentRecord, Layer, LayerRecord, ProblemPattern, RemediationRecord,
    VENDOR_NEUTRAL, project,
};
pub use patterns::{
    APPROVAL_BLAST_RADIUS, PATTERN_SPECS, PatternCatalog, PatternSpec, RemediationStrategy,
    STATIC_DETECTION_THRESHOLD,
};
pub use request::{GenerationRequest, LayerCounts};
pub use schema::{FieldRule, FieldSpec, JSON_SCHEMA_DIALECT, LayerSchema, schema_document};
pub use serializer::{record_id, serialize};
pub use settings::GeneratorSettings;
pub use synthesizer::UnitSynthesizer;
pub use unit::{
    AiTrainingSignals, CloudContext, ComplianceExecutionUnit, ComplianceState, ComplianceStatus,
    ControlIntentVector, CostImpact, EvidenceModel, FixEffort, InfrastructurePattern, Labeling,
    MlUseCase, PATTERN_CLASS_COUNT, PatternClass, RemediationLogic, Severity, StandardMappings,
    ViolationMechanics,
};
pub use validation::{
    FileReport, LineFailure, RECORD_ID_MIN_DIGITS, Violation, ViolationKind, validate,
    validate_jsonl,
};
pub use vocabulary::{
    ASSET_CLASS_COUNT, CLOUD_PROVIDER, CLOUD_SERVICE_COUNT, CONTROL_FAMILY_COUNT,
    CONTROL_OBJECTIVE_COUNT, Catalog, CloudService, ControlFamily, ControlObjective,
    ML_USE_CASE_COUNT, PATTERN_COUNT, REGION_COUNT, RESOURCE_BINDING_COUNT, RISK_DOMAIN_COUNT,
    ResourceBinding, Vocabulary,
};
