//! Layer views of a Compliance Execution Unit.
//!
//! The intent layer is vendor neutral: it carries the control family, the
//! intent vector, framework mappings and use-case tags, and nothing that
//! names a provider, service or resource. The execution layer carries the
//! cloud-specific evaluation. The remediation layer carries the fix, keyed
//! back to the pattern catalog by `problem_pattern.pattern_id`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigurationError;
use crate::serializer::record_id;
use crate::unit::{
    AiTrainingSignals, CloudContext, ComplianceExecutionUnit, ComplianceState,
    ControlIntentVector, CostImpact, EvidenceModel, InfrastructurePattern, Labeling, MlUseCase,
    PatternClass, RemediationLogic, StandardMappings, ViolationMechanics,
};
use crate::vocabulary::ControlFamily;

/// Abstraction level stamped on intent records.
pub const VENDOR_NEUTRAL: &str = "vendor_neutral";

/// One of the three projected views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Vendor-neutral control intent.
    Intent,
    /// Cloud-specific evaluation.
    Execution,
    /// Remediation reasoning.
    Remediation,
}

impl Layer {
    /// All layers in output order.
    pub const ALL: [Self; 3] = [Self::Intent, Self::Execution, Self::Remediation];

    /// Returns the lowercase layer name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Execution => "execution",
            Self::Remediation => "remediation",
        }
    }

    /// Returns the record id prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Intent => "INT",
            Self::Execution => "EXEC",
            Self::Remediation => "REMED",
        }
    }

    /// Returns the JSONL file name for the layer.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Intent => "cceg_intent.jsonl",
            Self::Execution => "cceg_execution.jsonl",
            Self::Remediation => "cceg_remediation.jsonl",
        }
    }

    /// Whether records of the layer emit a compliance status and severity.
    #[must_use]
    pub const fn carries_labels(self) -> bool {
        matches!(self, Self::Execution)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ConfigurationError::ParseError {
                message: format!("unknown layer '{value}'"),
            })
    }
}

/// Vendor-neutral view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRecord {
    #[serde(skip)]
    index: usize,
    /// Layer-prefixed identifier.
    pub record_id: String,
    /// Control family.
    pub control_family: ControlFamily,
    /// Intent triple.
    pub control_intent_vector: ControlIntentVector,
    /// Always [`VENDOR_NEUTRAL`].
    pub abstraction_level: &'static str,
    /// Framework references.
    pub standard_mappings: StandardMappings,
    /// Use-case tags.
    pub ml_use_case: Vec<MlUseCase>,
}

/// Cloud-specific view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    #[serde(skip)]
    index: usize,
    /// Layer-prefixed identifier.
    pub record_id: String,
    /// Control family.
    pub control_family: ControlFamily,
    /// Intent triple.
    pub control_intent_vector: ControlIntentVector,
    /// Cloud context.
    pub cloud_context: CloudContext,
    /// Observed pattern.
    pub infrastructure_pattern: InfrastructurePattern,
    /// Compliance status.
    pub compliance_state: ComplianceState,
    /// Violation mechanics.
    pub violation_mechanics: ViolationMechanics,
    /// Evidence signals.
    pub evidence_model: EvidenceModel,
    /// Labels.
    pub labeling: Labeling,
}

/// The pattern a remediation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProblemPattern {
    /// Pattern catalog key.
    pub pattern_id: &'static str,
    /// Pattern class.
    pub pattern_class: PatternClass,
    /// Failure mode.
    pub failure_mode: &'static str,
    /// Terraform resource type being fixed.
    pub affected_resource: &'static str,
}

/// Remediation view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationRecord {
    #[serde(skip)]
    index: usize,
    /// Layer-prefixed identifier.
    pub record_id: String,
    /// Back-reference to the pattern catalog.
    pub problem_pattern: ProblemPattern,
    /// Fix playbook.
    pub remediation_logic: RemediationLogic,
    /// Cost of the fix.
    pub cost_impact: CostImpact,
    /// Automation signals.
    pub ai_training_signals: AiTrainingSignals,
}

/// A projected record of any layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayerRecord {
    /// Intent view.
    Intent(IntentRecord),
    /// Execution view.
    Execution(ExecutionRecord),
    /// Remediation view.
    Remediation(RemediationRecord),
}

impl LayerRecord {
    /// Layer the record belongs to.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        match self {
            Self::Intent(_) => Layer::Intent,
            Self::Execution(_) => Layer::Execution,
            Self::Remediation(_) => Layer::Remediation,
        }
    }

    /// Zero-based index of the source unit.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Intent(record) => record.index,
            Self::Execution(record) => record.index,
            Self::Remediation(record) => record.index,
        }
    }

    /// Layer-prefixed identifier.
    #[must_use]
    pub fn record_id(&self) -> &str {
        match self {
            Self::Intent(record) => &record.record_id,
            Self::Execution(record) => &record.record_id,
            Self::Remediation(record) => &record.record_id,
        }
    }
}

/// Narrows a unit to one layer's view.
///
/// # Example
///
/// ```
/// use cceg_dataset::{Layer, LayerRecord, PatternCatalog, UnitSynthesizer, Vocabulary, project};
/// use cceg_dataset::{DistributionPlan, DistributionPolicy};
///
/// let vocabulary = Vocabulary::builtin();
/// let patterns = PatternCatalog::builtin().expect("unique ids");
/// let synthesizer = UnitSynthesizer::new(&vocabulary, &patterns).expect("consistent catalogs");
/// let plan = DistributionPlan::new(DistributionPolicy::QuotaExact, 42, 1).expect("plan");
/// let unit = synthesizer.synthesize(42, 0, &plan).expect("index in range");
///
/// let record = project(&unit, Layer::Intent);
/// assert_eq!(record.record_id(), "INT_000001");
/// assert!(matches!(record, LayerRecord::Intent(_)));
/// ```
#[must_use]
pub fn project(unit: &ComplianceExecutionUnit, layer: Layer) -> LayerRecord {
    let id = record_id(layer, unit.index);
    match layer {
        Layer::Intent => LayerRecord::Intent(IntentRecord {
            index: unit.index,
            record_id: id,
            control_family: unit.control_family,
            control_intent_vector: unit.control_intent_vector,
            abstraction_level: VENDOR_NEUTRAL,
            standard_mappings: unit.standard_mappings,
            ml_use_case: unit.labeling.ml_use_case.clone(),
        }),
        Layer::Execution => LayerRecord::Execution(ExecutionRecord {
            index: unit.index,
            record_id: id,
            control_family: unit.control_family,
            control_intent_vector: unit.control_intent_vector,
            cloud_context: unit.cloud_context,
            infrastructure_pattern: unit.infrastructure_pattern,
            compliance_state: unit.compliance_state,
            violation_mechanics: unit.violation_mechanics,
            evidence_model: unit.evidence_model,
            labeling: unit.labeling.clone(),
        }),
        Layer::Remediation => LayerRecord::Remediation(RemediationRecord {
            index: unit.index,
            record_id: id,
            problem_pattern: ProblemPattern {
                pattern_id: unit.infrastructure_pattern.pattern_id,
                pattern_class: unit.infrastructure_pattern.pattern_class,
                failure_mode: unit.violation_mechanics.failure_mode,
                affected_resource: unit.cloud_context.resource_type,
            },
            remediation_logic: unit.remediation_logic,
            cost_impact: unit.cost_impact,
            ai_training_signals: unit.ai_training_signals,
        }),
    }
}
