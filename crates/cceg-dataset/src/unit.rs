//! The Compliance Execution Unit and its field groups.
//!
//! A unit is the canonical record: every layer is a projection of one. Units
//! are built once per `(seed, index)` pair by the synthesizer and never
//! mutated afterwards. Categorical fields borrow `'static` catalog strings, so
//! a unit owns nothing but its scores and its use-case tags.

use serde::Serialize;

use crate::patterns::RemediationStrategy;
use crate::vocabulary::ControlFamily;

/// Number of infrastructure pattern classes.
pub const PATTERN_CLASS_COUNT: usize = 10;

/// Compliance status of an evaluated resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// The resource satisfies the control.
    Compliant,
    /// The resource violates the control.
    NonCompliant,
    /// The resource satisfies part of the control.
    PartiallyCompliant,
}

impl ComplianceStatus {
    /// All statuses in catalog order.
    pub const ALL: [Self; 3] = [Self::Compliant, Self::NonCompliant, Self::PartiallyCompliant];

    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non_compliant",
            Self::PartiallyCompliant => "partially_compliant",
        }
    }
}

/// Severity label attached to an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical severity.
    Critical,
}

impl Severity {
    /// All severities in catalog order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Estimated effort to apply a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixEffort {
    /// A configuration toggle.
    Low,
    /// A scoped change with some coordination.
    Medium,
    /// A redesign or cross-team change.
    High,
}

impl FixEffort {
    /// All efforts in catalog order.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Machine-learning task a record is labelled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MlUseCase {
    /// Classifying configurations against policy.
    PolicyClassification,
    /// Scoring risk.
    RiskScoring,
    /// Proposing automatic fixes.
    AutoRemediation,
    /// Spotting unusual behaviour.
    AnomalyDetection,
}

impl MlUseCase {
    /// All use cases in catalog order.
    pub const ALL: [Self; 4] = [
        Self::PolicyClassification,
        Self::RiskScoring,
        Self::AutoRemediation,
        Self::AnomalyDetection,
    ];

    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyClassification => "policy_classification",
            Self::RiskScoring => "risk_scoring",
            Self::AutoRemediation => "auto_remediation",
            Self::AnomalyDetection => "anomaly_detection",
        }
    }
}

/// Class of infrastructure misconfiguration.
///
/// Declared in the same order as the cloud service catalog so that the class
/// at position `j` is meaningful for the service at position `j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternClass {
    /// Trust relationships between principals.
    IdentityTrust,
    /// Network reachability.
    NetworkExposure,
    /// Encryption at rest.
    DataEncryption,
    /// Audit trail coverage.
    LoggingGap,
    /// Key lifecycle.
    KeyRotation,
    /// Backup and snapshot handling.
    BackupConfig,
    /// Permission scoping.
    PermissionBoundary,
    /// Resource-based policies.
    ResourcePolicy,
    /// Alerting and log retention.
    MonitoringGap,
    /// Container platform hardening.
    ContainerHardening,
}

impl PatternClass {
    /// All classes in catalog order.
    pub const ALL: [Self; PATTERN_CLASS_COUNT] = [
        Self::IdentityTrust,
        Self::NetworkExposure,
        Self::DataEncryption,
        Self::LoggingGap,
        Self::KeyRotation,
        Self::BackupConfig,
        Self::PermissionBoundary,
        Self::ResourcePolicy,
        Self::MonitoringGap,
        Self::ContainerHardening,
    ];

    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdentityTrust => "identity_trust",
            Self::NetworkExposure => "network_exposure",
            Self::DataEncryption => "data_encryption",
            Self::LoggingGap => "logging_gap",
            Self::KeyRotation => "key_rotation",
            Self::BackupConfig => "backup_config",
            Self::PermissionBoundary => "permission_boundary",
            Self::ResourcePolicy => "resource_policy",
            Self::MonitoringGap => "monitoring_gap",
            Self::ContainerHardening => "container_hardening",
        }
    }
}

/// What a control is trying to achieve, independent of any vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlIntentVector {
    /// Control objective.
    pub objective: &'static str,
    /// Asset class the control protects.
    pub asset_class: &'static str,
    /// Risk the control mitigates.
    pub risk_domain: &'static str,
}

/// Framework cross-references for the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StandardMappings {
    /// NIST SP 800-53 control.
    pub nist_800_53: &'static str,
    /// CIS Controls v8 safeguard.
    pub cis: &'static str,
    /// ISO/IEC 27001:2022 Annex A control.
    pub iso_27001: &'static str,
}

/// Where the control executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CloudContext {
    /// Cloud provider.
    pub provider: &'static str,
    /// Cloud service.
    pub service: &'static str,
    /// Terraform resource type.
    pub resource_type: &'static str,
    /// Deployment region.
    pub region: &'static str,
}

/// The misconfiguration pattern observed on the resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InfrastructurePattern {
    /// Pattern catalog key.
    pub pattern_id: &'static str,
    /// Pattern class.
    pub pattern_class: PatternClass,
    /// Detection difficulty in `[0, 1]`.
    pub pattern_complexity: f64,
}

/// Evaluated compliance status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplianceState {
    /// Status label.
    pub status: ComplianceStatus,
    /// Evaluator confidence in `[0, 1]`.
    pub confidence: f64,
}

/// How the violation can be exploited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViolationMechanics {
    /// Failure mode from the pattern catalog.
    pub failure_mode: &'static str,
    /// Attack surface from the pattern catalog.
    pub attack_surface: &'static str,
    /// Normalized impact scope in `[0, 1]`.
    pub blast_radius_score: f64,
}

/// Signals that evidence the violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvidenceModel {
    /// Terraform attribute inspected statically.
    pub terraform_signal: &'static str,
    /// API call observed at runtime.
    pub runtime_signal: &'static str,
    /// Whether static analysis alone detects the pattern.
    pub static_detectable: bool,
}

/// How to fix the violation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RemediationLogic {
    /// Strategy from the pattern catalog.
    pub strategy: RemediationStrategy,
    /// Whether the fix can be automated.
    pub automation_feasible: bool,
    /// Estimated effort.
    pub estimated_fix_effort: FixEffort,
    /// Ordered playbook steps.
    pub implementation_steps: &'static [&'static str],
    /// Checks confirming the fix.
    pub verification_checks: &'static [&'static str],
    /// Difficulty of reverting the fix in `[0, 1]`.
    pub rollback_complexity: f64,
}

/// Cost and impact of applying the fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostImpact {
    /// Monthly cost change in USD.
    pub aws_cost_delta: f64,
    /// Ongoing operational burden in `[0, 1]`.
    pub operational_overhead: f64,
    /// Risk removed by the fix in `[0, 1]`.
    pub risk_reduction_score: f64,
}

/// Labels for training remediation models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AiTrainingSignals {
    /// Whether an agent may apply the fix unattended.
    pub can_autofix: bool,
    /// Whether a human must sign off.
    pub requires_approval: bool,
    /// Reasoning difficulty in `[0, 1]`.
    pub context_complexity: f64,
}

/// Supervised-learning labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labeling {
    /// Severity label.
    pub severity: Severity,
    /// Non-empty, duplicate-free use-case tags in catalog order.
    pub ml_use_case: Vec<MlUseCase>,
}

/// A fully populated synthetic record prior to layer projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceExecutionUnit {
    /// Zero-based position in the generated layer.
    pub index: usize,
    /// Control family.
    pub control_family: ControlFamily,
    /// Vendor-neutral intent.
    pub control_intent_vector: ControlIntentVector,
    /// Framework references for the objective.
    pub standard_mappings: StandardMappings,
    /// Cloud execution context.
    pub cloud_context: CloudContext,
    /// Observed pattern.
    pub infrastructure_pattern: InfrastructurePattern,
    /// Compliance status.
    pub compliance_state: ComplianceState,
    /// Violation mechanics.
    pub violation_mechanics: ViolationMechanics,
    /// Evidence signals.
    pub evidence_model: EvidenceModel,
    /// Remediation playbook.
    pub remediation_logic: RemediationLogic,
    /// Cost of remediation.
    pub cost_impact: CostImpact,
    /// Automation signals.
    pub ai_training_signals: AiTrainingSignals,
    /// Labels.
    pub labeling: Labeling,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ComplianceStatus::NonCompliant, "\"non_compliant\"")]
    #[case(ComplianceStatus::PartiallyCompliant, "\"partially_compliant\"")]
    fn status_serializes_snake_case(#[case] status: ComplianceStatus, #[case] expected: &str) {
        assert_eq!(serde_json::to_string(&status).expect("serialize"), expected);
    }

    #[test]
    fn as_str_matches_serialized_labels() {
        for class in PatternClass::ALL {
            let json = serde_json::to_string(&class).expect("serialize");
            assert_eq!(json, format!("\"{}\"", class.as_str()));
        }
        for severity in Severity::ALL {
            let json = serde_json::to_string(&severity).expect("serialize");
            assert_eq!(json, format!("\"{}\"", severity.as_str()));
        }
        for use_case in MlUseCase::ALL {
            let json = serde_json::to_string(&use_case).expect("serialize");
            assert_eq!(json, format!("\"{}\"", use_case.as_str()));
        }
    }

    #[test]
    fn labeling_serializes_tags_as_array() {
        let labeling = Labeling {
            severity: Severity::High,
            ml_use_case: vec![MlUseCase::RiskScoring, MlUseCase::AnomalyDetection],
        };
        let json = serde_json::to_string(&labeling).expect("serialize");
        assert_eq!(
            json,
            r#"{"severity":"high","ml_use_case":["risk_scoring","anomaly_detection"]}"#
        );
    }
}
