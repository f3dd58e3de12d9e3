//! Deterministic Compliance Execution Unit synthesis.
//!
//! A unit is a pure function of `(seed, index)` plus the layer's
//! distribution plan. Categorical fields come from cyclic vocabulary lookups
//! keyed by the index; pattern-derived fields come from the pattern catalog;
//! everything else comes from the record's draw stream. The synthesizer holds
//! no mutable state, so distinct indices can be built on any thread in any
//! order.

use crate::distribution::DistributionPlan;
use crate::draw::RecordDraws;
use crate::error::GenerationError;
use crate::patterns::PatternCatalog;
use crate::unit::{
    AiTrainingSignals, CloudContext, ComplianceExecutionUnit, ComplianceState,
    ControlIntentVector, CostImpact, EvidenceModel, InfrastructurePattern, Labeling,
    RemediationLogic, StandardMappings, ViolationMechanics,
};
use crate::vocabulary::{CLOUD_PROVIDER, Vocabulary};

/// Builds units from validated catalogs.
#[derive(Debug, Clone, Copy)]
pub struct UnitSynthesizer<'a> {
    vocabulary: &'a Vocabulary,
    patterns: &'a PatternCatalog,
}

impl<'a> UnitSynthesizer<'a> {
    /// Checks the catalogs once and returns a synthesizer over them.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Configuration`] for an empty catalog and
    /// [`GenerationError::CatalogIntegrity`] when the vocabulary is
    /// misaligned or a pattern id has no catalog entry.
    pub fn new(
        vocabulary: &'a Vocabulary,
        patterns: &'a PatternCatalog,
    ) -> Result<Self, GenerationError> {
        vocabulary.check_integrity()?;
        patterns.check_complete(&vocabulary.pattern_ids)?;
        Ok(Self {
            vocabulary,
            patterns,
        })
    }

    /// Builds the unit at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Configuration`] when `index` is outside the
    /// plan, and [`GenerationError::CatalogIntegrity`] if a pattern id fails
    /// to resolve.
    pub fn synthesize(
        &self,
        seed: u64,
        index: usize,
        plan: &DistributionPlan,
    ) -> Result<ComplianceExecutionUnit, GenerationError> {
        let vocabulary = self.vocabulary;
        let draws = RecordDraws::draw(seed, index, vocabulary.ml_use_cases.elements())?;
        let (status, severity) = plan.labels(index, &draws)?;

        let control_family = *vocabulary.control_families.lookup(index)?;
        let objective = vocabulary.control_objectives.lookup(index)?;
        let service = vocabulary.cloud_services.lookup(index)?;
        let resource = vocabulary.resource_bindings.lookup(index)?;
        let pattern = self
            .patterns
            .resolve(vocabulary.pattern_ids.lookup(index)?)?;
        let strategy = pattern.remediation_strategy;

        Ok(ComplianceExecutionUnit {
            index,
            control_family,
            control_intent_vector: ControlIntentVector {
                objective: objective.name,
                asset_class: *vocabulary.asset_classes.lookup(index)?,
                risk_domain: *vocabulary.risk_domains.lookup(index)?,
            },
            standard_mappings: StandardMappings {
                nist_800_53: objective.nist_800_53,
                cis: objective.cis,
                iso_27001: objective.iso_27001,
            },
            cloud_context: CloudContext {
                provider: CLOUD_PROVIDER,
                service: service.name,
                resource_type: resource.resource_type,
                region: *vocabulary.regions.lookup(index)?,
            },
            infrastructure_pattern: InfrastructurePattern {
                pattern_id: pattern.pattern_id,
                pattern_class: pattern.pattern_class,
                pattern_complexity: pattern.base_complexity,
            },
            compliance_state: ComplianceState {
                status,
                confidence: draws.confidence,
            },
            violation_mechanics: ViolationMechanics {
                failure_mode: pattern.failure_mode,
                attack_surface: pattern.attack_surface,
                blast_radius_score: pattern.base_blast_radius,
            },
            evidence_model: EvidenceModel {
                terraform_signal: resource.terraform_signal,
                runtime_signal: service.runtime_signal,
                static_detectable: pattern.static_detectable(),
            },
            remediation_logic: RemediationLogic {
                strategy,
                automation_feasible: pattern.automation_feasible,
                estimated_fix_effort: pattern.estimated_fix_effort,
                implementation_steps: strategy.steps(),
                verification_checks: strategy.checks(),
                rollback_complexity: draws.rollback_complexity,
            },
            cost_impact: CostImpact {
                aws_cost_delta: draws.cost_delta,
                operational_overhead: draws.operational_overhead,
                risk_reduction_score: draws.risk_reduction,
            },
            ai_training_signals: AiTrainingSignals {
                can_autofix: pattern.can_autofix(),
                requires_approval: pattern.requires_approval(),
                context_complexity: draws.context_complexity,
            },
            labeling: Labeling {
                severity,
                ml_use_case: draws.ml_use_cases,
            },
        })
    }
}
