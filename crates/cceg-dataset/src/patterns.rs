//! The pattern catalog: the cross-layer join table.
//!
//! Every pattern id the vocabulary can emit maps to exactly one
//! [`PatternSpec`]. Execution and remediation records both read their
//! pattern-derived fields from here, so records sharing a pattern id always
//! agree on class, failure mode, strategy and effort. Completeness is checked
//! once before generation; there is no fallback entry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CatalogIntegrityError;
use crate::unit::FixEffort::{self, High, Low, Medium};
use crate::unit::PatternClass as C;
use crate::unit::{PATTERN_CLASS_COUNT, PatternClass};
use crate::vocabulary::Catalog;
use RemediationStrategy as S;

/// Complexity at or above which a pattern needs runtime evidence.
pub const STATIC_DETECTION_THRESHOLD: f64 = 0.75;

/// Blast radius at or above which a fix needs human approval.
pub const APPROVAL_BLAST_RADIUS: f64 = 0.70;

/// Closed set of remediation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStrategy {
    /// Narrow who may assume a role.
    TrustPolicyConstraint,
    /// Tighten ingress and egress rules.
    NetworkRestriction,
    /// Turn on audit or flow logging.
    LoggingEnablement,
    /// Turn on encryption at rest.
    EncryptionEnablement,
    /// Rotate key material on a schedule.
    KeyRotation,
    /// Scope permissions down to what is used.
    PermissionReduction,
    /// Configure backup retention.
    BackupConfiguration,
    /// Remove public or cross-account exposure.
    ResourceIsolation,
    /// Add alarms and retention.
    MonitoringEnablement,
}

impl RemediationStrategy {
    /// All strategies in declaration order.
    pub const ALL: [Self; 9] = [
        Self::TrustPolicyConstraint,
        Self::NetworkRestriction,
        Self::LoggingEnablement,
        Self::EncryptionEnablement,
        Self::KeyRotation,
        Self::PermissionReduction,
        Self::BackupConfiguration,
        Self::ResourceIsolation,
        Self::MonitoringEnablement,
    ];

    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrustPolicyConstraint => "trust_policy_constraint",
            Self::NetworkRestriction => "network_restriction",
            Self::LoggingEnablement => "logging_enablement",
            Self::EncryptionEnablement => "encryption_enablement",
            Self::KeyRotation => "key_rotation",
            Self::PermissionReduction => "permission_reduction",
            Self::BackupConfiguration => "backup_configuration",
            Self::ResourceIsolation => "resource_isolation",
            Self::MonitoringEnablement => "monitoring_enablement",
        }
    }

    /// Ordered implementation steps for the strategy.
    #[must_use]
    pub const fn steps(self) -> &'static [&'static str] {
        match self {
            Self::TrustPolicyConstraint => &[
                "Identify trust policy document",
                "Remove wildcard principals",
                "Add specific account constraints",
                "Apply updated policy",
            ],
            Self::NetworkRestriction => &[
                "Inventory ingress rules open to 0.0.0.0/0",
                "Replace open CIDRs with approved ranges",
                "Move public endpoints behind a load balancer",
                "Apply updated rules",
            ],
            Self::LoggingEnablement => &[
                "Create a dedicated log destination",
                "Enable logging on the resource",
                "Extend coverage to all regions",
                "Enable log file validation",
            ],
            Self::EncryptionEnablement => &[
                "Enable encryption at rest",
                "Configure KMS key",
                "Update resource policy",
                "Verify encryption status",
            ],
            Self::KeyRotation => &[
                "Enable automatic key rotation",
                "Re-encrypt data keys under the rotated key",
                "Schedule rotation review",
            ],
            Self::PermissionReduction => &[
                "Collect access activity for the principal",
                "Replace wildcard actions with used actions",
                "Attach a permissions boundary",
                "Apply updated policy",
            ],
            Self::BackupConfiguration => &[
                "Set a backup retention period",
                "Enable automated snapshots",
                "Copy snapshots to a second region",
            ],
            Self::ResourceIsolation => &[
                "Identify public or cross-account grants",
                "Remove public access",
                "Restrict sharing to approved accounts",
                "Apply updated policy",
            ],
            Self::MonitoringEnablement => &[
                "Define metric filters for security events",
                "Create alarms with notification targets",
                "Raise log retention to the required period",
            ],
        }
    }

    /// Checks confirming the strategy was applied.
    #[must_use]
    pub const fn checks(self) -> &'static [&'static str] {
        match self {
            Self::TrustPolicyConstraint => &[
                "Trust policy allows only required principals",
                "No wildcards in account IDs",
                "Conditions are properly scoped",
            ],
            Self::NetworkRestriction => &[
                "No ingress rule allows 0.0.0.0/0",
                "Endpoint is unreachable from the internet",
            ],
            Self::LoggingEnablement => &[
                "Logging status shows enabled",
                "Log delivery is current",
                "All regions are covered",
            ],
            Self::EncryptionEnablement => &[
                "Encryption status shows enabled",
                "KMS key is customer managed",
                "No unencrypted data access logs",
            ],
            Self::KeyRotation => &[
                "Rotation status shows enabled",
                "Key age is within the rotation period",
            ],
            Self::PermissionReduction => &[
                "Policy contains no wildcard actions",
                "Access analyzer reports no unused permissions",
            ],
            Self::BackupConfiguration => &[
                "Retention period meets policy",
                "Latest snapshot is within the recovery point objective",
            ],
            Self::ResourceIsolation => &[
                "Resource is not publicly accessible",
                "Only approved accounts have access",
            ],
            Self::MonitoringEnablement => &[
                "Alarms exist for security events",
                "Alarm actions reach an on-call target",
                "Log retention meets policy",
            ],
        }
    }
}

/// A pattern catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSpec {
    /// Pattern id, `PAT_<CLASS>_<n>`.
    pub pattern_id: &'static str,
    /// Pattern class.
    pub pattern_class: PatternClass,
    /// Base detection difficulty.
    pub base_complexity: f64,
    /// Failure mode.
    pub failure_mode: &'static str,
    /// Attack surface.
    pub attack_surface: &'static str,
    /// Base blast radius.
    pub base_blast_radius: f64,
    /// Remediation strategy.
    pub remediation_strategy: RemediationStrategy,
    /// Whether the fix can be automated.
    pub automation_feasible: bool,
    /// Estimated fix effort.
    pub estimated_fix_effort: FixEffort,
}

impl PatternSpec {
    /// Whether static analysis alone detects the pattern.
    #[must_use]
    pub const fn static_detectable(&self) -> bool {
        self.base_complexity < STATIC_DETECTION_THRESHOLD
    }

    /// Whether an agent may apply the fix unattended.
    #[must_use]
    pub fn can_autofix(&self) -> bool {
        self.automation_feasible && self.estimated_fix_effort != FixEffort::High
    }

    /// Whether the fix needs human sign-off.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.base_blast_radius >= APPROVAL_BLAST_RADIUS
            || self.estimated_fix_effort == FixEffort::High
    }
}

#[expect(
    clippy::too_many_arguments,
    reason = "table constructor mirrors the catalog columns"
)]
const fn spec(
    pattern_id: &'static str,
    pattern_class: PatternClass,
    base_complexity: f64,
    failure_mode: &'static str,
    attack_surface: &'static str,
    base_blast_radius: f64,
    remediation_strategy: RemediationStrategy,
    automation_feasible: bool,
    estimated_fix_effort: FixEffort,
) -> PatternSpec {
    PatternSpec {
        pattern_id,
        pattern_class,
        base_complexity,
        failure_mode,
        attack_surface,
        base_blast_radius,
        remediation_strategy,
        automation_feasible,
        estimated_fix_effort,
    }
}

/// The built-in pattern entries.
#[rustfmt::skip]
pub static PATTERN_SPECS: [PatternSpec; 20] = [
    spec("PAT_IDENTITY_TRUST_101", C::IdentityTrust, 0.62, "overly_permissive_trust_policy", "cross_account_assume_role", 0.85, S::TrustPolicyConstraint, true, Medium),
    spec("PAT_NETWORK_EXPOSURE_101", C::NetworkExposure, 0.38, "unrestricted_network_acl_ingress", "internet_facing_endpoint", 0.75, S::NetworkRestriction, true, Low),
    spec("PAT_DATA_ENCRYPTION_101", C::DataEncryption, 0.35, "encryption_disabled", "unencrypted_data_access", 0.70, S::EncryptionEnablement, true, Medium),
    spec("PAT_LOGGING_GAP_101", C::LoggingGap, 0.30, "trail_logging_disabled", "unaudited_activity", 0.60, S::LoggingEnablement, true, Low),
    spec("PAT_KEY_ROTATION_101", C::KeyRotation, 0.42, "key_rotation_disabled", "stale_cryptographic_material", 0.55, S::KeyRotation, true, Low),
    spec("PAT_BACKUP_CONFIG_101", C::BackupConfig, 0.45, "backup_retention_disabled", "unrecoverable_data_loss", 0.65, S::BackupConfiguration, true, Low),
    spec("PAT_PERMISSION_BOUNDARY_101", C::PermissionBoundary, 0.68, "wildcard_action_policy", "privilege_escalation_path", 0.80, S::PermissionReduction, false, Medium),
    spec("PAT_RESOURCE_POLICY_101", C::ResourcePolicy, 0.40, "public_bucket_policy", "public_data_access", 0.95, S::ResourceIsolation, true, Low),
    spec("PAT_MONITORING_GAP_101", C::MonitoringGap, 0.33, "missing_metric_alarm", "undetected_anomaly", 0.40, S::MonitoringEnablement, true, Low),
    spec("PAT_CONTAINER_HARDENING_101", C::ContainerHardening, 0.74, "public_cluster_endpoint", "internet_facing_endpoint", 0.85, S::NetworkRestriction, true, Medium),
    spec("PAT_IDENTITY_TRUST_102", C::IdentityTrust, 0.81, "external_principal_allowed", "cross_account_assume_role", 0.90, S::TrustPolicyConstraint, false, High),
    spec("PAT_NETWORK_EXPOSURE_102", C::NetworkExposure, 0.58, "no_flow_logs", "unmonitored_network_path", 0.55, S::LoggingEnablement, true, Low),
    spec("PAT_DATA_ENCRYPTION_102", C::DataEncryption, 0.78, "customer_key_not_used", "unencrypted_data_access", 0.50, S::EncryptionEnablement, false, Medium),
    spec("PAT_LOGGING_GAP_102", C::LoggingGap, 0.66, "single_region_trail", "unaudited_activity", 0.45, S::LoggingEnablement, true, Low),
    spec("PAT_KEY_ROTATION_102", C::KeyRotation, 0.84, "key_policy_wildcard_principal", "key_policy_abuse", 0.88, S::PermissionReduction, false, High),
    spec("PAT_BACKUP_CONFIG_102", C::BackupConfig, 0.72, "public_snapshot_shared", "public_snapshot_access", 0.92, S::ResourceIsolation, true, Medium),
    spec("PAT_PERMISSION_BOUNDARY_102", C::PermissionBoundary, 0.88, "public_function_url", "internet_facing_endpoint", 0.70, S::ResourceIsolation, true, Medium),
    spec("PAT_RESOURCE_POLICY_102", C::ResourcePolicy, 0.77, "cross_account_write_access", "cross_account_data_access", 0.80, S::PermissionReduction, false, High),
    spec("PAT_MONITORING_GAP_102", C::MonitoringGap, 0.55, "short_log_retention", "evidence_loss", 0.35, S::MonitoringEnablement, true, Low),
    spec("PAT_CONTAINER_HARDENING_102", C::ContainerHardening, 0.92, "control_plane_logging_disabled", "unaudited_activity", 0.60, S::LoggingEnablement, true, Medium),
];

/// Read-only map from pattern id to its entry.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    entries: BTreeMap<&'static str, PatternSpec>,
}

impl PatternCatalog {
    /// Builds the catalog from the built-in entries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogIntegrityError::DuplicatePattern`] if two built-in
    /// entries share an id.
    pub fn builtin() -> Result<Self, CatalogIntegrityError> {
        Self::from_specs(&PATTERN_SPECS)
    }

    /// Builds a catalog from arbitrary entries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogIntegrityError::DuplicatePattern`] if two entries
    /// share an id.
    pub fn from_specs(specs: &[PatternSpec]) -> Result<Self, CatalogIntegrityError> {
        let mut entries = BTreeMap::new();
        for spec in specs {
            if entries.insert(spec.pattern_id, *spec).is_some() {
                return Err(CatalogIntegrityError::DuplicatePattern {
                    pattern_id: spec.pattern_id.to_owned(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every id in `pattern_ids` has an entry and that id `j`
    /// carries pattern class `j mod` [`PATTERN_CLASS_COUNT`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogIntegrityError::MissingPattern`] for the first id
    /// without an entry and [`CatalogIntegrityError::MisalignedEntry`] for
    /// the first id whose class breaks the round-robin order.
    pub fn check_complete(
        &self,
        pattern_ids: &Catalog<&'static str>,
    ) -> Result<(), CatalogIntegrityError> {
        for (index, id) in pattern_ids.elements().iter().enumerate() {
            let spec = self.resolve(id)?;
            let expected = index
                .checked_rem(PATTERN_CLASS_COUNT)
                .and_then(|slot| PatternClass::ALL.get(slot));
            if let Some(expected) = expected.filter(|class| **class != spec.pattern_class) {
                return Err(CatalogIntegrityError::MisalignedEntry {
                    catalog: pattern_ids.name(),
                    index,
                    expected: expected.as_str(),
                    actual: spec.pattern_class.as_str(),
                });
            }
        }
        Ok(())
    }

    /// Resolves a pattern id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogIntegrityError::MissingPattern`] when the id has no
    /// entry.
    pub fn resolve(&self, pattern_id: &str) -> Result<&PatternSpec, CatalogIntegrityError> {
        self.entries
            .get(pattern_id)
            .ok_or_else(|| CatalogIntegrityError::MissingPattern {
                pattern_id: pattern_id.to_owned(),
            })
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternSpec> {
        self.entries.values()
    }
}
