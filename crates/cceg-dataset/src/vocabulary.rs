//! Fixed, ordered catalogs of domain vocabulary.
//!
//! Every catalog is a `'static` slice with a documented size. Lookups cycle
//! through a catalog by index, so iterating `0..len` visits every element
//! exactly once and larger indices wrap deterministically. Downstream code
//! assumes these sizes; changing one changes every generated dataset.
//!
//! Two catalogs are laid out round-robin against a parent catalog:
//! objectives against control families and resource bindings against cloud
//! services. Entry `j` of the child always belongs to parent `j mod parent
//! size`, which keeps a record's objective consistent with its family and its
//! resource type consistent with its service. Pattern ids follow the same
//! layout against pattern classes; that alignment is checked by
//! [`PatternCatalog::check_complete`](crate::PatternCatalog::check_complete),
//! which knows each id's class.

use serde::Serialize;

use crate::error::{CatalogIntegrityError, ConfigurationError, GenerationError};
use crate::unit::MlUseCase;

/// Number of control families.
pub const CONTROL_FAMILY_COUNT: usize = 8;
/// Number of control objectives (three per family).
pub const CONTROL_OBJECTIVE_COUNT: usize = 24;
/// Number of asset classes.
pub const ASSET_CLASS_COUNT: usize = 6;
/// Number of risk domains.
pub const RISK_DOMAIN_COUNT: usize = 9;
/// Number of cloud services.
pub const CLOUD_SERVICE_COUNT: usize = 10;
/// Number of resource bindings (three per service).
pub const RESOURCE_BINDING_COUNT: usize = 30;
/// Number of cloud regions.
pub const REGION_COUNT: usize = 7;
/// Number of infrastructure pattern ids.
pub const PATTERN_COUNT: usize = 20;
/// Number of ML use-case tags.
pub const ML_USE_CASE_COUNT: usize = 4;

/// Cloud provider stamped on every execution record.
pub const CLOUD_PROVIDER: &str = "aws";

/// A named, ordered catalog with cyclic lookup.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<T: 'static> {
    name: &'static str,
    elements: &'static [T],
}

impl<T> Catalog<T> {
    /// Wraps a static slice as a catalog.
    #[must_use]
    pub const fn new(name: &'static str, elements: &'static [T]) -> Self {
        Self { name, elements }
    }

    /// Returns the catalog name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` when the catalog holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the elements in catalog order.
    #[must_use]
    pub const fn elements(&self) -> &'static [T] {
        self.elements
    }

    /// Returns `elements[index mod len]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyCatalog`] when the catalog is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use cceg_dataset::Catalog;
    ///
    /// static REGIONS: [&str; 2] = ["us-east-1", "eu-west-1"];
    /// let catalog = Catalog::new("regions", &REGIONS);
    ///
    /// assert_eq!(catalog.lookup(3).expect("non-empty"), &"eu-west-1");
    /// ```
    pub fn lookup(&self, index: usize) -> Result<&'static T, ConfigurationError> {
        index
            .checked_rem(self.elements.len())
            .and_then(|slot| self.elements.get(slot))
            .ok_or(ConfigurationError::EmptyCatalog { catalog: self.name })
    }
}

/// NIST SP 800-53 control family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlFamily {
    /// Access control.
    Ac,
    /// Audit and accountability.
    Au,
    /// Configuration management.
    Cm,
    /// Identification and authentication.
    Ia,
    /// System and communications protection.
    Sc,
    /// System and information integrity.
    Si,
    /// Risk assessment.
    Ra,
    /// Planning.
    Pl,
}

impl ControlFamily {
    /// All families in catalog order.
    pub const ALL: [Self; CONTROL_FAMILY_COUNT] = [
        Self::Ac,
        Self::Au,
        Self::Cm,
        Self::Ia,
        Self::Sc,
        Self::Si,
        Self::Ra,
        Self::Pl,
    ];

    /// Returns the two-letter family code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Au => "AU",
            Self::Cm => "CM",
            Self::Ia => "IA",
            Self::Sc => "SC",
            Self::Si => "SI",
            Self::Ra => "RA",
            Self::Pl => "PL",
        }
    }
}

/// A control objective with its framework cross-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlObjective {
    /// Family the objective belongs to.
    pub family: ControlFamily,
    /// Objective identifier.
    pub name: &'static str,
    /// NIST SP 800-53 control.
    pub nist_800_53: &'static str,
    /// CIS Controls v8 safeguard.
    pub cis: &'static str,
    /// ISO/IEC 27001:2022 Annex A control.
    pub iso_27001: &'static str,
}

/// A cloud service with its runtime evidence signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloudService {
    /// Service short name.
    pub name: &'static str,
    /// API call that evidences the service's behaviour at runtime.
    pub runtime_signal: &'static str,
}

/// A Terraform resource type bound to its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBinding {
    /// Owning service.
    pub service: &'static str,
    /// Terraform resource type.
    pub resource_type: &'static str,
    /// Terraform attribute that evidences the violation statically.
    pub terraform_signal: &'static str,
}

const fn objective(
    family: ControlFamily,
    name: &'static str,
    nist_800_53: &'static str,
    cis: &'static str,
    iso_27001: &'static str,
) -> ControlObjective {
    ControlObjective {
        family,
        name,
        nist_800_53,
        cis,
        iso_27001,
    }
}

const fn binding(
    service: &'static str,
    resource_type: &'static str,
    terraform_signal: &'static str,
) -> ResourceBinding {
    ResourceBinding {
        service,
        resource_type,
        terraform_signal,
    }
}

static CONTROL_OBJECTIVES: [ControlObjective; CONTROL_OBJECTIVE_COUNT] = [
    objective(ControlFamily::Ac, "access_restriction", "AC-3", "6.8", "A.5.15"),
    objective(ControlFamily::Au, "audit_logging", "AU-2", "8.2", "A.8.15"),
    objective(ControlFamily::Cm, "config_management", "CM-6", "4.1", "A.8.9"),
    objective(ControlFamily::Ia, "identification", "IA-2", "5.1", "A.5.16"),
    objective(ControlFamily::Sc, "system_protection", "SC-3", "4.4", "A.8.20"),
    objective(ControlFamily::Si, "system_integrity", "SI-7", "2.5", "A.8.7"),
    objective(ControlFamily::Ra, "risk_assessment", "RA-3", "7.1", "A.5.7"),
    objective(ControlFamily::Pl, "planning", "PL-2", "4.1", "A.5.1"),
    objective(ControlFamily::Ac, "least_privilege", "AC-6", "5.4", "A.8.2"),
    objective(ControlFamily::Au, "log_integrity", "AU-9", "8.3", "A.8.15"),
    objective(ControlFamily::Cm, "change_control", "CM-3", "4.2", "A.8.32"),
    objective(ControlFamily::Ia, "authentication", "IA-5", "6.3", "A.8.5"),
    objective(ControlFamily::Sc, "boundary_defense", "SC-7", "13.4", "A.8.20"),
    objective(ControlFamily::Si, "malware_protection", "SI-3", "10.1", "A.8.7"),
    objective(ControlFamily::Ra, "vulnerability_assessment", "RA-5", "7.5", "A.8.8"),
    objective(ControlFamily::Pl, "policy_development", "PL-1", "4.1", "A.5.1"),
    objective(ControlFamily::Ac, "separation_duties", "AC-5", "6.8", "A.5.3"),
    objective(ControlFamily::Au, "log_retention", "AU-11", "8.10", "A.8.15"),
    objective(ControlFamily::Cm, "baseline_config", "CM-2", "4.1", "A.8.9"),
    objective(ControlFamily::Ia, "authorization", "IA-8", "6.1", "A.5.18"),
    objective(ControlFamily::Sc, "encryption", "SC-28", "3.11", "A.8.24"),
    objective(ControlFamily::Si, "vulnerability_scan", "SI-2", "7.4", "A.8.8"),
    objective(ControlFamily::Ra, "threat_modeling", "RA-3", "16.14", "A.5.7"),
    objective(ControlFamily::Pl, "security_training", "PL-4", "14.1", "A.6.3"),
];

static ASSET_CLASSES: [&str; ASSET_CLASS_COUNT] = [
    "identity",
    "compute",
    "storage",
    "network",
    "data",
    "management",
];

static RISK_DOMAINS: [&str; RISK_DOMAIN_COUNT] = [
    "privilege_escalation",
    "data_exfiltration",
    "config_drift",
    "insufficient_monitoring",
    "lateral_movement",
    "data_loss",
    "credential_exposure",
    "service_disruption",
    "supply_chain_compromise",
];

static CLOUD_SERVICES: [CloudService; CLOUD_SERVICE_COUNT] = [
    CloudService {
        name: "iam",
        runtime_signal: "cloudtrail:AssumeRole",
    },
    CloudService {
        name: "vpc",
        runtime_signal: "ec2:AuthorizeSecurityGroupIngress",
    },
    CloudService {
        name: "ec2",
        runtime_signal: "ec2:RunInstances",
    },
    CloudService {
        name: "cloudtrail",
        runtime_signal: "cloudtrail:CreateTrail",
    },
    CloudService {
        name: "kms",
        runtime_signal: "kms:Decrypt",
    },
    CloudService {
        name: "rds",
        runtime_signal: "rds:ModifyDBSnapshotAttribute",
    },
    CloudService {
        name: "lambda",
        runtime_signal: "lambda:InvokeFunction",
    },
    CloudService {
        name: "s3",
        runtime_signal: "s3:GetObject",
    },
    CloudService {
        name: "cloudwatch",
        runtime_signal: "cloudwatch:DeleteAlarms",
    },
    CloudService {
        name: "eks",
        runtime_signal: "eks:UpdateClusterConfig",
    },
];

static RESOURCE_BINDINGS: [ResourceBinding; RESOURCE_BINDING_COUNT] = [
    binding("iam", "aws_iam_role", "assume_role_policy"),
    binding("vpc", "aws_vpc", "enable_dns_support"),
    binding("ec2", "aws_instance", "root_block_device.encrypted"),
    binding("cloudtrail", "aws_cloudtrail", "is_multi_region_trail"),
    binding("kms", "aws_kms_key", "enable_key_rotation"),
    binding("rds", "aws_db_instance", "backup_retention_period"),
    binding("lambda", "aws_lambda_function", "role"),
    binding("s3", "aws_s3_bucket_policy", "policy"),
    binding("cloudwatch", "aws_cloudwatch_metric_alarm", "alarm_actions"),
    binding("eks", "aws_eks_cluster", "vpc_config.endpoint_public_access"),
    binding("iam", "aws_iam_policy", "policy_document"),
    binding("vpc", "aws_network_acl", "ingress"),
    binding("ec2", "aws_launch_template", "block_device_mappings.ebs.encrypted"),
    binding("cloudtrail", "aws_cloudtrail_event_data_store", "multi_region_enabled"),
    binding("kms", "aws_kms_key_policy", "policy"),
    binding("rds", "aws_db_snapshot", "shared_accounts"),
    binding("lambda", "aws_lambda_function_url", "authorization_type"),
    binding("s3", "aws_s3_bucket_public_access_block", "block_public_policy"),
    binding("cloudwatch", "aws_cloudwatch_log_group", "retention_in_days"),
    binding("eks", "aws_eks_node_group", "remote_access"),
    binding("iam", "aws_iam_user", "force_destroy"),
    binding("vpc", "aws_subnet", "map_public_ip_on_launch"),
    binding("ec2", "aws_security_group", "ingress"),
    binding("cloudtrail", "aws_cloudtrail", "enable_log_file_validation"),
    binding("kms", "aws_kms_alias", "target_key_id"),
    binding("rds", "aws_rds_cluster", "storage_encrypted"),
    binding("lambda", "aws_lambda_permission", "principal"),
    binding("s3", "aws_s3_bucket", "acl"),
    binding("cloudwatch", "aws_cloudwatch_log_metric_filter", "pattern"),
    binding("eks", "aws_eks_cluster", "enabled_cluster_log_types"),
];

static REGIONS: [&str; REGION_COUNT] = [
    "us-east-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "eu-central-1",
    "ap-northeast-1",
    "ca-central-1",
];

static PATTERN_IDS: [&str; PATTERN_COUNT] = [
    "PAT_IDENTITY_TRUST_101",
    "PAT_NETWORK_EXPOSURE_101",
    "PAT_DATA_ENCRYPTION_101",
    "PAT_LOGGING_GAP_101",
    "PAT_KEY_ROTATION_101",
    "PAT_BACKUP_CONFIG_101",
    "PAT_PERMISSION_BOUNDARY_101",
    "PAT_RESOURCE_POLICY_101",
    "PAT_MONITORING_GAP_101",
    "PAT_CONTAINER_HARDENING_101",
    "PAT_IDENTITY_TRUST_102",
    "PAT_NETWORK_EXPOSURE_102",
    "PAT_DATA_ENCRYPTION_102",
    "PAT_LOGGING_GAP_102",
    "PAT_KEY_ROTATION_102",
    "PAT_BACKUP_CONFIG_102",
    "PAT_PERMISSION_BOUNDARY_102",
    "PAT_RESOURCE_POLICY_102",
    "PAT_MONITORING_GAP_102",
    "PAT_CONTAINER_HARDENING_102",
];

/// The full set of catalogs consulted by the synthesizer.
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    /// Control families.
    pub control_families: Catalog<ControlFamily>,
    /// Control objectives, round-robin by family.
    pub control_objectives: Catalog<ControlObjective>,
    /// Asset classes.
    pub asset_classes: Catalog<&'static str>,
    /// Risk domains.
    pub risk_domains: Catalog<&'static str>,
    /// Cloud services.
    pub cloud_services: Catalog<CloudService>,
    /// Resource bindings, round-robin by service.
    pub resource_bindings: Catalog<ResourceBinding>,
    /// Regions.
    pub regions: Catalog<&'static str>,
    /// Infrastructure pattern ids.
    pub pattern_ids: Catalog<&'static str>,
    /// ML use-case tags.
    pub ml_use_cases: Catalog<MlUseCase>,
}

impl Vocabulary {
    /// Returns the built-in vocabulary.
    #[must_use]
    pub const fn builtin() -> Self {
        Self {
            control_families: Catalog::new("control_families", &ControlFamily::ALL),
            control_objectives: Catalog::new("control_objectives", &CONTROL_OBJECTIVES),
            asset_classes: Catalog::new("asset_classes", &ASSET_CLASSES),
            risk_domains: Catalog::new("risk_domains", &RISK_DOMAINS),
            cloud_services: Catalog::new("cloud_services", &CLOUD_SERVICES),
            resource_bindings: Catalog::new("resource_bindings", &RESOURCE_BINDINGS),
            regions: Catalog::new("regions", &REGIONS),
            pattern_ids: Catalog::new("pattern_ids", &PATTERN_IDS),
            ml_use_cases: Catalog::new("ml_use_cases", &MlUseCase::ALL),
        }
    }

    /// Checks that every catalog is populated and round-robin catalogs line
    /// up with their parents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyCatalog`] for an empty catalog and
    /// [`CatalogIntegrityError::MisalignedEntry`] for an entry filed under the
    /// wrong parent.
    pub fn check_integrity(&self) -> Result<(), GenerationError> {
        let sizes = [
            (self.control_families.name(), self.control_families.len()),
            (self.control_objectives.name(), self.control_objectives.len()),
            (self.asset_classes.name(), self.asset_classes.len()),
            (self.risk_domains.name(), self.risk_domains.len()),
            (self.cloud_services.name(), self.cloud_services.len()),
            (self.resource_bindings.name(), self.resource_bindings.len()),
            (self.regions.name(), self.regions.len()),
            (self.pattern_ids.name(), self.pattern_ids.len()),
            (self.ml_use_cases.name(), self.ml_use_cases.len()),
        ];
        if let Some((catalog, _)) = sizes.iter().find(|(_, len)| *len == 0) {
            return Err(ConfigurationError::EmptyCatalog { catalog: *catalog }.into());
        }

        for (index, entry) in self.control_objectives.elements().iter().enumerate() {
            let expected = self.control_families.lookup(index)?;
            if entry.family != *expected {
                return Err(CatalogIntegrityError::MisalignedEntry {
                    catalog: self.control_objectives.name(),
                    index,
                    expected: expected.as_str(),
                    actual: entry.family.as_str(),
                }
                .into());
            }
        }

        for (index, entry) in self.resource_bindings.elements().iter().enumerate() {
            let expected = self.cloud_services.lookup(index)?;
            if entry.service != expected.name {
                return Err(CatalogIntegrityError::MisalignedEntry {
                    catalog: self.resource_bindings.name(),
                    index,
                    expected: expected.name,
                    actual: entry.service,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Objective names in catalog order.
    #[must_use]
    pub fn objective_names(&self) -> Vec<&'static str> {
        self.control_objectives
            .elements()
            .iter()
            .map(|objective| objective.name)
            .collect()
    }

    /// Service names in catalog order.
    #[must_use]
    pub fn service_names(&self) -> Vec<&'static str> {
        self.cloud_services
            .elements()
            .iter()
            .map(|service| service.name)
            .collect()
    }

    /// Distinct resource types in catalog order.
    #[must_use]
    pub fn resource_type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::with_capacity(self.resource_bindings.len());
        for binding in self.resource_bindings.elements() {
            if !names.contains(&binding.resource_type) {
                names.push(binding.resource_type);
            }
        }
        names
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
