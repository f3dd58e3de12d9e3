//! Dataset-wide label distribution.
//!
//! Compliance status and severity are the two labels with declared targets:
//! 15/70/15 for compliant, non-compliant and partially compliant, and
//! 20/30/30/20 for low, medium, high and critical. A [`DistributionPlan`] is
//! computed once per layer and then consulted read-only by every worker.
//!
//! Under [`DistributionPolicy::QuotaExact`] the plan allots each label an
//! exact quota with the largest-remainder method, lays the quotas out in
//! catalog order and shuffles them with a seed-keyed stream. Under
//! [`DistributionPolicy::ExpectationOnly`] each record maps its own draws onto
//! the cumulative target weights, so the targets only hold on average.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::draw::{DrawStream, QuotaLane, RecordDraws, to_u64, to_usize};
use crate::error::ConfigurationError;
use crate::unit::{ComplianceStatus, Severity};

/// Target compliance status mix in percent, in catalog order.
pub const STATUS_TARGETS: [(ComplianceStatus, u32); 3] = [
    (ComplianceStatus::Compliant, 15),
    (ComplianceStatus::NonCompliant, 70),
    (ComplianceStatus::PartiallyCompliant, 15),
];

/// Target severity mix in percent, in catalog order.
pub const SEVERITY_TARGETS: [(Severity, u32); 4] = [
    (Severity::Low, 20),
    (Severity::Medium, 30),
    (Severity::High, 30),
    (Severity::Critical, 20),
];

/// How labels are assigned across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistributionPolicy {
    /// Exact per-batch quotas, shuffled by seed.
    #[default]
    QuotaExact,
    /// Independent weighted draws per record.
    ExpectationOnly,
}

impl DistributionPolicy {
    /// Returns the configuration name of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuotaExact => "quota-exact",
            Self::ExpectationOnly => "expectation-only",
        }
    }
}

impl fmt::Display for DistributionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionPolicy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quota-exact" | "quota_exact" => Ok(Self::QuotaExact),
            "expectation-only" | "expectation_only" => Ok(Self::ExpectationOnly),
            _ => Err(ConfigurationError::UnknownDistributionPolicy {
                value: value.to_owned(),
            }),
        }
    }
}

/// Splits `count` among `targets` by the largest-remainder method.
///
/// Each label receives `floor(count * weight / total)`; leftover slots go to
/// the largest fractional remainders, ties resolved in catalog order.
///
/// # Errors
///
/// Returns [`ConfigurationError::CountTooLarge`] if the arithmetic
/// overflows.
///
/// # Example
///
/// ```
/// use cceg_dataset::{SEVERITY_TARGETS, Severity, largest_remainder_quotas};
///
/// let quotas = largest_remainder_quotas(&SEVERITY_TARGETS, 5).expect("small count");
/// assert_eq!(
///     quotas,
///     vec![
///         (Severity::Low, 1),
///         (Severity::Medium, 2),
///         (Severity::High, 1),
///         (Severity::Critical, 1),
///     ]
/// );
/// ```
pub fn largest_remainder_quotas<T: Copy>(
    targets: &[(T, u32)],
    count: usize,
) -> Result<Vec<(T, usize)>, ConfigurationError> {
    let too_large = || ConfigurationError::CountTooLarge { count };
    let total: u64 = targets.iter().map(|(_, weight)| u64::from(*weight)).sum();
    if total == 0 {
        return Ok(targets.iter().map(|(label, _)| (*label, 0)).collect());
    }

    let wide_count = to_u64(count);
    let mut shares = Vec::with_capacity(targets.len());
    for (position, (label, weight)) in targets.iter().enumerate() {
        let product = wide_count
            .checked_mul(u64::from(*weight))
            .ok_or_else(too_large)?;
        let floor = to_usize(product.div_euclid(total));
        shares.push((position, *label, floor, product.rem_euclid(total)));
    }

    let assigned: usize = shares.iter().map(|(_, _, floor, _)| *floor).sum();
    let leftover = count.checked_sub(assigned).ok_or_else(too_large)?;

    let mut by_remainder: Vec<(usize, u64)> = shares
        .iter()
        .map(|(position, _, _, remainder)| (*position, *remainder))
        .collect();
    by_remainder.sort_by_key(|(position, remainder)| (Reverse(*remainder), *position));
    for (position, _) in by_remainder.into_iter().take(leftover) {
        if let Some((_, _, quota, _)) = shares.get_mut(position) {
            *quota += 1;
        }
    }

    Ok(shares
        .into_iter()
        .map(|(_, label, quota, _)| (label, quota))
        .collect())
}

/// Expands quotas in catalog order and shuffles them with the lane stream.
fn shuffled_layout<T: Copy>(quotas: &[(T, usize)], stream: &mut DrawStream) -> Vec<T> {
    let mut layout: Vec<T> = quotas
        .iter()
        .flat_map(|(label, quota)| std::iter::repeat_n(*label, *quota))
        .collect();
    for upper in (1..layout.len()).rev() {
        let pick = to_usize(stream.next_below(to_u64(upper + 1)));
        layout.swap(upper, pick);
    }
    layout
}

/// Maps a `[0, 1)` selector onto cumulative percentage weights.
#[expect(clippy::float_arithmetic, reason = "scaling a unit selector to percent")]
fn pick_weighted<T: Copy>(targets: &[(T, u32)], selector: f64) -> Option<T> {
    let total: u32 = targets.iter().map(|(_, weight)| *weight).sum();
    let scaled = selector * f64::from(total);
    let mut cumulative = 0_u32;
    for (label, weight) in targets {
        cumulative += *weight;
        if scaled < f64::from(cumulative) {
            return Some(*label);
        }
    }
    targets.last().map(|(label, _)| *label)
}

/// Per-index label assignment for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    policy: DistributionPolicy,
    count: usize,
    statuses: Vec<ComplianceStatus>,
    severities: Vec<Severity>,
}

impl DistributionPlan {
    /// Computes the plan for `count` records.
    ///
    /// This is the single pre-pass the quota policy needs; the result is a
    /// pure function of `(policy, seed, count)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::CountTooLarge`] if quota arithmetic
    /// overflows.
    pub fn new(
        policy: DistributionPolicy,
        seed: u64,
        count: usize,
    ) -> Result<Self, ConfigurationError> {
        let (statuses, severities) = match policy {
            DistributionPolicy::QuotaExact => (
                shuffled_layout(
                    &largest_remainder_quotas(&STATUS_TARGETS, count)?,
                    &mut DrawStream::for_quota(seed, QuotaLane::Status),
                ),
                shuffled_layout(
                    &largest_remainder_quotas(&SEVERITY_TARGETS, count)?,
                    &mut DrawStream::for_quota(seed, QuotaLane::Severity),
                ),
            ),
            DistributionPolicy::ExpectationOnly => (Vec::new(), Vec::new()),
        };
        Ok(Self {
            policy,
            count,
            statuses,
            severities,
        })
    }

    /// Policy the plan was built with.
    #[must_use]
    pub const fn policy(&self) -> DistributionPolicy {
        self.policy
    }

    /// Number of records the plan covers.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the status and severity for `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::IndexOutOfRange`] when `index` is not
    /// below the planned count.
    pub fn labels(
        &self,
        index: usize,
        draws: &RecordDraws,
    ) -> Result<(ComplianceStatus, Severity), ConfigurationError> {
        let out_of_range = || ConfigurationError::IndexOutOfRange {
            index,
            count: self.count,
        };
        if index >= self.count {
            return Err(out_of_range());
        }
        let labels = match self.policy {
            DistributionPolicy::QuotaExact => self
                .statuses
                .get(index)
                .copied()
                .zip(self.severities.get(index).copied()),
            DistributionPolicy::ExpectationOnly => pick_weighted(&STATUS_TARGETS, draws.status_bias)
                .zip(pick_weighted(&SEVERITY_TARGETS, draws.severity_selector)),
        };
        labels.ok_or_else(out_of_range)
    }
}

/// Counts of the labels a layer emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelTally {
    statuses: BTreeMap<ComplianceStatus, usize>,
    severities: BTreeMap<Severity, usize>,
}

impl LabelTally {
    /// Records one emitted record.
    pub fn record(&mut self, status: ComplianceStatus, severity: Severity) {
        *self.statuses.entry(status).or_insert(0) += 1;
        *self.severities.entry(severity).or_insert(0) += 1;
    }

    /// Number of records with `status`.
    #[must_use]
    pub fn status_count(&self, status: ComplianceStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    /// Number of records with `severity`.
    #[must_use]
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.severities.get(&severity).copied().unwrap_or(0)
    }

    /// Total number of records tallied.
    #[must_use]
    pub fn total(&self) -> usize {
        self.statuses.values().sum()
    }
}

#[cfg(test)]
mod tests {
    //! Covers quota arithmetic, plan determinism and policy parsing.

    use rstest::{fixture, rstest};

    use super::*;
    use crate::unit::MlUseCase;

    #[fixture]
    fn draws() -> RecordDraws {
        RecordDraws::draw(42, 0, &MlUseCase::ALL).expect("catalog populated")
    }

    #[rstest]
    #[case(5, vec![1, 3, 1])]
    #[case(1, vec![0, 1, 0])]
    #[case(100, vec![15, 70, 15])]
    #[case(7, vec![1, 5, 1])]
    fn status_quotas_use_largest_remainder(#[case] count: usize, #[case] expected: Vec<usize>) {
        let quotas = largest_remainder_quotas(&STATUS_TARGETS, count).expect("fits");
        let sizes: Vec<usize> = quotas.iter().map(|(_, quota)| *quota).collect();
        assert_eq!(sizes, expected);
    }

    #[rstest]
    #[case(5, vec![1, 2, 1, 1])]
    #[case(3, vec![1, 1, 1, 0])]
    #[case(100, vec![20, 30, 30, 20])]
    fn severity_quotas_use_largest_remainder(#[case] count: usize, #[case] expected: Vec<usize>) {
        let quotas = largest_remainder_quotas(&SEVERITY_TARGETS, count).expect("fits");
        let sizes: Vec<usize> = quotas.iter().map(|(_, quota)| *quota).collect();
        assert_eq!(sizes, expected);
    }

    #[test]
    fn quotas_always_sum_to_count() {
        for count in 0..250 {
            let statuses = largest_remainder_quotas(&STATUS_TARGETS, count).expect("fits");
            let severities = largest_remainder_quotas(&SEVERITY_TARGETS, count).expect("fits");
            assert_eq!(statuses.iter().map(|(_, q)| q).sum::<usize>(), count);
            assert_eq!(severities.iter().map(|(_, q)| q).sum::<usize>(), count);
        }
    }

    #[test]
    fn overflowing_count_is_rejected() {
        assert_eq!(
            largest_remainder_quotas(&STATUS_TARGETS, usize::MAX),
            Err(ConfigurationError::CountTooLarge { count: usize::MAX })
        );
    }

    #[rstest]
    fn quota_plan_matches_targets_exactly(draws: RecordDraws) {
        let plan = DistributionPlan::new(DistributionPolicy::QuotaExact, 42, 100).expect("plan");
        let mut tally = LabelTally::default();
        for index in 0..100 {
            let (status, severity) = plan.labels(index, &draws).expect("in range");
            tally.record(status, severity);
        }
        assert_eq!(tally.status_count(ComplianceStatus::NonCompliant), 70);
        assert_eq!(tally.status_count(ComplianceStatus::Compliant), 15);
        assert_eq!(tally.status_count(ComplianceStatus::PartiallyCompliant), 15);
        assert_eq!(tally.severity_count(Severity::Low), 20);
        assert_eq!(tally.severity_count(Severity::Medium), 30);
        assert_eq!(tally.severity_count(Severity::High), 30);
        assert_eq!(tally.severity_count(Severity::Critical), 20);
        assert_eq!(tally.total(), 100);
    }

    #[test]
    fn quota_plan_is_a_pure_function_of_its_inputs() {
        let first = DistributionPlan::new(DistributionPolicy::QuotaExact, 7, 64).expect("plan");
        let second = DistributionPlan::new(DistributionPolicy::QuotaExact, 7, 64).expect("plan");
        let other_seed =
            DistributionPlan::new(DistributionPolicy::QuotaExact, 8, 64).expect("plan");
        assert_eq!(first, second);
        assert_ne!(first, other_seed);
    }

    #[rstest]
    fn quota_layout_is_pinned_for_seed_42(draws: RecordDraws) {
        use crate::unit::ComplianceStatus::{Compliant, NonCompliant, PartiallyCompliant};
        use crate::unit::Severity::{Critical, High, Low, Medium};

        let plan = DistributionPlan::new(DistributionPolicy::QuotaExact, 42, 10).expect("plan");
        let labels: Vec<_> = (0..10)
            .map(|index| plan.labels(index, &draws).expect("in range"))
            .collect();
        assert_eq!(
            labels,
            vec![
                (NonCompliant, Medium),
                (NonCompliant, High),
                (NonCompliant, Critical),
                (Compliant, Medium),
                (NonCompliant, Medium),
                (NonCompliant, Critical),
                (PartiallyCompliant, High),
                (Compliant, Low),
                (NonCompliant, High),
                (NonCompliant, Low),
            ]
        );
    }

    #[test]
    fn single_record_is_non_compliant() {
        let plan = DistributionPlan::new(DistributionPolicy::QuotaExact, 42, 1).expect("plan");
        let draws = RecordDraws::draw(42, 0, &MlUseCase::ALL).expect("catalog populated");
        let (status, _) = plan.labels(0, &draws).expect("in range");
        assert_eq!(status, ComplianceStatus::NonCompliant);
    }

    #[rstest]
    fn index_past_count_is_rejected(draws: RecordDraws) {
        let plan = DistributionPlan::new(DistributionPolicy::QuotaExact, 42, 3).expect("plan");
        assert_eq!(
            plan.labels(3, &draws),
            Err(ConfigurationError::IndexOutOfRange { index: 3, count: 3 })
        );
    }

    #[rstest]
    #[case(0.0, ComplianceStatus::Compliant)]
    #[case(0.149, ComplianceStatus::Compliant)]
    #[case(0.151, ComplianceStatus::NonCompliant)]
    #[case(0.849, ComplianceStatus::NonCompliant)]
    #[case(0.851, ComplianceStatus::PartiallyCompliant)]
    #[case(0.999, ComplianceStatus::PartiallyCompliant)]
    fn expectation_policy_maps_selector_onto_weights(
        #[case] selector: f64,
        #[case] expected: ComplianceStatus,
    ) {
        assert_eq!(pick_weighted(&STATUS_TARGETS, selector), Some(expected));
    }

    #[test]
    fn expectation_policy_approximates_targets() {
        let count = 2_000;
        let plan =
            DistributionPlan::new(DistributionPolicy::ExpectationOnly, 42, count).expect("plan");
        let mut tally = LabelTally::default();
        for index in 0..count {
            let draws = RecordDraws::draw(42, index, &MlUseCase::ALL).expect("catalog populated");
            let (status, severity) = plan.labels(index, &draws).expect("in range");
            tally.record(status, severity);
        }
        let non_compliant = tally.status_count(ComplianceStatus::NonCompliant);
        assert!((1_300..=1_500).contains(&non_compliant), "{non_compliant}");
    }

    #[rstest]
    #[case("quota-exact", DistributionPolicy::QuotaExact)]
    #[case("Expectation-Only", DistributionPolicy::ExpectationOnly)]
    #[case("expectation_only", DistributionPolicy::ExpectationOnly)]
    fn policy_parses_from_config_names(#[case] raw: &str, #[case] expected: DistributionPolicy) {
        assert_eq!(raw.parse::<DistributionPolicy>(), Ok(expected));
    }

    #[test]
    fn unknown_policy_is_a_configuration_error() {
        assert_eq!(
            "stratified".parse::<DistributionPolicy>(),
            Err(ConfigurationError::UnknownDistributionPolicy {
                value: "stratified".to_owned()
            })
        );
    }
}
