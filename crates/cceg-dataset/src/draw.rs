//! Deterministic draw engine.
//!
//! Every random value in a dataset comes from a [`DrawStream`], a ChaCha8
//! keystream addressed by the global seed, a domain tag and a stream id.
//! Record draws use the record index as the stream id, so the values for one
//! index never depend on which other indices were generated or in what
//! order.
//!
//! # Scheme (version 1)
//!
//! - Key: the seed as 8 little-endian bytes, one domain tag byte (`0x01` for
//!   records, `0x02` for quota shuffles), then zero padding to 32 bytes.
//! - Stream: the record index, or the quota lane.
//! - `unit`: the top 53 bits of the next 64-bit word scaled into `[0, 1)`.
//! - `below(n)`: the high word of the 128-bit product `word * n`.
//! - Scaled values are rounded to two decimal places.
//!
//! The per-record draw order is fixed and listed on [`RecordDraws`]. Any
//! change to the scheme or the order must bump [`DRAW_SCHEME_VERSION`].

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::ConfigurationError;
use crate::unit::MlUseCase;

/// Version of the key layout and per-record draw order.
pub const DRAW_SCHEME_VERSION: u32 = 1;

/// Domain tag for per-record streams.
const RECORD_DOMAIN: u8 = 0x01;

/// Domain tag for quota shuffle streams.
const QUOTA_DOMAIN: u8 = 0x02;

/// 2^-53, the spacing of `unit` outputs.
const UNIT_SCALE: f64 = f64::from_bits(0x3CA0_0000_0000_0000);

/// Bounds for compliance confidence.
pub const CONFIDENCE_RANGE: (f64, f64) = (0.85, 0.99);
/// Bounds for rollback complexity.
pub const ROLLBACK_RANGE: (f64, f64) = (0.10, 0.90);
/// Bounds for the monthly cost delta in USD.
pub const COST_DELTA_RANGE: (f64, f64) = (-50.0, 150.0);
/// Bounds for operational overhead.
pub const OVERHEAD_RANGE: (f64, f64) = (0.10, 0.90);
/// Bounds for risk reduction.
pub const RISK_REDUCTION_RANGE: (f64, f64) = (0.30, 0.95);
/// Bounds for context complexity.
pub const CONTEXT_COMPLEXITY_RANGE: (f64, f64) = (0.20, 0.95);

/// Most use-case tags a record may carry.
pub const MAX_USE_CASES: u64 = 3;

/// Quota shuffle lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLane {
    /// Compliance status assignment.
    Status,
    /// Severity assignment.
    Severity,
}

impl QuotaLane {
    const fn stream(self) -> u64 {
        match self {
            Self::Status => 0,
            Self::Severity => 1,
        }
    }
}

/// A positioned pseudorandom stream.
#[derive(Debug, Clone)]
pub struct DrawStream {
    rng: ChaCha8Rng,
}

impl DrawStream {
    /// Opens the stream for one record.
    #[must_use]
    pub fn for_record(seed: u64, index: u64) -> Self {
        Self::keyed(seed, RECORD_DOMAIN, index)
    }

    /// Opens a quota shuffle stream.
    #[must_use]
    pub fn for_quota(seed: u64, lane: QuotaLane) -> Self {
        Self::keyed(seed, QUOTA_DOMAIN, lane.stream())
    }

    #[expect(
        clippy::little_endian_bytes,
        reason = "the key layout is little-endian on every host"
    )]
    fn keyed(seed: u64, domain: u8, stream: u64) -> Self {
        let mut key = [0_u8; 32];
        let (seed_bytes, rest) = key.split_at_mut(8);
        seed_bytes.copy_from_slice(&seed.to_le_bytes());
        if let Some(tag) = rest.first_mut() {
            *tag = domain;
        }
        let mut rng = ChaCha8Rng::from_seed(key);
        rng.set_stream(stream);
        Self { rng }
    }

    /// Draws a value in `[0, 1)`.
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "a 53-bit integer converts to f64 exactly"
    )]
    pub fn next_unit(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * UNIT_SCALE
    }

    /// Draws an integer in `[0, bound)`; returns 0 when `bound` is 0.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the high word of a u64 x u64 product fits in u64"
    )]
    pub fn next_below(&mut self, bound: u64) -> u64 {
        let wide = u128::from(self.rng.next_u64()) * u128::from(bound);
        (wide >> 64) as u64
    }

    /// Draws a two-decimal value in `[low, high]`.
    #[expect(clippy::float_arithmetic, reason = "linear scaling of a unit draw")]
    pub fn next_in(&mut self, (low, high): (f64, f64)) -> f64 {
        round2(low + self.next_unit() * (high - low))
    }
}

/// Rounds to two decimal places, half away from zero.
#[expect(clippy::float_arithmetic, reason = "decimal rounding")]
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Every value drawn for one record, in draw order.
///
/// 1. status bias (`unit`)
/// 2. confidence
/// 3. severity selector (`unit`)
/// 4. use-case count, `1 + below(3)`
/// 5. one `below(remaining)` per use-case member, without replacement
/// 6. rollback complexity
/// 7. cost delta
/// 8. operational overhead
/// 9. risk reduction
/// 10. context complexity
///
/// All ten steps run for every record whatever layer is being generated.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraws {
    /// Selector for expectation-only status assignment.
    pub status_bias: f64,
    /// Compliance confidence.
    pub confidence: f64,
    /// Selector for expectation-only severity assignment.
    pub severity_selector: f64,
    /// Chosen use-case tags in catalog order.
    pub ml_use_cases: Vec<MlUseCase>,
    /// Rollback complexity.
    pub rollback_complexity: f64,
    /// Monthly cost delta in USD.
    pub cost_delta: f64,
    /// Operational overhead.
    pub operational_overhead: f64,
    /// Risk reduction.
    pub risk_reduction: f64,
    /// Context complexity.
    pub context_complexity: f64,
}

impl RecordDraws {
    /// Runs the fixed draw sequence for `(seed, index)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyCatalog`] when `use_cases` is
    /// empty.
    ///
    /// # Example
    ///
    /// ```
    /// use cceg_dataset::{MlUseCase, RecordDraws};
    ///
    /// let first = RecordDraws::draw(42, 7, &MlUseCase::ALL).expect("catalog populated");
    /// let again = RecordDraws::draw(42, 7, &MlUseCase::ALL).expect("catalog populated");
    ///
    /// assert_eq!(first, again);
    /// ```
    pub fn draw(
        seed: u64,
        index: usize,
        use_cases: &[MlUseCase],
    ) -> Result<Self, ConfigurationError> {
        if use_cases.is_empty() {
            return Err(ConfigurationError::EmptyCatalog {
                catalog: "ml_use_cases",
            });
        }
        let mut stream = DrawStream::for_record(seed, to_u64(index));

        let status_bias = stream.next_unit();
        let confidence = stream.next_in(CONFIDENCE_RANGE);
        let severity_selector = stream.next_unit();
        let requested = 1 + stream.next_below(MAX_USE_CASES);
        let ml_use_cases = pick_members(&mut stream, use_cases, requested);

        Ok(Self {
            status_bias,
            confidence,
            severity_selector,
            ml_use_cases,
            rollback_complexity: stream.next_in(ROLLBACK_RANGE),
            cost_delta: stream.next_in(COST_DELTA_RANGE),
            operational_overhead: stream.next_in(OVERHEAD_RANGE),
            risk_reduction: stream.next_in(RISK_REDUCTION_RANGE),
            context_complexity: stream.next_in(CONTEXT_COMPLEXITY_RANGE),
        })
    }
}

/// Samples `requested` members without replacement, returned in catalog
/// order.
fn pick_members(stream: &mut DrawStream, catalog: &[MlUseCase], requested: u64) -> Vec<MlUseCase> {
    let mut pool: Vec<usize> = (0..catalog.len()).collect();
    let mut chosen = Vec::new();
    for _ in 0..requested {
        if pool.is_empty() {
            break;
        }
        let slot = to_usize(stream.next_below(to_u64(pool.len())));
        if slot < pool.len() {
            chosen.push(pool.remove(slot));
        }
    }
    chosen.sort_unstable();
    chosen
        .into_iter()
        .filter_map(|position| catalog.get(position).copied())
        .collect()
}

pub(crate) fn to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

pub(crate) fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    //! Covers stream addressing, draw bounds and member sampling.

    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[test]
    fn identical_addresses_yield_identical_streams() {
        let mut first = DrawStream::for_record(42, 3);
        let mut second = DrawStream::for_record(42, 3);
        for _ in 0..16 {
            assert_eq!(first.next_below(1_000_000), second.next_below(1_000_000));
        }
    }

    #[rstest]
    #[case(DrawStream::for_record(42, 4))]
    #[case(DrawStream::for_record(43, 3))]
    #[case(DrawStream::for_quota(42, QuotaLane::Severity))]
    fn distinct_addresses_yield_distinct_streams(#[case] mut other: DrawStream) {
        let mut reference = DrawStream::for_record(42, 3);
        let left: Vec<u64> = (0..4).map(|_| reference.next_below(u64::MAX)).collect();
        let right: Vec<u64> = (0..4).map(|_| other.next_below(u64::MAX)).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn unit_draws_stay_in_half_open_interval() {
        let mut stream = DrawStream::for_record(7, 0);
        for _ in 0..1_000 {
            let value = stream.next_unit();
            assert!((0.0..1.0).contains(&value), "{value} outside [0, 1)");
        }
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(30)]
    fn below_draws_stay_under_bound(#[case] bound: u64) {
        let mut stream = DrawStream::for_record(7, 1);
        for _ in 0..1_000 {
            assert!(stream.next_below(bound) < bound);
        }
    }

    #[test]
    fn below_zero_is_zero() {
        let mut stream = DrawStream::for_record(7, 2);
        assert_eq!(stream.next_below(0), 0);
    }

    #[rstest]
    #[case(0.004, 0.0)]
    #[case(0.846, 0.85)]
    #[case(-12.345_6, -12.35)]
    fn round2_keeps_two_decimals(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round2(input), expected);
    }

    #[test]
    fn record_draws_are_reproducible_and_in_range() {
        for index in 0..200 {
            let draws = RecordDraws::draw(42, index, &MlUseCase::ALL).expect("populated");
            assert_eq!(
                draws,
                RecordDraws::draw(42, index, &MlUseCase::ALL).expect("populated")
            );
            assert!((0.85..=0.99).contains(&draws.confidence));
            assert!((0.10..=0.90).contains(&draws.rollback_complexity));
            assert!((-50.0..=150.0).contains(&draws.cost_delta));
            assert!((0.10..=0.90).contains(&draws.operational_overhead));
            assert!((0.30..=0.95).contains(&draws.risk_reduction));
            assert!((0.20..=0.95).contains(&draws.context_complexity));
        }
    }

    #[test]
    fn record_draws_are_pinned_for_seed_42() {
        let draws = RecordDraws::draw(42, 0, &MlUseCase::ALL).expect("catalog populated");
        assert_eq!(
            draws,
            RecordDraws {
                status_bias: 0.524_356_743_230_825_3,
                confidence: 0.87,
                severity_selector: 0.498_851_982_857_291_04,
                ml_use_cases: vec![
                    MlUseCase::PolicyClassification,
                    MlUseCase::AutoRemediation,
                    MlUseCase::AnomalyDetection,
                ],
                rollback_complexity: 0.22,
                cost_delta: 24.07,
                operational_overhead: 0.89,
                risk_reduction: 0.61,
                context_complexity: 0.28,
            }
        );
    }

    #[test]
    fn use_cases_are_unique_sorted_and_bounded() {
        for index in 0..200 {
            let draws = RecordDraws::draw(9, index, &MlUseCase::ALL).expect("populated");
            let tags = &draws.ml_use_cases;
            assert!((1..=3).contains(&tags.len()), "index {index}: {tags:?}");
            let unique: HashSet<_> = tags.iter().collect();
            assert_eq!(unique.len(), tags.len());
            assert!(tags.windows(2).all(|pair| pair.first() < pair.last()));
        }
    }

    #[test]
    fn small_catalog_caps_member_count() {
        let draws =
            RecordDraws::draw(1, 0, &[MlUseCase::RiskScoring]).expect("single entry catalog");
        assert_eq!(draws.ml_use_cases, vec![MlUseCase::RiskScoring]);
    }

    #[test]
    fn empty_use_case_catalog_is_rejected() {
        assert_eq!(
            RecordDraws::draw(1, 0, &[]),
            Err(ConfigurationError::EmptyCatalog {
                catalog: "ml_use_cases"
            })
        );
    }
}
