//! Generation request types and JSON parsing.
//!
//! A request names the global seed and how many records each layer should
//! hold. Requests are validated when built, so a request that exists is one
//! generation can start from: the seed is non-negative and every count is
//! positive.

use camino::Utf8Path;
use cap_std::fs::Dir;
use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::layer::Layer;

/// Per-layer record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerCounts {
    /// Intent records.
    pub intent: usize,
    /// Execution records.
    pub execution: usize,
    /// Remediation records.
    pub remediation: usize,
}

impl LayerCounts {
    /// Returns the count requested for `layer`.
    #[must_use]
    pub const fn get(&self, layer: Layer) -> usize {
        match layer {
            Layer::Intent => self.intent,
            Layer::Execution => self.execution,
            Layer::Remediation => self.remediation,
        }
    }

    /// Total records across all layers.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.intent
            .saturating_add(self.execution)
            .saturating_add(self.remediation)
    }
}

/// A validated request to generate the dataset.
///
/// # Example
///
/// ```
/// use cceg_dataset::{GenerationRequest, Layer};
///
/// let json = r#"{
///     "seed": 42,
///     "counts": {"intent": 2000, "execution": 5000, "remediation": 3000}
/// }"#;
///
/// let request = GenerationRequest::from_json(json).expect("valid request");
/// assert_eq!(request.seed(), 42);
/// assert_eq!(request.counts().get(Layer::Execution), 5000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    seed: u64,
    counts: LayerCounts,
}

impl GenerationRequest {
    /// Builds a request, rejecting zero counts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroCount`] naming the first layer whose
    /// count is zero.
    pub fn new(seed: u64, counts: LayerCounts) -> Result<Self, ConfigurationError> {
        if let Some(layer) = Layer::ALL.into_iter().find(|layer| counts.get(*layer) == 0) {
            return Err(ConfigurationError::ZeroCount { layer });
        }
        Ok(Self { seed, counts })
    }

    /// Parses a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ParseError`] for malformed JSON, a
    /// negative or non-integer seed, or unknown fields, and
    /// [`ConfigurationError::ZeroCount`] for a zero count.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let raw: RawGenerationRequest =
            serde_json::from_str(json).map_err(|e| ConfigurationError::ParseError {
                message: e.to_string(),
            })?;

        Self::from_raw(raw)
    }

    /// Loads a request from a JSON file inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::IoError`] if the file cannot be read,
    /// and any error [`GenerationRequest::from_json`] returns.
    pub fn from_file(dir: &Dir, path: &Utf8Path) -> Result<Self, ConfigurationError> {
        let contents = dir
            .read_to_string(path)
            .map_err(|e| ConfigurationError::IoError {
                path: path.as_std_path().to_path_buf(),
                message: e.to_string(),
            })?;

        Self::from_json(&contents)
    }

    fn from_raw(raw: RawGenerationRequest) -> Result<Self, ConfigurationError> {
        Self::new(
            raw.seed,
            LayerCounts {
                intent: raw.counts.intent,
                execution: raw.counts.execution,
                remediation: raw.counts.remediation,
            },
        )
    }

    /// Returns the global seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the per-layer counts.
    #[must_use]
    pub const fn counts(&self) -> LayerCounts {
        self.counts
    }
}

/// Raw JSON representation for deserialization.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGenerationRequest {
    seed: u64,
    counts: RawLayerCounts,
}

/// Raw JSON representation of the per-layer counts.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayerCounts {
    intent: usize,
    execution: usize,
    remediation: usize,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const VALID_JSON: &str = r#"{
        "seed": 2026,
        "counts": {"intent": 12, "execution": 30, "remediation": 7}
    }"#;

    #[test]
    fn parses_valid_request() {
        let request = GenerationRequest::from_json(VALID_JSON).expect("valid request");

        assert_eq!(request.seed(), 2026);
        assert_eq!(
            request.counts(),
            LayerCounts {
                intent: 12,
                execution: 30,
                remediation: 7
            }
        );
        assert_eq!(request.counts().total(), 49);
    }

    /// Parse errors carry serde's message, so only the variant is checked.
    #[rstest]
    #[case::malformed_json("not valid json")]
    #[case::negative_seed(
        r#"{"seed": -1, "counts": {"intent": 1, "execution": 1, "remediation": 1}}"#
    )]
    #[case::fractional_seed(
        r#"{"seed": 1.5, "counts": {"intent": 1, "execution": 1, "remediation": 1}}"#
    )]
    #[case::missing_layer(r#"{"seed": 1, "counts": {"intent": 1, "execution": 1}}"#)]
    #[case::negative_count(
        r#"{"seed": 1, "counts": {"intent": -3, "execution": 1, "remediation": 1}}"#
    )]
    #[case::unknown_field(
        r#"{"seed": 1, "counts": {"intent": 1, "execution": 1, "remediation": 1}, "generated_at": "now"}"#
    )]
    fn rejects_json_with_parse_error(#[case] json: &str) {
        let result = GenerationRequest::from_json(json);
        assert!(matches!(result, Err(ConfigurationError::ParseError { .. })));
    }

    #[rstest]
    #[case::intent(0, 1, 1, Layer::Intent)]
    #[case::execution(1, 0, 1, Layer::Execution)]
    #[case::remediation(1, 1, 0, Layer::Remediation)]
    fn rejects_zero_counts(
        #[case] intent: usize,
        #[case] execution: usize,
        #[case] remediation: usize,
        #[case] layer: Layer,
    ) {
        let json = format!(
            r#"{{"seed": 1, "counts": {{"intent": {intent}, "execution": {execution}, "remediation": {remediation}}}}}"#
        );
        assert_eq!(
            GenerationRequest::from_json(&json),
            Err(ConfigurationError::ZeroCount { layer })
        );
    }
}
