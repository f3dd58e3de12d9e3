//! Byte-stable JSONL rendering.
//!
//! Records are written one compact JSON object per line in ascending index
//! order. Field order follows struct declaration order, so the same records
//! always produce the same bytes.

use std::collections::HashSet;

use crate::error::SerializationError;
use crate::layer::{Layer, LayerRecord};

/// Formats the record id for `index` in `layer`: `{PREFIX}_{index + 1:06}`.
///
/// # Example
///
/// ```
/// use cceg_dataset::{Layer, record_id};
///
/// assert_eq!(record_id(Layer::Execution, 0), "EXEC_000001");
/// assert_eq!(record_id(Layer::Remediation, 41), "REMED_000042");
/// ```
#[must_use]
pub fn record_id(layer: Layer, index: usize) -> String {
    format!("{}_{:06}", layer.prefix(), index.saturating_add(1))
}

/// Renders `records` as JSONL for `layer`.
///
/// Records are sorted by index first, so workers may hand them over in any
/// order.
///
/// # Errors
///
/// Returns [`SerializationError::LayerMismatch`] for a record from another
/// layer, [`SerializationError::DuplicateRecordId`] when two records share an
/// id, and [`SerializationError::EncodeError`] if encoding fails.
pub fn serialize(
    mut records: Vec<LayerRecord>,
    layer: Layer,
) -> Result<Vec<u8>, SerializationError> {
    records.sort_by_key(LayerRecord::index);

    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Vec::new();
    for record in &records {
        if record.layer() != layer {
            return Err(SerializationError::LayerMismatch {
                record_id: record.record_id().to_owned(),
                expected: layer,
            });
        }
        if !seen.insert(record.record_id()) {
            return Err(SerializationError::DuplicateRecordId {
                record_id: record.record_id().to_owned(),
            });
        }
        serde_json::to_writer(&mut out, record).map_err(|err| SerializationError::EncodeError {
            record_id: record.record_id().to_owned(),
            message: err.to_string(),
        })?;
        out.push(b'\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    //! Covers id formatting, ordering and the uniqueness guard.

    use rstest::{fixture, rstest};

    use super::*;
    use crate::distribution::{DistributionPlan, DistributionPolicy};
    use crate::layer::project;
    use crate::patterns::PatternCatalog;
    use crate::synthesizer::UnitSynthesizer;
    use crate::vocabulary::Vocabulary;

    #[fixture]
    fn execution_records() -> Vec<LayerRecord> {
        let vocabulary = Vocabulary::builtin();
        let patterns = PatternCatalog::builtin().expect("unique ids");
        let synthesizer = UnitSynthesizer::new(&vocabulary, &patterns).expect("consistent");
        let plan = DistributionPlan::new(DistributionPolicy::QuotaExact, 42, 4).expect("plan");
        (0..4)
            .map(|index| {
                let unit = synthesizer.synthesize(42, index, &plan).expect("in range");
                project(&unit, Layer::Execution)
            })
            .collect()
    }

    fn ids(bytes: &[u8]) -> Vec<String> {
        std::str::from_utf8(bytes)
            .expect("utf-8")
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).expect("json line");
                value
                    .get("record_id")
                    .and_then(serde_json::Value::as_str)
                    .expect("record id")
                    .to_owned()
            })
            .collect()
    }

    #[rstest]
    #[case(Layer::Intent, 0, "INT_000001")]
    #[case(Layer::Execution, 4, "EXEC_000005")]
    #[case(Layer::Remediation, 999_999, "REMED_1000000")]
    fn record_ids_are_prefixed_and_padded(
        #[case] layer: Layer,
        #[case] index: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(record_id(layer, index), expected);
    }

    #[rstest]
    fn output_is_sorted_by_index(execution_records: Vec<LayerRecord>) {
        let mut shuffled = execution_records.clone();
        shuffled.reverse();
        let ordered = serialize(execution_records, Layer::Execution).expect("serialize");
        let from_shuffled = serialize(shuffled, Layer::Execution).expect("serialize");
        assert_eq!(ordered, from_shuffled);
        assert_eq!(
            ids(&ordered),
            vec!["EXEC_000001", "EXEC_000002", "EXEC_000003", "EXEC_000004"]
        );
        assert!(ordered.ends_with(b"\n"));
    }

    #[rstest]
    fn duplicate_ids_are_rejected(execution_records: Vec<LayerRecord>) {
        let mut doubled = execution_records.clone();
        doubled.extend(execution_records.into_iter().take(1));
        assert_eq!(
            serialize(doubled, Layer::Execution),
            Err(SerializationError::DuplicateRecordId {
                record_id: "EXEC_000001".to_owned()
            })
        );
    }

    #[rstest]
    fn records_from_another_layer_are_rejected(execution_records: Vec<LayerRecord>) {
        assert_eq!(
            serialize(execution_records, Layer::Remediation),
            Err(SerializationError::LayerMismatch {
                record_id: "EXEC_000001".to_owned(),
                expected: Layer::Remediation,
            })
        );
    }

    #[test]
    fn empty_input_serializes_to_nothing() {
        assert_eq!(serialize(Vec::new(), Layer::Intent), Ok(Vec::new()));
    }
}
