//! Integration tests for the exported JSON Schema document.
//!
//! Generated layers are checked with an independent Draft-07 validator so the
//! shipped schema and the in-process validator cannot drift apart.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use cceg_dataset::{
    DatasetGenerator, GenerationOptions, GenerationRequest, Layer, LayerCounts, LayerSchema,
    schema_document, validate,
};
use jsonschema::Validator;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn generator() -> DatasetGenerator {
    DatasetGenerator::new(GenerationOptions::default()).expect("catalogs are consistent")
}

#[fixture]
fn document_validator() -> Validator {
    jsonschema::validator_for(&schema_document()).expect("schema document compiles")
}

fn records(bytes: &[u8]) -> Vec<Value> {
    std::str::from_utf8(bytes)
        .expect("utf-8 output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("one JSON object per line"))
        .collect()
}

fn first_execution_record(generator: &DatasetGenerator) -> Value {
    let output = generator
        .generate_layer(42, Layer::Execution, 1)
        .expect("generation succeeds");
    records(&output.bytes)
        .into_iter()
        .next()
        .expect("one record")
}

#[rstest]
fn every_generated_record_satisfies_the_document(
    generator: DatasetGenerator,
    document_validator: Validator,
) {
    let request = GenerationRequest::new(
        42,
        LayerCounts {
            intent: 40,
            execution: 60,
            remediation: 40,
        },
    )
    .expect("valid request");
    let dataset = generator.generate(&request).expect("generation succeeds");

    for output in dataset.layers() {
        for record in records(&output.bytes) {
            let errors: Vec<String> = document_validator
                .iter_errors(&record)
                .map(|error| format!("{}: {error}", error.instance_path))
                .collect();
            assert!(errors.is_empty(), "{}: {errors:?}", output.layer);
        }
    }
}

#[rstest]
fn out_of_range_blast_radius_is_rejected_by_both_validators(
    generator: DatasetGenerator,
    document_validator: Validator,
) {
    let mut record = first_execution_record(&generator);
    *record
        .pointer_mut("/violation_mechanics/blast_radius_score")
        .expect("field present") = json!(1.5);

    assert!(!document_validator.is_valid(&record));

    let execution =
        jsonschema::validator_for(&LayerSchema::for_layer(Layer::Execution).to_json_schema())
            .expect("layer schema compiles");
    let paths: Vec<String> = execution
        .iter_errors(&record)
        .map(|error| error.instance_path.to_string())
        .collect();
    assert_eq!(paths, vec!["/violation_mechanics/blast_radius_score"]);

    let violations = validate(&record, &LayerSchema::for_layer(Layer::Execution));
    let native: Vec<&str> = violations
        .iter()
        .map(|violation| violation.path.as_str())
        .collect();
    assert_eq!(native, vec!["violation_mechanics.blast_radius_score"]);
}

#[rstest]
#[case::intent(Layer::Intent, "cloud_context", json!({ "provider": "aws" }))]
#[case::remediation(Layer::Remediation, "record_id", json!("REMED_1"))]
fn layer_schemas_reject_malformed_records(
    generator: DatasetGenerator,
    #[case] layer: Layer,
    #[case] field: &str,
    #[case] replacement: Value,
) {
    let output = generator
        .generate_layer(7, layer, 1)
        .expect("generation succeeds");
    let mut record = records(&output.bytes)
        .into_iter()
        .next()
        .expect("one record");
    record
        .as_object_mut()
        .expect("record is an object")
        .insert(field.to_owned(), replacement);

    let validator = jsonschema::validator_for(&LayerSchema::for_layer(layer).to_json_schema())
        .expect("layer schema compiles");
    assert!(!validator.is_valid(&record));
    assert!(!validate(&record, &LayerSchema::for_layer(layer)).is_empty());
}
