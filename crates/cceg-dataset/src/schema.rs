//! Per-layer record schemas.
//!
//! A [`LayerSchema`] lists every field a layer emits with the rule its value
//! must satisfy. The same tree drives the in-process validator and the
//! Draft-07 JSON Schema shipped beside the dataset, so third parties check
//! exactly what the generator checks.

use serde_json::{Map, Value, json};

use crate::layer::{Layer, VENDOR_NEUTRAL};
use crate::patterns::RemediationStrategy;
use crate::unit::{ComplianceStatus, FixEffort, MlUseCase, PatternClass, Severity};
use crate::vocabulary::{CLOUD_PROVIDER, ControlFamily, Vocabulary};

/// JSON Schema dialect of the exported document.
pub const JSON_SCHEMA_DIALECT: &str = "http://json-schema.org/draft-07/schema#";

/// The constraint on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// A non-empty string.
    Text,
    /// A string drawn from a closed set.
    Enum(Vec<&'static str>),
    /// A number in `[0, 1]`.
    UnitInterval,
    /// Any number.
    Number,
    /// A boolean.
    Boolean,
    /// A non-empty, duplicate-free array of strings from a closed set.
    TagSet(Vec<&'static str>),
    /// A non-empty array of non-empty strings.
    TextList,
    /// `<PREFIX>_` followed by at least six digits.
    RecordId(&'static str),
    /// A nested object with its own fields.
    Object(Vec<FieldSpec>),
}

/// A named field and its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Constraint on the value.
    pub rule: FieldRule,
}

const fn field(name: &'static str, rule: FieldRule) -> FieldSpec {
    FieldSpec { name, rule }
}

fn labels<T: Copy>(values: &[T], label: fn(T) -> &'static str) -> Vec<&'static str> {
    values.iter().map(|value| label(*value)).collect()
}

/// The schema for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSchema {
    layer: Layer,
    fields: Vec<FieldSpec>,
}

impl LayerSchema {
    /// Builds the schema for `layer` over the built-in vocabulary.
    #[must_use]
    pub fn for_layer(layer: Layer) -> Self {
        Self::with_vocabulary(layer, &Vocabulary::builtin())
    }

    /// Builds the schema for `layer` over `vocabulary`.
    #[must_use]
    pub fn with_vocabulary(layer: Layer, vocabulary: &Vocabulary) -> Self {
        let fields = match layer {
            Layer::Intent => vec![
                field("record_id", FieldRule::RecordId(layer.prefix())),
                control_family(),
                intent_vector(vocabulary),
                field("abstraction_level", FieldRule::Enum(vec![VENDOR_NEUTRAL])),
                field(
                    "standard_mappings",
                    FieldRule::Object(vec![
                        field("nist_800_53", FieldRule::Text),
                        field("cis", FieldRule::Text),
                        field("iso_27001", FieldRule::Text),
                    ]),
                ),
                use_cases(),
            ],
            Layer::Execution => vec![
                field("record_id", FieldRule::RecordId(layer.prefix())),
                control_family(),
                intent_vector(vocabulary),
                field(
                    "cloud_context",
                    FieldRule::Object(vec![
                        field("provider", FieldRule::Enum(vec![CLOUD_PROVIDER])),
                        field("service", FieldRule::Enum(vocabulary.service_names())),
                        field(
                            "resource_type",
                            FieldRule::Enum(vocabulary.resource_type_names()),
                        ),
                        field(
                            "region",
                            FieldRule::Enum(vocabulary.regions.elements().to_vec()),
                        ),
                    ]),
                ),
                field(
                    "infrastructure_pattern",
                    FieldRule::Object(vec![
                        pattern_id(vocabulary),
                        pattern_class(),
                        field("pattern_complexity", FieldRule::UnitInterval),
                    ]),
                ),
                field(
                    "compliance_state",
                    FieldRule::Object(vec![
                        field(
                            "status",
                            FieldRule::Enum(labels(
                                &ComplianceStatus::ALL,
                                ComplianceStatus::as_str,
                            )),
                        ),
                        field("confidence", FieldRule::UnitInterval),
                    ]),
                ),
                field(
                    "violation_mechanics",
                    FieldRule::Object(vec![
                        field("failure_mode", FieldRule::Text),
                        field("attack_surface", FieldRule::Text),
                        field("blast_radius_score", FieldRule::UnitInterval),
                    ]),
                ),
                field(
                    "evidence_model",
                    FieldRule::Object(vec![
                        field("terraform_signal", FieldRule::Text),
                        field("runtime_signal", FieldRule::Text),
                        field("static_detectable", FieldRule::Boolean),
                    ]),
                ),
                field(
                    "labeling",
                    FieldRule::Object(vec![
                        field(
                            "severity",
                            FieldRule::Enum(labels(&Severity::ALL, Severity::as_str)),
                        ),
                        use_cases(),
                    ]),
                ),
            ],
            Layer::Remediation => vec![
                field("record_id", FieldRule::RecordId(layer.prefix())),
                field(
                    "problem_pattern",
                    FieldRule::Object(vec![
                        pattern_id(vocabulary),
                        pattern_class(),
                        field("failure_mode", FieldRule::Text),
                        field(
                            "affected_resource",
                            FieldRule::Enum(vocabulary.resource_type_names()),
                        ),
                    ]),
                ),
                field(
                    "remediation_logic",
                    FieldRule::Object(vec![
                        field(
                            "strategy",
                            FieldRule::Enum(labels(
                                &RemediationStrategy::ALL,
                                RemediationStrategy::as_str,
                            )),
                        ),
                        field("automation_feasible", FieldRule::Boolean),
                        field(
                            "estimated_fix_effort",
                            FieldRule::Enum(labels(&FixEffort::ALL, FixEffort::as_str)),
                        ),
                        field("implementation_steps", FieldRule::TextList),
                        field("verification_checks", FieldRule::TextList),
                        field("rollback_complexity", FieldRule::UnitInterval),
                    ]),
                ),
                field(
                    "cost_impact",
                    FieldRule::Object(vec![
                        field("aws_cost_delta", FieldRule::Number),
                        field("operational_overhead", FieldRule::UnitInterval),
                        field("risk_reduction_score", FieldRule::UnitInterval),
                    ]),
                ),
                field(
                    "ai_training_signals",
                    FieldRule::Object(vec![
                        field("can_autofix", FieldRule::Boolean),
                        field("requires_approval", FieldRule::Boolean),
                        field("context_complexity", FieldRule::UnitInterval),
                    ]),
                ),
            ],
        };
        Self { layer, fields }
    }

    /// Layer this schema describes.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Top-level fields in emission order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Renders the schema as a Draft-07 JSON Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut schema = object_schema(&self.fields);
        if let Value::Object(map) = &mut schema {
            map.insert(
                "title".to_owned(),
                Value::String(format!("CCEG {} record", self.layer)),
            );
        }
        schema
    }
}

fn control_family() -> FieldSpec {
    field(
        "control_family",
        FieldRule::Enum(labels(&ControlFamily::ALL, ControlFamily::as_str)),
    )
}

fn intent_vector(vocabulary: &Vocabulary) -> FieldSpec {
    field(
        "control_intent_vector",
        FieldRule::Object(vec![
            field("objective", FieldRule::Enum(vocabulary.objective_names())),
            field(
                "asset_class",
                FieldRule::Enum(vocabulary.asset_classes.elements().to_vec()),
            ),
            field(
                "risk_domain",
                FieldRule::Enum(vocabulary.risk_domains.elements().to_vec()),
            ),
        ]),
    )
}

fn pattern_id(vocabulary: &Vocabulary) -> FieldSpec {
    field(
        "pattern_id",
        FieldRule::Enum(vocabulary.pattern_ids.elements().to_vec()),
    )
}

fn pattern_class() -> FieldSpec {
    field(
        "pattern_class",
        FieldRule::Enum(labels(&PatternClass::ALL, PatternClass::as_str)),
    )
}

fn use_cases() -> FieldSpec {
    field(
        "ml_use_case",
        FieldRule::TagSet(labels(&MlUseCase::ALL, MlUseCase::as_str)),
    )
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let required: Vec<Value> = fields
        .iter()
        .map(|spec| Value::String(spec.name.to_owned()))
        .collect();
    let properties: Map<String, Value> = fields
        .iter()
        .map(|spec| (spec.name.to_owned(), rule_schema(&spec.rule)))
        .collect();
    json!({
        "type": "object",
        "required": required,
        "properties": properties,
        "additionalProperties": false,
    })
}

fn rule_schema(rule: &FieldRule) -> Value {
    match rule {
        FieldRule::Text => json!({ "type": "string", "minLength": 1 }),
        FieldRule::Enum(values) => json!({ "type": "string", "enum": values }),
        FieldRule::UnitInterval => json!({ "type": "number", "minimum": 0, "maximum": 1 }),
        FieldRule::Number => json!({ "type": "number" }),
        FieldRule::Boolean => json!({ "type": "boolean" }),
        FieldRule::TagSet(values) => json!({
            "type": "array",
            "minItems": 1,
            "uniqueItems": true,
            "items": { "type": "string", "enum": values },
        }),
        FieldRule::TextList => json!({
            "type": "array",
            "minItems": 1,
            "items": { "type": "string", "minLength": 1 },
        }),
        FieldRule::RecordId(prefix) => json!({
            "type": "string",
            "pattern": format!("^{prefix}_[0-9]{{6,}}$"),
        }),
        FieldRule::Object(fields) => object_schema(fields),
    }
}

/// Bundles the three layer schemas into one Draft-07 document.
#[must_use]
pub fn schema_document() -> Value {
    let definitions: Map<String, Value> = Layer::ALL
        .into_iter()
        .map(|layer| {
            (
                layer.as_str().to_owned(),
                LayerSchema::for_layer(layer).to_json_schema(),
            )
        })
        .collect();
    let variants: Vec<Value> = Layer::ALL
        .into_iter()
        .map(|layer| json!({ "$ref": format!("#/definitions/{layer}") }))
        .collect();
    json!({
        "$schema": JSON_SCHEMA_DIALECT,
        "title": "Cloud Compliance Execution Graph dataset",
        "definitions": definitions,
        "oneOf": variants,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Layer::Intent, 6)]
    #[case(Layer::Execution, 9)]
    #[case(Layer::Remediation, 5)]
    fn top_level_field_counts(#[case] layer: Layer, #[case] expected: usize) {
        assert_eq!(LayerSchema::for_layer(layer).fields().len(), expected);
    }

    #[test]
    fn intent_schema_names_no_cloud_fields() {
        let schema = LayerSchema::for_layer(Layer::Intent);
        let names: Vec<&str> = schema.fields().iter().map(|spec| spec.name).collect();
        for cloud_field in ["cloud_context", "evidence_model", "infrastructure_pattern"] {
            assert!(!names.contains(&cloud_field));
        }
    }

    #[test]
    fn json_schema_closes_every_object() {
        fn assert_closed(value: &Value) {
            if value.get("type") == Some(&json!("object")) {
                assert_eq!(value.get("additionalProperties"), Some(&json!(false)));
            }
            if let Some(Value::Object(properties)) = value.get("properties") {
                properties.values().for_each(assert_closed);
            }
        }
        for layer in Layer::ALL {
            assert_closed(&LayerSchema::for_layer(layer).to_json_schema());
        }
    }

    #[test]
    fn unit_interval_renders_bounds() {
        let schema = LayerSchema::for_layer(Layer::Execution).to_json_schema();
        let blast = schema
            .pointer("/properties/violation_mechanics/properties/blast_radius_score")
            .expect("field present");
        assert_eq!(blast, &json!({ "type": "number", "minimum": 0, "maximum": 1 }));
    }

    #[test]
    fn record_id_pattern_uses_layer_prefix() {
        let schema = LayerSchema::for_layer(Layer::Remediation).to_json_schema();
        assert_eq!(
            schema.pointer("/properties/record_id/pattern"),
            Some(&json!("^REMED_[0-9]{6,}$"))
        );
    }

    #[test]
    fn document_bundles_all_layers() {
        let document = schema_document();
        assert_eq!(document.get("$schema"), Some(&json!(JSON_SCHEMA_DIALECT)));
        for layer in Layer::ALL {
            assert!(
                document
                    .pointer(&format!("/definitions/{layer}/properties/record_id"))
                    .is_some()
            );
        }
    }
}
