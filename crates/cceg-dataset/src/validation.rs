//! Record validation against a [`LayerSchema`].
//!
//! The validator runs in collect-all mode and never mutates or coerces the
//! record it checks. It enforces:
//!
//! - every schema field is present, and no other field is
//! - strings are non-empty and enum values belong to their closed set
//! - normalized scores lie in `[0, 1]` inclusive
//! - tag sets are non-empty and free of duplicates
//! - record ids carry the layer prefix followed by at least six digits
//!
//! [`validate_jsonl`] applies the same checks to a line-delimited file and
//! additionally reports malformed lines and repeated record ids.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead};

use serde_json::{Map, Value};

use crate::layer::Layer;
use crate::schema::{FieldRule, FieldSpec, LayerSchema};

/// Minimum digits after a record id prefix.
pub const RECORD_ID_MIN_DIGITS: usize = 6;

/// What was wrong with a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent.
    MissingField,
    /// The value has the wrong JSON type.
    TypeMismatch {
        /// Expected type description.
        expected: &'static str,
    },
    /// A string is outside its closed set.
    NotInEnum {
        /// The rejected value.
        value: String,
    },
    /// A score lies outside `[0, 1]`.
    OutOfRange {
        /// The rejected value as written.
        value: String,
    },
    /// A required array is empty.
    EmptyArray,
    /// A tag appears twice in one set.
    DuplicateMember {
        /// The repeated tag.
        value: String,
    },
    /// A record id lacks the layer prefix or its digits.
    InvalidRecordId {
        /// The rejected id.
        value: String,
    },
    /// A field the layer does not allow.
    UnexpectedField,
    /// A line is not valid JSON.
    MalformedJson {
        /// Parser message.
        message: String,
    },
    /// A record id already seen in the same file.
    DuplicateRecordId {
        /// The repeated id.
        value: String,
    },
    /// The record is not a JSON object.
    NotAnObject,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => f.write_str("required field is missing"),
            Self::TypeMismatch { expected } => write!(f, "expected {expected}"),
            Self::NotInEnum { value } => write!(f, "value {value} is not an allowed value"),
            Self::OutOfRange { value } => write!(f, "value {value} is outside [0, 1]"),
            Self::EmptyArray => f.write_str("array must not be empty"),
            Self::DuplicateMember { value } => write!(f, "value {value} appears more than once"),
            Self::InvalidRecordId { value } => {
                write!(f, "record id {value} does not match the layer prefix")
            }
            Self::UnexpectedField => f.write_str("field is not allowed in this layer"),
            Self::MalformedJson { message } => write!(f, "malformed JSON: {message}"),
            Self::DuplicateRecordId { value } => {
                write!(f, "record id {value} already appeared in this file")
            }
            Self::NotAnObject => f.write_str("record is not a JSON object"),
        }
    }
}

/// A single problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the offending value; `$` is the record itself.
    pub path: String,
    /// What was wrong.
    pub kind: ViolationKind,
}

impl Violation {
    /// Creates a violation at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Checks `record` against `schema` and returns every violation found.
///
/// # Example
///
/// ```
/// use cceg_dataset::{Layer, LayerSchema, ViolationKind, validate};
/// use serde_json::json;
///
/// let schema = LayerSchema::for_layer(Layer::Intent);
/// let violations = validate(&json!({ "record_id": "INT_000001" }), &schema);
///
/// assert!(violations.iter().all(|v| v.kind == ViolationKind::MissingField));
/// assert_eq!(violations.len(), 5);
/// ```
#[must_use]
pub fn validate(record: &Value, schema: &LayerSchema) -> Vec<Violation> {
    let mut violations = Vec::new();
    match record.as_object() {
        Some(map) => check_object(map, schema.fields(), "", &mut violations),
        None => violations.push(Violation::new("$", ViolationKind::NotAnObject)),
    }
    violations
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}.{name}")
    }
}

fn check_object(
    map: &Map<String, Value>,
    fields: &[FieldSpec],
    parent: &str,
    violations: &mut Vec<Violation>,
) {
    for spec in fields {
        let path = join(parent, spec.name);
        match map.get(spec.name) {
            Some(value) => check_value(value, &spec.rule, &path, violations),
            None => violations.push(Violation::new(path, ViolationKind::MissingField)),
        }
    }
    for key in map.keys() {
        if !fields.iter().any(|spec| spec.name == key.as_str()) {
            violations.push(Violation::new(join(parent, key), ViolationKind::UnexpectedField));
        }
    }
}

fn check_value(value: &Value, rule: &FieldRule, path: &str, violations: &mut Vec<Violation>) {
    let mismatch = |expected| Violation::new(path, ViolationKind::TypeMismatch { expected });
    match rule {
        FieldRule::Text => match value.as_str() {
            Some(text) if !text.is_empty() => {}
            _ => violations.push(mismatch("non-empty string")),
        },
        FieldRule::Enum(allowed) => match value.as_str() {
            Some(text) if allowed.iter().any(|candidate| *candidate == text) => {}
            Some(text) => violations.push(Violation::new(
                path,
                ViolationKind::NotInEnum {
                    value: text.to_owned(),
                },
            )),
            None => violations.push(mismatch("string")),
        },
        FieldRule::UnitInterval => match value.as_f64() {
            Some(score) if (0.0..=1.0).contains(&score) => {}
            Some(_) => violations.push(Violation::new(
                path,
                ViolationKind::OutOfRange {
                    value: value.to_string(),
                },
            )),
            None => violations.push(mismatch("number")),
        },
        FieldRule::Number => {
            if !value.is_number() {
                violations.push(mismatch("number"));
            }
        }
        FieldRule::Boolean => {
            if !value.is_boolean() {
                violations.push(mismatch("boolean"));
            }
        }
        FieldRule::TagSet(allowed) => check_tags(value, allowed, path, violations),
        FieldRule::TextList => check_text_list(value, path, violations),
        FieldRule::RecordId(prefix) => match value.as_str() {
            Some(id) if is_record_id(id, prefix) => {}
            Some(id) => violations.push(Violation::new(
                path,
                ViolationKind::InvalidRecordId {
                    value: id.to_owned(),
                },
            )),
            None => violations.push(mismatch("string")),
        },
        FieldRule::Object(fields) => match value.as_object() {
            Some(map) => check_object(map, fields, path, violations),
            None => violations.push(mismatch("object")),
        },
    }
}

fn check_tags(value: &Value, allowed: &[&str], path: &str, violations: &mut Vec<Violation>) {
    let Some(items) = value.as_array() else {
        violations.push(Violation::new(
            path,
            ViolationKind::TypeMismatch { expected: "array" },
        ));
        return;
    };
    if items.is_empty() {
        violations.push(Violation::new(path, ViolationKind::EmptyArray));
    }
    let mut seen = HashSet::new();
    for (position, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{position}]");
        match item.as_str() {
            Some(tag) if !allowed.iter().any(|candidate| *candidate == tag) => {
                violations.push(Violation::new(
                    item_path,
                    ViolationKind::NotInEnum {
                        value: tag.to_owned(),
                    },
                ));
            }
            Some(tag) if !seen.insert(tag) => violations.push(Violation::new(
                item_path,
                ViolationKind::DuplicateMember {
                    value: tag.to_owned(),
                },
            )),
            Some(_) => {}
            None => violations.push(Violation::new(
                item_path,
                ViolationKind::TypeMismatch { expected: "string" },
            )),
        }
    }
}

fn check_text_list(value: &Value, path: &str, violations: &mut Vec<Violation>) {
    let Some(items) = value.as_array() else {
        violations.push(Violation::new(
            path,
            ViolationKind::TypeMismatch { expected: "array" },
        ));
        return;
    };
    if items.is_empty() {
        violations.push(Violation::new(path, ViolationKind::EmptyArray));
    }
    for (position, item) in items.iter().enumerate() {
        if !item.as_str().is_some_and(|text| !text.is_empty()) {
            violations.push(Violation::new(
                format!("{path}[{position}]"),
                ViolationKind::TypeMismatch {
                    expected: "non-empty string",
                },
            ));
        }
    }
}

fn is_record_id(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|digits| {
            digits.len() >= RECORD_ID_MIN_DIGITS && digits.bytes().all(|byte| byte.is_ascii_digit())
        })
}

/// One failing line of a JSONL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// One-based line number.
    pub line: usize,
    /// Record id when one could be read.
    pub record_id: Option<String>,
    /// Every violation on the line.
    pub violations: Vec<Violation>,
}

/// Outcome of validating one JSONL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Layer the file was checked against.
    pub layer: Layer,
    /// Non-blank lines read.
    pub total: usize,
    /// Lines without violations.
    pub valid: usize,
    /// Lines with at least one violation.
    pub invalid: usize,
    /// Failing lines in file order.
    pub failures: Vec<LineFailure>,
}

impl FileReport {
    const fn new(layer: Layer) -> Self {
        Self {
            layer,
            total: 0,
            valid: 0,
            invalid: 0,
            failures: Vec::new(),
        }
    }

    /// Returns `true` when no line failed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.invalid == 0
    }

    /// Renders a human-readable summary listing at most `max_failures`
    /// failing lines.
    #[must_use]
    pub fn render(&self, max_failures: usize) -> String {
        RenderedReport {
            report: self,
            max_failures,
        }
        .to_string()
    }
}

struct RenderedReport<'a> {
    report: &'a FileReport,
    max_failures: usize,
}

impl fmt::Display for RenderedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "layer: {}", report.layer)?;
        writeln!(f, "total records:   {}", report.total)?;
        writeln!(f, "valid records:   {}", report.valid)?;
        writeln!(f, "invalid records: {}", report.invalid)?;
        for failure in report.failures.iter().take(self.max_failures) {
            writeln!(
                f,
                "line {}, record {}:",
                failure.line,
                failure.record_id.as_deref().unwrap_or("unknown")
            )?;
            for violation in &failure.violations {
                writeln!(f, "  - {violation}")?;
            }
        }
        let hidden = report.failures.len().saturating_sub(self.max_failures);
        if hidden > 0 {
            writeln!(f, "... and {hidden} more failing records")?;
        }
        Ok(())
    }
}

/// Validates every non-blank line of a JSONL stream.
///
/// # Errors
///
/// Returns the underlying I/O error if a line cannot be read.
pub fn validate_jsonl<R: BufRead>(reader: R, schema: &LayerSchema) -> io::Result<FileReport> {
    let mut report = FileReport::new(schema.layer());
    let mut seen_ids = HashSet::new();
    for (offset, line) in reader.lines().enumerate() {
        let text = line?;
        if text.trim().is_empty() {
            continue;
        }
        report.total += 1;
        let (record_id, violations) = match serde_json::from_str::<Value>(&text) {
            Ok(record) => {
                let id = record
                    .get("record_id")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                let mut found = validate(&record, schema);
                if let Some(current) = &id {
                    if !seen_ids.insert(current.clone()) {
                        found.push(Violation::new(
                            "record_id",
                            ViolationKind::DuplicateRecordId {
                                value: current.clone(),
                            },
                        ));
                    }
                }
                (id, found)
            }
            Err(err) => (
                None,
                vec![Violation::new(
                    "$",
                    ViolationKind::MalformedJson {
                        message: err.to_string(),
                    },
                )],
            ),
        };
        if violations.is_empty() {
            report.valid += 1;
        } else {
            report.invalid += 1;
            report.failures.push(LineFailure {
                line: offset + 1,
                record_id,
                violations,
            });
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    //! Covers each rule, collect-all reporting and JSONL file checks.

    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn execution_record() -> Value {
        json!({
            "record_id": "EXEC_000001",
            "control_family": "AC",
            "control_intent_vector": {
                "objective": "access_restriction",
                "asset_class": "identity",
                "risk_domain": "privilege_escalation"
            },
            "cloud_context": {
                "provider": "aws",
                "service": "iam",
                "resource_type": "aws_iam_role",
                "region": "us-east-1"
            },
            "infrastructure_pattern": {
                "pattern_id": "PAT_IDENTITY_TRUST_101",
                "pattern_class": "identity_trust",
                "pattern_complexity": 0.62
            },
            "compliance_state": { "status": "non_compliant", "confidence": 0.91 },
            "violation_mechanics": {
                "failure_mode": "overly_permissive_trust_policy",
                "attack_surface": "cross_account_assume_role",
                "blast_radius_score": 0.85
            },
            "evidence_model": {
                "terraform_signal": "assume_role_policy",
                "runtime_signal": "cloudtrail:AssumeRole",
                "static_detectable": true
            },
            "labeling": { "severity": "high", "ml_use_case": ["risk_scoring"] }
        })
    }

    fn execution_schema() -> LayerSchema {
        LayerSchema::for_layer(Layer::Execution)
    }

    fn set(record: &mut Value, pointer: &str, value: Value) {
        *record.pointer_mut(pointer).expect("pointer exists") = value;
    }

    #[rstest]
    fn well_formed_record_passes(execution_record: Value) {
        assert_eq!(validate(&execution_record, &execution_schema()), vec![]);
    }

    #[rstest]
    fn out_of_range_score_is_reported_not_clamped(mut execution_record: Value) {
        set(
            &mut execution_record,
            "/violation_mechanics/blast_radius_score",
            json!(1.5),
        );
        let before = execution_record.clone();
        let violations = validate(&execution_record, &execution_schema());
        assert_eq!(
            violations,
            vec![Violation::new(
                "violation_mechanics.blast_radius_score",
                ViolationKind::OutOfRange {
                    value: "1.5".to_owned()
                },
            )]
        );
        assert_eq!(execution_record, before);
    }

    #[rstest]
    fn every_violation_is_collected(mut execution_record: Value) {
        set(&mut execution_record, "/control_family", json!("ZZ"));
        set(&mut execution_record, "/compliance_state/confidence", json!(-0.1));
        set(&mut execution_record, "/labeling/ml_use_case", json!([]));
        set(&mut execution_record, "/evidence_model/static_detectable", json!("yes"));
        let violations = validate(&execution_record, &execution_schema());
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "control_family",
                "compliance_state.confidence",
                "evidence_model.static_detectable",
                "labeling.ml_use_case",
            ]
        );
    }

    #[rstest]
    fn duplicate_tags_are_reported(mut execution_record: Value) {
        set(
            &mut execution_record,
            "/labeling/ml_use_case",
            json!(["risk_scoring", "risk_scoring"]),
        );
        assert_eq!(
            validate(&execution_record, &execution_schema()),
            vec![Violation::new(
                "labeling.ml_use_case[1]",
                ViolationKind::DuplicateMember {
                    value: "risk_scoring".to_owned()
                },
            )]
        );
    }

    #[rstest]
    fn missing_and_unexpected_fields_are_reported(mut execution_record: Value) {
        let map = execution_record.as_object_mut().expect("object");
        map.remove("labeling");
        map.insert("generated_at".to_owned(), json!("2026-01-08T00:00:00Z"));
        assert_eq!(
            validate(&execution_record, &execution_schema()),
            vec![
                Violation::new("labeling", ViolationKind::MissingField),
                Violation::new("generated_at", ViolationKind::UnexpectedField),
            ]
        );
    }

    #[rstest]
    #[case("EXEC_000001", true)]
    #[case("EXEC_1234567", true)]
    #[case("EXEC_00001", false)]
    #[case("INT_000001", false)]
    #[case("EXEC000001", false)]
    #[case("EXEC_00000a", false)]
    fn record_id_format(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(is_record_id(id, "EXEC"), valid);
    }

    #[test]
    fn cloud_fields_are_rejected_in_intent_layer() {
        let record = json!({
            "record_id": "INT_000001",
            "control_family": "AU",
            "control_intent_vector": {
                "objective": "audit_logging",
                "asset_class": "compute",
                "risk_domain": "data_exfiltration"
            },
            "abstraction_level": "vendor_neutral",
            "standard_mappings": { "nist_800_53": "AU-2", "cis": "8.2", "iso_27001": "A.8.15" },
            "ml_use_case": ["anomaly_detection"],
            "cloud_context": { "provider": "aws" }
        });
        let violations = validate(&record, &LayerSchema::for_layer(Layer::Intent));
        assert_eq!(
            violations,
            vec![Violation::new("cloud_context", ViolationKind::UnexpectedField)]
        );
    }

    #[test]
    fn non_object_record_is_rejected() {
        assert_eq!(
            validate(&json!([1, 2]), &execution_schema()),
            vec![Violation::new("$", ViolationKind::NotAnObject)]
        );
    }

    #[rstest]
    fn jsonl_report_counts_lines_and_flags_problems(execution_record: Value) {
        let line = serde_json::to_string(&execution_record).expect("serialize");
        let input = format!("{line}\n\n{line}\n{{not json\n");
        let report =
            validate_jsonl(input.as_bytes(), &execution_schema()).expect("in-memory read");
        assert_eq!(report.total, 3);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid, 2);
        assert!(!report.is_valid());

        let duplicate = report.failures.first().expect("duplicate line reported");
        assert_eq!(duplicate.line, 3);
        assert_eq!(
            duplicate.violations,
            vec![Violation::new(
                "record_id",
                ViolationKind::DuplicateRecordId {
                    value: "EXEC_000001".to_owned()
                },
            )]
        );

        let malformed = report.failures.last().expect("malformed line reported");
        assert_eq!(malformed.line, 4);
        assert_eq!(malformed.record_id, None);
        assert!(matches!(
            malformed.violations.first().map(|v| &v.kind),
            Some(ViolationKind::MalformedJson { .. })
        ));
    }

    #[rstest]
    fn render_truncates_failure_list(execution_record: Value) {
        let mut bad = execution_record;
        set(&mut bad, "/compliance_state/status", json!("unknown"));
        let line = serde_json::to_string(&bad).expect("serialize");
        let other = line.replace("EXEC_000001", "EXEC_000002");
        let input = format!("{line}\n{other}\n");
        let report = validate_jsonl(input.as_bytes(), &execution_schema()).expect("read");
        let rendered = report.render(1);
        assert!(rendered.contains("invalid records: 2"));
        assert!(rendered.contains("line 1, record EXEC_000001:"));
        assert!(
            rendered.contains("compliance_state.status: value unknown is not an allowed value")
        );
        assert!(!rendered.contains("line 2"));
        assert!(rendered.contains("... and 1 more failing records"));
    }
}
