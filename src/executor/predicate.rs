//! WHERE clause evaluation
//!
//! A record survives when every condition holds. Placeholder slots are
//! fixed at parse time, so the same parameter list binds identically for
//! every record scanned.

use serde_json::Value;

use crate::sql::ast::{CompareOp, Condition};
use crate::storage::Record;

/// Keep the records satisfying all conditions
pub fn filter(records: Vec<Record>, conditions: &[Condition], params: &[Value]) -> Vec<Record> {
    if conditions.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| matches_all(record, conditions, params))
        .collect()
}

pub fn matches_all(record: &Record, conditions: &[Condition], params: &[Value]) -> bool {
    conditions
        .iter()
        .all(|condition| matches(record, condition, params))
}

fn matches(record: &Record, condition: &Condition, params: &[Value]) -> bool {
    match condition {
        Condition::Always | Condition::Unsupported(_) => true,
        Condition::Compare {
            column,
            op,
            operand,
        } => {
            let expected = operand.resolve(params);
            let actual = record.get(column.field());
            match op {
                // A missing field equals a missing parameter
                CompareOp::Eq => actual == expected,
                CompareOp::Like => match expected {
                    None | Some(Value::Null) => false,
                    Some(pattern) => like_match(&text_of(actual), &text_of(Some(pattern))),
                },
            }
        }
    }
}

/// Case-insensitive `%` wildcard match, unanchored at both ends
///
/// Every character other than `%` is literal, so `ReactJS%` also matches
/// `"Vue, ReactJS, Go"`.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();

    let mut rest = value.as_str();
    for segment in pattern.split('%').filter(|s| !s.is_empty()) {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    true
}

/// Text form used by pattern matching and ordering; absent and null are empty
pub fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::{ColumnRef, Operand};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn projects() -> Vec<Record> {
        vec![
            record(json!({"id": "p1", "status": "open", "skills": "ReactJS, Node"})),
            record(json!({"id": "p2", "status": "open", "skills": "Rust"})),
            record(json!({"id": "p3", "status": "completed", "skills": "reactjs"})),
        ]
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_like_wildcard() {
        assert!(like_match("Vue, ReactJS, Go", "%ReactJS%"));
        assert!(like_match("vue, reactjs", "%ReactJS%"));
        assert!(!like_match("Vue, Angular", "%ReactJS%"));
        assert!(like_match("Vue, ReactJS", "ReactJS"));
        assert!(like_match("anything", ""));
        assert!(like_match("react and node", "react%node"));
        assert!(!like_match("node and react", "react%node"));
    }

    #[test]
    fn test_always_and_equality() {
        let conditions = vec![
            Condition::Always,
            Condition::eq(ColumnRef::qualified("p", "status"), Operand::Param(0)),
        ];

        let rows = filter(projects(), &conditions, &[json!("open")]);
        assert_eq!(ids(&rows), vec!["p1", "p2"]);
    }

    #[test]
    fn test_params_bind_the_same_for_every_record() {
        let conditions = vec![
            Condition::eq("status", Operand::Param(0)),
            Condition::like("skills", Operand::Param(1)),
        ];

        let rows = filter(projects(), &conditions, &[json!("open"), json!("%react%")]);
        assert_eq!(ids(&rows), vec!["p1"]);
    }

    #[test]
    fn test_equality_is_exact() {
        let rows = vec![
            record(json!({"id": "a", "rating": 5})),
            record(json!({"id": "b", "rating": "5"})),
        ];
        let conditions = vec![Condition::eq("rating", Operand::Param(0))];

        assert_eq!(ids(&filter(rows, &conditions, &[json!(5)])), vec!["a"]);
    }

    #[test]
    fn test_absent_parameter_equals_missing_field() {
        let rows = vec![
            record(json!({"id": "u1"})),
            record(json!({"id": "u2", "email": "a@b.edu"})),
            record(json!({"id": "u3", "email": null})),
        ];
        let conditions = vec![Condition::eq("email", Operand::Param(0))];

        assert_eq!(ids(&filter(rows, &conditions, &[])), vec!["u1"]);
        assert_eq!(filter(projects(), &conditions, &[]).len(), 3);
    }

    #[test]
    fn test_like_with_absent_parameter_matches_nothing() {
        let conditions = vec![Condition::like("skills", Operand::Param(0))];
        assert!(filter(projects(), &conditions, &[]).is_empty());
    }

    #[test]
    fn test_like_on_missing_field_reads_empty() {
        let rows = vec![record(json!({"id": "x"}))];
        let conditions = vec![Condition::like("skills", Operand::Param(0))];

        assert_eq!(filter(rows.clone(), &conditions, &[json!("%")]).len(), 1);
        assert!(filter(rows, &conditions, &[json!("%go%")]).is_empty());
    }

    #[test]
    fn test_unsupported_condition_passes() {
        let conditions = vec![Condition::Unsupported("rating > 3".to_string())];
        assert_eq!(filter(projects(), &conditions, &[]).len(), 3);
    }

    #[test]
    fn test_text_of() {
        assert_eq!(text_of(None), "");
        assert_eq!(text_of(Some(&Value::Null)), "");
        assert_eq!(text_of(Some(&json!("x"))), "x");
        assert_eq!(text_of(Some(&json!(4.5))), "4.5");
        assert_eq!(text_of(Some(&json!(true))), "true");
    }
}
