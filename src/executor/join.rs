//! Join resolution
//!
//! Each join left-enriches every driving record with the first record of the
//! joined collection whose right-hand field equals the driving record's
//! left-hand field. Driving fields win on key collisions, unmatched records
//! pass through untouched, and no join ever multiplies rows.

use crate::sql::ast::Join;
use crate::storage::{Document, Record};

/// Apply joins in clause order, each consuming the previous join's output
pub fn apply_joins(records: Vec<Record>, joins: &[Join], document: &Document) -> Vec<Record> {
    joins.iter().fold(records, |records, join| {
        let joined = document.collection(&join.table.name);
        records
            .into_iter()
            .map(|record| enrich(record, join, joined))
            .collect()
    })
}

fn enrich(record: Record, join: &Join, joined: &[Record]) -> Record {
    // A driving record without the join field has nothing to match on
    let Some(key) = record.get(join.left.field()) else {
        return record;
    };

    let Some(found) = joined
        .iter()
        .find(|candidate| candidate.get(join.right.field()) == Some(key))
    else {
        return record;
    };

    let mut merged = found.clone();
    for (field, value) in record {
        merged.insert(field, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::TableRef;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn marketplace() -> Document {
        let mut document = Document::new();
        let users = document.collection_mut("users");
        users.push(record(json!({"id": "u1", "name": "Acme", "university": "Acme"})));
        users.push(record(json!({"id": "u2", "name": "Ada", "university": "MIT"})));
        let projects = document.collection_mut("projects");
        projects.push(record(json!({"id": "p1", "company_id": "u1", "title": "Site"})));
        projects.push(record(json!({"id": "p2", "company_id": "u9", "title": "Orphan"})));
        document
    }

    #[test]
    fn test_driving_fields_win() {
        let document = marketplace();
        let join = Join::new(TableRef::new("users").with_alias("u"), "p.company_id", "u.id");

        let rows = apply_joins(document.collection("projects").to_vec(), &[join], &document);

        assert_eq!(rows[0]["id"], json!("p1"));
        assert_eq!(rows[0]["name"], json!("Acme"));
        assert_eq!(rows[0]["title"], json!("Site"));
    }

    #[test]
    fn test_unmatched_rows_are_kept() {
        let document = marketplace();
        let join = Join::new(TableRef::new("users"), "company_id", "id");

        let rows = apply_joins(document.collection("projects").to_vec(), &[join], &document);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], document.collection("projects")[1]);
    }

    #[test]
    fn test_first_match_only() {
        let mut document = marketplace();
        document
            .collection_mut("users")
            .push(record(json!({"id": "u1", "name": "Shadow"})));
        let join = Join::new(TableRef::new("users"), "company_id", "id");

        let rows = apply_joins(document.collection("projects").to_vec(), &[join], &document);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("Acme"));
    }

    #[test]
    fn test_chained_joins() {
        let mut document = marketplace();
        document.collection_mut("applications").push(record(
            json!({"id": "a1", "project_id": "p1", "student_id": "u2"}),
        ));
        let joins = [
            Join::new(TableRef::new("projects").with_alias("p"), "a.project_id", "p.id"),
            Join::new(TableRef::new("users").with_alias("u"), "p.company_id", "u.id"),
        ];

        let rows = apply_joins(document.collection("applications").to_vec(), &joins, &document);

        assert_eq!(rows[0]["id"], json!("a1"));
        assert_eq!(rows[0]["title"], json!("Site"));
        assert_eq!(rows[0]["name"], json!("Acme"));
    }

    #[test]
    fn test_missing_join_field_passes_through() {
        let document = marketplace();
        let join = Join::new(TableRef::new("users"), "owner_id", "missing");

        let rows = apply_joins(document.collection("projects").to_vec(), &[join], &document);

        assert_eq!(rows, document.collection("projects").to_vec());
    }
}
