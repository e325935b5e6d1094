//! SELECT pipeline
//!
//! scan -> join -> filter -> project -> order -> limit

use std::cmp::Ordering;

use serde_json::Value;

use super::join::apply_joins;
use super::predicate::{filter, text_of};
use crate::sql::ast::{OrderByItem, Projection, SelectStatement};
use crate::storage::{Document, Record};

/// Run a SELECT against the document; never fails, a miss is an empty list
pub fn execute_select(document: &Document, stmt: &SelectStatement, params: &[Value]) -> Vec<Record> {
    let records = document.collection(&stmt.from.name).to_vec();
    let records = apply_joins(records, &stmt.joins, document);
    let mut records = filter(records, &stmt.where_clause, params);

    project(&mut records, &stmt.projections);
    order(&mut records, &stmt.order_by);

    let offset = stmt.offset.unwrap_or(0);
    match (stmt.limit, offset) {
        (None, 0) => records,
        (limit, offset) => records
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect(),
    }
}

/// Copy each projected source field into its alias; original fields stay
pub fn project(records: &mut [Record], projections: &[Projection]) {
    if projections.is_empty() {
        return;
    }
    for record in records.iter_mut() {
        for projection in projections {
            if let Some(value) = record.get(projection.source.field()).cloned() {
                record.insert(projection.alias.clone(), value);
            }
        }
    }
}

/// Stable sort by text value in dictionary order
pub fn order(records: &mut [Record], order_by: &[OrderByItem]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        order_by
            .iter()
            .map(|item| {
                let ordering = compare_text(
                    &text_of(a.get(item.column.field())),
                    &text_of(b.get(item.column.field())),
                );
                if item.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Dictionary collation: base letters first, then accents, then case with
/// lowercase ahead of uppercase
fn compare_text(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| {
        s.chars()
            .flat_map(char::to_lowercase)
            .map(base_letter)
            .collect::<String>()
    };
    let case_marks = |s: &str| s.chars().map(char::is_uppercase).collect::<Vec<_>>();

    primary(a)
        .cmp(&primary(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| case_marks(a).cmp(&case_marks(b)))
        .then_with(|| a.cmp(b))
}

/// Strip the accent from a lowercase Latin letter
fn base_letter(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ł' | 'ľ' | 'ĺ' | 'ļ' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ř' | 'ŗ' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::{Condition, Join, Operand, TableRef};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn document() -> Document {
        let mut document = Document::new();
        let projects = document.collection_mut("projects");
        projects.push(record(json!({"id": "jan", "company_id": "c", "created_at": "2024-01-01"})));
        projects.push(record(json!({"id": "mar", "company_id": "c", "created_at": "2024-03-01"})));
        projects.push(record(json!({"id": "feb", "company_id": "c", "created_at": "2024-02-01"})));
        document
            .collection_mut("users")
            .push(record(json!({"id": "c", "name": "Acme", "university": "Acme U"})));
        document
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_descending_order() {
        let stmt = SelectStatement::new(TableRef::new("projects")).order_by("created_at", false);
        let rows = execute_select(&document(), &stmt, &[]);
        assert_eq!(ids(&rows), vec!["mar", "feb", "jan"]);
    }

    #[test]
    fn test_ascending_is_default_and_stable() {
        let mut rows = vec![
            record(json!({"id": "1", "k": "b"})),
            record(json!({"id": "2", "k": "A"})),
            record(json!({"id": "3", "k": "a"})),
            record(json!({"id": "4"})),
        ];
        order(
            &mut rows,
            &[OrderByItem {
                column: "k".into(),
                ascending: true,
            }],
        );
        assert_eq!(ids(&rows), vec!["4", "3", "2", "1"]);
    }

    #[test]
    fn test_accented_and_cased_names_sort_alphabetically() {
        let mut rows: Vec<Record> = ["Zeta", "Élan", "apple", "Apple"]
            .iter()
            .map(|name| record(json!({"id": name, "name": name})))
            .collect();
        order(
            &mut rows,
            &[OrderByItem {
                column: "name".into(),
                ascending: true,
            }],
        );
        assert_eq!(ids(&rows), vec!["apple", "Apple", "Élan", "Zeta"]);

        order(
            &mut rows,
            &[OrderByItem {
                column: "name".into(),
                ascending: false,
            }],
        );
        assert_eq!(ids(&rows), vec!["Zeta", "Élan", "Apple", "apple"]);
    }

    #[test]
    fn test_projection_is_additive() {
        let stmt = SelectStatement::new(TableRef::new("projects").with_alias("p"))
            .join(Join::new(
                TableRef::new("users").with_alias("u"),
                "p.company_id",
                "u.id",
            ))
            .project("u.name", "company_name")
            .project("u.missing", "nothing");

        let rows = execute_select(&document(), &stmt, &[]);

        assert_eq!(rows[0]["company_name"], json!("Acme"));
        assert_eq!(rows[0]["name"], json!("Acme"));
        assert!(rows[0].get("nothing").is_none());
    }

    #[test]
    fn test_filter_then_limit() {
        let stmt = SelectStatement::new(TableRef::new("projects"))
            .filter(Condition::eq("company_id", Operand::Param(0)))
            .order_by("created_at", true)
            .limit(2);

        let rows = execute_select(&document(), &stmt, &[json!("c")]);
        assert_eq!(ids(&rows), vec!["jan", "feb"]);
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let stmt = SelectStatement::new(TableRef::new("nowhere"));
        assert!(execute_select(&document(), &stmt, &[]).is_empty());
    }
}
