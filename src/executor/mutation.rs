//! INSERT / UPDATE / DELETE / CREATE TABLE against the document
//!
//! These functions only touch the in-memory document. Persisting the result
//! is the engine's job, so a failed write surfaces after the change has been
//! applied in memory, exactly once per statement.

use serde_json::Value;

use crate::sql::ast::{
    AssignmentKind, CreateTableStatement, DeleteStatement, InsertStatement, KeyFilter, Operand,
    UpdateStatement,
};
use crate::storage::{Document, Record, TimeSource};

/// Field stamped on every inserted record that lacks it
pub const CREATED_AT: &str = "created_at";

/// Append one record; a column whose parameter is absent is left out
pub fn insert(
    document: &mut Document,
    stmt: &InsertStatement,
    params: &[Value],
    clock: &dyn TimeSource,
) -> usize {
    let mut record = Record::new();
    for (column, operand) in stmt.columns.iter().zip(&stmt.values) {
        if let Some(value) = operand.resolve(params) {
            record.insert(column.clone(), value.clone());
        }
    }

    let stamped = match record.get(CREATED_AT) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };
    if !stamped {
        record.insert(CREATED_AT.to_string(), Value::String(clock.timestamp()));
    }

    document.collection_mut(&stmt.table_name).push(record);
    1
}

/// Apply the SET clause to every record whose key field equals the trailing
/// parameter. `None` when the statement has no key and nothing was attempted.
pub fn update(document: &mut Document, stmt: &UpdateStatement, params: &[Value]) -> Option<usize> {
    let key = stmt.key.as_ref()?;
    let key_value = key_value(key, params.last());
    let Some(records) = document.existing_mut(&stmt.table_name) else {
        return Some(0);
    };

    let mut changes = 0;
    for record in records
        .iter_mut()
        .filter(|record| record.get(&key.column) == key_value)
    {
        for assignment in &stmt.assignments {
            match &assignment.kind {
                AssignmentKind::Overwrite(operand) => {
                    let value = operand.resolve(params).cloned().unwrap_or(Value::Null);
                    record.insert(assignment.column.clone(), value);
                }
                AssignmentKind::Coalesce(operand) => {
                    if let Some(value) = operand.resolve(params).filter(|v| !v.is_null()) {
                        record.insert(assignment.column.clone(), value.clone());
                    }
                }
                AssignmentKind::Unsupported(_) => {}
            }
        }
        changes += 1;
    }

    Some(changes)
}

/// Remove every record whose key field equals the leading parameter.
/// `None` when the statement has no key and nothing was attempted.
pub fn delete(document: &mut Document, stmt: &DeleteStatement, params: &[Value]) -> Option<usize> {
    let key = stmt.key.as_ref()?;
    let key_value = key_value(key, params.first());
    let Some(records) = document.existing_mut(&stmt.table_name) else {
        return Some(0);
    };

    let before = records.len();
    records.retain(|record| record.get(&key.column) != key_value);
    Some(before - records.len())
}

/// Declare a collection; true when it was created
pub fn create_table(document: &mut Document, stmt: &CreateTableStatement) -> bool {
    document.ensure_collection(&stmt.table_name)
}

/// Key parameters bind by position (trailing for updates, leading for deletes);
/// an absent one selects the records that lack the key field
fn key_value<'a>(key: &'a KeyFilter, positional: Option<&'a Value>) -> Option<&'a Value> {
    match &key.operand {
        Operand::Param(_) => positional,
        Operand::Literal(value) => Some(value),
    }
}
