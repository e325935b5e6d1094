//! Typed statement representation
//!
//! The parser produces these nodes from statement strings, but they are
//! plain data: callers can build them directly with the helper constructors
//! and hand them to [`Database::execute`](crate::database::Database::execute)
//! without going through any text at all.

use serde_json::Value;

/// A statement against the document store
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select(SelectStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// CREATE TABLE statement (collection declaration)
    CreateTable(CreateTableStatement),
}

impl Statement {
    /// Short name of the statement kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
            Statement::CreateTable(_) => "create_table",
        }
    }

    /// Name of the collection the statement targets
    pub fn table_name(&self) -> &str {
        match self {
            Statement::Select(s) => &s.from.name,
            Statement::Insert(s) => &s.table_name,
            Statement::Update(s) => &s.table_name,
            Statement::Delete(s) => &s.table_name,
            Statement::CreateTable(s) => &s.table_name,
        }
    }
}

/// Column reference, optionally qualified with a table name or alias
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table name or alias (optional)
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl ColumnRef {
    /// Unqualified column
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Column qualified with a table name or alias
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Split a dotted reference such as `p.status`; the last segment is the field
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once('.') {
            Some((table, column)) => Self::qualified(table, column),
            None => Self::new(reference),
        }
    }

    /// The bare field name records are keyed by
    pub fn field(&self) -> &str {
        &self.column
    }
}

impl From<&str> for ColumnRef {
    fn from(reference: &str) -> Self {
        Self::parse(reference)
    }
}

/// Table reference
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Table name
    pub name: String,
    /// Optional alias
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Whether `qualifier` names this table, either by alias or by name
    pub fn is_named(&self, qualifier: &str) -> bool {
        self.alias.as_deref() == Some(qualifier) || self.name == qualifier
    }
}

/// Value source for a placeholder or an inline literal
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Positional parameter, numbered by its placeholder's position in the statement
    Param(usize),
    /// Literal written inline in the statement
    Literal(Value),
}

impl Operand {
    /// Resolve against the positional parameters; `None` means absent
    pub fn resolve<'a>(&'a self, params: &'a [Value]) -> Option<&'a Value> {
        match self {
            Operand::Param(slot) => params.get(*slot),
            Operand::Literal(value) => Some(value),
        }
    }
}

/// JOIN clause: left-enrich each driving record with the first match
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Table to join
    pub table: TableRef,
    /// Field read from the driving record
    pub left: ColumnRef,
    /// Field read from the joined record
    pub right: ColumnRef,
}

impl Join {
    pub fn new(table: TableRef, left: impl Into<ColumnRef>, right: impl Into<ColumnRef>) -> Self {
        Self {
            table,
            left: left.into(),
            right: right.into(),
        }
    }
}

/// `source AS alias` item of a select list
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub source: ColumnRef,
    pub alias: String,
}

/// Comparison operators a condition can use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Exact value equality
    Eq,
    /// Case-insensitive `%` wildcard pattern
    Like,
}

/// One AND-separated term of a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `1=1`
    Always,
    /// `column = operand` or `column LIKE operand`
    Compare {
        column: ColumnRef,
        op: CompareOp,
        operand: Operand,
    },
    /// A term of any other shape; it never filters anything out
    Unsupported(String),
}

impl Condition {
    pub fn eq(column: impl Into<ColumnRef>, operand: Operand) -> Self {
        Condition::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            operand,
        }
    }

    pub fn like(column: impl Into<ColumnRef>, operand: Operand) -> Self {
        Condition::Compare {
            column: column.into(),
            op: CompareOp::Like,
            operand,
        }
    }
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    /// Column to order by
    pub column: ColumnRef,
    /// Ascending (true) or descending (false)
    pub ascending: bool,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Driving collection
    pub from: TableRef,
    /// JOIN clauses, applied in order
    pub joins: Vec<Join>,
    /// `x.field AS alias` items of the select list
    pub projections: Vec<Projection>,
    /// WHERE clause as a conjunction of conditions
    pub where_clause: Vec<Condition>,
    /// ORDER BY clause
    pub order_by: Vec<OrderByItem>,
    /// LIMIT clause
    pub limit: Option<usize>,
    /// OFFSET clause
    pub offset: Option<usize>,
}

impl SelectStatement {
    pub fn new(from: TableRef) -> Self {
        Self {
            from,
            joins: Vec::new(),
            projections: Vec::new(),
            where_clause: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn project(mut self, source: impl Into<ColumnRef>, alias: impl Into<String>) -> Self {
        self.projections.push(Projection {
            source: source.into(),
            alias: alias.into(),
        });
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.where_clause.push(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<ColumnRef>, ascending: bool) -> Self {
        self.order_by.push(OrderByItem {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Column names
    pub columns: Vec<String>,
    /// Value for each column, position for position
    pub values: Vec<Operand>,
}

impl InsertStatement {
    /// Insert binding column `i` to positional parameter `i`
    pub fn new<I, S>(table_name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let values = (0..columns.len()).map(Operand::Param).collect();
        Self {
            table_name: table_name.into(),
            columns,
            values,
        }
    }
}

/// How an UPDATE assignment produces its value
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentKind {
    /// `column = operand`: always overwrites
    Overwrite(Operand),
    /// `column = COALESCE(operand, column)`: overwrites only with a present, non-null value
    Coalesce(Operand),
    /// Any other right-hand side; skipped
    Unsupported(String),
}

/// Column assignment (for UPDATE)
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column name
    pub column: String,
    /// New value
    pub kind: AssignmentKind,
}

/// Single-field equality that selects the records an UPDATE or DELETE touches
///
/// A `Param` operand binds the trailing positional parameter for updates and
/// the leading one for deletes, whatever its slot number.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFilter {
    pub column: String,
    pub operand: Operand,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table name
    pub table_name: String,
    /// SET clause
    pub assignments: Vec<Assignment>,
    /// WHERE key
    pub key: Option<KeyFilter>,
}

impl UpdateStatement {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            assignments: Vec::new(),
            key: None,
        }
    }

    fn next_slot(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| {
                matches!(
                    a.kind,
                    AssignmentKind::Overwrite(Operand::Param(_))
                        | AssignmentKind::Coalesce(Operand::Param(_))
                )
            })
            .count()
    }

    /// `column = ?` bound to the next positional parameter
    pub fn set(mut self, column: impl Into<String>) -> Self {
        let slot = self.next_slot();
        self.assignments.push(Assignment {
            column: column.into(),
            kind: AssignmentKind::Overwrite(Operand::Param(slot)),
        });
        self
    }

    /// `column = COALESCE(?, column)` bound to the next positional parameter
    pub fn coalesce(mut self, column: impl Into<String>) -> Self {
        let slot = self.next_slot();
        self.assignments.push(Assignment {
            column: column.into(),
            kind: AssignmentKind::Coalesce(Operand::Param(slot)),
        });
        self
    }

    /// `WHERE column = ?`
    pub fn key(mut self, column: impl Into<String>) -> Self {
        let slot = self.next_slot();
        self.key = Some(KeyFilter {
            column: column.into(),
            operand: Operand::Param(slot),
        });
        self
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// WHERE key
    pub key: Option<KeyFilter>,
}

impl DeleteStatement {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            key: None,
        }
    }

    /// `WHERE column = ?`
    pub fn key(mut self, column: impl Into<String>) -> Self {
        self.key = Some(KeyFilter {
            column: column.into(),
            operand: Operand::Param(0),
        });
        self
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// IF NOT EXISTS flag
    pub if_not_exists: bool,
}
