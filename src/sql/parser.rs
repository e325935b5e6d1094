//! Statement parser
//!
//! Turns statement tokens into the typed AST. The grammar is deliberately
//! forgiving: select-list items, WHERE terms and SET assignments that do not
//! fit a recognised shape are kept as `Unsupported` rather than rejected, and
//! GROUP BY/HAVING are skipped. Placeholders are numbered in textual order,
//! including the ones inside unsupported fragments, so the remaining terms
//! still bind to the parameters the caller meant.

use serde_json::Value;

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::error::{Error, Result};

/// Statement parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Next placeholder slot in the statement being parsed
    next_slot: usize,
}

impl Parser {
    /// Create a new parser from a statement string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
            next_slot: 0,
        })
    }

    /// Parse a single statement
    pub fn parse(&mut self) -> Result<Statement> {
        self.next_slot = 0;
        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        Ok(stmt)
    }

    /// Parse a `;`-separated script, dropping statements that fail to parse
    pub fn parse_script(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }
            match self.parse() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unparseable statement in script");
                    while !self.is_at_end() && !self.check(&Token::Semicolon) {
                        self.advance();
                    }
                }
            }
        }

        statements
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            _ => Err(Error::UnexpectedToken {
                expected: "SELECT, INSERT, UPDATE, DELETE, or CREATE".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let projections = self.parse_select_list()?;

        self.expect(&Token::From)?;
        let mut stmt = SelectStatement::new(self.parse_table_ref()?);
        stmt.projections = projections;

        while self.is_join_keyword() {
            stmt.joins.push(self.parse_join()?);
        }

        if self.check(&Token::Where) {
            self.advance();
            stmt.where_clause = self.parse_conditions();
        }

        // GROUP BY / HAVING are accepted but not evaluated
        if self.check(&Token::Group) || self.check(&Token::Having) {
            tracing::debug!("ignoring GROUP BY/HAVING clause");
            while !self.is_at_end()
                && !self.check(&Token::Order)
                && !self.check(&Token::Limit)
                && !self.check(&Token::Semicolon)
            {
                if self.check(&Token::Placeholder) {
                    self.next_slot += 1;
                }
                self.advance();
            }
        }

        if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.order_by = self.parse_order_by_list()?;
        }

        if self.check(&Token::Limit) {
            self.advance();
            stmt.limit = Some(self.expect_count()?);

            if self.check(&Token::Offset) {
                self.advance();
                stmt.offset = Some(self.expect_count()?);
            }
        }

        Ok(stmt)
    }

    /// Collect the `x AS alias` items of the select list; everything else is dropped
    fn parse_select_list(&mut self) -> Result<Vec<Projection>> {
        let mut projections = Vec::new();

        loop {
            let item = self.collect_until(|t| matches!(t, Token::Comma | Token::From));
            if item.is_empty() {
                return Err(Error::UnexpectedToken {
                    expected: "select item".to_string(),
                    found: format!("{}", self.current()),
                });
            }
            match projection_from(&item) {
                Some(projection) => projections.push(projection),
                None => self.reserve_slots(&item),
            }

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(projections)
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_identifier()?;

        let alias = if self.check(&Token::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else if let Token::Identifier(alias) = self.current().clone() {
            self.advance();
            Some(alias)
        } else {
            None
        };

        Ok(TableRef { name, alias })
    }

    fn is_join_keyword(&self) -> bool {
        matches!(self.current(), Token::Join | Token::Inner | Token::Left)
    }

    /// Every join flavour resolves as at-most-one-match enrichment
    fn parse_join(&mut self) -> Result<Join> {
        if self.check(&Token::Inner) {
            self.advance();
        } else if self.check(&Token::Left) {
            self.advance();
            if self.check(&Token::Outer) {
                self.advance();
            }
        }
        self.expect(&Token::Join)?;

        let table = self.parse_table_ref()?;
        self.expect(&Token::On)?;

        let mut left = self.parse_column_ref()?;
        self.expect(&Token::Eq)?;
        let mut right = self.parse_column_ref()?;

        // `ON joined.x = driving.y` is read the same as `ON driving.y = joined.x`
        let left_names_joined = left.table.as_deref().is_some_and(|q| table.is_named(q));
        let right_names_joined = right.table.as_deref().is_some_and(|q| table.is_named(q));
        if left_names_joined && !right_names_joined {
            std::mem::swap(&mut left, &mut right);
        }

        // Only the first equality of the ON clause takes part
        while self.check(&Token::And) {
            tracing::debug!(table = %table.name, "ignoring extra join condition");
            self.advance();
            while !self.is_at_end()
                && !self.is_join_keyword()
                && !self.check(&Token::And)
                && !self.check(&Token::Where)
                && !self.current().ends_where_clause()
            {
                if self.check(&Token::Placeholder) {
                    self.next_slot += 1;
                }
                self.advance();
            }
        }

        Ok(Join { table, left, right })
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let column = self.parse_column_ref()?;
            let ascending = if self.check(&Token::Desc) {
                self.advance();
                false
            } else {
                if self.check(&Token::Asc) {
                    self.advance();
                }
                true
            };

            items.push(OrderByItem { column, ascending });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    // ========== WHERE clause ==========

    /// Split on top-level AND and classify each term
    fn parse_conditions(&mut self) -> Vec<Condition> {
        let mut conditions = Vec::new();

        loop {
            let term = self.collect_until(|t| matches!(t, Token::And) || t.ends_where_clause());
            if !term.is_empty() {
                conditions.push(self.classify_condition(&term));
            }

            if !self.check(&Token::And) {
                break;
            }
            self.advance();
        }

        conditions
    }

    fn classify_condition(&mut self, term: &[Token]) -> Condition {
        if let [lhs, Token::Eq, rhs] = term {
            if literal_value(lhs).is_some() && lhs == rhs {
                return Condition::Always;
            }
        }

        if let Some((column, rest)) = split_column_ref(term) {
            let op = match rest.first() {
                Some(Token::Eq) => Some(CompareOp::Eq),
                Some(Token::Like) => Some(CompareOp::Like),
                _ => None,
            };
            if let (Some(op), [_, value]) = (op, rest) {
                if let Some(operand) = self.operand_from(value) {
                    return Condition::Compare {
                        column,
                        op,
                        operand,
                    };
                }
            }
        }

        self.reserve_slots(term);
        Condition::Unsupported(render(term))
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;

        self.expect(&Token::Values)?;
        self.expect(&Token::LParen)?;
        let mut values = Vec::new();
        loop {
            let token = self.current().clone();
            let operand = self.operand_from(&token).ok_or_else(|| Error::UnexpectedToken {
                expected: "placeholder or literal".to_string(),
                found: format!("{}", token),
            })?;
            self.advance();
            values.push(operand);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        if values.len() != columns.len() {
            return Err(Error::ParseError(format!(
                "INSERT into '{}' names {} columns but supplies {} values",
                table_name,
                columns.len(),
                values.len()
            )));
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.parse_column_ref()?.column;
            self.expect(&Token::Eq)?;
            let rhs = self.collect_until(|t| {
                matches!(t, Token::Comma | Token::Where | Token::Semicolon | Token::Eof)
            });
            let kind = self.classify_assignment(&column, &rhs);
            assignments.push(Assignment { column, kind });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let key = self.parse_key_filter();

        Ok(UpdateStatement {
            table_name,
            assignments,
            key,
        })
    }

    fn classify_assignment(&mut self, column: &str, rhs: &[Token]) -> AssignmentKind {
        if let [value] = rhs {
            if let Some(operand) = self.operand_from(value) {
                return AssignmentKind::Overwrite(operand);
            }
        }

        if let [Token::Coalesce, Token::LParen, Token::Placeholder, Token::Comma, rest @ ..] = rhs {
            if let Some((fallback, [Token::RParen])) = split_column_ref(rest) {
                if fallback.column == column {
                    let slot = self.take_slot();
                    return AssignmentKind::Coalesce(Operand::Param(slot));
                }
            }
        }

        self.reserve_slots(rhs);
        AssignmentKind::Unsupported(render(rhs))
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let key = self.parse_key_filter();

        Ok(DeleteStatement { table_name, key })
    }

    /// `WHERE` for mutations: only the first equality names the key field
    fn parse_key_filter(&mut self) -> Option<KeyFilter> {
        if !self.check(&Token::Where) {
            return None;
        }
        self.advance();

        self.parse_conditions()
            .into_iter()
            .find_map(|condition| match condition {
                Condition::Compare {
                    column,
                    op: CompareOp::Eq,
                    operand,
                } => Some(KeyFilter {
                    column: column.column,
                    operand,
                }),
                _ => None,
            })
    }

    // ========== CREATE Statement ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let if_not_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Not)?;
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;

        // The column body only documents the shape; records stay schemaless
        if self.check(&Token::LParen) {
            let mut depth = 0usize;
            loop {
                match self.current() {
                    Token::LParen => depth += 1,
                    Token::RParen => depth -= 1,
                    Token::Eof => return Err(Error::UnexpectedToken {
                        expected: ")".to_string(),
                        found: "EOF".to_string(),
                    }),
                    _ => {}
                }
                self.advance();
                if depth == 0 {
                    break;
                }
            }
        }

        Ok(CreateTableStatement {
            table_name,
            if_not_exists,
        })
    }

    // ========== Helpers ==========

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier()?;
        if self.check(&Token::Dot) {
            self.advance();
            let column = self.expect_identifier()?;
            Ok(ColumnRef::qualified(first, column))
        } else {
            Ok(ColumnRef::new(first))
        }
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![self.expect_identifier()?];

        while self.check(&Token::Comma) {
            self.advance();
            identifiers.push(self.expect_identifier()?);
        }

        Ok(identifiers)
    }

    /// Take tokens up to (not including) a top-level token matching `stop`
    fn collect_until(&mut self, stop: impl Fn(&Token) -> bool) -> Vec<Token> {
        let mut collected = Vec::new();
        let mut depth = 0usize;

        while !self.is_at_end() {
            let token = self.current();
            if depth == 0 && stop(token) {
                break;
            }
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            collected.push(token.clone());
            self.advance();
        }

        collected
    }

    /// A lone placeholder or literal token as an operand
    fn operand_from(&mut self, token: &Token) -> Option<Operand> {
        if *token == Token::Placeholder {
            return Some(Operand::Param(self.take_slot()));
        }
        literal_value(token).map(Operand::Literal)
    }

    fn take_slot(&mut self) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    fn reserve_slots(&mut self, tokens: &[Token]) {
        self.next_slot += tokens.iter().filter(|t| **t == Token::Placeholder).count();
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn expect_count(&mut self) -> Result<usize> {
        match self.current().clone() {
            Token::IntegerLiteral(n) if n >= 0 => {
                self.advance();
                Ok(n as usize)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "non-negative integer".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }
}

/// Split a leading `name` or `qualifier.name` off a token slice
fn split_column_ref(tokens: &[Token]) -> Option<(ColumnRef, &[Token])> {
    match tokens {
        [Token::Identifier(table), Token::Dot, Token::Identifier(column), rest @ ..] => {
            Some((ColumnRef::qualified(table.clone(), column.clone()), rest))
        }
        [Token::Identifier(column), rest @ ..] => Some((ColumnRef::new(column.clone()), rest)),
        _ => None,
    }
}

/// Recognise `source AS alias` (the `AS` is optional) in a select item
fn projection_from(item: &[Token]) -> Option<Projection> {
    let (source, rest) = split_column_ref(item)?;
    let alias = match rest {
        [Token::As, Token::Identifier(alias)] | [Token::Identifier(alias)] => alias.clone(),
        _ => return None,
    };
    Some(Projection { source, alias })
}

fn literal_value(token: &Token) -> Option<Value> {
    match token {
        Token::StringLiteral(s) => Some(Value::String(s.clone())),
        Token::IntegerLiteral(n) => Some(Value::from(*n)),
        Token::FloatLiteral(n) => Some(Value::from(*n)),
        Token::True => Some(Value::Bool(true)),
        Token::False => Some(Value::Bool(false)),
        Token::Null => Some(Value::Null),
        _ => None,
    }
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
