//! gigstore - A JSON-document store with a SQL-flavoured statement layer
//!
//! This library provides the data layer of a university freelance
//! marketplace:
//! - Statement parsing (lexer, parser, typed AST)
//! - Document storage (collections of records, whole-file persistence)
//! - Statement execution (joins, predicates, ordering, mutations)
//! - The `prepare / get / all / run / exec` surface
//! - Marketplace operations built on that surface
//! - TCP server

pub mod database;
pub mod error;
pub mod executor;
pub mod marketplace;
pub mod server;
pub mod sql;
pub mod storage;

pub use database::{Database, Prepared, RunResult};
pub use error::{Error, Result};
