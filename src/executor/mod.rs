//! Statement execution module
//!
//! This module contains the select pipeline, the join resolver, the
//! predicate evaluator and the mutation executor.

pub mod executor;
pub mod join;
pub mod mutation;
pub mod predicate;
pub mod select;

pub use executor::{ExecutionEngine, QueryResult};
pub use predicate::like_match;
