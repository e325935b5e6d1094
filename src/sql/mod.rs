//! Statement language module
//!
//! Lexer, parser and typed AST for the SQL-flavoured statements the store
//! accepts.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::Token;
