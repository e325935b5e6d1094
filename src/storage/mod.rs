//! Storage module
//!
//! This module contains the document store components:
//! - Document (named collections of records)
//! - Whole-file JSON persistence
//! - Wall-clock time source

pub mod document;
pub mod file;
pub mod store;
pub mod time;

pub use document::{Document, Record, DEFAULT_COLLECTIONS};
pub use file::DocumentFile;
pub use store::Store;
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
