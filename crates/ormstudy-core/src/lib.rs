//! ormstudy Core - mapping vocabulary shared by the store and the chapters
//!
//! This crate has no I/O. It provides:
//! - The canonical error facility (`ExError`, `ExErrorKind`, `OrmStudyError`)
//! - The structured logging facility and its test capture mode
//! - Attribute converters and entity lifecycle listeners
//! - Named entity graphs and the named query registry
//! - A type-safe SQL query builder rendering to text plus positional parameters

pub mod errors;
pub mod logging_facility;
pub mod mapping;
pub mod query;
pub mod value;

pub use ormstudy_core_types as core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, OrmStudyError, Result};
pub use mapping::{
    AttributeConverter, BooleanToYnConverter, EntityGraph, EntityListener, LoggingListener,
    NamedQueries, NamedQuery,
};
pub use value::SqlValue;
