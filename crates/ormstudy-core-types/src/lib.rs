//! Core types shared across ormstudy facilities
//!
//! - **Correlation types**: SessionId, FactoryId
//! - **Schema constants**: Canonical field keys and lifecycle event names

pub mod correlation;
pub mod schema;

pub use correlation::{FactoryId, SessionId};
