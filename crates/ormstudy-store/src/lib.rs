//! ormstudy Store - SQLite persistence for the mapping demonstrations
//!
//! Provides:
//! - Connection open/configure helpers and the YAML persistence unit
//! - Migration runner with checksums
//! - The `Entity` mapping trait and statement parameters
//! - Session factory, sessions, transactions and the unit-of-work wrapper
//! - Stored procedures backed by SQLite scalar functions

pub mod config;
pub mod db;
pub mod errors;
pub mod mapping;
pub mod migrations;
pub mod params;
pub mod procedure;
pub mod session;

// Re-export key types
pub use config::{DatabaseLocation, PersistenceUnit};
pub use errors::Result;
pub use mapping::{Entity, EntityId};
pub use migrations::Migration;
pub use ormstudy_core::SqlValue;
pub use params::Params;
pub use procedure::{Procedure, ProcedureFn};
pub use session::{
    run_in_transaction, EntityRef, Outcome, Session, SessionFactory, SessionFactoryBuilder,
    SessionTx,
};
