//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums
//! - Idempotent application
//! - The `Migration` descriptor callers embed with `include_str!`

mod checksums;
mod runner;

pub use checksums::compute_checksum;
pub use runner::{applied_migrations, apply_migrations};

/// Migration metadata
///
/// Migrations are applied in slice order; `id` must be stable across
/// releases because it keys the `schema_version` ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}
