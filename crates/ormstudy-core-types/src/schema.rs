//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";
pub const FIELD_FACTORY_ID: &str = "factory_id";

// Mapping context
pub const FIELD_ENTITY: &str = "entity";
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_CHAPTER: &str = "chapter";
pub const FIELD_SQL: &str = "sql";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Unit-of-work lifecycle events, in the order a successful run emits them
pub const OP_UNIT_OF_WORK: &str = "unit_of_work";
pub const EVENT_TX_BEGIN: &str = "tx_begin";
pub const EVENT_TX_COMMIT: &str = "tx_commit";
pub const EVENT_TX_ROLLBACK: &str = "tx_rollback";
pub const EVENT_SESSION_CLOSE: &str = "session_close";
pub const EVENT_FACTORY_CLOSE: &str = "factory_close";
