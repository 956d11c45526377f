//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use ormstudy_core::log_op_start;
/// log_op_start!("run_chapter");
/// log_op_start!("run_chapter", chapter = "ch02");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use ormstudy_core::log_op_end;
/// log_op_end!("run_chapter", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```
/// # use ormstudy_core::{log_op_error, errors::OrmStudyError};
/// let err = OrmStudyError::UnknownChapter { id: "ch99".to_string() };
/// log_op_error!("run_chapter", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            "{}",
            ex_err
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($field)*
        );
    }};
}

/// Log a unit-of-work lifecycle boundary
///
/// `event` is one of the `EVENT_TX_*`, `EVENT_SESSION_CLOSE` or
/// `EVENT_FACTORY_CLOSE` constants.
///
/// # Example
///
/// ```
/// # use ormstudy_core::log_lifecycle;
/// # use ormstudy_core::core_types::schema::EVENT_TX_BEGIN;
/// log_lifecycle!(EVENT_TX_BEGIN, session_id = "s1");
/// ```
#[macro_export]
macro_rules! log_lifecycle {
    ($event:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $crate::core_types::schema::OP_UNIT_OF_WORK,
            event = $event,
            $($field)*
        );
    };
}
