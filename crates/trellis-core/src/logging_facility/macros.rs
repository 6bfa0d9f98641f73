//! Operation lifecycle macros
//!
//! Every logged operation emits one `start` event and then exactly one of
//! `end` or `end_error`. All three carry `component` (the calling module) and
//! `op`, so captured events can be filtered per operation.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $event:ident $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::$event,
            $($($field)*)?
        )
    };
}

/// Emit the `start` event of `op`, with optional extra fields
///
/// ```
/// # use trellis_core::log_op_start;
/// log_op_start!("snapshot_export");
/// log_op_start!("snapshot_export", target = "/srv/snapshots/today");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        $crate::__log_op_event!(info, $op, EVENT_START)
    };
    ($op:expr, $($field:tt)*) => {
        $crate::__log_op_event!(info, $op, EVENT_START, $($field)*)
    };
}

/// Emit the `end` event of `op`; `duration_ms` is mandatory
///
/// ```
/// # use trellis_core::log_op_end;
/// log_op_end!("bulk_operation", duration_ms = 7u64, processed = 120u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Emit the `end_error` event of `op`
///
/// The error is converted into an [`ExError`](crate::errors::ExError) and
/// logged with its kind, stable code and message.
///
/// ```
/// # use trellis_core::log_op_error;
/// # use trellis_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::Io).with_message("disk full");
/// log_op_error!("snapshot_export", err, duration_ms = 3u64);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            $op,
            EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?failure.kind(),
            err_code = failure.code(),
            err_msg = %failure,
            $($($field)*)?
        )
    }};
}
