//! Names shared by the logging macros and the test capture layer
//!
//! Field names must match the identifiers the macros emit.

pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_PROCESSED: &str = "processed";
pub const FIELD_ERR_CODE: &str = "err_code";

/// An operation began
pub const EVENT_START: &str = "start";
/// An operation finished successfully
pub const EVENT_END: &str = "end";
/// An operation finished with an error
pub const EVENT_END_ERROR: &str = "end_error";
/// Periodic bulk progress
pub const EVENT_PROGRESS: &str = "progress";
