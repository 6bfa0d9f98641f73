//! Structured operation logging
//!
//! The binary installs one subscriber through [`init`]. Library code logs
//! operation lifecycles with [`log_op_start!`](crate::log_op_start),
//! [`log_op_end!`](crate::log_op_end) and [`log_op_error!`](crate::log_op_error).
//! Tests swap in an in-memory layer with [`init_test_capture`] and assert on
//! the recorded events.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
