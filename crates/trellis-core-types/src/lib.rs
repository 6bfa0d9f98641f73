//! Small types shared by every Trellis crate
//!
//! - [`RunId`]: correlates the log events of one bulk run, export or import
//! - [`Sensitive`]: keeps credentials out of formatted output
//! - [`schema`]: field and event names of structured log events

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
