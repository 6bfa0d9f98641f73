//! Snapshot export and import
//!
//! A snapshot is a directory tree: one subdirectory per category plus JSON
//! manifests carrying per-entity configuration. See [`layout`] for the names.

pub mod export;
pub mod fsutil;
pub mod import;
pub mod layout;
pub mod units;
pub mod walk;

pub use export::{CategoryReport, ExportCategory, ExportReport, SnapshotExporter};
pub use import::{
    ImportReport, PhaseReport, PhaseStatus, ScriptOutcome, SectionOutcome, SnapshotImporter,
};
pub use units::ImportPhase;
