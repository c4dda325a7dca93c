//! Maintenance commands for the climate slice disk cache.
//!
//! The binary in `main.rs` is a thin clap front-end; each command here
//! returns a serialisable report.

pub mod commands;

pub use commands::{
    describe_key, disk_stats, inspect_blob, open_disk, verify_disk, InspectReport, KeyReport,
    StatsReport,
};
