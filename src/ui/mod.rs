//! Text output for the command-line reports.

pub mod report;
