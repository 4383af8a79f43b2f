//! CLI command handlers

pub mod analyze;
pub mod catalog;
pub mod scan;
pub mod serve;
