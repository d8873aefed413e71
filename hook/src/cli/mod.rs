//! CLI commands for version-guard.

pub mod check;
pub mod hooks;
pub mod status;
