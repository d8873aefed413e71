//! version-guard library.
//!
//! Git pre-push hook that warns when the version marker file has not changed
//! since the latest tag.

pub mod cli;
pub mod comparator;
pub mod config;
pub mod error;
pub mod git;
pub mod push;

pub use error::Error;
