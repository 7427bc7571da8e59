//! Command implementations for the apidiff CLI

pub mod changelog;
pub mod diff;
pub mod exports;
pub mod snapshot;
