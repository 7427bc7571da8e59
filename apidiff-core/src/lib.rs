//! apidiff core - exported Go API extraction and breaking-change classification.
//!
//! The crate has two halves that are used in sequence:
//!
//! - **Extractor** ([`exports`]): parses the non-test Go sources of one package
//!   directory with tree-sitter and builds a [`exports::Content`] snapshot of
//!   its exported consts, funcs/methods, interfaces, structs and type aliases.
//! - **Differ** ([`delta`], [`report`]): compares two snapshots and produces a
//!   [`report::Package`] with additive and breaking changes.
//!
//! [`changelog`] sits on top of both: it applies the absent-package policy,
//! the changelog filters and renders sorted markdown.
//!
//! # Usage
//!
//! ```rust,ignore
//! use apidiff_core::{exports, report};
//!
//! let old = exports::get("sdk/v1/armstorage")?;
//! let new = exports::get("sdk/v2/armstorage")?;
//! let delta = report::generate(&old, &new);
//! if delta.has_breaking_changes() {
//!     println!("breaking!");
//! }
//! ```

pub mod changelog;
pub mod delta;
pub mod error;
pub mod exports;
pub mod report;
pub mod scanner;

pub use error::{ExtractError, Result};

/// Get the version of apidiff-core.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
