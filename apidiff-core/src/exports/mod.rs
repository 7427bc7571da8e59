//! Exported API extraction.
//!
//! [`get`] reads the non-test Go sources of one package directory and builds
//! a [`Content`] snapshot of its exported declarations. Files are parsed in
//! parallel with rayon; the per-file results are merged in file-name order.
//!
//! A [`Content`] can also be stored as JSON and read back with
//! [`load_snapshot`], so a previously extracted package can stand in for a
//! directory.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::scanner::{scan_package, ScanOptions};

pub mod go;
mod helpers;

pub use helpers::is_exported;

/// An exported constant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Const {
    /// Declared type, the literal kind for untyped constants, or `Reference`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Value text with surrounding quotes removed.
    pub value: String,
}

/// Parameter and return types of a function, method or interface method.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Func {
    /// Comma-joined parameter types; absent when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Comma-joined return types; absent when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    /// Set by the changelog filters when a removed func has a successor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
}

impl Func {
    pub fn new(params: Option<&str>, returns: Option<&str>) -> Self {
        Self {
            params: params.map(str::to_string),
            returns: returns.map(str::to_string),
            replaced_by: None,
        }
    }

    /// `(params) returns`, with multiple returns wrapped in parentheses.
    pub fn signature(&self) -> String {
        let params = self.params.as_deref().unwrap_or_default();
        match self.returns.as_deref() {
            None => format!("({})", params),
            Some(returns) if returns.contains(',') => format!("({}) ({})", params, returns),
            Some(returns) => format!("({}) {}", params, returns),
        }
    }
}

/// An exported interface's method set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, Func>,
}

/// An exported struct.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Struct {
    /// Embedded type expressions in declaration order.
    #[serde(rename = "anon", default, skip_serializing_if = "Vec::is_empty")]
    pub anonymous_fields: Vec<String>,
    /// Field name to type expression text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

/// A named type whose underlying type is another type name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAlias {
    pub underlying_type: String,
}

/// Structural snapshot of a package's exported API.
///
/// Maps are ordered by key so that serialisation and iteration are
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub consts: BTreeMap<String, Const>,
    /// Keyed by `Name` or `Receiver.Name`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub funcs: BTreeMap<String, Func>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub interfaces: BTreeMap<String, Interface>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub structs: BTreeMap<String, Struct>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_aliases: BTreeMap<String, TypeAlias>,
}

impl Content {
    /// Whether the snapshot holds no declarations at all.
    pub fn is_empty(&self) -> bool {
        self.consts.is_empty()
            && self.funcs.is_empty()
            && self.interfaces.is_empty()
            && self.structs.is_empty()
            && self.type_aliases.is_empty()
    }

    /// Total number of top-level declarations.
    pub fn symbol_count(&self) -> usize {
        self.consts.len()
            + self.funcs.len()
            + self.interfaces.len()
            + self.structs.len()
            + self.type_aliases.len()
    }

    /// Fold another file's declarations into this one.
    pub fn merge(&mut self, other: Content) {
        self.consts.extend(other.consts);
        self.funcs.extend(other.funcs);
        self.interfaces.extend(other.interfaces);
        self.structs.extend(other.structs);
        self.type_aliases.extend(other.type_aliases);
    }

    /// Serialise as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Extract the exported API of the package in `dir`.
pub fn get(dir: impl AsRef<Path>) -> Result<Content> {
    get_with_options(dir, &ScanOptions::default())
}

/// Extract the exported API of the package in `dir` with scan options.
pub fn get_with_options(dir: impl AsRef<Path>, options: &ScanOptions) -> Result<Content> {
    let dir = dir.as_ref();
    let files = scan_package(dir, options)?;

    let parsed = files
        .par_iter()
        .map(|path| {
            let source = fs::read_to_string(path)?;
            go::parse_file(&source, path)
        })
        .collect::<Result<Vec<_>>>()?;

    let package = select_package(parsed.iter().map(|file| file.package.as_str()))
        .map(str::to_string)
        .ok_or_else(|| ExtractError::NoSourceFiles {
            path: dir.to_path_buf(),
        })?;

    let mut content = Content::default();
    for (path, file) in files.iter().zip(parsed) {
        if file.package != package {
            tracing::debug!(
                "Excluding {} (package {}, expected {})",
                path.display(),
                file.package,
                package
            );
            continue;
        }
        content.merge(file.content);
    }

    tracing::debug!(
        "Extracted {} exported declarations from package {} in {}",
        content.symbol_count(),
        package,
        dir.display()
    );
    Ok(content)
}

/// Extract the exported API of a single in-memory source file.
pub fn from_source(source: &str) -> Result<Content> {
    Ok(go::parse_file(source, Path::new("<source>"))?.content)
}

/// Read a JSON snapshot written by [`Content::to_json`].
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Content> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExtractError::PackageNotFound {
            path: path.to_path_buf(),
        });
    }
    Content::from_json(&fs::read_to_string(path)?)
}

/// Extract from a package directory or load a `.json` snapshot.
pub fn load(source: impl AsRef<Path>, options: &ScanOptions) -> Result<Content> {
    let source = source.as_ref();
    if source.extension().is_some_and(|ext| ext == "json") {
        load_snapshot(source)
    } else {
        get_with_options(source, options)
    }
}

/// Pick the package name declared by the most files, ignoring `_test` packages.
///
/// Ties go to the alphabetically first name.
fn select_package<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names.filter(|n| !n.is_empty() && !n.ends_with("_test")) {
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name)
}
