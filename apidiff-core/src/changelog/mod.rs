//! Changelog composition on top of the package delta.
//!
//! A [`Changelog`] adds the caller-side policy that the extractor leaves
//! open: a package that does not exist on the old side is a new package,
//! one that does not exist on the new side has been removed. The
//! [`filters`] prune noise from the delta before it is rendered with
//! [`Changelog::to_markdown`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::delta::{self, FuncSig, Signature};
use crate::error::Result;
use crate::exports::go::REFERENCE_TYPE;
use crate::exports::{self, Func};
use crate::report::{self, Package};
use crate::scanner::ScanOptions;

pub mod filters;

pub use filters::Filter;

/// Literal kinds recorded as const types for untyped constants.
const BUILTIN_CONST_TYPES: &[&str] = &["int", "float", "imag", "char", "string", REFERENCE_TYPE];

/// Changelog for one package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changelog {
    /// The package did not exist before.
    pub new_package: bool,
    /// The package no longer exists.
    pub removed_package: bool,
    /// Delta for a package present on both sides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Package>,
}

impl Changelog {
    /// Apply the absent-package policy to two extraction results.
    ///
    /// A missing package on exactly one side decides the outcome; any other
    /// extraction error is returned unchanged.
    pub fn from_extractions(
        old: Result<exports::Content>,
        new: Result<exports::Content>,
    ) -> Result<Self> {
        match (old, new) {
            (Ok(old), Ok(new)) => Ok(Self {
                modified: Some(report::generate(&old, &new)),
                ..Default::default()
            }),
            (Err(e), Ok(_)) if e.is_not_found() => {
                tracing::info!("Old package not found, treating as new package");
                Ok(Self {
                    new_package: true,
                    ..Default::default()
                })
            }
            (Ok(_), Err(e)) if e.is_not_found() => {
                tracing::info!("New package not found, treating as removed package");
                Ok(Self {
                    removed_package: true,
                    ..Default::default()
                })
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    /// Extract both sides concurrently and build the changelog.
    ///
    /// Either side may be a package directory or a `.json` snapshot.
    pub fn for_directories(
        old: impl AsRef<Path> + Sync,
        new: impl AsRef<Path> + Sync,
        options: &ScanOptions,
    ) -> Result<Self> {
        let (old_result, new_result) = rayon::join(
            || exports::load(old.as_ref(), options),
            || exports::load(new.as_ref(), options),
        );
        Self::from_extractions(old_result, new_result)
    }

    /// Run the given filters in order.
    ///
    /// Filters only touch the delta of a modified package.
    pub fn apply_filters(&mut self, filters: &[Filter]) {
        if self.modified.is_none() {
            return;
        }
        for filter in filters {
            tracing::debug!("Applying changelog filter {}", filter.name());
            filter.apply(self);
        }
    }

    pub fn has_breaking_changes(&self) -> bool {
        self.removed_package
            || self
                .modified
                .as_ref()
                .is_some_and(Package::has_breaking_changes)
    }

    pub fn has_additive_changes(&self) -> bool {
        self.new_package
            || self
                .modified
                .as_ref()
                .is_some_and(Package::has_additive_changes)
    }

    pub fn is_empty(&self) -> bool {
        !self.has_breaking_changes() && !self.has_additive_changes()
    }

    /// Render as markdown. Every list is sorted before it is printed.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if self.new_package {
            md.push_str("### Features Added\n\n- Initial release\n");
            return md;
        }
        if self.removed_package {
            md.push_str("### Breaking Changes\n\n- Package has been removed\n");
            return md;
        }
        let Some(package) = &self.modified else {
            return md;
        };

        let breaking = breaking_lines(package);
        let additive = additive_lines(package);

        if !breaking.is_empty() {
            write_section(&mut md, "Breaking Changes", &breaking);
        }
        if !additive.is_empty() {
            if !md.is_empty() {
                md.push('\n');
            }
            write_section(&mut md, "Features Added", &additive);
        }
        md
    }
}

fn write_section(md: &mut String, title: &str, lines: &[String]) {
    let _ = writeln!(md, "### {}\n", title);
    for line in lines {
        let _ = writeln!(md, "- {}", line);
    }
}

/// Render `Name(params) returns`.
fn func_display(name: &str, func: &Func) -> String {
    format!("{}{}", name, func.signature())
}

fn signature_lines(kind: &str, name: &str, sig: &FuncSig, out: &mut Vec<String>) {
    if let Some(params) = &sig.params {
        out.push(format!(
            "{} `{}` parameter(s) have been changed from `({})` to `({})`",
            kind, name, params.from, params.to
        ));
    }
    if let Some(returns) = &sig.returns {
        out.push(format!(
            "{} `{}` return value(s) have been changed from `({})` to `({})`",
            kind, name, returns.from, returns.to
        ));
    }
}

fn sorted(mut lines: Vec<String>) -> Vec<String> {
    lines.sort();
    lines
}

/// Breaking change bullets, grouped by kind and sorted within each group.
fn breaking_lines(package: &Package) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(breaking) = &package.breaking_changes {
        let changes = &breaking.changes;

        out.extend(sorted(
            changes
                .consts
                .iter()
                .map(|(name, sig)| type_change("const", name, sig))
                .collect(),
        ));
        out.extend(sorted(
            changes
                .type_aliases
                .iter()
                .map(|(name, sig)| type_change("type", name, sig))
                .collect(),
        ));

        let mut funcs = Vec::new();
        for (name, sig) in &changes.funcs {
            signature_lines("Function", name, sig, &mut funcs);
        }
        for (iface, def) in &changes.interfaces {
            for (method, sig) in &def.methods {
                signature_lines("Method", &format!("{}.{}", iface, method), sig, &mut funcs);
            }
        }
        out.extend(sorted(funcs));

        let mut fields = Vec::new();
        for (name, def) in &changes.structs {
            for (field, sig) in &def.fields {
                fields.push(type_change("field", &format!("{}.{}", name, field), sig));
            }
        }
        out.extend(sorted(fields));

        if let Some(removed) = &breaking.removed {
            out.extend(removed_lines(removed));
        }
    }

    out
}

fn type_change(kind: &str, name: &str, sig: &Signature) -> String {
    format!(
        "Type of {} `{}` has been changed from `{}` to `{}`",
        kind, name, sig.from, sig.to
    )
}

fn removed_lines(removed: &delta::Content) -> Vec<String> {
    let mut out = Vec::new();
    let content = &removed.exports;

    out.extend(sorted(
        content
            .consts
            .keys()
            .map(|name| format!("Const `{}` has been removed", name))
            .collect(),
    ));
    out.extend(sorted(
        content
            .type_aliases
            .keys()
            .map(|name| format!("Type `{}` has been removed", name))
            .collect(),
    ));
    out.extend(sorted(
        content
            .funcs
            .iter()
            .map(|(name, func)| match &func.replaced_by {
                Some(successor) => format!(
                    "Function `{}` has been removed, use `{}` instead",
                    name, successor
                ),
                None => format!("Function `{}` has been removed", name),
            })
            .collect(),
    ));

    let mut interfaces = Vec::new();
    for (name, iface) in &content.interfaces {
        if iface.methods.is_empty() {
            interfaces.push(format!("Interface `{}` has been removed", name));
        }
        for method in iface.methods.keys() {
            interfaces.push(format!(
                "Method `{}` of interface `{}` has been removed",
                method, name
            ));
        }
    }
    out.extend(sorted(interfaces));

    out.extend(sorted(
        removed
            .complete_structs
            .iter()
            .map(|name| format!("Struct `{}` has been removed", name))
            .collect(),
    ));

    let mut fields = Vec::new();
    for (name, s) in &content.structs {
        for anon in &s.anonymous_fields {
            fields.push(format!("Field `{}` of struct `{}` has been removed", anon, name));
        }
        for field in s.fields.keys() {
            fields.push(format!("Field `{}` of struct `{}` has been removed", field, name));
        }
    }
    out.extend(sorted(fields));

    out
}

/// Feature bullets, grouped by kind and sorted within each group.
fn additive_lines(package: &Package) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(added) = package.added() {
        let content = &added.exports;
        let new_types: BTreeSet<&str> = content.type_aliases.keys().map(String::as_str).collect();

        let mut types = Vec::new();
        for name in &new_types {
            let values: Vec<&str> = content
                .consts
                .iter()
                .filter(|(_, c)| c.type_name == *name)
                .map(|(value, _)| value.as_str())
                .collect();
            if values.is_empty() {
                types.push(format!("New type `{}`", name));
            } else {
                types.push(format!(
                    "New type `{}` with values `{}`",
                    name,
                    values.join("`, `")
                ));
            }
        }
        out.extend(sorted(types));

        let mut consts = Vec::new();
        for (name, c) in &content.consts {
            if new_types.contains(c.type_name.as_str()) {
                continue;
            }
            if BUILTIN_CONST_TYPES.contains(&c.type_name.as_str()) {
                consts.push(format!("New const `{}`", name));
            } else {
                consts.push(format!(
                    "New value `{}` added to type `{}`",
                    name, c.type_name
                ));
            }
        }
        out.extend(sorted(consts));

        out.extend(sorted(
            content
                .funcs
                .iter()
                .map(|(name, func)| format!("New function `{}`", func_display(name, func)))
                .collect(),
        ));

        let mut iface_lines = Vec::new();
        for (name, iface) in &content.interfaces {
            if iface.methods.is_empty() {
                iface_lines.push(format!("New interface `{}`", name));
            }
            for (method, func) in &iface.methods {
                iface_lines.push(format!(
                    "New method `{}` in interface `{}`",
                    func_display(method, func),
                    name
                ));
            }
        }
        out.extend(sorted(iface_lines));

        out.extend(sorted(
            added
                .complete_structs
                .iter()
                .map(|name| format!("New struct `{}`", name))
                .collect(),
        ));

        let mut fields = Vec::new();
        for (name, s) in &content.structs {
            for anon in &s.anonymous_fields {
                fields.push(format!("New anonymous field `{}` in struct `{}`", anon, name));
            }
            for field in s.fields.keys() {
                fields.push(format!("New field `{}` in struct `{}`", field, name));
            }
        }
        out.extend(sorted(fields));
    }

    if let Some(additive) = &package.additive_changes {
        let mut fields = Vec::new();
        for (name, def) in &additive.changes.structs {
            for (field, sig) in &def.fields {
                fields.push(type_change("field", &format!("{}.{}", name, field), sig));
            }
        }
        out.extend(sorted(fields));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::exports::{Const, Struct, TypeAlias};
    use std::path::PathBuf;

    fn not_found() -> ExtractError {
        ExtractError::PackageNotFound {
            path: PathBuf::from("/sdk/armfoo"),
        }
    }

    #[test]
    fn test_absent_package_policy() {
        let content = exports::Content::default();

        let log = Changelog::from_extractions(Err(not_found()), Ok(content.clone())).unwrap();
        assert!(log.new_package);
        assert!(log.has_additive_changes());
        assert!(!log.has_breaking_changes());
        assert_eq!(log.to_markdown(), "### Features Added\n\n- Initial release\n");

        let log = Changelog::from_extractions(Ok(content.clone()), Err(not_found())).unwrap();
        assert!(log.removed_package);
        assert!(log.has_breaking_changes());
        assert_eq!(
            log.to_markdown(),
            "### Breaking Changes\n\n- Package has been removed\n"
        );
    }

    #[test]
    fn test_other_errors_propagate() {
        let parse_error = ExtractError::Parse {
            file: PathBuf::from("a.go"),
            message: "syntax error".into(),
        };
        let result = Changelog::from_extractions(Err(parse_error), Ok(exports::Content::default()));
        assert!(matches!(result, Err(ExtractError::Parse { .. })));
    }

    #[test]
    fn test_reference_consts_are_plain_consts() {
        let mut new = exports::Content::default();
        new.consts.insert(
            "Pinned".into(),
            Const {
                type_name: REFERENCE_TYPE.into(),
                value: "v2.Param".into(),
            },
        );
        new.consts.insert(
            "KindA".into(),
            Const {
                type_name: "Kind".into(),
                value: "A".into(),
            },
        );
        let log = Changelog::from_extractions(Ok(exports::Content::default()), Ok(new)).unwrap();
        assert_eq!(
            log.to_markdown(),
            "### Features Added\n\n- New const `Pinned`\n- New value `KindA` added to type `Kind`\n"
        );
    }

    #[test]
    fn test_markdown_sorted() {
        let mut old = exports::Content::default();
        old.funcs.insert("Zeta".into(), Func::new(Some("int"), None));
        old.funcs.insert("Alpha".into(), Func::new(None, None));
        old.structs.insert("Gone".into(), Struct::default());

        let mut new = exports::Content::default();
        new.funcs.insert("Zeta".into(), Func::new(Some("int, string"), None));
        new.funcs.insert("NewB".into(), Func::new(None, Some("*B")));
        new.funcs.insert("NewA".into(), Func::new(Some("string"), Some("*A, error")));
        new.type_aliases.insert(
            "Kind".into(),
            TypeAlias {
                underlying_type: "string".into(),
            },
        );
        for value in ["KindB", "KindA"] {
            new.consts.insert(
                value.into(),
                Const {
                    type_name: "Kind".into(),
                    value: value.into(),
                },
            );
        }

        let log = Changelog::from_extractions(Ok(old), Ok(new)).unwrap();
        let md = log.to_markdown();

        let expected = "\
### Breaking Changes

- Function `Zeta` parameter(s) have been changed from `(int)` to `(int, string)`
- Function `Alpha` has been removed
- Struct `Gone` has been removed

### Features Added

- New type `Kind` with values `KindA`, `KindB`
- New function `NewA(string) (*A, error)`
- New function `NewB() *B`
";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_empty_changelog_renders_nothing() {
        let content = exports::Content::default();
        let log = Changelog::from_extractions(Ok(content.clone()), Ok(content)).unwrap();
        assert!(log.is_empty());
        assert_eq!(log.to_markdown(), "");
    }
}
