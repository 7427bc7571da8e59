//! Changelog filters.
//!
//! Each filter removes or reclassifies entries that are technically
//! differences but not worth reporting for generated clients (JSON
//! marshalling methods, enum helper funcs, per-operation option and response
//! structs) or that have a known successor (long-running and pageable
//! operations). Filters operate on the `modified` delta only.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::Changelog;
use crate::delta::{self, StructDef};
use crate::exports::{is_exported, Func};
use crate::report::{AdditiveChanges, Package};

/// `runtime.Poller[ClientCreateResponse]` -> `ClientCreateResponse`
static GENERIC_ARGUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?P<response>.*)\]").unwrap());

/// A named changelog filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    NonExported,
    MarshalUnmarshal,
    Enum,
    Func,
    Lro,
    Pageable,
    InterfaceToAny,
    TypeToAny,
}

impl Filter {
    /// All filters, in the order they are applied by default.
    pub const ALL: [Filter; 8] = [
        Filter::NonExported,
        Filter::MarshalUnmarshal,
        Filter::Enum,
        Filter::Func,
        Filter::Lro,
        Filter::Pageable,
        Filter::InterfaceToAny,
        Filter::TypeToAny,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Filter::NonExported => "non_exported",
            Filter::MarshalUnmarshal => "marshal_unmarshal",
            Filter::Enum => "enum",
            Filter::Func => "func",
            Filter::Lro => "lro",
            Filter::Pageable => "pageable",
            Filter::InterfaceToAny => "interface_to_any",
            Filter::TypeToAny => "type_to_any",
        }
    }

    /// Look a filter up by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.iter().copied().find(|filter| filter.name() == name)
    }

    pub fn apply(&self, changelog: &mut Changelog) {
        match self {
            Filter::NonExported => non_exported(changelog),
            Filter::MarshalUnmarshal => marshal_unmarshal(changelog),
            Filter::Enum => enum_values(changelog),
            Filter::Func => func(changelog),
            Filter::Lro => lro(changelog),
            Filter::Pageable => pageable(changelog),
            Filter::InterfaceToAny => interface_to_any(changelog),
            Filter::TypeToAny => type_to_any(changelog),
        }
    }
}

fn added_mut(package: &mut Package) -> Option<&mut delta::Content> {
    package.additive_changes.as_mut()?.added.as_mut()
}

fn removed_mut(package: &mut Package) -> Option<&mut delta::Content> {
    package.breaking_changes.as_mut()?.removed.as_mut()
}

/// Drop added and removed `MarshalJSON` / `UnmarshalJSON` methods.
pub fn marshal_unmarshal(changelog: &mut Changelog) {
    let Some(package) = changelog.modified.as_mut() else {
        return;
    };
    let strip = |funcs: &mut BTreeMap<String, Func>| {
        funcs.retain(|name, _| !name.ends_with(".MarshalJSON") && !name.ends_with(".UnmarshalJSON"));
    };
    if let Some(added) = added_mut(package) {
        strip(&mut added.exports.funcs);
    }
    if let Some(removed) = removed_mut(package) {
        strip(&mut removed.exports.funcs);
    }
}

/// Keys of `map` that start with `prefix`.
fn keys_with_prefix<V>(map: &BTreeMap<String, V>, prefix: &str) -> Vec<String> {
    map.keys()
        .filter(|key| key.starts_with(prefix))
        .cloned()
        .collect()
}

/// Drop enum helper funcs (`PossibleTValues`) of added and removed enum types,
/// and the values of removed enum types.
pub fn enum_values(changelog: &mut Changelog) {
    let Some(package) = changelog.modified.as_mut() else {
        return;
    };

    if let Some(added) = added_mut(package) {
        let types: Vec<String> = added.exports.type_aliases.keys().cloned().collect();
        for name in types {
            let funcs = keys_with_prefix(&added.exports.funcs, &format!("Possible{}", name));
            if funcs.len() == 1 {
                for key in funcs {
                    added.exports.funcs.remove(&key);
                }
            }
        }
    }

    if let Some(removed) = removed_mut(package) {
        let types: Vec<String> = removed.exports.type_aliases.keys().cloned().collect();
        for name in types {
            let consts = keys_with_prefix(&removed.exports.consts, &name);
            let funcs = keys_with_prefix(&removed.exports.funcs, &format!("Possible{}", name));
            if !consts.is_empty() && funcs.len() == 1 {
                for key in consts {
                    removed.exports.consts.remove(&key);
                }
                for key in funcs {
                    removed.exports.funcs.remove(&key);
                }
            }
        }
    }
}

/// Drop the options and response structs that come and go with a method,
/// and parameter retypings from `interface{}` to `any`.
pub fn func(changelog: &mut Changelog) {
    let Some(package) = changelog.modified.as_mut() else {
        return;
    };

    if let Some(added) = added_mut(package) {
        drop_operation_structs(added);
    }
    if let Some(removed) = removed_mut(package) {
        drop_operation_structs(removed);
    }

    if let Some(breaking) = package.breaking_changes.as_mut() {
        for sig in breaking.changes.funcs.values_mut() {
            let compatible = sig
                .params
                .as_ref()
                .is_some_and(|params| only_interface_to_any(&params.from, &params.to));
            if compatible {
                sig.params = None;
            }
        }
        breaking.changes.funcs.retain(|_, sig| !sig.is_empty());
    }
}

/// Whether two param lists differ only by `interface{}` becoming `any`.
fn only_interface_to_any(from: &str, to: &str) -> bool {
    let from: Vec<&str> = from.split(',').map(str::trim).collect();
    let to: Vec<&str> = to.split(',').map(str::trim).collect();
    if from.len() != to.len() {
        return false;
    }

    let mut changed = false;
    for (old, new) in from.iter().zip(&to) {
        if old == new {
            continue;
        }
        if *old == "interface{}" && *new == "any" {
            changed = true;
        } else {
            return false;
        }
    }
    changed
}

/// Remove the complete structs named by a method's last parameter and first return.
fn drop_operation_structs(content: &mut delta::Content) {
    if content.complete_structs.is_empty() {
        return;
    }

    let mut related = Vec::new();
    for (name, func) in &content.exports.funcs {
        if name.split('.').count() != 2 {
            continue;
        }
        if let Some(params) = &func.params {
            let options = params.rsplit(',').next().unwrap_or("").trim().trim_start_matches('*');
            if !options.is_empty() {
                related.push(options.to_string());
            }
        }
        if let Some(returns) = &func.returns {
            let first = returns.split(',').next().unwrap_or("");
            let response = if first.contains("runtime") {
                GENERIC_ARGUMENT
                    .captures(first)
                    .and_then(|caps| caps.name("response"))
                    .map(|m| m.as_str())
                    .unwrap_or("")
            } else {
                first.trim_start_matches('*')
            };
            if !response.is_empty() {
                related.push(response.to_string());
            }
        }
    }

    for name in related {
        content.exports.structs.remove(&name);
        if let Some(idx) = content.complete_structs.iter().position(|s| *s == name) {
            content.complete_structs.remove(idx);
        }
    }
}

/// Link removed methods to an added successor named by `successor`,
/// dropping the successor from the additions.
fn link_successors(changelog: &mut Changelog, successor: impl Fn(&str) -> String) {
    let Some(package) = changelog.modified.as_mut() else {
        return;
    };
    if !package.has_breaking_changes() || !package.has_additive_changes() {
        return;
    }
    let Some(added_funcs) = package
        .additive_changes
        .as_mut()
        .and_then(|a| a.added.as_mut())
        .map(|a| &mut a.exports.funcs)
    else {
        return;
    };
    let Some(removed_funcs) = package
        .breaking_changes
        .as_mut()
        .and_then(|b| b.removed.as_mut())
        .map(|r| &mut r.exports.funcs)
    else {
        return;
    };

    for (name, func) in removed_funcs.iter_mut() {
        let Some((receiver, method)) = name.split_once('.') else {
            continue;
        };
        if method.contains('.') {
            continue;
        }
        let candidate = format!("{}.{}", receiver, successor(method));
        if added_funcs.remove(&candidate).is_some() {
            tracing::debug!("{} replaced by {}", name, candidate);
            func.replaced_by = Some(candidate);
        }
    }
}

/// `X.Create` removed and `X.BeginCreate` added (or the reverse).
pub fn lro(changelog: &mut Changelog) {
    link_successors(changelog, |method| {
        if method.contains("Begin") {
            method.strip_prefix("Begin").unwrap_or(method).to_string()
        } else {
            format!("Begin{}", method)
        }
    });
}

/// `X.List` removed and `X.NewListPager` added (or the reverse).
pub fn pageable(changelog: &mut Changelog) {
    link_successors(changelog, |method| {
        if method.contains("New") && method.contains("Pager") {
            let inner = method.strip_suffix("Pager").unwrap_or(method);
            inner.strip_prefix("New").unwrap_or(inner).to_string()
        } else {
            format!("New{}Pager", method)
        }
    });
}

/// Drop struct field retypings from `interface{}` to `any`.
pub fn interface_to_any(changelog: &mut Changelog) {
    let Some(breaking) = changelog
        .modified
        .as_mut()
        .and_then(|p| p.breaking_changes.as_mut())
    else {
        return;
    };
    for def in breaking.changes.structs.values_mut() {
        def.fields
            .retain(|_, sig| !(sig.from.contains("interface{}") && sig.to.contains("any")));
    }
    breaking.changes.structs.retain(|_, def| !def.fields.is_empty());
}

/// Whether a func key names an exported function or method.
fn is_exported_func(key: &str) -> bool {
    let (receiver, method) = key.split_once('.').unwrap_or((key, ""));
    is_exported(receiver.trim_start_matches('*')) && (method.is_empty() || is_exported(method))
}

fn drop_non_exported(content: &mut delta::Content) {
    content.exports.funcs.retain(|name, _| is_exported_func(name));
    content.exports.structs.retain(|name, _| is_exported(name));
}

/// Drop funcs and structs whose names are not exported.
pub fn non_exported(changelog: &mut Changelog) {
    let Some(package) = changelog.modified.as_mut() else {
        return;
    };
    if let Some(added) = added_mut(package) {
        drop_non_exported(added);
    }
    if let Some(breaking) = package.breaking_changes.as_mut() {
        breaking.changes.funcs.retain(|name, _| is_exported_func(name));
        breaking.changes.structs.retain(|name, _| is_exported(name));
        if let Some(removed) = breaking.removed.as_mut() {
            drop_non_exported(removed);
        }
    }
}

/// Move struct field retypings to `any` from breaking to additive changes.
pub fn type_to_any(changelog: &mut Changelog) {
    let Some(package) = changelog.modified.as_mut() else {
        return;
    };
    let Some(breaking) = package.breaking_changes.as_mut() else {
        return;
    };

    let mut moved: BTreeMap<String, StructDef> = BTreeMap::new();
    for (name, def) in breaking.changes.structs.iter_mut() {
        let to_any: Vec<String> = def
            .fields
            .iter()
            .filter(|(_, sig)| sig.to == "any")
            .map(|(field, _)| field.clone())
            .collect();
        for field in to_any {
            if let Some(sig) = def.fields.remove(&field) {
                moved.entry(name.clone()).or_default().fields.insert(field, sig);
            }
        }
    }
    breaking.changes.structs.retain(|_, def| !def.fields.is_empty());

    if moved.is_empty() {
        return;
    }
    let additive = package
        .additive_changes
        .get_or_insert_with(AdditiveChanges::default);
    for (name, def) in moved {
        additive
            .changes
            .structs
            .entry(name)
            .or_default()
            .fields
            .extend(def.fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{FuncSig, Signature};
    use crate::exports::{self, Const, Struct, TypeAlias};
    use crate::report;

    fn changelog(old: &exports::Content, new: &exports::Content) -> Changelog {
        Changelog {
            modified: Some(report::generate(old, new)),
            ..Default::default()
        }
    }

    fn package(log: &Changelog) -> &Package {
        log.modified.as_ref().unwrap()
    }

    #[test]
    fn test_filter_names() {
        for filter in Filter::ALL {
            assert_eq!(Filter::from_name(filter.name()), Some(filter));
        }
        assert_eq!(Filter::from_name(" LRO "), Some(Filter::Lro));
        assert_eq!(Filter::from_name("nope"), None);
    }

    #[test]
    fn test_marshal_unmarshal() {
        let old = exports::Content::default();
        let mut new = exports::Content::default();
        new.funcs.insert("Widget.MarshalJSON".into(), Func::default());
        new.funcs.insert("*Widget.UnmarshalJSON".into(), Func::default());
        new.funcs.insert("NewWidget".into(), Func::default());

        let mut log = changelog(&old, &new);
        marshal_unmarshal(&mut log);

        let added = package(&log).added().unwrap();
        assert_eq!(added.exports.funcs.keys().collect::<Vec<_>>(), vec!["NewWidget"]);
    }

    fn enum_content() -> exports::Content {
        let mut content = exports::Content::default();
        content.type_aliases.insert(
            "SKUName".into(),
            TypeAlias {
                underlying_type: "string".into(),
            },
        );
        content.consts.insert(
            "SKUNameStandard".into(),
            Const {
                type_name: "SKUName".into(),
                value: "Standard".into(),
            },
        );
        content.funcs.insert(
            "PossibleSKUNameValues".into(),
            Func::new(None, Some("[]SKUName")),
        );
        content
    }

    #[test]
    fn test_enum_added() {
        let mut log = changelog(&exports::Content::default(), &enum_content());
        enum_values(&mut log);

        let added = package(&log).added().unwrap();
        assert!(added.exports.funcs.is_empty());
        assert!(added.exports.consts.contains_key("SKUNameStandard"));
        assert!(added.exports.type_aliases.contains_key("SKUName"));
    }

    #[test]
    fn test_enum_removed() {
        let mut log = changelog(&enum_content(), &exports::Content::default());
        enum_values(&mut log);

        let removed = package(&log).removed().unwrap();
        assert!(removed.exports.funcs.is_empty());
        assert!(removed.exports.consts.is_empty());
        assert!(removed.exports.type_aliases.contains_key("SKUName"));
    }

    #[test]
    fn test_func_drops_operation_structs() {
        let old = exports::Content::default();
        let mut new = exports::Content::default();
        new.funcs.insert(
            "*Client.BeginCreate".into(),
            Func::new(
                Some("context.Context, string, *ClientBeginCreateOptions"),
                Some("*runtime.Poller[ClientCreateResponse], error"),
            ),
        );
        new.funcs.insert(
            "*Client.Get".into(),
            Func::new(Some("context.Context, *ClientGetOptions"), Some("ClientGetResponse, error")),
        );
        for name in [
            "ClientBeginCreateOptions",
            "ClientCreateResponse",
            "ClientGetOptions",
            "ClientGetResponse",
            "Widget",
        ] {
            new.structs.insert(name.into(), Struct::default());
        }

        let mut log = changelog(&old, &new);
        func(&mut log);

        let added = package(&log).added().unwrap();
        assert_eq!(added.complete_structs, vec!["Widget"]);
    }

    #[test]
    fn test_func_interface_to_any_params() {
        let mut old = exports::Content::default();
        old.funcs
            .insert("Marshal".into(), Func::new(Some("interface{}, string"), Some("error")));
        old.funcs.insert("Keep".into(), Func::new(Some("int"), None));
        let mut new = exports::Content::default();
        new.funcs
            .insert("Marshal".into(), Func::new(Some("any, string"), Some("error")));
        new.funcs.insert("Keep".into(), Func::new(Some("any"), None));

        let mut log = changelog(&old, &new);
        func(&mut log);

        let funcs = &package(&log).breaking_changes.as_ref().unwrap().changes.funcs;
        assert!(!funcs.contains_key("Marshal"));
        assert!(funcs.contains_key("Keep"));
    }

    #[test]
    fn test_only_interface_to_any() {
        assert!(only_interface_to_any("interface{}, int", "any, int"));
        assert!(!only_interface_to_any("interface{}, int", "any, string"));
        assert!(!only_interface_to_any("interface{}", "any, int"));
        assert!(!only_interface_to_any("int", "int"));
    }

    #[test]
    fn test_lro_and_pageable() {
        let mut old = exports::Content::default();
        old.funcs.insert("*Client.Create".into(), Func::default());
        old.funcs.insert("*Client.List".into(), Func::default());
        let mut new = exports::Content::default();
        new.funcs.insert("*Client.BeginCreate".into(), Func::default());
        new.funcs.insert("*Client.NewListPager".into(), Func::default());
        new.funcs.insert("*Client.Get".into(), Func::default());

        let mut log = changelog(&old, &new);
        lro(&mut log);
        pageable(&mut log);

        let removed = package(&log).removed().unwrap();
        assert_eq!(
            removed.exports.funcs["*Client.Create"].replaced_by.as_deref(),
            Some("*Client.BeginCreate")
        );
        assert_eq!(
            removed.exports.funcs["*Client.List"].replaced_by.as_deref(),
            Some("*Client.NewListPager")
        );
        let added = package(&log).added().unwrap();
        assert_eq!(added.exports.funcs.keys().collect::<Vec<_>>(), vec!["*Client.Get"]);
    }

    fn retyped_fields(pairs: &[(&str, &str, &str)]) -> (exports::Content, exports::Content) {
        let mut old_struct = Struct::default();
        let mut new_struct = Struct::default();
        for (field, from, to) in pairs {
            old_struct.fields.insert(field.to_string(), from.to_string());
            new_struct.fields.insert(field.to_string(), to.to_string());
        }
        let mut old = exports::Content::default();
        old.structs.insert("Props".into(), old_struct);
        let mut new = exports::Content::default();
        new.structs.insert("Props".into(), new_struct);
        (old, new)
    }

    #[test]
    fn test_interface_to_any() {
        let (old, new) = retyped_fields(&[("Data", "interface{}", "any")]);
        let mut log = changelog(&old, &new);
        assert!(log.has_breaking_changes());

        interface_to_any(&mut log);
        assert!(!log.has_breaking_changes());
    }

    #[test]
    fn test_type_to_any() {
        let (old, new) =
            retyped_fields(&[("Data", "map[string]string", "any"), ("Size", "int32", "int64")]);
        let mut log = changelog(&old, &new);
        type_to_any(&mut log);

        let package = package(&log);
        let breaking = &package.breaking_changes.as_ref().unwrap().changes.structs;
        assert_eq!(breaking["Props"].fields.keys().collect::<Vec<_>>(), vec!["Size"]);

        let additive = &package.additive_changes.as_ref().unwrap().changes.structs;
        assert_eq!(
            additive["Props"].fields["Data"],
            Signature::new("map[string]string", "any")
        );
        assert!(package.has_additive_changes());
    }

    #[test]
    fn test_non_exported() {
        let mut log = Changelog {
            modified: Some(Package::default()),
            ..Default::default()
        };
        let package = log.modified.as_mut().unwrap();
        let mut added = delta::Content::default();
        added.exports.funcs.insert("*client.Do".into(), Func::default());
        added.exports.funcs.insert("*Client.do".into(), Func::default());
        added.exports.funcs.insert("*Client.Do".into(), Func::default());
        added.exports.structs.insert("inner".into(), Struct::default());
        package.additive_changes = Some(AdditiveChanges {
            added: Some(added),
            ..Default::default()
        });
        let mut breaking = report::BreakingChanges::default();
        breaking.changes.funcs.insert(
            "helper".into(),
            FuncSig {
                params: Some(Signature::new("int", "string")),
                returns: None,
            },
        );
        package.breaking_changes = Some(breaking);

        non_exported(&mut log);

        let package = log.modified.as_ref().unwrap();
        let added = package.added().unwrap();
        assert_eq!(added.exports.funcs.keys().collect::<Vec<_>>(), vec!["*Client.Do"]);
        assert!(added.exports.structs.is_empty());
        assert!(!package.has_breaking_changes());
    }

    #[test]
    fn test_filters_skip_whole_package_changes() {
        let mut log = Changelog {
            new_package: true,
            ..Default::default()
        };
        log.apply_filters(&Filter::ALL);
        assert!(log.new_package);
        assert!(log.modified.is_none());
    }
}
