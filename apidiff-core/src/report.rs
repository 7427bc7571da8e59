//! Package-level delta between two export snapshots.
//!
//! [`generate`] classifies every difference as additive or breaking:
//!
//! - new declarations, struct fields, embedded types and interface methods
//!   are additive;
//! - removals and type/signature changes of surviving declarations are
//!   breaking.
//!
//! The emptiness predicates are computed from the maps on every call, so a
//! `Package` stays consistent after the changelog filters prune it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::delta::{self, FuncSig, InterfaceDef, Signature, StructDef};
use crate::exports;

/// Per-category `{from, to}` records for declarations on both sides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub consts: BTreeMap<String, Signature>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub funcs: BTreeMap<String, FuncSig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub interfaces: BTreeMap<String, InterfaceDef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub structs: BTreeMap<String, StructDef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_aliases: BTreeMap<String, Signature>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.consts.is_empty()
            && self.funcs.is_empty()
            && self.interfaces.is_empty()
            && self.structs.is_empty()
            && self.type_aliases.is_empty()
    }
}

/// Breaking changes: retyped declarations plus everything removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingChanges {
    #[serde(flatten)]
    pub changes: Changes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<delta::Content>,
}

impl BreakingChanges {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.removed.as_ref().map_or(true, delta::Content::is_empty)
    }
}

/// Additive changes: everything new.
///
/// `changes` stays empty after [`generate`]; changelog filters may move
/// retypings there that they consider compatible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditiveChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<delta::Content>,
    #[serde(flatten)]
    pub changes: Changes,
}

impl AdditiveChanges {
    pub fn is_empty(&self) -> bool {
        self.added.as_ref().map_or(true, delta::Content::is_empty) && self.changes.is_empty()
    }
}

/// The delta between two versions of one package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additive_changes: Option<AdditiveChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking_changes: Option<BreakingChanges>,
}

impl Package {
    /// True when nothing was added, removed or modified.
    pub fn is_empty(&self) -> bool {
        !self.has_additive_changes() && !self.has_breaking_changes()
    }

    pub fn has_breaking_changes(&self) -> bool {
        self.breaking_changes.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn has_additive_changes(&self) -> bool {
        self.additive_changes.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Removed declarations, if any were recorded.
    pub fn removed(&self) -> Option<&delta::Content> {
        self.breaking_changes.as_ref()?.removed.as_ref()
    }

    /// Added declarations, if any were recorded.
    pub fn added(&self) -> Option<&delta::Content> {
        self.additive_changes.as_ref()?.added.as_ref()
    }
}

/// Compare two snapshots of the same package.
pub fn generate(old: &exports::Content, new: &exports::Content) -> Package {
    let added = delta::get_added_exports(old, new);
    let removed = delta::get_removed_exports(old, new);

    let breaking = BreakingChanges {
        changes: Changes {
            consts: delta::get_const_type_changes(old, new),
            funcs: delta::get_func_sig_changes(old, new),
            interfaces: delta::get_interface_method_sig_changes(old, new),
            structs: delta::get_struct_field_changes(old, new),
            type_aliases: delta::get_type_alias_changes(old, new),
        },
        removed: (!removed.is_empty()).then_some(removed),
    };

    let additive = AdditiveChanges {
        added: (!added.is_empty()).then_some(added),
        changes: Changes::default(),
    };

    let package = Package {
        additive_changes: (!additive.is_empty()).then_some(additive),
        breaking_changes: (!breaking.is_empty()).then_some(breaking),
    };

    tracing::debug!(
        additive = package.has_additive_changes(),
        breaking = package.has_breaking_changes(),
        "Generated package report"
    );
    package
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::{Const, Func, Interface, Struct};

    fn content_with_const(name: &str, type_name: &str, value: &str) -> exports::Content {
        let mut content = exports::Content::default();
        content.consts.insert(
            name.to_string(),
            Const {
                type_name: type_name.to_string(),
                value: value.to_string(),
            },
        );
        content
    }

    #[test]
    fn test_identical_is_empty() {
        let mut content = content_with_const("X", "int", "1");
        content
            .funcs
            .insert("*Client.Get".into(), Func::new(Some("string"), Some("error")));
        content.interfaces.insert("Empty".into(), Interface::default());
        content.structs.insert("Zero".into(), Struct::default());

        let package = generate(&content, &content);
        assert!(package.is_empty());
        assert_eq!(package, Package::default());
    }

    #[test]
    fn test_const_type_change_is_breaking() {
        let old = content_with_const("X", "int", "1");
        let new = content_with_const("X", "int32", "1");

        let package = generate(&old, &new);
        assert!(package.has_breaking_changes());
        assert!(!package.has_additive_changes());
        let breaking = package.breaking_changes.unwrap();
        assert_eq!(breaking.changes.consts["X"], Signature::new("int", "int32"));
        assert!(breaking.removed.is_none());
    }

    #[test]
    fn test_const_value_change_is_ignored() {
        let old = content_with_const("X", "int", "1");
        let new = content_with_const("X", "int", "2");

        assert!(generate(&old, &new).is_empty());
    }

    #[test]
    fn test_func_params_change_only() {
        let mut old = exports::Content::default();
        old.funcs.insert("Do".into(), Func::new(Some("string"), Some("error")));
        let mut new = exports::Content::default();
        new.funcs
            .insert("Do".into(), Func::new(Some("string,int"), Some("error")));

        let package = generate(&old, &new);
        let funcs = &package.breaking_changes.as_ref().unwrap().changes.funcs;
        assert!(funcs["Do"].params.is_some());
        assert!(funcs["Do"].returns.is_none());
    }

    #[test]
    fn test_additions_only() {
        let old = exports::Content::default();
        let new = content_with_const("Y", "string", "y");

        let package = generate(&old, &new);
        assert!(package.has_additive_changes());
        assert!(!package.has_breaking_changes());
        assert!(package.added().unwrap().exports.consts.contains_key("Y"));
        assert!(package.removed().is_none());
    }

    #[test]
    fn test_receiver_change_is_remove_and_add() {
        let mut old = exports::Content::default();
        old.funcs.insert("Client.Get".into(), Func::default());
        let mut new = exports::Content::default();
        new.funcs.insert("*Client.Get".into(), Func::default());

        let package = generate(&old, &new);
        assert!(package.added().unwrap().exports.funcs.contains_key("*Client.Get"));
        assert!(package.removed().unwrap().exports.funcs.contains_key("Client.Get"));
        assert!(package.breaking_changes.unwrap().changes.funcs.is_empty());
    }

    #[test]
    fn test_predicates_follow_pruning() {
        let old = exports::Content::default();
        let new = content_with_const("Y", "string", "y");

        let mut package = generate(&old, &new);
        if let Some(added) = package
            .additive_changes
            .as_mut()
            .and_then(|a| a.added.as_mut())
        {
            added.exports.consts.clear();
        }
        assert!(!package.has_additive_changes());
        assert!(package.is_empty());
    }

    #[test]
    fn test_package_json_shape() {
        let old = content_with_const("X", "int", "1");
        let new = content_with_const("X", "int32", "1");

        let json = serde_json::to_value(generate(&old, &new)).unwrap();
        assert_eq!(json["breakingChanges"]["consts"]["X"]["from"], "int");
        assert_eq!(json["breakingChanges"]["consts"]["X"]["to"], "int32");
        assert!(json.get("additiveChanges").is_none());
    }
}
