//! Set-based comparison of two export snapshots.
//!
//! Each function here looks at one category and one kind of change. The
//! [`report`](crate::report) module assembles them into a package delta.
//!
//! Added and removed sets are computed by the same function with the
//! arguments swapped, so `removed(a, b) == added(b, a)` always holds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::exports::{self, Func, Interface, Struct};

/// Placeholder used in a [`Signature`] for a side without params or returns.
pub const NONE: &str = "<none>";

/// Declarations that exist on only one side of a comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(flatten)]
    pub exports: exports::Content,
    /// Structs that are entirely new (or entirely gone). These never appear
    /// in `exports.structs` of the same value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complete_structs: Vec<String>,
}

impl Content {
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty() && self.complete_structs.is_empty()
    }
}

/// A `{from, to}` pair of type texts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub from: String,
    pub to: String,
}

impl Signature {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Compare two optional type lists, mapping a missing side to [`NONE`].
    fn between(from: Option<&str>, to: Option<&str>) -> Option<Self> {
        if from == to {
            return None;
        }
        Some(Self::new(from.unwrap_or(NONE), to.unwrap_or(NONE)))
    }
}

/// Params and/or returns that changed. Only the parts that differ are set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncSig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Signature>,
}

impl FuncSig {
    pub fn is_empty(&self) -> bool {
        self.params.is_none() && self.returns.is_none()
    }
}

/// Interface methods whose signatures changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub methods: BTreeMap<String, FuncSig>,
}

/// Struct fields whose types changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub fields: BTreeMap<String, Signature>,
}

/// Everything declared in `rhs` that `lhs` does not have.
///
/// Structs missing from `lhs` go to `complete_structs`; structs on both
/// sides contribute only their new fields and embedded types. Interfaces
/// work the same way, except that a new interface is recorded whole.
pub fn get_added_exports(lhs: &exports::Content, rhs: &exports::Content) -> Content {
    let mut added = Content::default();

    for (name, value) in &rhs.consts {
        if !lhs.consts.contains_key(name) {
            added.exports.consts.insert(name.clone(), value.clone());
        }
    }

    for (name, value) in &rhs.funcs {
        if !lhs.funcs.contains_key(name) {
            added.exports.funcs.insert(name.clone(), value.clone());
        }
    }

    for (name, value) in &rhs.interfaces {
        match lhs.interfaces.get(name) {
            None => {
                added.exports.interfaces.insert(name.clone(), value.clone());
            }
            Some(existing) => {
                let methods: BTreeMap<String, Func> = value
                    .methods
                    .iter()
                    .filter(|(method, _)| !existing.methods.contains_key(*method))
                    .map(|(method, func)| (method.clone(), func.clone()))
                    .collect();
                if !methods.is_empty() {
                    added
                        .exports
                        .interfaces
                        .insert(name.clone(), Interface { methods });
                }
            }
        }
    }

    for (name, value) in &rhs.structs {
        match lhs.structs.get(name) {
            None => added.complete_structs.push(name.clone()),
            Some(existing) => {
                let partial = added_struct_members(existing, value);
                if partial.fields.len() + partial.anonymous_fields.len() > 0 {
                    added.exports.structs.insert(name.clone(), partial);
                }
            }
        }
    }

    for (name, value) in &rhs.type_aliases {
        if !lhs.type_aliases.contains_key(name) {
            added.exports.type_aliases.insert(name.clone(), value.clone());
        }
    }

    added
}

/// Everything declared in `lhs` that `rhs` no longer has.
pub fn get_removed_exports(lhs: &exports::Content, rhs: &exports::Content) -> Content {
    get_added_exports(rhs, lhs)
}

/// Fields and embedded types of `rhs` missing from `lhs`.
fn added_struct_members(lhs: &Struct, rhs: &Struct) -> Struct {
    Struct {
        anonymous_fields: rhs
            .anonymous_fields
            .iter()
            .filter(|anon| !lhs.anonymous_fields.contains(anon))
            .cloned()
            .collect(),
        fields: rhs
            .fields
            .iter()
            .filter(|(field, _)| !lhs.fields.contains_key(*field))
            .map(|(field, ty)| (field.clone(), ty.clone()))
            .collect(),
    }
}

/// Constants present on both sides whose type changed.
///
/// Value changes alone are not reported.
pub fn get_const_type_changes(
    lhs: &exports::Content,
    rhs: &exports::Content,
) -> BTreeMap<String, Signature> {
    let mut changes = BTreeMap::new();
    for (name, old) in &lhs.consts {
        if let Some(new) = rhs.consts.get(name) {
            if old.type_name != new.type_name {
                changes.insert(
                    name.clone(),
                    Signature::new(old.type_name.clone(), new.type_name.clone()),
                );
            }
        }
    }
    changes
}

/// Compare two func shapes, keeping only the parts that differ.
pub fn func_sig_change(old: &Func, new: &Func) -> Option<FuncSig> {
    let sig = FuncSig {
        params: Signature::between(old.params.as_deref(), new.params.as_deref()),
        returns: Signature::between(old.returns.as_deref(), new.returns.as_deref()),
    };
    if sig.is_empty() {
        None
    } else {
        Some(sig)
    }
}

/// Funcs and methods present on both sides whose params or returns changed.
pub fn get_func_sig_changes(
    lhs: &exports::Content,
    rhs: &exports::Content,
) -> BTreeMap<String, FuncSig> {
    let mut changes = BTreeMap::new();
    for (name, old) in &lhs.funcs {
        if let Some(sig) = rhs.funcs.get(name).and_then(|new| func_sig_change(old, new)) {
            changes.insert(name.clone(), sig);
        }
    }
    changes
}

/// Interface methods present on both sides whose signatures changed.
pub fn get_interface_method_sig_changes(
    lhs: &exports::Content,
    rhs: &exports::Content,
) -> BTreeMap<String, InterfaceDef> {
    let mut changes = BTreeMap::new();
    for (name, old) in &lhs.interfaces {
        let Some(new) = rhs.interfaces.get(name) else {
            continue;
        };
        let methods: BTreeMap<String, FuncSig> = old
            .methods
            .iter()
            .filter_map(|(method, old_func)| {
                let new_func = new.methods.get(method)?;
                func_sig_change(old_func, new_func).map(|sig| (method.clone(), sig))
            })
            .collect();
        if !methods.is_empty() {
            changes.insert(name.clone(), InterfaceDef { methods });
        }
    }
    changes
}

/// Struct fields present on both sides whose type text changed.
pub fn get_struct_field_changes(
    lhs: &exports::Content,
    rhs: &exports::Content,
) -> BTreeMap<String, StructDef> {
    let mut changes = BTreeMap::new();
    for (name, old) in &lhs.structs {
        let Some(new) = rhs.structs.get(name) else {
            continue;
        };
        let fields: BTreeMap<String, Signature> = old
            .fields
            .iter()
            .filter_map(|(field, old_type)| {
                let new_type = new.fields.get(field)?;
                (old_type != new_type)
                    .then(|| (field.clone(), Signature::new(old_type.clone(), new_type.clone())))
            })
            .collect();
        if !fields.is_empty() {
            changes.insert(name.clone(), StructDef { fields });
        }
    }
    changes
}

/// Type aliases present on both sides whose underlying type changed.
pub fn get_type_alias_changes(
    lhs: &exports::Content,
    rhs: &exports::Content,
) -> BTreeMap<String, Signature> {
    let mut changes = BTreeMap::new();
    for (name, old) in &lhs.type_aliases {
        if let Some(new) = rhs.type_aliases.get(name) {
            if old.underlying_type != new.underlying_type {
                changes.insert(
                    name.clone(),
                    Signature::new(old.underlying_type.clone(), new.underlying_type.clone()),
                );
            }
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::{Const, TypeAlias};

    fn structs(entries: Vec<(&str, Vec<(&str, &str)>)>) -> exports::Content {
        let mut content = exports::Content::default();
        for (name, fields) in entries {
            content.structs.insert(
                name.to_string(),
                Struct {
                    anonymous_fields: Vec::new(),
                    fields: fields
                        .iter()
                        .map(|(f, t)| (f.to_string(), t.to_string()))
                        .collect(),
                },
            );
        }
        content
    }

    #[test]
    fn test_complete_vs_modified_structs() {
        let old = structs(vec![("Bar", vec![("A", "int")])]);
        let new = structs(vec![("Bar", vec![("A", "int"), ("B", "string")]), ("Foo", vec![("A", "int")])]);

        let added = get_added_exports(&old, &new);
        assert_eq!(added.complete_structs, vec!["Foo"]);
        assert!(!added.exports.structs.contains_key("Foo"));
        assert!(!added.complete_structs.contains(&"Bar".to_string()));
        assert_eq!(added.exports.structs["Bar"].fields.len(), 1);
        assert_eq!(added.exports.structs["Bar"].fields["B"], "string");

        let removed = get_removed_exports(&old, &new);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_removed_struct_fields() {
        let old = structs(vec![("Bar", vec![("A", "int"), ("B", "string")]), ("Gone", vec![])]);
        let new = structs(vec![("Bar", vec![("A", "int")])]);

        let removed = get_removed_exports(&old, &new);
        assert_eq!(removed.complete_structs, vec!["Gone"]);
        assert_eq!(
            removed.exports.structs["Bar"].fields.keys().collect::<Vec<_>>(),
            vec!["B"]
        );
    }

    #[test]
    fn test_anonymous_fields() {
        let mut old = structs(vec![("S", vec![])]);
        let mut new = old.clone();
        old.structs.get_mut("S").unwrap().anonymous_fields = vec!["Base".into()];
        new.structs.get_mut("S").unwrap().anonymous_fields = vec!["Base".into(), "*Extra".into()];

        let added = get_added_exports(&old, &new);
        assert_eq!(added.exports.structs["S"].anonymous_fields, vec!["*Extra"]);
        assert!(added.exports.structs["S"].fields.is_empty());
    }

    #[test]
    fn test_const_type_changes() {
        let mut old = exports::Content::default();
        old.consts.insert(
            "X".into(),
            Const {
                type_name: "int".into(),
                value: "1".into(),
            },
        );
        old.consts.insert(
            "Y".into(),
            Const {
                type_name: "int".into(),
                value: "1".into(),
            },
        );
        let mut new = old.clone();
        new.consts.get_mut("X").unwrap().type_name = "int32".into();
        new.consts.get_mut("Y").unwrap().value = "2".into();

        let changes = get_const_type_changes(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["X"], Signature::new("int", "int32"));
    }

    #[test]
    fn test_func_params_only() {
        let mut old = exports::Content::default();
        old.funcs
            .insert("Do".into(), Func::new(Some("string"), Some("error")));
        let mut new = exports::Content::default();
        new.funcs
            .insert("Do".into(), Func::new(Some("string,int"), Some("error")));

        let changes = get_func_sig_changes(&old, &new);
        let sig = &changes["Do"];
        assert_eq!(sig.params, Some(Signature::new("string", "string,int")));
        assert_eq!(sig.returns, None);
    }

    #[test]
    fn test_func_missing_side_uses_placeholder() {
        let sig = func_sig_change(&Func::new(None, None), &Func::new(Some("int"), None)).unwrap();
        assert_eq!(sig.params, Some(Signature::new(NONE, "int")));
        assert_eq!(sig.returns, None);

        assert!(func_sig_change(&Func::new(Some("int"), None), &Func::new(Some("int"), None)).is_none());
    }

    #[test]
    fn test_interfaces() {
        let mut old = exports::Content::default();
        let mut iface = Interface::default();
        iface.methods.insert("Get".into(), Func::new(Some("string"), Some("error")));
        iface.methods.insert("Close".into(), Func::new(None, Some("error")));
        old.interfaces.insert("Store".into(), iface);
        old.interfaces.insert("Empty".into(), Interface::default());

        let mut new = old.clone();
        let store = new.interfaces.get_mut("Store").unwrap();
        store.methods.remove("Close");
        store.methods.insert("Get".into(), Func::new(Some("string, int"), Some("error")));
        store.methods.insert("Put".into(), Func::new(Some("string"), None));

        let added = get_added_exports(&old, &new);
        assert_eq!(
            added.exports.interfaces["Store"].methods.keys().collect::<Vec<_>>(),
            vec!["Put"]
        );
        assert!(!added.exports.interfaces.contains_key("Empty"));

        let removed = get_removed_exports(&old, &new);
        assert_eq!(
            removed.exports.interfaces["Store"].methods.keys().collect::<Vec<_>>(),
            vec!["Close"]
        );

        let changes = get_interface_method_sig_changes(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes["Store"].methods["Get"].params,
            Some(Signature::new("string", "string, int"))
        );
    }

    #[test]
    fn test_empty_interface_becomes_non_empty() {
        let mut old = exports::Content::default();
        old.interfaces.insert("Marker".into(), Interface::default());
        let mut new = old.clone();
        new.interfaces
            .get_mut("Marker")
            .unwrap()
            .methods
            .insert("Mark".into(), Func::default());

        assert!(get_removed_exports(&old, &new).is_empty());
        assert!(get_interface_method_sig_changes(&old, &new).is_empty());
        assert!(get_added_exports(&old, &new).exports.interfaces["Marker"]
            .methods
            .contains_key("Mark"));
    }

    #[test]
    fn test_struct_field_changes() {
        let old = structs(vec![("S", vec![("A", "int"), ("B", "string")])]);
        let new = structs(vec![("S", vec![("A", "int64"), ("C", "bool")])]);

        let changes = get_struct_field_changes(&old, &new);
        assert_eq!(changes["S"].fields.len(), 1);
        assert_eq!(changes["S"].fields["A"], Signature::new("int", "int64"));
    }

    #[test]
    fn test_type_alias_changes() {
        let mut old = exports::Content::default();
        old.type_aliases.insert(
            "Kind".into(),
            TypeAlias {
                underlying_type: "string".into(),
            },
        );
        let mut new = old.clone();
        new.type_aliases.get_mut("Kind").unwrap().underlying_type = "int".into();

        assert_eq!(
            get_type_alias_changes(&old, &new)["Kind"],
            Signature::new("string", "int")
        );
        assert!(get_type_alias_changes(&old, &old).is_empty());
    }

    #[test]
    fn test_delta_json_shape() {
        let old = exports::Content::default();
        let new = structs(vec![("Foo", vec![("A", "int")])]);
        let json = serde_json::to_string(&get_added_exports(&old, &new)).unwrap();
        assert_eq!(json, r#"{"completeStructs":["Foo"]}"#);
    }
}
