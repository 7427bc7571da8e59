//! Go declaration extractor using tree-sitter.
//!
//! Works one file at a time: [`parse_file`] returns the package clause and
//! the exported declarations of a single source file. Package selection and
//! merging happen in the parent module.

use std::path::Path;
use tree_sitter::{Node, Parser};

use super::helpers::{
    children_by_field, field_text, find_child_by_type, first_error, get_node_text,
    get_span_text, get_start_line, is_exported, named_children, strip_quotes,
};
use super::{Const, Content, Func, Interface, Struct, TypeAlias};
use crate::error::{ExtractError, Result};

/// Const type recorded for values that reference another package's identifier.
pub const REFERENCE_TYPE: &str = "Reference";

/// Exported declarations of a single source file.
#[derive(Debug, Default)]
pub struct FileExports {
    /// Name from the package clause.
    pub package: String,
    /// Exported declarations found in the file.
    pub content: Content,
}

/// Parse one Go source file.
///
/// `path` is used for error messages only.
pub fn parse_file(source: &str, path: &Path) -> Result<FileExports> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_go::LANGUAGE.into())?;

    let tree = parser.parse(source, None).ok_or_else(|| ExtractError::Parse {
        file: path.to_path_buf(),
        message: "parser returned no tree".to_string(),
    })?;
    let root = tree.root_node();

    if let Some(bad) = first_error(&root) {
        return Err(ExtractError::Parse {
            file: path.to_path_buf(),
            message: format!(
                "syntax error at line {} near '{}'",
                get_start_line(&bad),
                get_node_text(&bad, source).lines().next().unwrap_or("")
            ),
        });
    }

    let mut file = FileExports::default();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                if let Some(id) = find_child_by_type(&child, "package_identifier") {
                    file.package = get_node_text(&id, source).to_string();
                }
            }
            "function_declaration" => {
                extract_function(&child, source, &mut file.content);
            }
            "method_declaration" => {
                extract_method(&child, source, &mut file.content);
            }
            "type_declaration" => {
                extract_type_declaration(&child, source, &mut file.content);
            }
            "const_declaration" => {
                extract_consts(&child, source, path, &mut file.content)?;
            }
            _ => {}
        }
    }

    Ok(file)
}

/// Extract a package-level function.
fn extract_function(node: &Node, source: &str, content: &mut Content) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    if !is_exported(name) {
        return;
    }
    content.funcs.insert(name.to_string(), func_shape(node, source));
}

/// Extract a method, keyed `Receiver.Name` with the receiver text verbatim.
fn extract_method(node: &Node, source: &str, content: &mut Content) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let Some(receiver) = node
        .child_by_field_name("receiver")
        .and_then(|list| find_child_by_type(&list, "parameter_declaration"))
        .and_then(|param| field_text(&param, "type", source))
    else {
        return;
    };

    if !is_exported(name) || !is_exported(receiver_base_name(receiver)) {
        tracing::trace!("Skipping unexported method {}.{}", receiver, name);
        return;
    }

    content
        .funcs
        .insert(format!("{}.{}", receiver, name), func_shape(node, source));
}

/// `*Client[T]` -> `Client`
fn receiver_base_name(receiver: &str) -> &str {
    let base = receiver.trim_start_matches('*').trim();
    match base.find('[') {
        Some(idx) => base[..idx].trim_end(),
        None => base,
    }
}

/// Build the params/returns shape of anything with `parameters` and `result` fields.
fn func_shape(node: &Node, source: &str) -> Func {
    let params = node
        .child_by_field_name("parameters")
        .and_then(|list| render_parameter_list(&list, source));

    let returns = node.child_by_field_name("result").and_then(|result| {
        if result.kind() == "parameter_list" {
            render_parameter_list(&result, source)
        } else {
            Some(get_node_text(&result, source).to_string())
        }
    });

    Func {
        params,
        returns,
        replaced_by: None,
    }
}

/// Render a parameter list as comma-joined types, one entry per declared name.
///
/// Returns `None` for an empty list.
fn render_parameter_list(list: &Node, source: &str) -> Option<String> {
    let mut types: Vec<String> = Vec::new();

    for param in named_children(list) {
        match param.kind() {
            "parameter_declaration" => {
                let Some(type_text) = field_text(&param, "type", source) else {
                    continue;
                };
                let count = children_by_field(&param, "name").len().max(1);
                types.extend(std::iter::repeat(type_text.to_string()).take(count));
            }
            "variadic_parameter_declaration" => {
                if let Some(type_text) = field_text(&param, "type", source) {
                    types.push(format!("...{}", type_text));
                }
            }
            _ => {}
        }
    }

    if types.is_empty() {
        None
    } else {
        Some(types.join(", "))
    }
}

/// Extract all specs of a `type` declaration.
fn extract_type_declaration(node: &Node, source: &str, content: &mut Content) {
    for spec in named_children(node) {
        if !matches!(spec.kind(), "type_spec" | "type_alias") {
            continue;
        }
        let Some(name) = field_text(&spec, "name", source) else {
            continue;
        };
        if !is_exported(name) {
            continue;
        }
        let Some(type_node) = spec.child_by_field_name("type") else {
            continue;
        };

        match type_node.kind() {
            "struct_type" => {
                content
                    .structs
                    .insert(name.to_string(), extract_struct(&type_node, source));
            }
            "interface_type" => {
                content
                    .interfaces
                    .insert(name.to_string(), extract_interface(&type_node, source));
            }
            "type_identifier" | "qualified_type" => {
                content.type_aliases.insert(
                    name.to_string(),
                    TypeAlias {
                        underlying_type: get_node_text(&type_node, source).to_string(),
                    },
                );
            }
            other => {
                tracing::trace!("Skipping type {} with underlying {}", name, other);
            }
        }
    }
}

/// Extract struct fields and embedded types.
fn extract_struct(node: &Node, source: &str) -> Struct {
    let mut result = Struct::default();
    let Some(list) = find_child_by_type(node, "field_declaration_list") else {
        return result;
    };

    for field in named_children(&list) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let Some(type_node) = field.child_by_field_name("type") else {
            continue;
        };
        let names = children_by_field(&field, "name");

        if names.is_empty() {
            // Embedded: keep the optional pointer marker, drop the tag
            result
                .anonymous_fields
                .push(get_span_text(&field, &type_node, source).to_string());
        } else {
            let type_text = get_node_text(&type_node, source);
            for name in names {
                result
                    .fields
                    .insert(get_node_text(&name, source).to_string(), type_text.to_string());
            }
        }
    }

    result
}

/// Extract the method set of an interface. Embedded elements are skipped.
fn extract_interface(node: &Node, source: &str) -> Interface {
    let mut result = Interface::default();

    for elem in named_children(node) {
        if !matches!(elem.kind(), "method_elem" | "method_spec") {
            continue;
        }
        if let Some(name) = field_text(&elem, "name", source) {
            result
                .methods
                .insert(name.to_string(), func_shape(&elem, source));
        }
    }

    result
}

/// Extract exported constants from a `const` declaration.
fn extract_consts(node: &Node, source: &str, path: &Path, content: &mut Content) -> Result<()> {
    // Specs without type and value repeat the previous spec (iota blocks)
    let mut previous: Option<Node> = None;

    for spec in named_children(node) {
        if spec.kind() != "const_spec" {
            continue;
        }

        let has_own_value =
            spec.child_by_field_name("type").is_some() || spec.child_by_field_name("value").is_some();
        let source_spec = if has_own_value {
            previous = Some(spec);
            spec
        } else {
            match previous {
                Some(prev) => prev,
                None => continue,
            }
        };

        let declared_type = field_text(&source_spec, "type", source);
        let values = source_spec
            .child_by_field_name("value")
            .map(|list| named_children(&list))
            .unwrap_or_default()
            .into_iter()
            .filter(|n| n.kind() != "comment")
            .collect::<Vec<_>>();

        for (idx, name_node) in const_names(&spec).iter().enumerate() {
            let name = get_node_text(name_node, source);
            if !is_exported(name) {
                continue;
            }
            let Some(value) = values.get(idx) else {
                tracing::debug!("Const {} has no value at position {}", name, idx);
                continue;
            };
            let constant = const_from_value(value, declared_type, source).ok_or_else(|| {
                ExtractError::UnhandledConst {
                    file: path.to_path_buf(),
                    text: get_node_text(&spec, source).to_string(),
                }
            })?;
            content.consts.insert(name.to_string(), constant);
        }
    }

    Ok(())
}

/// Declared names of a const spec, in order.
///
/// The grammar only tags the first identifier with the `name` field, so the
/// direct `identifier` children are collected instead.
fn const_names<'a>(spec: &Node<'a>) -> Vec<Node<'a>> {
    named_children(spec)
        .into_iter()
        .filter(|n| n.kind() == "identifier")
        .collect()
}

/// Const type for an untyped literal, named after the literal kind.
fn literal_type(kind: &str) -> Option<&'static str> {
    match kind {
        "int_literal" => Some("int"),
        "float_literal" => Some("float"),
        "imaginary_literal" => Some("imag"),
        "rune_literal" => Some("char"),
        "interpreted_string_literal" | "raw_string_literal" => Some("string"),
        _ => None,
    }
}

/// Build a `Const` from one value expression. `None` means the shape is not modelled.
fn const_from_value(value: &Node, declared_type: Option<&str>, source: &str) -> Option<Const> {
    let text = get_node_text(value, source);

    if let Some(kind) = literal_type(value.kind()) {
        return Some(Const {
            type_name: declared_type.unwrap_or(kind).to_string(),
            value: strip_quotes(text).to_string(),
        });
    }

    match value.kind() {
        // FooType("value")
        "call_expression" => {
            let target = field_text(value, "function", source)?;
            let argument = value
                .child_by_field_name("arguments")
                .and_then(|args| named_children(&args).into_iter().find(|n| n.kind() != "comment"))?;
            Some(Const {
                type_name: target.to_string(),
                value: strip_quotes(get_node_text(&argument, source)).to_string(),
            })
        }
        // pkg.Identifier
        "selector_expression" => Some(Const {
            type_name: REFERENCE_TYPE.to_string(),
            value: text.to_string(),
        }),
        _ => declared_type.map(|ty| Const {
            type_name: ty.to_string(),
            value: text.to_string(),
        }),
    }
}
