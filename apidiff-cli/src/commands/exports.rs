//! Exports command - list the exported API of one package
//!
//! The source may be a package directory or a `.json` snapshot. JSON output
//! is the snapshot format itself, so `apidiff exports --format json` and
//! `apidiff snapshot` agree byte for byte.

use std::path::Path;

use anyhow::{Context, Result};
use apidiff_core::exports::{self, Content};
use apidiff_core::scanner::ScanOptions;
use colored::Colorize;
use serde::Serialize;

use crate::output::{JsonOutput, Output, OutputConfig, Outputter, TableOutput};

/// Exported API of one package.
#[derive(Debug, Serialize)]
pub struct ExportsResult {
    #[serde(skip)]
    pub source: String,
    #[serde(flatten)]
    pub content: Content,
}

impl ExportsResult {
    /// One `[kind, name, detail]` row per declaration, grouped by kind.
    fn rows(&self) -> Vec<Vec<String>> {
        let content = &self.content;
        let mut rows = Vec::new();

        for (name, c) in &content.consts {
            rows.push(vec![
                "const".to_string(),
                name.clone(),
                format!("{} = {}", c.type_name, c.value),
            ]);
        }
        for (name, f) in &content.funcs {
            rows.push(vec!["func".to_string(), name.clone(), f.signature()]);
        }
        for (name, i) in &content.interfaces {
            rows.push(vec![
                "interface".to_string(),
                name.clone(),
                format!("{} methods", i.methods.len()),
            ]);
            for (method, f) in &i.methods {
                rows.push(vec![
                    "method".to_string(),
                    format!("{}.{}", name, method),
                    f.signature(),
                ]);
            }
        }
        for (name, s) in &content.structs {
            let mut parts: Vec<String> = s.anonymous_fields.clone();
            parts.extend(s.fields.iter().map(|(f, t)| format!("{} {}", f, t)));
            rows.push(vec!["struct".to_string(), name.clone(), parts.join("; ")]);
        }
        for (name, t) in &content.type_aliases {
            rows.push(vec![
                "type".to_string(),
                name.clone(),
                t.underlying_type.clone(),
            ]);
        }
        rows
    }
}

impl Outputter for ExportsResult {
    fn to_table(&self, config: &OutputConfig) -> String {
        let content = &self.content;
        let mut output = String::new();

        output.push_str(&format!(
            "{} {}\n\n",
            "Exports:".cyan().bold(),
            self.source.bold()
        ));
        output.push_str(&TableOutput::format_key_value(
            &[
                ("Consts", content.consts.len().to_string()),
                ("Funcs", content.funcs.len().to_string()),
                ("Interfaces", content.interfaces.len().to_string()),
                ("Structs", content.structs.len().to_string()),
                ("Type aliases", content.type_aliases.len().to_string()),
            ],
            config,
        ));
        output.push_str("\n\n");
        output.push_str(&TableOutput::from_rows(
            &["Kind", "Name", "Detail"],
            &self.rows(),
            config,
        ));
        output
    }

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(&self.content, config)
    }

    fn to_markdown(&self, _config: &OutputConfig) -> String {
        let mut md = format!("## `{}`\n", self.source);
        let mut current = "";
        for row in self.rows() {
            let heading = match row[0].as_str() {
                "const" => "Consts",
                "func" => "Functions",
                "interface" | "method" => "Interfaces",
                "struct" => "Structs",
                _ => "Types",
            };
            if heading != current {
                md.push_str(&format!("\n### {}\n\n", heading));
                current = heading;
            }
            md.push_str(&format!("- `{}` {}\n", row[1], row[2]));
        }
        md
    }
}

/// Run the exports command.
pub fn run(source: &str, options: &ScanOptions, config: OutputConfig) -> Result<()> {
    let content = exports::load(Path::new(source), options)
        .with_context(|| format!("Failed to extract exports from {}", source))?;

    tracing::debug!("Extracted {} exported symbols", content.symbol_count());

    let result = ExportsResult {
        source: source.to_string(),
        content,
    };
    Output::with_config(result, config).render()
}
