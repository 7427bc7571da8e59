//! Diff command - exported-API delta between two package versions
//!
//! Each side is a package directory or a `.json` snapshot. The JSON output
//! is the package report (`additiveChanges` / `breakingChanges`); the table
//! view flattens it into one row per change.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use apidiff_core::changelog::Changelog;
use apidiff_core::delta::{self, FuncSig, Signature};
use apidiff_core::exports;
use apidiff_core::report::{self, Changes, Package};
use apidiff_core::scanner::ScanOptions;
use colored::Colorize;
use serde::Serialize;

use crate::output::{JsonOutput, Output, OutputConfig, Outputter};

/// A single API change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiChange {
    pub change_type: String,
    pub entity_type: String,
    pub entity_name: String,
    pub is_breaking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiChange {
    fn new(change_type: &str, entity_type: &str, entity_name: impl Into<String>) -> Self {
        Self {
            change_type: change_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_name: entity_name.into(),
            is_breaking: change_type != "added",
            description: None,
        }
    }

    fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Diff result
#[derive(Debug, Serialize)]
pub struct DiffResult {
    pub old: String,
    pub new: String,
    pub report: Package,
    pub duration_ms: u64,
}

impl DiffResult {
    /// Flatten the report into changes, breaking ones first.
    pub fn changes(&self) -> Vec<ApiChange> {
        let mut changes = Vec::new();
        if let Some(breaking) = &self.report.breaking_changes {
            modified(&breaking.changes, true, &mut changes);
            if let Some(removed) = &breaking.removed {
                one_sided(removed, "removed", &mut changes);
            }
        }
        if let Some(additive) = &self.report.additive_changes {
            if let Some(added) = &additive.added {
                one_sided(added, "added", &mut changes);
            }
            modified(&additive.changes, false, &mut changes);
        }
        changes
    }
}

fn arrow(sig: &Signature) -> String {
    format!("{} -> {}", sig.from, sig.to)
}

fn func_arrow(sig: &FuncSig) -> String {
    let mut parts = Vec::new();
    if let Some(params) = &sig.params {
        parts.push(format!("params: {}", arrow(params)));
    }
    if let Some(returns) = &sig.returns {
        parts.push(format!("returns: {}", arrow(returns)));
    }
    parts.join("; ")
}

fn modified(changes: &Changes, is_breaking: bool, out: &mut Vec<ApiChange>) {
    let mut push = |entity_type: &str, name: String, description: String| {
        let mut change = ApiChange::new("modified", entity_type, name).describe(description);
        change.is_breaking = is_breaking;
        out.push(change);
    };

    for (name, sig) in &changes.consts {
        push("const", name.clone(), arrow(sig));
    }
    for (name, sig) in &changes.funcs {
        push("func", name.clone(), func_arrow(sig));
    }
    for (name, def) in &changes.interfaces {
        for (method, sig) in &def.methods {
            push("method", format!("{}.{}", name, method), func_arrow(sig));
        }
    }
    for (name, def) in &changes.structs {
        for (field, sig) in &def.fields {
            push("field", format!("{}.{}", name, field), arrow(sig));
        }
    }
    for (name, sig) in &changes.type_aliases {
        push("type", name.clone(), arrow(sig));
    }
}

fn one_sided(content: &delta::Content, change_type: &str, out: &mut Vec<ApiChange>) {
    let exports = &content.exports;

    for (name, c) in &exports.consts {
        out.push(ApiChange::new(change_type, "const", name.clone()).describe(&c.type_name));
    }
    for (name, f) in &exports.funcs {
        out.push(ApiChange::new(change_type, "func", name.clone()).describe(f.signature()));
    }
    for (name, i) in &exports.interfaces {
        if i.methods.is_empty() {
            out.push(ApiChange::new(change_type, "interface", name.clone()));
        }
        for (method, f) in &i.methods {
            out.push(
                ApiChange::new(change_type, "method", format!("{}.{}", name, method))
                    .describe(f.signature()),
            );
        }
    }
    for name in &content.complete_structs {
        out.push(ApiChange::new(change_type, "struct", name.clone()));
    }
    for (name, s) in &exports.structs {
        for anon in &s.anonymous_fields {
            out.push(ApiChange::new(
                change_type,
                "anonymous field",
                format!("{}.{}", name, anon),
            ));
        }
        for (field, t) in &s.fields {
            out.push(
                ApiChange::new(change_type, "field", format!("{}.{}", name, field)).describe(t),
            );
        }
    }
    for (name, t) in &exports.type_aliases {
        out.push(ApiChange::new(change_type, "type", name.clone()).describe(&t.underlying_type));
    }
}

impl Outputter for DiffResult {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let changes = self.changes();
        let (breaking, additive): (Vec<_>, Vec<_>) =
            changes.iter().partition(|change| change.is_breaking);

        let mut output = String::new();
        output.push_str(&format!(
            "{} {} -> {}\n",
            "DIFF:".cyan().bold(),
            self.old.yellow(),
            self.new.green()
        ));
        output.push_str(&format!(
            "Found {} changes ({} breaking) ({}ms)\n",
            changes.len().to_string().cyan(),
            breaking.len().to_string().red(),
            self.duration_ms
        ));

        if changes.is_empty() {
            output.push_str(&format!("\n{}", "No exported API changes".dimmed()));
            return output;
        }

        if !breaking.is_empty() {
            output.push_str(&format!("\n{}\n", "BREAKING CHANGES:".red().bold()));
            output.push_str(&format!("{}\n", "-".repeat(60)));
            for change in &breaking {
                output.push_str(&format!(
                    "  {} {} ({})\n",
                    change.entity_name.red().bold(),
                    format!("[{}]", change.entity_type).dimmed(),
                    change.change_type
                ));
                if let Some(desc) = &change.description {
                    output.push_str(&format!("     {}\n", desc.dimmed()));
                }
            }
        }

        if !additive.is_empty() {
            output.push_str(&format!("\n{}\n", "ADDITIONS:".green().bold()));
            output.push_str(&format!("{}\n", "-".repeat(60)));
            for change in &additive {
                output.push_str(&format!(
                    "  {} {} ({})\n",
                    change.entity_name.green(),
                    format!("[{}]", change.entity_type).dimmed(),
                    change.change_type
                ));
                if let Some(desc) = &change.description {
                    output.push_str(&format!("     {}\n", desc.dimmed()));
                }
            }
        }

        output
    }

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(&self.report, config)
    }

    fn to_markdown(&self, _config: &OutputConfig) -> String {
        let changelog = Changelog {
            modified: Some(self.report.clone()),
            ..Default::default()
        };
        changelog.to_markdown()
    }
}

/// Run the diff command.
///
/// Returns whether the delta contains breaking changes.
pub fn run(old: &str, new: &str, options: &ScanOptions, config: OutputConfig) -> Result<bool> {
    let start = Instant::now();

    let (old_content, new_content) = rayon::join(
        || exports::load(Path::new(old), options),
        || exports::load(Path::new(new), options),
    );
    let old_content = old_content.with_context(|| format!("Failed to extract {}", old))?;
    let new_content = new_content.with_context(|| format!("Failed to extract {}", new))?;

    let report = report::generate(&old_content, &new_content);
    let has_breaking = report.has_breaking_changes();

    let result = DiffResult {
        old: old.to_string(),
        new: new.to_string(),
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    Output::with_config(result, config).render()?;

    Ok(has_breaking)
}
