//! Output formatting for documents.
//!
//! Supports table and JSON output formats.

use std::collections::BTreeSet;

use comfy_table::{Cell, ContentArrangement, Table};
use serde_json::Value as JsonValue;
use stow_store::Document;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses a format name from configuration.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Formats a list of documents.
pub fn format_documents(docs: &[Document], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(docs),
        OutputFormat::Json => serde_json::to_string_pretty(docs).unwrap_or_else(|_| "[]".to_string()),
    }
}

/// Formats a single document.
pub fn format_document(doc: &Document, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(std::slice::from_ref(doc)),
        OutputFormat::Json => serde_json::to_string_pretty(doc).unwrap_or_else(|_| "{}".to_string()),
    }
}

/// Formats a list of names, one per line or as a JSON array.
pub fn format_names(names: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => names.join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(names).unwrap_or_else(|_| "[]".to_string()),
    }
}

/// Formats documents as a table with one column per field seen.
fn format_table(docs: &[Document]) -> String {
    let columns: BTreeSet<&str> = docs
        .iter()
        .flat_map(|doc| doc.fields.keys().map(String::as_str))
        .collect();

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    table.set_header(std::iter::once("id").chain(columns.iter().copied()).map(Cell::new));

    for doc in docs {
        let mut cells = vec![Cell::new(&doc.id)];
        cells.extend(
            columns
                .iter()
                .map(|col| Cell::new(doc.get(col).map(display_value).unwrap_or_default())),
        );
        table.add_row(cells);
    }

    table.to_string()
}

/// Renders a JSON value for a table cell. Strings are shown unquoted.
fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
