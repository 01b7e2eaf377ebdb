use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Keys tried, in order, when printing a record in quiet mode.
const IDENTIFIER_KEYS: [&str; 4] = ["id", "permaId", "userName", "name"];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Csv,
    Quiet,
}

pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.render_to(value, &mut out)
    }

    /// Writes `value` in the selected format. Values that have no tabular
    /// shape fall back to pretty JSON.
    pub fn render_to<T: Serialize, W: Write>(&self, value: &T, out: &mut W) -> Result<()> {
        let json_value = serde_json::to_value(value)?;

        let rendered = match self.format {
            OutputFormat::Table => Self::render_table(&json_value, out)?,
            OutputFormat::Json => false,
            OutputFormat::Yaml => {
                write!(out, "{}", serde_yaml::to_string(&json_value)?)?;
                true
            }
            OutputFormat::Csv => Self::render_csv(&json_value, out)?,
            OutputFormat::Quiet => Self::render_quiet(&json_value, out)?,
        };

        if !rendered {
            writeln!(out, "{}", serde_json::to_string_pretty(&json_value)?)?;
        }
        Ok(())
    }

    /// Status line for a completed action. Suppressed in quiet mode.
    pub fn success(&self, message: &str) {
        if self.format != OutputFormat::Quiet {
            println!("{} {}", "✓".green().bold(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message);
    }

    fn render_table<W: Write>(value: &Value, out: &mut W) -> Result<bool> {
        let Some((headers, rows)) = Self::coerce_rows(value) else {
            return Ok(false);
        };

        let mut builder = Builder::default();
        builder.push_record(headers);
        for row in rows {
            builder.push_record(row);
        }

        let table = builder.build().with(Style::rounded()).to_string();
        writeln!(out, "{table}")?;
        Ok(true)
    }

    fn render_csv<W: Write>(value: &Value, out: &mut W) -> Result<bool> {
        let Some((headers, rows)) = Self::coerce_rows(value) else {
            return Ok(false);
        };

        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&headers)?;
        for row in rows {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(true)
    }

    fn render_quiet<W: Write>(value: &Value, out: &mut W) -> Result<bool> {
        let mut printed = false;
        match value {
            Value::Array(rows) => {
                for row in rows {
                    if let Some(id) = Self::identifier(row) {
                        writeln!(out, "{id}")?;
                        printed = true;
                    }
                }
            }
            Value::Null => {}
            other => {
                if let Some(id) = Self::identifier(other) {
                    writeln!(out, "{id}")?;
                    printed = true;
                }
            }
        }
        Ok(printed)
    }

    fn identifier(value: &Value) -> Option<String> {
        match value {
            Value::Object(obj) => IDENTIFIER_KEYS.iter().find_map(|key| match obj.get(*key) {
                Some(Value::Object(nested)) => nested.get("id").and_then(Self::scalar),
                Some(other) => Self::scalar(other),
                None => None,
            }),
            other => Self::scalar(other),
        }
    }

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn coerce_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let rows = match value {
            Value::Array(rows) if !rows.is_empty() => rows,
            _ => return None,
        };

        let mut headers = BTreeSet::new();
        for row in rows {
            if let Value::Object(obj) = row {
                headers.extend(obj.keys().cloned());
            }
        }

        if headers.is_empty() {
            return None;
        }

        let headers: Vec<String> = headers.into_iter().collect();
        let data = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|header| {
                        row.get(header)
                            .map(Self::value_to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Some((headers, data))
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            // Perma-ids arrive as {"id": "CR-1"}.
            Value::Object(obj) if obj.len() == 1 && obj.contains_key("id") => {
                Self::value_to_string(&obj["id"])
            }
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(format: OutputFormat, value: &Value) -> String {
        let mut out = Vec::new();
        OutputRenderer::new(format)
            .render_to(value, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_coerce_rows_mixed_keys() {
        let value = json!([
            {"permaId": {"id": "CR-1"}, "name": "Parser"},
            {"permaId": {"id": "CR-2"}, "state": "Review"}
        ]);

        let (headers, rows) = OutputRenderer::coerce_rows(&value).unwrap();
        assert_eq!(headers, ["name", "permaId", "state"]);
        assert_eq!(rows[0], ["Parser", "CR-1", ""]);
        assert_eq!(rows[1], ["", "CR-2", "Review"]);
    }

    #[test]
    fn test_coerce_rows_rejects_non_tabular() {
        assert!(OutputRenderer::coerce_rows(&json!([])).is_none());
        assert!(OutputRenderer::coerce_rows(&json!({"id": "1"})).is_none());
        assert!(OutputRenderer::coerce_rows(&json!(["one", "two"])).is_none());
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(OutputRenderer::value_to_string(&json!("hello")), "hello");
        assert_eq!(OutputRenderer::value_to_string(&json!(42)), "42");
        assert_eq!(OutputRenderer::value_to_string(&json!(null)), "");
        assert_eq!(
            OutputRenderer::value_to_string(&json!({"userName": "bob"})),
            "{\"userName\":\"bob\"}"
        );
    }

    #[test]
    fn test_quiet_prefers_identifier_keys() {
        let value = json!([
            {"permaId": {"id": "CR-1"}, "name": "Parser"},
            {"userName": "bob", "displayName": "Bob"},
            {"name": "core"},
            {"displayName": "nobody"}
        ]);
        assert_eq!(render(OutputFormat::Quiet, &value), "CR-1\nbob\ncore\n");
    }

    #[test]
    fn test_quiet_without_identifier_falls_back_to_json() {
        let output = render(OutputFormat::Quiet, &json!({"message": "done"}));
        assert!(output.contains("\"message\": \"done\""));
    }

    #[test]
    fn test_csv_escapes_fields() {
        let value = json!([{"name": "a, b", "id": "1"}]);
        assert_eq!(render(OutputFormat::Csv, &value), "id,name\n1,\"a, b\"\n");
    }

    #[test]
    fn test_table_contains_cells() {
        let value = json!([{"id": "CR-1", "state": "Review"}]);
        let output = render(OutputFormat::Table, &value);
        assert!(output.contains("CR-1"));
        assert!(output.contains("state"));
    }

    #[test]
    fn test_json_and_yaml() {
        let value = json!({"id": "CR-1"});
        assert_eq!(render(OutputFormat::Json, &value), "{\n  \"id\": \"CR-1\"\n}\n");
        assert_eq!(render(OutputFormat::Yaml, &value), "id: CR-1\n");
    }
}
