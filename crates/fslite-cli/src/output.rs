//! Output formatting for CLI commands: aligned tables for people, JSON for
//! scripts.

use std::fmt;
use std::io::Write;

use serde::Serialize;

pub type OutputRow = Vec<String>;

/// Rows of cells; the first row is the header when there is more than one.
pub type OutputTable = Vec<OutputRow>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Column-aligned table.
    #[default]
    Table,
    /// JSON, one document per command.
    Json,
}

pub struct Printer<W: Write = Box<dyn Write>> {
    out: W,
    format: OutputFormat,
}

impl Printer<Box<dyn Write>> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self {
            out: Box::new(std::io::stdout()),
            format,
        }
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn print_message(&mut self, msg: &str) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => writeln!(self.out, "{}", msg),
            OutputFormat::Json => {
                let obj = serde_json::json!({ "message": msg });
                writeln!(self.out, "{}", serde_json::to_string_pretty(&obj).unwrap_or_default())
            }
        }
    }

    pub fn print_error(&mut self, err: &str) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => writeln!(self.out, "Error: {}", err),
            OutputFormat::Json => {
                let obj = serde_json::json!({ "error": err });
                writeln!(self.out, "{}", serde_json::to_string_pretty(&obj).unwrap_or_default())
            }
        }
    }

    /// Print a table. In JSON mode a table with a header row becomes an
    /// array of objects keyed by the header.
    pub fn print_table(&mut self, table: &OutputTable) -> std::io::Result<()> {
        if table.is_empty() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Table => self.print_table_aligned(table),
            OutputFormat::Json => self.print_table_json(table),
        }
    }

    /// Print the command result: its serialized form in JSON mode, the
    /// table otherwise.
    pub fn print_output(&mut self, output: &CommandOutput) -> std::io::Result<()> {
        match (&self.format, &output.value) {
            (OutputFormat::Json, Some(value)) => {
                let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
                writeln!(self.out, "{}", json)
            }
            _ => self.print_table(&output.table),
        }
    }

    fn print_table_aligned(&mut self, table: &OutputTable) -> std::io::Result<()> {
        const SEPARATOR: usize = 2;

        let mut widths: Vec<usize> = Vec::new();
        for row in table {
            if widths.len() < row.len() {
                widths.resize(row.len(), 0);
            }
            for (col, cell) in row.iter().enumerate() {
                widths[col] = widths[col].max(cell.len() + SEPARATOR);
            }
        }

        for row in table {
            let mut line = String::new();
            for (col, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if col + 1 < row.len() {
                    let padding = widths[col].saturating_sub(cell.len());
                    line.extend(std::iter::repeat(' ').take(padding));
                }
            }
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    fn print_table_json(&mut self, table: &OutputTable) -> std::io::Result<()> {
        if table.len() <= 1 {
            let json = serde_json::to_string_pretty(table).map_err(std::io::Error::other)?;
            return writeln!(self.out, "{}", json);
        }

        let headers = &table[0];
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = table[1..]
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let key = headers.get(i).cloned().unwrap_or_else(|| format!("col_{}", i));
                        (key, serde_json::Value::String(cell.clone()))
                    })
                    .collect()
            })
            .collect();
        let json = serde_json::to_string_pretty(&rows).map_err(std::io::Error::other)?;
        writeln!(self.out, "{}", json)
    }
}

impl<W: Write> fmt::Debug for Printer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer").field("format", &self.format).finish()
    }
}

/// What a command produced: a table for people and, optionally, the
/// structured value behind it for JSON output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub table: OutputTable,
    pub value: Option<serde_json::Value>,
}

impl CommandOutput {
    pub fn table(table: OutputTable) -> Self {
        Self { table, value: None }
    }

    /// Attach the serialized form of `value`.
    pub fn with_value<T: Serialize>(mut self, value: &T) -> anyhow::Result<Self> {
        self.value = Some(serde_json::to_value(value)?);
        Ok(self)
    }
}

pub fn table_with_header(headers: &[&str]) -> OutputTable {
    vec![headers.iter().map(|h| h.to_string()).collect()]
}

pub fn kv_row(key: &str, value: impl fmt::Display) -> OutputRow {
    vec![key.to_string(), value.to_string()]
}

/// Human-friendly byte count, e.g. `"1.50 MiB"`.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// `node_<n>` or `-` for an empty placement slot.
pub fn format_node(node: Option<fslite_types::NodeId>) -> String {
    node.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: OutputFormat, f: impl FnOnce(&mut Printer<&mut Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        {
            let mut printer = Printer::new(&mut buf, format);
            f(&mut printer);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_table_aligned_output() {
        let table = vec![
            vec!["Node".to_string(), "Status".to_string(), "Chunks".to_string()],
            vec!["node_0".to_string(), "ONLINE".to_string(), "12".to_string()],
            vec!["node_10".to_string(), "OFFLINE".to_string(), "0".to_string()],
        ];
        let out = render(OutputFormat::Table, |p| p.print_table(&table).unwrap());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].find("Status"), lines[1].find("ONLINE"));
        assert_eq!(lines[0].find("Chunks"), lines[1].find("12"));
    }

    #[test]
    fn test_table_json_output() {
        let table = vec![
            vec!["Node".to_string(), "Status".to_string()],
            vec!["node_0".to_string(), "ONLINE".to_string()],
            vec!["node_1".to_string(), "OFFLINE".to_string()],
        ];
        let out = render(OutputFormat::Json, |p| p.print_table(&table).unwrap());
        let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["Node"], "node_1");
        assert_eq!(parsed[1]["Status"], "OFFLINE");
    }

    #[test]
    fn test_output_prefers_value_in_json_mode() {
        let output = CommandOutput::table(vec![kv_row("Status", "HEALTHY")])
            .with_value(&serde_json::json!({ "status": "HEALTHY" }))
            .unwrap();
        let json = render(OutputFormat::Json, |p| p.print_output(&output).unwrap());
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["status"], "HEALTHY");

        let text = render(OutputFormat::Table, |p| p.print_output(&output).unwrap());
        assert!(text.starts_with("Status"));
    }

    #[test]
    fn test_messages_and_errors() {
        assert_eq!(
            render(OutputFormat::Table, |p| p.print_message("done").unwrap()).trim(),
            "done"
        );
        let err = render(OutputFormat::Json, |p| p.print_error("boom").unwrap());
        let parsed: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(parsed["error"], "boom");
        assert!(render(OutputFormat::Table, |p| p.print_table(&vec![]).unwrap()).is_empty());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(table_with_header(&["A", "B"]), vec![vec!["A", "B"]]);
        assert_eq!(kv_row("Chunks", 3), vec!["Chunks", "3"]);
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(format_node(None), "-");
        assert_eq!(format_node(Some(fslite_types::NodeId(3))), "node_3");
    }
}
