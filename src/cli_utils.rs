use std::fmt;
use std::process;
use std::str::FromStr;

use handled::Handle;

use crate::NODE_LIST_COLUMNS;
use crate::commands::{CommandError, CommandOutput, UserError, format_cli_error};

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned ASCII tables.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!(
                "unknown output format '{}': expected table, json or yaml",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Exits the program with an error message
pub fn exit_with_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exits the program with an error message and usage information
pub fn exit_with_usage_error(message: &str, usage: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("{}", usage);
    process::exit(1);
}

/// Exits the program, printing the error's message and hint if it has one
pub fn exit_with_cli_error<E>(error: &E) -> !
where
    E: Handle<UserError> + fmt::Display,
{
    eprintln!("{}", format_cli_error(error));
    process::exit(1);
}

/// Exits after a failed command, first printing whatever it got done.
///
/// Lines for nodes that succeeded go to stdout and per-node failures to
/// stderr, ahead of the error itself.
pub fn exit_with_command_error(error: &CommandError) -> ! {
    for line in error.output() {
        println!("{}", line);
    }
    for failure in error.failures() {
        eprintln!("{}", failure);
    }
    exit_with_cli_error(error)
}

/// Serializes a value in the requested machine-readable format.
pub fn format_value<T>(value: &T, format: OutputFormat) -> Result<String, String>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Json | OutputFormat::Table => {
            serde_json::to_string_pretty(value).map_err(|e| format!("JSON: {}", e))
        }
        OutputFormat::Yaml => serde_yml::to_string(value)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| format!("YAML: {}", e)),
    }
}

/// Renders a command's output, or `None` if it produces nothing.
pub fn render_output(output: &CommandOutput, format: OutputFormat) -> Result<Option<String>, String> {
    let rendered = match (output, format) {
        (CommandOutput::Nothing, _) => return Ok(None),
        (CommandOutput::Messages(lines), _) => lines.join("\n"),
        (CommandOutput::Nodes { nodes, full_id }, OutputFormat::Table) => {
            let rows: Vec<Vec<String>> = nodes.iter().map(|n| n.list_row(*full_id)).collect();
            render_table(&NODE_LIST_COLUMNS, &rows)
        }
        (CommandOutput::Nodes { nodes, .. }, format) => format_value(nodes, format)?,
        (CommandOutput::Node { node, details }, OutputFormat::Table) => {
            let rows: Vec<Vec<String>> = node
                .field_rows(*details)
                .into_iter()
                .map(|(field, value)| vec![field, value])
                .collect();
            render_table(&["Field", "Value"], &rows)
        }
        (CommandOutput::Node { node, .. }, format) => format_value(node, format)?,
    };
    Ok(Some(rendered))
}

/// Prints a command's output or exits with error
pub fn print_output_or_exit(output: &CommandOutput, format: OutputFormat) {
    match render_output(output, format) {
        Ok(Some(text)) => println!("{}", text),
        Ok(None) => {}
        Err(e) => exit_with_error(&format!("Failed to format output as {}", e)),
    }
}

/// Renders an ASCII grid. Cells may span several lines.
pub fn render_table<H>(headers: &[H], rows: &[Vec<String>]) -> String
where
    H: AsRef<str>,
{
    let mut widths: Vec<usize> = headers.iter().map(|h| h.as_ref().chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            let widest = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            widths[i] = widths[i].max(widest);
        }
    }

    let border: String = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let border = format!("+{}+", border);

    let mut out = vec![border.clone()];
    let header: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
    out.extend(render_row(&header, &widths));
    out.push(border.clone());
    for row in rows {
        out.extend(render_row(row, &widths));
    }
    if !rows.is_empty() {
        out.push(border);
    }
    out.join("\n")
}

fn render_row(cells: &[String], widths: &[usize]) -> Vec<String> {
    let split: Vec<Vec<&str>> = widths
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let lines: Vec<&str> = cell.lines().collect();
            if lines.is_empty() { vec![""] } else { lines }
        })
        .collect();
    let height = split.iter().map(Vec::len).max().unwrap_or(1);

    (0..height)
        .map(|line| {
            let parts: Vec<String> = split
                .iter()
                .zip(widths)
                .map(|(lines, width)| {
                    let text = lines.get(line).copied().unwrap_or("");
                    let pad = width - text.chars().count();
                    format!(" {}{} ", text, " ".repeat(pad))
                })
                .collect();
            format!("|{}|", parts.join("|"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;
    use serde_json::json;

    fn node() -> Node {
        serde_json::from_value(json!({
            "id": "0df0931b-e251-4f2e-8719-4ebfda3627ba",
            "name": "my_node",
            "status": "ACTIVE",
            "profile_name": "mystack"
        }))
        .unwrap()
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("yml".parse::<OutputFormat>(), Ok(OutputFormat::Yaml));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "table");
    }

    #[test]
    fn table_is_aligned() {
        let rows = vec![vec!["a".to_string(), "longer".to_string()]];
        let table = render_table(&["id", "name"], &rows);
        assert_eq!(
            table,
            "+----+--------+\n\
             | id | name   |\n\
             +----+--------+\n\
             | a  | longer |\n\
             +----+--------+"
        );
    }

    #[test]
    fn table_handles_multiline_cells() {
        let rows = vec![vec!["details".to_string(), "a: 1\nbb: 2".to_string()]];
        let table = render_table(&["Field", "Value"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[3], "| details | a: 1  |");
        assert_eq!(lines[4], "|         | bb: 2 |");
    }

    #[test]
    fn empty_listing_renders_only_headers() {
        let output = CommandOutput::Nodes {
            nodes: Vec::new(),
            full_id: false,
        };
        let text = render_output(&output, OutputFormat::Table).unwrap().unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("profile_name"));
    }

    #[test]
    fn list_table_shortens_ids() {
        let output = CommandOutput::Nodes {
            nodes: vec![node()],
            full_id: false,
        };
        let text = render_output(&output, OutputFormat::Table).unwrap().unwrap();
        assert!(text.contains("| 0df0931b |"));
        assert!(!text.contains("e251"));
    }

    #[test]
    fn node_renders_as_json_and_yaml() {
        let output = CommandOutput::Node {
            node: node(),
            details: false,
        };
        let text = render_output(&output, OutputFormat::Json).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["name"], "my_node");

        let text = render_output(&output, OutputFormat::Yaml).unwrap().unwrap();
        assert!(text.contains("name: my_node"));
    }

    #[test]
    fn nothing_renders_nothing() {
        assert_eq!(render_output(&CommandOutput::Nothing, OutputFormat::Json), Ok(None));
    }
}
