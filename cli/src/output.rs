//! CLI output formatting for text, JSON and JSONL modes.
//!
//! JSON and JSONL are the machine-readable formats, meant for editors and CI
//! systems that want to consume the inferred facts.

use serde::Serialize;
use sonar_lang::error::SonarError;
use sonar_lang::runner::{Entry, Report};
use sonar_lang::types::Type;
use std::io::{self, Write};

/// Output mode for CLI execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable output, coloured on a terminal (default)
    Text,
    /// Single JSON object once analysis completes
    Json,
    /// One JSON object per entry, then a summary line
    Jsonl,
}

/// A fault as shown to tools.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFault {
    pub code: &'static str,
    pub message: String,
}

/// Facts recorded at one node.
#[derive(Debug, Clone, Serialize)]
pub struct JsonEntry {
    pub node: usize,
    pub line: Option<u32>,
    pub label: String,
    /// Non-error types, rendered
    pub types: Vec<String>,
    pub faults: Vec<JsonFault>,
}

/// Entry and fault counts.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub entries: usize,
    pub faults: usize,
}

/// JSON output for a completed analysis.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReportOutput {
    #[serde(rename = "type")]
    pub output_type: &'static str,
    pub status: &'static str,
    pub result: String,
    pub entries: Vec<JsonEntry>,
    pub summary: JsonSummary,
}

/// JSONL line for one entry.
#[derive(Debug, Clone, Serialize)]
pub struct JsonlEntry {
    #[serde(rename = "type")]
    pub output_type: &'static str,
    #[serde(flatten)]
    pub entry: JsonEntry,
}

/// Closing JSONL line.
#[derive(Debug, Clone, Serialize)]
pub struct JsonlSummary {
    #[serde(rename = "type")]
    pub output_type: &'static str,
    pub status: &'static str,
    pub result: String,
    #[serde(flatten)]
    pub summary: JsonSummary,
}

/// Error location; columns are only known for lex and parse errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: Option<u32>,
}

/// JSON output for errors.
#[derive(Debug, Clone, Serialize)]
pub struct JsonErrorOutput {
    #[serde(rename = "type")]
    pub output_type: &'static str,
    pub kind: &'static str,
    pub message: String,
    pub location: Option<ErrorLocation>,
}

fn status(report: &Report) -> &'static str {
    if report.has_faults() {
        "faults"
    } else {
        "clean"
    }
}

fn summary(report: &Report) -> JsonSummary {
    JsonSummary {
        entries: report.entries.len(),
        faults: report.fault_count(),
    }
}

pub fn to_json_entry(entry: &Entry) -> JsonEntry {
    let mut types = Vec::new();
    let mut faults = Vec::new();

    for ty in entry.facts.iter() {
        match ty {
            Type::Error(fault) => faults.push(JsonFault {
                code: fault.code(),
                message: fault.to_string(),
            }),
            other => types.push(other.to_string()),
        }
    }

    JsonEntry {
        node: entry.node.index(),
        line: entry.line,
        label: entry.label.clone(),
        types,
        faults,
    }
}

/// Format one entry as `<line>: <label>: <facts>`.
pub fn format_text_entry(entry: &Entry, colour: bool) -> String {
    let line = entry.line.map_or("?".to_string(), |l| l.to_string());

    if !colour {
        return format!("{}: {}: {}", line, entry.label, entry.facts);
    }

    let facts = if entry.facts.has_faults() {
        format!("\x1b[31m{}\x1b[0m", entry.facts)
    } else {
        format!("\x1b[32m{}\x1b[0m", entry.facts)
    };
    format!("\x1b[90m{}:\x1b[0m {}: {}", line, entry.label, facts)
}

/// Format a report as JSON.
pub fn format_report_json(report: &Report) -> serde_json::Result<String> {
    let output = JsonReportOutput {
        output_type: "report",
        status: status(report),
        result: report.result.to_string(),
        entries: report.entries.iter().map(to_json_entry).collect(),
        summary: summary(report),
    };
    serde_json::to_string(&output)
}

/// Format a SonarError as JSON error output.
pub fn format_error_json(error: &SonarError) -> serde_json::Result<String> {
    let location = match error {
        SonarError::LexError { position, .. } => Some(ErrorLocation {
            line: position.line,
            column: Some(position.column),
        }),
        SonarError::ParseError { span, .. } => Some(ErrorLocation {
            line: span.start.line,
            column: Some(span.start.column),
        }),
        SonarError::AnalysisError { line, .. } => line.map(|line| ErrorLocation { line, column: None }),
    };

    let output = JsonErrorOutput {
        output_type: "error",
        kind: error.kind(),
        message: error.message().to_string(),
        location,
    };
    serde_json::to_string(&output)
}

/// JSONL streaming writer.
pub struct JsonlWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one object as a line.
    pub fn write_line<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        let json = serde_json::to_string(value)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()
    }

    /// Write every entry of a report followed by its summary.
    pub fn write_report(&mut self, report: &Report) -> io::Result<()> {
        for entry in &report.entries {
            self.write_line(&JsonlEntry {
                output_type: "entry",
                entry: to_json_entry(entry),
            })?;
        }

        self.write_line(&JsonlSummary {
            output_type: "summary",
            status: status(report),
            result: report.result.to_string(),
            summary: summary(report),
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
