//! Driver that checks a program and turns the analysis into a report.
//!
//! The runner handles:
//! - Lexing and parsing source text
//! - Running the analyzer over the module
//! - Filtering and ordering the recorded facts for display


use crate::error::SonarError;
use crate::lexer::lex;
use crate::parser::ast::{NodeId, Program};
use crate::parser::parse;
use crate::types::{Analysis, Analyzer, TypeSet};
use tracing::debug;

/// Configuration for the runner
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Keep only error facts, and only for nodes that have some
    pub errors_only: bool,
    /// Report identifiers that resolved through the built-in table
    pub include_builtins: bool,
}

/// Facts recorded for one node
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub node: NodeId,
    pub line: Option<u32>,
    /// Short description of the node, e.g. `call f`
    pub label: String,
    pub facts: TypeSet,
}

/// Result of checking one program
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// What the module itself evaluates to; `cont` when it falls through
    pub result: TypeSet,
    /// Ordered by line (unknown lines last), then by node
    pub entries: Vec<Entry>,
}

impl Report {
    pub fn fault_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.facts.faults().count())
            .sum()
    }

    pub fn has_faults(&self) -> bool {
        self.fault_count() > 0
    }
}

/// The checker
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    /// Create a new runner with default configuration
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
        }
    }

    /// Create a new runner with the given configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn check_source(&self, source: &str) -> Result<Report, SonarError> {
        let tokens = lex(source)?;
        let program = parse(tokens)?;
        self.check_program(&program)
    }

    pub fn check_program(&self, program: &Program) -> Result<Report, SonarError> {
        let analysis = Analyzer::new(&program.ast).analyze(program.root)?;
        let report = self.build_report(program, analysis);

        debug!(
            entries = report.entries.len(),
            faults = report.fault_count(),
            "report built"
        );
        Ok(report)
    }

    fn build_report(&self, program: &Program, analysis: Analysis) -> Report {
        let mut entries = Vec::with_capacity(analysis.history.len());

        for (node, facts) in analysis.history.iter() {
            if !self.config.include_builtins && analysis.builtin_uses.contains(&node) {
                continue;
            }

            let facts = if self.config.errors_only {
                facts.errors()
            } else {
                facts.clone()
            };
            if self.config.errors_only && facts.is_empty() {
                continue;
            }

            entries.push(Entry {
                node,
                line: program.ast.line(node),
                label: program.ast.describe(node),
                facts,
            });
        }

        entries.sort_by_key(|entry| (entry.line.is_none(), entry.line, entry.node));

        Report {
            result: analysis.result,
            entries,
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
