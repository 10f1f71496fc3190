//! Unified error handling for sonar.
//!
//! Every phase that can stop a run (lexing, parsing, analysis) converts its
//! own error into [`SonarError`], which carries a source location where one
//! is known. Type faults found during analysis are not errors; they are
//! reported as facts.


use crate::lexer::token::{Position, Span};
use std::fmt;

/// A run-stopping error from any phase.
#[derive(Debug, Clone, PartialEq)]
pub enum SonarError {
    /// Lexer error (tokenization failed)
    LexError { message: String, position: Position },

    /// Parser error (syntax error)
    ParseError { message: String, span: Span },

    /// The analyzer met a construct it cannot evaluate
    AnalysisError { message: String, line: Option<u32> },
}

impl SonarError {
    pub fn lex(message: impl Into<String>, position: Position) -> Self {
        SonarError::LexError {
            message: message.into(),
            position,
        }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        SonarError::ParseError {
            message: message.into(),
            span,
        }
    }

    pub fn analysis(message: impl Into<String>, line: Option<u32>) -> Self {
        SonarError::AnalysisError {
            message: message.into(),
            line,
        }
    }

    /// Short error kind description (e.g., "LexError", "ParseError").
    pub fn kind(&self) -> &'static str {
        match self {
            SonarError::LexError { .. } => "LexError",
            SonarError::ParseError { .. } => "ParseError",
            SonarError::AnalysisError { .. } => "AnalysisError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SonarError::LexError { message, .. } => message,
            SonarError::ParseError { message, .. } => message,
            SonarError::AnalysisError { message, .. } => message,
        }
    }

    /// Source line of the error, if known.
    pub fn line(&self) -> Option<u32> {
        match self {
            SonarError::LexError { position, .. } => Some(position.line),
            SonarError::ParseError { span, .. } => Some(span.start.line),
            SonarError::AnalysisError { line, .. } => *line,
        }
    }
}

impl fmt::Display for SonarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SonarError::LexError { message, position } => {
                write!(f, "LexError at {}:{}: {}", position.line, position.column, message)
            }
            SonarError::ParseError { message, span } => {
                write!(
                    f,
                    "ParseError at {}:{}: {}",
                    span.start.line, span.start.column, message
                )
            }
            SonarError::AnalysisError { message, line } => match line {
                Some(line) => write!(f, "AnalysisError at line {}: {}", line, message),
                None => write!(f, "AnalysisError: {}", message),
            },
        }
    }
}

impl std::error::Error for SonarError {}

// Conversions from the phase error types

impl From<crate::lexer::LexError> for SonarError {
    fn from(err: crate::lexer::LexError) -> Self {
        use crate::lexer::LexError;
        match err {
            LexError::UnexpectedCharacter { ch, position } => {
                SonarError::lex(format!("Unexpected character '{}'", ch), position)
            }
            LexError::UnterminatedString { position } => {
                SonarError::lex("Unterminated string literal", position)
            }
            LexError::InvalidNumber { text, position } => {
                SonarError::lex(format!("Invalid number: '{}'", text), position)
            }
            LexError::InconsistentIndentation { position } => {
                SonarError::lex("Unindent does not match any outer indentation level", position)
            }
        }
    }
}

impl From<crate::parser::ParseError> for SonarError {
    fn from(err: crate::parser::ParseError) -> Self {
        let position = Position::new(err.line as u32, err.column as u32);
        let span = Span::new(position, position);
        SonarError::parse(err.message, span)
    }
}

impl From<crate::types::InferError> for SonarError {
    fn from(err: crate::types::InferError) -> Self {
        use crate::types::InferError;
        let message = err.to_string();
        match err {
            InferError::UnrecognizedStatement { line, .. } => SonarError::analysis(message, line),
        }
    }
}
