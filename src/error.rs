//! Error types for quiz import and rating submission.

use serde::Serialize;
use thiserror::Error;

/// Top-level key sets the normalizer accepts, in detection order.
pub const ACCEPTED_SHAPES: &[&str] = &[
    "t/q",
    "[{i,x,o}]",
    "m/q (m.v = cQ-v*)",
    "m/q",
    "meta/q",
    "qm/q",
    "questions",
    "quiz",
];

/// One problem found in one question of an import payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionIssue {
    /// Zero-based position of the question in the payload.
    pub index: usize,
    pub message: String,
}

impl QuestionIssue {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for QuestionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "question {}: {}", self.index + 1, self.message)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ImportError {
    /// The input is not valid JSON.
    #[error("JSON syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Valid JSON, but no known dialect matches its shape.
    #[error("unrecognized quiz format; accepted top-level shapes: {}", .accepted.join(", "))]
    SchemaMismatch { accepted: Vec<String> },

    /// Known dialect, but the content breaks a question invariant.
    #[error("invalid quiz content: {}", join_issues(.0))]
    Validation(Vec<QuestionIssue>),
}

fn join_issues(issues: &[QuestionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ImportError {
    pub fn schema_mismatch() -> Self {
        ImportError::SchemaMismatch {
            accepted: ACCEPTED_SHAPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn invalid(index: usize, message: impl Into<String>) -> Self {
        ImportError::Validation(vec![QuestionIssue::new(index, message)])
    }

    /// Stable machine-readable tag for each error class.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Syntax { .. } => "syntax",
            ImportError::SchemaMismatch { .. } => "schema_mismatch",
            ImportError::Validation(_) => "validation",
        }
    }

    /// Message shown to the person importing the file. Each class reads differently.
    pub fn user_message(&self) -> String {
        match self {
            ImportError::Syntax {
                line,
                column,
                message,
            } => format!(
                "The file is not valid JSON (line {}, column {}): {}",
                line, column, message
            ),
            ImportError::SchemaMismatch { accepted } => format!(
                "The JSON is valid but its structure is not a known quiz format. Expected one of: {}",
                accepted.join(", ")
            ),
            ImportError::Validation(issues) => format!(
                "The quiz format was recognized but {} question(s) have invalid content: {}",
                issues.len(),
                join_issues(issues)
            ),
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Syntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("difficulty rating must be between 1 and 5, got {0}")]
    OutOfRange(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_keeps_position() {
        let err: ImportError = serde_json::from_str::<serde_json::Value>("{\"t\": ")
            .unwrap_err()
            .into();
        match err {
            ImportError::Syntax { line, .. } => assert_eq!(line, 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let syntax = ImportError::Syntax {
            line: 1,
            column: 2,
            message: "EOF".into(),
        };
        let schema = ImportError::schema_mismatch();
        let validation = ImportError::invalid(0, "no correct option");

        let messages = [
            syntax.user_message(),
            schema.user_message(),
            validation.user_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
        assert!(messages[1].contains("meta/q"));
        assert!(messages[1].contains("questions"));
        assert!(messages[2].contains("question 1"));
    }
}
