//! Quiz dialect detection and normalization.
//!
//! Quiz files arrive in several historical JSON shapes. Shapes overlap, so
//! detection walks [`RULES`] in a fixed order and the first matching guard
//! wins. Every branch produces the same canonical [`ExpandedQuiz`].

pub mod compact;
pub mod expanded;
pub mod legacy;
pub mod validate;
pub mod versioned;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ImportError, QuestionIssue};
use crate::models::{ExpandedQuiz, Question};

pub use compact::{from_compact_format, to_compact_format};
pub use validate::{validate_compact, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `{t, q}` without `m`.
    CompactLongitudinal,
    /// Bare `[{i, x, o}, ...]` array, wrapped as `cQ-v2`.
    LegacyArray,
    /// `{m, q}` with `m.v` starting with `cQ-v`.
    VersionedCompact,
    /// `{m, q}` with positional question arrays.
    MaxCompact,
    /// `{meta, q}`.
    Modular,
    /// `{qm, q}`.
    QmCompact,
    /// `{questions: [...]}`.
    Questions,
    /// `{quiz: [...]}`.
    LegacyQuiz,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::CompactLongitudinal => "compact_longitudinal",
            Dialect::LegacyArray => "legacy_array",
            Dialect::VersionedCompact => "versioned_compact",
            Dialect::MaxCompact => "max_compact",
            Dialect::Modular => "modular",
            Dialect::QmCompact => "qm_compact",
            Dialect::Questions => "questions",
            Dialect::LegacyQuiz => "legacy_quiz",
        }
    }
}

/// Result of normalizing one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuiz {
    pub dialect: Dialect,
    pub quiz: ExpandedQuiz,
    /// Original `{m, q}` payload, kept next to the expansion for versioned compact imports.
    pub raw: Option<Value>,
    /// Questions skipped by the tolerant `questions` dialect.
    pub dropped: usize,
    /// Non-blocking issues: dropped questions and questions with several
    /// correct options.
    pub warnings: Vec<QuestionIssue>,
}

impl NormalizedQuiz {
    pub(crate) fn new(dialect: Dialect, quiz: ExpandedQuiz) -> Self {
        let warnings = quiz
            .questions
            .iter()
            .enumerate()
            .filter_map(|(i, question)| multi_correct_warning(question, i))
            .collect();
        Self {
            dialect,
            quiz,
            raw: None,
            dropped: 0,
            warnings,
        }
    }
}

/// Questions with more than one correct option import fine but are graded
/// as multi-select.
pub(crate) fn multi_correct_warning(question: &Question, index: usize) -> Option<QuestionIssue> {
    let correct = question.correct_indices().len();
    (correct > 1).then(|| {
        QuestionIssue::new(index, format!("{} options are marked correct", correct))
    })
}

struct DialectRule {
    dialect: Dialect,
    matches: fn(&Value) -> bool,
    parse: fn(&Value) -> Result<NormalizedQuiz, ImportError>,
}

const RULES: &[DialectRule] = &[
    DialectRule {
        dialect: Dialect::CompactLongitudinal,
        matches: is_compact_longitudinal,
        parse: compact::parse_longitudinal,
    },
    DialectRule {
        dialect: Dialect::LegacyArray,
        matches: is_legacy_array,
        parse: versioned::parse_legacy_array,
    },
    DialectRule {
        dialect: Dialect::VersionedCompact,
        matches: is_versioned_compact,
        parse: versioned::parse_versioned,
    },
    DialectRule {
        dialect: Dialect::MaxCompact,
        matches: is_max_compact,
        parse: legacy::parse_max_compact,
    },
    DialectRule {
        dialect: Dialect::Modular,
        matches: is_modular,
        parse: legacy::parse_modular,
    },
    DialectRule {
        dialect: Dialect::QmCompact,
        matches: is_qm_compact,
        parse: legacy::parse_qm,
    },
    DialectRule {
        dialect: Dialect::Questions,
        matches: is_questions,
        parse: expanded::parse_questions,
    },
    DialectRule {
        dialect: Dialect::LegacyQuiz,
        matches: is_legacy_quiz,
        parse: expanded::parse_quiz,
    },
];

fn has_keys(value: &Value, keys: &[&str]) -> bool {
    value
        .as_object()
        .map_or(false, |obj| keys.iter().all(|k| obj.contains_key(*k)))
}

fn is_compact_longitudinal(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.contains_key("t")
        && !obj.contains_key("m")
        && obj
            .get("q")
            .and_then(Value::as_array)
            .map_or(false, |q| !q.is_empty())
}

fn is_legacy_array(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|arr| arr.first())
        .map_or(false, |first| has_keys(first, &["i", "x", "o"]))
}

fn is_versioned_compact(value: &Value) -> bool {
    has_keys(value, &["m", "q"])
        && value
            .get("m")
            .and_then(|m| m.get("v"))
            .and_then(Value::as_str)
            .map_or(false, |v| v.starts_with("cQ-v"))
}

fn is_max_compact(value: &Value) -> bool {
    has_keys(value, &["m", "q"])
}

fn is_modular(value: &Value) -> bool {
    has_keys(value, &["meta", "q"])
}

fn is_qm_compact(value: &Value) -> bool {
    has_keys(value, &["qm", "q"])
}

fn is_questions(value: &Value) -> bool {
    value.get("questions").map_or(false, Value::is_array)
}

fn is_legacy_quiz(value: &Value) -> bool {
    value.get("quiz").map_or(false, Value::is_array)
}

/// Returns the dialect the payload would be parsed as, if any.
pub fn detect(value: &Value) -> Option<Dialect> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(value))
        .map(|rule| rule.dialect)
}

/// Normalizes an already-parsed JSON value.
pub fn normalize(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let rule = RULES
        .iter()
        .find(|rule| (rule.matches)(value))
        .ok_or_else(ImportError::schema_mismatch)?;

    log::debug!("Detected quiz dialect {}", rule.dialect.as_str());
    let normalized = (rule.parse)(value)?;

    if normalized.dropped > 0 {
        log::warn!(
            "Dropped {} invalid question(s) while importing '{}'",
            normalized.dropped,
            normalized.quiz.title
        );
    }
    Ok(normalized)
}

/// Parses raw text (optionally wrapped in a Markdown code fence) and normalizes it.
pub fn normalize_str(input: &str) -> Result<NormalizedQuiz, ImportError> {
    let value = parse_json(input)?;
    normalize(&value)
}

/// Parses raw text into JSON. Syntax errors never reach dialect detection.
pub fn parse_json(input: &str) -> Result<Value, ImportError> {
    Ok(serde_json::from_str(strip_code_fence(input))?)
}

fn strip_code_fence(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, `JSON`, ...) on the opening line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

// Field helpers shared by the dialect parsers.

/// First non-blank string among `keys`.
pub(crate) fn text_field(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
}

/// First present value among `keys`, skipping nulls.
pub(crate) fn field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Ids may be strings or numbers.
pub(crate) fn id_field(obj: &Value, keys: &[&str]) -> Option<String> {
    match field(obj, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `true`, `1` and `"1"` are all correct-answer markers.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    }
}

pub(crate) fn array_field<'a>(
    obj: &'a Value,
    key: &str,
    index: usize,
) -> Result<&'a Vec<Value>, ImportError> {
    obj.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::invalid(index, format!("`{}` must be an array", key)))
}

pub(crate) fn header<'a>(value: &'a Value, key: &str) -> &'a Value {
    static EMPTY: Value = Value::Null;
    value.get(key).filter(|v| v.is_object()).unwrap_or(&EMPTY)
}

/// Collects per-question results, failing the whole import on any issue.
pub(crate) fn collect_strict<T>(
    results: impl Iterator<Item = Result<T, QuestionIssue>>,
) -> Result<Vec<T>, ImportError> {
    let mut items = Vec::new();
    let mut issues = Vec::new();
    for result in results {
        match result {
            Ok(item) => items.push(item),
            Err(issue) => issues.push(issue),
        }
    }
    if issues.is_empty() {
        Ok(items)
    } else {
        Err(ImportError::Validation(issues))
    }
}

#[cfg(test)]
mod dialect_tests;
