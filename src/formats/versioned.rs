//! Versioned compact payloads `{m: {v: "cQ-v*"}, q}` and the bare legacy
//! array they grew out of.

use serde_json::{json, Value};

use super::{compact, header, text_field, Dialect, NormalizedQuiz};
use crate::error::ImportError;
use crate::models::ExpandedQuiz;

const LEGACY_ARRAY_VERSION: &str = "cQ-v2";

/// Wraps a bare `[{i, x, o}, ...]` array as a `cQ-v2` payload.
pub fn wrap_legacy_array(entries: &Value) -> Value {
    let count = entries.as_array().map_or(0, Vec::len);
    json!({
        "m": {
            "t": "Imported quiz",
            "s": "",
            "v": LEGACY_ARRAY_VERSION,
            "c": count,
        },
        "q": entries,
    })
}

pub(crate) fn parse_legacy_array(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let mut normalized = parse_versioned(&wrap_legacy_array(value))?;
    normalized.dialect = Dialect::LegacyArray;
    Ok(normalized)
}

/// Expands the payload and keeps the raw `{m, q}` next to it.
pub(crate) fn parse_versioned(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let meta = header(value, "m");
    let entries = super::array_field(value, "q", 0)?;
    if entries.is_empty() {
        return Err(ImportError::invalid(0, "the quiz contains no questions"));
    }

    let questions = compact::expand_compact_questions(entries)?;

    if let Some(expected) = meta.get("c").and_then(Value::as_u64) {
        if expected as usize != questions.len() {
            log::warn!(
                "Versioned quiz declares {} questions but contains {}",
                expected,
                questions.len()
            );
        }
    }

    let quiz = ExpandedQuiz::new(
        text_field(meta, &["t", "title"]).unwrap_or_else(|| "Untitled quiz".to_string()),
        text_field(meta, &["s", "d", "description"]).unwrap_or_default(),
        questions,
    );
    let mut normalized = NormalizedQuiz::new(Dialect::VersionedCompact, quiz);
    normalized.raw = Some(json!({
        "m": value.get("m").cloned().unwrap_or(Value::Null),
        "q": entries,
    }));
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    #[test]
    fn test_versioned_keeps_raw_payload() {
        let value = json!({
            "m": {"t": "Biología", "s": "Células", "v": "cQ-v3", "c": 1},
            "q": [{"i": "B1", "x": "¿Qué orgánulo produce ATP?", "dif": 2,
                   "o": [{"text": "Mitocondria", "c": true, "r": "respiración celular"},
                         {"text": "Ribosoma", "c": false, "r": "síntesis de proteínas"}]}]
        });
        let normalized = parse_versioned(&value).unwrap();
        assert_eq!(normalized.quiz.title, "Biología");
        assert_eq!(normalized.quiz.description, "Células");
        assert_eq!(normalized.quiz.questions[0].id.as_deref(), Some("B1"));
        assert_eq!(normalized.quiz.questions[0].difficulty, Difficulty::Moderado);
        assert_eq!(normalized.raw.as_ref().unwrap()["m"]["v"], "cQ-v3");
        assert_eq!(normalized.raw.as_ref().unwrap()["q"], value["q"]);
    }

    #[test]
    fn test_legacy_array_wrap() {
        let entries = json!([{"i": 1, "x": "Q", "o": [{"t": "a", "c": 1}]}]);
        let wrapped = wrap_legacy_array(&entries);
        assert_eq!(wrapped["m"]["v"], "cQ-v2");
        assert_eq!(wrapped["m"]["c"], 1);

        let normalized = parse_legacy_array(&entries).unwrap();
        assert_eq!(normalized.dialect, Dialect::LegacyArray);
        assert_eq!(normalized.quiz.questions[0].id.as_deref(), Some("1"));
        assert!(normalized.quiz.questions[0].answer_options[0].is_correct);
        assert!(normalized.raw.is_some());
        assert!(normalized.warnings.is_empty());

        let multi = json!([{"i": 1, "x": "Q", "o": [{"t": "a", "c": 1}, {"t": "b", "c": true}]}]);
        let warnings = parse_legacy_array(&multi).unwrap().warnings;
        assert_eq!(warnings[0].message, "2 options are marked correct");
    }

    #[test]
    fn test_invalid_entry_fails_whole_import() {
        let value = json!({
            "m": {"v": "cQ-v2"},
            "q": [{"x": "ok", "o": [{"text": "a", "c": true}]},
                  {"x": "no correct", "o": [{"text": "a", "c": false}]}]
        });
        assert!(matches!(
            parse_versioned(&value),
            Err(ImportError::Validation(issues)) if issues[0].index == 1
        ));
    }
}
