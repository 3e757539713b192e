use super::*;
use crate::models::Difficulty;
use serde_json::json;

fn samples() -> Vec<(Dialect, Value)> {
    vec![
        (
            Dialect::CompactLongitudinal,
            json!({"t": "Q", "q": [{"x": "2+2?", "dif": 1, "qt": "mcq", "id": "Q001",
                "o": [{"text": "4", "c": true, "r": "correct"}, {"text": "5", "c": false, "r": "wrong"}]}]}),
        ),
        (
            Dialect::LegacyArray,
            json!([{"i": "L1", "x": "Legacy?", "o": [{"text": "yes", "c": true}]}]),
        ),
        (
            Dialect::VersionedCompact,
            json!({"m": {"t": "V", "v": "cQ-v2"}, "q": [{"x": "V?", "o": [{"text": "a", "c": true}]}]}),
        ),
        (
            Dialect::MaxCompact,
            json!({"m": {"t": "M"}, "q": [["1", 1, 2, "M?", [0, "a", 1, null]]]}),
        ),
        (
            Dialect::Modular,
            json!({"meta": {"title": "Mod"}, "q": [{"txt": "Mod?", "ops": [{"val": "a", "ok": true}]}]}),
        ),
        (
            Dialect::QmCompact,
            json!({"qm": {"t": "QM"}, "q": [{"t": "QM?", "o": [{"t": "a", "c": true}]}]}),
        ),
        (
            Dialect::Questions,
            json!({"title": "Rich", "questions": [{"question": "R?", "answerOptions": [{"text": "a", "isCorrect": true}]}]}),
        ),
        (
            Dialect::LegacyQuiz,
            json!({"quiz": [{"question": "Old?", "options": [{"text": "a", "correct": true}]}]}),
        ),
    ]
}

#[test]
fn test_each_sample_routes_to_its_dialect() {
    for (expected, value) in samples() {
        let matching: Vec<Dialect> = RULES
            .iter()
            .filter(|rule| (rule.matches)(&value))
            .map(|rule| rule.dialect)
            .collect();
        // Later guards may overlap; the first match is the one that counts.
        assert_eq!(matching.first(), Some(&expected));
        assert_eq!(detect(&value), Some(expected));

        let normalized = normalize(&value).unwrap();
        assert_eq!(normalized.dialect, expected);
        assert_eq!(normalized.quiz.total_questions, 1);
    }
}

#[test]
fn test_versioned_wins_over_max_compact() {
    let value = json!({"m": {"v": "cQ-v9"}, "q": [{"x": "?", "o": [{"text": "a", "c": true}]}]});
    assert_eq!(detect(&value), Some(Dialect::VersionedCompact));

    let unversioned = json!({"m": {"v": "v2"}, "q": [["1", 1, 1, "?", [0, "a", 1, null]]]});
    assert_eq!(detect(&unversioned), Some(Dialect::MaxCompact));
}

#[test]
fn test_unknown_shapes_are_schema_mismatch() {
    for value in [
        json!({"foo": []}),
        json!([]),
        json!([1, 2, 3]),
        json!("just a string"),
        json!({"questions": "not an array"}),
        json!({"t": "empty", "q": []}),
    ] {
        match normalize(&value) {
            Err(ImportError::SchemaMismatch { accepted }) => {
                assert!(accepted.iter().any(|s| s == "m/q"));
                assert!(accepted.iter().any(|s| s == "quiz"));
            }
            other => panic!("expected schema mismatch for {}, got {:?}", value, other),
        }
    }
}

#[test]
fn test_syntax_error_is_distinct() {
    assert!(matches!(
        normalize_str("{\"t\": \"Q\", \"q\": [}"),
        Err(ImportError::Syntax { .. })
    ));
}

#[test]
fn test_compact_scenario() {
    let input = r#"{"t":"Q","q":[{"x":"2+2?","dif":1,"qt":"mcq","id":"Q001",
        "o":[{"text":"4","c":true,"r":"correct"},{"text":"5","c":false,"r":"wrong"}]}]}"#;
    let normalized = normalize_str(input).unwrap();
    let quiz = &normalized.quiz;
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.questions[0].difficulty, Difficulty::Facil);
    assert_eq!(quiz.questions[0].answer_options.len(), 2);
    assert!(quiz.questions[0].answer_options[0].is_correct);

    let expanded = serde_json::to_value(quiz).unwrap();
    assert_eq!(expanded["total_questions"], 1);
    assert_eq!(expanded["questions"][0]["difficulty"], "fácil");
}

#[test]
fn test_fenced_input_is_accepted() {
    let input = "```json\n{\"quiz\": [{\"question\": \"?\", \"options\": [{\"text\": \"a\", \"correct\": 1}]}]}\n```";
    assert_eq!(normalize_str(input).unwrap().dialect, Dialect::LegacyQuiz);
}

#[test]
fn test_compact_validation_errors_block_import() {
    let value = json!({"t": "Q", "q": [{"x": "?", "dif": 1, "qt": "mcq", "id": "Q001",
        "o": [{"text": "a", "c": "yes"}]}]});
    match normalize(&value) {
        Err(ImportError::Validation(issues)) => {
            assert!(issues.iter().any(|i| i.message.contains("not a boolean")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}
