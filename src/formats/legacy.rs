//! Older compact dialects: positional max-compact `{m, q}`, modular
//! `{meta, q}` and `{qm, q}`. All three are strict.

use serde_json::Value;

use super::{field, header, id_field, is_truthy, text_field, Dialect, NormalizedQuiz};
use crate::error::{ImportError, QuestionIssue};
use crate::models::{AnswerOption, BloomLevel, Difficulty, ExpandedQuiz, Question, QuestionType};

/// `q` entries are `[id, bloomCode, difficulty, text, ...options]`, each option
/// `[_, text, correct (1|0), errorType | null]`.
pub(crate) fn parse_max_compact(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let meta = header(value, "m");
    let entries = non_empty_questions(value)?;
    let questions = super::collect_strict(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| positional_question(entry, i)),
    )?;

    Ok(NormalizedQuiz::new(
        Dialect::MaxCompact,
        ExpandedQuiz::new(quiz_title(meta), quiz_description(meta), questions),
    ))
}

fn positional_question(entry: &Value, index: usize) -> Result<Question, QuestionIssue> {
    let parts = entry
        .as_array()
        .ok_or_else(|| QuestionIssue::new(index, "entry must be a positional array"))?;
    if parts.len() < 5 {
        return Err(QuestionIssue::new(
            index,
            "entry needs an id, bloom code, difficulty, text and at least one option",
        ));
    }

    let id = match &parts[0] {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    let text = parts[3]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| QuestionIssue::new(index, "missing question text"))?
        .to_string();

    let mut answer_options = Vec::with_capacity(parts.len() - 4);
    for (j, option) in parts[4..].iter().enumerate() {
        let text = option
            .as_array()
            .and_then(|o| o.get(1))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| QuestionIssue::new(index, format!("option {} has no text", j + 1)))?;
        answer_options.push(AnswerOption {
            text: text.to_string(),
            is_correct: is_truthy(option.get(2)),
            rationale: String::new(),
            error_type: option
                .get(3)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        });
    }
    require_correct(&answer_options, index)?;

    Ok(Question {
        id,
        question_type: QuestionType::Text,
        question: text,
        image_url: None,
        difficulty: Difficulty::from_value(parts.get(2)),
        bloom_level: BloomLevel::from_value(parts.get(1)),
        subject: None,
        topic: None,
        subtopic: None,
        hint: None,
        feedback: None,
        answer_options,
    })
}

/// `q` entries are `{txt, ana, dif, ops: [{val, ok, err}]}`.
pub(crate) fn parse_modular(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let meta = header(value, "meta");
    let entries = non_empty_questions(value)?;
    let questions = super::collect_strict(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| modular_question(entry, i)),
    )?;

    Ok(NormalizedQuiz::new(
        Dialect::Modular,
        ExpandedQuiz::new(quiz_title(meta), quiz_description(meta), questions),
    ))
}

fn modular_question(entry: &Value, index: usize) -> Result<Question, QuestionIssue> {
    let text = text_field(entry, &["txt"])
        .ok_or_else(|| QuestionIssue::new(index, "missing question text `txt`"))?;
    let answer_options = named_options(entry, "ops", &["val"], &["ok"], &[], &["err"], index)?;

    Ok(Question {
        id: id_field(entry, &["id"]),
        question: text,
        difficulty: Difficulty::from_value(field(entry, &["dif"])),
        feedback: text_field(entry, &["ana"]),
        hint: text_field(entry, &["hint"]),
        answer_options,
        ..Default::default()
    })
}

/// `q` entries are `{t, ct, d, b, o: [{t, c, r}]}`.
pub(crate) fn parse_qm(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let meta = header(value, "qm");
    let entries = non_empty_questions(value)?;
    let questions = super::collect_strict(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| qm_question(entry, i)),
    )?;

    Ok(NormalizedQuiz::new(
        Dialect::QmCompact,
        ExpandedQuiz::new(quiz_title(meta), quiz_description(meta), questions),
    ))
}

fn qm_question(entry: &Value, index: usize) -> Result<Question, QuestionIssue> {
    let text = text_field(entry, &["t"])
        .ok_or_else(|| QuestionIssue::new(index, "missing question text `t`"))?;
    let answer_options = named_options(entry, "o", &["t"], &["c"], &["r"], &[], index)?;

    Ok(Question {
        id: id_field(entry, &["id", "i"]),
        question: text,
        difficulty: Difficulty::from_value(field(entry, &["d"])),
        bloom_level: BloomLevel::from_value(field(entry, &["b"])),
        topic: text_field(entry, &["ct"]),
        answer_options,
        ..Default::default()
    })
}

fn named_options(
    entry: &Value,
    key: &str,
    text_keys: &[&str],
    correct_keys: &[&str],
    rationale_keys: &[&str],
    error_keys: &[&str],
    index: usize,
) -> Result<Vec<AnswerOption>, QuestionIssue> {
    let items = entry
        .get(key)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| {
            QuestionIssue::new(index, format!("missing or empty option list `{}`", key))
        })?;

    let mut options = Vec::with_capacity(items.len());
    for (j, item) in items.iter().enumerate() {
        let text = text_field(item, text_keys)
            .ok_or_else(|| QuestionIssue::new(index, format!("option {} has no text", j + 1)))?;
        options.push(AnswerOption {
            text,
            is_correct: is_truthy(field(item, correct_keys)),
            rationale: text_field(item, rationale_keys).unwrap_or_default(),
            error_type: text_field(item, error_keys),
        });
    }
    require_correct(&options, index)?;
    Ok(options)
}

fn require_correct(options: &[AnswerOption], index: usize) -> Result<(), QuestionIssue> {
    if options.iter().any(|o| o.is_correct) {
        Ok(())
    } else {
        Err(QuestionIssue::new(index, "no option is marked correct"))
    }
}

fn non_empty_questions(value: &Value) -> Result<&Vec<Value>, ImportError> {
    let entries = super::array_field(value, "q", 0)?;
    if entries.is_empty() {
        return Err(ImportError::invalid(0, "the quiz contains no questions"));
    }
    Ok(entries)
}

fn quiz_title(meta: &Value) -> String {
    text_field(meta, &["t", "title"]).unwrap_or_else(|| "Untitled quiz".to_string())
}

fn quiz_description(meta: &Value) -> String {
    text_field(meta, &["s", "desc", "description"]).unwrap_or_default()
}
