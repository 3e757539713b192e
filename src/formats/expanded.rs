//! Named-field dialects: `{questions: [...]}` and the older `{quiz: [...]}`.

use serde_json::Value;

use super::{field, id_field, is_truthy, text_field, Dialect, NormalizedQuiz};
use crate::error::{ImportError, QuestionIssue};
use crate::models::{AnswerOption, BloomLevel, Difficulty, ExpandedQuiz, Question, QuestionType};

const QUESTION_TEXT_KEYS: &[&str] = &["questionText", "question", "text"];

/// Tolerant parser: invalid questions are dropped and reported as warnings.
pub(crate) fn parse_questions(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let entries = super::array_field(value, "questions", 0)?;

    let mut questions = Vec::with_capacity(entries.len());
    let mut dropped = Vec::new();
    let mut multi_correct = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match question_from_value(entry, i) {
            Ok(question) => {
                multi_correct.extend(super::multi_correct_warning(&question, i));
                questions.push(question);
            }
            Err(issue) => {
                log::debug!("Skipping {}", issue);
                dropped.push(issue);
            }
        }
    }

    if questions.is_empty() {
        if dropped.is_empty() {
            return Err(ImportError::invalid(0, "the quiz contains no questions"));
        }
        return Err(ImportError::Validation(dropped));
    }

    let quiz = ExpandedQuiz::new(title(value), description(value), questions);
    let mut normalized = NormalizedQuiz::new(Dialect::Questions, quiz);
    normalized.dropped = dropped.len();
    // Indices refer to the payload, not to the kept questions.
    normalized.warnings = dropped;
    normalized.warnings.extend(multi_correct);
    Ok(normalized)
}

/// Strict parser: one invalid question fails the import.
pub(crate) fn parse_quiz(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let entries = super::array_field(value, "quiz", 0)?;
    if entries.is_empty() {
        return Err(ImportError::invalid(0, "the quiz contains no questions"));
    }

    let questions = super::collect_strict(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| question_from_value(entry, i)),
    )?;

    Ok(NormalizedQuiz::new(
        Dialect::LegacyQuiz,
        ExpandedQuiz::new(title(value), description(value), questions),
    ))
}

fn title(value: &Value) -> String {
    text_field(value, &["title", "t"]).unwrap_or_else(|| "Untitled quiz".to_string())
}

fn description(value: &Value) -> String {
    text_field(value, &["description"]).unwrap_or_default()
}

/// Reads one named-field question.
///
/// Options come from `answerOptions`; `options` is consulted only when
/// `answerOptions` yields nothing usable. A question needs text, at least one
/// option with text, and at least one correct option.
pub(crate) fn question_from_value(entry: &Value, index: usize) -> Result<Question, QuestionIssue> {
    let text = text_field(entry, QUESTION_TEXT_KEYS)
        .ok_or_else(|| QuestionIssue::new(index, "question text is empty"))?;

    let mut answer_options = options_from(entry.get("answerOptions"));
    if answer_options.is_empty() {
        answer_options = options_from(entry.get("options"));
    }
    if answer_options.is_empty() {
        return Err(QuestionIssue::new(index, "question has no valid answer options"));
    }
    if !answer_options.iter().any(|o| o.is_correct) {
        return Err(QuestionIssue::new(index, "no option is marked correct"));
    }

    let image_url = text_field(entry, &["imageUrl", "image", "img"]);
    let question_type = match text_field(entry, &["type"]) {
        Some(tag) => QuestionType::from_tag(&tag),
        None if image_url.is_some() => QuestionType::Image,
        None => QuestionType::Text,
    };

    Ok(Question {
        id: id_field(entry, &["id"]),
        question_type,
        question: text,
        image_url,
        difficulty: Difficulty::from_value(field(entry, &["difficulty", "dif"])),
        bloom_level: BloomLevel::from_value(field(entry, &["bloomLevel", "bloom"])),
        subject: text_field(entry, &["subject"]),
        topic: text_field(entry, &["topic"]),
        subtopic: text_field(entry, &["subtopic"]),
        hint: text_field(entry, &["hint"]),
        feedback: text_field(entry, &["feedback", "explanation"]),
        answer_options,
    })
}

fn options_from(value: Option<&Value>) -> Vec<AnswerOption> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let text = text_field(item, &["text", "answerText", "option"])?;
            Some(AnswerOption {
                text,
                is_correct: is_truthy(field(item, &["isCorrect", "correct", "c"])),
                rationale: text_field(item, &["rationale", "explanation", "r"]).unwrap_or_default(),
                error_type: text_field(item, &["errorType", "et"]),
            })
        })
        .collect()
}
