//! Compact storage dialect `{t, q}` and the expander shared with the
//! versioned `cQ-v*` payloads.

use serde_json::Value;

use super::{
    expanded, field, id_field, is_truthy, text_field, validate, Dialect, NormalizedQuiz,
};
use crate::error::{ImportError, QuestionIssue};
use crate::models::{
    AnswerOption, CompactOption, CompactQuestion, CompactQuiz, Difficulty, ExpandedQuiz,
    Question, QuestionType,
};

/// Compresses an expanded quiz into the `{t, q}` storage form.
///
/// `description` and per-question `feedback`/`bloomLevel` have no compact slot
/// and are not carried over.
pub fn to_compact_format(quiz: &ExpandedQuiz) -> CompactQuiz {
    let q = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| CompactQuestion {
            x: question.question.clone(),
            dif: question.difficulty.level(),
            qt: question.question_type.as_str().to_string(),
            id: question
                .id
                .clone()
                .unwrap_or_else(|| format!("Q{:03}", index + 1)),
            sj: question.subject.clone(),
            tp: question.topic.clone(),
            sb: question.subtopic.clone(),
            img: question.image_url.clone(),
            hint: question.hint.clone(),
            o: question
                .answer_options
                .iter()
                .map(|option| CompactOption {
                    text: option.text.clone(),
                    c: option.is_correct,
                    r: option.rationale.clone(),
                    et: option.error_type.clone(),
                })
                .collect(),
        })
        .collect();

    CompactQuiz {
        t: quiz.title.clone(),
        q,
    }
}

/// Expands a typed compact quiz back into the canonical form.
pub fn from_compact_format(compact: &CompactQuiz) -> ExpandedQuiz {
    let questions = compact
        .q
        .iter()
        .map(|cq| Question {
            id: Some(cq.id.clone()),
            question_type: QuestionType::from_tag(&cq.qt),
            question: cq.x.clone(),
            image_url: cq.img.clone(),
            difficulty: Difficulty::from_level(i64::from(cq.dif)),
            bloom_level: None,
            subject: cq.sj.clone(),
            topic: cq.tp.clone(),
            subtopic: cq.sb.clone(),
            hint: cq.hint.clone(),
            feedback: None,
            answer_options: cq
                .o
                .iter()
                .map(|o| AnswerOption {
                    text: o.text.clone(),
                    is_correct: o.c,
                    rationale: o.r.clone(),
                    error_type: o.et.clone(),
                })
                .collect(),
        })
        .collect();

    ExpandedQuiz::new(compact.t.clone(), "", questions)
}

/// Parses a `{t, q}` payload. Hard validation errors block the import.
pub(crate) fn parse_longitudinal(value: &Value) -> Result<NormalizedQuiz, ImportError> {
    let entries = super::array_field(value, "q", 0)?;
    let title = text_field(value, &["t"]).unwrap_or_else(|| "Untitled quiz".to_string());

    let uses_x = entries.first().map_or(false, |q| q.get("x").is_some());
    if !uses_x {
        // Entries without `x` use the named-field aliases of the `questions` dialect.
        let questions = super::collect_strict(
            entries
                .iter()
                .enumerate()
                .map(|(i, q)| expanded::question_from_value(q, i)),
        )?;
        return Ok(NormalizedQuiz::new(
            Dialect::CompactLongitudinal,
            ExpandedQuiz::new(title, "", questions),
        ));
    }

    let report = validate::validate_compact(value);
    if !report.is_importable() {
        return Err(ImportError::Validation(report.errors));
    }

    let questions = expand_compact_questions(entries)?;
    let mut normalized = NormalizedQuiz::new(
        Dialect::CompactLongitudinal,
        ExpandedQuiz::new(title, "", questions),
    );
    normalized.warnings = report.warnings;
    Ok(normalized)
}

/// Expands `{x|..., o: [...]}` entries. Any invalid entry fails the batch.
pub(crate) fn expand_compact_questions(entries: &[Value]) -> Result<Vec<Question>, ImportError> {
    super::collect_strict(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| expand_compact_question(entry, i)),
    )
}

fn expand_compact_question(entry: &Value, index: usize) -> Result<Question, QuestionIssue> {
    let text = text_field(entry, &["x"])
        .ok_or_else(|| QuestionIssue::new(index, "missing question text `x`"))?;

    let raw_options = entry
        .get("o")
        .and_then(Value::as_array)
        .filter(|o| !o.is_empty())
        .ok_or_else(|| QuestionIssue::new(index, "missing or empty option list `o`"))?;

    let mut answer_options = Vec::with_capacity(raw_options.len());
    for (j, option) in raw_options.iter().enumerate() {
        let text = text_field(option, &["text", "t"])
            .ok_or_else(|| QuestionIssue::new(index, format!("option {} has no text", j + 1)))?;
        answer_options.push(AnswerOption {
            text,
            is_correct: is_truthy(option.get("c")),
            rationale: text_field(option, &["r"]).unwrap_or_default(),
            error_type: text_field(option, &["et", "e"]),
        });
    }

    if !answer_options.iter().any(|o| o.is_correct) {
        return Err(QuestionIssue::new(index, "no option is marked correct"));
    }

    let image_url = text_field(entry, &["img"]);
    let question_type = match text_field(entry, &["qt"]) {
        Some(tag) => QuestionType::from_tag(&tag),
        None if image_url.is_some() => QuestionType::Image,
        None => QuestionType::Text,
    };

    Ok(Question {
        id: id_field(entry, &["id", "i"]),
        question_type,
        question: text,
        image_url,
        difficulty: Difficulty::from_value(field(entry, &["dif", "d"])),
        bloom_level: None,
        subject: text_field(entry, &["sj"]),
        topic: text_field(entry, &["tp"]),
        subtopic: text_field(entry, &["sb"]),
        hint: text_field(entry, &["hint", "h"]),
        feedback: None,
        answer_options,
    })
}
