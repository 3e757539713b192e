//! Batch import: each payload is normalized and stored on its own, so one bad
//! file never aborts the rest.

use serde::Serialize;

use crate::db::Db;
use crate::error::ImportError;
use crate::formats::{self, NormalizedQuiz};

#[derive(Debug, Clone, Serialize)]
pub struct ImportedQuiz {
    pub id: String,
    pub title: String,
    pub dialect: String,
    pub total_questions: usize,
    pub dropped_questions: usize,
    pub warnings: Vec<String>,
}

impl ImportedQuiz {
    fn new(id: String, normalized: &NormalizedQuiz) -> Self {
        Self {
            id,
            title: normalized.quiz.title.clone(),
            dialect: normalized.dialect.as_str().to_string(),
            total_questions: normalized.quiz.questions.len(),
            dropped_questions: normalized.dropped,
            warnings: normalized.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub source: String,
    /// `syntax`, `schema_mismatch`, `validation`, `storage` or `io`.
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub dropped_questions: usize,
    pub imported: Vec<ImportedQuiz>,
    pub failures: Vec<ImportFailure>,
}

/// Normalizes and stores one payload.
pub async fn import_one(db: &Db, input: &str) -> Result<ImportedQuiz, ImportOutcomeError> {
    let normalized = formats::normalize_str(input)?;
    let id = db
        .save_quiz(&normalized)
        .await
        .map_err(ImportOutcomeError::Storage)?;
    Ok(ImportedQuiz::new(id, &normalized))
}

/// Why one payload of a batch did not make it into the store.
#[derive(Debug, thiserror::Error)]
pub enum ImportOutcomeError {
    #[error(transparent)]
    Format(#[from] ImportError),
    #[error("failed to store quiz: {0}")]
    Storage(anyhow::Error),
}

impl ImportOutcomeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ImportOutcomeError::Format(err) => err.kind(),
            ImportOutcomeError::Storage(_) => "storage",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ImportOutcomeError::Format(err) => err.user_message(),
            ImportOutcomeError::Storage(err) => format!("The quiz could not be saved: {}", err),
        }
    }
}

/// Imports `(source name, contents)` pairs in order.
pub async fn import_batch<I, S>(db: &Db, items: I) -> BatchSummary
where
    I: IntoIterator<Item = (S, String)>,
    S: Into<String>,
{
    let mut summary = BatchSummary::default();

    for (source, contents) in items {
        let source = source.into();
        match import_one(db, &contents).await {
            Ok(imported) => {
                log::info!(
                    "Imported {} as quiz {} ({} questions)",
                    source,
                    imported.id,
                    imported.total_questions
                );
                summary.success_count += 1;
                summary.dropped_questions += imported.dropped_questions;
                summary.imported.push(imported);
            }
            Err(err) => {
                log::warn!("Failed to import {}: {}", source, err);
                summary.error_count += 1;
                summary.failures.push(ImportFailure {
                    source,
                    kind: err.kind().to_string(),
                    message: err.user_message(),
                });
            }
        }
    }

    log::info!(
        "Batch import finished: {} succeeded, {} failed",
        summary.success_count,
        summary.error_count
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let db = Db::in_memory().await.unwrap();
        let items = vec![
            (
                "good.json",
                r#"{"questions": [
                    {"question": "ok", "answerOptions": [{"text": "a", "isCorrect": true}]},
                    {"question": "", "answerOptions": [{"text": "a", "isCorrect": true}]}
                ]}"#
                .to_string(),
            ),
            ("broken.json", "{not json".to_string()),
            ("unknown.json", r#"{"foo": 1}"#.to_string()),
            (
                "strict.json",
                r#"{"quiz": [{"question": "no options", "options": []}]}"#.to_string(),
            ),
            (
                "compact.json",
                r#"{"t": "C", "q": [{"x": "?", "dif": 2, "qt": "mcq", "id": "Q001", "o": [{"text": "a", "c": true, "r": ""}]}]}"#
                    .to_string(),
            ),
        ];

        let summary = import_batch(&db, items).await;

        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 3);
        assert_eq!(summary.dropped_questions, 1);
        let kinds: Vec<&str> = summary.failures.iter().map(|f| f.kind.as_str()).collect();
        assert_eq!(kinds, ["syntax", "schema_mismatch", "validation"]);
        assert_eq!(summary.failures[0].source, "broken.json");
        assert_eq!(db.list_quizzes().await.unwrap().len(), 2);
    }
}
