use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{ConnectOptions, Pool, Row, Sqlite};
use uuid::Uuid;

use crate::formats::NormalizedQuiz;
use crate::models::{ExpandedQuiz, QuestionDifficulty, ReviewKey};
use crate::srs::{self, Rating, ReviewDeck};

impl<'r> sqlx::FromRow<'r, SqliteRow> for QuestionDifficulty {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let interval: i64 = row.try_get("interval_days")?;
        let repetitions: i64 = row.try_get("repetitions")?;
        let difficulty_rating: i64 = row.try_get("difficulty_rating")?;

        Ok(QuestionDifficulty {
            user_email: row.try_get("user_email")?,
            quiz_id: row.try_get("quiz_id")?,
            question_text: row.try_get("question_text")?,
            ease_factor: row.try_get("ease_factor")?,
            interval: interval.max(1) as u32,
            repetitions: repetitions.max(0) as u32,
            difficulty_rating: difficulty_rating.clamp(0, 5) as u8,
            next_review: row.try_get("next_review")?,
            last_reviewed: row.try_get("last_reviewed")?,
        })
    }
}

/// A quiz as persisted: the expansion plus, for versioned compact imports,
/// the raw `{m, q}` payload it came from.
#[derive(Debug, Clone, Serialize)]
pub struct StoredQuiz {
    pub id: String,
    pub dialect: String,
    #[serde(flatten)]
    pub quiz: ExpandedQuiz,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuizSummary {
    pub id: String,
    pub title: String,
    pub total_questions: i64,
    pub dialect: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Db {
    pool: Pool<Sqlite>,
}

impl Db {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(log::LevelFilter::Trace);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let db = Db { pool };
        db.migrate().await?;
        log::info!("Opened quiz database at {}", database_url);
        Ok(db)
    }

    /// Single-connection in-memory database. Every connection to `:memory:`
    /// is a separate database, so the pool must never open a second one.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .log_statements(log::LevelFilter::Trace);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Db { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                dialect TEXT NOT NULL,
                raw_payload TEXT,
                questions TEXT NOT NULL,
                total_questions INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS question_difficulty (
                user_email TEXT NOT NULL,
                quiz_id TEXT NOT NULL,
                question_text TEXT NOT NULL,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval_days INTEGER NOT NULL DEFAULT 1,
                repetitions INTEGER NOT NULL DEFAULT 0,
                difficulty_rating INTEGER NOT NULL,
                next_review DATETIME NOT NULL,
                last_reviewed DATETIME NOT NULL,
                PRIMARY KEY (user_email, quiz_id, question_text)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_quiz(&self, normalized: &NormalizedQuiz) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        let questions = serde_json::to_string(&normalized.quiz.questions)?;
        let raw_payload = normalized
            .raw
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO quizzes (id, title, description, dialect, raw_payload, questions, total_questions, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&normalized.quiz.title)
        .bind(&normalized.quiz.description)
        .bind(normalized.dialect.as_str())
        .bind(raw_payload)
        .bind(questions)
        .bind(normalized.quiz.questions.len() as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        log::info!(
            "Stored quiz {} ('{}', {} questions, {})",
            id,
            normalized.quiz.title,
            normalized.quiz.questions.len(),
            normalized.dialect.as_str()
        );
        Ok(id)
    }

    pub async fn get_quiz(&self, id: &str) -> anyhow::Result<Option<StoredQuiz>> {
        let row = sqlx::query("SELECT * FROM quizzes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let questions: String = row.try_get("questions")?;
        let raw_payload: Option<String> = row.try_get("raw_payload")?;

        Ok(Some(StoredQuiz {
            id: row.try_get("id")?,
            dialect: row.try_get("dialect")?,
            quiz: ExpandedQuiz::new(
                row.try_get::<String, _>("title")?,
                row.try_get::<String, _>("description")?,
                serde_json::from_str(&questions).context("corrupt questions column")?,
            ),
            raw_payload: raw_payload
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("corrupt raw_payload column")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    pub async fn list_quizzes(&self) -> anyhow::Result<Vec<QuizSummary>> {
        let quizzes = sqlx::query_as::<_, QuizSummary>(
            "SELECT id, title, total_questions, dialect, created_at FROM quizzes ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    /// Deletes the quiz and the SRS rows that belong to it.
    pub async fn delete_quiz(&self, id: &str) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM question_difficulty WHERE quiz_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM quizzes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    pub async fn get_difficulty(
        &self,
        key: &ReviewKey,
    ) -> anyhow::Result<Option<QuestionDifficulty>> {
        let row = sqlx::query_as::<_, QuestionDifficulty>(
            "SELECT * FROM question_difficulty WHERE user_email = ? AND quiz_id = ? AND question_text = ?",
        )
        .bind(&key.user_email)
        .bind(&key.quiz_id)
        .bind(&key.question_text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_difficulties(
        &self,
        user_email: &str,
        quiz_id: &str,
    ) -> anyhow::Result<Vec<QuestionDifficulty>> {
        let rows = sqlx::query_as::<_, QuestionDifficulty>(
            "SELECT * FROM question_difficulty WHERE user_email = ? AND quiz_id = ?",
        )
        .bind(user_email)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Reads the prior state, schedules the next review and upserts the row.
    ///
    /// The write lock is taken before the read (`BEGIN IMMEDIATE`), so
    /// concurrent submissions for one key queue on the busy timeout and apply
    /// one after another; the last one to commit wins.
    pub async fn record_rating(
        &self,
        key: &ReviewKey,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> anyhow::Result<QuestionDifficulty> {
        // Detached so a dropped caller never returns the connection mid-transaction.
        let db = self.clone();
        let key = key.clone();
        tokio::spawn(async move { db.record_rating_locked(&key, rating, now).await }).await?
    }

    async fn record_rating_locked(
        &self,
        key: &ReviewKey,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> anyhow::Result<QuestionDifficulty> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = match apply_rating(&mut conn, key, rating, now).await {
            Ok(next) => sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map(|_| next)
                .map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };

        let next = match result {
            Ok(next) => next,
            Err(err) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    log::warn!("Rollback after failed rating failed: {}", rollback);
                }
                return Err(err);
            }
        };

        log::debug!(
            "Rated '{}' {} for {}: next review in {} day(s)",
            key.question_text,
            rating.value(),
            key.user_email,
            next.interval
        );
        Ok(next)
    }

    pub async fn review_deck(
        &self,
        user_email: &str,
        quiz_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ReviewDeck> {
        let rows = self.list_difficulties(user_email, quiz_id).await?;
        Ok(srs::select_review_deck(&rows, now))
    }
}

async fn apply_rating(
    conn: &mut SqliteConnection,
    key: &ReviewKey,
    rating: Rating,
    now: DateTime<Utc>,
) -> anyhow::Result<QuestionDifficulty> {
    let prior = sqlx::query_as::<_, QuestionDifficulty>(
        "SELECT * FROM question_difficulty WHERE user_email = ? AND quiz_id = ? AND question_text = ?",
    )
    .bind(&key.user_email)
    .bind(&key.quiz_id)
    .bind(&key.question_text)
    .fetch_optional(&mut *conn)
    .await?;

    let next = srs::review(key, prior.as_ref(), rating, now);

    sqlx::query(
        r#"
        INSERT INTO question_difficulty
            (user_email, quiz_id, question_text, ease_factor, interval_days, repetitions, difficulty_rating, next_review, last_reviewed)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_email, quiz_id, question_text) DO UPDATE SET
            ease_factor = excluded.ease_factor,
            interval_days = excluded.interval_days,
            repetitions = excluded.repetitions,
            difficulty_rating = excluded.difficulty_rating,
            next_review = excluded.next_review,
            last_reviewed = excluded.last_reviewed
        "#,
    )
    .bind(&next.user_email)
    .bind(&next.quiz_id)
    .bind(&next.question_text)
    .bind(next.ease_factor)
    .bind(i64::from(next.interval))
    .bind(i64::from(next.repetitions))
    .bind(i64::from(next.difficulty_rating))
    .bind(next.next_review)
    .bind(next.last_reviewed)
    .execute(&mut *conn)
    .await?;

    Ok(next)
}
