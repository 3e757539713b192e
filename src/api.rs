use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::db::Db;
use crate::error::{ImportError, RatingError};
use crate::formats::{self, validate};
use crate::import::{self, ImportOutcomeError};
use crate::models::{ExpandedQuiz, ReviewKey};
use crate::session::QuizAttempt;
use crate::srs::Rating;

#[derive(Clone)]
pub struct ApiState {
    pub db: Db,
}

pub fn app_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/quizzes", get(list_quizzes))
        .route("/api/quizzes/import", post(import_quiz))
        .route("/api/quizzes/validate", post(validate_quiz))
        .route("/api/quizzes/compact", post(compact_quiz))
        .route("/api/quizzes/:id", get(get_quiz).delete(delete_quiz))
        .route("/api/quizzes/:id/attempt", get(start_attempt))
        .route("/api/reviews", post(submit_rating))
        .route("/api/reviews/:user_email/:quiz_id", get(review_deck))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub enum ApiError {
    Import(ImportError),
    Rating(RatingError),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::Import(err)
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        ApiError::Rating(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<ImportOutcomeError> for ApiError {
    fn from(err: ImportOutcomeError) -> Self {
        match err {
            ImportOutcomeError::Format(err) => ApiError::Import(err),
            ImportOutcomeError::Storage(err) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Import(err) => {
                let status = match err {
                    ImportError::Syntax { .. } => StatusCode::BAD_REQUEST,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                let issues = match &err {
                    ImportError::Validation(issues) => json!(issues),
                    _ => json!([]),
                };
                (
                    status,
                    json!({"kind": err.kind(), "message": err.user_message(), "issues": issues}),
                )
            }
            ApiError::Rating(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"kind": "rating", "message": err.to_string()}),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({"kind": "not_found", "message": format!("{} not found", what)}),
            ),
            ApiError::Internal(err) => {
                log::error!("Request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"kind": "internal", "message": err.to_string()}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn list_quizzes(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_quizzes().await?))
}

async fn import_quiz(State(state): State<ApiState>, body: String) -> ApiResult<impl IntoResponse> {
    let imported = import::import_one(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(imported)))
}

async fn validate_quiz(body: String) -> ApiResult<impl IntoResponse> {
    Ok(Json(validate::validate_str(&body)?))
}

async fn compact_quiz(Json(quiz): Json<ExpandedQuiz>) -> impl IntoResponse {
    Json(formats::to_compact_format(&quiz))
}

async fn get_quiz(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    match state.db.get_quiz(&id).await? {
        Some(quiz) => Ok(Json(quiz)),
        None => Err(ApiError::NotFound(format!("quiz {}", id))),
    }
}

async fn delete_quiz(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.db.delete_quiz(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("quiz {}", id)))
    }
}

async fn start_attempt(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let stored = state
        .db
        .get_quiz(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("quiz {}", id)))?;
    let attempt = QuizAttempt::start(&id, &stored.quiz, &mut rand::thread_rng());
    Ok(Json(attempt))
}

#[derive(Deserialize)]
struct RatingRequest {
    user_email: String,
    quiz_id: String,
    question_text: String,
    rating: i64,
}

#[derive(Serialize)]
struct RatingResponse {
    ease_factor: f64,
    interval: u32,
    repetitions: u32,
    next_review: chrono::DateTime<Utc>,
    last_reviewed: chrono::DateTime<Utc>,
}

async fn submit_rating(
    State(state): State<ApiState>,
    Json(payload): Json<RatingRequest>,
) -> ApiResult<impl IntoResponse> {
    let rating = Rating::new(payload.rating)?;
    let key = ReviewKey {
        user_email: payload.user_email,
        quiz_id: payload.quiz_id,
        question_text: payload.question_text,
    };
    let row = state.db.record_rating(&key, rating, Utc::now()).await?;

    Ok(Json(RatingResponse {
        ease_factor: row.ease_factor,
        interval: row.interval,
        repetitions: row.repetitions,
        next_review: row.next_review,
        last_reviewed: row.last_reviewed,
    }))
}

async fn review_deck(
    State(state): State<ApiState>,
    Path((user_email, quiz_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.review_deck(&user_email, &quiz_id, Utc::now()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn router() -> Router {
        let db = Db::in_memory().await.unwrap();
        app_router(ApiState { db })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_import_errors_are_distinguished() {
        let app = router().await;

        let (status, body) = send(&app, Method::POST, "/api/quizzes/import", "{oops").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "syntax");

        let (status, body) =
            send(&app, Method::POST, "/api/quizzes/import", r#"{"foo": []}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "schema_mismatch");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/quizzes/import",
            r#"{"quiz": [{"question": "?", "options": [{"text": "a", "correct": false}]}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
        assert_eq!(body["issues"][0]["index"], 0);
    }

    #[tokio::test]
    async fn test_import_then_fetch_and_attempt() {
        let app = router().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/quizzes/import",
            r#"{"t":"Q","q":[{"x":"2+2?","dif":1,"qt":"mcq","id":"Q001","o":[{"text":"4","c":true,"r":"correct"},{"text":"5","c":false,"r":"wrong"}]}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, quiz) = send(&app, Method::GET, &format!("/api/quizzes/{}", id), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quiz["questions"][0]["difficulty"], "fácil");
        assert_eq!(quiz["total_questions"], 1);

        let uri = format!("/api/quizzes/{}/attempt", id);
        let (status, attempt) = send(&app, Method::GET, &uri, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(attempt["questions"][0]["answerOptions"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, Method::DELETE, &format!("/api/quizzes/{}", id), "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/api/quizzes/{}", id), "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rating_and_review_deck() {
        let app = router().await;
        let rating = |value: i64| {
            json!({
                "user_email": "ana@example.com",
                "quiz_id": "quiz-1",
                "question_text": "2+2?",
                "rating": value,
            })
            .to_string()
        };

        let (status, body) = send(&app, Method::POST, "/api/reviews", &rating(9)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "rating");

        let (status, body) = send(&app, Method::POST, "/api/reviews", &rating(5)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["interval"], 1);
        assert_eq!(body["repetitions"], 0);

        let (status, deck) =
            send(&app, Method::GET, "/api/reviews/ana@example.com/quiz-1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deck["source"], "hard_fallback");
        assert_eq!(deck["questions"][0]["question_text"], "2+2?");
    }

    #[tokio::test]
    async fn test_validate_and_compact_endpoints() {
        let app = router().await;
        let (status, report) = send(
            &app,
            Method::POST,
            "/api/quizzes/validate",
            r#"{"t": "Q", "q": [{"x": "?", "o": [{"text": "a", "c": true}, {"text": "b", "c": true}]}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(report["errors"].as_array().unwrap().is_empty());
        assert!(!report["warnings"].as_array().unwrap().is_empty());

        let (status, compact) = send(
            &app,
            Method::POST,
            "/api/quizzes/compact",
            r#"{"title": "T", "questions": [{"question": "?", "difficulty": "difícil",
                "answerOptions": [{"text": "a", "isCorrect": true, "rationale": "r"}]}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(compact["t"], "T");
        assert_eq!(compact["q"][0]["dif"], 3);
        assert_eq!(compact["q"][0]["id"], "Q001");
        assert_eq!(compact["q"][0]["o"][0]["c"], true);
    }
}
