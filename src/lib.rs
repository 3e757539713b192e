pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod formats;
pub mod import;
pub mod models;
pub mod session;
pub mod srs;

pub use error::{ImportError, QuestionIssue, RatingError};
pub use formats::{
    detect, from_compact_format, normalize, normalize_str, to_compact_format, Dialect,
    NormalizedQuiz,
};
pub use models::{
    AnswerOption, CompactQuiz, Difficulty, ExpandedQuiz, Question, QuestionDifficulty,
    QuestionType, ReviewKey,
};
pub use srs::{calculate_next_review, select_review_deck, Rating, ReviewDeck, SrsState};
