use crate::error::RatingError;
use crate::models::{QuestionDifficulty, ReviewKey};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const INITIAL_EASE: f64 = 2.5;
pub const MIN_EASE: f64 = 1.3;
/// Longest interval the scheduler hands out (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;
/// Ratings at or above this count as "hard".
pub const HARD_RATING: u8 = 4;

/// Learner's self-reported difficulty for a question just answered.
///
/// 1 - Very easy
/// 2 - Easy
/// 3 - Normal
/// 4 - Hard
/// 5 - Very hard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, RatingError> {
        match value {
            1..=5 => Ok(Rating(value as u8)),
            other => Err(RatingError::OutOfRange(other)),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_hard(&self) -> bool {
        self.0 >= HARD_RATING
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Scheduling inputs carried over from the previous review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrsState {
    pub ease_factor: f64,
    pub interval: u32, // days
    pub repetitions: u32,
}

impl Default for SrsState {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE,
            interval: 1,
            repetitions: 0,
        }
    }
}

impl From<&QuestionDifficulty> for SrsState {
    fn from(row: &QuestionDifficulty) -> Self {
        Self {
            ease_factor: row.ease_factor,
            interval: row.interval,
            repetitions: row.repetitions,
        }
    }
}

/// Computes the state after one rating. A missing prior state starts fresh.
///
/// Easy ratings (1, 2) grow the interval SM-2 style (1, 6, then
/// `interval * ease`), a normal rating (3) grows it by 20%, and hard ratings
/// (4, 5) reset the streak to a one-day interval. The ease factor moves by
/// `(3 - rating) * 0.15` and never drops below 1.3. Intervals are clamped to
/// `1..=MAX_INTERVAL_DAYS`.
pub fn calculate_next_review(prior: Option<&SrsState>, rating: Rating) -> SrsState {
    let prior = prior.copied().unwrap_or_default();
    let rating = i32::from(rating.value());

    let adjustment = f64::from(3 - rating) * 0.15;
    let ease_factor = (prior.ease_factor + adjustment).max(MIN_EASE);

    let (repetitions, interval) = match rating {
        1 | 2 => {
            let repetitions = prior.repetitions + 1;
            let interval = match repetitions {
                1 => 1,
                2 => 6,
                _ => (f64::from(prior.interval) * ease_factor).round() as u32,
            };
            (repetitions, interval)
        }
        3 => (
            prior.repetitions + 1,
            (f64::from(prior.interval) * 1.2).round() as u32,
        ),
        _ => (0, 1),
    };

    SrsState {
        ease_factor,
        interval: interval.clamp(1, MAX_INTERVAL_DAYS),
        repetitions,
    }
}

/// Applies a rating to the stored row for `key` and stamps the review dates.
pub fn review(
    key: &ReviewKey,
    prior: Option<&QuestionDifficulty>,
    rating: Rating,
    now: DateTime<Utc>,
) -> QuestionDifficulty {
    let prior_state = prior.map(SrsState::from);
    let next = calculate_next_review(prior_state.as_ref(), rating);

    QuestionDifficulty {
        user_email: key.user_email.clone(),
        quiz_id: key.quiz_id.clone(),
        question_text: key.question_text.clone(),
        ease_factor: next.ease_factor,
        interval: next.interval,
        repetitions: next.repetitions,
        difficulty_rating: rating.value(),
        next_review: now + Duration::days(i64::from(next.interval)),
        last_reviewed: now,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckSource {
    /// Questions whose review date has passed.
    Due,
    /// Nothing due; questions last rated hard.
    HardFallback,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDeck {
    pub source: DeckSource,
    pub questions: Vec<QuestionDifficulty>,
}

/// Picks the questions for the next review session of one (user, quiz).
///
/// Due questions come first, hardest and most overdue at the top. With nothing
/// due, questions last rated 4 or 5 are offered instead. Both empty means an
/// empty deck.
pub fn select_review_deck(rows: &[QuestionDifficulty], now: DateTime<Utc>) -> ReviewDeck {
    let due: Vec<QuestionDifficulty> = rows
        .iter()
        .filter(|row| row.next_review <= now)
        .cloned()
        .collect();

    let (source, mut questions) = if !due.is_empty() {
        (DeckSource::Due, due)
    } else {
        let hard: Vec<QuestionDifficulty> = rows
            .iter()
            .filter(|row| row.difficulty_rating >= HARD_RATING)
            .cloned()
            .collect();
        if hard.is_empty() {
            (DeckSource::Empty, hard)
        } else {
            (DeckSource::HardFallback, hard)
        }
    };

    questions.sort_by(|a, b| {
        b.difficulty_rating
            .cmp(&a.difficulty_rating)
            .then(a.next_review.cmp(&b.next_review))
    });

    ReviewDeck { source, questions }
}
