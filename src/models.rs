use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Text,
    Image,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Image => "image",
        }
    }

    /// Any tag other than `image` is a text question.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("image") {
            QuestionType::Image
        } else {
            QuestionType::Text
        }
    }
}

/// Semantic difficulty of a question. Not the learner's SRS rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "fácil")]
    Facil,
    #[default]
    #[serde(rename = "moderado")]
    Moderado,
    #[serde(rename = "difícil")]
    Dificil,
}

impl Difficulty {
    pub fn level(&self) -> u8 {
        match self {
            Difficulty::Facil => 1,
            Difficulty::Moderado => 2,
            Difficulty::Dificil => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Facil => "fácil",
            Difficulty::Moderado => "moderado",
            Difficulty::Dificil => "difícil",
        }
    }

    /// Unknown levels fall back to `moderado`.
    pub fn from_level(level: i64) -> Self {
        match level {
            1 => Difficulty::Facil,
            3 => Difficulty::Dificil,
            _ => Difficulty::Moderado,
        }
    }

    /// Case-insensitive label lookup; unknown labels fall back to `moderado`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "fácil" | "facil" | "easy" => Difficulty::Facil,
            "moderado" | "medium" | "moderate" => Difficulty::Moderado,
            "difícil" | "dificil" | "hard" | "difficult" => Difficulty::Dificil,
            other => match other.parse::<i64>() {
                Ok(level) => Difficulty::from_level(level),
                Err(_) => Difficulty::Moderado,
            },
        }
    }

    /// Shared mapping for every dialect: numbers, numeric strings and labels.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Difficulty::from_level)
                .unwrap_or_default(),
            Some(Value::String(s)) => Difficulty::from_label(s),
            _ => Difficulty::Moderado,
        }
    }
}

/// Bloom taxonomy level carried by the max-compact and qm/q dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloomLevel {
    Recordar,
    Comprender,
    Aplicar,
    Analizar,
    Evaluar,
}

impl BloomLevel {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(BloomLevel::Recordar),
            2 => Some(BloomLevel::Comprender),
            3 => Some(BloomLevel::Aplicar),
            4 => Some(BloomLevel::Analizar),
            5 => Some(BloomLevel::Evaluar),
            _ => None,
        }
    }

    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Number(n) => n.as_i64().and_then(BloomLevel::from_code),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "recordar" => Some(BloomLevel::Recordar),
                "comprender" => Some(BloomLevel::Comprender),
                "aplicar" => Some(BloomLevel::Aplicar),
                "analizar" => Some(BloomLevel::Analizar),
                "evaluar" => Some(BloomLevel::Evaluar),
                other => other.parse().ok().and_then(BloomLevel::from_code),
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bloom_level: Option<BloomLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub answer_options: Vec<AnswerOption>,
}

impl Question {
    pub fn correct_indices(&self) -> Vec<usize> {
        self.answer_options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_correct)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_correct_option(&self) -> bool {
        self.answer_options.iter().any(|o| o.is_correct)
    }
}

/// Canonical expanded quiz.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpandedQuiz {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_questions: usize,
    pub questions: Vec<Question>,
}

impl ExpandedQuiz {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            total_questions: questions.len(),
            questions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactOption {
    pub text: String,
    pub c: bool,
    #[serde(default)]
    pub r: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub et: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactQuestion {
    pub x: String,
    pub dif: u8,
    pub qt: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub o: Vec<CompactOption>,
}

/// Compact storage form `{t, q}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactQuiz {
    pub t: String,
    pub q: Vec<CompactQuestion>,
}

/// Identifies one SRS record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewKey {
    pub user_email: String,
    pub quiz_id: String,
    pub question_text: String,
}

/// Persisted SRS state for one (user, quiz, question text) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDifficulty {
    pub user_email: String,
    pub quiz_id: String,
    pub question_text: String,
    pub ease_factor: f64,
    pub interval: u32, // days
    pub repetitions: u32,
    /// Most recent 1..=5 self-rating.
    pub difficulty_rating: u8,
    pub next_review: DateTime<Utc>,
    pub last_reviewed: DateTime<Utc>,
}

impl QuestionDifficulty {
    pub fn key(&self) -> ReviewKey {
        ReviewKey {
            user_email: self.user_email.clone(),
            quiz_id: self.quiz_id.clone(),
            question_text: self.question_text.clone(),
        }
    }
}
