use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::models::{ExpandedQuiz, Question};

/// A quiz as presented to one learner: questions and options in shuffled order.
#[derive(Debug, Clone, Serialize)]
pub struct QuizAttempt {
    pub quiz_id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Positions of the correct options in the attempt's display order.
    pub correct_indices: Vec<usize>,
}

impl QuizAttempt {
    pub fn start<R: Rng + ?Sized>(
        quiz_id: impl Into<String>,
        quiz: &ExpandedQuiz,
        rng: &mut R,
    ) -> Self {
        let mut questions = quiz.questions.clone();
        questions.shuffle(rng);
        for question in &mut questions {
            question.answer_options.shuffle(rng);
        }

        Self {
            quiz_id: quiz_id.into(),
            title: quiz.title.clone(),
            questions,
        }
    }

    /// Grades a selection of option positions for one question.
    ///
    /// Questions with several correct options are multi-select: the answer is
    /// right only when the selection is exactly the set of correct options.
    pub fn grade(&self, question_index: usize, selected: &[usize]) -> Option<AnswerOutcome> {
        let question = self.questions.get(question_index)?;
        Some(grade_question(question, selected))
    }
}

pub fn grade_question(question: &Question, selected: &[usize]) -> AnswerOutcome {
    let correct_indices = question.correct_indices();

    let mut chosen: Vec<usize> = selected.to_vec();
    chosen.sort_unstable();
    chosen.dedup();

    AnswerOutcome {
        correct: !correct_indices.is_empty() && chosen == correct_indices,
        correct_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerOption;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn option(text: &str, is_correct: bool) -> AnswerOption {
        AnswerOption {
            text: text.into(),
            is_correct,
            ..Default::default()
        }
    }

    fn quiz() -> ExpandedQuiz {
        ExpandedQuiz::new(
            "Primos",
            "",
            vec![
                Question {
                    question: "¿Cuál es primo?".into(),
                    answer_options: vec![option("4", false), option("7", true), option("9", false)],
                    ..Default::default()
                },
                Question {
                    question: "Selecciona los primos".into(),
                    answer_options: vec![option("2", true), option("3", true), option("8", false)],
                    ..Default::default()
                },
            ],
        )
    }

    #[test]
    fn test_start_keeps_content() {
        let mut rng = StdRng::seed_from_u64(7);
        let attempt = QuizAttempt::start("quiz-1", &quiz(), &mut rng);
        assert_eq!(attempt.questions.len(), 2);
        for question in &attempt.questions {
            assert_eq!(question.answer_options.len(), 3);
        }
        let mut texts: Vec<&str> = attempt.questions.iter().map(|q| q.question.as_str()).collect();
        texts.sort();
        assert_eq!(texts, ["Selecciona los primos", "¿Cuál es primo?"]);
    }

    #[test]
    fn test_single_correct_grading() {
        let q = &quiz().questions[0];
        assert!(grade_question(q, &[1]).correct);
        assert!(!grade_question(q, &[0]).correct);
        assert!(!grade_question(q, &[0, 1]).correct);
        assert!(!grade_question(q, &[]).correct);
    }

    #[test]
    fn test_multi_select_requires_exact_set() {
        let q = &quiz().questions[1];
        assert!(grade_question(q, &[1, 0]).correct);
        assert!(grade_question(q, &[0, 1, 1]).correct);
        assert!(!grade_question(q, &[0]).correct);
        assert!(!grade_question(q, &[0, 1, 2]).correct);
        assert_eq!(grade_question(q, &[]).correct_indices, vec![0, 1]);
    }

    #[test]
    fn test_attempt_grades_in_display_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let attempt = QuizAttempt::start("quiz-1", &quiz(), &mut rng);
        for (i, question) in attempt.questions.iter().enumerate() {
            let outcome = attempt.grade(i, &question.correct_indices()).unwrap();
            assert!(outcome.correct);
        }
        assert!(attempt.grade(5, &[0]).is_none());
    }
}
