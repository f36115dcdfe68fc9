pub mod ai_helper;
pub mod extract;
pub mod samples;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    pub fn new(title: String, questions: Vec<QuizQuestion>) -> Self {
        Self { title, questions }
    }

    /// Decodes a parsed JSON value into a quiz, rejecting anything that does
    /// not hold the four-options / answer-in-range shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let quiz: Quiz =
            serde_json::from_value(value).map_err(|e| ValidationError::Shape(e.to_string()))?;
        quiz.validate()?;
        Ok(quiz)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        if self.questions.is_empty() {
            return Err(ValidationError::NoQuestions);
        }
        for (index, question) in self.questions.iter().enumerate() {
            if question.options.len() != OPTIONS_PER_QUESTION {
                return Err(ValidationError::OptionCount {
                    question: index + 1,
                    found: question.options.len(),
                });
            }
            if question.answer >= OPTIONS_PER_QUESTION {
                return Err(ValidationError::AnswerOutOfRange {
                    question: index + 1,
                    answer: question.answer,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: usize,
}

impl QuizQuestion {
    pub fn new(question: &str, options: [&str; OPTIONS_PER_QUESTION], answer: usize) -> Self {
        Self {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer,
        }
    }

    pub fn is_correct(&self, option: usize) -> bool {
        self.answer == option
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response does not match the quiz shape: {0}")]
    Shape(String),
    #[error("quiz title is blank")]
    BlankTitle,
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("question {question} has {found} options instead of 4")]
    OptionCount { question: usize, found: usize },
    #[error("question {question} points at answer {answer}, expected 0-3")]
    AnswerOutOfRange { question: usize, answer: usize },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum Subject {
    History,
    #[default]
    Science,
    Literature,
    Geography,
    Mathematics,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::History,
        Subject::Science,
        Subject::Literature,
        Subject::Geography,
        Subject::Mathematics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Subject::History => "History",
            Subject::Science => "Science",
            Subject::Literature => "Literature",
            Subject::Geography => "Geography",
            Subject::Mathematics => "Mathematics",
        }
    }

    /// Category the mocked page is filed under.
    pub fn category(&self) -> String {
        format!("{} Quizzes", self.name())
    }

    pub fn slug(&self) -> String {
        format!("{}-knowledge-quiz", self.name().to_lowercase())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown subject \"{0}\"")]
pub struct UnknownSubject(pub String);

impl FromStr for Subject {
    type Err = UnknownSubject;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSubject(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question_json(options: usize, answer: usize) -> serde_json::Value {
        let options: Vec<String> = (0..options).map(|i| format!("Option {}", i)).collect();
        json!({ "question": "Why?", "options": options, "answer": answer })
    }

    #[test]
    fn accepts_well_formed_quiz() {
        let quiz = Quiz::from_value(json!({
            "title": "Space",
            "questions": [question_json(4, 3)]
        }))
        .unwrap();

        assert_eq!(quiz.title, "Space");
        assert_eq!(quiz.questions.len(), 1);
        assert!(quiz.questions[0].is_correct(3));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = Quiz::from_value(json!({ "questions": [] })).unwrap_err();
        assert!(matches!(err, ValidationError::Shape(_)));

        let err = Quiz::from_value(json!({
            "title": "T",
            "questions": [{ "question": "Q", "options": ["a", "b", "c", "d"] }]
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Shape(_)));
    }

    #[test]
    fn rejects_wrong_option_count() {
        let err = Quiz::from_value(json!({
            "title": "T",
            "questions": [question_json(4, 0), question_json(3, 0)]
        }))
        .unwrap_err();

        assert_eq!(err, ValidationError::OptionCount { question: 2, found: 3 });
    }

    #[test]
    fn rejects_answer_out_of_range() {
        let err = Quiz::from_value(json!({
            "title": "T",
            "questions": [question_json(4, 4)]
        }))
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::AnswerOutOfRange { question: 1, answer: 4 }
        );
    }

    #[test]
    fn negative_answer_is_a_shape_error() {
        let err = Quiz::from_value(json!({
            "title": "T",
            "questions": [{ "question": "Q", "options": ["a", "b", "c", "d"], "answer": -1 }]
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Shape(_)));
    }

    #[test]
    fn rejects_empty_quiz() {
        assert_eq!(
            Quiz::from_value(json!({ "title": "T", "questions": [] })).unwrap_err(),
            ValidationError::NoQuestions
        );
        assert_eq!(
            Quiz::from_value(json!({ "title": "  ", "questions": [question_json(4, 0)] }))
                .unwrap_err(),
            ValidationError::BlankTitle
        );
    }

    #[test]
    fn subject_parsing_ignores_case() {
        assert_eq!("science".parse::<Subject>().unwrap(), Subject::Science);
        assert_eq!(" Mathematics ".parse::<Subject>().unwrap(), Subject::Mathematics);
        assert_eq!(
            "Astrology".parse::<Subject>().unwrap_err(),
            UnknownSubject("Astrology".to_string())
        );
    }

    #[test]
    fn subject_page_metadata() {
        assert_eq!(Subject::Geography.category(), "Geography Quizzes");
        assert_eq!(Subject::Geography.slug(), "geography-knowledge-quiz");
    }
}
