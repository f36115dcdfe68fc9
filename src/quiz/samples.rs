use std::collections::HashMap;

use crate::quiz::{Quiz, QuizQuestion, Subject};

/// Subject served when a lookup misses.
pub const DEFAULT_SUBJECT: Subject = Subject::Science;

/// Offline quizzes used in sample mode and whenever generation fails.
#[derive(Debug, Clone)]
pub struct SampleQuizzes {
    quizzes: HashMap<Subject, Quiz>,
    default: Quiz,
}

impl SampleQuizzes {
    pub fn new(quizzes: HashMap<Subject, Quiz>, default: Quiz) -> Self {
        Self { quizzes, default }
    }

    pub fn builtin() -> Self {
        let quizzes: HashMap<Subject, Quiz> = Subject::ALL
            .into_iter()
            .map(|subject| (subject, builtin_quiz(subject)))
            .collect();
        Self::new(quizzes, builtin_quiz(DEFAULT_SUBJECT))
    }

    pub fn lookup(&self, subject: Subject) -> &Quiz {
        self.quizzes.get(&subject).unwrap_or(&self.default)
    }
}

fn builtin_quiz(subject: Subject) -> Quiz {
    let questions = match subject {
        Subject::History => vec![
            QuizQuestion::new(
                "Who was the first President of the United States?",
                ["George Washington", "Thomas Jefferson", "Abraham Lincoln", "John Adams"],
                0,
            ),
            QuizQuestion::new(
                "In which year did the Berlin Wall fall?",
                ["1985", "1989", "1991", "1993"],
                1,
            ),
            QuizQuestion::new(
                "Which ancient civilization built Machu Picchu?",
                ["Aztec", "Maya", "Olmec", "Inca"],
                3,
            ),
            QuizQuestion::new(
                "Who was the first emperor of Rome?",
                ["Julius Caesar", "Augustus", "Nero", "Trajan"],
                1,
            ),
            QuizQuestion::new(
                "The Magna Carta was sealed in which country?",
                ["France", "Spain", "England", "Portugal"],
                2,
            ),
        ],
        Subject::Science => vec![
            QuizQuestion::new(
                "What is the chemical symbol for gold?",
                ["Go", "Gd", "Au", "Ag"],
                2,
            ),
            QuizQuestion::new(
                "Which planet is known as the Red Planet?",
                ["Venus", "Mars", "Jupiter", "Mercury"],
                1,
            ),
            QuizQuestion::new(
                "What gas do plants absorb from the atmosphere for photosynthesis?",
                ["Oxygen", "Nitrogen", "Carbon dioxide", "Hydrogen"],
                2,
            ),
            QuizQuestion::new(
                "What is the powerhouse of the cell?",
                ["Nucleus", "Ribosome", "Golgi apparatus", "Mitochondrion"],
                3,
            ),
            QuizQuestion::new(
                "Approximately how fast does light travel in a vacuum?",
                ["300,000 km/s", "150,000 km/s", "30,000 km/s", "3,000,000 km/s"],
                0,
            ),
        ],
        Subject::Literature => vec![
            QuizQuestion::new(
                "Who wrote \"Pride and Prejudice\"?",
                ["Charlotte Brontë", "Jane Austen", "Mary Shelley", "George Eliot"],
                1,
            ),
            QuizQuestion::new(
                "Which Shakespeare play features the character Ophelia?",
                ["Macbeth", "Othello", "Hamlet", "King Lear"],
                2,
            ),
            QuizQuestion::new(
                "Who is the author of \"One Hundred Years of Solitude\"?",
                ["Gabriel García Márquez", "Jorge Luis Borges", "Isabel Allende", "Pablo Neruda"],
                0,
            ),
            QuizQuestion::new(
                "In \"Moby-Dick\", what is the name of the captain?",
                ["Nemo", "Hook", "Queequeg", "Ahab"],
                3,
            ),
            QuizQuestion::new(
                "Which novel opens with \"Call me Ishmael\"?",
                ["Moby-Dick", "Treasure Island", "Robinson Crusoe", "The Odyssey"],
                0,
            ),
        ],
        Subject::Geography => vec![
            QuizQuestion::new(
                "What is the capital of Australia?",
                ["Sydney", "Melbourne", "Canberra", "Perth"],
                2,
            ),
            QuizQuestion::new(
                "Which is the longest river in South America?",
                ["Paraná", "Amazon", "Orinoco", "São Francisco"],
                1,
            ),
            QuizQuestion::new(
                "Mount Kilimanjaro is located in which country?",
                ["Kenya", "Uganda", "Ethiopia", "Tanzania"],
                3,
            ),
            QuizQuestion::new(
                "Which ocean is the largest by area?",
                ["Pacific", "Atlantic", "Indian", "Arctic"],
                0,
            ),
            QuizQuestion::new(
                "Which country has the most natural lakes?",
                ["Russia", "Canada", "Finland", "United States"],
                1,
            ),
        ],
        Subject::Mathematics => vec![
            QuizQuestion::new(
                "What is the value of π rounded to two decimal places?",
                ["3.12", "3.14", "3.16", "3.18"],
                1,
            ),
            QuizQuestion::new(
                "What is the square root of 144?",
                ["11", "14", "12", "16"],
                2,
            ),
            QuizQuestion::new(
                "How many degrees are in the interior angles of a triangle?",
                ["90", "360", "270", "180"],
                3,
            ),
            QuizQuestion::new(
                "Which of these numbers is prime?",
                ["17", "21", "27", "33"],
                0,
            ),
            QuizQuestion::new(
                "What is 7 factorial (7!)?",
                ["720", "5040", "40320", "2520"],
                1,
            ),
        ],
    };

    Quiz::new(format!("{} Knowledge Quiz", subject.name()), questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::OPTIONS_PER_QUESTION;

    #[test]
    fn every_subject_has_a_valid_quiz() {
        let samples = SampleQuizzes::builtin();
        for subject in Subject::ALL {
            let quiz = samples.lookup(subject);
            assert_eq!(quiz.title, format!("{} Knowledge Quiz", subject));
            assert!(quiz.validate().is_ok());
            for question in &quiz.questions {
                assert_eq!(question.options.len(), OPTIONS_PER_QUESTION);
                assert!(question.answer <= 3);
            }
        }
    }

    #[test]
    fn missing_subject_falls_back_to_default() {
        let default = builtin_quiz(DEFAULT_SUBJECT);
        let samples = SampleQuizzes::new(HashMap::new(), default.clone());
        assert_eq!(samples.lookup(Subject::Literature), &default);
    }
}
