pub mod generator;
pub mod leaderboard;
pub mod session;
pub mod vocab;

use std::fmt;

/// Number of answer choices shown for every question.
pub const CHOICES_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VocabEntry {
    pub word: String,
    pub meaning: String,
}

impl VocabEntry {
    pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            meaning: meaning.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// The word is shown, the meaning is asked for.
    WordToMeaning,
    /// The meaning is shown, the word is asked for.
    MeaningToWord,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::WordToMeaning => write!(f, "word → meaning"),
            Direction::MeaningToWord => write!(f, "meaning → word"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizItem {
    pub prompt: String,
    pub answer: String,
    pub choices: Vec<String>,
    pub direction: Direction,
}

impl QuizItem {
    pub fn new(prompt: String, answer: String, choices: Vec<String>, direction: Direction) -> Self {
        Self {
            prompt,
            answer,
            choices,
            direction,
        }
    }

    pub fn is_correct(&self, given: Option<&str>) -> bool {
        given == Some(self.answer.as_str())
    }

    pub fn has_choice(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c == choice)
    }
}

/// What the presentation layer needs to render one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView<'a> {
    pub text: &'a str,
    pub direction: Direction,
    pub choices: &'a [String],
    pub selected: Option<&'a str>,
}
