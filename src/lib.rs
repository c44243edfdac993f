pub mod config;
pub mod error;
pub mod quiz;

pub use config::Config;
pub use error::{QuizError, Result};
pub use quiz::generator::{generate, QuizSeed};
pub use quiz::leaderboard::{Leaderboard, LeaderboardEntry};
pub use quiz::session::{Phase, SessionState, SubmitReport};
pub use quiz::vocab::Vocabulary;
pub use quiz::{Direction, PromptView, QuizItem, VocabEntry};
