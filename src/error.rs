use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuizError>;

#[derive(Error, Debug)]
pub enum QuizError {
    /// The vocabulary file is missing or unreadable. Fatal at startup.
    #[error("vocabulary file '{}' is unavailable: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("not enough distinct choices to build a question: {available} available, {required} required")]
    InsufficientPool { available: usize, required: usize },

    #[error("nickname must not be empty")]
    InvalidNickname,

    /// Leaderboard I/O failed. The quiz itself keeps working.
    #[error("leaderboard file '{}' is unavailable: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}
