use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{QuizError, Result};

const DEFAULT_VOCAB_FILE: &str = "IELTS_vocab_extracted.csv";
const DEFAULT_RANK_FILE: &str = "quiz_ranking.csv";
const DEFAULT_SESSION_DB: &str = "db.sqlite";
const DEFAULT_QUIZ_SIZE: usize = 50;
const DEFAULT_LEADERBOARD_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// CSV with `Word` and `Meaning` columns
    pub vocab_file: PathBuf,
    pub rank_file: PathBuf,
    /// sqlite database holding the bot's dialogue states
    pub session_db: String,
    pub quiz_size: usize,
    pub leaderboard_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vocab_file: PathBuf::from(DEFAULT_VOCAB_FILE),
            rank_file: PathBuf::from(DEFAULT_RANK_FILE),
            session_db: DEFAULT_SESSION_DB.to_string(),
            quiz_size: DEFAULT_QUIZ_SIZE,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            vocab_file: lookup("VOCAB_FILE").map_or(defaults.vocab_file, PathBuf::from),
            rank_file: lookup("RANK_FILE").map_or(defaults.rank_file, PathBuf::from),
            session_db: lookup("SESSION_DB").unwrap_or(defaults.session_db),
            quiz_size: parse_size(&lookup, "QUIZ_SIZE", defaults.quiz_size)?,
            leaderboard_size: parse_size(&lookup, "LEADERBOARD_SIZE", defaults.leaderboard_size)?,
        })
    }
}

fn parse_size(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match usize::from_str(raw.trim()) {
        Ok(0) => Err(QuizError::Config {
            key,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(size) => Ok(size),
        Err(e) => Err(QuizError::Config {
            key,
            reason: format!("'{}' is not a number ({})", raw, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.quiz_size, 50);
        assert_eq!(config.leaderboard_size, 20);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("VOCAB_FILE", "words.csv"),
            ("RANK_FILE", "/tmp/rank.csv"),
            ("QUIZ_SIZE", " 10 "),
            ("LEADERBOARD_SIZE", "5"),
        ]))
        .unwrap();
        assert_eq!(config.vocab_file, PathBuf::from("words.csv"));
        assert_eq!(config.rank_file, PathBuf::from("/tmp/rank.csv"));
        assert_eq!(config.quiz_size, 10);
        assert_eq!(config.leaderboard_size, 5);
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("QUIZ_SIZE", "many")])),
            Err(QuizError::Config { key: "QUIZ_SIZE", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("LEADERBOARD_SIZE", "0")])),
            Err(QuizError::Config { key: "LEADERBOARD_SIZE", .. })
        ));
    }
}
