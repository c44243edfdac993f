use std::collections::BTreeMap;
use std::mem;

use chrono::{Local, NaiveDate};

use crate::error::{QuizError, Result};
use crate::quiz::generator::{self, QuizSeed};
use crate::quiz::leaderboard::{Leaderboard, LeaderboardEntry};
use crate::quiz::{PromptView, QuizItem, VocabEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoNickname,
    AwaitingQuiz,
    InProgress,
    Submitted,
}

/// Everything one user's quiz session consists of.
///
/// Every event takes the state by value and returns the next one, so the
/// caller decides where the state lives between events.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionState {
    nickname: Option<String>,
    quiz_date: Option<NaiveDate>,
    quiz: Vec<QuizItem>,
    answers: BTreeMap<usize, String>,
    submitted: bool,
    score: usize,
    incorrect: Vec<QuizItem>,
    retry_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub score: usize,
    pub total: usize,
    pub incorrect: Vec<QuizItem>,
    pub entry: LeaderboardEntry,
    /// Whether `entry` made it into the leaderboard file.
    pub saved: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.nickname.is_none() {
            Phase::NoNickname
        } else if self.submitted {
            Phase::Submitted
        } else if self.quiz.is_empty() {
            Phase::AwaitingQuiz
        } else {
            Phase::InProgress
        }
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn quiz_date(&self) -> Option<NaiveDate> {
        self.quiz_date
    }

    pub fn quiz(&self) -> &[QuizItem] {
        &self.quiz
    }

    pub fn answer(&self, idx: usize) -> Option<&str> {
        self.answers.get(&idx).map(String::as_str)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn incorrect(&self) -> &[QuizItem] {
        &self.incorrect
    }

    pub fn is_retry(&self) -> bool {
        self.retry_mode
    }

    pub fn can_retry(&self) -> bool {
        self.submitted && !self.incorrect.is_empty()
    }

    pub fn prompt(&self, idx: usize) -> Option<PromptView<'_>> {
        self.quiz.get(idx).map(|item| PromptView {
            text: &item.prompt,
            direction: item.direction,
            choices: &item.choices,
            selected: self.answer(idx),
        })
    }

    /// Missed items of a submitted quiz with what the user picked, if anything.
    pub fn mistakes(&self) -> Vec<(&QuizItem, Option<&str>)> {
        if !self.submitted {
            return Vec::new();
        }
        self.quiz
            .iter()
            .enumerate()
            .map(|(idx, item)| (item, self.answer(idx)))
            .filter(|(item, given)| !item.is_correct(*given))
            .collect()
    }

    /// Sets the nickname. It cannot be changed afterwards.
    pub fn on_nickname_submit(mut self, name: &str) -> Result<Self> {
        if let Some(nickname) = &self.nickname {
            log::warn!("Nickname is already set to '{}', ignoring '{}'", nickname, name);
            return Ok(self);
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(QuizError::InvalidNickname);
        }
        self.nickname = Some(name.to_string());
        Ok(self)
    }

    /// Draws a fresh quiz for `date`, seeded by nickname and date.
    ///
    /// Retrying never comes through here: `on_retry` reuses the missed items
    /// as they are, and `on_new_quiz` clears the retry flag before the next draw.
    pub fn on_generate(mut self, pool: &[VocabEntry], n: usize, date: NaiveDate) -> Result<Self> {
        let phase = self.phase();
        let nickname = match self.nickname.as_deref() {
            Some(nickname) if phase == Phase::AwaitingQuiz => nickname,
            _ => {
                log::warn!("Ignoring quiz generation in phase {:?}", phase);
                return Ok(self);
            }
        };

        let seed = QuizSeed::daily(nickname, date);
        let quiz = generator::generate(pool, n, Some(&seed))?;

        log::debug!("Started a {}-question quiz for '{}' on {}", quiz.len(), nickname, date);
        self.quiz = quiz;
        self.quiz_date = Some(date);
        self.answers.clear();
        self.submitted = false;
        self.score = 0;
        self.incorrect.clear();
        Ok(self)
    }

    /// Records `choice` for question `idx`, replacing any earlier pick.
    pub fn on_answer_change(mut self, idx: usize, choice: impl Into<String>) -> Self {
        let choice = choice.into();
        if self.phase() != Phase::InProgress {
            log::warn!("Ignoring answer for question {} in phase {:?}", idx, self.phase());
            return self;
        }
        match self.quiz.get(idx) {
            Some(item) if item.has_choice(&choice) => {
                self.answers.insert(idx, choice);
            }
            Some(_) => log::warn!("'{}' is not a choice of question {}", choice, idx),
            None => log::warn!("There is no question {}", idx),
        }
        self
    }

    /// Scores the active quiz. Unanswered questions count as incorrect.
    pub fn submit(mut self) -> (Self, Option<SubmitReport>) {
        if self.phase() != Phase::InProgress {
            log::warn!("Ignoring submit in phase {:?}", self.phase());
            return (self, None);
        }

        let (correct, incorrect): (Vec<(usize, &QuizItem)>, Vec<(usize, &QuizItem)>) = self
            .quiz
            .iter()
            .enumerate()
            .partition(|(idx, item)| item.is_correct(self.answers.get(idx).map(String::as_str)));

        let score = correct.len();
        let incorrect: Vec<QuizItem> = incorrect.into_iter().map(|(_, item)| item.clone()).collect();
        let total = self.quiz.len();

        let entry = LeaderboardEntry {
            nickname: self.nickname.clone().unwrap_or_default(),
            date: self.quiz_date.unwrap_or_else(|| Local::now().date_naive()),
            score,
            wrong_count: incorrect.len(),
            total_questions: total,
        };

        self.score = score;
        self.incorrect = incorrect.clone();
        self.submitted = true;

        let report = SubmitReport {
            score,
            total,
            incorrect,
            entry,
            saved: false,
        };
        (self, Some(report))
    }

    /// Submits and records the result. A leaderboard failure is logged and
    /// reported through `SubmitReport::saved`; the session moves on regardless.
    pub fn on_submit(self, leaderboard: &Leaderboard) -> (Self, Option<SubmitReport>) {
        let (state, report) = self.submit();
        let report = report.map(|mut report| {
            match leaderboard.append(&report.entry) {
                Ok(()) => report.saved = true,
                Err(e) => log::error!("Could not record result: {}", e),
            }
            report
        });
        (state, report)
    }

    /// Makes the missed items the active quiz, choices untouched.
    pub fn on_retry(mut self) -> Self {
        if !self.can_retry() {
            log::warn!("Nothing to retry in phase {:?}", self.phase());
            return self;
        }

        self.quiz = mem::take(&mut self.incorrect);
        self.answers.clear();
        self.submitted = false;
        self.score = 0;
        self.retry_mode = true;
        log::debug!("Retrying {} missed questions", self.quiz.len());
        self
    }

    /// Drops the current quiz, keeping only the nickname.
    pub fn on_new_quiz(self) -> Self {
        if self.nickname.is_none() {
            log::warn!("Ignoring new quiz before a nickname is set");
            return self;
        }
        Self {
            nickname: self.nickname,
            ..Self::default()
        }
    }
}
