use std::collections::HashSet;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::error::{QuizError, Result};
use crate::quiz::{Direction, QuizItem, VocabEntry, CHOICES_PER_QUESTION};

const DISTRACTORS_PER_QUESTION: usize = CHOICES_PER_QUESTION - 1;

/// Deterministic input for question selection and shuffling.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizSeed(String);

impl QuizSeed {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Same user, same day, same quiz.
    pub fn daily(nickname: &str, date: NaiveDate) -> Self {
        Self(format!("{}-{}", nickname, date.format("%Y-%m-%d")))
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    fn rng(&self) -> StdRng {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(self.0.as_bytes()));
        StdRng::from_seed(seed)
    }
}

/// Builds up to `n` multiple-choice questions from `pool`.
///
/// With a seed the result depends only on the seed and the order of `pool`.
/// Without one the selection is random.
pub fn generate(pool: &[VocabEntry], n: usize, seed: Option<&QuizSeed>) -> Result<Vec<QuizItem>> {
    let mut rng = match seed {
        Some(seed) => seed.rng(),
        None => StdRng::from_entropy(),
    };

    let size = n.min(pool.len());
    let sample: Vec<&VocabEntry> = pool.choose_multiple(&mut rng, size).collect();

    let quiz = sample
        .into_iter()
        .map(|entry| generate_question(pool, entry, &mut rng))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Generated {} questions from a pool of {} (seed: {:?})",
        quiz.len(),
        pool.len(),
        seed.map(QuizSeed::key)
    );
    Ok(quiz)
}

fn generate_question<R: Rng>(pool: &[VocabEntry], entry: &VocabEntry, rng: &mut R) -> Result<QuizItem> {
    let direction = if rng.gen_bool(0.5) {
        Direction::MeaningToWord
    } else {
        Direction::WordToMeaning
    };

    let (prompt, answer) = match direction {
        Direction::MeaningToWord => (&entry.meaning, &entry.word),
        Direction::WordToMeaning => (&entry.word, &entry.meaning),
    };

    // Only the answer value itself is excluded. Another entry sharing this
    // entry's prompt value can still contribute a distractor.
    let candidates = distractor_candidates(pool, direction, answer);
    if candidates.len() < DISTRACTORS_PER_QUESTION {
        return Err(QuizError::InsufficientPool {
            available: candidates.len(),
            required: DISTRACTORS_PER_QUESTION,
        });
    }

    let mut choices: Vec<String> = candidates
        .choose_multiple(rng, DISTRACTORS_PER_QUESTION)
        .map(|c| c.to_string())
        .collect();
    choices.push(answer.clone());
    // So the correct answer isn't always the last one
    choices.shuffle(rng);

    Ok(QuizItem::new(prompt.clone(), answer.clone(), choices, direction))
}

/// Distinct values of the answer's kind, in pool order, without the answer.
fn distractor_candidates<'a>(pool: &'a [VocabEntry], direction: Direction, answer: &str) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    pool.iter()
        .map(|e| match direction {
            Direction::MeaningToWord => e.word.as_str(),
            Direction::WordToMeaning => e.meaning.as_str(),
        })
        .filter(|value| *value != answer && seen.insert(*value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> Vec<VocabEntry> {
        vec![
            VocabEntry::new("cat", "고양이"),
            VocabEntry::new("dog", "개"),
            VocabEntry::new("bird", "새"),
            VocabEntry::new("fish", "물고기"),
            VocabEntry::new("tree", "나무"),
        ]
    }

    #[test]
    fn daily_seed_key_joins_nickname_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(QuizSeed::daily("alice", date).key(), "alice-2024-01-01");
    }

    #[test]
    fn same_seed_gives_identical_quiz() {
        let pool = animals();
        let seed = QuizSeed::new("alice-2024-01-01");

        let first = generate(&pool, 5, Some(&seed)).unwrap();
        let second = generate(&pool, 5, Some(&seed)).unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_give_different_quizzes() {
        let pool: Vec<VocabEntry> = (0..40)
            .map(|i| VocabEntry::new(format!("word{}", i), format!("meaning{}", i)))
            .collect();

        let alice = generate(&pool, 20, Some(&QuizSeed::new("alice-2024-01-01"))).unwrap();
        let bob = generate(&pool, 20, Some(&QuizSeed::new("bob-2024-01-01"))).unwrap();

        assert_ne!(alice, bob);
    }

    #[test]
    fn unseeded_quizzes_differ_between_calls() {
        let pool: Vec<VocabEntry> = (0..40)
            .map(|i| VocabEntry::new(format!("word{}", i), format!("meaning{}", i)))
            .collect();

        let first = generate(&pool, 20, None).unwrap();
        let second = generate(&pool, 20, None).unwrap();

        assert_eq!(first.len(), 20);
        assert_ne!(first, second);
    }

    #[test]
    fn every_item_has_four_distinct_choices_including_answer() {
        let pool = animals();
        for key in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            let quiz = generate(&pool, 5, Some(&QuizSeed::new(key))).unwrap();
            for item in &quiz {
                assert_eq!(item.choices.len(), CHOICES_PER_QUESTION);
                assert!(item.has_choice(&item.answer));
                let distinct: HashSet<&String> = item.choices.iter().collect();
                assert_eq!(distinct.len(), CHOICES_PER_QUESTION);

                let entry = pool
                    .iter()
                    .find(|e| e.word == item.prompt || e.meaning == item.prompt)
                    .unwrap();
                match item.direction {
                    Direction::WordToMeaning => {
                        assert_eq!(item.prompt, entry.word);
                        assert_eq!(item.answer, entry.meaning);
                    }
                    Direction::MeaningToWord => {
                        assert_eq!(item.prompt, entry.meaning);
                        assert_eq!(item.answer, entry.word);
                    }
                }
            }
        }
    }

    #[test]
    fn draws_without_replacement_and_caps_at_pool_size() {
        let pool = animals();
        let quiz = generate(&pool, 50, None).unwrap();

        assert_eq!(quiz.len(), pool.len());
        let prompts: HashSet<&String> = quiz.iter().map(|q| &q.prompt).collect();
        assert_eq!(prompts.len(), pool.len());
    }

    #[test]
    fn fewer_than_requested_when_n_is_small() {
        let quiz = generate(&animals(), 2, Some(&QuizSeed::new("x"))).unwrap();
        assert_eq!(quiz.len(), 2);
    }

    #[test]
    fn small_pool_is_insufficient() {
        let pool = vec![
            VocabEntry::new("cat", "고양이"),
            VocabEntry::new("dog", "개"),
            VocabEntry::new("bird", "새"),
        ];
        match generate(&pool, 3, None) {
            Err(QuizError::InsufficientPool { available, required }) => {
                assert_eq!(available, 2);
                assert_eq!(required, 3);
            }
            other => panic!("expected InsufficientPool, got {:?}", other),
        }
    }

    #[test]
    fn repeated_values_count_once_towards_distractors() {
        // Four entries but only two distinct meanings.
        let pool = vec![
            VocabEntry::new("cat", "동물"),
            VocabEntry::new("dog", "동물"),
            VocabEntry::new("oak", "나무"),
            VocabEntry::new("pine", "나무"),
        ];
        let candidates = distractor_candidates(&pool, Direction::WordToMeaning, "동물");
        assert_eq!(candidates, vec!["나무"]);
    }

    #[test]
    fn shared_meaning_can_surface_a_sibling_word_as_distractor() {
        // Known edge case: only the answer value is excluded, so a word sharing
        // the prompt's meaning is still a valid distractor.
        let pool = vec![
            VocabEntry::new("big", "큰"),
            VocabEntry::new("large", "큰"),
            VocabEntry::new("cat", "고양이"),
            VocabEntry::new("dog", "개"),
        ];
        let candidates = distractor_candidates(&pool, Direction::MeaningToWord, "big");
        assert_eq!(candidates, vec!["large", "cat", "dog"]);
    }

    #[test]
    fn empty_pool_gives_empty_quiz() {
        assert!(generate(&[], 10, None).unwrap().is_empty());
    }
}
