use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{QuizError, Result};
use crate::quiz::VocabEntry;

#[derive(Debug, serde::Deserialize)]
struct RawEntry {
    #[serde(rename = "Word", alias = "word", alias = "WORD")]
    word: Option<String>,
    #[serde(rename = "Meaning", alias = "meaning", alias = "MEANING")]
    meaning: Option<String>,
}

impl RawEntry {
    // Rows with a blank field are dropped
    fn into_entry(self) -> Option<VocabEntry> {
        let word = self.word?.trim().to_string();
        let meaning = self.meaning?.trim().to_string();
        if word.is_empty() || meaning.is_empty() {
            return None;
        }
        Some(VocabEntry { word, meaning })
    }
}

/// Word/meaning pairs loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
}

impl Vocabulary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| QuizError::DataUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
        let vocabulary = Self::from_reader(file).map_err(|e| unavailable(e.to_string()))?;

        log::info!(
            "Loaded {} vocabulary entries from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        let mut dropped = 0usize;

        for row in csv_reader.deserialize() {
            let raw: RawEntry = row?;
            match raw.into_entry() {
                Some(entry) if seen.insert(entry.clone()) => entries.push(entry),
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            log::debug!("Dropped {} empty or duplicate vocabulary rows", dropped);
        }
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<VocabEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_empty_and_duplicate_rows() {
        let data = "Word,Meaning\n\
                    cat,고양이\n\
                    dog,개\n\
                    cat,고양이\n\
                    ,새\n\
                    fish,\n\
                    tree,나무\n";
        let vocabulary = Vocabulary::from_reader(data.as_bytes()).unwrap();

        assert_eq!(
            vocabulary.entries(),
            &[
                VocabEntry::new("cat", "고양이"),
                VocabEntry::new("dog", "개"),
                VocabEntry::new("tree", "나무"),
            ]
        );
    }

    #[test]
    fn keeps_same_word_with_different_meaning() {
        let data = "Word,Meaning\nbank,은행\nbank,둑\n";
        let vocabulary = Vocabulary::from_reader(data.as_bytes()).unwrap();
        assert_eq!(vocabulary.len(), 2);
    }

    #[test]
    fn accepts_lowercase_headers_and_extra_columns() {
        let data = "word,meaning,level\n  cat , 고양이 ,1\ndog,개,2\n";
        let vocabulary = Vocabulary::from_reader(data.as_bytes()).unwrap();
        assert_eq!(vocabulary.entries()[0], VocabEntry::new("cat", "고양이"));
        assert_eq!(vocabulary.len(), 2);
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let path = std::env::temp_dir().join("vocab-quiz-no-such-file.csv");
        match Vocabulary::load(&path) {
            Err(QuizError::DataUnavailable { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected DataUnavailable, got {:?}", other),
        }
    }
}
