use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{QuizError, Result};

const FULL_HEADER: [&str; 5] = ["nickname", "date", "score", "wrong_count", "total_q"];

/// One row of the ranking file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LeaderboardEntry {
    pub nickname: String,
    pub date: NaiveDate,
    pub score: usize,
    // Older files only carry nickname, date and score
    #[serde(default)]
    pub wrong_count: usize,
    #[serde(rename = "total_q", default)]
    pub total_questions: usize,
}

/// Append-only ranking stored as CSV.
///
/// Each result is written as a single append of one row, so concurrent
/// writers never rewrite each other's rows. The one exception is an old
/// file whose header lacks `wrong_count`/`total_q`: it is rewritten once
/// with the full header through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    path: PathBuf,
}

impl Leaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LeaderboardEntry) -> Result<()> {
        if self.has_narrow_header()? {
            self.widen_header()?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.unavailable(e))?;
        let len = file.metadata().map_err(|e| self.unavailable(e))?.len();

        let mut row = Vec::new();
        // A hand-edited file may lack the final line break
        if len > 0 && !ends_with_newline(&mut file, len).map_err(|e| self.unavailable(e))? {
            row.push(b'\n');
        }
        row.extend(to_csv([entry], len == 0).map_err(|e| self.unavailable(e))?);

        file.write_all(&row).map_err(|e| self.unavailable(e))?;
        log::info!(
            "Recorded {}/{} for '{}' on {}",
            entry.score,
            entry.total_questions,
            entry.nickname,
            entry.date
        );
        Ok(())
    }

    /// True when the file has a header without `wrong_count` or `total_q`.
    fn has_narrow_header(&self) -> Result<bool> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.unavailable(e)),
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = reader
            .headers()
            .map_err(|e| self.unavailable(io::Error::from(e)))?;
        if headers.is_empty() {
            return Ok(false);
        }
        Ok(!FULL_HEADER.iter().all(|h| headers.iter().any(|c| c == *h)))
    }

    /// Rewrites an old narrow file with the full header, replacing it in one rename.
    fn widen_header(&self) -> Result<()> {
        let entries = self.entries()?;
        let content = to_csv(&entries, true).map_err(|e| self.unavailable(e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content).map_err(|e| self.unavailable(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.unavailable(e))?;

        log::info!(
            "Widened the header of {} ({} rows kept)",
            self.path.display(),
            entries.len()
        );
        Ok(())
    }

    /// All rows in file order. A missing file is an empty leaderboard.
    pub fn entries(&self) -> Result<Vec<LeaderboardEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.unavailable(e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);

        let mut entries = Vec::new();
        for (line, row) in reader.deserialize::<LeaderboardEntry>().enumerate() {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => match e.into_kind() {
                    csv::ErrorKind::Io(io_error) => return Err(self.unavailable(io_error)),
                    kind => log::warn!(
                        "Skipping malformed row {} in {}: {:?}",
                        line + 2,
                        self.path.display(),
                        kind
                    ),
                },
            }
        }
        Ok(entries)
    }

    /// Best `n` results: score descending, then fewest wrong answers.
    /// Ties keep the order in which they were recorded.
    pub fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut entries = self.entries()?;
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.wrong_count.cmp(&b.wrong_count))
        });
        entries.truncate(n);
        Ok(entries)
    }

    fn unavailable(&self, source: io::Error) -> QuizError {
        QuizError::StoreUnavailable {
            path: self.path.clone(),
            source,
        }
    }
}

fn to_csv<'a>(
    entries: impl IntoIterator<Item = &'a LeaderboardEntry>,
    with_header: bool,
) -> io::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
