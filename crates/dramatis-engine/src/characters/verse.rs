//! Character-verse directory: which characters could be speaking in a verse.
//!
//! The canonical source is a tab-delimited control file with one record per
//! line: `book \t chapter \t verse[-endverse] \t character \t delivery \t
//! alias \t quote-type \t default-character`. Lookups never fail; a book or
//! verse with no records simply yields an empty candidate list.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One directory record: `character` may speak in the given verse range,
/// optionally with a specific `delivery` (tone). Multi-character entries use a
/// single slash-delimited `character` value; `default_character` names which
/// of them a script should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterVerse {
    pub book_id: String,
    pub chapter: u32,
    pub start_verse: u32,
    pub end_verse: u32,
    pub character: String,
    pub delivery: String,
    pub alias: String,
    pub default_character: Option<String>,
}

/// Read-only lookup the parser consults for every quote fragment. `Sync` so a
/// single table can back parsers running over different books in parallel.
pub trait CharacterVerseInfo: Sync {
    /// All records overlapping `start_verse..=end_verse` of the given chapter.
    /// An `end_verse` of 0 means the single verse `start_verse`.
    fn characters(
        &self,
        book_id: &str,
        chapter: u32,
        start_verse: u32,
        end_verse: u32,
    ) -> Vec<CharacterVerse>;
}

/// No directory data at all: every quote comes back unattributed.
impl CharacterVerseInfo for () {
    fn characters(&self, _: &str, _: u32, _: u32, _: u32) -> Vec<CharacterVerse> {
        Vec::new()
    }
}

#[derive(Debug, Error)]
pub enum ControlFileError {
    #[error("Failed to read control file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed control file line {line_number}: {message}")]
    MalformedLine { line_number: usize, message: String },
}

/// In-memory character-verse directory keyed by (book, chapter).
#[derive(Debug, Default, Clone)]
pub struct CharacterVerseTable {
    records: BTreeMap<(String, u32), Vec<CharacterVerse>>,
    len: usize,
}

impl CharacterVerseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: CharacterVerse) {
        self.len += 1;
        self.records
            .entry((record.book_id.clone(), record.chapter))
            .or_default()
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn load(path: &Path) -> Result<Self, ControlFileError> {
        let text = fs::read_to_string(path).map_err(|source| ControlFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_tab_delimited(&text)
    }

    /// Parse the tab-delimited control-file format. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn from_tab_delimited(text: &str) -> Result<Self, ControlFileError> {
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line_number = idx + 1;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                return Err(ControlFileError::MalformedLine {
                    line_number,
                    message: format!("expected at least 4 tab-delimited fields, got {}", fields.len()),
                });
            }
            let chapter: u32 = fields[1].trim().parse().map_err(|_| {
                ControlFileError::MalformedLine {
                    line_number,
                    message: format!("chapter is not a number: {:?}", fields[1]),
                }
            })?;
            let (start_verse, end_verse) = parse_verse_range(fields[2].trim()).ok_or_else(|| {
                ControlFileError::MalformedLine {
                    line_number,
                    message: format!("bad verse or verse range: {:?}", fields[2]),
                }
            })?;
            let field = |i: usize| fields.get(i).map(|f| f.trim()).unwrap_or_default();
            table.add(CharacterVerse {
                book_id: fields[0].trim().to_string(),
                chapter,
                start_verse,
                end_verse,
                character: field(3).to_string(),
                delivery: field(4).to_string(),
                alias: field(5).to_string(),
                default_character: Some(field(7))
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
            });
        }
        Ok(table)
    }
}

fn parse_verse_range(s: &str) -> Option<(u32, u32)> {
    match s.split_once('-') {
        Some((a, b)) => {
            let start = a.trim().parse().ok()?;
            let end = b.trim().parse().ok()?;
            Some((start, end))
        }
        None => {
            let v = s.parse().ok()?;
            Some((v, v))
        }
    }
}

impl CharacterVerseInfo for CharacterVerseTable {
    fn characters(
        &self,
        book_id: &str,
        chapter: u32,
        start_verse: u32,
        end_verse: u32,
    ) -> Vec<CharacterVerse> {
        let end = end_verse.max(start_verse);
        match self.records.get(&(book_id.to_string(), chapter)) {
            Some(records) => records
                .iter()
                .filter(|r| r.start_verse <= end && r.end_verse.max(r.start_verse) >= start_verse)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}
