pub mod verse;

pub use verse::{CharacterVerse, CharacterVerseInfo, CharacterVerseTable, ControlFileError};

/// Sentinel id: several distinct candidate speakers remain unresolved.
pub const AMBIGUOUS_CHARACTER: &str = "Ambiguous";
/// Sentinel id: no candidate speaker was found for the verse.
pub const UNKNOWN_CHARACTER: &str = "Unknown";

/// Separator used in directory entries naming several possible characters
/// (e.g. `"teachers of religious law/Pharisees"`).
pub const MULTI_CHARACTER_SEPARATOR: char = '/';

/// The reserved, non-quotable speaker roles every book has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardCharacter {
    Narrator,
    BookOrChapter,
    ExtraBiblical,
    Intro,
}

impl StandardCharacter {
    fn prefix(self) -> &'static str {
        match self {
            StandardCharacter::Narrator => "narrator-",
            StandardCharacter::BookOrChapter => "BC-",
            StandardCharacter::ExtraBiblical => "extra-",
            StandardCharacter::Intro => "intro-",
        }
    }

    const ALL: [StandardCharacter; 4] = [
        StandardCharacter::Narrator,
        StandardCharacter::BookOrChapter,
        StandardCharacter::ExtraBiblical,
        StandardCharacter::Intro,
    ];
}

/// Reserved character id for a standard role in one book, e.g. `narrator-MRK`.
pub fn standard_character_id(book_id: &str, kind: StandardCharacter) -> String {
    format!("{}{}", kind.prefix(), book_id)
}

/// Whether `id` is any book's standard (non-quote) character id.
pub fn is_standard_character(id: &str) -> bool {
    StandardCharacter::ALL
        .iter()
        .any(|kind| id.starts_with(kind.prefix()))
}

/// Ambiguous or Unknown: attribution needs human review.
pub fn is_unclear(id: &str) -> bool {
    id == AMBIGUOUS_CHARACTER || id == UNKNOWN_CHARACTER
}

/// Default-selection policy for multi-character ids: given the assigned id and
/// the directory record it came from (if any), pick the single id to display
/// in the script. Returns `None` when the id names only one character.
pub fn default_script_character(id: &str, record: Option<&CharacterVerse>) -> Option<String> {
    let mut parts = id.split(MULTI_CHARACTER_SEPARATOR);
    let first = parts.next()?;
    parts.next()?;
    let preferred = record
        .and_then(|r| r.default_character.as_deref())
        .filter(|d| !d.is_empty());
    Some(preferred.unwrap_or(first).to_string())
}

/// Collapse directory records that share the same (character, delivery) pair,
/// preserving first-seen order.
pub fn dedupe_character_deliveries(records: &[CharacterVerse]) -> Vec<CharacterVerse> {
    let mut out: Vec<CharacterVerse> = Vec::new();
    for r in records {
        if !out
            .iter()
            .any(|o| o.character == r.character && o.delivery == r.delivery)
        {
            out.push(r.clone());
        }
    }
    out
}
