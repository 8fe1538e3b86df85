//! Core engine for preparing dramatized scripture scripts: given a book's
//! paragraphs annotated only with verse boundaries, split them into blocks at
//! speech boundaries and attribute each block to a speaker.
//!
//! The pieces:
//! - [`quotes::system`] — the translation's quotation conventions
//! - [`quotes::parser`] — the scanning state machine
//! - [`models::block`] — the block/element data model
//! - [`characters`] — standard roles and the character-verse directory
//! - [`export`] — tab-delimited and HTML rendering

pub mod characters;
pub mod export;
pub mod models;
pub mod quotes;

pub use characters::{
    CharacterVerse, CharacterVerseInfo, CharacterVerseTable, ControlFileError, StandardCharacter,
};
pub use models::{Block, BlockElement, MultiBlockQuote, ScriptText, Verse};
pub use quotes::{QuotationMark, QuoteParser, QuoteSystem, QuoteSystemError, QuoteType};
