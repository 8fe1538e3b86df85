//! The script data model: a book is a flat sequence of [`Block`]s, each a
//! paragraph (or fragment of one) holding verse markers and text runs in
//! reading order.

use serde::{Deserialize, Serialize};

use crate::characters::{self, CharacterVerse, StandardCharacter};

/// `split_id` value for blocks that were never manually split.
pub const NOT_SPLIT: i32 = -1;

/// A verse marker inside a block: `number` is the marker as printed
/// (`"3"` or a bridge like `"4-5"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: String,
    pub start_verse: u32,
    pub end_verse: u32,
}

impl Verse {
    /// Unparseable numbers fall back to verse 0, which no directory record
    /// matches.
    pub fn new(number: &str) -> Self {
        let (start, end) = match number.split_once('-') {
            Some((a, b)) => {
                let start = a.trim().parse().unwrap_or(0);
                (start, b.trim().parse().unwrap_or(start))
            }
            None => {
                let v = number.trim().parse().unwrap_or(0);
                (v, v)
            }
        };
        Self {
            number: number.to_string(),
            start_verse: start,
            end_verse: end,
        }
    }
}

/// A run of translated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptText {
    pub content: String,
}

impl ScriptText {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Verse(Verse),
    ScriptText(ScriptText),
}

/// How a block relates to a quote spanning several blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiBlockQuote {
    #[default]
    None,
    Start,
    Continuation,
    /// Same speaker as the previous block, different delivery.
    ChangeOfDelivery,
}

/// One attributable unit of script. The parser emits a fresh `Block` per
/// speaker fragment; `chapter_number` and the initial verse fields are derived
/// when elements are pushed, never on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub style_tag: String,
    #[serde(default)]
    pub is_paragraph_start: bool,
    #[serde(default)]
    pub chapter_number: u32,
    #[serde(default)]
    pub initial_start_verse: u32,
    /// End of a verse bridge at the block start; 0 when there is no bridge.
    #[serde(default)]
    pub initial_end_verse: u32,
    #[serde(default)]
    pub character_id: Option<String>,
    /// For multi-character ids: the single character the script displays.
    #[serde(default)]
    pub character_id_override: Option<String>,
    #[serde(default)]
    pub delivery: Option<String>,
    #[serde(default)]
    pub user_confirmed: bool,
    #[serde(default)]
    pub multi_block_quote: MultiBlockQuote,
    #[serde(default = "default_split_id")]
    pub split_id: i32,
    #[serde(default)]
    pub elements: Vec<BlockElement>,
}

fn default_split_id() -> i32 {
    NOT_SPLIT
}

impl Block {
    pub fn new(style_tag: &str) -> Self {
        Self::with_reference(style_tag, 0, 0, 0)
    }

    pub fn with_reference(
        style_tag: &str,
        chapter_number: u32,
        initial_start_verse: u32,
        initial_end_verse: u32,
    ) -> Self {
        Self {
            style_tag: style_tag.to_string(),
            is_paragraph_start: false,
            chapter_number,
            initial_start_verse,
            initial_end_verse: if initial_end_verse == initial_start_verse {
                0
            } else {
                initial_end_verse
            },
            character_id: None,
            character_id_override: None,
            delivery: None,
            user_confirmed: false,
            multi_block_quote: MultiBlockQuote::None,
            split_id: NOT_SPLIT,
            elements: Vec::new(),
        }
    }

    /// Append an element, deriving chapter and initial-verse context from a
    /// leading verse marker when none was given at construction.
    pub fn push_element(&mut self, element: BlockElement) {
        if let BlockElement::Verse(v) = &element {
            if self.initial_start_verse == 0 {
                if self.elements.is_empty() {
                    self.initial_start_verse = v.start_verse;
                    self.initial_end_verse = if v.end_verse == v.start_verse {
                        0
                    } else {
                        v.end_verse
                    };
                } else {
                    // text precedes the first marker: it belongs to verse 1
                    self.initial_start_verse = 1;
                }
            }
            if self.chapter_number == 0 {
                self.chapter_number = 1;
            }
        }
        self.elements.push(element);
    }

    pub fn push_verse(&mut self, number: &str) {
        self.push_element(BlockElement::Verse(Verse::new(number)));
    }

    pub fn push_text(&mut self, content: &str) {
        self.push_element(BlockElement::ScriptText(ScriptText::new(content)));
    }

    /// The block's text in reading order. With `include_verse_numbers`, verse
    /// markers render as `[n]` followed by a no-break space, matching the
    /// script display format.
    pub fn text(&self, include_verse_numbers: bool) -> String {
        let mut out = String::new();
        for element in &self.elements {
            match element {
                BlockElement::Verse(v) => {
                    if include_verse_numbers {
                        out.push('[');
                        out.push_str(&v.number);
                        out.push(']');
                        out.push('\u{a0}');
                    }
                }
                BlockElement::ScriptText(t) => out.push_str(&t.content),
            }
        }
        out
    }

    /// Last verse covered by the block: the end of the last verse marker, or
    /// the initial verse context when the block contains no markers.
    pub fn last_verse(&self) -> u32 {
        for element in self.elements.iter().rev() {
            if let BlockElement::Verse(v) = element {
                return v.end_verse.max(v.start_verse);
            }
        }
        self.initial_end_verse.max(self.initial_start_verse)
    }

    /// The initial verse as displayed: `"4"` or `"4-5"` for a bridge.
    pub fn initial_verse_label(&self) -> String {
        if self.initial_end_verse > self.initial_start_verse {
            format!("{}-{}", self.initial_start_verse, self.initial_end_verse)
        } else {
            self.initial_start_verse.to_string()
        }
    }

    /// The character id the script displays: the override for
    /// multi-character ids, otherwise the assigned id.
    pub fn character_id_in_script(&self) -> Option<&str> {
        self.character_id_override
            .as_deref()
            .or(self.character_id.as_deref())
    }

    /// A block is a quote when its speaker is not one of the book's standard
    /// roles, or when a user has explicitly confirmed it.
    pub fn is_quote(&self) -> bool {
        match self.character_id.as_deref() {
            Some(id) => !characters::is_standard_character(id) || self.user_confirmed,
            None => false,
        }
    }

    pub fn character_is(&self, book_id: &str, kind: StandardCharacter) -> bool {
        self.character_id.as_deref()
            == Some(characters::standard_character_id(book_id, kind).as_str())
    }

    pub fn character_is_standard(&self) -> bool {
        self.character_id
            .as_deref()
            .is_some_and(characters::is_standard_character)
    }

    pub fn character_is_unclear(&self) -> bool {
        self.character_id
            .as_deref()
            .is_some_and(characters::is_unclear)
    }

    pub fn set_standard_character(&mut self, book_id: &str, kind: StandardCharacter) {
        self.character_id = Some(characters::standard_character_id(book_id, kind));
        self.character_id_override = None;
        self.delivery = None;
    }

    /// Assign a resolved character, applying the default-selection policy for
    /// multi-character ids (prefer the directory record's default, fall back
    /// to the first slash-delimited segment).
    pub fn set_resolved_character(&mut self, character: &str, record: Option<&CharacterVerse>) {
        self.character_id = Some(character.to_string());
        self.character_id_override = characters::default_script_character(character, record);
        self.delivery = record.map(|r| r.delivery.clone());
    }

    /// Assign from a candidate set: no candidates leaves the speaker Unknown,
    /// exactly one distinct (character, delivery) pair assigns it, anything
    /// more is Ambiguous.
    pub fn set_character_and_delivery(&mut self, candidates: &[CharacterVerse]) {
        let distinct = characters::dedupe_character_deliveries(candidates);
        match distinct.as_slice() {
            [] => self.set_unclear(characters::UNKNOWN_CHARACTER),
            [only] => self.set_resolved_character(&only.character, Some(only)),
            _ => self.set_unclear(characters::AMBIGUOUS_CHARACTER),
        }
    }

    pub(crate) fn set_unclear(&mut self, sentinel: &str) {
        self.character_id = Some(sentinel.to_string());
        self.character_id_override = None;
        self.delivery = None;
    }
}
