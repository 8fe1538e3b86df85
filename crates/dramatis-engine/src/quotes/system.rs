//! Quotation conventions of a translation: which glyphs open, close, and
//! resume quotes at each nesting level, plus an optional dialogue-dash
//! convention (a start token such as an em dash or colon, with or without a
//! matching end token).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteType {
    /// Ordinary paired quotation marks.
    Normal,
    /// Dialogue introduced by a dash or colon rather than paired marks.
    Narrative,
}

/// The marks for one nesting level. `continuer` is the literal expected at
/// the start of a paragraph that resumes a quote left open by the previous
/// paragraph; for nested levels it is conventionally the concatenation of all
/// enclosing levels' continuers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationMark {
    pub open: String,
    pub close: String,
    pub continuer: String,
    pub level: u8,
    pub quote_type: QuoteType,
}

impl QuotationMark {
    pub fn new(open: &str, close: &str, continuer: &str, level: u8, quote_type: QuoteType) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
            continuer: continuer.to_string(),
            level,
            quote_type,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteSystemError {
    #[error("A quote system must define at least one level")]
    Empty,
    #[error("Quote levels must be contiguous from 1: expected level {expected}, found {found}")]
    NonContiguousLevels { expected: u8, found: u8 },
    #[error("Level {level} has an empty open or close mark")]
    EmptyMark { level: u8 },
}

/// A validated set of quotation conventions. Levels are contiguous from 1;
/// requests beyond the defined depth cycle back through the defined marks, so
/// a two-level system treats a third-level open as a reuse of level 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSystem {
    levels: Vec<QuotationMark>,
    dialogue_open: Option<String>,
    dialogue_close: Option<String>,
}

impl QuoteSystem {
    pub fn new(levels: Vec<QuotationMark>) -> Result<Self, QuoteSystemError> {
        Self::with_dialogue_tokens(levels, None, None)
    }

    /// A system that also recognizes dialogue speech introduced by `open`
    /// (an em dash, a colon) and optionally terminated by `close`.
    pub fn with_dialogue(
        levels: Vec<QuotationMark>,
        open: &str,
        close: Option<&str>,
    ) -> Result<Self, QuoteSystemError> {
        Self::with_dialogue_tokens(levels, Some(open.to_string()), close.map(str::to_string))
    }

    fn with_dialogue_tokens(
        levels: Vec<QuotationMark>,
        dialogue_open: Option<String>,
        dialogue_close: Option<String>,
    ) -> Result<Self, QuoteSystemError> {
        if levels.is_empty() {
            return Err(QuoteSystemError::Empty);
        }
        for (i, mark) in levels.iter().enumerate() {
            let expected = i as u8 + 1;
            if mark.level != expected {
                return Err(QuoteSystemError::NonContiguousLevels {
                    expected,
                    found: mark.level,
                });
            }
            if mark.open.is_empty() || mark.close.is_empty() {
                return Err(QuoteSystemError::EmptyMark { level: mark.level });
            }
        }
        Ok(Self {
            levels,
            dialogue_open,
            dialogue_close,
        })
    }

    pub fn defined_levels(&self) -> usize {
        self.levels.len()
    }

    /// The marks for a nesting depth (1-based). Depths beyond the defined
    /// levels cycle through the defined marks.
    pub fn mark(&self, level: usize) -> &QuotationMark {
        debug_assert!(level >= 1);
        &self.levels[(level - 1) % self.levels.len()]
    }

    pub fn dialogue_open(&self) -> Option<&str> {
        self.dialogue_open.as_deref()
    }

    pub fn dialogue_close(&self) -> Option<&str> {
        self.dialogue_close.as_deref()
    }

    pub fn has_dialogue(&self) -> bool {
        self.dialogue_open.is_some()
    }
}

impl Default for QuoteSystem {
    /// Guillemets, three levels, continuers accumulating outer marks.
    fn default() -> Self {
        Self {
            levels: vec![
                QuotationMark::new("«", "»", "«", 1, QuoteType::Normal),
                QuotationMark::new("‹", "›", "«‹", 2, QuoteType::Normal),
                QuotationMark::new("«", "»", "«‹«", 3, QuoteType::Normal),
            ],
            dialogue_open: None,
            dialogue_close: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_levels() -> Vec<QuotationMark> {
        vec![
            QuotationMark::new("«", "»", "«", 1, QuoteType::Normal),
            QuotationMark::new("‹", "›", "«‹", 2, QuoteType::Normal),
        ]
    }

    #[test]
    fn validates_contiguity() {
        let err = QuoteSystem::new(vec![QuotationMark::new("«", "»", "«", 2, QuoteType::Normal)])
            .unwrap_err();
        assert_eq!(
            err,
            QuoteSystemError::NonContiguousLevels {
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_empty_systems_and_marks() {
        assert_eq!(QuoteSystem::new(vec![]).unwrap_err(), QuoteSystemError::Empty);
        let err = QuoteSystem::new(vec![QuotationMark::new("«", "", "«", 1, QuoteType::Normal)])
            .unwrap_err();
        assert_eq!(err, QuoteSystemError::EmptyMark { level: 1 });
    }

    #[test]
    fn deeper_levels_cycle_defined_marks() {
        let system = QuoteSystem::new(two_levels()).unwrap();
        assert_eq!(system.mark(1).open, "«");
        assert_eq!(system.mark(2).open, "‹");
        assert_eq!(system.mark(3).open, "«");
        assert_eq!(system.mark(4).open, "‹");
    }

    #[test]
    fn dialogue_tokens_are_optional() {
        let plain = QuoteSystem::new(two_levels()).unwrap();
        assert!(!plain.has_dialogue());
        let dashed = QuoteSystem::with_dialogue(two_levels(), "—", Some("—")).unwrap();
        assert_eq!(dashed.dialogue_open(), Some("—"));
        assert_eq!(dashed.dialogue_close(), Some("—"));
        let colon = QuoteSystem::with_dialogue(two_levels(), ":", None).unwrap();
        assert_eq!(colon.dialogue_close(), None);
    }
}
