//! The scanning state machine that splits unattributed paragraphs into
//! speaker-attributed blocks.
//!
//! Each input block is scanned once, left to right. Quotation marks split the
//! paragraph into narration and quote fragments; open quote state carries
//! across paragraphs (resumed via continuer marks), and dialogue-dash speech
//! follows its own rules since it has no reliable closing mark. Every quote
//! fragment is looked up in the character-verse directory; fragments of one
//! quote spanning several blocks form a chain that is reconciled when the
//! quote finally closes.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::characters::{self, CharacterVerse, CharacterVerseInfo, StandardCharacter};
use crate::models::{Block, BlockElement, ScriptText};
use crate::quotes::system::QuoteSystem;

/// Sentence-final punctuation (possibly followed by closing marks) at the end
/// of a paragraph; decides whether open dialogue speech is provisionally
/// closed or carries forward unconditionally.
fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[.!?…]["'”’»›)\]]*\s*$"#).expect("Invalid sentence-end regex")
    })
}

/// Does the string start with a punctuation character?
fn leading_punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A\p{P}").expect("Invalid punctuation regex"))
}

pub struct QuoteParser<'a> {
    cv_info: &'a dyn CharacterVerseInfo,
    book_id: String,
    system: QuoteSystem,
}

impl<'a> QuoteParser<'a> {
    pub fn new(cv_info: &'a dyn CharacterVerseInfo, book_id: &str, system: QuoteSystem) -> Self {
        Self {
            cv_info,
            book_id: book_id.to_string(),
            system,
        }
    }

    /// Scan a book's blocks in order, producing the attributed block list.
    /// Never fails: unresolvable speakers come back as Unknown or Ambiguous,
    /// and a quote left open at the end of the book stays open.
    pub fn parse(&self, input: &[Block]) -> Vec<Block> {
        let mut scan = Scan::new(self);
        for block in input {
            scan.push_block(block);
        }
        scan.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialogue {
    Closed,
    /// Dash speech is open; `inner` counts matched level-1 pairs inside it.
    Open { inner: usize },
    /// Speech looked finished at a paragraph end; the next paragraph decides
    /// whether it resumes (continuer or new dash) or was really over.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Narration,
    Quote,
}

struct ChainFragment {
    /// Index of the emitted block in the output.
    index: usize,
    /// Distinct (character, delivery) candidates for the fragment's verses.
    candidates: Vec<CharacterVerse>,
    /// Set when the fragment resolved uniquely on its own.
    unique: Option<(String, String)>,
}

enum ChainResolution {
    Unknown,
    Single(String),
    Ambiguous,
}

struct Scan<'p, 'a> {
    parser: &'p QuoteParser<'a>,
    out: Vec<Block>,
    depth: usize,
    dialogue: Dialogue,
    chain: Vec<ChainFragment>,
    // per-paragraph state
    acc: Block,
    kind: FragmentKind,
    buf: String,
    at_para_start: bool,
    fragments_emitted_in_block: usize,
    pending_close_at_para_end: bool,
    cur_style: String,
    cur_para_start_flag: bool,
    cur_chapter: u32,
    cur_vstart: u32,
    cur_vend: u32,
}

impl<'p, 'a> Scan<'p, 'a> {
    fn new(parser: &'p QuoteParser<'a>) -> Self {
        Self {
            parser,
            out: Vec::new(),
            depth: 0,
            dialogue: Dialogue::Closed,
            chain: Vec::new(),
            acc: Block::new(""),
            kind: FragmentKind::Narration,
            buf: String::new(),
            at_para_start: true,
            fragments_emitted_in_block: 0,
            pending_close_at_para_end: false,
            cur_style: String::new(),
            cur_para_start_flag: false,
            cur_chapter: 0,
            cur_vstart: 0,
            cur_vend: 0,
        }
    }

    fn push_block(&mut self, block: &Block) {
        if let Some(structural) = self.as_structural(block) {
            self.finalize_chain();
            self.depth = 0;
            self.dialogue = Dialogue::Closed;
            self.out.push(structural);
            return;
        }
        self.begin_paragraph(block);
        let more_text_after = more_text_flags(&block.elements);
        for (idx, element) in block.elements.iter().enumerate() {
            match element {
                BlockElement::Verse(v) => {
                    self.flush_buf();
                    if self.acc.elements.is_empty() {
                        self.acc.initial_start_verse = v.start_verse;
                        self.acc.initial_end_verse = if v.end_verse == v.start_verse {
                            0
                        } else {
                            v.end_verse
                        };
                    } else if self.acc.initial_start_verse == 0 {
                        // Text preceded the first marker: it belongs to verse 1.
                        self.acc.initial_start_verse = 1;
                    }
                    if self.acc.chapter_number == 0 {
                        self.acc.chapter_number = 1;
                    }
                    self.acc.elements.push(BlockElement::Verse(v.clone()));
                    self.cur_vstart = v.start_verse;
                    self.cur_vend = if v.end_verse == v.start_verse {
                        0
                    } else {
                        v.end_verse
                    };
                }
                BlockElement::ScriptText(t) => {
                    if !t.content.is_empty() {
                        self.scan_run(&t.content, more_text_after[idx]);
                    }
                }
            }
        }
        self.end_paragraph(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.finalize_chain();
        self.out
    }

    /// Blocks already attributed upstream (chapter headings, section heads,
    /// titles) pass through unscanned; an untagged `c` or `mt` block gets the
    /// book-or-chapter role. Either way they terminate any open quote.
    fn as_structural(&self, block: &Block) -> Option<Block> {
        if block.character_id.is_some() {
            return Some(block.clone());
        }
        if block.style_tag == "c" || block.style_tag == "mt" {
            let mut tagged = block.clone();
            tagged.set_standard_character(&self.parser.book_id, StandardCharacter::BookOrChapter);
            return Some(tagged);
        }
        None
    }

    fn begin_paragraph(&mut self, block: &Block) {
        self.cur_style = block.style_tag.clone();
        self.cur_para_start_flag = block.is_paragraph_start;
        self.cur_chapter = block.chapter_number;
        self.cur_vstart = block.initial_start_verse;
        self.cur_vend = block.initial_end_verse;
        self.fragments_emitted_in_block = 0;
        self.at_para_start = true;
        self.pending_close_at_para_end = false;
        let kind = if self.depth > 0 || matches!(self.dialogue, Dialogue::Open { .. }) {
            FragmentKind::Quote
        } else {
            FragmentKind::Narration
        };
        self.start_fragment(kind);
    }

    fn end_paragraph(&mut self, block: &Block) {
        self.emit_fragment();
        if self.pending_close_at_para_end {
            self.pending_close_at_para_end = false;
            self.dialogue = Dialogue::Pending;
        } else if matches!(self.dialogue, Dialogue::Open { .. })
            && sentence_end().is_match(&block.text(false))
        {
            self.dialogue = Dialogue::Pending;
        }
    }

    fn start_fragment(&mut self, kind: FragmentKind) {
        let mut acc = Block::with_reference(
            &self.cur_style,
            self.cur_chapter,
            self.cur_vstart,
            self.cur_vend,
        );
        acc.is_paragraph_start = self.cur_para_start_flag && self.fragments_emitted_in_block == 0;
        self.acc = acc;
        self.kind = kind;
    }

    fn flush_buf(&mut self) {
        if !self.buf.is_empty() {
            let content = std::mem::take(&mut self.buf);
            self.acc
                .elements
                .push(BlockElement::ScriptText(ScriptText::new(content)));
        }
    }

    /// Attribute and emit the fragment under construction, if it has any
    /// content. Quote fragments also join the active chain.
    fn emit_fragment(&mut self) {
        self.flush_buf();
        if self.acc.elements.is_empty() {
            return;
        }
        let mut acc = std::mem::replace(&mut self.acc, Block::new(&self.cur_style));
        match self.kind {
            FragmentKind::Narration => {
                acc.set_standard_character(&self.parser.book_id, StandardCharacter::Narrator);
            }
            FragmentKind::Quote => {
                let start = acc.initial_start_verse;
                let end = acc.last_verse().max(start);
                let candidates = characters::dedupe_character_deliveries(
                    &self
                        .parser
                        .cv_info
                        .characters(&self.parser.book_id, acc.chapter_number, start, end),
                );
                acc.set_character_and_delivery(&candidates);
                let unique = match candidates.as_slice() {
                    [only] => Some((only.character.clone(), only.delivery.clone())),
                    _ => None,
                };
                self.chain.push(ChainFragment {
                    index: self.out.len(),
                    candidates,
                    unique,
                });
            }
        }
        self.fragments_emitted_in_block += 1;
        self.out.push(acc);
    }

    fn scan_run(&mut self, s: &str, more_runs_after: bool) {
        let mut i = 0;
        if self.at_para_start {
            self.at_para_start = false;
            i = self.paragraph_start_prefix(s);
        }
        let mut seg = i;
        while i < s.len() {
            let rest = &s[i..];
            if let Dialogue::Open { inner } = self.dialogue {
                let sys = &self.parser.system;
                let level1 = sys.mark(1);
                if inner == 0 {
                    if let Some(token) = sys.dialogue_close() {
                        if rest.starts_with(token) {
                            // speech ends; the token belongs to the narration
                            self.buf.push_str(&s[seg..i]);
                            self.emit_fragment();
                            self.finalize_chain();
                            self.dialogue = Dialogue::Closed;
                            self.start_fragment(FragmentKind::Narration);
                            seg = i;
                            i += token.len();
                            continue;
                        }
                    }
                }
                if inner > 0 && rest.starts_with(level1.close.as_str()) {
                    self.dialogue = Dialogue::Open { inner: inner - 1 };
                    i += level1.close.len();
                    continue;
                }
                if rest.starts_with(level1.open.as_str()) {
                    self.dialogue = Dialogue::Open { inner: inner + 1 };
                    i += level1.open.len();
                    continue;
                }
                if inner == 0 && rest.starts_with(level1.close.as_str()) {
                    // a bare close ends the speech only when narration follows
                    // in the same paragraph; paragraph-final it stays open
                    // pending a continuer
                    let j = self.consume_trailing(s, i + level1.close.len());
                    self.buf.push_str(&s[seg..j]);
                    seg = j;
                    i = j;
                    if more_text(s, j, more_runs_after) {
                        self.emit_fragment();
                        self.finalize_chain();
                        self.dialogue = Dialogue::Closed;
                        self.start_fragment(FragmentKind::Narration);
                    } else {
                        self.pending_close_at_para_end = true;
                    }
                    continue;
                }
            } else if self.depth == 0 {
                let sys = &self.parser.system;
                let level1 = sys.mark(1);
                if rest.starts_with(level1.open.as_str()) {
                    // opening punctuation right before the mark goes with the
                    // quote, not the narration
                    let k = back_up_over_openers(s, seg, i);
                    if self.kind == FragmentKind::Narration
                        && !self.narration_is_trivial(&s[seg..k])
                    {
                        self.buf.push_str(&s[seg..k]);
                        self.emit_fragment();
                        self.start_fragment(FragmentKind::Quote);
                        seg = k;
                    } else {
                        // leading whitespace or opening punctuation joins the
                        // quote instead of becoming an empty narration block
                        self.kind = FragmentKind::Quote;
                    }
                    self.depth = 1;
                    i += level1.open.len();
                    continue;
                }
                if let Some(token) = sys.dialogue_open() {
                    if rest.starts_with(token) {
                        if self.fragments_emitted_in_block == 0
                            && self.kind == FragmentKind::Narration
                            && self.narration_is_trivial(&s[seg..i])
                        {
                            // paragraph-initial dash belongs to the speech
                            self.kind = FragmentKind::Quote;
                            self.dialogue = Dialogue::Open { inner: 0 };
                            i += token.len();
                            continue;
                        }
                        // mid-paragraph: the token and one following space
                        // stay with the narration
                        let mut j = i + token.len();
                        if let Some(c) = s[j..].chars().next() {
                            if c.is_whitespace() {
                                j += c.len_utf8();
                            }
                        }
                        self.buf.push_str(&s[seg..j]);
                        self.emit_fragment();
                        self.dialogue = Dialogue::Open { inner: 0 };
                        self.start_fragment(FragmentKind::Quote);
                        seg = j;
                        i = j;
                        continue;
                    }
                }
            } else {
                let sys = &self.parser.system;
                let close_cur = &sys.mark(self.depth).close;
                let open_next = &sys.mark(self.depth + 1).open;
                let close_matches = rest.starts_with(close_cur.as_str());
                let open_matches = rest.starts_with(open_next.as_str());
                // longest match wins; an exact tie is a close
                if close_matches && (!open_matches || close_cur.len() >= open_next.len()) {
                    if self.depth == 1 {
                        let j = self.consume_trailing(s, i + close_cur.len());
                        self.buf.push_str(&s[seg..j]);
                        self.emit_fragment();
                        self.finalize_chain();
                        self.depth = 0;
                        self.start_fragment(FragmentKind::Narration);
                        seg = j;
                        i = j;
                    } else {
                        self.depth -= 1;
                        i += close_cur.len();
                    }
                    continue;
                }
                if open_matches {
                    self.depth += 1;
                    i += open_next.len();
                    continue;
                }
            }
            match rest.chars().next() {
                Some(c) => i += c.len_utf8(),
                None => break,
            }
        }
        self.buf.push_str(&s[seg..]);
    }

    /// Paragraph-initial handling: continuers for open quotes, and resolution
    /// of provisionally closed dialogue speech. Returns the number of bytes
    /// consumed into the current fragment.
    fn paragraph_start_prefix(&mut self, s: &str) -> usize {
        let sys = &self.parser.system;
        match self.dialogue {
            Dialogue::Open { .. } => {
                // a level-1 open or a fresh dash at paragraph start continues
                // the open speech
                let open = &sys.mark(1).open;
                if s.starts_with(open.as_str()) {
                    self.buf.push_str(open);
                    return open.len();
                }
                if let Some(token) = sys.dialogue_open() {
                    if s.starts_with(token) {
                        self.buf.push_str(token);
                        return token.len();
                    }
                }
                0
            }
            Dialogue::Pending => {
                let base = usize::from(s.starts_with('('));
                let open = &sys.mark(1).open;
                let resumed = if s[base..].starts_with(open.as_str()) {
                    Some(base + open.len())
                } else {
                    sys.dialogue_open()
                        .filter(|token| s[base..].starts_with(token))
                        .map(|token| base + token.len())
                };
                match resumed {
                    Some(len) => {
                        self.dialogue = Dialogue::Open { inner: 0 };
                        self.kind = FragmentKind::Quote;
                        self.buf.push_str(&s[..len]);
                        len
                    }
                    None => {
                        // the speech really was over
                        self.finalize_chain();
                        self.dialogue = Dialogue::Closed;
                        self.kind = FragmentKind::Narration;
                        0
                    }
                }
            }
            Dialogue::Closed => {
                if self.depth == 0 {
                    return 0;
                }
                // deepest open level's continuer first; an opening parenthesis
                // may precede it
                let base = usize::from(s.starts_with('('));
                for level in (1..=self.depth).rev() {
                    let continuer = &sys.mark(level).continuer;
                    if !continuer.is_empty() && s[base..].starts_with(continuer.as_str()) {
                        let len = base + continuer.len();
                        self.buf.push_str(&s[..len]);
                        return len;
                    }
                }
                0
            }
        }
    }

    /// After a level-1 close: trailing punctuation and following whitespace
    /// stay with the quote, but an opener (parenthesis, quote mark, dialogue
    /// token) starts the next fragment.
    fn consume_trailing(&self, s: &str, mut j: usize) -> usize {
        while j < s.len() {
            let rest = &s[j..];
            if self.starts_with_opener(rest) {
                return j;
            }
            match rest.chars().next() {
                Some(c) if !c.is_whitespace() && leading_punctuation().is_match(rest) => {
                    j += c.len_utf8();
                }
                _ => break,
            }
        }
        while j < s.len() {
            match s[j..].chars().next() {
                Some(c) if c.is_whitespace() => j += c.len_utf8(),
                _ => break,
            }
        }
        j
    }

    fn starts_with_opener(&self, rest: &str) -> bool {
        if rest.starts_with(['(', '[', '{', '¿', '¡']) {
            return true;
        }
        let sys = &self.parser.system;
        if (1..=sys.defined_levels()).any(|level| rest.starts_with(sys.mark(level).open.as_str())) {
            return true;
        }
        sys.dialogue_open().is_some_and(|token| rest.starts_with(token))
    }

    /// Narration that is only whitespace and opening punctuation merges into
    /// the following quote fragment.
    fn narration_is_trivial(&self, pending: &str) -> bool {
        fn trivial(text: &str) -> bool {
            text.chars()
                .all(|c| c.is_whitespace() || matches!(c, '(' | '[' | '{' | '¿' | '¡'))
        }
        self.acc.elements.iter().all(|element| match element {
            BlockElement::ScriptText(t) => trivial(&t.content),
            BlockElement::Verse(_) => true,
        }) && trivial(&self.buf)
            && trivial(pending)
    }

    /// Reconcile a finished multi-block quote: tag Start/Continuation, and
    /// resolve the speaker by intersecting candidate characters across the
    /// chain (fragments with no candidates contribute no information).
    fn finalize_chain(&mut self) {
        let chain = std::mem::take(&mut self.chain);
        if chain.len() < 2 {
            return;
        }
        let sets: Vec<BTreeSet<&str>> = chain
            .iter()
            .map(|f| f.candidates.iter().map(|c| c.character.as_str()).collect())
            .collect();
        let mut intersection: Option<BTreeSet<&str>> = None;
        for set in sets.iter().filter(|set| !set.is_empty()) {
            intersection = Some(match intersection.take() {
                None => set.clone(),
                Some(acc) => acc.intersection(set).copied().collect(),
            });
        }
        let resolution = match &intersection {
            None => ChainResolution::Unknown,
            Some(set) if set.len() == 1 => match set.iter().next() {
                Some(character) => ChainResolution::Single((*character).to_string()),
                None => ChainResolution::Unknown,
            },
            Some(_) => ChainResolution::Ambiguous,
        };
        for (k, fragment) in chain.iter().enumerate() {
            let block = &mut self.out[fragment.index];
            match &resolution {
                ChainResolution::Unknown => {}
                ChainResolution::Single(character) => {
                    let record = fragment
                        .candidates
                        .iter()
                        .find(|c| &c.character == character);
                    block.set_resolved_character(character, record);
                }
                ChainResolution::Ambiguous => {
                    block.set_unclear(characters::AMBIGUOUS_CHARACTER);
                }
            }
            block.multi_block_quote = if k == 0 {
                crate::models::MultiBlockQuote::Start
            } else {
                let delivery_changed = match (&resolution, &fragment.unique, &chain[k - 1].unique)
                {
                    (
                        ChainResolution::Single(character),
                        Some((c1, d1)),
                        Some((c0, d0)),
                    ) => c1 == character && c0 == character && d1 != d0,
                    _ => false,
                };
                if delivery_changed {
                    crate::models::MultiBlockQuote::ChangeOfDelivery
                } else {
                    crate::models::MultiBlockQuote::Continuation
                }
            };
        }
    }
}

fn back_up_over_openers(s: &str, seg: usize, i: usize) -> usize {
    let mut k = i;
    while k > seg {
        match s[seg..k].chars().next_back() {
            Some(c) if matches!(c, '(' | '[' | '{' | '¿' | '¡') => k -= c.len_utf8(),
            _ => break,
        }
    }
    k
}

fn more_text(s: &str, j: usize, more_runs_after: bool) -> bool {
    more_runs_after || s[j..].chars().any(|c| !c.is_whitespace())
}

/// For each element: whether any later text run in the block has visible text.
fn more_text_flags(elements: &[BlockElement]) -> Vec<bool> {
    let mut flags = vec![false; elements.len()];
    let mut seen = false;
    for (i, element) in elements.iter().enumerate().rev() {
        flags[i] = seen;
        if let BlockElement::ScriptText(t) = element {
            if t.content.chars().any(|c| !c.is_whitespace()) {
                seen = true;
            }
        }
    }
    flags
}
