pub mod block;

pub use block::{Block, BlockElement, MultiBlockQuote, ScriptText, Verse, NOT_SPLIT};
