//! Thin rendering of attributed blocks: tab-delimited script rows, HTML for
//! preview display, and plain-text round-trips.

use crate::models::{Block, BlockElement};

/// One tab-delimited script row:
/// `index [actor] style book chapter verse character delivery text length`.
/// The actor column is only present when an actor name is given.
pub fn tab_delimited_line(block: &Block, index: usize, book_id: &str, actor: Option<&str>) -> String {
    let text = block.text(true);
    let mut fields: Vec<String> = vec![index.to_string()];
    if let Some(actor) = actor {
        fields.push(actor.to_string());
    }
    fields.push(block.style_tag.clone());
    fields.push(book_id.to_string());
    fields.push(block.chapter_number.to_string());
    fields.push(block.initial_verse_label());
    fields.push(
        block
            .character_id_in_script()
            .unwrap_or_default()
            .to_string(),
    );
    fields.push(block.delivery.clone().unwrap_or_default());
    fields.push(text.clone());
    fields.push(text.chars().count().to_string());
    fields.join("\t")
}

/// HTML for one block: verse numbers in `<sup>`, each text run escaped and
/// wrapped in a `scripttext` div keyed by its verse.
pub fn block_to_html(block: &Block, right_to_left: bool) -> String {
    let mut out = String::new();
    let mut current_verse = block.initial_verse_label();
    for element in &block.elements {
        match element {
            BlockElement::Verse(v) => {
                current_verse = v.number.clone();
                out.push_str("<sup>");
                if right_to_left {
                    out.push_str("&rlm;");
                }
                out.push_str(&html_escape::encode_text(&v.number));
                out.push_str("&#160;");
                if right_to_left {
                    out.push_str("&rlm;");
                }
                out.push_str("</sup>");
            }
            BlockElement::ScriptText(t) => {
                out.push_str(&format!(
                    r#"<div id="{}" class="scripttext">{}</div>"#,
                    current_verse,
                    html_escape::encode_text(&t.content)
                ));
            }
        }
    }
    out
}

/// The whole book as displayed text, verse markers included.
pub fn book_text(blocks: &[Block]) -> String {
    blocks.iter().map(|b| b.text(true)).collect()
}
