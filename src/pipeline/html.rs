//! HTML handling: script-dependence probe and visible-text extraction.

use scraper::{Html, Node};

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// `true` when the raw markup looks like it needs script execution.
///
/// The probe is deliberately crude: any mention of `javascript` counts.
pub fn needs_script(body: &str) -> bool {
    body.to_lowercase().contains("javascript")
}

/// Extract the visible text of a document.
///
/// Text nodes under hidden elements are skipped; each remaining node is
/// trimmed and the non-empty ones are joined with a single space.
pub fn visible_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => HIDDEN_ELEMENTS.contains(&el.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}
