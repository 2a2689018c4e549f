// src/extract.rs
//! Plain text + metadata extraction from fetched markup. Best effort: html5ever never
//! rejects input, and every missing element maps to an empty string.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: String,
    pub text: String,
    pub meta_description: String,
}

static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title selector"));
static SEL_META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").expect("meta selector"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Elements whose text children never render.
const HIDDEN: [&str; 4] = ["script", "style", "noscript", "template"];

pub fn extract(markup: &str) -> ExtractedContent {
    let doc = Html::parse_document(markup);

    let title = doc
        .select(&SEL_TITLE)
        .next()
        .map(|el| collapse(&el.text().collect::<String>()))
        .unwrap_or_default();

    // `name` compared case-sensitively; CSS attribute selectors would not guarantee that.
    let meta_description = doc
        .select(&SEL_META)
        .find(|el| el.value().attr("name") == Some("description"))
        .map(|el| el.value().attr("content").unwrap_or_default().to_string())
        .unwrap_or_default();

    ExtractedContent {
        title,
        text: visible_text(&doc),
        meta_description,
    }
}

fn visible_text(doc: &Html) -> String {
    let mut parts: Vec<String> = Vec::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|el| HIDDEN.contains(&el.name()));
        if hidden {
            continue;
        }
        let piece = collapse(text);
        if !piece.is_empty() {
            parts.push(piece);
        }
    }
    parts.join(" ")
}

fn collapse(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}
