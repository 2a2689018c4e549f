// src/analyze/mod.rs
//! Analysis step: prompt the completion service with a page's text and recover the
//! categorized items from whatever it answers.

pub mod completion;
pub mod parser;
pub mod prompt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use crate::analyze::completion::{CompletionError, CompletionService, DynCompletion};
pub use crate::analyze::parser::{parse, try_parse, ParseError, ParsedAnalysis};

/// One model-produced entry. Opaque apart from `title`/`summary` (read by the scorer)
/// and `score`/`source_url` (written after filtering).
pub type Item = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    News,
    Opportunities,
    Threats,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::News, Category::Opportunities, Category::Threats];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::News => "news",
            Category::Opportunities => "opportunities",
            Category::Threats => "threats",
        }
    }
}

/// The three category lists. Always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedItems {
    #[serde(default)]
    pub news: Vec<Item>,
    #[serde(default)]
    pub opportunities: Vec<Item>,
    #[serde(default)]
    pub threats: Vec<Item>,
}

impl CategorizedItems {
    pub fn get(&self, c: Category) -> &[Item] {
        match c {
            Category::News => &self.news,
            Category::Opportunities => &self.opportunities,
            Category::Threats => &self.threats,
        }
    }

    pub fn get_mut(&mut self, c: Category) -> &mut Vec<Item> {
        match c {
            Category::News => &mut self.news,
            Category::Opportunities => &mut self.opportunities,
            Category::Threats => &mut self.threats,
        }
    }

    pub fn len(&self) -> usize {
        self.news.len() + self.opportunities.len() + self.threats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-URL outcome of an analysis run. `error` is set when the page could not be
/// fetched or the completion call failed; the categories are then empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub items: CategorizedItems,
    /// Any other keys the model returned next to the categories.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisRecord {
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn from_payload(url: impl Into<String>, title: impl Into<String>, payload: AnalysisPayload) -> Self {
        Self {
            url: url.into(),
            title: Some(title.into()),
            error: None,
            items: payload.items,
            extra: payload.extra,
        }
    }
}

/// Record fields owned by the pipeline. A model answer using these names never
/// reaches `extra`.
const RESERVED_KEYS: [&str; 3] = ["url", "title", "error"];

/// What the parser recovers from one model answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisPayload {
    pub items: CategorizedItems,
    pub extra: Map<String, Value>,
}

impl AnalysisPayload {
    /// Split a decoded object into the three categories and the leftover keys.
    /// A category that is missing or not an array becomes empty; non-object
    /// entries inside a category are dropped. `url`, `title` and `error` are
    /// discarded; the record sets those itself.
    pub fn from_object(mut obj: Map<String, Value>) -> Self {
        for key in RESERVED_KEYS {
            obj.remove(key);
        }
        let mut items = CategorizedItems::default();
        for c in Category::ALL {
            if let Some(v) = obj.remove(c.as_str()) {
                *items.get_mut(c) = object_entries(v);
            }
        }
        Self { items, extra: obj }
    }
}

fn object_entries(v: Value) -> Vec<Item> {
    match v {
        Value::Array(xs) => xs
            .into_iter()
            .filter_map(|x| match x {
                Value::Object(m) => Some(m),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_record_serializes_with_empty_categories() {
        let rec = AnalysisRecord::failed("https://x", "timeout");
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            v,
            json!({
                "url": "https://x",
                "error": "timeout",
                "news": [],
                "opportunities": [],
                "threats": []
            })
        );
    }

    #[test]
    fn record_deserializes_with_missing_categories() {
        let rec: AnalysisRecord =
            serde_json::from_value(json!({ "url": "https://x", "news": [{ "title": "a" }] }))
                .unwrap();
        assert_eq!(rec.items.news.len(), 1);
        assert!(rec.items.opportunities.is_empty());
        assert!(rec.items.threats.is_empty());
        assert!(rec.extra.is_empty());
    }

    #[test]
    fn payload_keeps_extra_keys_and_drops_bad_entries() {
        let obj = json!({
            "news": [{ "title": "a" }, "loose string"],
            "threats": "none",
            "sentiment": "neutral"
        });
        let Value::Object(m) = obj else { unreachable!() };
        let p = AnalysisPayload::from_object(m);
        assert_eq!(p.items.news.len(), 1);
        assert!(p.items.threats.is_empty());
        assert_eq!(p.extra.get("sentiment"), Some(&json!("neutral")));
    }

    #[test]
    fn model_url_and_title_do_not_shadow_the_crawled_ones() {
        let Value::Object(m) = json!({
            "url": "https://model",
            "title": "Model title",
            "error": "made up",
            "news": [{ "title": "a" }]
        }) else {
            unreachable!()
        };
        let rec = AnalysisRecord::from_payload("https://real", "Page", AnalysisPayload::from_object(m));

        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["url"], "https://real");
        assert_eq!(v["title"], "Page");
        assert!(v.get("error").is_none());

        let text = serde_json::to_string(&rec).unwrap();
        let back: AnalysisRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, rec);
    }
}
