// src/scoring.rs
//! Interest-overlap scoring, threshold filtering, and the personalized per-category view.
//!
//! score = number of profile interests (duplicates counted) whose lowercase form is a
//! substring of the lowercase title OR the lowercase summary. A match in both fields
//! still counts once per interest.

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyze::{AnalysisRecord, CategorizedItems, Category, Item};
use crate::profile::UserProfile;

pub const DEFAULT_THRESHOLD: i64 = 1;

/// One per source record; only items scoring at least the threshold, each with `score`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredResult {
    pub url: String,
    #[serde(flatten)]
    pub items: CategorizedItems,
}

fn field_lower(item: &Item, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

pub fn score_item(item: &Item, profile: &UserProfile) -> i64 {
    let title = field_lower(item, "title");
    let summary = field_lower(item, "summary");
    profile
        .interests()
        .iter()
        .map(|i| i.to_lowercase())
        .filter(|i| title.contains(i.as_str()) || summary.contains(i.as_str()))
        .count() as i64
}

/// Score every item of every record and keep those with `score >= threshold`, in order.
/// Kept items get their `score` written onto the input record as well as onto the copy
/// placed in the result; dropped items are left as they were.
pub fn filter_results(
    records: &mut [AnalysisRecord],
    profile: &UserProfile,
    threshold: i64,
) -> Vec<FilteredResult> {
    let mut kept_total = 0u64;
    let mut dropped_total = 0u64;

    let out = records
        .iter_mut()
        .map(|rec| {
            let mut items = CategorizedItems::default();
            for c in Category::ALL {
                for item in rec.items.get_mut(c).iter_mut() {
                    let score = score_item(item, profile);
                    if score >= threshold {
                        item.insert("score".to_string(), Value::from(score));
                        items.get_mut(c).push(item.clone());
                        kept_total += 1;
                    } else {
                        dropped_total += 1;
                    }
                }
            }
            FilteredResult {
                url: rec.url.clone(),
                items,
            }
        })
        .collect();

    counter!("pipeline_items_kept_total").increment(kept_total);
    counter!("pipeline_items_dropped_total").increment(dropped_total);
    out
}

/// Read back a stored `score`; anything missing or non-integer counts as 0.
pub fn item_score(item: &Item) -> i64 {
    item.get("score").and_then(Value::as_i64).unwrap_or(0)
}

/// All items of one category across sources, tagged with `source_url`, sorted by
/// score descending. The sort is stable, so ties keep source-then-item order.
pub fn aggregate(results: &[FilteredResult], category: Category) -> Vec<Item> {
    let mut all: Vec<Item> = results
        .iter()
        .flat_map(|r| {
            r.items.get(category).iter().map(move |item| {
                let mut tagged = item.clone();
                tagged.insert("source_url".to_string(), Value::from(r.url.clone()));
                tagged
            })
        })
        .collect();
    all.sort_by_key(|item| std::cmp::Reverse(item_score(item)));
    all
}
