// tests/parser.rs
use aura_intel::analyze::{parse, try_parse, ParseError, ParsedAnalysis};
use serde_json::json;

#[test]
fn fenced_block_inside_prose_is_recovered() {
    let raw = "Sure! Here is the analysis you asked for:\n\n```json\n{\"news\": [], \"opportunities\": [], \"threats\": []}\n```\n\nLet me know if you need more.";
    let ParsedAnalysis::Parsed(p) = parse(raw) else {
        panic!("expected a parsed payload");
    };
    assert!(p.items.is_empty());
    assert!(p.extra.is_empty());
}

#[test]
fn fenced_block_items_are_kept_in_order() {
    let raw = r#"Analysis:
```json
{
  "news": [{"title": "Inflation rises", "summary": "CPI at 7%"}, {"title": "GDP"}],
  "opportunities": [{"title": "IPO", "summary": "new listing"}],
  "threats": []
}
```"#;
    let p = try_parse(raw).expect("fenced json");
    let titles: Vec<_> = p
        .items
        .news
        .iter()
        .map(|i| i.get("title").cloned().unwrap())
        .collect();
    assert_eq!(titles, vec![json!("Inflation rises"), json!("GDP")]);
    assert_eq!(p.items.opportunities.len(), 1);
}

#[test]
fn bare_json_answer_is_accepted() {
    let raw = "  {\"threats\": [{\"title\": \"Fraud alert\"}]}\n";
    let p = try_parse(raw).unwrap();
    assert_eq!(p.items.threats.len(), 1);
    assert!(p.items.news.is_empty(), "absent categories default to empty");
}

#[test]
fn garbage_degrades_to_empty_fallback() {
    for raw in [
        "",
        "I could not find anything relevant.",
        "```json\n{not json}\n```",
        "```\n{\"news\": []}\n```",
    ] {
        let parsed = parse(raw);
        assert_eq!(parsed, ParsedAnalysis::Fallback, "input: {raw:?}");
        let payload = parsed.into_payload();
        assert!(payload.items.news.is_empty());
        assert!(payload.items.opportunities.is_empty());
        assert!(payload.items.threats.is_empty());
        assert_eq!(try_parse(raw), Err(ParseError::NoJsonObject));
    }
}

#[test]
fn first_fence_wins() {
    let raw = "```json\n{\"news\": [{\"title\": \"first\"}]}\n```\n```json\n{\"news\": [{\"title\": \"second\"}]}\n```";
    let p = try_parse(raw).unwrap();
    assert_eq!(p.items.news[0].get("title"), Some(&json!("first")));
}
