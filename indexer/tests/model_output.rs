//! Realistic model replies through repair and keyword correction

use indexer::keywords::{KeywordRules, correct};
use indexer::repair::{RepairStage, parse};

fn keywords_of(raw: &str) -> Vec<String> {
    let parsed = parse(raw).unwrap();
    correct(&parsed.keywords, &[], &KeywordRules::default())
}

#[test]
fn test_fenced_reply_with_trailing_comma() {
    let raw = "Here you go:\n```json\n{\"Keywords\": [\"Dogs\", \"beach\",], \"Description\": \"Two dogs on a beach.\"}\n```";
    let parsed = parse(raw).unwrap();
    assert_eq!(parsed.stage, RepairStage::Syntactic);
    assert_eq!(parsed.caption.as_deref(), Some("Two dogs on a beach."));
    assert_eq!(keywords_of(raw), vec!["dog".to_string(), "beach".to_string()]);
}

#[test]
fn test_reply_cut_off_by_token_limit() {
    let raw = r#"{"Keywords": ["mountain", "lakes", "snowy pe"#;
    let keywords = keywords_of(raw);
    assert_eq!(keywords[..2], ["mountain".to_string(), "lake".to_string()]);
}

#[test]
fn test_plain_text_labels() {
    let raw = "Keywords: Red Car, street, vintage automobiles\nDescription: A red vintage car parked on a street.";
    let parsed = parse(raw).unwrap();
    assert_eq!(parsed.stage, RepairStage::Heuristic);
    assert_eq!(
        parsed.caption.as_deref(),
        Some("A red vintage car parked on a street.")
    );
    assert_eq!(
        keywords_of(raw),
        vec![
            "red car".to_string(),
            "street".to_string(),
            "vintage automobile".to_string()
        ]
    );
}

#[test]
fn test_prose_only_reply_is_unparsable() {
    let err = parse("I'm sorry, I can't see any image in this conversation.").unwrap_err();
    assert!(err.excerpt.starts_with("I'm sorry"));
}

#[test]
fn test_correction_is_stable_on_its_own_output() {
    let raw = r#"{"Keywords": ["Buses", "CityStreet", "rain and fog", "glasses", "Unknown", "2024 photos"]}"#;
    let rules = KeywordRules::default();
    let once = keywords_of(raw);
    let twice = correct(&once, &[], &rules);
    assert_eq!(once, twice);
    assert!(!once.iter().any(|k| k == "unknown"));
    assert!(!once.iter().any(|k| k.starts_with("2024")));
}
