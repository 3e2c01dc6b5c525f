//! Keyword correction engine
//!
//! `correct` turns raw model keywords into the final list written to a file:
//! normalize → stopwords → length → script → depluralize → dedupe → merge
//! with existing keywords → truncate. It never fails and applying it twice
//! gives the same list as applying it once.

mod normalize;
mod plural;

pub use normalize::{CONJUNCTION_PHRASES, split_camel_case};
pub use plural::{depluralize, singular};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Prompt words local models tend to echo back as keywords
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "no",
    "unspecified",
    "unknown",
    "standard",
    "unidentified",
    "time",
    "category",
    "actions",
    "setting",
    "objects",
    "visual",
    "elements",
    "activities",
    "appearance",
    "professions",
    "relationships",
    "identify",
    "photography",
    "photographic",
    "topiary",
];

/// Options for [`correct`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordRules {
    pub depluralize: bool,
    /// Drop keywords containing non-Latin characters
    pub latin_only: bool,
    /// Bounds on keyword length, in characters
    pub min_length: usize,
    pub max_length: usize,
    pub stopword_filter: bool,
    pub stopwords: Vec<String>,
    /// Emit lower-case keywords; comparison is case-insensitive either way
    pub lowercase: bool,
    /// Maximum words per keyword (0 = unlimited)
    pub max_words: usize,
    pub no_digits_start: bool,
    pub split_camel_case: bool,
    pub split_conjunctions: bool,
    /// Maximum keywords written to a file
    pub max_keywords: usize,
    /// Put new keywords ahead of existing ones
    pub new_first: bool,
}

impl Default for KeywordRules {
    fn default() -> Self {
        Self {
            depluralize: true,
            latin_only: true,
            min_length: 2,
            max_length: 40,
            stopword_filter: true,
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            lowercase: true,
            max_words: 2,
            no_digits_start: true,
            split_camel_case: true,
            split_conjunctions: true,
            max_keywords: 50,
            new_first: false,
        }
    }
}

impl KeywordRules {
    /// Rules that only trim, dedupe and merge
    pub fn permissive() -> Self {
        Self {
            depluralize: false,
            latin_only: false,
            min_length: 1,
            max_length: usize::MAX,
            stopword_filter: false,
            stopwords: Vec::new(),
            lowercase: false,
            max_words: 0,
            no_digits_start: false,
            split_camel_case: false,
            split_conjunctions: false,
            max_keywords: usize::MAX,
            new_first: false,
        }
    }

    pub fn with_depluralize(mut self, enabled: bool) -> Self {
        self.depluralize = enabled;
        self
    }

    pub fn with_max_keywords(mut self, max: usize) -> Self {
        self.max_keywords = max;
        self
    }

    fn stopword_set(&self) -> HashSet<String> {
        if !self.stopword_filter {
            return HashSet::new();
        }
        self.stopwords.iter().map(|s| s.trim().to_lowercase()).collect()
    }
}

/// Final keyword list for a file
pub fn correct(raw: &[String], existing: &[String], rules: &KeywordRules) -> Vec<String> {
    let stopwords = rules.stopword_set();

    let mut generated = Vec::new();
    for keyword in raw {
        for candidate in normalize::clean(keyword, rules.split_camel_case, rules.split_conjunctions)
        {
            if let Some(kept) = filter(candidate, &stopwords, rules) {
                generated.push(kept);
            }
        }
    }

    let existing = existing
        .iter()
        .map(|k| k.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|k| !k.is_empty());

    let merged: Vec<String> = if rules.new_first {
        generated.into_iter().chain(existing).collect()
    } else {
        existing.chain(generated).collect()
    };

    let mut seen = HashSet::new();
    merged
        .into_iter()
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(rules.max_keywords)
        .collect()
}

fn filter(candidate: String, stopwords: &HashSet<String>, rules: &KeywordRules) -> Option<String> {
    let keyword = if rules.lowercase {
        candidate.to_lowercase()
    } else {
        candidate
    };
    let singular = rules
        .depluralize
        .then(|| depluralize(&keyword, rules.min_length));

    let lowered = keyword.to_lowercase();
    if stopwords.contains(&lowered)
        || singular
            .as_ref()
            .is_some_and(|s| stopwords.contains(&s.to_lowercase()))
    {
        return None;
    }

    let length = keyword.chars().count();
    if length < rules.min_length || length > rules.max_length {
        return None;
    }

    if rules.max_words > 0 {
        let allowance = rules.max_words + usize::from(normalize::is_conjunction_phrase(&lowered));
        if normalize::word_count(&keyword) > allowance {
            return None;
        }
    }
    if rules.no_digits_start && normalize::starts_with_digits(&keyword) {
        return None;
    }
    if rules.latin_only && !normalize::is_latin(&keyword) {
        return None;
    }

    Some(singular.unwrap_or(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_depluralize_is_rule_based() {
        let rules = KeywordRules::default().with_depluralize(true);
        let result = correct(&strings(&["cats", "boxes", "data"]), &[], &rules);
        assert_eq!(result, strings(&["cat", "box", "data"]));
    }

    #[test]
    fn test_dedupe_prefers_first_seen() {
        let rules = KeywordRules::default().with_depluralize(false);
        let result = correct(&strings(&["Cat", "cat", "CAT", "dog"]), &[], &rules);
        assert_eq!(result, strings(&["cat", "dog"]));

        let rules = KeywordRules {
            lowercase: false,
            ..KeywordRules::default()
        };
        let result = correct(&strings(&["Cats", "cat"]), &[], &rules);
        assert_eq!(result, strings(&["Cat"]));
    }

    #[test]
    fn test_stopwords_and_bounds() {
        let rules = KeywordRules::default();
        let result = correct(
            &strings(&["unknown", "Photography", "x", "a very long keyword phrase", "sky"]),
            &[],
            &rules,
        );
        assert_eq!(result, strings(&["sky"]));
    }

    #[test]
    fn test_stopword_matched_after_depluralizing() {
        let rules = KeywordRules {
            stopwords: strings(&["object"]),
            ..KeywordRules::default()
        };
        assert!(correct(&strings(&["objects"]), &[], &rules).is_empty());
    }

    #[test]
    fn test_latin_and_digits() {
        let rules = KeywordRules::default();
        let result = correct(&strings(&["猫咪", "café", "2024 calendar", "35mm"]), &[], &rules);
        assert_eq!(result, strings(&["café", "35mm"]));

        let rules = KeywordRules {
            latin_only: false,
            ..KeywordRules::default()
        };
        assert_eq!(correct(&strings(&["猫咪"]), &[], &rules), strings(&["猫咪"]));
    }

    #[test]
    fn test_merge_order_and_truncate() {
        let existing = strings(&["Holiday", "beach"]);
        let raw = strings(&["sand", "Beach", "sea"]);

        let rules = KeywordRules::default();
        assert_eq!(
            correct(&raw, &existing, &rules),
            strings(&["Holiday", "beach", "sand", "sea"])
        );

        let rules = KeywordRules {
            new_first: true,
            ..KeywordRules::default()
        };
        assert_eq!(
            correct(&raw, &existing, &rules),
            strings(&["sand", "beach", "sea", "Holiday"])
        );

        let rules = KeywordRules::default().with_max_keywords(3);
        assert_eq!(
            correct(&raw, &existing, &rules),
            strings(&["Holiday", "beach", "sand"])
        );
    }

    #[test]
    fn test_conjunctions_and_camel_case() {
        let rules = KeywordRules::default();
        let result = correct(
            &strings(&["cats and dogs", "black and white", "BlueSky"]),
            &[],
            &rules,
        );
        assert_eq!(result, strings(&["cat", "dog", "black and white", "blue sky"]));
    }

    #[test]
    fn test_never_fails_on_garbage() {
        let rules = KeywordRules::default();
        assert!(correct(&strings(&["", "   ", "!!", "--"]), &[], &rules).is_empty());
    }

    #[test]
    fn test_correct_is_idempotent() {
        let raw = strings(&[
            "Cats",
            "golden retrievers",
            "BlueSky",
            "cats and dogs",
            "black and white",
            "city-streets",
            "boxes",
            "glasses",
            "berries",
            "bikes",
            "Objects",
            "café terraces",
            "well-known landmark",
            "  snow_covered peaks ",
            "data",
            "news",
            "microServiceBus",
            "redApple",
            "seasideHolidayHomes",
            "BlueSkyDays",
        ]);
        for rules in [
            KeywordRules::default(),
            KeywordRules {
                lowercase: false,
                ..KeywordRules::default()
            },
            KeywordRules {
                min_length: 4,
                ..KeywordRules::default()
            },
            KeywordRules::permissive(),
        ] {
            let once = correct(&raw, &[], &rules);
            let twice = correct(&once, &[], &rules);
            assert_eq!(once, twice, "rules: {rules:?}");
        }
    }

    #[test]
    fn test_repeated_camel_case_keeps_display_case_stable() {
        let rules = KeywordRules {
            lowercase: false,
            ..KeywordRules::default()
        };
        let once = correct(&strings(&["microServiceBus", "redApple", "BlueSky"]), &[], &rules);
        // three parts exceed the word limit on the first pass already
        assert_eq!(once, strings(&["redApple", "Blue Sky"]));
        assert_eq!(correct(&once, &[], &rules), once);
    }
}
