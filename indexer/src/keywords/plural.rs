//! English plural stripping

/// Singular form of a single lower-case word
///
/// Only regular English plurals are handled. Words of three letters or
/// fewer, and words ending in `ss`, `us` or `is`, come back unchanged.
pub fn singular(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || !word.is_ascii() {
        return word.to_string();
    }

    if len > 4 && let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

/// Depluralize the last word of a keyword
///
/// The result never drops below `min_length` characters; if it would, the
/// keyword is returned as is.
pub fn depluralize(keyword: &str, min_length: usize) -> String {
    let (head, last) = match keyword.rfind(' ') {
        Some(idx) => (&keyword[..=idx], &keyword[idx + 1..]),
        None => ("", keyword),
    };

    let lowered = last.to_lowercase();
    let single = singular(&lowered);
    if single == lowered {
        return keyword.to_string();
    }

    // keep the caller's casing for the characters that remain
    let kept: String = last.chars().take(single.chars().count()).collect();
    let replacement = if kept.to_lowercase() == single {
        kept
    } else {
        single
    };

    let result = format!("{}{}", head, replacement);
    if result.chars().count() < min_length.max(2) {
        return keyword.to_string();
    }
    result
}
