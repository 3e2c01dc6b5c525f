//! Per-keyword normalization and filters

/// `X and Y` phrases that stay a single keyword
pub const CONJUNCTION_PHRASES: &[&str] = &[
    "black and white",
    "salt and pepper",
    "rock and roll",
    "bread and butter",
    "fish and chips",
    "arts and crafts",
    "hide and seek",
    "trick or treat",
    "sweet and sour",
    "cheese and crackers",
];

/// Split a word before every upper-case letter that sits after the fourth
/// character of the current part
///
/// The split repeats on the tail, so no part of the result can be split again.
pub fn split_camel_case(word: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut rest: Vec<char> = word.chars().collect();
    while let Some(i) = (4..rest.len()).find(|&i| rest[i].is_uppercase()) {
        let tail = rest.split_off(i);
        parts.push(rest.into_iter().collect());
        rest = tail;
    }
    parts.push(rest.into_iter().collect());
    parts.join(" ")
}

/// Clean one raw keyword into zero, one or two candidate keywords
///
/// Strips punctuation (inner hyphens survive), turns `_` into spaces,
/// collapses whitespace and hyphen runs, optionally splits camel case and
/// `X and Y` phrases.
pub fn clean(raw: &str, camel_case: bool, conjunctions: bool) -> Vec<String> {
    let spaced: String = raw
        .chars()
        .map(|c| match c {
            '_' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect();

    let mut words: Vec<String> = Vec::new();
    for token in spaced.split(' ') {
        let token: String = token
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect();
        let token = collapse_hyphens(&token);
        if token.is_empty() {
            continue;
        }
        if camel_case {
            words.extend(split_camel_case(&token).split(' ').map(str::to_string));
        } else {
            words.push(token);
        }
    }

    if words.is_empty() {
        return Vec::new();
    }

    if conjunctions && words.len() == 3 && is_conjunction(&words[1]) {
        let phrase = words.join(" ").to_lowercase();
        if !CONJUNCTION_PHRASES.contains(&phrase.as_str()) {
            return vec![words[0].clone(), words[2].clone()];
        }
    }

    vec![words.join(" ")]
}

fn collapse_hyphens(token: &str) -> String {
    token
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn is_conjunction(word: &str) -> bool {
    word.eq_ignore_ascii_case("and") || word.eq_ignore_ascii_case("or")
}

/// Word count with hyphenated parts counted separately
pub fn word_count(keyword: &str) -> usize {
    keyword
        .split([' ', '-'])
        .filter(|w| !w.is_empty())
        .count()
}

/// True for `X and Y` / `X or Y` shaped keywords
pub fn is_conjunction_phrase(keyword: &str) -> bool {
    let words: Vec<&str> = keyword.split(' ').collect();
    words.len() == 3 && is_conjunction(words[1])
}

/// Three or more leading ASCII digits
pub fn starts_with_digits(keyword: &str) -> bool {
    keyword.chars().take(3).filter(char::is_ascii_digit).count() == 3
}

/// Latin script check: ASCII plus the Latin-1, Extended-A/B and Extended
/// Additional letter blocks
pub fn is_latin(keyword: &str) -> bool {
    keyword.chars().all(|c| {
        c.is_ascii()
            || (('\u{00C0}'..='\u{024F}').contains(&c) && c != '\u{00D7}' && c != '\u{00F7}')
            || ('\u{1E00}'..='\u{1EFF}').contains(&c)
    })
}
