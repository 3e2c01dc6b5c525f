//! Caption text cleanup

/// Make model prose safe to store as a description
///
/// Newlines become spaces, typographic quotes become plain ones, doubled
/// backslashes are dropped and anything after the last full stop is cut
/// (a sentence the model did not finish). Returns `None` for blank text.
pub fn clean_caption(raw: &str) -> Option<String> {
    let normalized: String = raw
        .replace("\\\\", "")
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect();

    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '"' || c.is_whitespace());

    let finished = match trimmed.rfind('.') {
        Some(idx) => &trimmed[..=idx],
        None => trimmed,
    };

    let finished = finished.trim();
    (!finished.is_empty()).then(|| finished.to_string())
}
