//! Pattern-based salvage for output that is not JSON at all

use super::Fields;
use regex::Regex;
use std::sync::LazyLock;

static LIST_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)["']?\b(?:keywords|tags)\b["']?\s*[:=]\s*\[(.*?)(?:\]|$)"#)
        .expect("static pattern")
});

static QUOTED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\n]+)"|'([^'\n]+)'"#).expect("static pattern")
});

static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*#>]*(?:keywords|tags)[ \t*]*:[ \t*]*(\S.*)$").expect("static pattern")
});

static LIST_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t*#>]*(?:keywords|tags)[ \t*]*:?[ \t*]*$").expect("static pattern")
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").expect("static pattern")
});

static CAPTION_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)["']?\b(?:description|caption)\b["']?\s*[:=]\s*"((?:[^"\\]|\\.)*)"?"#)
        .expect("static pattern")
});

static CAPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*#>]*(?:description|caption)[ \t*]*:[ \t*]*(\S.*)$")
        .expect("static pattern")
});

/// Look for a keyword list and a caption anywhere in the text
pub fn salvage(text: &str) -> Option<Fields> {
    let keywords = keyword_list(text);
    let caption = caption(text);

    if keywords.is_empty() && caption.is_none() {
        return None;
    }
    Some(Fields {
        keywords: Some(keywords),
        caption,
    })
}

fn keyword_list(text: &str) -> Vec<String> {
    if let Some(caps) = LIST_FIELD.captures(text) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        let quoted: Vec<String> = QUOTED_ITEM
            .captures_iter(body)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !quoted.is_empty() {
            return quoted;
        }
        let split = split_items(body);
        if !split.is_empty() {
            return split;
        }
    }

    if let Some(caps) = LIST_LINE.captures(text) {
        let split = split_items(caps.get(1).map_or("", |m| m.as_str()));
        if !split.is_empty() {
            return split;
        }
    }

    bullets_after_header(text)
}

fn bullets_after_header(text: &str) -> Vec<String> {
    let mut lines = text.lines().skip_while(|line| !LIST_HEADER.is_match(line));
    if lines.next().is_none() {
        return Vec::new();
    }

    lines
        .skip_while(|line| line.trim().is_empty())
        .map_while(|line| BULLET.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_decoration(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn caption(text: &str) -> Option<String> {
    let raw = CAPTION_FIELD
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace("\\\"", "\"").replace("\\n", " "))
        .or_else(|| {
            CAPTION_LINE
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim_matches(['"', '*', '`']).to_string())
        })?;

    let caption = raw.trim();
    (!caption.is_empty()).then(|| caption.to_string())
}

fn split_items(body: &str) -> Vec<String> {
    body.split([',', ';'])
        .map(strip_decoration)
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_decoration(item: &str) -> String {
    item.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '[' | ']' | '.'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_lines() {
        let text = "Keywords: cat, dog, garden\nDescription: A cat and a dog in a garden.";
        let fields = salvage(text).unwrap();
        assert_eq!(
            fields.keywords.unwrap(),
            vec!["cat".to_string(), "dog".into(), "garden".into()]
        );
        assert_eq!(fields.caption.as_deref(), Some("A cat and a dog in a garden."));
    }

    #[test]
    fn test_markdown_bullets() {
        let text = "**Keywords:**\n\n- sunset\n- beach\n* palm tree\n\nThat's all.";
        let fields = salvage(text).unwrap();
        assert_eq!(
            fields.keywords.unwrap(),
            vec!["sunset".to_string(), "beach".into(), "palm tree".into()]
        );
        assert_eq!(fields.caption, None);
    }

    #[test]
    fn test_broken_json_fragments() {
        let text = r#"keywords = ['red car', 'street'] and caption = "A red car parked"#;
        let fields = salvage(text).unwrap();
        assert_eq!(
            fields.keywords.unwrap(),
            vec!["red car".to_string(), "street".into()]
        );
        assert_eq!(fields.caption.as_deref(), Some("A red car parked"));
    }

    #[test]
    fn test_prose_without_patterns() {
        assert!(salvage("not json at all").is_none());
        assert!(salvage("I cannot help with that request.").is_none());
    }
}
