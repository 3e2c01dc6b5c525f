//! Syntactic repair of almost-JSON model output

/// Text between the first code fence and the next one (or the end, when
/// the closing fence was cut off)
pub fn strip_fences(raw: &str) -> &str {
    let Some(start) = raw.find("```") else {
        return raw;
    };
    let after = &raw[start + 3..];
    // skip the info string ("json", "JSON", ...)
    let body = match after.find('\n') {
        Some(nl) if after[..nl].chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') => {
            &after[nl + 1..]
        }
        _ => after,
    };
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

/// From the first `{` (or `[` when no object is present) to its matching
/// close, or to the end of the text when it never closes
pub fn extract_block(text: &str) -> Option<&str> {
    let start = text.find('{').or_else(|| text.find('['))?;
    let body = &text[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&body[..=idx]);
                }
            }
            _ => {}
        }
    }
    Some(body)
}

/// Rewrite common breakage into parseable JSON
///
/// Handles typographic quotes, trailing commas, raw newlines and stray
/// quotes inside strings, unterminated strings and unclosed brackets.
pub fn repair_json(text: &str) -> String {
    let chars: Vec<char> = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            c => c,
        })
        .collect();

    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    escaped = true;
                }
                '"' => {
                    let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                    if matches!(next, None | Some(',' | ':' | '}' | ']')) {
                        in_string = false;
                        out.push('"');
                    } else {
                        out.push_str("\\\"");
                    }
                }
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => {}
                c => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
            }
            '}' | ']' => {
                let opener = if c == '}' { '{' } else { '[' };
                if stack.last() == Some(&opener) {
                    trim_dangling(&mut out);
                    stack.pop();
                    out.push(c);
                }
            }
            c => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(opener) = stack.pop() {
        trim_dangling(&mut out);
        if out.ends_with(':') {
            out.push_str("null");
        }
        out.push(if opener == '{' { '}' } else { ']' });
    }
    out
}

fn trim_dangling(out: &mut String) {
    loop {
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        if out.ends_with(',') {
            out.pop();
        } else {
            break;
        }
    }
}
