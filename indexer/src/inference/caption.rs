//! Combining a generated caption with an existing description

use crate::core::CaptionPolicy;

const OPEN: &str = "<generated>";
const CLOSE: &str = "</generated>";

/// Description to write, or `None` to leave the field untouched
pub fn compose(existing: Option<&str>, generated: Option<&str>, policy: CaptionPolicy) -> Option<String> {
    let generated = generated.map(str::trim).filter(|g| !g.is_empty())?;
    let existing = existing.map(str::trim).filter(|e| !e.is_empty());

    match policy {
        CaptionPolicy::Disabled => None,
        CaptionPolicy::Replace => Some(generated.to_string()),
        CaptionPolicy::KeepExisting => match existing {
            Some(_) => None,
            None => Some(generated.to_string()),
        },
        CaptionPolicy::Append => {
            let base = existing.map(strip_generated).unwrap_or_default();
            if base.is_empty() {
                Some(format!("{}{}{}", OPEN, generated, CLOSE))
            } else {
                Some(format!("{} {}{}{}", base, OPEN, generated, CLOSE))
            }
        }
    }
}

/// Whether the policy wants a caption generated for this file at all
pub fn wanted(existing: Option<&str>, policy: CaptionPolicy) -> bool {
    match policy {
        CaptionPolicy::Disabled => false,
        CaptionPolicy::KeepExisting => existing.is_none_or(|e| e.trim().is_empty()),
        CaptionPolicy::Replace | CaptionPolicy::Append => true,
    }
}

/// Description with any earlier generated block removed
fn strip_generated(text: &str) -> String {
    match (text.find(OPEN), text.rfind(CLOSE)) {
        (Some(start), Some(end)) if end > start => {
            let mut out = String::from(text[..start].trim_end());
            let rest = text[end + CLOSE.len()..].trim_start();
            if !rest.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(rest);
            }
            out
        }
        (Some(start), None) => text[..start].trim_end().to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_disabled() {
        assert_eq!(
            compose(Some("Old."), Some("New."), CaptionPolicy::Replace).as_deref(),
            Some("New.")
        );
        assert_eq!(compose(Some("Old."), Some("New."), CaptionPolicy::Disabled), None);
        // nothing generated leaves the description alone
        assert_eq!(compose(Some("Old."), Some("  "), CaptionPolicy::Replace), None);
    }

    #[test]
    fn test_keep_existing() {
        assert_eq!(compose(Some("Mine."), Some("New."), CaptionPolicy::KeepExisting), None);
        assert_eq!(
            compose(Some(" "), Some("New."), CaptionPolicy::KeepExisting).as_deref(),
            Some("New.")
        );
        assert!(!wanted(Some("Mine."), CaptionPolicy::KeepExisting));
        assert!(wanted(None, CaptionPolicy::KeepExisting));
        assert!(!wanted(None, CaptionPolicy::Disabled));
    }

    #[test]
    fn test_append_replaces_previous_block() {
        let first = compose(Some("Family trip."), Some("A beach."), CaptionPolicy::Append).unwrap();
        assert_eq!(first, "Family trip. <generated>A beach.</generated>");

        let second = compose(Some(&first), Some("A sandy beach."), CaptionPolicy::Append).unwrap();
        assert_eq!(second, "Family trip. <generated>A sandy beach.</generated>");

        let alone = compose(None, Some("A beach."), CaptionPolicy::Append).unwrap();
        assert_eq!(alone, "<generated>A beach.</generated>");
        assert_eq!(
            compose(Some(&alone), Some("A dune."), CaptionPolicy::Append).as_deref(),
            Some("<generated>A dune.</generated>")
        );
    }
}
