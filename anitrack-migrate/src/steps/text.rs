//! Text sanitisation helpers used by the population steps.
//!
//! Display names and externally sourced titles are reduced to a canonical
//! lowercase underscore-separated key so the same series compares equal
//! regardless of punctuation or separator style.

use regex_lite::Regex;

/// Characters replaced with the separator by [`strip_text`].
const STRIP_CHARS: &str = " `~!@#$%^&*()-=+|[{]};:',<.>/?\\\n\t\"";

/// Characters replaced with the separator by [`sanitise_text_common`].
const COMMON_REPLACE: &str = " -|;";

/// Characters removed outright by [`sanitise_text_common`].
const COMMON_REMOVE: &str = "'`~!@#$%^&*()=+[{]}:,<.>/?\\";

fn substitute(text: &str, targets: &str, replacement: Option<char>) -> String {
    text.chars()
        .filter_map(|c| {
            if targets.contains(c) {
                replacement
            } else {
                Some(c)
            }
        })
        .collect()
}

/// Collapse runs of `sep` into one and trim it from both ends.
fn collapse_runs(text: &str, sep: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_sep = false;
    for c in text.chars() {
        if c == sep {
            if !last_was_sep {
                out.push(c);
            }
            last_was_sep = true;
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    out.trim_matches(sep).to_string()
}

/// Lowercase `text` and replace punctuation and whitespace with `_`.
pub fn strip_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    collapse_runs(&substitute(&lowered, STRIP_CHARS, Some('_')), '_')
}

/// Reduce `text` to its canonical comparison key.
///
/// Separator-like characters become `_`, decorative punctuation is removed,
/// and excess separators are collapsed.
pub fn sanitise_text_common(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let replaced = substitute(&text.to_lowercase(), COMMON_REPLACE, Some('_'));
    let replaced = collapse_runs(&replaced, '_');
    let removed = substitute(&replaced, COMMON_REMOVE, None);
    collapse_runs(&removed, '_')
}

/// Drop `season_N` / `part_N` qualifiers from an already-stripped title.
///
/// Metadata sources title each season separately; the qualifier would
/// otherwise prevent matching against the base series key.
pub fn strip_numbered_qualifiers(text: &str) -> String {
    let re = Regex::new(r"(season|part)_[0-9]+").unwrap();
    let replaced = re.replace_all(text, "_");
    collapse_runs(&replaced, '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_text_basic() {
        assert_eq!(strip_text("Hello World!"), "hello_world");
        assert_eq!(strip_text("  Attack on Titan  "), "attack_on_titan");
    }

    #[test]
    fn test_sanitise_common_separators() {
        assert_eq!(sanitise_text_common("Attack on Titan"), "attack_on_titan");
        assert_eq!(sanitise_text_common("Steins;Gate"), "steins_gate");
        assert_eq!(sanitise_text_common("K-On!"), "k_on");
    }

    #[test]
    fn test_sanitise_common_removes_punctuation() {
        assert_eq!(sanitise_text_common("Dr. STONE"), "dr_stone");
        assert_eq!(sanitise_text_common("Re:Zero"), "rezero");
    }

    #[test]
    fn test_sanitise_common_collapses_excess() {
        assert_eq!(sanitise_text_common("a  --  b"), "a_b");
        assert_eq!(sanitise_text_common(""), "");
    }

    #[test]
    fn test_strip_numbered_qualifiers() {
        assert_eq!(
            strip_numbered_qualifiers("my_hero_academia_season_2"),
            "my_hero_academia"
        );
        assert_eq!(
            strip_numbered_qualifiers("shingeki_no_kyojin_part_3"),
            "shingeki_no_kyojin"
        );
        assert_eq!(strip_numbered_qualifiers("one_piece"), "one_piece");
    }
}
