//! Cleanup of rendered address text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static SPACE_BEFORE_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n").expect("valid regex"));

static REPEATED_SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"  +").expect("valid regex"));

static EMPTY_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*,").expect("valid regex"));

/// Segment that may legitimately repeat within a line ("New York, New York").
const REPEATABLE_SEGMENT: &str = "new york";

/// Clean rendered address text.
///
/// Collapses whitespace, strips dangling commas and hyphens from each line,
/// drops empty and repeated lines, and drops comma-separated segments already
/// seen earlier on the same line. The pass is repeated until the text is
/// stable, so `clean(clean(x)) == clean(x)`.
///
/// # Example
///
/// ```rust
/// use address_formatter::cleaner::clean;
///
/// let cleaned = clean("  , Main St  \n\n Paris, Paris, France -\nParis, France");
/// assert_eq!(cleaned, "Main St\nParis, France");
/// ```
pub fn clean(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = SPACE_BEFORE_NEWLINE_RE.replace_all(text, "\n");
    let text = REPEATED_SPACES_RE.replace_all(&text, " ");
    let text = EMPTY_SEGMENT_RE.replace_all(&text, ",");

    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let line = strip_separators(line);
        if line.is_empty() {
            continue;
        }
        let line = dedupe_segments(line);
        if !lines.contains(&line) {
            lines.push(line);
        }
    }

    lines.join("\n").trim().to_string()
}

/// Trim the line and repeatedly strip a leading or trailing `,` or `-`.
fn strip_separators(line: &str) -> &str {
    let mut line = line.trim();
    loop {
        let stripped = line
            .strip_prefix([',', '-'])
            .or_else(|| line.strip_suffix([',', '-']));
        match stripped {
            Some(rest) => line = rest.trim(),
            None => return line,
        }
    }
}

/// Drop comma-separated segments already seen on this line, compared
/// trimmed and lowercased.
fn dedupe_segments(line: &str) -> String {
    let mut seen = HashSet::new();
    let kept: Vec<&str> = line
        .split(',')
        .filter(|segment| {
            let key = segment.trim().to_lowercase();
            key == REPEATABLE_SEGMENT || seen.insert(key)
        })
        .collect();
    kept.join(",").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(clean("Main St   12  \n  Paris"), "Main St 12\nParis");
    }

    #[test]
    fn test_strips_dangling_separators() {
        assert_eq!(clean(", - Main St ,\n- Paris -"), "Main St\nParis");
        assert_eq!(clean(" , \n-\n,,"), "");
    }

    #[test]
    fn test_drops_empty_and_duplicate_lines() {
        assert_eq!(clean("Paris\n\n\nParis\nFrance\n"), "Paris\nFrance");
    }

    #[test]
    fn test_duplicate_lines_are_case_sensitive() {
        assert_eq!(clean("Paris\nPARIS"), "Paris\nPARIS");
    }

    #[test]
    fn test_dedupes_segments_within_line() {
        assert_eq!(clean("Berlin, Mitte, berlin"), "Berlin, Mitte");
        assert_eq!(clean("Berlin\nMitte, Berlin"), "Berlin\nMitte, Berlin");
    }

    #[test]
    fn test_new_york_may_repeat() {
        assert_eq!(clean("New York, New York, NY"), "New York, New York, NY");
    }

    #[test]
    fn test_collapses_empty_segments() {
        assert_eq!(clean("Main St, , Springfield"), "Main St, Springfield");
    }

    #[test]
    fn test_lines_identical_after_dedupe_are_merged() {
        assert_eq!(clean("Paris, Paris\nParis"), "Paris");
    }

    fn address_text() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                Just("Paris".to_string()),
                Just("paris".to_string()),
                Just("New York".to_string()),
                Just(",".to_string()),
                Just(" ".to_string()),
                Just("  ".to_string()),
                Just("-".to_string()),
                Just("\n".to_string()),
                Just("\t".to_string()),
                "[A-Za-z0-9]{1,6}",
            ],
            0..40,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(text in address_text()) {
            let once = clean(&text);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn prop_clean_is_idempotent_on_any_text(text in ".{0,80}") {
            let once = clean(&text);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn prop_no_empty_or_separator_lines(text in address_text()) {
            for line in clean(&text).lines() {
                let stripped = line.trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace());
                prop_assert!(!stripped.is_empty(), "line {:?} is empty or a separator", line);
            }
        }

        #[test]
        fn prop_no_duplicate_lines(text in address_text()) {
            let cleaned = clean(&text);
            let lines: Vec<&str> = cleaned.lines().collect();
            let unique: HashSet<&str> = lines.iter().copied().collect();
            prop_assert_eq!(lines.len(), unique.len());
        }

        #[test]
        fn prop_no_duplicate_segments(text in address_text()) {
            for line in clean(&text).lines() {
                let mut seen = HashSet::new();
                for segment in line.split(',') {
                    let key = segment.trim().to_lowercase();
                    prop_assert!(key == "new york" || seen.insert(key), "repeated segment in {:?}", line);
                }
            }
        }
    }
}
