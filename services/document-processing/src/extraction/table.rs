//! Column splitting for tables recovered from extracted text.

use regex::Regex;
use std::sync::LazyLock;

static CELL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}|\t").expect("cell separator regex"));

/// Split a line on runs of two or more spaces or tabs.
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_SEPARATOR
        .split(line.trim())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive "line mentions any of these words"
pub fn contains_any(line: &str, needles: &[&str]) -> bool {
    let lower = line.to_lowercase();
    needles.iter().any(|needle| lower.contains(needle))
}

/// Lines of a table body following a header line.
///
/// Yields at most `max_lines` lines after `header_index`, stopping at the
/// first line that contains one of `stop_words`.
pub fn body_lines<'a>(
    lines: &'a [&'a str],
    header_index: usize,
    max_lines: usize,
    stop_words: &'a [&'a str],
) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    lines
        .iter()
        .enumerate()
        .skip(header_index + 1)
        .take(max_lines)
        .map(|(index, line)| (index, line.trim()))
        .take_while(move |(_, line)| !contains_any(line, stop_words))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_cells() {
        assert_eq!(
            split_cells("Appearance   White powder   Conforms"),
            vec!["Appearance", "White powder", "Conforms"]
        );
        assert_eq!(split_cells("pH\t5.0-8.0\t6.2"), vec!["pH", "5.0-8.0", "6.2"]);
        assert_eq!(split_cells("single spaced line"), vec!["single spaced line"]);
        assert!(split_cells("   ").is_empty());
    }

    #[test]
    fn test_body_lines_stop_and_limit() {
        let lines = vec!["header", "a", "b", "Conclusion: pass", "c"];
        let body: Vec<&str> = body_lines(&lines, 0, 20, &["conclusion"])
            .map(|(_, line)| line)
            .collect();
        assert_eq!(body, vec!["a", "b"]);

        let body: Vec<&str> = body_lines(&lines, 0, 1, &[]).map(|(_, line)| line).collect();
        assert_eq!(body, vec!["a"]);
    }

    proptest! {
        #[test]
        fn split_cells_yields_trimmed_non_empty_cells(line in "[ a-zA-Z0-9\t.%-]{0,80}") {
            for cell in split_cells(&line) {
                prop_assert!(!cell.is_empty());
                prop_assert_eq!(cell.trim(), cell.as_str());
                prop_assert!(!cell.contains('\t'));
                prop_assert!(!cell.contains("  "));
            }
        }
    }
}
