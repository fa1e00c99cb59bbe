//! Label/value and CAS patterns shared by the per-document extractors.

use chemdocs_utils::cas_checksum_valid;
use regex::Regex;
use std::sync::LazyLock;

static CAS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2,7})-(\d{2})-(\d)\b").expect("CAS token regex"));

/// A following `Label:` on the same line, after a run of two or more spaces
static NEXT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\s{2,}|\t)[^\s:：][^:：]{0,30}[:：]").expect("next label regex")
});

/// Matches any of a set of labels followed by a separator and captures the
/// rest of the line.
#[derive(Debug)]
pub struct LabelPattern {
    regex: Regex,
}

impl LabelPattern {
    /// Labels must be followed by `:`, `：` or `-`.
    pub fn new(labels: &[&str]) -> Self {
        Self::build(labels, r"[ \t]*[:：\-][ \t]*")
    }

    /// Labels that are also laid out as two-column tables without a separator.
    pub fn loose(labels: &[&str]) -> Self {
        Self::build(labels, r"[ \t]*[:：\-]?[ \t]*")
    }

    fn build(labels: &[&str], separator: &str) -> Self {
        let mut labels: Vec<&str> = labels.to_vec();
        // Longest first so "Storage Conditions" wins over "Storage"
        labels.sort_by_key(|label| std::cmp::Reverse(label.chars().count()));
        let alternation = labels
            .iter()
            .map(|label| regex::escape(label).replace(' ', r"[ \t]*"))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(r"(?i)(?:^|[^A-Za-z])(?:{}){}([^\n]*)", alternation, separator);
        Self {
            regex: Regex::new(&pattern).expect("label patterns are escaped literals"),
        }
    }

    /// First non-empty value for any of the labels
    pub fn find(&self, text: &str) -> Option<String> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|value| clean_value(value.as_str()))
            .find(|value| !value.is_empty())
    }
}

/// Cut a captured value at the next same-line label and trim it.
pub fn clean_value(raw: &str) -> String {
    let value = match NEXT_LABEL.find(raw) {
        Some(next) => &raw[..next.start()],
        None => raw,
    };
    value
        .trim()
        .trim_start_matches([':', '：', '-'])
        .trim()
        .to_string()
}

/// CAS number match in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasMatch {
    pub cas_number: String,
    pub position: usize,
    pub context: String,
    pub checksum_valid: bool,
}

/// Every CAS-shaped token in the text, with 50 characters of context.
pub fn find_cas_numbers(text: &str) -> Vec<CasMatch> {
    CAS_TOKEN
        .find_iter(text)
        .map(|found| {
            let start = found.start();
            let context_start = floor_char_boundary(text, start.saturating_sub(50));
            let context_end = ceil_char_boundary(text, (found.end() + 50).min(text.len()));

            CasMatch {
                cas_number: found.as_str().to_string(),
                position: start,
                context: text[context_start..context_end].to_string(),
                checksum_valid: cas_checksum_valid(found.as_str()),
            }
        })
        .collect()
}

/// First CAS-shaped token in a labelled value
pub fn cas_in(value: &str) -> Option<String> {
    CAS_TOKEN.find(value).map(|found| found.as_str().to_string())
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
