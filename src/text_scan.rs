//! Free-text link cleaning.
//!
//! Cleans every `http(s)://` link inside arbitrary text (a selection, a
//! chat message) and leaves everything else byte-identical.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::Cleaner;

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhttps?://[^\s<>"'`]+"#).unwrap());

/// Outcome of [`Cleaner::clean_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReport {
    pub output: String,
    pub urls_found: usize,
    pub urls_modified: usize,
    pub params_removed: usize,
}

impl Cleaner {
    /// Clean all links found in `text`.
    pub fn clean_text(&self, text: &str) -> TextReport {
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut urls_found = 0;
        let mut urls_modified = 0;
        let mut params_removed = 0;

        for m in LINK_PATTERN.find_iter(text) {
            let link = trim_link_end(m.as_str());
            let end = m.start() + link.len();

            let report = self.clean_with_report(link);
            urls_found += 1;
            params_removed += report.params_removed;
            if report.changed {
                urls_modified += 1;
            }

            output.push_str(&text[last..m.start()]);
            output.push_str(&report.output);
            last = end;
        }
        output.push_str(&text[last..]);

        tracing::debug!(urls_found, urls_modified, "cleaned links in text");
        TextReport {
            output,
            urls_found,
            urls_modified,
            params_removed,
        }
    }
}

/// Drop sentence punctuation and unbalanced closing brackets that the
/// greedy pattern swallowed from the surrounding prose.
fn trim_link_end(candidate: &str) -> &str {
    let mut link = candidate;
    while let Some(last) = link.chars().last() {
        let trailing = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => link.matches(')').count() > link.matches('(').count(),
            ']' => link.matches(']').count() > link.matches('[').count(),
            _ => false,
        };
        if !trailing {
            break;
        }
        link = &link[..link.len() - last.len_utf8()];
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleans_links_in_prose() {
        let report = Cleaner::default().clean_text(
            "Read https://example.com/a?utm_source=x&id=1. Also (https://youtu.be/abc?si=1) ok",
        );
        assert_eq!(
            report.output,
            "Read https://example.com/a?id=1. Also (https://youtu.be/abc) ok"
        );
        assert_eq!(report.urls_found, 2);
        assert_eq!(report.urls_modified, 2);
        assert_eq!(report.params_removed, 1);
    }

    #[test]
    fn test_text_without_links() {
        let report = Cleaner::default().clean_text("nothing to see here, move along");
        assert_eq!(report.output, "nothing to see here, move along");
        assert_eq!(report.urls_found, 0);
    }

    #[test]
    fn test_clean_links_counted_but_not_modified() {
        let report = Cleaner::default()
            .clean_text("see https://example.com/ and https://example.com/x?gclid=1\nthanks");
        assert_eq!(
            report.output,
            "see https://example.com/ and https://example.com/x\nthanks"
        );
        assert_eq!(report.urls_found, 2);
        assert_eq!(report.urls_modified, 1);
    }

    #[test]
    fn test_balanced_parens_kept() {
        let report = Cleaner::default()
            .clean_text("https://en.wikipedia.org/wiki/Rust_(programming_language)?utm_medium=x!");
        assert_eq!(
            report.output,
            "https://en.wikipedia.org/wiki/Rust_(programming_language)!"
        );
    }

    #[test]
    fn test_trim_link_end() {
        assert_eq!(trim_link_end("https://a.example/x)."), "https://a.example/x");
        assert_eq!(trim_link_end("https://a.example/(x)"), "https://a.example/(x)");
        assert_eq!(trim_link_end("https://a.example/?"), "https://a.example/");
        assert_eq!(trim_link_end("https://a.example/x]"), "https://a.example/x");
    }
}
