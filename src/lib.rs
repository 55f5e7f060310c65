//! Link cleaning core for CleanShare.
//!
//! Turns a shared link into its minimal, privacy-stripped form:
//! 1. Redirect unwrapping (l.facebook.com, t.co, google.com/url, ...)
//! 2. Tracking parameter stripping (utm_*, fbclid, gclid, ...)
//! 3. Site shortening (Amazon `/dp/<id>`, YouTube `?v=<id>`, social posts)
//! 4. Fragment removal
//!
//! Input that does not parse as an absolute URL is returned unchanged.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod redirect;
pub mod site_rules;
pub mod text_scan;
pub mod tracking_params;

#[cfg(feature = "python")]
mod python;

use once_cell::sync::Lazy;

pub use config::{CleanerConfig, RedirectRuleConfig};
pub use error::ConfigError;
pub use pipeline::{CleanReport, Cleaner, CleanerBuilder, DEFAULT_MAX_REDIRECT_HOPS};
pub use redirect::{RedirectRule, RedirectUnwrapper};
pub use site_rules::{HostMatch, PathCondition, SiteCanonicalizer, SiteRule, SiteTransform};
pub use text_scan::TextReport;
pub use tracking_params::{TrackerPattern, TrackerPatternSet};

static DEFAULT_CLEANER: Lazy<Cleaner> = Lazy::new(Cleaner::default);

/// The built-in cleaner, constructed on first use and shared read-only.
pub fn default_cleaner() -> &'static Cleaner {
    &DEFAULT_CLEANER
}

/// Clean a URL with the built-in rules.
pub fn clean(raw: &str) -> String {
    DEFAULT_CLEANER.clean(raw)
}

/// Clean every link inside free text with the built-in rules.
pub fn clean_text(text: &str) -> TextReport {
    DEFAULT_CLEANER.clean_text(text)
}

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// CleanShare core — native link cleaner.
#[cfg(feature = "python")]
#[pymodule]
fn cleanshare_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(python::clean_url, m)?)?;
    m.add_function(wrap_pyfunction!(python::clean_text, m)?)?;
    m.add_function(wrap_pyfunction!(python::is_tracking_param, m)?)?;
    m.add_function(wrap_pyfunction!(python::unwrap_redirect, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cleaner_shared() {
        assert!(std::ptr::eq(default_cleaner(), default_cleaner()));
        assert_eq!(
            clean("https://www.youtube.com/watch?v=abc123&list=xyz&utm_source=foo"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_concurrent_use() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    clean(&format!("https://example.com/{i}?utm_source=x&id={i}"))
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(
                handle.join().unwrap(),
                format!("https://example.com/{i}?id={i}")
            );
        }
    }

    #[test]
    fn test_clean_text_free_function() {
        let report = clean_text("https://example.com/?fbclid=1");
        assert_eq!(report.output, "https://example.com/");
    }
}
