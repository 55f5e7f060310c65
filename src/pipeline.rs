//! Cleaning pipeline: unwrap redirects, strip trackers, shorten per site.
//!
//! raw text → parse → unwrap (bounded) → strip tracking params →
//! site rule → drop fragment → serialize. Unparsable input comes back
//! byte-for-byte unchanged.

use std::collections::HashSet;

use url::{form_urlencoded, Url};

use crate::redirect::RedirectUnwrapper;
use crate::site_rules::SiteCanonicalizer;
use crate::tracking_params::TrackerPatternSet;

/// Minimum cap on unwrap hops, on top of the visited-URL guard. The cap
/// actually used grows with the input length.
pub const DEFAULT_MAX_REDIRECT_HOPS: usize = 16;

/// What a single [`Cleaner::clean_with_report`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub output: String,
    /// `output` differs from the input text.
    pub changed: bool,
    pub redirect_hops: usize,
    pub params_removed: usize,
    pub site_rule: Option<&'static str>,
    /// Unwrapping stopped on a revisited URL or on the hop cap.
    pub hop_limit_reached: bool,
}

impl CleanReport {
    fn unchanged(raw: &str) -> Self {
        Self {
            output: raw.to_string(),
            changed: false,
            redirect_hops: 0,
            params_removed: 0,
            site_rule: None,
            hop_limit_reached: false,
        }
    }
}

/// Immutable rule tables plus the transform that applies them.
///
/// Build once and share by reference; cleaning takes `&self` and keeps no
/// state between calls.
#[derive(Debug, Clone)]
pub struct Cleaner {
    trackers: TrackerPatternSet,
    redirects: RedirectUnwrapper,
    sites: SiteCanonicalizer,
    max_redirect_hops: usize,
}

impl Cleaner {
    pub fn new(
        trackers: TrackerPatternSet,
        redirects: RedirectUnwrapper,
        sites: SiteCanonicalizer,
    ) -> Self {
        Self {
            trackers,
            redirects,
            sites,
            max_redirect_hops: DEFAULT_MAX_REDIRECT_HOPS,
        }
    }

    pub fn builder() -> CleanerBuilder {
        CleanerBuilder::default()
    }

    pub fn trackers(&self) -> &TrackerPatternSet {
        &self.trackers
    }

    pub fn redirects(&self) -> &RedirectUnwrapper {
        &self.redirects
    }

    pub fn sites(&self) -> &SiteCanonicalizer {
        &self.sites
    }

    pub fn max_redirect_hops(&self) -> usize {
        self.max_redirect_hops
    }

    pub fn is_tracker(&self, key: &str) -> bool {
        self.trackers.is_tracker(key)
    }

    /// One unwrap step on raw text, without any further cleaning.
    pub fn unwrap_redirect(&self, raw: &str) -> Option<String> {
        let url = Url::parse(raw).ok()?;
        self.redirects.try_unwrap(&url)
    }

    /// Clean a URL. Never fails: unparsable input is returned as-is.
    pub fn clean(&self, raw: &str) -> String {
        self.clean_with_report(raw).output
    }

    pub fn clean_with_report(&self, raw: &str) -> CleanReport {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!(error = %err, "input is not an absolute URL, leaving as-is");
                return CleanReport::unchanged(raw);
            }
        };

        self.clean_parsed(raw, url, self.hop_limit_for(raw))
    }

    /// Each unwrap target is carried inside its parent's query, so no
    /// chain is deeper than the input is long.
    fn hop_limit_for(&self, raw: &str) -> usize {
        if self.max_redirect_hops == 0 {
            return 0;
        }
        self.max_redirect_hops.max(raw.len())
    }

    fn clean_parsed(&self, raw: &str, url: Url, hop_limit: usize) -> CleanReport {
        let (mut url, redirect_hops, hop_limit_reached) = self.resolve_redirects(url, hop_limit);

        // A still-wrapped URL keeps its query: the destination lives there
        let (params_removed, site_rule) = if hop_limit_reached {
            (0, None)
        } else {
            let removed = strip_tracking_params(&mut url, &self.trackers);
            (removed, self.sites.apply(&mut url))
        };
        url.set_fragment(None);
        let output = serialize(url);

        CleanReport {
            changed: output != raw,
            output,
            redirect_hops,
            params_removed,
            site_rule,
            hop_limit_reached,
        }
    }

    /// Follow redirector links to the innermost destination.
    ///
    /// Stops on the first URL that is not a redirector, on a URL already
    /// seen in this chain, or after `hop_limit` unwraps. In the last two
    /// cases the current (still wrapped) URL is returned.
    fn resolve_redirects(&self, mut url: Url, hop_limit: usize) -> (Url, usize, bool) {
        let mut visited: HashSet<String> = HashSet::new();
        let mut hops = 0;

        loop {
            if !visited.insert(url.as_str().to_owned()) {
                tracing::warn!(url = %url, "redirect cycle detected, stopping unwrap");
                return (url, hops, true);
            }

            let Some(target) = self.redirects.try_unwrap(&url) else {
                return (url, hops, false);
            };

            if hops >= hop_limit {
                tracing::warn!(
                    url = %url,
                    max = hop_limit,
                    "redirect hop limit reached, stopping unwrap"
                );
                return (url, hops, true);
            }

            match Url::parse(&target) {
                Ok(next) => {
                    tracing::debug!(from = %url, to = %next, "unwrapped redirect");
                    url = next;
                    hops += 1;
                }
                Err(_) => return (url, hops, false),
            }
        }
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(
            TrackerPatternSet::builtin(),
            RedirectUnwrapper::builtin(),
            SiteCanonicalizer::builtin(),
        )
    }
}

/// Substitute individual rule tables; anything unset uses the built-ins.
#[derive(Debug, Default)]
pub struct CleanerBuilder {
    trackers: Option<TrackerPatternSet>,
    redirects: Option<RedirectUnwrapper>,
    sites: Option<SiteCanonicalizer>,
    max_redirect_hops: Option<usize>,
}

impl CleanerBuilder {
    pub fn trackers(mut self, trackers: TrackerPatternSet) -> Self {
        self.trackers = Some(trackers);
        self
    }

    pub fn redirects(mut self, redirects: RedirectUnwrapper) -> Self {
        self.redirects = Some(redirects);
        self
    }

    pub fn sites(mut self, sites: SiteCanonicalizer) -> Self {
        self.sites = Some(sites);
        self
    }

    /// Lower bound on the unwrap cap; zero disables unwrapping.
    pub fn max_redirect_hops(mut self, hops: usize) -> Self {
        self.max_redirect_hops = Some(hops);
        self
    }

    pub fn build(self) -> Cleaner {
        Cleaner {
            trackers: self.trackers.unwrap_or_default(),
            redirects: self.redirects.unwrap_or_default(),
            sites: self.sites.unwrap_or_default(),
            max_redirect_hops: self.max_redirect_hops.unwrap_or(DEFAULT_MAX_REDIRECT_HOPS),
        }
    }
}

/// Drop tracking keys from the query, keeping every other segment
/// byte-for-byte and in order. Returns how many were removed.
fn strip_tracking_params(url: &mut Url, trackers: &TrackerPatternSet) -> usize {
    let Some(query) = url.query() else {
        return 0;
    };

    let mut removed = 0;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let key = segment_key(segment);
            if trackers.is_tracker(&key) {
                tracing::trace!(key = %key, "removed tracking param");
                removed += 1;
                false
            } else {
                true
            }
        })
        .collect();
    let rebuilt = kept.join("&");

    if rebuilt.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&rebuilt));
    }
    removed
}

/// Decoded key of one `key=value` query segment.
fn segment_key(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

fn serialize(mut url: Url) -> String {
    // No dangling `?`
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.into()
}
