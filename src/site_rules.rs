//! Site-specific shortening.
//!
//! Rewrites a URL on a known site down to its minimal resource-identifying
//! form: Amazon product pages to `/dp/<id>`, YouTube to `?v=<id>`, social
//! posts without their query, etc.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static AMAZON_PRODUCT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/dp/[^/?#]+|/gp/product/[^/?#]+").unwrap());

static FIRST_PATH_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[^/]*").unwrap());

static STATUS_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/status/").unwrap());
static VIDEO_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/video/").unwrap());
static POSTS_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/posts/").unwrap());
static COMMENTS_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/comments/").unwrap());

/// Which hosts a rule applies to. Hosts are compared lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatch {
    /// Host contains the substring (`amazon.` matches `www.amazon.co.uk`).
    Contains(&'static str),
    Exact(&'static str),
    /// The domain itself or any subdomain of it.
    Domain(&'static str),
}

impl HostMatch {
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostMatch::Contains(needle) => host.contains(needle),
            HostMatch::Exact(name) => host == *name,
            HostMatch::Domain(domain) => {
                host == *domain
                    || host
                        .strip_suffix(domain)
                        .is_some_and(|rest| rest.ends_with('.'))
            }
        }
    }
}

/// Extra condition a URL must meet before the rule fires.
#[derive(Debug, Clone)]
pub enum PathCondition {
    Always,
    /// Path must match; the first match is what `KeepMatchedPath` keeps.
    PathMatches(Regex),
    /// Query must carry a non-empty value for this key.
    HasQueryParam(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteTransform {
    /// Truncate the path to the matched segment and clear the query.
    KeepMatchedPath,
    StripQuery,
    /// Clear the query except for `param`, optionally resetting the path.
    KeepOnlyParam {
        param: &'static str,
        path: Option<&'static str>,
    },
}

#[derive(Debug, Clone)]
pub struct SiteRule {
    pub name: &'static str,
    pub host: HostMatch,
    pub condition: PathCondition,
    pub transform: SiteTransform,
}

impl SiteRule {
    pub fn new(
        name: &'static str,
        host: HostMatch,
        condition: PathCondition,
        transform: SiteTransform,
    ) -> Self {
        Self {
            name,
            host,
            condition,
            transform,
        }
    }

    /// `Some(matched path)` when the condition holds. The matched path is
    /// empty unless the condition is a path pattern.
    fn check(&self, url: &Url) -> Option<String> {
        match &self.condition {
            PathCondition::Always => Some(String::new()),
            PathCondition::PathMatches(re) => re.find(url.path()).map(|m| m.as_str().to_string()),
            PathCondition::HasQueryParam(key) => first_param(url, key).map(|_| String::new()),
        }
    }

    fn rewrite(&self, url: &mut Url, matched: &str) {
        match &self.transform {
            SiteTransform::KeepMatchedPath => {
                if !matched.is_empty() {
                    url.set_path(matched);
                }
                url.set_query(None);
            }
            SiteTransform::StripQuery => url.set_query(None),
            SiteTransform::KeepOnlyParam { param, path } => {
                let kept = first_param(url, param);
                if let Some(path) = path {
                    url.set_path(path);
                }
                url.set_query(None);
                if let Some(value) = kept {
                    url.query_pairs_mut().append_pair(param, &value);
                }
            }
        }
    }
}

fn first_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Ordered site rules. The first rule whose host predicate matches owns
/// the host; if its condition does not hold nothing is rewritten.
#[derive(Debug, Clone)]
pub struct SiteCanonicalizer {
    rules: Vec<SiteRule>,
}

impl SiteCanonicalizer {
    pub fn new(rules: Vec<SiteRule>) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Self {
        use HostMatch::*;
        use PathCondition::*;
        use SiteTransform::*;

        Self::new(vec![
            SiteRule::new(
                "amazon",
                Contains("amazon."),
                PathMatches(AMAZON_PRODUCT_PATH.clone()),
                KeepMatchedPath,
            ),
            SiteRule::new(
                "youtube",
                Contains("youtube.com"),
                HasQueryParam("v"),
                KeepOnlyParam {
                    param: "v",
                    path: Some("/watch"),
                },
            ),
            SiteRule::new(
                "youtu.be",
                Exact("youtu.be"),
                PathMatches(FIRST_PATH_SEGMENT.clone()),
                KeepMatchedPath,
            ),
            SiteRule::new("twitter", Contains("twitter.com"), PathMatches(STATUS_PATH.clone()), StripQuery),
            SiteRule::new("x", Domain("x.com"), PathMatches(STATUS_PATH.clone()), StripQuery),
            SiteRule::new("tiktok", Contains("tiktok.com"), PathMatches(VIDEO_PATH.clone()), StripQuery),
            SiteRule::new("facebook", Contains("facebook.com"), Always, StripQuery),
            SiteRule::new("linkedin", Contains("linkedin.com"), PathMatches(POSTS_PATH.clone()), StripQuery),
            SiteRule::new("reddit", Contains("reddit.com"), PathMatches(COMMENTS_PATH.clone()), StripQuery),
        ])
    }

    pub fn rules(&self) -> &[SiteRule] {
        &self.rules
    }

    /// Rewrite `url` in place; returns the name of the rule that fired.
    pub fn apply(&self, url: &mut Url) -> Option<&'static str> {
        let host = url.host_str()?.to_ascii_lowercase();
        let rule = self.rules.iter().find(|r| r.host.matches(&host))?;
        let matched = rule.check(url)?;

        rule.rewrite(url, &matched);
        tracing::debug!(rule = rule.name, url = %url, "applied site rule");
        Some(rule.name)
    }

    pub fn canonicalize(&self, mut url: Url) -> Url {
        self.apply(&mut url);
        url
    }
}

impl Default for SiteCanonicalizer {
    fn default() -> Self {
        Self::builtin()
    }
}
