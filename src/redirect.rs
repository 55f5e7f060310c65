//! Redirect unwrapping.
//!
//! Link shims (l.facebook.com, t.co, google.com/url, etc.) carry the real
//! destination in one of their own query parameters. Only hosts on an
//! explicit allowlist are trusted, so an ordinary link that happens to
//! carry `url=` is left alone.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ConfigError;

static SHIM_HOSTS: &[&str] = &[
    "l.facebook.com",
    "lm.facebook.com",
    "facebook.com",
    "l.instagram.com",
    "t.co",
    "outgoing.prod.mozaws.net",
];

static SHIM_PARAMS: &[&str] = &[
    "url", "u", "redirect", "dest", "destination", "data", "target", "r", "rd",
];

// Only the `/url` click-through; `/search?q=` is an ordinary search
static GOOGLE_HOSTS: &[&str] = &["www.google.com", "google.com"];
static GOOGLE_PATHS: &[&str] = &["/url"];
static GOOGLE_PARAMS: &[&str] = &["url", "q"];

static GOOGLE_NEWS_HOSTS: &[&str] = &["news.google.com"];
static GOOGLE_NEWS_PARAMS: &[&str] = &["url", "u"];

/// A set of redirector hosts and the parameters, in priority order, that
/// may hold the embedded destination. A rule with `paths` only applies to
/// those exact paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    hosts: Vec<String>,
    paths: Vec<String>,
    params: Vec<String>,
}

impl RedirectRule {
    /// Hosts and parameter names are matched case-insensitively.
    pub fn new<H, P>(hosts: H, params: P) -> Result<Self, ConfigError>
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .collect();
        let params: Vec<String> = params
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .collect();

        if hosts.is_empty() || hosts.iter().any(|h| h.is_empty()) {
            return Err(ConfigError::InvalidRedirectRule(
                "hosts must be a non-empty list of host names".to_string(),
            ));
        }
        if params.is_empty() || params.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::InvalidRedirectRule(format!(
                "params for {} must be a non-empty list of names",
                hosts.join(", ")
            )));
        }
        Ok(Self {
            hosts,
            paths: Vec::new(),
            params,
        })
    }

    /// Restrict the rule to these exact paths (e.g. `/url`).
    pub fn with_paths<I>(mut self, paths: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref().trim();
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidRedirectRule(format!(
                    "path {path:?} for {} must start with `/`",
                    self.hosts.join(", ")
                )));
            }
            self.paths.push(path.to_string());
        }
        Ok(self)
    }

    fn from_static(hosts: &[&str], paths: &[&str], params: &[&str]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// `host` must already be lowercased.
    pub fn covers(&self, host: &str, path: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
            && (self.paths.is_empty() || self.paths.iter().any(|p| p == path))
    }
}

/// Ordered list of redirect rules; the first rule covering a URL wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUnwrapper {
    rules: Vec<RedirectRule>,
}

impl RedirectUnwrapper {
    pub fn new(rules: Vec<RedirectRule>) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            RedirectRule::from_static(SHIM_HOSTS, &[], SHIM_PARAMS),
            RedirectRule::from_static(GOOGLE_HOSTS, GOOGLE_PATHS, GOOGLE_PARAMS),
            RedirectRule::from_static(GOOGLE_NEWS_HOSTS, &[], GOOGLE_NEWS_PARAMS),
        ])
    }

    pub fn push(&mut self, rule: RedirectRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn rule_for(&self, url: &Url) -> Option<&RedirectRule> {
        let host = url.host_str()?.to_ascii_lowercase();
        self.rules.iter().find(|r| r.covers(&host, url.path()))
    }

    /// Extract the destination embedded in a redirector URL.
    ///
    /// Returns the serialized absolute `http`/`https` target, or `None` when
    /// the host is not a known redirector or no candidate parameter holds a
    /// usable URL.
    pub fn try_unwrap(&self, url: &Url) -> Option<String> {
        let rule = self.rule_for(url)?;

        for param in &rule.params {
            // First occurrence only, duplicates are ignored
            let value = url
                .query_pairs()
                .find(|(key, _)| key.to_lowercase() == *param)
                .map(|(_, value)| value);

            if let Some(value) = value {
                if let Some(target) = decode_target(&value) {
                    return Some(target);
                }
            }
        }
        None
    }
}

impl Default for RedirectUnwrapper {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Decode-then-validate: accept the value as-is, or after one more
/// percent-decoding pass for double-encoded shims.
fn decode_target(value: &str) -> Option<String> {
    let candidate = value.trim();
    if let Some(target) = parse_http_url(candidate) {
        return Some(target);
    }

    let decoded = percent_decode_str(candidate).decode_utf8().ok()?;
    parse_http_url(decoded.trim())
}

fn parse_http_url(candidate: &str) -> Option<String> {
    let parsed = Url::parse(candidate).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed.into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwrap(raw: &str) -> Option<String> {
        RedirectUnwrapper::builtin().try_unwrap(&Url::parse(raw).unwrap())
    }

    #[test]
    fn test_facebook_shim() {
        assert_eq!(
            unwrap("https://l.facebook.com/l.php?u=https%3A%2F%2Fexample.com%2Fpage%3Futm_source%3Dx&h=AT0"),
            Some("https://example.com/page?utm_source=x".to_string())
        );
    }

    #[test]
    fn test_google_url_redirect() {
        assert_eq!(
            unwrap("https://www.google.com/url?sa=t&q=https://example.org/a&ved=2ah"),
            Some("https://example.org/a".to_string())
        );
    }

    #[test]
    fn test_google_news_redirect() {
        assert_eq!(
            unwrap("https://news.google.com/rss/articles?url=https%3A%2F%2Fexample.com%2Fstory&oc=5"),
            Some("https://example.com/story".to_string())
        );
    }

    #[test]
    fn test_double_encoded_target() {
        assert_eq!(
            unwrap("https://t.co/abc?url=https%253A%252F%252Fexample.com%252Fx"),
            Some("https://example.com/x".to_string())
        );
    }

    #[test]
    fn test_unknown_host_not_unwrapped() {
        assert_eq!(unwrap("https://example.com/share?url=https://other.com/"), None);
    }

    #[test]
    fn test_skips_non_url_candidates() {
        // `u` is not a URL, `redirect` is; priority order continues past it
        assert_eq!(
            unwrap("https://l.instagram.com/?u=hello&redirect=http%3A%2F%2Fexample.net%2F"),
            Some("http://example.net/".to_string())
        );
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert_eq!(unwrap("https://t.co/?url=javascript:alert(1)"), None);
        assert_eq!(unwrap("https://t.co/?url=ftp://files.example.com/"), None);
        assert_eq!(unwrap("https://t.co/?url=/relative/path"), None);
    }

    #[test]
    fn test_param_priority() {
        assert_eq!(
            unwrap("https://t.co/?u=https://second.example/&url=https://first.example/"),
            Some("https://first.example/".to_string())
        );
    }

    #[test]
    fn test_custom_rule() {
        let mut unwrapper = RedirectUnwrapper::new(Vec::new());
        unwrapper.push(RedirectRule::new(["Out.Example.NET"], ["to"]).unwrap());
        let url = Url::parse("https://out.example.net/go?to=https%3A%2F%2Fdest.example%2F").unwrap();
        assert_eq!(
            unwrapper.try_unwrap(&url),
            Some("https://dest.example/".to_string())
        );
    }

    #[test]
    fn test_google_search_not_a_redirector() {
        assert_eq!(unwrap("https://www.google.com/search?q=https%3A%2F%2Fexample.com%2Fa"), None);
        assert_eq!(unwrap("https://google.com/?q=https://example.com/"), None);
    }

    #[test]
    fn test_path_restricted_rule() {
        let rule = RedirectRule::new(["go.example"], ["to"])
            .unwrap()
            .with_paths(["/out"])
            .unwrap();
        let unwrapper = RedirectUnwrapper::new(vec![rule]);

        let out = Url::parse("https://go.example/out?to=https://dest.example/").unwrap();
        let other = Url::parse("https://go.example/share?to=https://dest.example/").unwrap();
        assert_eq!(unwrapper.try_unwrap(&out), Some("https://dest.example/".to_string()));
        assert_eq!(unwrapper.try_unwrap(&other), None);

        assert!(RedirectRule::new(["go.example"], ["to"])
            .unwrap()
            .with_paths(["out"])
            .is_err());
    }

    #[test]
    fn test_rule_validation() {
        assert!(RedirectRule::new(Vec::<String>::new(), ["u"]).is_err());
        assert!(RedirectRule::new(["t.co"], Vec::<String>::new()).is_err());
        assert!(RedirectRule::new([""], ["u"]).is_err());
    }
}
