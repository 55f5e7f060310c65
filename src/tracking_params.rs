//! Tracking parameter classification.
//!
//! Decides whether a query key carries attribution/analytics data
//! (utm_*, fbclid, gclid, etc.) rather than identifying the resource.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A single case-insensitive key pattern.
///
/// The textual form accepted by [`FromStr`] is `name` (exact),
/// `prefix*` or `*suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl TrackerPattern {
    pub fn exact(name: &str) -> Self {
        TrackerPattern::Exact(name.to_lowercase())
    }

    pub fn prefix(prefix: &str) -> Self {
        TrackerPattern::Prefix(prefix.to_lowercase())
    }

    pub fn suffix(suffix: &str) -> Self {
        TrackerPattern::Suffix(suffix.to_lowercase())
    }

    /// `key` must already be lowercased.
    fn matches_lower(&self, key: &str) -> bool {
        match self {
            TrackerPattern::Exact(name) => key == name,
            TrackerPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            TrackerPattern::Suffix(suffix) => key.ends_with(suffix.as_str()),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.matches_lower(&key.to_lowercase())
    }
}

impl FromStr for TrackerPattern {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let invalid = || ConfigError::InvalidPattern(raw.to_string());

        if let Some(prefix) = raw.strip_suffix('*') {
            if prefix.is_empty() || prefix.contains('*') {
                return Err(invalid());
            }
            return Ok(TrackerPattern::prefix(prefix));
        }
        if let Some(suffix) = raw.strip_prefix('*') {
            if suffix.is_empty() || suffix.contains('*') {
                return Err(invalid());
            }
            return Ok(TrackerPattern::suffix(suffix));
        }
        if raw.is_empty() || raw.contains('*') {
            return Err(invalid());
        }
        Ok(TrackerPattern::exact(raw))
    }
}

impl fmt::Display for TrackerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerPattern::Exact(name) => f.write_str(name),
            TrackerPattern::Prefix(prefix) => write!(f, "{prefix}*"),
            TrackerPattern::Suffix(suffix) => write!(f, "*{suffix}"),
        }
    }
}

// ── Built-in list ───────────────────────────────────────────────────

/// Bumped whenever entries are added to the built-in lists below.
pub const BUILTIN_VERSION: u32 = 2;

static TRACKING_QUERY_PREFIXES: &[&str] = &[
    "utm_", "mc_", "_hs", "_ga", "_gid", "_gat", "affiliate",
    "piwik_", "amp_", "fb_action_", "_openstat",
];

static TRACKING_QUERY_KEYS: &[&str] = &[
    // ad click identifiers
    "fbclid", "gclid", "icid", "msclkid", "yclid", "dclid",
    "gbraid", "wbraid", "adid", "affid", "aff_id",
    // referral / campaign markers
    "ref", "ref_src", "spm", "igshid", "mkt_tok", "promo", "cid",
    "bltgh", "sr_share", "sr_p", "s_campaign", "s_kwcid", "cm_mmc",
    "cmpid", "campaign", "campaignid", "source", "src",
    // analytics suites
    "pk_campaign", "pk_kwd", "pk_source", "pk_medium",
    "ga_campaign", "ga_source", "ga_medium",
    "amp", "fb_action_ids", "fb_action_types",
    "action_object_map", "action_type_map",
    "trk", "trkcampaign",
];

/// Ordered, versioned set of tracker patterns.
///
/// Read-only once built; share it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerPatternSet {
    version: u32,
    patterns: Vec<TrackerPattern>,
}

impl TrackerPatternSet {
    pub fn new(patterns: Vec<TrackerPattern>) -> Self {
        Self {
            version: 1,
            patterns,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The default pattern list.
    pub fn builtin() -> Self {
        let patterns = TRACKING_QUERY_PREFIXES
            .iter()
            .map(|p| TrackerPattern::prefix(p))
            .chain(TRACKING_QUERY_KEYS.iter().map(|k| TrackerPattern::exact(k)))
            .collect();
        Self {
            version: BUILTIN_VERSION,
            patterns,
        }
    }

    /// Append patterns after the existing ones and bump the version.
    pub fn extend<I>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = TrackerPattern>,
    {
        let before = self.patterns.len();
        self.patterns.extend(patterns);
        if self.patterns.len() != before {
            self.version += 1;
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn patterns(&self) -> &[TrackerPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `key` is a tracking parameter. Case-insensitive.
    pub fn is_tracker(&self, key: &str) -> bool {
        let lk = key.to_lowercase();
        self.patterns.iter().any(|p| p.matches_lower(&lk))
    }
}

impl Default for TrackerPatternSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_prefix() {
        let set = TrackerPatternSet::builtin();
        assert!(set.is_tracker("utm_source"));
        assert!(set.is_tracker("UTM_Campaign"));
        assert!(!set.is_tracker("utm"));
    }

    #[test]
    fn test_exact_keys() {
        let set = TrackerPatternSet::builtin();
        assert!(set.is_tracker("fbclid"));
        assert!(set.is_tracker("GCLID"));
        assert!(set.is_tracker("aff_id"));
        assert!(!set.is_tracker("fbclid2"));
        assert!(!set.is_tracker("referrer_policy"));
    }

    #[test]
    fn test_resource_keys_kept() {
        let set = TrackerPatternSet::builtin();
        for key in ["id", "page", "v", "q", "t", "list", "keywords"] {
            assert!(!set.is_tracker(key), "{key} should not be a tracker");
        }
    }

    #[test]
    fn test_parse_pattern_forms() {
        assert_eq!(
            "utm_*".parse::<TrackerPattern>().unwrap(),
            TrackerPattern::Prefix("utm_".into())
        );
        assert_eq!(
            "*_TRK".parse::<TrackerPattern>().unwrap(),
            TrackerPattern::Suffix("_trk".into())
        );
        assert_eq!(
            "oly_enc_id".parse::<TrackerPattern>().unwrap(),
            TrackerPattern::Exact("oly_enc_id".into())
        );
    }

    #[test]
    fn test_parse_pattern_rejects_wildcards_only() {
        for bad in ["", "*", "**", "a*b", "*a*"] {
            assert!(bad.parse::<TrackerPattern>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_suffix_match() {
        let p = TrackerPattern::suffix("_trk");
        assert!(p.matches("Newsletter_TRK"));
        assert!(!p.matches("trk_newsletter"));
    }

    #[test]
    fn test_extend_keeps_existing_semantics() {
        let mut set = TrackerPatternSet::builtin();
        let version = set.version();
        set.extend(vec![TrackerPattern::exact("oly_anon_id")]);

        assert_eq!(set.version(), version + 1);
        assert!(set.is_tracker("oly_anon_id"));
        assert!(set.is_tracker("utm_medium"));
        assert!(!set.is_tracker("page"));

        set.extend(Vec::new());
        assert_eq!(set.version(), version + 1);
    }

    #[test]
    fn test_non_ascii_pattern_folds_like_keys() {
        let p: TrackerPattern = "Ü*".parse().unwrap();
        assert!(p.matches("über_id"));
        assert!(p.matches("ÜBER_ID"));

        let set = TrackerPatternSet::new(vec!["ÉTIQUETTE".parse().unwrap()]);
        assert!(set.is_tracker("étiquette"));
        assert!(set.is_tracker("Étiquette"));
    }

    #[test]
    fn test_display_roundtrips_textual_form() {
        for raw in ["utm_*", "*_trk", "fbclid"] {
            let p: TrackerPattern = raw.parse().unwrap();
            assert_eq!(p.to_string(), raw);
        }
    }
}
