//! TOML rule overrides.
//!
//! ```toml
//! max_redirect_hops = 16
//! extra_trackers = ["ref_*", "*_trk", "oly_enc_id"]
//! disable_builtin_trackers = false
//!
//! [[redirects]]
//! hosts = ["out.example.net"]
//! paths = ["/go"]
//! params = ["to"]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::{Cleaner, DEFAULT_MAX_REDIRECT_HOPS};
use crate::redirect::{RedirectRule, RedirectUnwrapper};
use crate::site_rules::SiteCanonicalizer;
use crate::tracking_params::{TrackerPattern, TrackerPatternSet};

/// Extra redirector hosts and the parameters holding their destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRuleConfig {
    pub hosts: Vec<String>,
    /// Exact paths the rule is limited to; empty means any path.
    #[serde(default)]
    pub paths: Vec<String>,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanerConfig {
    /// Lower bound on redirect unwraps per URL; long inputs get a higher
    /// cap. Must be at least 1.
    pub max_redirect_hops: usize,
    /// Appended after the built-in tracker list.
    pub extra_trackers: Vec<String>,
    /// Use only `extra_trackers`.
    pub disable_builtin_trackers: bool,
    /// Checked before the built-in redirectors, so they can override them.
    pub redirects: Vec<RedirectRuleConfig>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            max_redirect_hops: DEFAULT_MAX_REDIRECT_HOPS,
            extra_trackers: Vec::new(),
            disable_builtin_trackers: false,
            redirects: Vec::new(),
        }
    }
}

impl CleanerConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml_str(&data)?;
        tracing::info!("loaded cleaner config from {}", path.display());
        Ok(cfg)
    }

    pub fn tracker_patterns(&self) -> Result<TrackerPatternSet, ConfigError> {
        let extra = self
            .extra_trackers
            .iter()
            .map(|raw| raw.parse::<TrackerPattern>())
            .collect::<Result<Vec<_>, _>>()?;

        if self.disable_builtin_trackers {
            return Ok(TrackerPatternSet::new(extra));
        }
        let mut set = TrackerPatternSet::builtin();
        set.extend(extra);
        Ok(set)
    }

    pub fn redirect_unwrapper(&self) -> Result<RedirectUnwrapper, ConfigError> {
        let mut rules = self
            .redirects
            .iter()
            .map(|r| RedirectRule::new(&r.hosts, &r.params)?.with_paths(&r.paths))
            .collect::<Result<Vec<_>, _>>()?;
        rules.extend(RedirectUnwrapper::builtin().rules().iter().cloned());
        Ok(RedirectUnwrapper::new(rules))
    }
}

impl Cleaner {
    pub fn from_config(cfg: &CleanerConfig) -> Result<Cleaner, ConfigError> {
        if cfg.max_redirect_hops == 0 {
            return Err(ConfigError::InvalidHopLimit);
        }
        Ok(Cleaner::builder()
            .trackers(cfg.tracker_patterns()?)
            .redirects(cfg.redirect_unwrapper()?)
            .sites(SiteCanonicalizer::builtin())
            .max_redirect_hops(cfg.max_redirect_hops)
            .build())
    }
}
