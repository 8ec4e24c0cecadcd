//! Engine configuration (spec §4.5 "Configuration", ambient stack A.3).
//!
//! Mirrors the teacher's `Config` pattern (`core/src/lib.rs` in
//! `rano-oss-libchinese`): a plain serde-derived struct with a `Default`
//! impl carrying the spec-literal defaults, plus `toml`-backed
//! load/save helpers so a host application can persist tuned settings
//! alongside the rest of its configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MagicError;

/// Tunable parameters for one [`crate::engine::MagicEngine::analyze`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum recipe length to explore (spec §4.5, §6 "depth: int>=0").
    /// `0` is a valid, if degenerate, configuration: only the root is
    /// considered (spec §8 boundary behavior).
    pub depth: usize,
    /// Whether to also try operations/encodings flagged `extensive_only`
    /// or gated behind `intensive` (spec §2 item 4, §4.3, §4.4).
    pub intensive: bool,
    /// Whether encoding detection also tries the extended codepage set
    /// (Windows-1250/1253, ISO-8859-5/15, KOI8-R) rather than just the
    /// common ones (spec §4.3).
    pub extensive_language_support: bool,
    /// Optional caller-supplied regex defining `matches_target` (spec §3,
    /// §4.2). `None` disables target matching entirely.
    pub crib_regex: Option<String>,
    /// Hard cap on total nodes visited in one `analyze` call (spec §4.5
    /// termination conditions).
    pub max_nodes: usize,
    /// How many ranked nodes to retain per depth level during the search,
    /// and how many candidates the final report keeps (spec §4.5, §4.6).
    pub keep_top_k: usize,
}

/// Spec-literal defaults (spec §4.5).
pub const DEFAULT_DEPTH: usize = 3;
pub const DEFAULT_INTENSIVE: bool = false;
pub const DEFAULT_EXTENSIVE_LANGUAGE_SUPPORT: bool = false;
pub const DEFAULT_MAX_NODES: usize = 10_000;
pub const DEFAULT_KEEP_TOP_K: usize = 200;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            intensive: DEFAULT_INTENSIVE,
            extensive_language_support: DEFAULT_EXTENSIVE_LANGUAGE_SUPPORT,
            crib_regex: None,
            max_nodes: DEFAULT_MAX_NODES,
            keep_top_k: DEFAULT_KEEP_TOP_K,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot act on before any search
    /// work starts (spec §7: configuration errors are fatal, raised before
    /// expansion begins). `depth = 0` is deliberately accepted — spec §8
    /// requires it to degrade to a root-only result, not an error.
    pub fn validate(&self) -> Result<(), MagicError> {
        if let Some(pattern) = &self.crib_regex {
            if let Err(source) = regex::Regex::new(pattern) {
                return Err(MagicError::InvalidCribRegex(source));
            }
        }
        Ok(())
    }

    /// Load a config from a TOML file, falling back to field defaults for
    /// anything the file omits (`#[serde(default)]` above).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, MagicError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|source| MagicError::ConfigIo { path: path.as_ref().display().to_string(), source })?;
        toml::from_str(&text).map_err(|source| MagicError::ConfigParse { source })
    }

    /// Serialize this config as TOML and write it to `path`.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), MagicError> {
        let text = toml::to_string_pretty(self).map_err(|source| MagicError::ConfigSerialize { source })?;
        std::fs::write(path.as_ref(), text)
            .map_err(|source| MagicError::ConfigIo { path: path.as_ref().display().to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.depth, 3);
        assert!(!cfg.intensive);
        assert!(!cfg.extensive_language_support);
        assert_eq!(cfg.crib_regex, None);
        assert_eq!(cfg.max_nodes, 10_000);
        assert_eq!(cfg.keep_top_k, 200);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_depth_is_a_valid_configuration() {
        let cfg = EngineConfig { depth: 0, ..EngineConfig::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_crib_regex_is_rejected() {
        let cfg = EngineConfig { crib_regex: Some("(unclosed".to_string()), ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(MagicError::InvalidCribRegex(_))));
    }

    #[test]
    fn round_trips_through_toml_text() {
        let cfg = EngineConfig { depth: 5, intensive: true, ..EngineConfig::default() };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: EngineConfig = toml::from_str("depth = 7\n").unwrap();
        assert_eq!(parsed.depth, 7);
        assert_eq!(parsed.max_nodes, DEFAULT_MAX_NODES);
    }
}
