//! Error types for the Magic Analyzer core.
//!
//! `analyze()` only ever returns `Err` for configuration problems (spec §7):
//! a crib regex that fails to compile. `depth = 0` is a valid configuration
//! (spec §8: only the root is considered), not an error. Everything else —
//! a host operation throwing, the node budget running out, cancellation — is
//! non-fatal and is folded into flags on `AnalysisReport` instead.

use thiserror::Error;

/// Fatal configuration failure. Returned by `analyze()` before any
/// expansion happens.
#[derive(Debug, Error)]
pub enum MagicError {
    #[error("crib regex failed to compile: {0}")]
    InvalidCribRegex(#[source] regex::Error),

    #[error("signature catalogue failed to compile: {0}")]
    CatalogueCompile(#[source] regex::Error),

    #[error("could not read config file {path}: {source}")]
    ConfigIo { path: String, #[source] source: std::io::Error },

    #[error("could not parse config as TOML: {source}")]
    ConfigParse { #[source] source: toml::de::Error },

    #[error("could not serialize config as TOML: {source}")]
    ConfigSerialize { #[source] source: toml::ser::Error },
}

/// Opaque error returned by a host-provided operation invocation.
///
/// The engine never inspects the contents of an `OpError`; it only counts
/// occurrences and discards the child node that produced it (spec §4.4,
/// §7). Hosts construct one from whatever their own operation layer throws.
#[derive(Debug, Error)]
#[error("operation invocation failed: {0}")]
pub struct OpError(#[source] pub Box<dyn std::error::Error + Send + Sync + 'static>);

impl OpError {
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        OpError(Box::new(err))
    }

    pub fn from_message(msg: impl Into<String>) -> Self {
        #[derive(Debug, Error)]
        #[error("{0}")]
        struct Msg(String);
        OpError(Box::new(Msg(msg.into())))
    }
}
