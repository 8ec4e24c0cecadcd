//! magic-analyzer-core
//!
//! Byte-buffer heuristic analysis: given an opaque blob of bytes and a
//! host-provided catalogue of decode/transform operations, search the
//! space of operation pipelines ("recipes") and rank the most plausible
//! interpretations of the data.
//!
//! The core never knows what a "From Base64" or "Gunzip" operation
//! actually does — it only sees metadata through [`OperationRegistry`] and
//! calls back into the host to run one. Everything downstream of that
//! boundary (scoring, search, ranking, formatting) lives in this crate.
//!
//! Public API:
//! - [`ByteBuffer`] — immutable, cheaply-cloned byte data under analysis
//! - [`Score`]/[`scorekit`] — statistical scoring of one buffer
//! - [`Crib`] — natural-language reference data and the optional target regex
//! - [`SignatureCatalogue`] — file-type and text-encoding detection
//! - [`OperationRegistry`] — the host-side operation contract
//! - [`MagicEngine`] — the bounded recipe search
//! - [`ResultFormatter`] — plain-text rendering of a result
//! - [`EngineConfig`] — tunable search parameters

pub mod bytebuffer;
pub use bytebuffer::ByteBuffer;

pub mod error;
pub use error::{MagicError, OpError};

pub mod crib;
pub use crib::Crib;

pub mod scorekit;
pub use scorekit::{LanguageMatch, Score};

pub mod signature;
pub use signature::{DetectedType, EncodingDetection, SignatureCatalogue};

pub mod registry;
pub use registry::{ArgValue, ArgVector, DataType, OperationDescriptor, OperationRegistry, PatternHint};

pub mod node;
pub use node::{MagicNode, NodeState, Recipe, RecipeStep};

pub mod config;
pub use config::EngineConfig;

pub mod engine;
pub use engine::{CancellationToken, MagicEngine};

pub mod result;
pub use result::{AnalysisReport, Candidate, SearchStats};

pub mod formatter;
pub use formatter::{ResultFormatter, NOTHING_INTERESTING};
