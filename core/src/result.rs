//! Output types returned from one `analyze()` call (spec §3 "MagicResult",
//! SPEC_FULL.md supplemented features).
//!
//! `AnalysisReport` is the structured counterpart to the plain-text report
//! [`crate::formatter::ResultFormatter`] renders — callers that want to
//! build their own UI over the results work with this instead of scraping
//! text, the way the teacher exposes `CandidateList` alongside its
//! formatted suggestion strings (`core/src/candidate.rs`).

use serde::{Deserialize, Serialize};

use crate::node::{Recipe, RecipeStep};
use crate::registry::DataType;
use crate::scorekit::Score;
use crate::signature::{DetectedType, EncodingDetection};

/// One ranked interpretation of the input (spec §3 "Candidate", §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub recipe: Recipe,
    pub output_type: DataType,
    pub output_preview: String,
    pub score: Score,
    pub rank: f64,
    /// File type identified on the terminal buffer, if any (spec §4.3, §6).
    pub detected_type: Option<DetectedType>,
    /// Text encodings detected on the terminal buffer, highest confidence
    /// first (spec §4.3, §6).
    pub encodings: Vec<EncodingDetection>,
    /// Spec §4.2's "interesting?" verdict for this node.
    pub interesting: bool,
}

impl Candidate {
    /// Human-readable rendering of the recipe as a slash-free pipeline
    /// string, e.g. `From Base64 -> From Hex`.
    pub fn recipe_summary(&self) -> String {
        if self.recipe.is_empty() {
            return "(no operations — input as given)".to_string();
        }
        self.recipe
            .0
            .iter()
            .map(RecipeStep::describe)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl RecipeStep {
    fn describe(&self) -> String {
        if self.args.0.is_empty() {
            self.operation.clone()
        } else {
            format!("{}({})", self.operation, self.args)
        }
    }
}

/// Diagnostic counters surfaced alongside the ranked candidates
/// (SPEC_FULL.md supplemented features), so a host can tell "we found
/// nothing" apart from "we stopped early".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub nodes_expanded: usize,
    pub nodes_pruned: usize,
    pub nodes_cycle_rejected: usize,
    pub nodes_duplicate_rejected: usize,
    pub op_errors: usize,
}

/// The full result of one `analyze()` call (spec §3 "MagicResult", §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Ranked candidates, most interesting first (spec §4.5 sort + tie-break
    /// rules), truncated to the configured `keep_top_k`.
    pub candidates: Vec<Candidate>,
    /// True if `max_nodes` was reached before the search frontier emptied.
    pub truncated: bool,
    /// True if the search was stopped by caller cancellation rather than
    /// exhaustion or the node budget.
    pub cancelled: bool,
    pub stats: SearchStats,
}

impl AnalysisReport {
    /// The single highest-ranked candidate, if any were interesting enough
    /// to keep (spec §4.6).
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Serialize the report as JSON, for hosts that want the structured
    /// result rather than [`crate::formatter::ResultFormatter`]'s text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
