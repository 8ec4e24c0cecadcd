//! Human-readable rendering of an [`AnalysisReport`] (spec §4.6).
//!
//! Mirrors the teacher's `CandidateList::format_suggestions`-style text
//! rendering (`core/src/candidate.rs`): a plain numbered list, generalized
//! from IME suggestion strings to ranked recipe/preview pairs.

use std::fmt::Write as _;

use crate::result::{AnalysisReport, Candidate};

/// The exact string the teacher's CLI and the spec agree on when nothing
/// interesting was found (spec §4.6). Callers that compare output against
/// a fixture should match this verbatim.
pub const NOTHING_INTERESTING: &str =
    "Nothing of interest could be detected about the input data.\nHave you tried modifying the operation arguments?";

/// Renders ranked candidates (and search diagnostics) as plain text.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Render the full report (spec §4.6).
    pub fn render(report: &AnalysisReport) -> String {
        if report.is_empty() {
            return Self::render_empty_notice(report);
        }

        let mut out = String::new();
        for (i, candidate) in report.candidates.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            Self::render_candidate(&mut out, i + 1, candidate);
        }

        if report.truncated {
            out.push_str("\n\n(search stopped early: node budget reached)");
        }
        if report.cancelled {
            out.push_str("\n\n(search cancelled before completion)");
        }
        out
    }

    fn render_empty_notice(report: &AnalysisReport) -> String {
        let mut out = NOTHING_INTERESTING.to_string();
        if report.truncated {
            out.push_str("\n(search stopped early: node budget reached)");
        }
        if report.cancelled {
            out.push_str("\n(search cancelled before completion)");
        }
        out
    }

    fn render_candidate(out: &mut String, rank_position: usize, candidate: &Candidate) {
        let _ = writeln!(out, "#{rank_position}  {}", candidate.recipe_summary());
        let _ = writeln!(
            out,
            "    type: {:?}  rank: {:.3}  utf8: {}  printable: {:.2}",
            candidate.output_type,
            candidate.rank,
            candidate.score.valid_utf8,
            candidate.score.printable_fraction
        );
        if let Some(detected) = &candidate.detected_type {
            let _ = writeln!(out, "    detected file type: {} ({})", detected.mime, detected.description);
        }
        if !candidate.encodings.is_empty() {
            let names: Vec<String> = candidate
                .encodings
                .iter()
                .map(|e| format!("{} ({:.2})", e.name, e.confidence))
                .collect();
            let _ = writeln!(out, "    detected encodings: {}", names.join(", "));
        }
        let _ = writeln!(out, "    {}", Self::truncate_for_display(&candidate.output_preview));
    }

    fn truncate_for_display(preview: &str) -> String {
        const MAX_LINE: usize = 120;
        let mut line: String = preview.chars().take(MAX_LINE).collect();
        if preview.chars().count() > MAX_LINE {
            line.push('…');
        }
        line
    }
}
