//! The search engine (spec §4.5 "MagicEngine").
//!
//! Structurally this mirrors the teacher's `Engine<P>` (`core/src/engine.rs`
//! in `rano-oss-libchinese`): a frontier of scored candidates is expanded
//! level by level, children are deduplicated and pruned against a running
//! budget, and only the survivors carry forward — generalized here from a
//! fixed pinyin-segmentation lattice to an open-ended operation-expansion
//! tree.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use tracing::{debug, instrument, trace, warn};

use crate::bytebuffer::ByteBuffer;
use crate::config::EngineConfig;
use crate::crib::Crib;
use crate::error::MagicError;
use crate::node::{fingerprint, MagicNode, NodeState, Recipe};
use crate::registry::{ArgVector, ArgValue, DataType, OperationRegistry};
use crate::result::{AnalysisReport, Candidate, SearchStats};
use crate::scorekit::{LanguageMatch, Score};
use crate::signature::SignatureCatalogue;

/// How many characters of a UTF-8 preview (or hex bytes, for non-UTF-8
/// output) to keep on a [`Candidate`] (SPEC_FULL.md supplemented features).
const PREVIEW_LEN: usize = 256;

/// The synthetic operation name recorded in a recipe step produced by the
/// catalogue's mojibake transcode path rather than a registered operation
/// (SPEC_FULL.md supplemented features, spec §4.3/§4.5 "Text Encoding Brute
/// Force").
const TEXT_ENCODING_BRUTE_FORCE_OP: &str = "Text Encoding Brute Force";

/// Minimum rank improvement a child must show over its parent to survive
/// pruning outside `intensive` mode (spec §4.5 step b: "If its rank is
/// strictly better than its parent's rank minus an 'improvement floor',
/// keep it; otherwise drop unless `intensive`"). Zero means "strictly
/// better, no slack" — spec §9's open question says not to guess values
/// unevidenced by the §8 scenarios, and none of them require slack beyond
/// plain improvement.
const IMPROVEMENT_FLOOR: f64 = 0.0;

/// Cooperative cancellation signal for a long-running `analyze` call.
///
/// A blanket impl is provided for `AtomicBool` (checked with
/// `Ordering::Relaxed`, as with the teacher's shutdown flags) so callers
/// can cancel from another thread without any extra wrapper type.
pub trait CancellationToken {
    fn is_cancelled(&self) -> bool;
}

impl CancellationToken for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(AtomicOrdering::Relaxed)
    }
}

/// A token that is never cancelled, used when the caller has no need for
/// mid-search cancellation.
pub struct NeverCancelled;

impl CancellationToken for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// The recipe-search engine over a host-provided [`OperationRegistry`]
/// (spec §3 "MagicEngine").
pub struct MagicEngine<'a> {
    registry: &'a dyn OperationRegistry,
    crib: &'a Crib,
    catalogue: &'a SignatureCatalogue,
}

impl<'a> MagicEngine<'a> {
    pub fn new(registry: &'a dyn OperationRegistry, crib: &'a Crib, catalogue: &'a SignatureCatalogue) -> Self {
        Self { registry, crib, catalogue }
    }

    /// Run one bounded search over `input` (spec §4.5). The only error path
    /// is a configuration problem caught before expansion starts (spec §7);
    /// everything else is folded into `AnalysisReport`.
    #[instrument(skip(self, input, config), fields(input_len = input.len(), depth = config.depth))]
    pub fn analyze(&self, input: ByteBuffer, config: &EngineConfig) -> Result<AnalysisReport, MagicError> {
        self.analyze_with_cancellation(input, config, &NeverCancelled)
    }

    /// Same as [`Self::analyze`], but polls `cancel` before each node
    /// expansion so a host can abort a long search (spec §4.5 "supports
    /// cooperative cancellation").
    pub fn analyze_with_cancellation(
        &self,
        input: ByteBuffer,
        config: &EngineConfig,
        cancel: &dyn CancellationToken,
    ) -> Result<AnalysisReport, MagicError> {
        config.validate()?;

        if input.is_empty() {
            // spec §7: "Empty input: returns a report with no candidates
            // and the canonical 'Nothing of interest' preview; never an
            // error." An empty buffer can never be `interesting` (its
            // `printable_fraction` is 0.0), so without this short-circuit
            // the §4.5 step 4 fallback would push the uninteresting root
            // node and yield one candidate instead of zero.
            return Ok(AnalysisReport {
                candidates: Vec::new(),
                truncated: false,
                cancelled: false,
                stats: SearchStats::default(),
            });
        }

        // spec §6 `config.crib_regex` is the per-call target; `self.crib`
        // carries the engine's shared reference tables (letter/bigram/
        // trigram frequencies, common words) built once at construction. A
        // configured target regex produces a one-shot effective `Crib` that
        // reuses those tables with the target swapped in, rather than
        // baking the target into the engine at construction time.
        let owned_crib;
        let crib: &Crib = match &config.crib_regex {
            Some(pattern) => {
                owned_crib = Crib::with_target(pattern).map_err(MagicError::InvalidCribRegex)?;
                &owned_crib
            }
            None => self.crib,
        };

        let mut arena: Vec<MagicNode> = Vec::new();
        let mut seen: std::collections::HashSet<u64> = std::collections::HashSet::new();
        let mut stats = SearchStats::default();
        let mut truncated = false;
        let mut cancelled = false;

        let root_score = Score::compute(&input, crib);
        let root_fp = fingerprint(&input);
        seen.insert(root_fp);
        arena.push(MagicNode {
            buffer: input,
            parent: None,
            produced_by: None,
            depth: 0,
            score: root_score,
            fingerprint: root_fp,
            state: NodeState::Scored,
            output_type: DataType::RawBytes,
            op_order: 0,
        });

        let mut frontier: Vec<usize> = vec![0];

        'depths: for level in 1..=config.depth {
            let mut level_children: Vec<usize> = Vec::new();

            for &parent_idx in &frontier {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'depths;
                }
                if arena.len() >= config.max_nodes {
                    truncated = true;
                    break 'depths;
                }

                arena[parent_idx].state = NodeState::Expanding;
                let parent_output_type = arena[parent_idx].output_type;
                let parent_buffer = arena[parent_idx].buffer.clone();
                let parent_recipe = recipe_of(&arena, parent_idx);
                let parent_depth = arena[parent_idx].depth;

                let parent_rank = arena[parent_idx].rank();
                let candidate_ops = self.registry.list_by_input_type(parent_output_type);
                trace!(parent = parent_idx, candidates = candidate_ops.len(), "expanding node");

                for (op_order, descriptor) in candidate_ops.iter().enumerate() {
                    if arena.len() >= config.max_nodes {
                        truncated = true;
                        break;
                    }

                    let mut arg_vectors: Vec<ArgVector> = Vec::new();
                    let hints = self.registry.matching_hints(&descriptor.name, &parent_buffer);
                    let fired_useful_hint = !hints.is_empty();

                    if !descriptor.magic_useful && !config.intensive && !fired_useful_hint {
                        // Not worth trying outside intensive mode and no
                        // pattern hint fired to justify it anyway (spec §4.5
                        // step b, §4.4).
                        continue;
                    }

                    if hints.is_empty() {
                        arg_vectors.push(self.registry.default_args(&descriptor.name));
                    } else {
                        arg_vectors.extend(hints);
                    }

                    for args in arg_vectors {
                        match self.registry.invoke(&descriptor.name, &args, &parent_buffer) {
                            Err(err) => {
                                stats.op_errors += 1;
                                warn!(op = %descriptor.name, error = %err, "operation invocation failed");
                                continue;
                            }
                            Ok(child_buffer) => {
                                let child_recipe = parent_recipe.extended(descriptor.name.clone(), args);
                                let fp = fingerprint(&child_buffer);

                                if is_cycle(&arena, parent_idx, fp) {
                                    stats.nodes_cycle_rejected += 1;
                                    continue;
                                }
                                if seen.contains(&fp) {
                                    stats.nodes_duplicate_rejected += 1;
                                    continue;
                                }
                                seen.insert(fp);

                                let score = Score::compute(&child_buffer, crib);
                                let child_rank = score.rank();
                                if !config.intensive && !(child_rank < parent_rank - IMPROVEMENT_FLOOR) {
                                    // Doesn't clear the improvement floor and
                                    // intensive mode isn't relaxing pruning
                                    // (spec §4.5 step b).
                                    stats.nodes_pruned += 1;
                                    continue;
                                }

                                let idx = arena.len();
                                arena.push(MagicNode {
                                    buffer: child_buffer,
                                    parent: Some(parent_idx),
                                    produced_by: Some(child_recipe.0.last().cloned().expect("just extended")),
                                    depth: parent_depth + 1,
                                    score,
                                    fingerprint: fp,
                                    state: NodeState::Scored,
                                    output_type: descriptor.output_type,
                                    op_order,
                                });
                                stats.nodes_expanded += 1;
                                level_children.push(idx);
                            }
                        }
                    }
                }

                if config.intensive {
                    for (name, child_buffer) in
                        self.catalogue.brute_force_transcodes(&parent_buffer, crib, config.extensive_language_support)
                    {
                        if arena.len() >= config.max_nodes {
                            truncated = true;
                            break;
                        }
                        let args = ArgVector::of([ArgValue::Text(name.clone())]);
                        let child_recipe = parent_recipe.extended(TEXT_ENCODING_BRUTE_FORCE_OP, args);
                        let fp = fingerprint(&child_buffer);

                        if is_cycle(&arena, parent_idx, fp) {
                            stats.nodes_cycle_rejected += 1;
                            continue;
                        }
                        if seen.contains(&fp) {
                            stats.nodes_duplicate_rejected += 1;
                            continue;
                        }
                        seen.insert(fp);

                        let score = Score::compute(&child_buffer, crib);
                        let idx = arena.len();
                        arena.push(MagicNode {
                            buffer: child_buffer,
                            parent: Some(parent_idx),
                            produced_by: Some(child_recipe.0.last().cloned().expect("just extended")),
                            depth: parent_depth + 1,
                            score,
                            fingerprint: fp,
                            state: NodeState::Scored,
                            output_type: DataType::Utf8String,
                            op_order: candidate_ops.len(),
                        });
                        stats.nodes_expanded += 1;
                        level_children.push(idx);
                    }
                }

                arena[parent_idx].state = NodeState::Expanded;
            }

            if level_children.is_empty() {
                break;
            }

            level_children.sort_by(|&a, &b| compare_nodes(&arena[a], &arena[b]));
            if level_children.len() > config.keep_top_k {
                for &pruned_idx in &level_children[config.keep_top_k..] {
                    arena[pruned_idx].state = NodeState::Pruned;
                    stats.nodes_pruned += 1;
                }
                level_children.truncate(config.keep_top_k);
            }

            debug!(level, survivors = level_children.len(), "level complete");
            frontier = level_children;
        }

        let mut interesting_indices: Vec<usize> = (0..arena.len())
            .filter(|&i| arena[i].score.is_interesting() && arena[i].state != NodeState::Pruned)
            .collect();
        interesting_indices.sort_by(|&a, &b| compare_nodes(&arena[a], &arena[b]));
        interesting_indices.truncate(config.keep_top_k);

        if interesting_indices.is_empty() {
            // spec §4.5 step 4: fall back to the single best-ranked node
            // overall so a caller always sees *something*, even when it
            // doesn't clear the "interesting" bar.
            if let Some(best) = (0..arena.len())
                .filter(|&i| arena[i].state != NodeState::Pruned)
                .min_by(|&a, &b| compare_nodes(&arena[a], &arena[b]))
            {
                interesting_indices.push(best);
            }
        }

        let candidates = interesting_indices
            .into_iter()
            .map(|idx| self.to_candidate(&arena, idx, crib, config.extensive_language_support))
            .collect();

        Ok(AnalysisReport { candidates, truncated, cancelled, stats })
    }

    /// Build the final [`Candidate`] for a node, running file-type and
    /// encoding detection over its terminal buffer (falling back to the
    /// buffer its last step consumed for file-type detection) (spec §4.3, §6).
    fn to_candidate(&self, arena: &[MagicNode], idx: usize, crib: &Crib, extensive: bool) -> Candidate {
        let node = &arena[idx];
        let recipe = recipe_of(arena, idx);
        let output_preview = preview(&node.buffer);
        // A terminal op like `Render Image` consumes a recognizable file
        // format and produces something that no longer carries its magic
        // bytes (e.g. rendered text). Detect on the node's own buffer
        // first, since most recipes never strip a signature off their
        // input, then fall back to the buffer the last step actually
        // consumed so a render/extract-style candidate still reports the
        // file type its recipe was identified from (spec §8 scenario 3).
        let detected_type = self
            .catalogue
            .identify(&node.buffer)
            .or_else(|| node.parent.and_then(|parent_idx| self.catalogue.identify(&arena[parent_idx].buffer)));
        let encodings = self.catalogue.detect_encodings(&node.buffer, crib, extensive);
        let mut score = node.score.clone();
        score.languages_detected = encodings
            .iter()
            .filter_map(|hit| {
                crate::signature::language_tag_for_encoding(&hit.name)
                    .map(|tag| LanguageMatch { language_tag: tag.to_string(), confidence: hit.confidence })
            })
            .collect();
        Candidate {
            recipe,
            output_type: node.output_type,
            output_preview,
            score,
            rank: node.rank(),
            detected_type,
            encodings,
            interesting: node.score.is_interesting(),
        }
    }
}

/// Reconstruct the recipe that led to `idx` by walking parent links.
fn recipe_of(arena: &[MagicNode], idx: usize) -> Recipe {
    let mut steps = Vec::new();
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        if let Some(step) = &arena[i].produced_by {
            steps.push(step.clone());
        }
        cursor = arena[i].parent;
    }
    steps.reverse();
    Recipe(steps)
}

/// A node is a cycle, rather than merely a duplicate, if its fingerprint
/// reappears among its own ancestors (spec §3 "Fingerprint", §4.5 cycle
/// detection) — e.g. `From Base64` undoing a `To Base64` two steps back.
fn is_cycle(arena: &[MagicNode], parent_idx: usize, fp: u64) -> bool {
    let mut cursor = Some(parent_idx);
    while let Some(i) = cursor {
        if arena[i].fingerprint == fp {
            return true;
        }
        cursor = arena[i].parent;
    }
    false
}

/// Total order over nodes for the ranked output and per-depth pruning
/// (spec §4.5 tie-break rules): rank ascending (lower = more interesting,
/// NaN sorts last), then shallower recipe, then earlier-registered
/// operation, then lexicographic operation name.
fn compare_nodes(a: &MagicNode, b: &MagicNode) -> Ordering {
    rank_cmp(a.rank(), b.rank())
        .then_with(|| a.depth.cmp(&b.depth))
        .then_with(|| a.op_order.cmp(&b.op_order))
        .then_with(|| {
            let a_name = a.produced_by.as_ref().map(|s| s.operation.as_str()).unwrap_or("");
            let b_name = b.produced_by.as_ref().map(|s| s.operation.as_str()).unwrap_or("");
            a_name.cmp(b_name)
        })
}

fn rank_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn preview(buffer: &ByteBuffer) -> String {
    if let Some(text) = buffer.try_as_utf8() {
        text.chars().take(PREVIEW_LEN).collect()
    } else {
        buffer
            .leading(PREVIEW_LEN / 2)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}
