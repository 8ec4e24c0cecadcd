//! Search-tree node, recipe, and fingerprint types (spec §3, §9).
//!
//! Nodes live in a flat arena (`Vec<MagicNode>`) inside [`crate::engine`]
//! rather than as a pointer graph — spec §9 calls this out explicitly:
//! "specify fingerprint-based dedup... so an index-based arena
//! implementation works identically" to the source's object-identity
//! scheme.

use crate::bytebuffer::ByteBuffer;
use crate::registry::ArgVector;
use crate::scorekit::Score;

/// One step of a recipe: an operation name plus the argument vector used.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecipeStep {
    pub operation: String,
    pub args: ArgVector,
}

/// The path from the root to a node — an ordered sequence of recipe steps.
/// The root's recipe is empty (spec §3).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recipe(pub Vec<RecipeStep>);

impl Recipe {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extended(&self, operation: impl Into<String>, args: ArgVector) -> Recipe {
        let mut steps = self.0.clone();
        steps.push(RecipeStep { operation: operation.into(), args });
        Recipe(steps)
    }
}

/// Stable hash of a buffer's content (Glossary "Fingerprint"). Two nodes
/// with the same fingerprint carry byte-identical data, regardless of
/// which recipe produced them — that equivalence is exactly what both
/// cycle rejection (a path revisiting a state it already passed through)
/// and global duplicate rejection (two different recipes converging on
/// the same bytes) need to detect (spec §3, §4.5).
pub type Fingerprint = u64;

pub fn fingerprint(buffer: &ByteBuffer) -> Fingerprint {
    buffer.hash64()
}

/// Lifecycle state of a node (spec §4.5 "State machine per node").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Fresh,
    Scored,
    Expanding,
    Expanded,
    Pruned,
    Cycle,
    OpError,
}

/// One reached state in the search (spec §3 "MagicNode").
pub struct MagicNode {
    pub buffer: ByteBuffer,
    pub parent: Option<usize>,
    /// The operation + args that produced this node; `None` at the root.
    pub produced_by: Option<RecipeStep>,
    pub depth: usize,
    pub score: Score,
    pub fingerprint: Fingerprint,
    pub state: NodeState,
    pub output_type: crate::registry::DataType,
    /// Position of `produced_by`'s operation within the registry's
    /// `list_by_input_type` result for the parent, used only to break
    /// rank ties deterministically (spec §4.5 tie-break rules). `0` for
    /// the root, which has no producing operation.
    pub op_order: usize,
}

impl MagicNode {
    pub fn rank(&self) -> f64 {
        self.score.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_recipe_is_empty() {
        let r = Recipe::default();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn extending_a_recipe_appends_a_step() {
        let r = Recipe::default().extended("From Hex", ArgVector::empty());
        assert_eq!(r.len(), 1);
        assert_eq!(r.0[0].operation, "From Hex");
    }

    #[test]
    fn fingerprint_depends_only_on_content() {
        let buf_a = ByteBuffer::new(b"ABCDE".to_vec());
        let buf_b = ByteBuffer::new(b"ABCDE".to_vec());
        let buf_c = ByteBuffer::new(b"FGHIJ".to_vec());

        assert_eq!(fingerprint(&buf_a), fingerprint(&buf_b));
        assert_ne!(fingerprint(&buf_a), fingerprint(&buf_c));
    }
}
