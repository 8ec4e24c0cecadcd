//! Operation registry contract (spec §3 OperationDescriptor/PatternHint,
//! §4.4).
//!
//! The registry is the one interface between the Magic core and the host's
//! "hundreds of concrete operations" — out of scope for this crate (spec
//! §1). The core only ever sees metadata plus a function/trait-object
//! handle to invoke an operation; it never inspects operation internals
//! (spec §9 "Dynamic dispatch over operations").

use regex::bytes::Regex;

use crate::bytebuffer::ByteBuffer;
use crate::error::OpError;

/// The declared input/output type of an operation (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    RawBytes,
    Utf8String,
    NumberString,
    ByteList,
}

/// An opaque, typed argument vector passed to an operation invocation.
///
/// The engine treats this as a black box (spec §3: "opaque to the
/// engine") — it only ever copies or compares it, never interprets its
/// contents.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArgVector(pub Vec<ArgValue>);

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ArgValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl ArgVector {
    pub fn empty() -> Self {
        ArgVector(Vec::new())
    }

    pub fn of(values: impl IntoIterator<Item = ArgValue>) -> Self {
        ArgVector(values.into_iter().collect())
    }
}

impl std::fmt::Display for ArgVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|v| match v {
                ArgValue::Text(s) => s.clone(),
                ArgValue::Number(n) => n.to_string(),
                ArgValue::Bool(b) => b.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Catalogue-declared shortcut: a regex over input bytes paired with a
/// preferred argument vector for one operation (spec §3, Glossary).
pub struct PatternHint {
    pub pattern: Regex,
    pub args: ArgVector,
    /// Whether this hint counts as "magic-useful" on its own, independent
    /// of the operation's own `magic_useful` flag (spec §4.5 step b).
    pub useful: bool,
}

impl PatternHint {
    pub fn new(pattern: &str, args: ArgVector, useful: bool) -> Result<Self, regex::Error> {
        Ok(Self { pattern: Regex::new(pattern)?, args, useful })
    }

    pub fn fires(&self, buffer: &ByteBuffer) -> bool {
        self.pattern.is_match(buffer.as_bytes())
    }
}

/// Immutable catalogue entry describing one operation (spec §3).
pub struct OperationDescriptor {
    pub name: String,
    pub input_type: DataType,
    pub output_type: DataType,
    pub default_args: ArgVector,
    /// "magic-usefulness" hint: whether the engine should try this
    /// operation outside of `intensive` mode (spec §3, §4.5).
    pub magic_useful: bool,
    pub pattern_hints: Vec<PatternHint>,
}

/// Host-provided contract the engine consumes (spec §4.4).
///
/// Implementations must be deterministic: the same `(name, args, input)`
/// must always yield the same output (spec §4.4). The registry is read-only
/// from the engine's perspective — it is queried, never mutated, during a
/// search.
pub trait OperationRegistry {
    /// Every operation whose declared input type is `input_type`.
    fn list_by_input_type(&self, input_type: DataType) -> Vec<&OperationDescriptor>;

    /// Stable default argument vector for `name`.
    fn default_args(&self, name: &str) -> ArgVector;

    /// Every argument vector implied by this operation's `PatternHint`s
    /// that fires against `buffer` (spec §4.4).
    fn matching_hints(&self, name: &str, buffer: &ByteBuffer) -> Vec<ArgVector>;

    /// Run the named operation. Errors are caught by the engine and never
    /// propagated past a single child expansion (spec §4.5, §7).
    fn invoke(&self, name: &str, args: &ArgVector, input: &ByteBuffer) -> Result<ByteBuffer, OpError>;

    /// Look up a descriptor by name, for engine-internal bookkeeping
    /// (usefulness hints, output type propagation).
    fn describe(&self, name: &str) -> Option<&OperationDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopRegistry;

    impl OperationRegistry for NoopRegistry {
        fn list_by_input_type(&self, _input_type: DataType) -> Vec<&OperationDescriptor> {
            Vec::new()
        }
        fn default_args(&self, _name: &str) -> ArgVector {
            ArgVector::empty()
        }
        fn matching_hints(&self, _name: &str, _buffer: &ByteBuffer) -> Vec<ArgVector> {
            Vec::new()
        }
        fn invoke(&self, _name: &str, _args: &ArgVector, _input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
            Err(OpError::from_message("no operations registered"))
        }
        fn describe(&self, _name: &str) -> Option<&OperationDescriptor> {
            None
        }
    }

    #[test]
    fn pattern_hint_fires_on_matching_bytes() {
        let hint = PatternHint::new(r"^[0-9A-Fa-f ]+$", ArgVector::empty(), true).unwrap();
        assert!(hint.fires(&ByteBuffer::new(b"41 42 43".to_vec())));
        assert!(!hint.fires(&ByteBuffer::new(b"not hex!!".to_vec())));
    }

    #[test]
    fn registry_trait_is_object_safe_enough_for_dyn_use() {
        let registry: Box<dyn OperationRegistry> = Box::new(NoopRegistry);
        assert!(registry.list_by_input_type(DataType::RawBytes).is_empty());
    }
}
