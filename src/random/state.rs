//! Exact, serializable generator state

use serde::{Deserialize, Serialize};

use crate::random::well::STATE_WORDS;

/// Immutable snapshot of a [`WellRng`](crate::random::WellRng)
///
/// Holds the original 64-bit seed, the full 1391-word state array and the
/// cursor index. Equality and serialization are bit-exact, so a restored
/// stream continues precisely where the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellState {
    seed: u64,
    index: usize,
    state: Vec<u32>,
}

impl WellState {
    pub(crate) fn new(seed: u64, index: usize, state: Vec<u32>) -> Self {
        debug_assert_eq!(state.len(), STATE_WORDS);
        Self { seed, index, state }
    }

    /// Reassemble a state from externally persisted parts.
    ///
    /// No validation happens here; [`WellRng::restore`](crate::random::WellRng::restore)
    /// rejects malformed states.
    pub fn from_parts(seed: u64, index: usize, state: Vec<u32>) -> Self {
        Self { seed, index, state }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw state words, exposed for exact persistence by external codecs.
    pub fn state_words(&self) -> &[u32] {
        &self.state
    }

    pub(crate) fn into_parts(self) -> (u64, usize, Vec<u32>) {
        (self.seed, self.index, self.state)
    }
}
