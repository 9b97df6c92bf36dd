//! WELL44497b pseudo-random generator
//!
//! A long-period (2^44497 - 1) generator whose internal state can be
//! captured and restored exactly. Streams seeded from different 64-bit
//! seeds show negligible correlation, which is what lets every scenario
//! in an experiment own an independent stream.
//!
//! The step function and seed expansion follow the published WELL44497a
//! recurrence (including the errata) with the Matsumoto-Kurita tempering
//! of the "b" variant, so state snapshots are portable across
//! implementations of the same algorithm.

use rand::{Error as RandError, RngCore};

use crate::core::error::{PlinthError, Result};
use crate::random::state::WellState;

/// Number of 32-bit words in the state array
pub const STATE_WORDS: usize = 1391;

const M1: usize = 23;
const M2: usize = 481;
const M3: usize = 229;

/// A WELL44497b stream
///
/// `Clone` produces an identical stream that advances independently.
#[derive(Debug, Clone)]
pub struct WellRng {
    seed: u64,
    index: usize,
    v: Vec<u32>,
}

impl WellRng {
    /// Create a stream from a 64-bit seed.
    ///
    /// The seed's two 32-bit halves prime the state array; the remaining
    /// 1389 words come from the standard expansion recurrence.
    pub fn seeded(seed: u64) -> Self {
        let mut v = vec![0u32; STATE_WORDS];
        v[0] = (seed >> 32) as u32;
        v[1] = seed as u32;
        for i in 2..STATE_WORDS {
            // sign-extended 32-bit recurrence, wrapping in 64 bits
            let prev = v[i - 2] as i32 as i64;
            let mixed = prev ^ (prev >> 30);
            v[i] = (1_812_433_253_i64.wrapping_mul(mixed).wrapping_add(i as i64)) as u32;
        }
        Self { seed, index: 0, v }
    }

    /// Capture the exact current state.
    pub fn snapshot(&self) -> WellState {
        WellState::new(self.seed, self.index, self.v.clone())
    }

    /// Reconstruct a stream from a snapshot.
    ///
    /// Fails when the state array is not exactly 1391 words or the cursor
    /// index is out of bounds.
    pub fn restore(state: WellState) -> Result<Self> {
        let (seed, index, v) = state.into_parts();
        if v.len() != STATE_WORDS {
            return Err(PlinthError::InvalidGeneratorState(format!(
                "state array has {} words, expected {STATE_WORDS}",
                v.len()
            )));
        }
        if index >= STATE_WORDS {
            return Err(PlinthError::InvalidGeneratorState(format!(
                "cursor index {index} out of bounds [0, {}]",
                STATE_WORDS - 1
            )));
        }
        Ok(Self { seed, index, v })
    }

    /// Seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Advance the state one step and return 32 tempered bits.
    pub fn next_u32(&mut self) -> u32 {
        let i = self.index;
        let i_rm1 = (i + STATE_WORDS - 1) % STATE_WORDS;
        let i_rm2 = (i + STATE_WORDS - 2) % STATE_WORDS;

        let v0 = self.v[i];
        let vm1 = self.v[(i + M1) % STATE_WORDS];
        let vm2 = self.v[(i + M2) % STATE_WORDS];
        let vm3 = self.v[(i + M3) % STATE_WORDS];

        let z0 = (0xFFFF_8000 & self.v[i_rm1]) ^ (0x0000_7FFF & self.v[i_rm2]);
        let z1 = (v0 ^ (v0 << 24)) ^ (vm1 ^ (vm1 >> 30));
        let z2 = (vm2 ^ (vm2 << 10)) ^ (vm3 << 26);
        let z3 = z1 ^ z2;
        let z2_prime = ((z2 << 9) ^ (z2 >> 23)) & 0xFBFF_FFFF;
        let z2_second = if z2 & 0x0002_0000 != 0 {
            z2_prime ^ 0xB729_FCEC
        } else {
            z2_prime
        };
        let z4 = z0 ^ (z1 ^ (z1 >> 20)) ^ z2_second ^ z3;

        self.v[i] = z3;
        self.v[i_rm1] = z4;
        self.v[i_rm2] &= 0xFFFF_8000;
        self.index = i_rm1;

        let mut t = z4 ^ ((z4 << 7) & 0x93DD_1400);
        t ^= (t << 15) & 0xFA11_8000;
        t
    }

    /// Draw a full 64-bit value as `(hi << 32) + sign_extend(lo)`.
    ///
    /// This matches the original generator's long composition, so derived
    /// seed sequences reproduce exactly.
    pub fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as i32 as i64;
        ((hi << 32) as i64).wrapping_add(lo) as u64
    }

    /// Uniform double in [0, 1) built from 52 random bits.
    pub fn next_f64(&mut self) -> f64 {
        let hi = (self.next_u32() >> 6) as u64;
        let lo = (self.next_u32() >> 6) as u64;
        ((hi << 26) | lo) as f64 * (1.0 / (1u64 << 52) as f64)
    }
}

impl RngCore for WellRng {
    fn next_u32(&mut self) -> u32 {
        WellRng::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        WellRng::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn snapshot_restore_round_trip() {
        let mut original = WellRng::seeded(9_182_736_455);
        // burn in so the cursor has wrapped a few times
        for _ in 0..5000 {
            original.next_u32();
        }

        let snapshot = original.snapshot();
        let mut restored = WellRng::restore(snapshot).unwrap();

        for i in 0..1000 {
            assert_eq!(
                original.next_u32(),
                restored.next_u32(),
                "restored stream diverged at draw {i}"
            );
        }
    }

    #[test]
    fn restore_rejects_wrong_length() {
        let state = WellState::from_parts(1, 0, vec![0u32; STATE_WORDS - 1]);
        assert!(matches!(
            WellRng::restore(state),
            Err(PlinthError::InvalidGeneratorState(_))
        ));
    }

    #[test]
    fn restore_rejects_out_of_bounds_index() {
        let state = WellState::from_parts(1, STATE_WORDS, vec![0u32; STATE_WORDS]);
        assert!(matches!(
            WellRng::restore(state),
            Err(PlinthError::InvalidGeneratorState(_))
        ));
    }

    #[test]
    fn distinct_seeds_distinct_streams() {
        let mut a = WellRng::seeded(1);
        let mut b = WellRng::seeded(2);
        let draws_a: Vec<u32> = (0..16).map(|_| a.next_u32()).collect();
        let draws_b: Vec<u32> = (0..16).map(|_| b.next_u32()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn state_serde_is_bit_exact() {
        let mut rng = WellRng::seeded(42);
        for _ in 0..137 {
            rng.next_u32();
        }
        let state = rng.snapshot();
        let json = serde_json::to_string(&state).unwrap();
        let decoded: WellState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, decoded);

        let mut a = WellRng::restore(state).unwrap();
        let mut b = WellRng::restore(decoded).unwrap();
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_any_prefix(seed: u64, warmup in 0usize..3000, draws in 0usize..200) {
            let mut original = WellRng::seeded(seed);
            for _ in 0..warmup {
                original.next_u32();
            }
            let mut restored = WellRng::restore(original.snapshot()).unwrap();
            for _ in 0..draws {
                prop_assert_eq!(original.next_u32(), restored.next_u32());
            }
        }
    }
}
