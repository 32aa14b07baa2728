//! State Hashing for Verification
//!
//! Deterministic hashing of engine state, used to detect divergence
//! between the authoritative server simulation and a predicting client,
//! and to validate replays.
//!
//! f64 values are hashed by their IEEE-754 bit pattern: two runs that
//! are bit-reproducible hash identically, and any drift shows up.

use sha2::{Digest, Sha256};

use super::geom::Position;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for engine state.
///
/// Wraps SHA-256 with helpers for the engine's value types.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with a domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create the hasher for full engine state.
    pub fn for_engine_state() -> Self {
        Self::new(b"SKIRMISH_STATE_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f64 by IEEE-754 bit pattern.
    #[inline]
    pub fn update_f64(&mut self, value: f64) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with a position.
    #[inline]
    pub fn update_position(&mut self, value: Position) {
        self.update_f64(value.x);
        self.update_f64(value.y);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a state hash for replay verification.
///
/// Called by `Engine::compute_hash()`. The closure adds the
/// engine-specific state in a fixed order.
pub fn compute_state_hash<F>(tick: u32, seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_engine_state();

    // Tick and seed always come first
    hasher.update_u32(tick);
    hasher.update_u64(seed);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_engine_state();
            hasher.update_u32(100);
            hasher.update_u64(12345);
            hasher.update_f64(5.5);
            hasher.update_position(Position::new(1.0, 2.0));
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_f64_bit_pattern_sensitivity() {
        let hash_of = |v: f64| {
            let mut h = StateHasher::new(b"test");
            h.update_f64(v);
            h.finalize()
        };

        // Distinct bit patterns hash differently even when numerically close
        assert_ne!(hash_of(0.1 + 0.2), hash_of(0.3));
        // Identical bit patterns hash identically
        assert_eq!(hash_of(-0.0f64.sqrt()), hash_of(-0.0f64.sqrt()));
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(100, 12345, |hasher| {
            hasher.update_f64(5.0);
            hasher.update_bool(true);
        });

        let hash2 = compute_state_hash(100, 12345, |hasher| {
            hasher.update_f64(5.0);
            hasher.update_bool(true);
        });

        assert_eq!(hash, hash2);

        // Different tick = different hash
        let hash3 = compute_state_hash(101, 12345, |hasher| {
            hasher.update_f64(5.0);
            hasher.update_bool(true);
        });

        assert_ne!(hash, hash3);
    }
}
