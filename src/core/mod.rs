//! Core deterministic primitives.
//!
//! Geometry, seeded randomness and state hashing. Everything the
//! simulation layer builds on must replay bit-identically from a seed.

pub mod geom;
pub mod hash;
pub mod rng;

// Re-export core types
pub use geom::{wrap_angle, Offset, Position, Rect};
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use rng::DeterministicRng;
