//! # Skirmish Engine
//!
//! Deterministic two-team skirmish simulation, designed for lockstep
//! replay and state verification.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SKIRMISH ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── geom.rs     - Positions, offsets, rects, angles         │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  engine/         - Match simulation (deterministic)          │
//! │  ├── catalog.rs  - Static unit/attack/cast descriptors       │
//! │  ├── state.rs    - Engine state, units, missiles, corpses    │
//! │  ├── tick.rs     - The six-phase per-tick pipeline           │
//! │  ├── combat.rs   - Movement, attacks, casts, projectiles     │
//! │  ├── collision.rs- Pairwise unit separation                  │
//! │  └── events.rs   - Engine notifications                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The simulation is deterministic per platform given a seed and a
//! command sequence:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies; the clock is derived from the tick
//!   counter
//! - All randomness from seeded Xorshift128+, split into a simulation
//!   stream and a cosmetic stream that never touches outcomes
//! - Floating-point operations run in a fixed order; replays on the
//!   same platform produce identical state hashes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod engine;

// Re-export commonly used types
pub use crate::core::geom::{Offset, Position, Rect};
pub use crate::core::hash::{StateHash, StateHasher};
pub use crate::core::rng::DeterministicRng;
pub use crate::engine::catalog::{CastKind, UnitKind};
pub use crate::engine::events::{EngineEvent, SoundEvent};
pub use crate::engine::state::{Action, Engine, EngineError, Order, OrderTarget, Team, Unit, UnitId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 50;

/// Simulated seconds per tick
pub const TICK_DT: f64 = 0.02;

/// Simulated nanoseconds per tick (20ms)
pub const TICK_DURATION_NS: u64 = 20_000_000;

/// Ticks a corpse lingers before it is removed (3 seconds)
pub const CORPSE_DECAY_TICKS: u32 = 150;

/// Lifetime of a spawned beetle in ticks (12 seconds)
pub const BEETLE_TTL_TICKS: u32 = 600;
