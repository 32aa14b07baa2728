//! Simulation Engine Module
//!
//! All match simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `catalog`: Static unit, attack, cast and effect descriptors
//! - `state`: Engine state, units, corpses, missiles, explosions
//! - `tick`: The six-phase per-tick pipeline
//! - `combat`: Movement, attacks, casts, missiles, explosions
//! - `collision`: Pairwise unit separation
//! - `events`: Engine notifications for drivers and clients

pub mod catalog;
pub mod state;
pub mod tick;
pub mod combat;
pub mod collision;
pub mod events;

// Re-export key types
pub use catalog::{AttackKind, CastKind, EffectKind, UnitKind};
pub use state::{Action, Engine, EngineError, Order, OrderTarget, Team, Unit, UnitId};
pub use events::{EngineEvent, SoundEvent};
