//! Engine Notifications
//!
//! Events emitted during a tick for the rendering/audio layer and for
//! the network collaborator that relays intent and creates units
//! authoritatively. The engine never consumes its own events.

use serde::{Deserialize, Serialize};

use crate::core::geom::Position;
use crate::engine::catalog::{CastKind, UnitKind};
use crate::engine::state::{Order, Team, UnitId};

/// Sound cues the audio layer may play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SoundEvent {
    /// A melee swing connected
    MeleeAttack = 0,
    /// A rocket left its launcher
    RocketLaunch = 1,
    /// A rocket detonated
    RocketExplosion = 2,
    /// A pestilence missile splashed
    PestilenceSplash = 3,
    /// A beetle spawn cast completed
    BeetleSpawn = 4,
}

/// A notification emitted by the engine during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Play a sound at a position.
    Sound {
        /// Which cue
        sound: SoundEvent,
        /// Where it happened
        position: Position,
    },

    /// An action was issued for a unit; relay to the authority.
    UnitActionRequested {
        /// The ordered unit
        unit_id: UnitId,
        /// The issued order
        order: Order,
    },

    /// The engine wants a unit created; id allocation is the
    /// authoritative owner's job.
    UnitCreateRequested {
        /// Kind to create
        kind: UnitKind,
        /// Owning team
        team: Team,
        /// Spawn position
        position: Position,
        /// Spawn orientation (radians)
        orientation: f64,
        /// Cast that requested the spawn
        cast: CastKind,
    },
}

impl EngineEvent {
    /// Create a sound notification.
    pub fn sound(sound: SoundEvent, position: Position) -> Self {
        Self::Sound { sound, position }
    }

    /// Create an action-requested notification.
    pub fn action_requested(unit_id: UnitId, order: Order) -> Self {
        Self::UnitActionRequested { unit_id, order }
    }

    /// Create a unit-create-requested notification.
    pub fn create_requested(
        kind: UnitKind,
        team: Team,
        position: Position,
        orientation: f64,
        cast: CastKind,
    ) -> Self {
        Self::UnitCreateRequested {
            kind,
            team,
            position,
            orientation,
            cast,
        }
    }
}
