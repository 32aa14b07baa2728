//! Entities and Engine State
//!
//! All entity records, the action state machine and the `Engine`
//! container. Uses BTreeMap for deterministic ascending-id iteration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::geom::{Position, Rect};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::{derive_stream_seed, DeterministicRng};
use crate::engine::catalog::{self, CastKind, EffectKind, UnitKind};
use crate::engine::events::EngineEvent;
use crate::{BEETLE_TTL_TICKS, CORPSE_DECAY_TICKS, TICK_DURATION_NS};

// =============================================================================
// IDS AND TEAMS
// =============================================================================

/// Unique entity identifier, allocated monotonically by the engine.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Team affiliation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Team {
    /// Observes, never fights, never targeted
    #[default]
    Spectator = 0,
    /// Red side
    Red = 1,
    /// Blue side
    Blue = 2,
}

impl Team {
    /// Whether units of this team and the other are hostile to each other.
    #[inline]
    pub fn is_enemy_of(self, other: Team) -> bool {
        self != Team::Spectator && other != Team::Spectator && self != other
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// What an order is aimed at: a fixed point or a live unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderTarget {
    /// A fixed position in the arena
    Point(Position),
    /// A unit, re-resolved by id every tick
    Unit(UnitId),
}

impl OrderTarget {
    fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        match self {
            OrderTarget::Point(p) => {
                hasher.update_u8(0);
                hasher.update_position(*p);
            }
            OrderTarget::Unit(id) => {
                hasher.update_u8(1);
                hasher.update_u32(id.0);
            }
        }
    }
}

/// A base command a unit can carry.
///
/// These four variants are the only follow-ups a Performing* action can
/// queue, which rules out nested Performing* at the type level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Order {
    /// Hold position; auto-engage the nearest enemy in trigger range.
    Stop {
        /// Cached auto-acquired target, if any
        engaged: Option<UnitId>,
    },
    /// Walk to a point, or shadow a unit's current position.
    Move {
        /// Destination
        target: OrderTarget,
    },
    /// Attack-move to a point, or hunt a locked unit.
    Attack {
        /// Destination or locked victim
        target: OrderTarget,
        /// Cached auto-acquired target (point orders only)
        engaged: Option<UnitId>,
    },
    /// Cast an ability at a point.
    Cast {
        /// Which cast
        kind: CastKind,
        /// Target point
        target: Position,
    },
}

impl Order {
    /// Idle order.
    pub const STOP: Self = Self::Stop { engaged: None };

    /// Move to a point.
    pub fn move_to(target: Position) -> Self {
        Self::Move {
            target: OrderTarget::Point(target),
        }
    }

    /// Follow a unit.
    pub fn follow(target: UnitId) -> Self {
        Self::Move {
            target: OrderTarget::Unit(target),
        }
    }

    /// Attack-move to a point.
    pub fn attack_move(target: Position) -> Self {
        Self::Attack {
            target: OrderTarget::Point(target),
            engaged: None,
        }
    }

    /// Attack a specific unit.
    pub fn attack_unit(target: UnitId) -> Self {
        Self::Attack {
            target: OrderTarget::Unit(target),
            engaged: None,
        }
    }

    /// Cast at a point.
    pub fn cast(kind: CastKind, target: Position) -> Self {
        Self::Cast { kind, target }
    }

    fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        match self {
            Order::Stop { engaged } => {
                hasher.update_u8(0);
                hasher.update_u32(engaged.map_or(u32::MAX, |id| id.0));
            }
            Order::Move { target } => {
                hasher.update_u8(1);
                target.hash_into(hasher);
            }
            Order::Attack { target, engaged } => {
                hasher.update_u8(2);
                target.hash_into(hasher);
                hasher.update_u32(engaged.map_or(u32::MAX, |id| id.0));
            }
            Order::Cast { kind, target } => {
                hasher.update_u8(3);
                hasher.update_u8(*kind as u8);
                hasher.update_position(*target);
            }
        }
    }
}

/// A unit's current activity.
///
/// Either a base [`Order`], or a transient "busy executing" state that
/// blocks new combat actions until its timer elapses and the queued
/// order resumes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Carrying out (or idling on) a base order
    Order(Order),
    /// Mid-swing on the primary attack
    PerformingAttack {
        /// Order resumed when the swing completes
        next: Order,
        /// Ticks left in the swing
        remaining_ticks: u32,
    },
    /// Mid-cast
    PerformingCast {
        /// Which cast is in progress
        kind: CastKind,
        /// Order resumed when the cast completes
        next: Order,
        /// Ticks left in the cast
        remaining_ticks: u32,
    },
}

impl Action {
    /// Whether the unit is mid-swing or mid-cast.
    #[inline]
    pub fn is_performing(&self) -> bool {
        matches!(
            self,
            Action::PerformingAttack { .. } | Action::PerformingCast { .. }
        )
    }

    /// Replay divergence hides in queued orders and swing timers long
    /// before it leaks into positions, so the full payload is hashed.
    fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        match self {
            Action::Order(order) => {
                hasher.update_u8(0);
                order.hash_into(hasher);
            }
            Action::PerformingAttack {
                next,
                remaining_ticks,
            } => {
                hasher.update_u8(1);
                next.hash_into(hasher);
                hasher.update_u32(*remaining_ticks);
            }
            Action::PerformingCast {
                kind,
                next,
                remaining_ticks,
            } => {
                hasher.update_u8(2);
                hasher.update_u8(*kind as u8);
                next.hash_into(hasher);
                hasher.update_u32(*remaining_ticks);
            }
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::Order(Order::STOP)
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A living combat unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id (map key)
    pub id: UnitId,
    /// Kind (catalog key)
    pub kind: UnitKind,
    /// Team affiliation
    pub team: Team,
    /// Center position
    pub position: Position,
    /// Facing in radians, wrapped to (-pi, pi]
    pub orientation: f64,
    /// Hit points, never negative
    pub hp: f64,
    /// Local-only selection flag (never synced)
    pub selected: bool,
    /// Local-only control-group bitmask (never synced)
    pub groups: u32,
    /// Ticks until the primary attack is ready again
    pub attack_cooldown: u32,
    /// Ticks until the next cast is ready
    pub cast_cooldown: u32,
    /// Remaining lifetime; `Some` for beetles only
    pub ttl: Option<u32>,
    /// Current activity
    pub action: Action,
}

impl Unit {
    /// Create a freshly spawned unit at full hp.
    pub fn new(id: UnitId, kind: UnitKind, team: Team, position: Position, orientation: f64) -> Self {
        let ttl = match kind {
            UnitKind::Beetle => Some(BEETLE_TTL_TICKS),
            _ => None,
        };
        Self {
            id,
            kind,
            team,
            position,
            orientation,
            hp: catalog::unit_max_hp(kind),
            selected: false,
            groups: 0,
            attack_cooldown: 0,
            cast_cooldown: 0,
            ttl,
            action: Action::default(),
        }
    }

    /// Collision radius from the catalog.
    #[inline]
    pub fn radius(&self) -> f64 {
        catalog::unit_radius(self.kind)
    }

    /// Maximum linear speed from the catalog.
    #[inline]
    pub fn max_velocity(&self) -> f64 {
        catalog::unit_max_velocity(self.kind)
    }

    /// Whether this unit is dead or expired this tick.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.hp <= 0.0 || self.ttl == Some(0)
    }

    /// Apply damage, clamping hp at zero.
    #[inline]
    pub fn apply_damage(&mut self, damage: f64) {
        self.hp = (self.hp - damage).max(0.0);
    }

    fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_u8(self.kind as u8);
        hasher.update_u8(self.team as u8);
        hasher.update_position(self.position);
        hasher.update_f64(self.orientation);
        hasher.update_f64(self.hp);
        hasher.update_u32(self.attack_cooldown);
        hasher.update_u32(self.cast_cooldown);
        hasher.update_u32(self.ttl.unwrap_or(u32::MAX));
        self.action.hash_into(hasher);
    }
}

/// Remains of a dead unit, shown until decay completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corpse {
    /// Snapshot of the unit at death (same id)
    pub unit: Unit,
    /// Ticks until the corpse disappears
    pub decay_remaining_ticks: u32,
}

impl Corpse {
    /// Create from a freshly dead unit.
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            decay_remaining_ticks: CORPSE_DECAY_TICKS,
        }
    }
}

/// Kind of a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MissileKind {
    /// Goon rocket: direct hit + fire blast
    Rocket = 0,
    /// Contaminator pestilence lob: splash only
    Pestilence = 1,
}

impl MissileKind {
    /// Projectile speed from the catalog.
    #[inline]
    pub fn velocity(self) -> f64 {
        match self {
            MissileKind::Rocket => {
                catalog::attack_spec(catalog::AttackKind::GoonRocket).missile_velocity
            }
            MissileKind::Pestilence => catalog::cast_spec(CastKind::Pestilence).missile_velocity,
        }
    }

    /// Explosion spawned on arrival.
    #[inline]
    pub fn effect(self) -> EffectKind {
        match self {
            MissileKind::Rocket => EffectKind::Fire,
            MissileKind::Pestilence => EffectKind::Pestilence,
        }
    }
}

/// What a missile flies at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MissileTarget {
    /// Re-aims at a live unit every tick; keeps the last known point
    /// if the unit vanishes mid-flight.
    Homing {
        /// Pursued unit
        unit: UnitId,
        /// Last observed position of the pursued unit
        last_position: Position,
    },
    /// Flies to a fixed point.
    Point(Position),
}

impl MissileTarget {
    fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        match self {
            MissileTarget::Homing {
                unit,
                last_position,
            } => {
                hasher.update_u8(0);
                hasher.update_u32(unit.0);
                hasher.update_position(*last_position);
            }
            MissileTarget::Point(p) => {
                hasher.update_u8(1);
                hasher.update_position(*p);
            }
        }
    }
}

/// A projectile in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Missile {
    /// Unique id (map key)
    pub id: UnitId,
    /// Kind (catalog key)
    pub kind: MissileKind,
    /// Team of the unit that fired it
    pub team: Team,
    /// Current position
    pub position: Position,
    /// Current heading in radians
    pub orientation: f64,
    /// Homing target or destination
    pub target: MissileTarget,
}

/// A lingering area effect. Damage was applied once at creation;
/// the countdown is purely visual lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    /// Unique id (map key)
    pub id: UnitId,
    /// Kind (catalog key)
    pub kind: EffectKind,
    /// Impact point
    pub position: Position,
    /// Ticks until the effect disappears
    pub remaining_ticks: u32,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Errors surfaced by engine construction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The arena rectangle has non-positive width or height.
    #[error("invalid arena: width {width} x height {height} must both be positive")]
    InvalidArena {
        /// Offending width
        width: f64,
        /// Offending height
        height: f64,
    },
}

/// The deterministic match engine.
///
/// Single-threaded and not reentrant: `tick()` must run to completion
/// before the next call, and commands are applied between ticks. Uses
/// BTreeMap everywhere so iteration is always ascending by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Engine {
    /// Tick counter
    pub(crate) tick_no: u32,
    /// Monotonic simulation clock in nanoseconds (+20ms per tick)
    pub(crate) clock_ns: u64,
    /// Arena bounds
    pub(crate) arena: Rect,
    /// Master seed (kept for hashing/replay identification)
    pub(crate) seed: u64,
    /// Simulation-affecting PRNG stream (collision tie-breaks)
    pub(crate) sim_rng: DeterministicRng,
    /// Cosmetic PRNG stream, never read by the simulation
    pub(crate) cosmetic_rng: DeterministicRng,
    /// Living units
    pub(crate) units: BTreeMap<UnitId, Unit>,
    /// Decaying corpses (same ids as the units they were)
    pub(crate) corpses: BTreeMap<UnitId, Corpse>,
    /// Projectiles in flight
    pub(crate) missiles: BTreeMap<UnitId, Missile>,
    /// Lingering explosions
    pub(crate) explosions: BTreeMap<UnitId, Explosion>,
    /// Monotonic id allocator
    pub(crate) next_id: u32,
    /// Events generated this tick (drained by `tick()`)
    #[serde(skip)]
    pub(crate) pending_events: Vec<EngineEvent>,
}

impl Engine {
    /// Create an engine over the given arena.
    ///
    /// The two PRNG streams are derived from the one master seed.
    pub fn new(arena: Rect, seed: u64) -> Result<Self, EngineError> {
        if arena.width() <= 0.0 || arena.height() <= 0.0 {
            return Err(EngineError::InvalidArena {
                width: arena.width(),
                height: arena.height(),
            });
        }
        Ok(Self {
            tick_no: 0,
            clock_ns: 0,
            arena,
            seed,
            sim_rng: DeterministicRng::new(derive_stream_seed(seed, b"sim")),
            cosmetic_rng: DeterministicRng::new(derive_stream_seed(seed, b"cosmetic")),
            units: BTreeMap::new(),
            corpses: BTreeMap::new(),
            missiles: BTreeMap::new(),
            explosions: BTreeMap::new(),
            next_id: 1,
            pending_events: Vec::new(),
        })
    }

    /// Allocate the next entity id.
    pub(crate) fn allocate_id(&mut self) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawn a unit and return its id.
    pub fn create_unit(
        &mut self,
        kind: UnitKind,
        team: Team,
        position: Position,
        orientation: f64,
    ) -> UnitId {
        let id = self.allocate_id();
        let unit = Unit::new(id, kind, team, position, orientation);
        debug!(unit = %id, ?kind, ?team, "unit spawned");
        self.units.insert(id, unit);
        id
    }

    /// Issue an order to a unit.
    ///
    /// Replaces the unit's action outright, or - while the unit is
    /// mid-swing/mid-cast - only the queued follow-up, never
    /// interrupting the swing. Emits a `UnitActionRequested`
    /// notification for relay. Returns `false` for an unknown id.
    pub fn set_unit_action(&mut self, id: UnitId, order: Order) -> bool {
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        match &mut unit.action {
            Action::PerformingAttack { next, .. } => *next = order,
            Action::PerformingCast { next, .. } => *next = order,
            action => *action = Action::Order(order),
        }
        self.pending_events
            .push(EngineEvent::action_requested(id, order));
        true
    }

    /// Set a unit's local selection flag. Returns `false` for an
    /// unknown id.
    pub fn set_selected(&mut self, id: UnitId, selected: bool) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Assign or clear a control-group bit. Returns `false` for an
    /// unknown id.
    pub fn assign_group(&mut self, id: UnitId, group: u8, member: bool) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                let bit = 1u32 << (group as u32 & 31);
                if member {
                    unit.groups |= bit;
                } else {
                    unit.groups &= !bit;
                }
                true
            }
            None => false,
        }
    }

    /// Replace the unit collection from a network snapshot.
    ///
    /// Purely-local fields (`selected`, `groups`) of units that survive
    /// the sync are preserved. The id allocator is advanced past every
    /// synced id so later local allocations cannot collide.
    pub fn sync_units(&mut self, snapshot: Vec<Unit>) {
        let mut next = BTreeMap::new();
        for mut unit in snapshot {
            if let Some(old) = self.units.get(&unit.id) {
                unit.selected = old.selected;
                unit.groups = old.groups;
            }
            self.next_id = self.next_id.max(unit.id.0 + 1);
            next.insert(unit.id, unit);
        }
        debug!(count = next.len(), "unit snapshot applied");
        self.units = next;
    }

    /// Replace the corpse collection from a network snapshot.
    pub fn sync_corpses(&mut self, snapshot: Vec<Corpse>) {
        let mut next = BTreeMap::new();
        for corpse in snapshot {
            self.next_id = self.next_id.max(corpse.unit.id.0 + 1);
            next.insert(corpse.unit.id, corpse);
        }
        self.corpses = next;
    }

    /// Replace the missile collection from a network snapshot.
    pub fn sync_missiles(&mut self, snapshot: Vec<Missile>) {
        let mut next = BTreeMap::new();
        for missile in snapshot {
            self.next_id = self.next_id.max(missile.id.0 + 1);
            next.insert(missile.id, missile);
        }
        self.missiles = next;
    }

    /// Look up a unit.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Read-only view of all living units, ascending by id.
    pub fn units(&self) -> &BTreeMap<UnitId, Unit> {
        &self.units
    }

    /// Read-only view of all corpses, ascending by id.
    pub fn corpses(&self) -> &BTreeMap<UnitId, Corpse> {
        &self.corpses
    }

    /// Read-only view of all missiles, ascending by id.
    pub fn missiles(&self) -> &BTreeMap<UnitId, Missile> {
        &self.missiles
    }

    /// Read-only view of all explosions, ascending by id.
    pub fn explosions(&self) -> &BTreeMap<UnitId, Explosion> {
        &self.explosions
    }

    /// The arena rectangle.
    pub fn arena(&self) -> Rect {
        self.arena
    }

    /// Completed tick count.
    pub fn tick_no(&self) -> u32 {
        self.tick_no
    }

    /// Simulation clock in nanoseconds (tick_no * 20ms).
    pub fn clock_ns(&self) -> u64 {
        self.clock_ns
    }

    /// The cosmetic PRNG stream for rendering/audio jitter.
    ///
    /// The simulation never reads this stream, so callers may drain it
    /// freely without perturbing determinism.
    pub fn cosmetic_rng(&mut self) -> &mut DeterministicRng {
        &mut self.cosmetic_rng
    }

    /// Queue a notification for this tick.
    pub(crate) fn push_event(&mut self, event: EngineEvent) {
        self.pending_events.push(event);
    }

    /// Drain this tick's notifications.
    pub(crate) fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Advance the clock by one tick interval.
    pub(crate) fn advance_clock(&mut self) {
        self.tick_no += 1;
        self.clock_ns += TICK_DURATION_NS;
    }

    /// Hash the full simulation state for replay verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick_no, self.seed, |hasher| {
            for unit in self.units.values() {
                unit.hash_into(hasher);
            }
            for corpse in self.corpses.values() {
                hasher.update_u32(corpse.unit.id.0);
                hasher.update_u32(corpse.decay_remaining_ticks);
            }
            for missile in self.missiles.values() {
                hasher.update_u32(missile.id.0);
                hasher.update_u8(missile.kind as u8);
                hasher.update_position(missile.position);
                hasher.update_f64(missile.orientation);
                missile.target.hash_into(hasher);
            }
            for explosion in self.explosions.values() {
                hasher.update_u32(explosion.id.0);
                hasher.update_u8(explosion.kind as u8);
                hasher.update_u32(explosion.remaining_ticks);
            }
            hasher.update_u32(self.next_id);
            // Collision tie-breaks draw from this stream, so two
            // engines that consumed it differently must not collide.
            let rng_state = self.sim_rng.state();
            hasher.update_u64(rng_state[0]);
            hasher.update_u64(rng_state[1]);
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
