//! Combat and Projectile Resolution
//!
//! Facing/approach/range gating for attacks and casts, homing missile
//! flight, one-shot explosion damage and target acquisition.
//!
//! Units being resolved are detached from the unit map by the tick
//! loop, so these methods can freely read and damage other units.

use tracing::trace;

use crate::core::geom::{wrap_angle, Position};
use crate::engine::catalog::{self, AttackKind, CastKind, EffectKind};
use crate::engine::events::{EngineEvent, SoundEvent};
use crate::engine::state::{Engine, Missile, MissileKind, MissileTarget, Team, Unit, UnitId};

/// Facing must match within one degree before an attack or cast fires.
pub const FACING_TOLERANCE: f64 = std::f64::consts::PI / 180.0;

/// Turn a unit toward `desired` by at most its angular budget for this
/// tick, along the shortest signed delta; snaps when within budget.
pub fn rotate_unit(unit: &mut Unit, dt: f64, desired: f64) {
    let delta = wrap_angle(desired - unit.orientation);
    let budget = catalog::unit_max_angular_velocity(unit.kind) * dt;
    if delta.abs() <= budget {
        unit.orientation = wrap_angle(desired);
    } else {
        unit.orientation = wrap_angle(unit.orientation + budget * delta.signum());
    }
}

/// Turn toward and step toward `target` by at most `max_velocity * dt`,
/// landing exactly on it without overshoot.
///
/// Returns whether the unit arrived this tick.
pub fn move_unit_towards(unit: &mut Unit, dt: f64, target: Position) -> bool {
    let offset = target - unit.position;
    let dist = offset.length();
    if dist < crate::core::geom::LENGTH_EPSILON {
        return true;
    }
    rotate_unit(unit, dt, offset.orientation());
    let step = unit.max_velocity() * dt;
    if dist <= step {
        unit.position = target;
        true
    } else {
        unit.position = unit.position + offset.with_length(step);
        false
    }
}

/// Face and close on `target`, stopping at `threshold` distance.
///
/// Returns whether the unit is both inside the threshold and facing
/// within [`FACING_TOLERANCE`] after this tick's rotation.
fn approach_and_face(unit: &mut Unit, dt: f64, target: Position, threshold: f64) -> bool {
    let to_target = target - unit.position;
    let dist = to_target.length();
    let desired = to_target.orientation();
    rotate_unit(unit, dt, desired);
    if dist > threshold {
        let step = (unit.max_velocity() * dt).min(dist - threshold);
        unit.position = unit.position + to_target.with_length(step);
        return false;
    }
    wrap_angle(desired - unit.orientation).abs() <= FACING_TOLERANCE
}

impl Engine {
    /// Drive `attacker` toward its target and fire the primary attack
    /// once in range and facing. Returns whether the attack fired this
    /// tick.
    ///
    /// The attacker must be detached from the unit map; the target is
    /// re-resolved by id so a vanished target simply never fires.
    pub(crate) fn apply_attack(&mut self, attacker: &mut Unit, target_id: UnitId, dt: f64) -> bool {
        let Some((target_position, target_radius)) = self
            .units
            .get(&target_id)
            .map(|t| (t.position, t.radius()))
        else {
            return false;
        };

        let attack = attacker.kind.primary_attack();
        let spec = catalog::attack_spec(attack);
        let threshold = spec.range + attacker.radius() + target_radius;
        if !approach_and_face(attacker, dt, target_position, threshold) {
            return false;
        }

        if attack.is_melee() {
            if let Some(target) = self.units.get_mut(&target_id) {
                target.apply_damage(spec.damage);
                trace!(attacker = %attacker.id, target = %target_id, damage = spec.damage, "melee hit");
            }
            self.push_event(EngineEvent::sound(SoundEvent::MeleeAttack, attacker.position));
        } else {
            debug_assert_eq!(attack, AttackKind::GoonRocket);
            self.spawn_missile(
                MissileKind::Rocket,
                attacker.team,
                attacker.position,
                attacker.orientation,
                MissileTarget::Homing {
                    unit: target_id,
                    last_position: target_position,
                },
            );
            self.push_event(EngineEvent::sound(SoundEvent::RocketLaunch, attacker.position));
        }
        true
    }

    /// Drive `caster` toward the target point and release the cast once
    /// in range, facing, and off cooldown. Returns whether the cast
    /// fired this tick.
    pub(crate) fn apply_cast(
        &mut self,
        caster: &mut Unit,
        kind: CastKind,
        target: Position,
        dt: f64,
    ) -> bool {
        let spec = catalog::cast_spec(kind);
        // A point target has no radius; only the caster's counts.
        let threshold = spec.range + caster.radius();
        if !approach_and_face(caster, dt, target, threshold) {
            return false;
        }
        if caster.cast_cooldown > 0 {
            return false;
        }

        match kind {
            CastKind::Pestilence => {
                self.spawn_missile(
                    MissileKind::Pestilence,
                    caster.team,
                    caster.position,
                    caster.orientation,
                    MissileTarget::Point(target),
                );
            }
            CastKind::SpawnBeetle => {
                // Id allocation is centralized in the authoritative
                // owner; the engine only raises the request.
                self.push_event(EngineEvent::create_requested(
                    catalog::UnitKind::Beetle,
                    caster.team,
                    target,
                    caster.orientation,
                    kind,
                ));
                self.push_event(EngineEvent::sound(SoundEvent::BeetleSpawn, target));
            }
        }
        trace!(caster = %caster.id, ?kind, "cast released");
        true
    }

    /// The nearest living enemy within this unit's auto-engage reach
    /// (`radius + enemy radius + trigger_range`). Strictly closest wins;
    /// ties keep the first encountered (lowest id).
    pub fn find_closest_target(&self, unit: &Unit) -> Option<UnitId> {
        let spec = catalog::unit_primary_attack_spec(unit.kind);
        let mut best: Option<(UnitId, f64)> = None;
        for (id, other) in &self.units {
            if !unit.team.is_enemy_of(other.team) || other.hp <= 0.0 {
                continue;
            }
            let dist = unit.position.distance(other.position);
            if dist > unit.radius() + other.radius() + spec.trigger_range {
                continue;
            }
            match best {
                Some((_, best_dist)) if best_dist <= dist => {}
                _ => best = Some((*id, dist)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Insert a new missile.
    pub(crate) fn spawn_missile(
        &mut self,
        kind: MissileKind,
        team: Team,
        position: Position,
        orientation: f64,
        target: MissileTarget,
    ) {
        let id = self.allocate_id();
        self.missiles.insert(
            id,
            Missile {
                id,
                kind,
                team,
                position,
                orientation,
                target,
            },
        );
    }

    /// Advance every missile by one tick, ascending by id.
    ///
    /// Homing missiles re-aim at their target's current position every
    /// tick; a vanished target degrades to its last known point. On
    /// arrival a rocket applies its direct-hit damage, then the
    /// missile's explosion spawns at the impact point.
    pub(crate) fn advance_missiles(&mut self, dt: f64) {
        let ids: Vec<UnitId> = self.missiles.keys().copied().collect();
        for id in ids {
            let Some(mut missile) = self.missiles.remove(&id) else {
                continue;
            };

            let aim = match &mut missile.target {
                MissileTarget::Homing {
                    unit,
                    last_position,
                } => {
                    if let Some(target) = self.units.get(unit) {
                        *last_position = target.position;
                    }
                    *last_position
                }
                MissileTarget::Point(p) => *p,
            };

            let to_aim = aim - missile.position;
            let dist = to_aim.length();
            if dist >= crate::core::geom::LENGTH_EPSILON {
                missile.orientation = to_aim.orientation();
            }

            let travel = missile.kind.velocity() * dt;
            if travel >= dist {
                self.detonate_missile(missile, aim);
            } else {
                missile.position = missile.position + to_aim.with_length(travel);
                self.missiles.insert(id, missile);
            }
        }
    }

    /// Resolve a missile's arrival at `impact`.
    fn detonate_missile(&mut self, missile: Missile, impact: Position) {
        match missile.kind {
            MissileKind::Rocket => {
                // Direct hit only lands on a target that is still alive.
                if let MissileTarget::Homing { unit, .. } = missile.target {
                    let damage = catalog::attack_spec(AttackKind::GoonRocket).damage;
                    if let Some(target) = self.units.get_mut(&unit) {
                        target.apply_damage(damage);
                    }
                }
                self.push_event(EngineEvent::sound(SoundEvent::RocketExplosion, impact));
            }
            MissileKind::Pestilence => {
                self.push_event(EngineEvent::sound(SoundEvent::PestilenceSplash, impact));
            }
        }
        self.spawn_explosion(missile.kind.effect(), missile.team, impact);
    }

    /// Create an explosion, applying its area damage exactly once.
    ///
    /// Damage reaches every unit within `blast range + unit radius` of
    /// the impact point; same-team units are spared unless the effect
    /// has friendly fire. Later aging never re-applies damage.
    pub(crate) fn spawn_explosion(&mut self, kind: EffectKind, team: Team, position: Position) {
        let spec = catalog::effect_spec(kind);
        for unit in self.units.values_mut() {
            if !spec.friendly_fire && unit.team == team {
                continue;
            }
            if position.distance(unit.position) <= spec.range + unit.radius() {
                unit.apply_damage(spec.damage);
            }
        }

        let id = self.allocate_id();
        self.explosions.insert(
            id,
            crate::engine::state::Explosion {
                id,
                kind,
                position,
                remaining_ticks: spec.duration_ticks,
            },
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
