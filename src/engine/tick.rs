//! Per-Tick Simulation Pipeline
//!
//! One `tick()` advances the whole match by 20ms through six strictly
//! ordered phases, each consuming the full output of the previous one:
//!
//! 1. Action resolution (cooldowns, the per-unit state machine)
//! 2. Effects (missiles, then explosion aging)
//! 3. Boundary collision
//! 4. Unit-unit collision
//! 5. Death
//! 6. Corpse decay
//!
//! Everything iterates ascending by id, so two engines fed the same
//! seed and command sequence replay bit-identically.

use tracing::debug;

use crate::engine::catalog;
use crate::engine::combat::move_unit_towards;
use crate::engine::events::EngineEvent;
use crate::engine::state::{Action, Corpse, Engine, Order, OrderTarget, Unit, UnitId};
use crate::TICK_DT;

impl Engine {
    /// Run one simulation tick and return the notifications it emitted.
    ///
    /// Not reentrant; the driver must let each call finish before the
    /// next. External commands are applied between calls.
    pub fn tick(&mut self) -> Vec<EngineEvent> {
        let dt = TICK_DT;
        self.advance_clock();

        // 1. Actions
        self.resolve_actions(dt);

        // 2. Effects
        self.advance_missiles(dt);
        self.age_explosions();

        // 3-4. Collisions
        self.resolve_boundary_collisions(dt);
        self.resolve_unit_collisions(dt);

        // 5-6. Death and decay
        let fresh_corpses = self.process_deaths();
        self.process_decay(&fresh_corpses);

        self.take_events()
    }

    /// Phase 1: cooldowns, then the action state machine, per unit in
    /// ascending id order. Each unit is detached from the map while it
    /// resolves so it can read and damage the others.
    fn resolve_actions(&mut self, dt: f64) {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        for id in ids {
            let Some(mut unit) = self.units.remove(&id) else {
                continue;
            };
            self.resolve_unit_action(&mut unit, dt);
            self.units.insert(id, unit);
        }
    }

    fn resolve_unit_action(&mut self, unit: &mut Unit, dt: f64) {
        if unit.attack_cooldown > 0 {
            unit.attack_cooldown -= 1;
        }
        if unit.cast_cooldown > 0 {
            unit.cast_cooldown -= 1;
        }

        match unit.action {
            Action::Order(order) => self.resolve_order(unit, order, dt),
            Action::PerformingAttack {
                next,
                remaining_ticks,
            } => {
                if remaining_ticks <= 1 {
                    unit.attack_cooldown = catalog::unit_primary_attack_spec(unit.kind).cooldown_ticks;
                    unit.action = Action::Order(next);
                } else {
                    unit.action = Action::PerformingAttack {
                        next,
                        remaining_ticks: remaining_ticks - 1,
                    };
                }
            }
            Action::PerformingCast {
                kind,
                next,
                remaining_ticks,
            } => {
                if remaining_ticks <= 1 {
                    unit.cast_cooldown = catalog::cast_spec(kind).cooldown_ticks;
                    unit.action = Action::Order(next);
                } else {
                    unit.action = Action::PerformingCast {
                        kind,
                        next,
                        remaining_ticks: remaining_ticks - 1,
                    };
                }
            }
        }
    }

    fn resolve_order(&mut self, unit: &mut Unit, order: Order, dt: f64) {
        match order {
            Order::Stop { engaged } => {
                let engaged = self.refresh_engagement(unit, engaged);
                unit.action = Action::Order(Order::Stop { engaged });
                if let Some(target_id) = engaged {
                    self.try_fire_at(unit, target_id, Order::Stop { engaged }, dt);
                }
            }

            Order::Move { target } => match target {
                OrderTarget::Point(point) => {
                    if move_unit_towards(unit, dt, point) {
                        unit.action = Action::Order(Order::STOP);
                    }
                }
                // Continuous intercept: chase the target's current
                // position every tick, never self-clearing.
                OrderTarget::Unit(target_id) => {
                    match self.units.get(&target_id).map(|t| t.position) {
                        Some(point) => {
                            move_unit_towards(unit, dt, point);
                        }
                        None => unit.action = Action::Order(Order::STOP),
                    }
                }
            },

            Order::Attack { target, engaged } => match target {
                OrderTarget::Unit(target_id) => {
                    if self.unit_is_alive(target_id) {
                        self.try_fire_at(unit, target_id, order, dt);
                    } else {
                        unit.action = Action::Order(Order::STOP);
                    }
                }
                OrderTarget::Point(point) => {
                    let engaged = self.refresh_engagement(unit, engaged);
                    unit.action = Action::Order(Order::Attack { target, engaged });
                    match engaged {
                        Some(target_id) => {
                            self.try_fire_at(
                                unit,
                                target_id,
                                Order::Attack { target, engaged },
                                dt,
                            );
                        }
                        // No enemy in trigger range: advance on the
                        // point instead of idling.
                        None => {
                            move_unit_towards(unit, dt, point);
                        }
                    }
                }
            },

            Order::Cast { kind, target } => {
                if self.apply_cast(unit, kind, target, dt) {
                    unit.action = Action::PerformingCast {
                        kind,
                        next: Order::STOP,
                        remaining_ticks: catalog::cast_spec(kind).duration_ticks,
                    };
                }
            }
        }
    }

    /// Fire the primary attack at `target_id` if the cooldown allows,
    /// transitioning into PerformingAttack carrying `resume` on success.
    fn try_fire_at(&mut self, unit: &mut Unit, target_id: UnitId, resume: Order, dt: f64) {
        if unit.attack_cooldown == 0 && self.apply_attack(unit, target_id, dt) {
            let spec = catalog::unit_primary_attack_spec(unit.kind);
            unit.action = Action::PerformingAttack {
                next: resume,
                remaining_ticks: spec.duration_ticks,
            };
        }
    }

    /// Keep a live cached target, drop a dead one (re-acquired next
    /// tick), or lazily acquire when none is cached.
    fn refresh_engagement(&self, unit: &Unit, cached: Option<UnitId>) -> Option<UnitId> {
        match cached {
            Some(id) if self.unit_is_alive(id) => Some(id),
            Some(_) => None,
            None => self.find_closest_target(unit),
        }
    }

    fn unit_is_alive(&self, id: UnitId) -> bool {
        self.units.get(&id).is_some_and(|u| u.hp > 0.0)
    }

    /// Phase 2b: age explosions; damage was applied at creation, so
    /// aging only counts down the visual lifetime.
    fn age_explosions(&mut self) {
        let expired: Vec<UnitId> = self
            .explosions
            .iter_mut()
            .filter_map(|(id, explosion)| {
                explosion.remaining_ticks = explosion.remaining_ticks.saturating_sub(1);
                (explosion.remaining_ticks == 0).then_some(*id)
            })
            .collect();
        for id in expired {
            self.explosions.remove(&id);
        }
    }

    /// Phase 3: push units penetrating the arena edge back toward the
    /// interior by at most `2 * max_velocity * dt` per axis.
    fn resolve_boundary_collisions(&mut self, dt: f64) {
        let arena = self.arena;
        for unit in self.units.values_mut() {
            let radius = unit.radius();
            let cap = 2.0 * unit.max_velocity() * dt;

            let left_pen = (arena.left + radius) - unit.position.x;
            if left_pen > 0.0 {
                unit.position.x += left_pen.min(cap);
            }
            let right_pen = unit.position.x - (arena.right - radius);
            if right_pen > 0.0 {
                unit.position.x -= right_pen.min(cap);
            }
            let top_pen = (arena.top + radius) - unit.position.y;
            if top_pen > 0.0 {
                unit.position.y += top_pen.min(cap);
            }
            let bottom_pen = unit.position.y - (arena.bottom - radius);
            if bottom_pen > 0.0 {
                unit.position.y -= bottom_pen.min(cap);
            }
        }
    }

    /// Phase 5: units with no hp left or an expired ttl become corpses
    /// under the same id. Returns the fresh corpse ids so decay skips
    /// them this tick.
    fn process_deaths(&mut self) -> Vec<UnitId> {
        for unit in self.units.values_mut() {
            if let Some(ttl) = &mut unit.ttl {
                *ttl = ttl.saturating_sub(1);
            }
        }

        let dead: Vec<UnitId> = self
            .units
            .iter()
            .filter(|(_, unit)| unit.is_expired())
            .map(|(id, _)| *id)
            .collect();

        for id in &dead {
            if let Some(unit) = self.units.remove(id) {
                debug!(unit = %id, "unit died");
                self.corpses.insert(*id, Corpse::new(unit));
            }
        }
        dead
    }

    /// Phase 6: count down corpse decay; corpses created this tick
    /// keep their full countdown until next tick.
    fn process_decay(&mut self, fresh: &[UnitId]) {
        let expired: Vec<UnitId> = self
            .corpses
            .iter_mut()
            .filter(|(id, _)| !fresh.contains(id))
            .filter_map(|(id, corpse)| {
                corpse.decay_remaining_ticks = corpse.decay_remaining_ticks.saturating_sub(1);
                (corpse.decay_remaining_ticks == 0).then_some(*id)
            })
            .collect();
        for id in expired {
            self.corpses.remove(&id);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geom::{Position, Rect};
    use crate::engine::catalog::{CastKind, UnitKind};
    use crate::engine::state::Team;
    use crate::CORPSE_DECAY_TICKS;

    fn test_engine() -> Engine {
        Engine::new(Rect::new(-100.0, -100.0, 100.0, 100.0), 2024).unwrap()
    }

    #[test]
    fn test_idle_unit_is_unchanged() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Crusader, Team::Red, Position::new(3.0, 4.0), 1.0);

        let before = engine.unit(id).unwrap().clone();
        engine.tick();
        let after = engine.unit(id).unwrap();

        assert_eq!(after.position, before.position);
        assert_eq!(after.orientation, before.orientation);
        assert_eq!(after.hp, before.hp);
        assert_eq!(after.attack_cooldown, before.attack_cooldown);
        assert_eq!(after.cast_cooldown, before.cast_cooldown);
        assert_eq!(after.action, before.action);
    }

    #[test]
    fn test_cooldowns_monotonic_and_never_negative() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        {
            let unit = engine.units.get_mut(&id).unwrap();
            unit.attack_cooldown = 3;
            unit.cast_cooldown = 1;
        }

        let mut last = (3u32, 1u32);
        for _ in 0..10 {
            engine.tick();
            let unit = engine.unit(id).unwrap();
            assert!(unit.attack_cooldown <= last.0);
            assert!(unit.cast_cooldown <= last.1);
            last = (unit.attack_cooldown, unit.cast_cooldown);
        }
        assert_eq!(last, (0, 0));
    }

    #[test]
    fn test_move_converges_and_becomes_stop() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        // Within one tick's step (0.16)
        let target = Position::new(0.1, 0.0);
        engine.set_unit_action(id, Order::move_to(target));

        engine.tick();
        let unit = engine.unit(id).unwrap();
        assert_eq!(unit.position, target);
        assert_eq!(unit.action, Action::Order(Order::STOP));
    }

    #[test]
    fn test_move_to_vanished_unit_degrades_to_stop() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        let quarry = engine.create_unit(UnitKind::Seal, Team::Red, Position::new(30.0, 0.0), 0.0);
        engine.set_unit_action(id, Order::follow(quarry));

        engine.tick();
        assert!(matches!(
            engine.unit(id).unwrap().action,
            Action::Order(Order::Move { .. })
        ));

        engine.units.remove(&quarry);
        engine.tick();
        assert_eq!(engine.unit(id).unwrap().action, Action::Order(Order::STOP));
    }

    #[test]
    fn test_follow_intercepts_moving_target() {
        let mut engine = test_engine();
        let chaser = engine.create_unit(UnitKind::Beetle, Team::Red, Position::ORIGIN, 0.0);
        let quarry = engine.create_unit(UnitKind::Seal, Team::Red, Position::new(10.0, 0.0), 0.0);
        engine.set_unit_action(chaser, Order::follow(quarry));
        engine.set_unit_action(quarry, Order::move_to(Position::new(10.0, 5.0)));

        for _ in 0..60 {
            engine.tick();
        }
        // Beetle (10 u/s) caught up with the seal
        let chaser_pos = engine.unit(chaser).unwrap().position;
        let quarry_pos = engine.unit(quarry).unwrap().position;
        assert!(chaser_pos.distance(quarry_pos) < 3.0);
        // Follow never self-clears
        assert!(matches!(
            engine.unit(chaser).unwrap().action,
            Action::Order(Order::Move { .. })
        ));
    }

    #[test]
    fn test_boundary_containment() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::new(-98.0, 0.0), 0.0);
        engine.set_unit_action(id, Order::move_to(Position::new(-200.0, 0.0)));

        for _ in 0..100 {
            engine.tick();
            let unit = engine.unit(id).unwrap();
            let radius = unit.radius();
            assert!(unit.position.x >= engine.arena().left + radius - 1e-9);
            assert!(unit.position.x <= engine.arena().right - radius + 1e-9);
            assert!(unit.position.y >= engine.arena().top + radius - 1e-9);
            assert!(unit.position.y <= engine.arena().bottom - radius + 1e-9);
        }
    }

    #[test]
    fn test_attack_cycle_full_sequence() {
        let mut engine = test_engine();
        // Lone enemy 4 units away, attacker already facing it
        let seal = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        let enemy = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(4.0, 0.0), 0.0);

        // Keep the enemy from fighting back at the attacker
        engine.units.get_mut(&enemy).unwrap().hp = 1e9;

        // Tick 1: acquire + fire (4 < 5 + 1 + 1), damage lands, swing starts
        engine.tick();
        assert_eq!(engine.unit(enemy).unwrap().hp, 1e9 - 10.0);
        match engine.unit(seal).unwrap().action {
            Action::PerformingAttack {
                remaining_ticks, ..
            } => assert_eq!(remaining_ticks, 20),
            ref other => panic!("expected swing, got {:?}", other),
        }

        // 19 more ticks still mid-swing, no extra damage
        for _ in 0..19 {
            engine.tick();
            assert!(engine.unit(seal).unwrap().action.is_performing());
        }
        assert_eq!(engine.unit(enemy).unwrap().hp, 1e9 - 10.0);

        // 20th tick after firing: back to Stop with cooldown set
        engine.tick();
        let unit = engine.unit(seal).unwrap();
        assert!(matches!(unit.action, Action::Order(Order::Stop { .. })));
        assert_eq!(unit.attack_cooldown, 30);
    }

    #[test]
    fn test_stop_clears_dead_target_and_reacquires() {
        let mut engine = test_engine();
        let seal = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        let near = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(4.0, 0.0), 0.0);
        let other = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(0.0, 5.0), 0.0);

        engine.tick();
        assert!(matches!(
            engine.unit(seal).unwrap().action,
            Action::PerformingAttack { .. }
        ));

        // First victim dies; after the swing and cooldown the seal
        // re-acquires the other enemy
        engine.units.get_mut(&near).unwrap().hp = 0.0;
        for _ in 0..60 {
            engine.tick();
        }
        match engine.unit(seal).unwrap().action {
            Action::Order(Order::Stop { engaged }) => assert_eq!(engaged, Some(other)),
            Action::PerformingAttack { next, .. } => {
                assert_eq!(next, Order::Stop { engaged: Some(other) })
            }
            ref action => panic!("unexpected action {:?}", action),
        }
    }

    #[test]
    fn test_attack_move_walks_when_no_enemy() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        engine.set_unit_action(id, Order::attack_move(Position::new(50.0, 0.0)));

        engine.tick();
        let unit = engine.unit(id).unwrap();
        assert!(unit.position.x > 0.0);
        // The order is kept even while walking
        assert!(matches!(
            unit.action,
            Action::Order(Order::Attack { .. })
        ));
    }

    #[test]
    fn test_attack_move_engages_enemy_on_path() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        let enemy = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(5.0, 0.0), 0.0);
        engine.units.get_mut(&enemy).unwrap().hp = 1e9;
        engine.set_unit_action(id, Order::attack_move(Position::new(50.0, 0.0)));

        engine.tick();
        // Enemy sits inside trigger reach (5 < 1+1+7): engaged and fired
        assert_eq!(engine.unit(enemy).unwrap().hp, 1e9 - 10.0);
        assert!(engine.unit(id).unwrap().action.is_performing());
    }

    #[test]
    fn test_locked_attack_degrades_when_target_vanishes() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        let victim = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(40.0, 0.0), 0.0);
        engine.set_unit_action(id, Order::attack_unit(victim));

        engine.tick();
        engine.units.remove(&victim);
        engine.corpses.clear();
        engine.tick();

        assert_eq!(engine.unit(id).unwrap().action, Action::Order(Order::STOP));
    }

    #[test]
    fn test_cast_cycle_sets_cast_cooldown() {
        let mut engine = test_engine();
        let caster = engine.create_unit(UnitKind::Contaminator, Team::Red, Position::ORIGIN, 0.0);
        let target = Position::new(5.0, 0.0);
        engine.set_unit_action(caster, Order::cast(CastKind::Pestilence, target));

        // In range (5 < 14 + 1.4) and facing: fires on the first tick
        engine.tick();
        assert_eq!(engine.missiles().len(), 1);
        match engine.unit(caster).unwrap().action {
            Action::PerformingCast {
                kind,
                remaining_ticks,
                ..
            } => {
                assert_eq!(kind, CastKind::Pestilence);
                assert_eq!(remaining_ticks, 40);
            }
            ref other => panic!("expected cast, got {:?}", other),
        }

        for _ in 0..40 {
            engine.tick();
        }
        let unit = engine.unit(caster).unwrap();
        assert!(matches!(unit.action, Action::Order(Order::Stop { .. })));
        // 150 set at expiry minus the decrements since
        assert!(unit.cast_cooldown > 140 && unit.cast_cooldown <= 150);
    }

    #[test]
    fn test_death_to_corpse_and_decay() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        engine.units.get_mut(&id).unwrap().hp = 0.0;

        engine.tick();
        assert!(engine.unit(id).is_none());
        let corpse = engine.corpses().get(&id).expect("corpse exists");
        assert_eq!(corpse.decay_remaining_ticks, CORPSE_DECAY_TICKS);

        // Exactly 150 further ticks until the corpse is gone
        for i in 0..CORPSE_DECAY_TICKS - 1 {
            engine.tick();
            assert!(engine.corpses().contains_key(&id), "gone after {} ticks", i + 1);
        }
        engine.tick();
        assert!(!engine.corpses().contains_key(&id));
    }

    #[test]
    fn test_beetle_ttl_expiry() {
        let mut engine = test_engine();
        let id = engine.create_unit(UnitKind::Beetle, Team::Red, Position::ORIGIN, 0.0);

        for _ in 0..crate::BEETLE_TTL_TICKS - 1 {
            engine.tick();
            assert!(engine.unit(id).is_some());
        }
        engine.tick();
        assert!(engine.unit(id).is_none());
        assert!(engine.corpses().contains_key(&id));
    }

    #[test]
    fn test_explosion_ages_out_without_redamaging() {
        let mut engine = test_engine();
        let victim = engine.create_unit(UnitKind::Crusader, Team::Blue, Position::new(1.0, 0.0), 0.0);
        engine.spawn_explosion(
            crate::engine::catalog::EffectKind::Pestilence,
            Team::Red,
            Position::ORIGIN,
        );
        let hp_after_blast = engine.unit(victim).unwrap().hp;
        assert_eq!(hp_after_blast, 200.0 - 12.0);

        let mut seen = false;
        for _ in 0..30 {
            engine.tick();
            seen |= !engine.explosions().is_empty();
        }
        assert!(seen);
        assert!(engine.explosions().is_empty());
        assert_eq!(engine.unit(victim).unwrap().hp, hp_after_blast);
    }

    #[test]
    fn test_clock_advances_20ms_per_tick() {
        let mut engine = test_engine();
        assert_eq!(engine.tick_no(), 0);
        assert_eq!(engine.clock_ns(), 0);
        for _ in 0..50 {
            engine.tick();
        }
        assert_eq!(engine.tick_no(), 50);
        // 50 ticks at 20ms = one second
        assert_eq!(engine.clock_ns(), 1_000_000_000);
    }

    #[test]
    fn test_tick_determinism() {
        let run = || {
            let mut engine = test_engine();
            let seal = engine.create_unit(UnitKind::Seal, Team::Red, Position::new(-20.0, 0.0), 0.0);
            let goon = engine.create_unit(UnitKind::Goon, Team::Red, Position::new(-25.0, 5.0), 0.0);
            let crusader =
                engine.create_unit(UnitKind::Crusader, Team::Blue, Position::new(20.0, 0.0), 0.0);
            let caster =
                engine.create_unit(UnitKind::Contaminator, Team::Blue, Position::new(25.0, -5.0), 0.0);

            engine.set_unit_action(seal, Order::attack_move(Position::new(20.0, 0.0)));
            engine.set_unit_action(goon, Order::attack_unit(crusader));
            engine.set_unit_action(crusader, Order::attack_move(Position::new(-20.0, 0.0)));
            engine.set_unit_action(
                caster,
                Order::cast(CastKind::Pestilence, Position::new(-15.0, 0.0)),
            );

            for _ in 0..500 {
                engine.tick();
            }
            engine.compute_hash()
        };

        assert_eq!(run(), run());
    }
}
