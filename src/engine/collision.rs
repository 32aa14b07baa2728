//! Unit-Unit Collision Resolution
//!
//! Units are circles; overlapping pairs are pushed apart symmetrically.
//! The pass is O(n^2) over ascending id pairs and accumulates all pair
//! corrections before applying them, so the outcome never depends on
//! map iteration internals and replays identically for a given seed.

use std::collections::BTreeMap;

use crate::core::geom::Offset;
use crate::engine::state::{Engine, UnitId};

/// Below this separation two centers count as coincident and the push
/// direction comes from the simulation stream instead of the offset.
const COINCIDENT_EPSILON: f64 = 1e-5;

/// Fraction of one tick's travel a unit may be displaced by collision
/// resolution. Keeping it under 1.0 lets deliberate movement win
/// against crowd pressure.
const PUSH_SPEED_FACTOR: f64 = 0.9;

impl Engine {
    /// Phase 4: separate every overlapping unit pair.
    ///
    /// Each overlap contributes half its penetration depth to both
    /// units, pointing away from each other. The summed correction per
    /// unit is then capped at `0.9 * max_velocity * dt` so a crowded
    /// unit drifts out over several ticks rather than teleporting.
    pub(crate) fn resolve_unit_collisions(&mut self, dt: f64) {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        if ids.len() < 2 {
            return;
        }

        let mut pushes: BTreeMap<UnitId, Offset> = BTreeMap::new();

        for (i, &id_a) in ids.iter().enumerate() {
            for &id_b in &ids[i + 1..] {
                let (pos_a, radius_a) = {
                    let a = &self.units[&id_a];
                    (a.position, a.radius())
                };
                let (pos_b, radius_b) = {
                    let b = &self.units[&id_b];
                    (b.position, b.radius())
                };

                let diff = pos_b - pos_a;
                let distance = diff.length();
                let min_distance = radius_a + radius_b;
                if distance >= min_distance {
                    continue;
                }

                let direction = if distance < COINCIDENT_EPSILON {
                    self.sim_rng.next_direction()
                } else {
                    diff.scale(1.0 / distance)
                };

                let half_depth = (min_distance - distance) * 0.5;
                let push = direction.scale(half_depth);
                let accumulated_a = pushes.entry(id_a).or_insert(Offset::ZERO);
                *accumulated_a = *accumulated_a - push;
                let accumulated_b = pushes.entry(id_b).or_insert(Offset::ZERO);
                *accumulated_b = *accumulated_b + push;
            }
        }

        for (id, push) in pushes {
            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };
            let cap = PUSH_SPEED_FACTOR * unit.max_velocity() * dt;
            let applied = if push.length() > cap {
                push.with_length(cap)
            } else {
                push
            };
            unit.position = unit.position + applied;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::core::geom::{Position, Rect};
    use crate::engine::catalog::UnitKind;
    use crate::engine::state::{Engine, Team};
    use crate::TICK_DT;

    fn test_engine() -> Engine {
        Engine::new(Rect::new(-100.0, -100.0, 100.0, 100.0), 7).unwrap()
    }

    #[test]
    fn test_separated_units_are_untouched() {
        let mut engine = test_engine();
        let a = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
        let b = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(5.0, 0.0), 0.0);

        engine.resolve_unit_collisions(TICK_DT);

        assert_eq!(engine.unit(a).unwrap().position, Position::ORIGIN);
        assert_eq!(engine.unit(b).unwrap().position, Position::new(5.0, 0.0));
    }

    #[test]
    fn test_overlapping_pair_pushed_apart_symmetrically() {
        let mut engine = test_engine();
        // Two seals (radius 1.0) with centers 1.0 apart: depth 1.0
        let a = engine.create_unit(UnitKind::Seal, Team::Red, Position::new(-0.5, 0.0), 0.0);
        let b = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(0.5, 0.0), 0.0);

        engine.resolve_unit_collisions(TICK_DT);

        let pos_a = engine.unit(a).unwrap().position;
        let pos_b = engine.unit(b).unwrap().position;
        // Half depth 0.5 each, capped at 0.9 * 8.0 * 0.02 = 0.144
        assert!((pos_a.x - (-0.644)).abs() < 1e-12);
        assert!((pos_b.x - 0.644).abs() < 1e-12);
        assert_eq!(pos_a.y, 0.0);
        assert_eq!(pos_b.y, 0.0);
    }

    #[test]
    fn test_overlap_shrinks_every_pass() {
        let mut engine = test_engine();
        let a = engine.create_unit(UnitKind::Crusader, Team::Red, Position::new(-0.3, 0.1), 0.0);
        let b = engine.create_unit(UnitKind::Crusader, Team::Blue, Position::new(0.3, -0.1), 0.0);

        let mut last_gap = engine
            .unit(a)
            .unwrap()
            .position
            .distance(engine.unit(b).unwrap().position);

        for _ in 0..100 {
            engine.resolve_unit_collisions(TICK_DT);
            let gap = engine
                .unit(a)
                .unwrap()
                .position
                .distance(engine.unit(b).unwrap().position);
            assert!(gap >= last_gap);
            last_gap = gap;
        }
        // Fully separated: crusader radius is 1.5
        assert!(last_gap >= 3.0 - 1e-9);
    }

    #[test]
    fn test_coincident_centers_still_separate() {
        let mut engine = test_engine();
        let a = engine.create_unit(UnitKind::Seal, Team::Red, Position::new(2.0, 2.0), 0.0);
        let b = engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(2.0, 2.0), 0.0);

        for _ in 0..200 {
            engine.resolve_unit_collisions(TICK_DT);
        }

        let gap = engine
            .unit(a)
            .unwrap()
            .position
            .distance(engine.unit(b).unwrap().position);
        assert!(gap >= 2.0 - 1e-9);
    }

    #[test]
    fn test_coincident_separation_is_deterministic() {
        let run = || {
            let mut engine = test_engine();
            let a = engine.create_unit(UnitKind::Seal, Team::Red, Position::ORIGIN, 0.0);
            let b = engine.create_unit(UnitKind::Seal, Team::Blue, Position::ORIGIN, 0.0);
            for _ in 0..50 {
                engine.resolve_unit_collisions(TICK_DT);
            }
            (
                engine.unit(a).unwrap().position,
                engine.unit(b).unwrap().position,
            )
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_push_capped_by_unit_speed() {
        let mut engine = test_engine();
        // Crusader (6.0 u/s) and a beetle (10.0 u/s) deeply overlapped
        let slow = engine.create_unit(UnitKind::Crusader, Team::Red, Position::new(-0.1, 0.0), 0.0);
        let fast = engine.create_unit(UnitKind::Beetle, Team::Blue, Position::new(0.1, 0.0), 0.0);

        engine.resolve_unit_collisions(TICK_DT);

        let moved_slow = engine
            .unit(slow)
            .unwrap()
            .position
            .distance(Position::new(-0.1, 0.0));
        let moved_fast = engine
            .unit(fast)
            .unwrap()
            .position
            .distance(Position::new(0.1, 0.0));
        assert!((moved_slow - 0.9 * 6.0 * TICK_DT).abs() < 1e-12);
        assert!((moved_fast - 0.9 * 10.0 * TICK_DT).abs() < 1e-12);
    }

    #[test]
    fn test_cluster_of_three_spreads_out() {
        let mut engine = test_engine();
        let ids = [
            engine.create_unit(UnitKind::Seal, Team::Red, Position::new(0.0, 0.2), 0.0),
            engine.create_unit(UnitKind::Seal, Team::Red, Position::new(-0.2, -0.1), 0.0),
            engine.create_unit(UnitKind::Seal, Team::Blue, Position::new(0.2, -0.1), 0.0),
        ];

        for _ in 0..300 {
            engine.resolve_unit_collisions(TICK_DT);
        }

        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let gap = engine
                    .unit(a)
                    .unwrap()
                    .position
                    .distance(engine.unit(b).unwrap().position);
                assert!(gap >= 2.0 - 1e-6, "{} and {} still overlap", a, b);
            }
        }
    }
}
