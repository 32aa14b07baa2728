//! Static Descriptor Tables
//!
//! Pure, immutable lookup tables for per-unit-kind and per-attack-kind
//! combat parameters. Implemented as exhaustive matches over closed
//! enums - no mutable global state, no errors.

use serde::{Deserialize, Serialize};

/// Kind of a combat unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UnitKind {
    /// Fast melee skirmisher
    Seal = 0,
    /// Heavy melee bruiser
    Crusader = 1,
    /// Ranged rocket infantry
    Goon = 2,
    /// Short-lived summoned swarmer
    Beetle = 3,
    /// Caster: pestilence and beetle spawning
    Contaminator = 4,
}

impl UnitKind {
    /// The primary attack used when this unit engages.
    #[inline]
    pub fn primary_attack(self) -> AttackKind {
        match self {
            UnitKind::Seal => AttackKind::SealBite,
            UnitKind::Crusader => AttackKind::CrusaderBlade,
            UnitKind::Goon => AttackKind::GoonRocket,
            UnitKind::Beetle => AttackKind::BeetleMandibles,
            UnitKind::Contaminator => AttackKind::ContaminatorTouch,
        }
    }
}

/// Kind of a primary attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttackKind {
    /// Seal melee
    SealBite = 0,
    /// Crusader melee
    CrusaderBlade = 1,
    /// Goon homing rocket
    GoonRocket = 2,
    /// Beetle melee
    BeetleMandibles = 3,
    /// Contaminator melee
    ContaminatorTouch = 4,
}

impl AttackKind {
    /// Whether this attack resolves instantly on contact (no projectile).
    #[inline]
    pub fn is_melee(self) -> bool {
        !matches!(self, AttackKind::GoonRocket)
    }
}

/// Kind of a cast order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CastKind {
    /// Lob a pestilence missile at a point
    Pestilence = 0,
    /// Summon a beetle at a point
    SpawnBeetle = 1,
}

/// Kind of an area explosion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EffectKind {
    /// Rocket impact blast
    Fire = 0,
    /// Pestilence splash
    Pestilence = 1,
}

/// Static per-unit-kind parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Collision radius
    pub radius: f64,
    /// Maximum linear speed (units/second)
    pub max_velocity: f64,
    /// Maximum turn rate (radians/second)
    pub max_angular_velocity: f64,
    /// Hit points at spawn
    pub max_hp: f64,
    /// Segments in the rendered hit bar
    pub hit_bar_count: u32,
}

/// Static combat parameters for an attack, cast or explosion.
///
/// One shape serves all three: a melee attack has zero
/// `missile_velocity`, an explosion descriptor reads `range` as its
/// blast radius and `duration_ticks` as its visual lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackSpec {
    /// Fire range (door-to-door distance, radii excluded)
    pub range: f64,
    /// Auto-engage search range
    pub trigger_range: f64,
    /// Damage on hit
    pub damage: f64,
    /// Projectile speed (0 for melee)
    pub missile_velocity: f64,
    /// Swing/cast/explosion duration in ticks
    pub duration_ticks: u32,
    /// Cooldown in ticks after the swing/cast completes
    pub cooldown_ticks: u32,
    /// Whether area damage also hits the sender's team
    pub friendly_fire: bool,
}

impl AttackSpec {
    /// All-zero sentinel. Its zero range makes every range and
    /// approach gate fail, so an entry-less kind silently never fires.
    pub const NONE: Self = Self {
        range: 0.0,
        trigger_range: 0.0,
        damage: 0.0,
        missile_velocity: 0.0,
        duration_ticks: 0,
        cooldown_ticks: 0,
        friendly_fire: false,
    };
}

/// Look up the static parameters for a unit kind.
pub fn unit_spec(kind: UnitKind) -> UnitSpec {
    match kind {
        UnitKind::Seal => UnitSpec {
            radius: 1.0,
            max_velocity: 8.0,
            max_angular_velocity: 6.0,
            max_hp: 100.0,
            hit_bar_count: 10,
        },
        UnitKind::Crusader => UnitSpec {
            radius: 1.5,
            max_velocity: 6.0,
            max_angular_velocity: 4.0,
            max_hp: 200.0,
            hit_bar_count: 10,
        },
        UnitKind::Goon => UnitSpec {
            radius: 1.2,
            max_velocity: 5.0,
            max_angular_velocity: 5.0,
            max_hp: 120.0,
            hit_bar_count: 10,
        },
        UnitKind::Beetle => UnitSpec {
            radius: 0.6,
            max_velocity: 10.0,
            max_angular_velocity: 10.0,
            max_hp: 30.0,
            hit_bar_count: 5,
        },
        UnitKind::Contaminator => UnitSpec {
            radius: 1.4,
            max_velocity: 4.0,
            max_angular_velocity: 4.0,
            max_hp: 150.0,
            hit_bar_count: 10,
        },
    }
}

/// Convenience: collision radius for a unit kind.
#[inline]
pub fn unit_radius(kind: UnitKind) -> f64 {
    unit_spec(kind).radius
}

/// Convenience: collision diameter for a unit kind.
#[inline]
pub fn unit_diameter(kind: UnitKind) -> f64 {
    unit_spec(kind).radius * 2.0
}

/// Convenience: maximum linear speed for a unit kind.
#[inline]
pub fn unit_max_velocity(kind: UnitKind) -> f64 {
    unit_spec(kind).max_velocity
}

/// Convenience: maximum turn rate for a unit kind.
#[inline]
pub fn unit_max_angular_velocity(kind: UnitKind) -> f64 {
    unit_spec(kind).max_angular_velocity
}

/// Convenience: spawn hit points for a unit kind.
#[inline]
pub fn unit_max_hp(kind: UnitKind) -> f64 {
    unit_spec(kind).max_hp
}

/// Convenience: hit bar segment count for a unit kind.
#[inline]
pub fn unit_hit_bar_count(kind: UnitKind) -> u32 {
    unit_spec(kind).hit_bar_count
}

/// Descriptor of a unit kind's primary attack.
pub fn unit_primary_attack_spec(kind: UnitKind) -> AttackSpec {
    attack_spec(kind.primary_attack())
}

/// Descriptor of an attack kind.
pub fn attack_spec(kind: AttackKind) -> AttackSpec {
    match kind {
        AttackKind::SealBite => AttackSpec {
            range: 5.0,
            trigger_range: 7.0,
            damage: 10.0,
            missile_velocity: 0.0,
            duration_ticks: 20,
            cooldown_ticks: 30,
            friendly_fire: false,
        },
        AttackKind::CrusaderBlade => AttackSpec {
            range: 1.0,
            trigger_range: 8.0,
            damage: 25.0,
            missile_velocity: 0.0,
            duration_ticks: 30,
            cooldown_ticks: 40,
            friendly_fire: false,
        },
        AttackKind::GoonRocket => AttackSpec {
            range: 12.0,
            trigger_range: 15.0,
            damage: 15.0,
            missile_velocity: 16.0,
            duration_ticks: 25,
            cooldown_ticks: 60,
            friendly_fire: false,
        },
        AttackKind::BeetleMandibles => AttackSpec {
            range: 0.5,
            trigger_range: 6.0,
            damage: 5.0,
            missile_velocity: 0.0,
            duration_ticks: 10,
            cooldown_ticks: 15,
            friendly_fire: false,
        },
        AttackKind::ContaminatorTouch => AttackSpec {
            range: 1.0,
            trigger_range: 5.0,
            damage: 8.0,
            missile_velocity: 0.0,
            duration_ticks: 25,
            cooldown_ticks: 35,
            friendly_fire: false,
        },
    }
}

/// Descriptor of a cast kind.
pub fn cast_spec(kind: CastKind) -> AttackSpec {
    match kind {
        CastKind::Pestilence => AttackSpec {
            range: 14.0,
            trigger_range: 0.0,
            damage: 0.0,
            missile_velocity: 10.0,
            duration_ticks: 40,
            cooldown_ticks: 150,
            friendly_fire: false,
        },
        CastKind::SpawnBeetle => AttackSpec {
            range: 6.0,
            trigger_range: 0.0,
            damage: 0.0,
            missile_velocity: 0.0,
            duration_ticks: 30,
            cooldown_ticks: 100,
            friendly_fire: false,
        },
    }
}

/// Descriptor of an explosion kind. `range` is the blast radius,
/// `duration_ticks` the lingering visual lifetime.
pub fn effect_spec(kind: EffectKind) -> AttackSpec {
    match kind {
        EffectKind::Fire => AttackSpec {
            range: 3.0,
            trigger_range: 0.0,
            damage: 20.0,
            missile_velocity: 0.0,
            duration_ticks: 15,
            cooldown_ticks: 0,
            friendly_fire: true,
        },
        EffectKind::Pestilence => AttackSpec {
            range: 4.0,
            trigger_range: 0.0,
            damage: 12.0,
            missile_velocity: 0.0,
            duration_ticks: 25,
            cooldown_ticks: 0,
            friendly_fire: false,
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_UNITS: [UnitKind; 5] = [
        UnitKind::Seal,
        UnitKind::Crusader,
        UnitKind::Goon,
        UnitKind::Beetle,
        UnitKind::Contaminator,
    ];

    #[test]
    fn test_unit_specs_sane() {
        for kind in ALL_UNITS {
            let spec = unit_spec(kind);
            assert!(spec.radius > 0.0);
            assert!(spec.max_velocity > 0.0);
            assert!(spec.max_angular_velocity > 0.0);
            assert!(spec.max_hp > 0.0);
            assert!(spec.hit_bar_count > 0);
            assert_eq!(unit_diameter(kind), spec.radius * 2.0);
        }
    }

    #[test]
    fn test_primary_attacks_have_entries() {
        for kind in ALL_UNITS {
            let spec = unit_primary_attack_spec(kind);
            assert!(spec.range > 0.0);
            assert!(spec.trigger_range >= spec.range);
            assert!(spec.damage > 0.0);
            assert!(spec.duration_ticks > 0);
            assert!(spec.cooldown_ticks > 0);
        }
    }

    #[test]
    fn test_seal_bite_matches_reference_numbers() {
        let spec = attack_spec(AttackKind::SealBite);
        assert_eq!(spec.range, 5.0);
        assert_eq!(spec.trigger_range, 7.0);
        assert_eq!(spec.damage, 10.0);
        assert_eq!(spec.duration_ticks, 20);
        assert_eq!(spec.cooldown_ticks, 30);
    }

    #[test]
    fn test_only_goon_rocket_is_projectile() {
        for kind in ALL_UNITS {
            let attack = kind.primary_attack();
            let spec = attack_spec(attack);
            if attack == AttackKind::GoonRocket {
                assert!(!attack.is_melee());
                assert_eq!(spec.missile_velocity, 16.0);
            } else {
                assert!(attack.is_melee());
                assert_eq!(spec.missile_velocity, 0.0);
            }
        }
    }

    #[test]
    fn test_effect_friendly_fire_flags() {
        assert!(effect_spec(EffectKind::Fire).friendly_fire);
        assert!(!effect_spec(EffectKind::Pestilence).friendly_fire);
    }

    #[test]
    fn test_none_sentinel_gates_everything_out() {
        let none = AttackSpec::NONE;
        assert_eq!(none.range, 0.0);
        assert_eq!(none.trigger_range, 0.0);
        assert_eq!(none, AttackSpec::default());
    }
}
