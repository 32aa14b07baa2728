//! Skirmish Demo Driver
//!
//! Runs a scripted two-team skirmish through the deterministic engine,
//! then replays it from the same seed to verify the state hash.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use skirmish::{
    engine::{
        catalog::{CastKind, UnitKind},
        events::EngineEvent,
        state::{Engine, Order, Team, UnitId},
    },
    Position, Rect, TICK_RATE, VERSION,
};

const DEMO_SEED: u64 = 12345;
const DEMO_TICKS: u32 = 3000;

fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Skirmish Engine v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let hash = run_demo_match(true)?;
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let replay_hash = run_demo_match(false)?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        anyhow::bail!("determinism failure: hashes differ");
    }
}

/// Set up the demo armies, run the scripted match, return the final
/// state hash.
fn run_demo_match(verbose: bool) -> anyhow::Result<skirmish::StateHash> {
    if verbose {
        info!("=== Starting Demo Match ===");
        info!("Seed: {}", DEMO_SEED);
    }

    let arena = Rect::new(-60.0, -40.0, 60.0, 40.0);
    let mut engine = Engine::new(arena, DEMO_SEED)?;

    let red = spawn_army(&mut engine, Team::Red, -40.0, 0.0);
    let blue = spawn_army(&mut engine, Team::Blue, 40.0, std::f64::consts::PI);

    if verbose {
        info!("Spawned {} red and {} blue units", red.len(), blue.len());
    }

    // Red advances, blue holds with a pestilence opener
    for &id in &red {
        engine.set_unit_action(id, Order::attack_move(Position::new(40.0, 0.0)));
    }
    engine.set_unit_action(blue[4], Order::cast(CastKind::Pestilence, Position::new(-10.0, 0.0)));

    let mut total_events = 0usize;
    for t in 0..DEMO_TICKS {
        // Mid-match command injection, applied between ticks
        if t == 250 {
            engine.set_unit_action(blue[4], Order::cast(CastKind::SpawnBeetle, Position::new(30.0, 5.0)));
        }

        let events = engine.tick();
        total_events += events.len();

        for event in &events {
            match event {
                // This driver plays the authoritative owner: it
                // allocates ids for requested spawns.
                EngineEvent::UnitCreateRequested {
                    kind,
                    team,
                    position,
                    orientation,
                    ..
                } => {
                    let id = engine.create_unit(*kind, *team, *position, *orientation);
                    if verbose {
                        info!("tick {}: spawned {:?} {} for {:?}", t, kind, id, team);
                    }
                }
                EngineEvent::Sound { sound, position } if verbose => {
                    info!("tick {}: {:?} at ({:.1}, {:.1})", t, sound, position.x, position.y);
                }
                _ => {}
            }
        }

        if verbose {
            // Report once per simulated second
            if t % TICK_RATE == 0 {
                info!(
                    "Tick {}: {} units, {} corpses, {} missiles, {} events so far",
                    t,
                    engine.units().len(),
                    engine.corpses().len(),
                    engine.missiles().len(),
                    total_events
                );
            }
        }

        let red_alive = engine.units().values().any(|u| u.team == Team::Red);
        let blue_alive = engine.units().values().any(|u| u.team == Team::Blue);
        if !red_alive || !blue_alive {
            if verbose {
                info!("Match decided at tick {}", t);
            }
            break;
        }
    }

    if verbose {
        info!("=== Match Results ===");
        for unit in engine.units().values() {
            info!("{} {:?} {:?}: {:.0} hp", unit.id, unit.team, unit.kind, unit.hp);
        }
        let snapshot =
            serde_json::to_string(&engine).context("failed to serialize final state")?;
        info!("Final snapshot: {} bytes", snapshot.len());
        info!("Total events: {}", total_events);
    }

    Ok(engine.compute_hash())
}

/// One of each unit kind in a column at `x`, facing `orientation`.
fn spawn_army(engine: &mut Engine, team: Team, x: f64, orientation: f64) -> Vec<UnitId> {
    [
        UnitKind::Seal,
        UnitKind::Crusader,
        UnitKind::Goon,
        UnitKind::Seal,
        UnitKind::Contaminator,
    ]
    .iter()
    .enumerate()
    .map(|(i, &kind)| {
        engine.create_unit(kind, team, Position::new(x, (i as f64 - 2.0) * 6.0), orientation)
    })
    .collect()
}
