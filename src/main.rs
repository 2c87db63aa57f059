//! SPH water - headless simulation demo
//!
//! Runs one of the built-in scenes for a fixed number of frames and logs the
//! step counters.
//!
//! Usage: `sph-water [cascade|basin|empty] [frames] [--parallel]`

use bevy::log::LogPlugin;
use bevy::prelude::*;
use sph_water::prelude::*;

const DEFAULT_FRAMES: u64 = 600;
const REPORT_EVERY: u64 = 100;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let scene = match args.first().map(String::as_str) {
        Some("basin") => FluidScene::Basin,
        Some("empty") => FluidScene::Empty,
        _ => FluidScene::Cascade,
    };
    let frames = args
        .get(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);
    let parallel = args.iter().any(|arg| arg == "--parallel");

    let plugin = FluidPlugin::from_scene(scene);
    let params = plugin.params.clone().with_parallel(parallel);

    let mut app = App::new();
    app.add_plugins(LogPlugin::default())
        .add_plugins(plugin.with_params(params))
        .add_systems(Update, report_progress.after(FluidSystems::Step));
    app.finish();
    app.cleanup();

    info!("running {:?} for {} frames", scene, frames);
    for _ in 0..frames {
        app.update();
    }

    if let Some(simulation) = app.world().get_resource::<Simulation>() {
        let below = simulation
            .positions()
            .iter()
            .filter(|p| p.y < simulation.params().respawn.min.y)
            .count();
        info!(
            "done after {} steps: {} of {} particles below the inflow",
            simulation.steps(),
            below,
            simulation.particle_count()
        );
    }
}

/// Log step counters every few frames.
fn report_progress(state: Res<FluidState>) {
    if state.frame > 0 && state.frame % REPORT_EVERY == 0 {
        let stats = state.last_stats;
        info!(
            "frame {}: {} collisions, {} capped, {} respawned, {} unhashed",
            state.frame, stats.collisions, stats.capped, stats.respawned, stats.dropped
        );
    }
}
