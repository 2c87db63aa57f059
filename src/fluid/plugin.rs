//! Bevy plugin for fluid simulation.

use bevy::log::{debug, error, warn};
use bevy::prelude::*;

use super::integrate::StepStats;
use super::params::FluidParams;
use super::particle::{ParticleInstance, ParticleLayout};
use super::scene::FluidScene;
use super::simulation::Simulation;

/// Plugin that runs an SPH water simulation inside a Bevy app.
///
/// The simulation advances one fixed timestep per `Update`. Edit the
/// [`FluidParams`] resource to retune it while running, and use [`FluidState`]
/// to pause or single-step.
///
/// # Example
///
/// ```rust,ignore
/// use bevy::prelude::*;
/// use sph_water::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(MinimalPlugins)
///         .add_plugins(FluidPlugin::from_scene(FluidScene::Basin))
///         .run();
/// }
/// ```
#[derive(Clone, Debug)]
pub struct FluidPlugin {
    pub params: FluidParams,
    pub particle_count: usize,
    pub layout: ParticleLayout,
    pub scene: FluidScene,
}

impl Default for FluidPlugin {
    fn default() -> Self {
        Self::from_scene(FluidScene::default())
    }
}

impl FluidPlugin {
    /// Everything taken from one of the built-in scenes.
    pub fn from_scene(scene: FluidScene) -> Self {
        Self {
            params: scene.params(),
            particle_count: scene.particle_count(),
            layout: scene.layout(),
            scene,
        }
    }

    /// Create plugin with custom parameters.
    pub fn with_params(mut self, params: FluidParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_particle_count(mut self, particle_count: usize) -> Self {
        self.particle_count = particle_count;
        self
    }

    pub fn with_layout(mut self, layout: ParticleLayout) -> Self {
        self.layout = layout;
        self
    }
}

impl Plugin for FluidPlugin {
    fn build(&self, app: &mut App) {
        // Register types for reflection
        app.register_type::<FluidParams>()
            .register_type::<FluidState>();

        app.insert_resource(self.params.clone())
            .init_resource::<FluidState>()
            .init_resource::<ParticleInstances>();

        match Simulation::with_layout(self.particle_count, &self.layout, self.params.clone()) {
            Ok(mut simulation) => {
                self.scene.register(&mut simulation);
                app.insert_resource(simulation);
            }
            Err(err) => error!("fluid simulation not started: {err}"),
        }

        app.add_systems(
            Update,
            (sync_params, step_simulation, publish_instances)
                .chain()
                .in_set(FluidSystems::Step)
                .run_if(resource_exists::<Simulation>),
        );
    }
}

/// System sets of the fluid plugin.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FluidSystems {
    /// Parameter sync, stepping and instance publishing.
    Step,
}

/// Resource tracking simulation state.
#[derive(Resource, Default, Reflect)]
#[reflect(Resource)]
pub struct FluidState {
    /// Whether simulation is paused.
    pub paused: bool,
    /// Advance exactly one step while paused.
    pub step_requested: bool,
    /// Steps taken through the plugin.
    pub frame: u64,
    /// Counters of the most recent step.
    pub last_stats: StepStats,
}

impl FluidState {
    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Request a single step (when paused).
    pub fn request_step(&mut self) {
        self.step_requested = true;
    }
}

/// Per-particle renderer records, refreshed after every step.
#[derive(Resource, Default)]
pub struct ParticleInstances(pub Vec<ParticleInstance>);

impl ParticleInstances {
    pub fn as_bytes(&self) -> &[u8] {
        ParticleInstance::as_bytes(&self.0)
    }
}

/// Push edited parameters into the running simulation.
fn sync_params(params: Res<FluidParams>, mut simulation: ResMut<Simulation>) {
    if !params.is_changed() || *params == *simulation.params() {
        return;
    }
    match simulation.set_params(params.clone()) {
        Ok(()) => debug!("fluid parameters updated"),
        Err(err) => warn!("ignoring fluid parameters: {err}"),
    }
}

/// System to run the fluid simulation.
fn step_simulation(mut state: ResMut<FluidState>, mut simulation: ResMut<Simulation>) {
    if state.paused && !state.step_requested {
        return;
    }
    state.step_requested = false;

    simulation.step();
    state.frame += 1;
    state.last_stats = simulation.last_step_stats();
}

fn publish_instances(simulation: Res<Simulation>, mut instances: ResMut<ParticleInstances>) {
    if simulation.is_changed() {
        simulation.fill_instances(&mut instances.0);
    }
}
