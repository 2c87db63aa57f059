//! Fluid simulation core logic.
//!
//! [`Simulation`] owns the particles, the spatial hash, the solver scratch
//! space and the collision surfaces. One call to [`Simulation::step`]
//! advances everything by the fixed timestep:
//!
//! 1. rebuild the spatial hash from the current positions,
//! 2. compute densities, pressures and new velocities,
//! 3. move every particle, bouncing off surfaces and recycling escapees.

use bevy::log::{debug, info};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::boundary::SurfaceRegistry;
use super::error::FluidResult;
use super::integrate::{move_all, StepStats};
use super::params::FluidParams;
use super::particle::{ParticleInstance, ParticleLayout, ParticleSet};
use super::solver::SphSolver;
use super::spatial::SpatialHashGrid;

/// Main fluid simulation resource.
#[derive(Resource)]
pub struct Simulation {
    params: FluidParams,
    particles: ParticleSet,
    grid: SpatialHashGrid,
    solver: SphSolver,
    surfaces: SurfaceRegistry,
    /// Respawn random stream.
    rng: StdRng,
    stats: StepStats,
    steps: u64,
}

impl Simulation {
    /// Create `count` particles in the default lattice.
    pub fn new(count: usize, params: FluidParams) -> FluidResult<Self> {
        Self::with_layout(count, &ParticleLayout::default(), params)
    }

    /// Create `count` particles seeded by `layout`.
    pub fn with_layout(count: usize, layout: &ParticleLayout, params: FluidParams) -> FluidResult<Self> {
        Self::from_positions(layout.generate_positions(count), params)
    }

    /// Create particles at rest at the given positions.
    pub fn from_positions(positions: Vec<Vec3>, params: FluidParams) -> FluidResult<Self> {
        params.validate()?;

        let particles = ParticleSet::from_positions(positions);
        info!(
            "fluid simulation with {} particles, dt {}, support radius {}",
            particles.len(),
            params.timestep,
            params.effective_radius
        );

        Ok(Self {
            grid: SpatialHashGrid::new(params.grid),
            solver: SphSolver::new(particles.len()),
            surfaces: SurfaceRegistry::new(),
            rng: StdRng::seed_from_u64(params.respawn.seed),
            stats: StepStats::default(),
            steps: 0,
            particles,
            params,
        })
    }

    /// Register the unit square `[-1, 1] x {0} x [-1, 1]` mapped through
    /// `transform` as two collision triangles.
    pub fn add_plane(&mut self, transform: Mat4) {
        self.surfaces.add_plane(transform);
        debug!("collision surfaces: {} triangles", self.surfaces.len());
    }

    /// Alias of [`add_plane`](Self::add_plane).
    pub fn add_surface(&mut self, transform: Mat4) {
        self.add_plane(transform);
    }

    /// Advance the simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.grid.rebuild(self.particles.positions());
        self.solver
            .compute_velocities(&mut self.particles, &self.grid, &self.params);

        let mut stats = move_all(&mut self.particles, &self.surfaces, &self.params, &mut self.rng);
        stats.dropped = self.grid.dropped();

        self.stats = stats;
        self.steps += 1;
    }

    /// Replace the parameters. Particles and surfaces are kept; the respawn
    /// stream continues from where it was.
    pub fn set_params(&mut self, params: FluidParams) -> FluidResult<()> {
        params.validate()?;
        if params.grid != self.params.grid {
            self.grid = SpatialHashGrid::new(params.grid);
        }
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Position of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.particle_count()`.
    #[track_caller]
    pub fn position(&self, index: usize) -> Vec3 {
        self.particles.position(index)
    }

    /// Velocity of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.particle_count()`.
    #[track_caller]
    pub fn velocity(&self, index: usize) -> Vec3 {
        self.particles.velocity(index)
    }

    #[track_caller]
    pub fn density(&self, index: usize) -> f32 {
        self.particles.density(index)
    }

    #[track_caller]
    pub fn pressure(&self, index: usize) -> f32 {
        self.particles.pressure(index)
    }

    pub fn positions(&self) -> &[Vec3] {
        self.particles.positions()
    }

    pub fn velocities(&self) -> &[Vec3] {
        self.particles.velocities()
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    /// Counters of the most recent step.
    pub fn last_step_stats(&self) -> StepStats {
        self.stats
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Refill `instances` with one renderer record per particle.
    pub fn fill_instances(&self, instances: &mut Vec<ParticleInstance>) {
        instances.clear();
        instances.extend(
            self.positions()
                .iter()
                .zip(self.velocities())
                .map(|(&p, &v)| ParticleInstance::new(p, v)),
        );
    }
}
