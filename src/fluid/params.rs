//! Fluid simulation parameters.
//!
//! These parameters control the behavior of the SPH solver, the collision
//! response and the open-system respawn rule. They can be modified at runtime
//! through the Bevy resource system; the plugin pushes changes into the
//! running [`Simulation`](super::simulation::Simulation).

use bevy::prelude::*;

use super::error::{FluidError, FluidResult};
use super::spatial::SpatialHashConfig;

/// Parameters controlling the fluid simulation behavior.
///
/// The default is the [`cascade`](Self::cascade) preset. The other presets
/// are alternative configurations of the same solver, not separate code paths.
#[derive(Resource, Clone, Debug, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct FluidParams {
    /// Rest density used by the equation of state.
    pub rest_density: f32,

    /// Pressure at rest density.
    pub rest_pressure: f32,

    /// Gas stiffness: `p = rest_pressure + gas_constant * (rho - rest_density)`.
    pub gas_constant: f32,

    /// Viscosity coefficient (mu).
    pub viscosity: f32,

    /// Strength of the impulse that damps particles approaching head-on.
    /// Zero disables the term.
    pub repulsion: f32,

    /// Mass of one particle.
    pub particle_mass: f32,

    /// Gravity acceleration vector.
    pub gravity: Vec3,

    /// Fixed timestep advanced by every call to `step()`.
    pub timestep: f32,

    /// Support radius of all smoothing kernels.
    pub effective_radius: f32,

    /// Coefficient of restitution for surface collisions.
    /// 0.0 = fully inelastic, 1.0 = fully elastic.
    pub restitution: f32,

    /// Fraction of the step a particle backs off from a surface it hits.
    pub collision_backoff: f32,

    /// Upper bound on surface bounces resolved for one particle in one step.
    pub max_bounces: u32,

    /// Evaluate densities and forces on the rayon thread pool.
    pub parallel: bool,

    /// Spatial hash layout.
    pub grid: SpatialHashConfig,

    /// Particles leaving this region are recycled.
    pub bounds: SceneBounds,

    /// Where recycled particles re-enter the scene.
    pub respawn: RespawnRule,
}

impl Default for FluidParams {
    fn default() -> Self {
        Self::cascade()
    }
}

impl FluidParams {
    /// Water pouring down the cascade scene. This is the reference preset.
    pub fn cascade() -> Self {
        Self {
            rest_density: 998.0,
            rest_pressure: 1001.3,
            gas_constant: 3.0,
            viscosity: 3.5,
            repulsion: 0.01,
            particle_mass: 10.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            timestep: 0.01,
            effective_radius: 0.5,
            restitution: 0.1,
            collision_backoff: 0.001,
            max_bounces: 16,
            parallel: false,
            grid: SpatialHashConfig {
                cell_size: 0.25,
                half_width: 2,
                ..default()
            },
            bounds: SceneBounds::new(Vec3::new(-2.0, -4.5, -8.0), Vec3::new(6.0, 20.0, 10.0)),
            respawn: RespawnRule::default(),
        }
    }

    /// Soft, weakly compressible fluid with a long timestep.
    pub fn calm() -> Self {
        Self {
            rest_density: 1.0,
            rest_pressure: 1.0,
            gas_constant: 0.0001,
            viscosity: 1.0,
            particle_mass: 1.0,
            timestep: 0.04,
            effective_radius: 0.4,
            grid: SpatialHashConfig {
                cell_size: 0.2,
                half_width: 2,
                ..default()
            },
            ..Self::cascade()
        }
    }

    /// Small droplets with a tight kernel, sized for the basin scene.
    ///
    /// Particles start 0.05 apart, so a mass of `0.05³ * 1000` puts the
    /// lattice near the rest density. The force terms carry no mass factor:
    /// pressure waves travel at roughly `sqrt(gas_constant * rest_density /
    /// particle_mass)`, which must stay well under `effective_radius /
    /// timestep`.
    pub fn droplet() -> Self {
        let bounds = SceneBounds::new(Vec3::new(-3.0, -3.0, -3.0), Vec3::new(3.0, 6.0, 3.0));
        Self {
            rest_density: 1000.0,
            rest_pressure: 0.0,
            gas_constant: 0.005,
            viscosity: 0.003,
            repulsion: 0.0,
            particle_mass: 0.125,
            timestep: 0.005,
            effective_radius: 0.1,
            restitution: 0.2,
            grid: SpatialHashConfig {
                cell_size: 0.05,
                half_width: 2,
                ..default()
            },
            bounds,
            respawn: RespawnRule {
                min: Vec3::new(-0.5, 1.5, -0.5),
                max: Vec3::new(0.5, 1.5, 0.5),
                velocity: Vec3::ZERO,
                ..default()
            },
            ..Self::cascade()
        }
    }

    /// Set the fixed timestep.
    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set rest pressure and gas stiffness together.
    pub fn with_pressure(mut self, rest_pressure: f32, gas_constant: f32) -> Self {
        self.rest_pressure = rest_pressure;
        self.gas_constant = gas_constant;
        self
    }

    /// Set viscosity.
    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Set the head-on repulsion strength.
    pub fn with_repulsion(mut self, repulsion: f32) -> Self {
        self.repulsion = repulsion;
        self
    }

    /// Set restitution.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the kernel support radius.
    pub fn with_effective_radius(mut self, effective_radius: f32) -> Self {
        self.effective_radius = effective_radius;
        self
    }

    /// Set the bounce limit per particle per step.
    pub fn with_max_bounces(mut self, max_bounces: u32) -> Self {
        self.max_bounces = max_bounces;
        self
    }

    /// Toggle rayon evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Replace the spatial hash layout.
    pub fn with_grid(mut self, grid: SpatialHashConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Replace the scene bounds.
    pub fn with_bounds(mut self, bounds: SceneBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Replace the respawn rule.
    pub fn with_respawn(mut self, respawn: RespawnRule) -> Self {
        self.respawn = respawn;
        self
    }

    /// Distance covered by the neighbor stencil in every direction.
    pub fn stencil_reach(&self) -> f32 {
        self.grid.cell_size * self.grid.half_width as f32
    }

    /// Check every parameter the solver relies on.
    pub fn validate(&self) -> FluidResult<()> {
        positive("effective_radius", self.effective_radius)?;
        positive("timestep", self.timestep)?;
        positive("rest_density", self.rest_density)?;
        positive("particle_mass", self.particle_mass)?;
        non_negative("viscosity", self.viscosity)?;
        non_negative("repulsion", self.repulsion)?;
        non_negative("restitution", self.restitution)?;
        non_negative("collision_backoff", self.collision_backoff)?;
        finite("rest_pressure", self.rest_pressure)?;
        finite("gas_constant", self.gas_constant)?;
        if !self.gravity.is_finite() {
            return Err(FluidError::NonFinite { name: "gravity" });
        }
        if self.max_bounces == 0 {
            return Err(FluidError::NoBounces);
        }

        self.grid.validate()?;
        if self.stencil_reach() < self.effective_radius {
            return Err(FluidError::StencilTooSmall {
                cell_size: self.grid.cell_size,
                half_width: self.grid.half_width,
                effective_radius: self.effective_radius,
            });
        }

        region("bounds", self.bounds.min, self.bounds.max)?;
        region("respawn", self.respawn.min, self.respawn.max)?;
        if !self.bounds.contains(self.respawn.min) || !self.bounds.contains(self.respawn.max) {
            return Err(FluidError::SpawnOutsideBounds);
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> FluidResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FluidError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> FluidResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FluidError::Negative { name, value })
    }
}

fn finite(name: &'static str, value: f32) -> FluidResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FluidError::NonFinite { name })
    }
}

fn region(name: &'static str, min: Vec3, max: Vec3) -> FluidResult<()> {
    if min.cmple(max).all() {
        Ok(())
    } else {
        Err(FluidError::InvertedRegion {
            name,
            min: min.to_array(),
            max: max.to_array(),
        })
    }
}

/// Axis-aligned region the particles are allowed to occupy.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct SceneBounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl SceneBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Check if a point is inside the bounds (faces included).
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Recycling rule for particles that escape the scene.
///
/// An escaped particle is moved to a uniformly random point of the
/// `min..=max` box and given `velocity`. A flat box (equal `y`) models an
/// inflow sheet.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct RespawnRule {
    /// Minimum corner of the spawn region.
    pub min: Vec3,
    /// Maximum corner of the spawn region.
    pub max: Vec3,
    /// Velocity assigned to a respawned particle.
    pub velocity: Vec3,
    /// Seed of the respawn random stream.
    pub seed: u64,
}

impl Default for RespawnRule {
    fn default() -> Self {
        // Inflow strip at the head of the cascade chute.
        let center = Vec3::new(1.40767, -1.19419, -4.87515);
        Self {
            min: center - Vec3::new(1.0, 0.0, 1.0),
            max: center + Vec3::new(1.0, 0.0, 1.0),
            velocity: Vec3::new(0.0, 0.0, 1.7),
            seed: 0x5eed,
        }
    }
}

impl RespawnRule {
    /// Respawn at a single point.
    pub fn at(point: Vec3, velocity: Vec3) -> Self {
        Self {
            min: point,
            max: point,
            velocity,
            ..default()
        }
    }

    /// Check if a point is inside the spawn region.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}
