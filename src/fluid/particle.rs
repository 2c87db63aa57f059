//! Fluid particle storage and initial layouts.
//!
//! Particles live in a struct-of-arrays [`ParticleSet`] owned by the
//! simulation. [`ParticleLayout`] seeds their starting positions, and
//! [`ParticleInstance`] is the flat per-particle record handed to a renderer.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-particle state in struct-of-arrays layout. The particle count is fixed
/// at construction.
#[derive(Clone, Debug, Default)]
pub struct ParticleSet {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    densities: Vec<f32>,
    pressures: Vec<f32>,
}

impl ParticleSet {
    /// Create particles at rest at the given positions.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vec3::ZERO; n],
            densities: vec![0.0; n],
            pressures: vec![0.0; n],
        }
    }

    /// Get the number of particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[track_caller]
    pub fn position(&self, index: usize) -> Vec3 {
        self.check(index);
        self.positions[index]
    }

    /// Velocity of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[track_caller]
    pub fn velocity(&self, index: usize) -> Vec3 {
        self.check(index);
        self.velocities[index]
    }

    /// Density of particle `index` as of the last step.
    #[track_caller]
    pub fn density(&self, index: usize) -> f32 {
        self.check(index);
        self.densities[index]
    }

    /// Pressure of particle `index` as of the last step.
    #[track_caller]
    pub fn pressure(&self, index: usize) -> f32 {
        self.check(index);
        self.pressures[index]
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    pub fn pressures(&self) -> &[f32] {
        &self.pressures
    }

    /// Overwrite the velocity of one particle.
    #[track_caller]
    pub fn set_velocity(&mut self, index: usize, velocity: Vec3) {
        self.check(index);
        self.velocities[index] = velocity;
    }

    /// Mutable views for the integrator.
    pub(crate) fn kinematics_mut(&mut self) -> (&mut [Vec3], &mut [Vec3]) {
        (&mut self.positions, &mut self.velocities)
    }

    /// Positions and velocities for reading, density and pressure for writing.
    pub(crate) fn state_mut(&mut self) -> (&[Vec3], &[Vec3], &mut [f32], &mut [f32]) {
        (
            &self.positions,
            &self.velocities,
            &mut self.densities,
            &mut self.pressures,
        )
    }

    /// Replace every velocity at once with a freshly computed field.
    pub(crate) fn swap_velocities(&mut self, velocities: &mut Vec<Vec3>) {
        debug_assert_eq!(velocities.len(), self.velocities.len());
        std::mem::swap(&mut self.velocities, velocities);
    }

    #[track_caller]
    fn check(&self, index: usize) {
        assert!(
            index < self.positions.len(),
            "particle index {index} out of range for {} particles",
            self.positions.len()
        );
    }
}

/// Initial particle layout.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub enum ParticleLayout {
    /// Regular lattice filled column by column: `columns.x` along x,
    /// `columns.y` along z, then layer after layer upward.
    Lattice {
        origin: Vec3,
        spacing: f32,
        columns: UVec2,
    },
    /// Uniformly random points inside a box, reproducible from `seed`.
    Random { min: Vec3, max: Vec3, seed: u64 },
}

impl Default for ParticleLayout {
    fn default() -> Self {
        // Block of water above the head of the cascade chute.
        ParticleLayout::Lattice {
            origin: Vec3::new(0.5, -1.19, -4.37),
            spacing: 0.3,
            columns: UVec2::new(10, 10),
        }
    }
}

impl ParticleLayout {
    /// Create a lattice layout.
    pub fn lattice(origin: Vec3, spacing: f32, columns: UVec2) -> Self {
        ParticleLayout::Lattice {
            origin,
            spacing,
            columns,
        }
    }

    /// Create a random layout.
    pub fn random(min: Vec3, max: Vec3, seed: u64) -> Self {
        ParticleLayout::Random { min, max, seed }
    }

    /// Generate `count` particle positions.
    pub fn generate_positions(&self, count: usize) -> Vec<Vec3> {
        let mut positions = Vec::with_capacity(count);

        match self {
            ParticleLayout::Lattice {
                origin,
                spacing,
                columns,
            } => {
                let nx = columns.x.max(1) as usize;
                let nz = columns.y.max(1) as usize;
                let per_layer = nx * nz;
                for i in 0..count {
                    let layer = i / per_layer;
                    let x = (i % per_layer) / nz;
                    let z = i % nz;
                    let offset = Vec3::new(x as f32, layer as f32, z as f32) * *spacing;
                    positions.push(*origin + offset);
                }
            }
            ParticleLayout::Random { min, max, seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for _ in 0..count {
                    positions.push(random_point(&mut rng, *min, *max));
                }
            }
        }

        positions
    }
}

/// Uniform point of the `min..=max` box. Degenerate axes collapse to `min`.
pub(crate) fn random_point(rng: &mut impl Rng, min: Vec3, max: Vec3) -> Vec3 {
    let t = Vec3::new(rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>());
    (min + (max - min) * t).min(max)
}

/// Per-particle record for a renderer: position plus speed for coloring.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub speed: f32,
}

impl ParticleInstance {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position: position.to_array(),
            speed: velocity.length(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// View a slice of instances as raw bytes for a vertex/instance buffer.
    pub fn as_bytes(instances: &[ParticleInstance]) -> &[u8] {
        bytemuck::cast_slice(instances)
    }
}
