//! Smoothed particle hydrodynamics (SPH) water simulation.
//!
//! Water is a fixed set of particles. Every step the spatial hash is rebuilt,
//! densities and forces are evaluated over each particle's neighbor stencil,
//! and particles are moved while bouncing off static triangle surfaces.
//! Particles that leave the scene re-enter through a respawn rule, so the
//! simulation can run indefinitely.
//!
//! # Architecture
//!
//! - [`params`]: Simulation parameters and presets
//! - [`error`]: Configuration errors
//! - [`particle`]: Particle storage, initial layouts and renderer records
//! - [`spatial`]: Spatial hashing for neighbor search
//! - [`solver`]: SPH kernels and the density/force passes
//! - [`boundary`]: Collision triangles and the surface registry
//! - [`integrate`]: Collision-aware movement and respawn
//! - [`simulation`]: The [`Simulation`](simulation::Simulation) that ties it together
//! - [`scene`]: Built-in surface layouts
//! - [`plugin`]: Bevy plugin for easy integration
//!
//! # Example
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use sph_water::fluid::prelude::*;
//!
//! let mut sim = Simulation::new(100, FluidParams::default()).unwrap();
//! sim.add_plane(Mat4::from_translation(Vec3::new(0.0, -4.0, 0.0)) * Mat4::from_scale(Vec3::splat(20.0)));
//! for _ in 0..60 {
//!     sim.step();
//! }
//! println!("particle 0 at {}", sim.position(0));
//! ```

pub mod boundary;
pub mod error;
pub mod integrate;
pub mod params;
pub mod particle;
pub mod plugin;
pub mod scene;
pub mod simulation;
pub mod solver;
pub mod spatial;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::boundary::*;
    pub use super::error::*;
    pub use super::integrate::*;
    pub use super::params::*;
    pub use super::particle::*;
    pub use super::plugin::*;
    pub use super::scene::*;
    pub use super::simulation::*;
    pub use super::solver::*;
    pub use super::spatial::*;
}
