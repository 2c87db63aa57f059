//! SPH water - particle-based water simulation with triangle collisions
//!
//! This library simulates water as smoothed particle hydrodynamics (SPH)
//! particles that flow over arbitrary static triangle surfaces. It can be
//! driven directly through [`Simulation`](fluid::simulation::Simulation) or
//! run inside a Bevy app through [`FluidPlugin`](fluid::plugin::FluidPlugin).
//!
//! # Features
//!
//! - **SPH Solver**: poly6 density, spiky pressure and viscosity kernels
//! - **Spatial Hashing**: fixed-size bucketed grid bounding neighbor queries
//! - **Surface Collisions**: sub-stepped bounces off any number of triangles
//! - **Open System**: escaped particles re-enter through a respawn rule
//! - **Parallel Evaluation**: optional rayon density/force passes
//! - **Easy Integration**: Simple Bevy plugin interface
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use sph_water::prelude::*;
//!
//! fn main() {
//!     let mut app = App::new();
//!     app.add_plugins(FluidPlugin::from_scene(FluidScene::Cascade))
//!         .add_systems(Update, report.after(FluidSystems::Step));
//!
//!     for _ in 0..600 {
//!         app.update();
//!     }
//! }
//!
//! fn report(state: Res<FluidState>) {
//!     if state.frame % 100 == 0 {
//!         info!("frame {} stats {:?}", state.frame, state.last_stats);
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`fluid`]: Core fluid simulation module
//!   - [`fluid::params`]: Simulation parameters
//!   - [`fluid::particle`]: Particle data structures
//!   - [`fluid::spatial`]: Spatial hashing for neighbor search
//!   - [`fluid::solver`]: SPH kernels and force evaluation
//!   - [`fluid::boundary`]: Collision surfaces
//!   - [`fluid::integrate`]: Collision-aware integration
//!   - [`fluid::simulation`]: Simulation state and stepping
//!   - [`fluid::scene`]: Built-in scenes
//!   - [`fluid::plugin`]: Bevy plugin

pub mod fluid;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::fluid::prelude::*;
}
