//! Ready-made collision scenes.
//!
//! Each scene is a list of plane placements (translation, rotations, scale)
//! together with the parameters and starting layout it was tuned for.

use std::f32::consts::PI;

use bevy::prelude::*;

use super::error::FluidResult;
use super::params::FluidParams;
use super::particle::ParticleLayout;
use super::simulation::Simulation;

/// Built-in scenes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum FluidScene {
    /// Water poured onto a chute of tilted panels that spills into a wide
    /// catch floor.
    #[default]
    Cascade,
    /// Small bowl made of a floor and four sloped walls.
    Basin,
    /// No surfaces at all.
    Empty,
}

impl FluidScene {
    /// Plane placements, in registration order.
    pub fn planes(&self) -> Vec<Mat4> {
        match self {
            FluidScene::Cascade => cascade_planes(),
            FluidScene::Basin => basin_planes(),
            FluidScene::Empty => Vec::new(),
        }
    }

    /// Parameters the scene was tuned for.
    pub fn params(&self) -> FluidParams {
        match self {
            FluidScene::Cascade | FluidScene::Empty => FluidParams::cascade(),
            FluidScene::Basin => FluidParams::droplet(),
        }
    }

    /// Starting particle layout.
    pub fn layout(&self) -> ParticleLayout {
        match self {
            FluidScene::Cascade | FluidScene::Empty => ParticleLayout::default(),
            FluidScene::Basin => ParticleLayout::lattice(Vec3::new(-0.225, -0.95, -0.225), 0.05, UVec2::new(10, 10)),
        }
    }

    /// Particle count the scene was tuned for.
    pub fn particle_count(&self) -> usize {
        match self {
            FluidScene::Cascade | FluidScene::Empty => 1000,
            FluidScene::Basin => 500,
        }
    }

    /// Register the scene's planes with a simulation.
    pub fn register(&self, simulation: &mut Simulation) {
        for transform in self.planes() {
            simulation.add_plane(transform);
        }
    }

    /// Build a simulation of this scene with its own parameters and layout.
    pub fn build(&self) -> FluidResult<Simulation> {
        let mut simulation = Simulation::with_layout(self.particle_count(), &self.layout(), self.params())?;
        self.register(&mut simulation);
        Ok(simulation)
    }
}

/// `translate * rotations... * scale`, rotations applied right to left.
fn place(translation: Vec3, rotations: &[(f32, Vec3)], scale: Vec3) -> Mat4 {
    let mut transform = Mat4::from_translation(translation);
    for &(angle, axis) in rotations {
        transform *= Mat4::from_axis_angle(axis.normalize(), angle);
    }
    transform * Mat4::from_scale(scale)
}

fn cascade_planes() -> Vec<Mat4> {
    let two = Vec3::splat(2.0);
    vec![
        // Catch floor.
        place(Vec3::new(0.0, -4.0, 2.0), &[(0.0, Vec3::new(1.0, 0.0, 0.1))], Vec3::splat(20.0)),
        // Chute.
        place(Vec3::new(1.44, -1.68, -4.67), &[(0.10, Vec3::new(1.0, 0.0, 0.1))], two),
        place(Vec3::new(-0.53, -2.43, -2.0), &[(-PI / 2.1, Vec3::Z)], two),
        place(Vec3::new(-0.53, -3.43, -2.0), &[(-PI / 4.1, Vec3::Z)], two),
        place(Vec3::new(3.32, -2.43, -2.0), &[(PI / 2.0, Vec3::Z)], two),
        place(Vec3::new(1.43, -3.81, -2.16), &[(PI / 2.5, Vec3::X)], two),
        place(Vec3::new(1.43, 0.2, -5.16), &[(PI / 2.0, Vec3::X)], two),
        // Side walls.
        place(Vec3::new(2.26, -0.99, -4.93), &[(PI / 6.0, Vec3::Y), (PI / 2.0, Vec3::Z)], two),
        place(Vec3::new(-0.51, -1.44, -4.36), &[(-PI / 8.0, Vec3::Y), (PI / 2.0, Vec3::Z)], two),
        place(Vec3::new(-0.42, -2.43, 0.93), &[(PI / 6.0, Vec3::Y), (-PI / 2.1, Vec3::Z)], two),
        place(
            Vec3::new(-0.60, -3.46, 0.04),
            &[(-PI / 5.0, Vec3::Y), (-PI / 3.2, Vec3::Z)],
            Vec3::new(1.4, 0.4, 0.4),
        ),
        place(Vec3::new(3.59171, -3.60756, 0.89), &[(PI / 10.0, Vec3::Y), (PI / 2.0, Vec3::Z)], two),
        place(Vec3::new(4.21, -2.87, 4.73), &[(PI / 10.0, Vec3::Y), (PI / 2.0, Vec3::Z)], two),
        place(
            Vec3::new(3.94, -2.52, 2.83),
            &[(PI / 2.0 + PI / 10.0, Vec3::Y), (PI / 2.0, Vec3::Z)],
            Vec3::new(2.0, 0.6, 0.6),
        ),
        place(
            Vec3::new(4.25, -3.08, 5.84),
            &[(PI / 2.0 + PI / 5.0, Vec3::Y), (PI / 2.0, Vec3::Z)],
            Vec3::new(2.0, 1.0, 0.5),
        ),
        // Lip.
        place(
            Vec3::new(-0.2, -3.60756, 4.83412),
            &[(-PI / 2.0, Vec3::new(0.0, 0.2, 1.0))],
            Vec3::new(3.0, 2.0, 3.0),
        ),
    ]
}

fn basin_planes() -> Vec<Mat4> {
    let two = Vec3::splat(2.0);
    vec![
        place(Vec3::new(0.0, -1.0, 0.0), &[], two),
        place(Vec3::new(0.0, 0.0, -1.0), &[(PI / 3.0, Vec3::X)], two),
        place(Vec3::new(1.0, 0.0, 0.0), &[(PI / 3.0, Vec3::Z)], two),
        place(Vec3::new(-1.0, 0.0, 0.0), &[(-PI / 3.0, Vec3::Z)], two),
        place(Vec3::new(0.0, 0.0, 1.0), &[(-PI / 3.0, Vec3::X)], two),
    ]
}
