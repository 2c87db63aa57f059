//! Collision-aware position update.
//!
//! Every particle moves by `d = dt * v`. While some triangle lies in the way,
//! the particle stops just short of the earliest one, its velocity and the
//! remaining displacement are reflected, and the search repeats with what is
//! left of `d`. Particles that end up outside the scene bounds are recycled
//! through the respawn rule.

use bevy::log::trace;
use bevy::prelude::*;
use rand::Rng;

use super::boundary::SurfaceRegistry;
use super::params::FluidParams;
use super::particle::{random_point, ParticleSet};

/// Counters gathered during one simulation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub struct StepStats {
    /// Surface collisions resolved.
    pub collisions: usize,
    /// Particles that hit the bounce limit and lost the rest of their motion.
    pub capped: usize,
    /// Particles recycled after leaving the scene bounds.
    pub respawned: usize,
    /// Particles the spatial hash could not store.
    pub dropped: usize,
}

/// Outcome of moving a single particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Motion {
    pub bounces: u32,
    pub capped: bool,
}

/// Reflect `v` off a surface with normal `n`, keeping `restitution` of the
/// normal component.
#[inline]
pub fn reflect(v: Vec3, n: Vec3, restitution: f32) -> Vec3 {
    v - (1.0 + restitution) * v.dot(n) * n
}

/// Move one particle by `displacement`, bouncing off `surfaces`.
///
/// At most `params.max_bounces` collisions are resolved. When the limit is
/// reached the remaining displacement is discarded and the particle stays at
/// its last backed-off position.
pub fn collide_and_move(
    position: &mut Vec3,
    velocity: &mut Vec3,
    mut displacement: Vec3,
    surfaces: &SurfaceRegistry,
    params: &FluidParams,
) -> Motion {
    let mut bounces = 0;

    while let Some((index, t)) = surfaces.first_hit(*position, displacement) {
        if bounces == params.max_bounces {
            return Motion {
                bounces,
                capped: true,
            };
        }

        let triangle = surfaces.triangles()[index];
        // first_hit never reports a triangle without area.
        let Some(n) = triangle.facing_normal(displacement) else {
            break;
        };

        *position += (t - params.collision_backoff) * displacement;
        *velocity = reflect(*velocity, n, params.restitution);
        displacement = (1.0 - t) * reflect(displacement, n, params.restitution);
        bounces += 1;
    }

    *position += displacement;
    Motion {
        bounces,
        capped: false,
    }
}

/// Advance every particle by one timestep and apply the respawn rule.
pub fn move_all(
    particles: &mut ParticleSet,
    surfaces: &SurfaceRegistry,
    params: &FluidParams,
    rng: &mut impl Rng,
) -> StepStats {
    let mut stats = StepStats::default();
    let (positions, velocities) = particles.kinematics_mut();

    for (position, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
        let displacement = params.timestep * *velocity;
        let motion = collide_and_move(position, velocity, displacement, surfaces, params);
        stats.collisions += motion.bounces as usize;
        stats.capped += motion.capped as usize;

        if !params.bounds.contains(*position) {
            *position = random_point(rng, params.respawn.min, params.respawn.max);
            *velocity = params.respawn.velocity;
            stats.respawned += 1;
        }
    }

    if stats.capped > 0 {
        trace!(
            "{} particles reached the bounce limit of {}",
            stats.capped, params.max_bounces
        );
    }

    stats
}
