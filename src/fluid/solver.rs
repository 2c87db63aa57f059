//! SPH density and force evaluation.
//!
//! Each step runs two passes over the particles:
//!
//! 1. **Density pass**: density by poly6 summation over the neighbor stencil,
//!    then pressure from a linear equation of state.
//! 2. **Force pass**: pressure, viscosity and head-on repulsion against every
//!    distinct neighbor, plus gravity, integrated over one timestep into a new
//!    velocity.
//!
//! The force pass starts only once every density and pressure of the step is
//! final, and it writes into a scratch buffer that replaces the live velocities
//! only after all particles are done. The visiting order therefore never
//! changes the result, and the passes can run on the rayon pool.

use std::f32::consts::PI;

use rayon::prelude::*;

use bevy::prelude::*;

use super::params::FluidParams;
use super::particle::ParticleSet;
use super::spatial::SpatialHashGrid;

/// Pads denominators that vanish when two particles coincide.
pub const KERNEL_EPSILON: f32 = 1e-10;

/// SPH kernel functions.
///
/// All kernels take the separation `r = x_i - x_j` and the support radius `h`,
/// return exactly zero for `|r| > h`, and stay finite as `|r| -> 0`.
pub struct SphKernels;

impl SphKernels {
    /// Poly6 kernel for density estimation.
    /// W(r, h) = (315 / 64πh⁹) * (h² - |r|²)³ for |r| ≤ h
    #[inline]
    pub fn poly6(r: Vec3, h: f32) -> f32 {
        let r_sq = r.length_squared();
        let h_sq = h * h;
        if r_sq > h_sq {
            return 0.0;
        }
        let diff = h_sq - r_sq;
        let coefficient = 315.0 / (64.0 * PI * h.powi(9));
        coefficient * diff * diff * diff
    }

    /// Spiky gradient for pressure forces, pointing along `r`.
    /// ∇W(r, h) = 45 (h - |r|)³ r / (πh⁶ |r| + ε) for |r| ≤ h
    #[inline]
    pub fn spiky_gradient(r: Vec3, h: f32) -> Vec3 {
        let r_len = r.length();
        if r_len > h {
            return Vec3::ZERO;
        }
        let diff = h - r_len;
        r * (45.0 * diff * diff * diff / (PI * h.powi(6) * r_len + KERNEL_EPSILON))
    }

    /// Laplacian of viscosity kernel.
    /// ∇²W(r, h) = (45 / πh⁶) * (h - |r|) for |r| ≤ h
    #[inline]
    pub fn viscosity_laplacian(r: Vec3, h: f32) -> f32 {
        let r_len = r.length();
        if r_len > h {
            return 0.0;
        }
        45.0 * (h - r_len) / (PI * h.powi(6))
    }
}

/// SPH-interpolated density at particle `i`, its own contribution included.
/// `hashes` is neighbor-query scratch space.
pub fn density_at(
    i: usize,
    positions: &[Vec3],
    grid: &SpatialHashGrid,
    params: &FluidParams,
    hashes: &mut Vec<usize>,
) -> f32 {
    let h = params.effective_radius;
    let pos_i = positions[i];

    let mut sum = 0.0;
    grid.for_each_candidate(pos_i, hashes, |j| {
        sum += SphKernels::poly6(pos_i - positions[j], h);
    });
    params.particle_mass * sum
}

/// Linear equation of state.
#[inline]
pub fn pressure_from_density(density: f32, params: &FluidParams) -> f32 {
    params.rest_pressure + params.gas_constant * (density - params.rest_density)
}

/// Velocity of particle `i` after one timestep of pressure, viscosity,
/// repulsion and gravity. Reads only finished densities and pressures.
#[allow(clippy::too_many_arguments)]
pub fn velocity_at(
    i: usize,
    positions: &[Vec3],
    velocities: &[Vec3],
    densities: &[f32],
    pressures: &[f32],
    grid: &SpatialHashGrid,
    params: &FluidParams,
    hashes: &mut Vec<usize>,
) -> Vec3 {
    let h = params.effective_radius;
    let pos_i = positions[i];
    let vel_i = velocities[i];
    let p_i = pressures[i];

    let mut force = Vec3::ZERO;
    grid.for_each_candidate(pos_i, hashes, |j| {
        if j == i {
            return;
        }
        let r = pos_i - positions[j];
        if r.length_squared() > h * h {
            return;
        }
        let vel_j = velocities[j];
        // Keeps the division finite if a density is zero.
        let rho_j = densities[j].max(KERNEL_EPSILON);

        force += (p_i + pressures[j]) / (2.0 * rho_j) * SphKernels::spiky_gradient(r, h);
        force -= params.viscosity * (vel_i - vel_j) / rho_j * SphKernels::viscosity_laplacian(r, h);

        let approach = vel_i.dot(vel_j);
        if approach < 0.0 && params.repulsion > 0.0 {
            let norm = vel_i.length() * vel_j.length() + KERNEL_EPSILON;
            force += vel_i * params.repulsion * approach / norm;
        }
    });

    vel_i + params.timestep * (force + params.gravity)
}

/// Run the density pass, visiting particles in `order`.
///
/// `order` must be a permutation of `0..positions.len()`. The neighbor-query
/// scratch is allocated once per call.
pub fn density_pass(
    positions: &[Vec3],
    grid: &SpatialHashGrid,
    params: &FluidParams,
    order: &[usize],
    densities: &mut [f32],
    pressures: &mut [f32],
) {
    let mut hashes = Vec::with_capacity(grid.config().stencil_len());
    for &i in order {
        let density = density_at(i, positions, grid, params, &mut hashes);
        densities[i] = density;
        pressures[i] = pressure_from_density(density, params);
    }
}

/// CPU SPH solver. Owns the scratch velocity buffer of the force pass and the
/// neighbor-query scratch of the serial path.
#[derive(Clone, Debug, Default)]
pub struct SphSolver {
    next_velocities: Vec<Vec3>,
    order: Vec<usize>,
    hashes: Vec<usize>,
}

impl SphSolver {
    /// Create a solver for `particle_count` particles.
    pub fn new(particle_count: usize) -> Self {
        Self {
            next_velocities: vec![Vec3::ZERO; particle_count],
            order: (0..particle_count).collect(),
            hashes: Vec::new(),
        }
    }

    /// Recompute densities, pressures and velocities of every particle.
    pub fn compute_velocities(
        &mut self,
        particles: &mut ParticleSet,
        grid: &SpatialHashGrid,
        params: &FluidParams,
    ) {
        if self.order.len() != particles.len() {
            self.order = (0..particles.len()).collect();
        }
        let order = std::mem::take(&mut self.order);
        self.compute_velocities_in_order(particles, grid, params, &order);
        self.order = order;
    }

    /// Same as [`compute_velocities`](Self::compute_velocities) with an
    /// explicit visiting order for the serial path. The parallel path ignores
    /// the order; the result does not depend on it either way.
    pub fn compute_velocities_in_order(
        &mut self,
        particles: &mut ParticleSet,
        grid: &SpatialHashGrid,
        params: &FluidParams,
        order: &[usize],
    ) {
        let n = particles.len();
        if n == 0 {
            return;
        }
        self.next_velocities.resize(n, Vec3::ZERO);

        let stencil_len = grid.config().stencil_len();
        let (positions, velocities, densities, pressures) = particles.state_mut();

        if params.parallel {
            // One scratch buffer per rayon job.
            densities
                .par_iter_mut()
                .zip(pressures.par_iter_mut())
                .enumerate()
                .for_each_init(
                    || Vec::<usize>::with_capacity(stencil_len),
                    |hashes, (i, (density, pressure))| {
                        *density = density_at(i, positions, grid, params, hashes);
                        *pressure = pressure_from_density(*density, params);
                    },
                );

            let (densities, pressures) = (&*densities, &*pressures);
            self.next_velocities
                .par_iter_mut()
                .enumerate()
                .for_each_init(
                    || Vec::<usize>::with_capacity(stencil_len),
                    |hashes, (i, next)| {
                        *next = velocity_at(i, positions, velocities, densities, pressures, grid, params, hashes);
                    },
                );
        } else {
            density_pass(positions, grid, params, order, densities, pressures);

            self.hashes.reserve(stencil_len);
            for &i in order {
                self.next_velocities[i] = velocity_at(
                    i,
                    positions,
                    velocities,
                    densities,
                    pressures,
                    grid,
                    params,
                    &mut self.hashes,
                );
            }
        }

        particles.swap_velocities(&mut self.next_velocities);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluid::spatial::SpatialHashGrid;

    fn radii() -> [f32; 4] {
        [0.0435, 0.25, 0.5, 2.0]
    }

    #[test]
    fn test_kernels_vanish_outside_support() {
        for h in radii() {
            for scale in [1.0001, 1.5, 10.0] {
                let r = Vec3::new(0.6, -0.8, 0.0) * h * scale;
                assert_eq!(SphKernels::poly6(r, h), 0.0);
                assert_eq!(SphKernels::spiky_gradient(r, h), Vec3::ZERO);
                assert_eq!(SphKernels::viscosity_laplacian(r, h), 0.0);
            }
        }
    }

    #[test]
    fn test_kernels_finite_near_zero() {
        for h in radii() {
            for len in [0.0, 1e-30, 1e-12, 1e-6] {
                let r = Vec3::new(1.0, 2.0, -2.0).normalize() * len;
                assert!(SphKernels::poly6(r, h).is_finite());
                assert!(SphKernels::spiky_gradient(r, h).is_finite());
                assert!(SphKernels::viscosity_laplacian(r, h).is_finite());
            }
        }
    }

    #[test]
    fn test_poly6_kernel() {
        let h = 1.0;

        // At r=0, kernel should be maximum
        let w_0 = SphKernels::poly6(Vec3::ZERO, h);
        assert!((w_0 - 315.0 / (64.0 * PI)).abs() < 1e-5);

        // At r=h, kernel should be 0
        let w_h = SphKernels::poly6(Vec3::X * h, h);
        assert!(w_h.abs() < 1e-6);

        // Kernel should decrease with distance
        let w_half = SphKernels::poly6(Vec3::X * 0.5, h);
        assert!(w_half < w_0);
        assert!(w_half > w_h);
    }

    #[test]
    fn test_spiky_gradient_points_along_separation() {
        let h = 1.0;
        let r = Vec3::new(0.5, 0.0, 0.0);
        let grad = SphKernels::spiky_gradient(r, h);

        assert!(grad.x > 0.0);
        assert_eq!(grad.y, 0.0);
        // 45 (h - |r|)³ / (π h⁶)
        let expected = 45.0 * 0.125 / PI;
        assert!((grad.length() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_viscosity_laplacian() {
        let h = 1.0;
        let at_center = SphKernels::viscosity_laplacian(Vec3::ZERO, h);
        assert!((at_center - 45.0 / PI).abs() < 1e-4);
        assert!(SphKernels::viscosity_laplacian(Vec3::Y * 0.5, h) < at_center);
    }

    fn cluster() -> Vec<Vec3> {
        let mut positions = Vec::new();
        for x in 0..5 {
            for y in 0..4 {
                for z in 0..3 {
                    let jitter = ((x * 7 + y * 3 + z) % 5) as f32 * 0.013;
                    positions.push(Vec3::new(x as f32, y as f32, z as f32) * 0.21 + jitter);
                }
            }
        }
        positions
    }

    fn swirl(positions: &[Vec3]) -> Vec<Vec3> {
        positions
            .iter()
            .map(|p| Vec3::new(-p.z, 0.3 * p.x, p.y - 0.2))
            .collect()
    }

    #[test]
    fn test_density_pass_order_independent() {
        let params = FluidParams::cascade();
        let positions = cluster();
        let n = positions.len();
        let mut grid = SpatialHashGrid::new(params.grid);
        grid.rebuild(&positions);

        let forward: Vec<usize> = (0..n).collect();
        let mut shuffled: Vec<usize> = (0..n).rev().collect();
        shuffled.rotate_left(n / 3);

        let mut densities_a = vec![0.0; n];
        let mut pressures_a = vec![0.0; n];
        density_pass(&positions, &grid, &params, &forward, &mut densities_a, &mut pressures_a);

        let mut densities_b = vec![0.0; n];
        let mut pressures_b = vec![0.0; n];
        density_pass(&positions, &grid, &params, &shuffled, &mut densities_b, &mut pressures_b);

        for i in 0..n {
            assert!((densities_a[i] - densities_b[i]).abs() <= 1e-4 * densities_a[i].abs());
            assert!((pressures_a[i] - pressures_b[i]).abs() <= 1e-3);
        }
    }

    fn evaluate(params: &FluidParams, order: Option<&[usize]>) -> ParticleSet {
        let positions = cluster();
        let velocities = swirl(&positions);
        let mut particles = ParticleSet::from_positions(positions.clone());
        for (i, v) in velocities.into_iter().enumerate() {
            particles.set_velocity(i, v);
        }
        let mut grid = SpatialHashGrid::new(params.grid);
        grid.rebuild(&positions);

        let mut solver = SphSolver::new(particles.len());
        match order {
            Some(order) => solver.compute_velocities_in_order(&mut particles, &grid, params, order),
            None => solver.compute_velocities(&mut particles, &grid, params),
        }
        particles
    }

    #[test]
    fn test_velocity_update_order_independent() {
        let params = FluidParams::cascade();
        let n = cluster().len();
        let reversed: Vec<usize> = (0..n).rev().collect();

        let a = evaluate(&params, None);
        let b = evaluate(&params, Some(&reversed));

        for i in 0..n {
            assert!((a.velocity(i) - b.velocity(i)).length() <= 1e-4 * (1.0 + a.velocity(i).length()));
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let serial = evaluate(&FluidParams::cascade(), None);
        let parallel = evaluate(&FluidParams::cascade().with_parallel(true), None);

        for i in 0..serial.len() {
            assert!((serial.density(i) - parallel.density(i)).abs() <= 1e-4 * serial.density(i));
            assert!(
                (serial.velocity(i) - parallel.velocity(i)).length()
                    <= 1e-4 * (1.0 + serial.velocity(i).length())
            );
        }
    }

    #[test]
    fn test_lone_particle_only_feels_gravity() {
        let params = FluidParams::cascade();
        let mut particles = ParticleSet::from_positions(vec![Vec3::ZERO]);
        let mut grid = SpatialHashGrid::new(params.grid);
        grid.rebuild(particles.positions());

        SphSolver::new(1).compute_velocities(&mut particles, &grid, &params);

        // Self contribution only: mass * W(0).
        let expected = params.particle_mass * SphKernels::poly6(Vec3::ZERO, params.effective_radius);
        assert!((particles.density(0) - expected).abs() < 1e-3);
        assert_eq!(particles.velocity(0), params.gravity * params.timestep);
    }

    #[test]
    fn test_high_pressure_pushes_apart() {
        let params = FluidParams::cascade()
            .with_gravity(Vec3::ZERO)
            .with_viscosity(0.0)
            .with_pressure(50.0, 0.0);
        let mut particles = ParticleSet::from_positions(vec![Vec3::ZERO, Vec3::new(0.2, 0.0, 0.0)]);
        let mut grid = SpatialHashGrid::new(params.grid);
        grid.rebuild(particles.positions());

        SphSolver::new(2).compute_velocities(&mut particles, &grid, &params);

        assert!(particles.velocity(0).x < 0.0);
        assert!(particles.velocity(1).x > 0.0);
    }
}
