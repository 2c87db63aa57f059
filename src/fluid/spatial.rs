//! Spatial hashing for efficient neighbor search.
//!
//! Particles are bucketed by the hash of their grid cell into a fixed table of
//! fixed-capacity buckets. The table is rebuilt from scratch every step.
//!
//! # Capacity contract
//!
//! A bucket holds at most [`SpatialHashConfig::max_particles_per_cell`]
//! indices. Particles hashing into a full bucket are dropped for that step:
//! they still move, but no neighbor query sees them. The table never grows,
//! so probing a bucket stays O(1). [`SpatialHashGrid::dropped`] reports how many
//! particles the last rebuild had to leave out.

use bevy::log::debug;
use bevy::prelude::*;

use super::error::{FluidError, FluidResult};

/// Large primes for hash mixing.
const P1: i32 = 73_856_093;
const P2: i32 = 19_349_663;
const P3: i32 = 83_492_791;

/// Configuration for the spatial hash grid.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct SpatialHashConfig {
    /// Edge length of a grid cell.
    pub cell_size: f32,

    /// Cells scanned on each side of a particle's own cell.
    /// `cell_size * half_width` must reach the kernel support radius.
    pub half_width: u32,

    /// Number of hash slots (should be prime for good distribution).
    pub hash_table_size: usize,

    /// Bucket capacity. Entries past it are dropped.
    pub max_particles_per_cell: usize,
}

impl Default for SpatialHashConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.25,
            half_width: 2,
            hash_table_size: 10_007,
            max_particles_per_cell: 32,
        }
    }
}

impl SpatialHashConfig {
    /// Calculate the grid cell for a position.
    pub fn position_to_cell(&self, position: Vec3) -> IVec3 {
        (position / self.cell_size).floor().as_ivec3()
    }

    /// Calculate the hash slot for a cell coordinate. Always in
    /// `0..hash_table_size`, including for negative cells.
    pub fn cell_to_hash(&self, cell: IVec3) -> usize {
        let mixed = cell.x.wrapping_mul(P1) ^ cell.y.wrapping_mul(P2) ^ cell.z.wrapping_mul(P3);
        mixed.rem_euclid(self.hash_table_size as i32) as usize
    }

    /// Calculate hash directly from position.
    pub fn position_to_hash(&self, position: Vec3) -> usize {
        self.cell_to_hash(self.position_to_cell(position))
    }

    /// Number of cells in the scanned stencil.
    pub fn stencil_len(&self) -> usize {
        let side = 2 * self.half_width as usize + 1;
        side * side * side
    }

    pub fn validate(&self) -> FluidResult<()> {
        if !(self.cell_size > 0.0 && self.cell_size.is_finite()) {
            return Err(FluidError::NonPositive {
                name: "cell_size",
                value: self.cell_size,
            });
        }
        let max = i32::MAX as usize;
        if self.hash_table_size == 0 || self.hash_table_size > max {
            return Err(FluidError::InvalidTableSize {
                size: self.hash_table_size,
                max,
            });
        }
        if self.max_particles_per_cell == 0 {
            return Err(FluidError::EmptyBucket);
        }
        Ok(())
    }
}

/// Fixed-size bucketed hash of particle indices.
#[derive(Clone, Debug)]
pub struct SpatialHashGrid {
    config: SpatialHashConfig,
    /// `hash_table_size * max_particles_per_cell` slots, bucket-major.
    slots: Vec<usize>,
    /// Filled length of every bucket.
    counts: Vec<usize>,
    /// Particles left out by the last rebuild.
    dropped: usize,
}

impl SpatialHashGrid {
    /// Create an empty grid. The config is expected to be validated.
    pub fn new(config: SpatialHashConfig) -> Self {
        Self {
            slots: vec![0; config.hash_table_size * config.max_particles_per_cell],
            counts: vec![0; config.hash_table_size],
            dropped: 0,
            config,
        }
    }

    pub fn config(&self) -> &SpatialHashConfig {
        &self.config
    }

    /// Clear the hash table.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.dropped = 0;
    }

    /// Rebuild the table from particle positions.
    pub fn rebuild(&mut self, positions: &[Vec3]) {
        self.clear();
        let capacity = self.config.max_particles_per_cell;

        for (i, &pos) in positions.iter().enumerate() {
            let hash = self.config.position_to_hash(pos);
            let count = &mut self.counts[hash];
            if *count < capacity {
                self.slots[hash * capacity + *count] = i;
                *count += 1;
            } else {
                self.dropped += 1;
            }
        }

        if self.dropped > 0 {
            debug!(
                "spatial hash dropped {} of {} particles (bucket capacity {})",
                self.dropped,
                positions.len(),
                capacity
            );
        }
    }

    /// Particle indices stored in a hash slot.
    pub fn bucket(&self, hash: usize) -> &[usize] {
        let capacity = self.config.max_particles_per_cell;
        let start = hash * capacity;
        &self.slots[start..start + self.counts[hash]]
    }

    /// Number of particles the last rebuild could not store.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Distinct hash slots covering the stencil around a position, sorted.
    ///
    /// Different cells of the stencil may collide in the table; each slot is
    /// listed once so no candidate is visited twice.
    pub fn stencil_hashes(&self, position: Vec3) -> Vec<usize> {
        let mut hashes = Vec::with_capacity(self.config.stencil_len());
        self.stencil_hashes_into(position, &mut hashes);
        hashes
    }

    /// [`stencil_hashes`](Self::stencil_hashes) written into a reused buffer.
    /// A buffer of `stencil_len()` capacity never reallocates.
    pub fn stencil_hashes_into(&self, position: Vec3, hashes: &mut Vec<usize>) {
        let cell = self.config.position_to_cell(position);
        let w = self.config.half_width as i32;

        hashes.clear();
        for dx in -w..=w {
            for dy in -w..=w {
                for dz in -w..=w {
                    hashes.push(self.config.cell_to_hash(cell + IVec3::new(dx, dy, dz)));
                }
            }
        }
        hashes.sort_unstable();
        hashes.dedup();
    }

    /// Visit the neighbor candidates of a position without allocating.
    /// `hashes` is scratch space, overwritten on every call.
    pub fn for_each_candidate(&self, position: Vec3, hashes: &mut Vec<usize>, mut visit: impl FnMut(usize)) {
        self.stencil_hashes_into(position, hashes);
        for &hash in hashes.iter() {
            for &j in self.bucket(hash) {
                visit(j);
            }
        }
    }

    /// Neighbor candidates of a position: every stored particle whose slot is
    /// hit by the stencil. Includes far particles that share a slot; callers
    /// filter by distance (the kernels cut off at the support radius).
    pub fn candidates(&self, position: Vec3) -> Vec<usize> {
        let mut hashes = Vec::with_capacity(self.config.stencil_len());
        let mut candidates = Vec::new();
        self.for_each_candidate(position, &mut hashes, |j| candidates.push(j));
        candidates
    }
}
