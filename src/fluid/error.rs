//! Error types for fluid simulation setup.
//!
//! Stepping never fails: numeric degeneracies are handled locally by the
//! kernels, the grid and the integrator. Only invalid configuration is
//! reported, and only when a simulation is built or reconfigured.

/// Result alias for fallible simulation setup.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors raised while validating [`FluidParams`](super::params::FluidParams).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FluidError {
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f32 },

    #[error("{name} must be finite")]
    NonFinite { name: &'static str },

    #[error(
        "neighbor stencil too small: cell_size {cell_size} * half_width {half_width} < effective_radius {effective_radius}"
    )]
    StencilTooSmall {
        cell_size: f32,
        half_width: u32,
        effective_radius: f32,
    },

    #[error("hash table size must be in 1..={max}, got {size}")]
    InvalidTableSize { size: usize, max: usize },

    #[error("bucket capacity must be at least 1")]
    EmptyBucket,

    #[error("{name} region is inverted: min {min:?} is not below max {max:?}")]
    InvertedRegion {
        name: &'static str,
        min: [f32; 3],
        max: [f32; 3],
    },

    #[error("spawn region must lie inside the scene bounds")]
    SpawnOutsideBounds,

    #[error("max_bounces must be at least 1")]
    NoBounces,
}
