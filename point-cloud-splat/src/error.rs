//! Errors raised by host-side validation.
//!
//! The per-vertex, per-fragment and per-sample functions never fail; only the
//! checks a host runs before issuing a draw return these.

use thiserror::Error;

pub type SplatResult<T> = Result<T, SplatError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplatError {
    #[error("instance {instance} has a non-finite transform")]
    NonFiniteTransform { instance: usize },

    #[error("point {point} of instance {instance} is not finite")]
    NonFinitePoint { instance: usize, point: usize },

    #[error("point {point} of instance {instance} has negative size {size}")]
    NegativeSize {
        instance: usize,
        point: usize,
        size: f32,
    },

    #[error("{points} points exceed the addressable vertex range")]
    PointCountOverflow { points: usize },

    #[error("distance bounds must be finite (min {min}, max {max})")]
    InvalidDistanceBounds { min: f32, max: f32 },

    #[error("invalid scene configuration: {0}")]
    Config(String),
}
