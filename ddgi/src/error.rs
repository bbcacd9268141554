use glam::{UVec2, UVec3};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum DdgiError {
    #[error("probes count must be non-zero on every axis (got {0})")]
    InvalidProbesCount(UVec3),

    #[error("cascades count must be within 1..={max} (got {actual})")]
    InvalidCascadesCount { actual: u32, max: u32 },

    #[error("probe spacing must be a positive number (got {0})")]
    InvalidSpacing(f32),

    #[error(
        "atlas `{atlas}` has size {actual}, but the volume requires {expected}"
    )]
    AtlasSizeMismatch {
        atlas: &'static str,
        expected: UVec2,
        actual: UVec2,
    },

    #[error("expected {expected} texels, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("got {points} sample points, but space for {outputs} results")]
    BatchSizeMismatch { points: usize, outputs: usize },
}
