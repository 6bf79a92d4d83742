use thiserror::Error;

/// Top-level error type for the Bevelis kernel.
#[derive(Debug, Error)]
pub enum BevelisError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Offset(#[from] OffsetError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max})")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to the planar model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("point index {index} out of range (pool has {len} points)")]
    PointOutOfRange { index: usize, len: usize },

    #[error("face index {index} out of range (model has {len} faces)")]
    FaceOutOfRange { index: usize, len: usize },

    #[error("face needs at least 3 vertices, got {0}")]
    FaceTooSmall(usize),
}

/// Errors raised by the inward offset engine.
#[derive(Debug, Error)]
pub enum OffsetError {
    #[error("degenerate area: fewer than 3 distinct vertices")]
    DegenerateArea,

    #[error("offset did not settle within {cap} wavefront events")]
    IterationLimit { cap: usize },

    #[error("wavefront stalled before full collapse")]
    Stalled,
}

/// Errors raised during triangulation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("degenerate loop: {0}")]
    DegenerateLoop(String),

    #[error("no clippable ear with {remaining} vertices remaining")]
    NoEar { remaining: usize },

    #[error("no outer vertex visible from hole {0}")]
    NoBridge(usize),
}

/// Convenience type alias for results using [`BevelisError`].
pub type Result<T> = std::result::Result<T, BevelisError>;
