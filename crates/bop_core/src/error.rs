use thiserror::Error;

/// Precondition violations detected at the entry of an analysis call.
///
/// These never carry a partial result: the call fails before any stage runs.
/// Functions in this crate return `anyhow::Result`, so callers that need to
/// branch on the failure can `downcast_ref::<AnalysisError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Box dimensions must be positive and finite, got ({lx}, {ly}, {lz}).")]
    InvalidBox { lx: f64, ly: f64, lz: f64 },

    #[error("Neighbor cutoff must be finite and non-negative, got {0}.")]
    InvalidCutoff(f64),

    #[error("Coordinate arrays differ in length: x={x}, y={y}, z={z}.")]
    LengthMismatch { x: usize, y: usize, z: usize },

    #[error("Surface particle count {n_surface} exceeds particle count {n_particles}.")]
    SurfaceOutOfRange { n_surface: usize, n_particles: usize },

    #[error("Angular order l={0} is outside the supported range 0..={max}.", max = crate::harmonics::MAX_L)]
    UnsupportedOrder(usize),

    #[error("Nearest-neighbor count k must be at least 1.")]
    InvalidNearestCount,

    #[error("Link threshold must be finite, got {0}.")]
    InvalidLinkThreshold(f64),
}
