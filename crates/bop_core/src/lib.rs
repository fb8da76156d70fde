pub mod analysis;
pub mod cells;
pub mod classify;
pub mod cluster;
pub mod error;
pub mod geometry;
pub mod harmonics;
/// The `bop_core` crate computes Steinhardt bond-order parameters for particle
/// configurations in a rectangular box and classifies each particle as liquid,
/// crystalline or surface.
///
/// Key components:
/// - **Geometry**: `SimBox` minimum-image distances, periodic in x and y and optionally in z.
/// - **Neighbors**: cutoff or k-nearest tables, accelerated by a cell grid.
/// - **Order**: per-particle q_lm, normalized and neighbor-averaged vectors, Q_l and W_l.
/// - **Classify**: ten Wolde-Frenkel link counting and Lechner-Dellago structure labels.
/// - **Cluster**: largest connected crystalline cluster.
/// - **Analysis**: the named operations, each a pure function of positions, box and settings.
pub mod lattice;
pub mod neighbors;
pub mod order;
pub mod settings;

pub use analysis::Configuration;
pub use error::AnalysisError;
pub use geometry::SimBox;
pub use settings::AnalysisSettings;
