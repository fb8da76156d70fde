//! Periodic simulation box and minimum-image geometry.
//!
//! The x and y axes are always periodic; z is periodic only when the box is
//! built with `z_periodic = true` (slab geometries with a substrate leave it
//! open).

use crate::error::AnalysisError;
use anyhow::{bail, Result};
use log::warn;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Box dimensions, z periodicity and the neighbor cutoff.
///
/// The minimum-image convention is only unambiguous when the cutoff is below
/// half of the smallest periodic dimension. That condition is NOT enforced:
/// violating it gives undefined neighbor sets, and construction only logs a
/// warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimBox {
    pub lengths: [f64; 3],
    pub cutoff: f64,
    pub z_periodic: bool,
}

impl SimBox {
    pub fn new(lx: f64, ly: f64, lz: f64, cutoff: f64, z_periodic: bool) -> Result<Self> {
        let dims_ok = [lx, ly, lz].iter().all(|l| l.is_finite() && *l > 0.0);
        if !dims_ok {
            bail!(AnalysisError::InvalidBox { lx, ly, lz });
        }
        if !cutoff.is_finite() || cutoff < 0.0 {
            bail!(AnalysisError::InvalidCutoff(cutoff));
        }

        let simbox = Self {
            lengths: [lx, ly, lz],
            cutoff,
            z_periodic,
        };
        if let Some(min_periodic) = simbox.min_periodic_length() {
            if cutoff >= 0.5 * min_periodic {
                warn!(
                    "Cutoff {} is not below half the smallest periodic length {}; \
                     minimum-image neighbors are ambiguous.",
                    cutoff, min_periodic
                );
            }
        }
        Ok(simbox)
    }

    pub fn is_periodic(&self, axis: usize) -> bool {
        axis < 2 || self.z_periodic
    }

    fn min_periodic_length(&self) -> Option<f64> {
        (0..3)
            .filter(|&axis| self.is_periodic(axis))
            .map(|axis| self.lengths[axis])
            .reduce(f64::min)
    }

    /// Minimum-image displacement pointing from `a` to `b`.
    pub fn displacement(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
        let mut d = b - a;
        for axis in 0..3 {
            if self.is_periodic(axis) {
                let l = self.lengths[axis];
                d[axis] -= l * (d[axis] / l).round();
            }
        }
        d
    }

    pub fn distance_sq(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        self.displacement(a, b).norm_squared()
    }

    pub fn distance(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        self.distance_sq(a, b).sqrt()
    }
}

/// Builds particle positions from three coordinate sequences.
pub fn positions_from_xyz(x: &[f64], y: &[f64], z: &[f64]) -> Result<Vec<Vector3<f64>>> {
    if x.len() != y.len() || x.len() != z.len() {
        bail!(AnalysisError::LengthMismatch {
            x: x.len(),
            y: y.len(),
            z: z.len(),
        });
    }
    Ok(x.iter()
        .zip(y)
        .zip(z)
        .map(|((&x, &y), &z)| Vector3::new(x, y, z))
        .collect())
}
