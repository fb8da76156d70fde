//! Steinhardt bond-order parameters and their Lechner-Dellago averages.
//!
//! For each particle `i` and order `l`:
//! - `q_lm(i)` is the mean of `Y_lm` over the bond directions to its
//!   neighbors (zero for isolated particles),
//! - `q~_lm(i)` is `q_lm(i)` scaled to unit norm, used for link dot products,
//! - `q-_lm(i)` averages `q_lm` over the particle and its neighbors,
//! - `Q_l` and `W_l` are the second and third order rotational invariants of
//!   `q-_lm`.

use crate::error::AnalysisError;
use crate::geometry::SimBox;
use crate::harmonics::{harmonic_norms, spherical_harmonics_into, third_order_couplings, MAX_L};
use crate::neighbors::NeighborTable;
use anyhow::{bail, Result};
use nalgebra::Vector3;
use num_complex::Complex;
use rayon::prelude::*;
use std::f64::consts::PI;

/// Below this value of `sum_m |q_lm|^2` the third-order invariant is
/// reported as zero instead of dividing by a vanishing norm.
pub const WL_NORM_FLOOR: f64 = 1e-12;

/// Row-major `n x (2l+1)` matrix of complex bond-order components.
#[derive(Debug, Clone, PartialEq)]
pub struct QlmMatrix {
    l: usize,
    data: Vec<Complex<f64>>,
}

impl QlmMatrix {
    pub(crate) fn from_rows(l: usize, rows: Vec<Vec<Complex<f64>>>) -> Self {
        let data = rows.into_iter().flatten().collect();
        Self { l, data }
    }

    pub fn order(&self) -> usize {
        self.l
    }

    pub fn width(&self) -> usize {
        2 * self.l + 1
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.width()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Components for m = -l..=l of particle `i`.
    pub fn row(&self, i: usize) -> &[Complex<f64>] {
        let w = self.width();
        &self.data[i * w..(i + 1) * w]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Complex<f64>]> {
        self.data.chunks(self.width())
    }
}

fn norm_sqr(row: &[Complex<f64>]) -> f64 {
    row.iter().map(|c| c.norm_sqr()).sum()
}

/// Evaluates order parameters of a single angular order.
///
/// Holds the Legendre normalizations and 3-j couplings for `l`, so one engine
/// can be reused across every particle.
#[derive(Debug, Clone)]
pub struct OrderParameterEngine {
    l: usize,
    norms: Vec<f64>,
    couplings: Vec<(usize, usize, usize, f64)>,
}

impl OrderParameterEngine {
    pub fn new(l: usize) -> Result<Self> {
        if l > MAX_L {
            bail!(AnalysisError::UnsupportedOrder(l));
        }
        Ok(Self {
            l,
            norms: harmonic_norms(l),
            couplings: third_order_couplings(l),
        })
    }

    pub fn order(&self) -> usize {
        self.l
    }

    /// q_lm for every particle.
    pub fn qlms(
        &self,
        positions: &[Vector3<f64>],
        simbox: &SimBox,
        table: &NeighborTable,
    ) -> QlmMatrix {
        let width = 2 * self.l + 1;
        let rows = positions
            .par_iter()
            .enumerate()
            .map(|(i, pi)| {
                let mut row = vec![Complex::new(0.0, 0.0); width];
                let neighbors = table.neighbors(i);
                if neighbors.is_empty() {
                    return row;
                }
                let mut ylm = vec![Complex::new(0.0, 0.0); width];
                for &j in neighbors {
                    let bond = simbox.displacement(pi, &positions[j]);
                    spherical_harmonics_into(self.l, &self.norms, &bond, &mut ylm);
                    for (acc, y) in row.iter_mut().zip(&ylm) {
                        *acc += y;
                    }
                }
                let inv = 1.0 / neighbors.len() as f64;
                for value in &mut row {
                    *value *= inv;
                }
                row
            })
            .collect();
        QlmMatrix::from_rows(self.l, rows)
    }

    /// Unit-normalized q_lm; zero rows stay zero.
    pub fn qlm_tildes(&self, qlm: &QlmMatrix) -> QlmMatrix {
        let rows = qlm
            .rows()
            .map(|row| {
                let norm = norm_sqr(row).sqrt();
                if norm > 0.0 {
                    row.iter().map(|c| c / norm).collect()
                } else {
                    row.to_vec()
                }
            })
            .collect();
        QlmMatrix::from_rows(qlm.order(), rows)
    }

    /// Lechner-Dellago average of q_lm over each particle and its neighbors.
    pub fn qlm_bars(&self, qlm: &QlmMatrix, table: &NeighborTable) -> QlmMatrix {
        let rows = (0..qlm.len())
            .into_par_iter()
            .map(|i| {
                let mut row = qlm.row(i).to_vec();
                let neighbors = table.neighbors(i);
                for &j in neighbors {
                    for (acc, value) in row.iter_mut().zip(qlm.row(j)) {
                        *acc += value;
                    }
                }
                let inv = 1.0 / (neighbors.len() + 1) as f64;
                row.iter().map(|c| c * inv).collect()
            })
            .collect();
        QlmMatrix::from_rows(qlm.order(), rows)
    }

    /// Q_l = sqrt(4 pi / (2l+1) sum_m |q_lm|^2) of one row.
    pub fn ql(&self, row: &[Complex<f64>]) -> f64 {
        (4.0 * PI / (2 * self.l + 1) as f64 * norm_sqr(row)).sqrt()
    }

    /// W_l of one row, normalized by (sum_m |q_lm|^2)^(3/2).
    pub fn wl(&self, row: &[Complex<f64>]) -> f64 {
        let total = norm_sqr(row);
        if total <= WL_NORM_FLOOR {
            return 0.0;
        }
        let mut acc = Complex::new(0.0, 0.0);
        for &(a, b, c, coupling) in &self.couplings {
            acc += row[a] * row[b] * row[c] * coupling;
        }
        acc.re / total.powf(1.5)
    }

    pub fn qls(&self, qlm: &QlmMatrix) -> Vec<f64> {
        qlm.rows().map(|row| self.ql(row)).collect()
    }

    pub fn wls(&self, qlm: &QlmMatrix) -> Vec<f64> {
        qlm.rows().map(|row| self.wl(row)).collect()
    }

    /// Q_l of the particle-averaged q_lm over `indices`.
    pub fn global_ql(&self, qlm: &QlmMatrix, indices: impl IntoIterator<Item = usize>) -> f64 {
        let mut mean = vec![Complex::new(0.0, 0.0); qlm.width()];
        let mut count = 0usize;
        for i in indices {
            for (acc, value) in mean.iter_mut().zip(qlm.row(i)) {
                *acc += value;
            }
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        for value in &mut mean {
            *value /= count as f64;
        }
        self.ql(&mean)
    }
}

/// Dot product Re sum_m a_m conj(b_m) of two q~ rows.
pub fn link_dot(a: &[Complex<f64>], b: &[Complex<f64>]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x * y.conj()).re).sum()
}

/// Averaged invariants used by the Lechner-Dellago classifier, one entry per
/// particle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LdDescriptors {
    pub q4: Vec<f64>,
    pub w4: Vec<f64>,
    pub q6: Vec<f64>,
    pub w6: Vec<f64>,
}

impl LdDescriptors {
    pub fn compute(
        positions: &[Vector3<f64>],
        simbox: &SimBox,
        table: &NeighborTable,
    ) -> Result<Self> {
        let engine4 = OrderParameterEngine::new(4)?;
        let engine6 = OrderParameterEngine::new(6)?;

        let q4_bar = engine4.qlm_bars(&engine4.qlms(positions, simbox, table), table);
        let q6_bar = engine6.qlm_bars(&engine6.qlms(positions, simbox, table), table);

        Ok(Self {
            q4: engine4.qls(&q4_bar),
            w4: engine4.wls(&q4_bar),
            q6: engine6.qls(&q6_bar),
            w6: engine6.wls(&q6_bar),
        })
    }

    pub fn len(&self) -> usize {
        self.q6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q6.is_empty()
    }

    /// (Q4, Q6, W4, W6) of particle `i`.
    pub fn signature(&self, i: usize) -> [f64; 4] {
        [self.q4[i], self.q6[i], self.w4[i], self.w6[i]]
    }

    /// Q4, W4, Q6 and W6 laid back to back.
    pub fn concatenated(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(4 * self.len());
        out.extend_from_slice(&self.q4);
        out.extend_from_slice(&self.w4);
        out.extend_from_slice(&self.q6);
        out.extend_from_slice(&self.w6);
        out
    }
}
