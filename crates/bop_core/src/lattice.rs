use anyhow::{bail, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Ideal crystal structures used as seeds and as reference configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lattice {
    Fcc,
    Hcp,
    Bcc,
    Sc,
}

impl Lattice {
    /// Global Q6 of the perfect structure with its first coordination shell
    /// (12 neighbors for FCC and HCP, 14 for BCC, 6 for simple cubic).
    pub fn ideal_q6(self) -> f64 {
        match self {
            Lattice::Fcc => 0.57452,
            Lattice::Hcp => 0.48476,
            Lattice::Bcc => 0.51069,
            Lattice::Sc => 0.35355,
        }
    }

    pub fn particles_per_cell(self) -> usize {
        self.basis().len()
    }

    /// Fractional coordinates of the basis. HCP uses the orthorhombic cell
    /// (a, a sqrt(3), c) with ideal c/a.
    fn basis(self) -> &'static [[f64; 3]] {
        match self {
            Lattice::Fcc => &[
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 0.0, 0.5],
                [0.0, 0.5, 0.5],
            ],
            Lattice::Hcp => &[
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 1.0 / 6.0, 0.5],
                [0.0, 2.0 / 3.0, 0.5],
            ],
            Lattice::Bcc => &[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
            Lattice::Sc => &[[0.0, 0.0, 0.0]],
        }
    }

    /// Edge lengths of the conventional cell for lattice constant `a`.
    pub fn cell_lengths(self, a: f64) -> [f64; 3] {
        match self {
            Lattice::Hcp => [a, a * 3f64.sqrt(), a * (8.0f64 / 3.0).sqrt()],
            _ => [a, a, a],
        }
    }

    /// Positions filling `cells^3` conventional cells starting at the origin.
    pub fn positions(self, cells: usize, a: f64) -> Vec<Vector3<f64>> {
        let lengths = self.cell_lengths(a);
        let basis = self.basis();
        let mut positions = Vec::with_capacity(cells * cells * cells * basis.len());
        for i in 0..cells {
            for j in 0..cells {
                for k in 0..cells {
                    for b in basis {
                        positions.push(Vector3::new(
                            (i as f64 + b[0]) * lengths[0],
                            (j as f64 + b[1]) * lengths[1],
                            (k as f64 + b[2]) * lengths[2],
                        ));
                    }
                }
            }
        }
        positions
    }

    /// Lattice constant giving number density `density`.
    pub fn constant_for_density(self, density: f64) -> Result<f64> {
        if !density.is_finite() || density <= 0.0 {
            bail!("Density must be positive, got {}.", density);
        }
        let [lx, ly, lz] = self.cell_lengths(1.0);
        let volume_per_cell = lx * ly * lz;
        Ok((self.particles_per_cell() as f64 / (density * volume_per_cell)).cbrt())
    }
}

/// Number of particles a perfect `lattice` seed would need to reproduce a
/// measured global Q6 in a system of `n_particles`.
pub fn equivalent_seed_size(q6_global: f64, lattice: Lattice, n_particles: usize) -> f64 {
    q6_global / lattice.ideal_q6() * n_particles as f64
}
