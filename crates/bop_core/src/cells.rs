//! Cell-list partition used to accelerate cutoff neighbor searches.

use crate::geometry::SimBox;
use nalgebra::Vector3;

const MAX_CELLS_PER_AXIS: usize = 64;
const MIN_PERIODIC_CELLS: usize = 3;
/// Relative amount by which a cell edge must exceed the cutoff, so binning
/// round-off cannot separate two particles one cutoff apart by two cells.
const CELL_WIDTH_MARGIN: f64 = 1e-9;

/// Particles binned into cells whose edge is strictly wider than the search
/// cutoff, so every neighbor of a particle sits in one of the 27 surrounding
/// cells.
pub struct CellGrid {
    dims: [usize; 3],
    origin: [f64; 3],
    widths: [f64; 3],
    periodic: [bool; 3],
    /// `cell_starts[c]..cell_starts[c + 1]` indexes `members` for cell `c`.
    cell_starts: Vec<usize>,
    members: Vec<usize>,
}

impl CellGrid {
    /// Returns `None` when the box is too small (fewer than three cells along
    /// a periodic axis) for the 27-cell stencil to be free of duplicates, in
    /// which case callers fall back to the pairwise scan.
    pub fn build(positions: &[Vector3<f64>], simbox: &SimBox, cutoff: f64) -> Option<Self> {
        if positions.is_empty() || cutoff <= 0.0 {
            return None;
        }

        let mut dims = [1usize; 3];
        let mut origin = [0.0; 3];
        let mut widths = [0.0; 3];
        let mut periodic = [false; 3];
        for axis in 0..3 {
            periodic[axis] = simbox.is_periodic(axis);
            let extent = if periodic[axis] {
                simbox.lengths[axis]
            } else {
                let (lo, hi) = positions
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p[axis]), hi.max(p[axis]))
                    });
                origin[axis] = lo;
                hi - lo
            };
            let min_width = cutoff * (1.0 + CELL_WIDTH_MARGIN);
            let mut n = ((extent / min_width).floor() as usize).clamp(1, MAX_CELLS_PER_AXIS);
            while n > 1 && extent / (n as f64) <= min_width {
                n -= 1;
            }
            if periodic[axis] && n < MIN_PERIODIC_CELLS {
                return None;
            }
            dims[axis] = n;
            widths[axis] = if extent > 0.0 { extent / n as f64 } else { 1.0 };
        }

        let mut grid = Self {
            dims,
            origin,
            widths,
            periodic,
            cell_starts: Vec::new(),
            members: Vec::new(),
        };

        let n_cells = dims[0] * dims[1] * dims[2];
        let cell_of: Vec<usize> = positions.iter().map(|p| grid.cell_index(p)).collect();
        let mut counts = vec![0usize; n_cells + 1];
        for &c in &cell_of {
            counts[c + 1] += 1;
        }
        for c in 0..n_cells {
            counts[c + 1] += counts[c];
        }
        let mut fill = counts.clone();
        let mut members = vec![0usize; positions.len()];
        for (i, &c) in cell_of.iter().enumerate() {
            members[fill[c]] = i;
            fill[c] += 1;
        }
        grid.cell_starts = counts;
        grid.members = members;
        Some(grid)
    }

    fn axis_coord(&self, axis: usize, value: f64) -> usize {
        let n = self.dims[axis];
        let raw = if self.periodic[axis] {
            let l = self.widths[axis] * n as f64;
            let frac = value / l - (value / l).floor();
            (frac * n as f64).floor()
        } else {
            ((value - self.origin[axis]) / self.widths[axis]).floor()
        };
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(n - 1)
        }
    }

    fn cell_index(&self, p: &Vector3<f64>) -> usize {
        let cx = self.axis_coord(0, p.x);
        let cy = self.axis_coord(1, p.y);
        let cz = self.axis_coord(2, p.z);
        cx + self.dims[0] * (cy + self.dims[1] * cz)
    }

    /// Calls `visit` with the index of every particle in the stencil of cells
    /// around `p`, including the particle at `p` itself if it was binned.
    pub fn for_each_candidate(&self, p: &Vector3<f64>, mut visit: impl FnMut(usize)) {
        let center = [
            self.axis_coord(0, p.x),
            self.axis_coord(1, p.y),
            self.axis_coord(2, p.z),
        ];
        let mut ranges: [Vec<usize>; 3] = Default::default();
        for axis in 0..3 {
            let n = self.dims[axis] as isize;
            let c = center[axis] as isize;
            for offset in -1..=1isize {
                let shifted = c + offset;
                if self.periodic[axis] {
                    ranges[axis].push(shifted.rem_euclid(n) as usize);
                } else if (0..n).contains(&shifted) {
                    ranges[axis].push(shifted as usize);
                }
            }
        }

        for &cz in &ranges[2] {
            for &cy in &ranges[1] {
                for &cx in &ranges[0] {
                    let cell = cx + self.dims[0] * (cy + self.dims[1] * cz);
                    for &j in &self.members[self.cell_starts[cell]..self.cell_starts[cell + 1]] {
                        visit(j);
                    }
                }
            }
        }
    }
}
