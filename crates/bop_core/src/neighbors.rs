use crate::cells::CellGrid;
use crate::error::AnalysisError;
use crate::geometry::SimBox;
use anyhow::{bail, Result};
use log::trace;
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Neighbor sets for every particle of one configuration.
///
/// Lists never contain the particle itself or duplicates and are stored in
/// ascending index order. Cutoff tables are symmetric; nearest-neighbor
/// tables generally are not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborTable {
    lists: Vec<Vec<usize>>,
}

impl NeighborTable {
    pub fn from_lists(lists: Vec<Vec<usize>>) -> Self {
        Self { lists }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.lists[i]
    }

    pub fn counts(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.lists.iter().map(Vec::as_slice)
    }
}

/// A strategy that turns positions plus a box into a neighbor table.
pub trait NeighborSearch {
    fn build(&self, positions: &[Vector3<f64>], simbox: &SimBox) -> NeighborTable;
}

/// All particles within `cutoff` (inclusive) of each other.
#[derive(Debug, Clone, Copy)]
pub struct CutoffSearch {
    pub cutoff: f64,
}

/// The `k` particles closest to each particle, ties broken by index.
#[derive(Debug, Clone, Copy)]
pub struct NearestSearch {
    pub k: usize,
}

impl NeighborSearch for CutoffSearch {
    fn build(&self, positions: &[Vector3<f64>], simbox: &SimBox) -> NeighborTable {
        let cutoff_sq = self.cutoff * self.cutoff;
        let lists: Vec<Vec<usize>> = match CellGrid::build(positions, simbox, self.cutoff) {
            Some(grid) => {
                trace!("cutoff search over {} particles using cell grid", positions.len());
                positions
                    .par_iter()
                    .enumerate()
                    .map(|(i, pi)| {
                        let mut list = Vec::new();
                        grid.for_each_candidate(pi, |j| {
                            if j != i && simbox.distance_sq(pi, &positions[j]) <= cutoff_sq {
                                list.push(j);
                            }
                        });
                        list.sort_unstable();
                        list
                    })
                    .collect()
            }
            None => {
                trace!("cutoff search over {} particles by pair scan", positions.len());
                positions
                    .par_iter()
                    .enumerate()
                    .map(|(i, pi)| {
                        positions
                            .iter()
                            .enumerate()
                            .filter(|&(j, pj)| j != i && simbox.distance_sq(pi, pj) <= cutoff_sq)
                            .map(|(j, _)| j)
                            .collect()
                    })
                    .collect()
            }
        };
        NeighborTable::from_lists(lists)
    }
}

impl NeighborSearch for NearestSearch {
    fn build(&self, positions: &[Vector3<f64>], simbox: &SimBox) -> NeighborTable {
        let lists = positions
            .par_iter()
            .enumerate()
            .map(|(i, pi)| {
                let mut candidates: Vec<(f64, usize)> = positions
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(j, pj)| (simbox.distance_sq(pi, pj), j))
                    .collect();
                let take = self.k.min(candidates.len());
                if take < candidates.len() {
                    candidates.select_nth_unstable_by(take, by_distance_then_index);
                    candidates.truncate(take);
                }
                let mut list: Vec<usize> = candidates.into_iter().map(|(_, j)| j).collect();
                list.sort_unstable();
                list
            })
            .collect();
        NeighborTable::from_lists(lists)
    }
}

fn by_distance_then_index(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.cmp(&b.1))
}

/// Neighbor-selection policy chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum NeighborPolicy {
    /// Everything within the box cutoff.
    Cutoff,
    /// The `k` nearest particles, regardless of the cutoff.
    Nearest { k: usize },
}

impl Default for NeighborPolicy {
    fn default() -> Self {
        NeighborPolicy::Nearest { k: 12 }
    }
}

impl NeighborPolicy {
    pub fn validate(&self) -> Result<()> {
        if let NeighborPolicy::Nearest { k: 0 } = self {
            bail!(AnalysisError::InvalidNearestCount);
        }
        Ok(())
    }

    pub fn build_table(&self, positions: &[Vector3<f64>], simbox: &SimBox) -> Result<NeighborTable> {
        self.validate()?;
        let table = match *self {
            NeighborPolicy::Cutoff => CutoffSearch {
                cutoff: simbox.cutoff,
            }
            .build(positions, simbox),
            NeighborPolicy::Nearest { k } => NearestSearch { k }.build(positions, simbox),
        };
        Ok(table)
    }
}
