use crate::classify::ParticleLabel;
use crate::geometry::SimBox;
use crate::neighbors::{CutoffSearch, NeighborSearch, NeighborTable};
use anyhow::{bail, Result};
use log::debug;
use nalgebra::Vector3;
use std::collections::VecDeque;

/// Adjacency graph over the particles selected by a predicate. Vertices are
/// stored by their particle index in the full configuration.
#[derive(Debug, Clone)]
pub struct ClusterGraph {
    vertices: Vec<usize>,
    /// Adjacency in local vertex numbering.
    adjacency: NeighborTable,
}

impl ClusterGraph {
    /// Joins every pair of selected particles whose minimum-image distance
    /// is at most `cutoff`.
    pub fn build(
        positions: &[Vector3<f64>],
        simbox: &SimBox,
        cutoff: f64,
        selected: impl Fn(usize) -> bool,
    ) -> Result<Self> {
        if !cutoff.is_finite() || cutoff < 0.0 {
            bail!(crate::error::AnalysisError::InvalidCutoff(cutoff));
        }
        let vertices: Vec<usize> = (0..positions.len()).filter(|&i| selected(i)).collect();
        let subset: Vec<Vector3<f64>> = vertices.iter().map(|&i| positions[i]).collect();
        let adjacency = CutoffSearch { cutoff }.build(&subset, simbox);
        Ok(Self {
            vertices,
            adjacency,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Connected components as sorted particle indices, ordered by their
    /// smallest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.vertices.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);
            let mut members = Vec::new();
            while let Some(v) = queue.pop_front() {
                members.push(self.vertices[v]);
                for &w in self.adjacency.neighbors(v) {
                    if !visited[w] {
                        visited[w] = true;
                        queue.push_back(w);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    /// Members of the largest connected component, sorted ascending.
    ///
    /// Among equally large components the one containing the lowest particle
    /// index wins. Empty when no particle was selected.
    pub fn largest_component(&self) -> Vec<usize> {
        let mut largest: Vec<usize> = Vec::new();
        for component in self.components() {
            if component.len() > largest.len() {
                largest = component;
            }
        }
        debug!(
            "largest cluster has {} of {} selected particles",
            largest.len(),
            self.vertices.len()
        );
        largest
    }
}

/// Largest connected cluster of crystalline particles.
pub fn largest_crystalline_cluster<L: ParticleLabel>(
    positions: &[Vector3<f64>],
    simbox: &SimBox,
    cutoff: f64,
    labels: &[L],
) -> Result<Vec<usize>> {
    if labels.len() != positions.len() {
        bail!(
            "Label count ({}) does not match particle count ({}).",
            labels.len(),
            positions.len()
        );
    }
    let graph = ClusterGraph::build(positions, simbox, cutoff, |i| labels[i].is_crystalline())?;
    Ok(graph.largest_component())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TfLabel;

    fn chain(start: f64, count: usize, spacing: f64, y: f64) -> Vec<Vector3<f64>> {
        (0..count)
            .map(|i| Vector3::new(start + i as f64 * spacing, y, 5.0))
            .collect()
    }

    #[test]
    fn empty_selection_gives_empty_cluster() {
        let positions = chain(0.0, 5, 0.5, 1.0);
        let simbox = SimBox::new(10.0, 10.0, 10.0, 1.0, true).expect("box");
        let graph = ClusterGraph::build(&positions, &simbox, 1.0, |_| false).expect("graph");
        assert_eq!(graph.vertex_count(), 0);
        assert!(graph.largest_component().is_empty());
    }

    #[test]
    fn cluster_wraps_through_periodic_boundary() {
        // Two halves of one chain on opposite faces of the box.
        let mut positions = chain(0.2, 3, 0.8, 1.0);
        positions.extend(chain(7.8, 3, 0.8, 1.0));
        positions.extend(chain(3.0, 2, 0.8, 6.0));
        let simbox = SimBox::new(10.0, 10.0, 10.0, 1.0, false).expect("box");
        let graph = ClusterGraph::build(&positions, &simbox, 1.0, |_| true).expect("graph");
        assert_eq!(graph.components().len(), 2);
        assert_eq!(graph.largest_component(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn ties_resolve_to_lowest_index_component() {
        let mut positions = chain(5.0, 3, 0.9, 6.0);
        positions.extend(chain(1.0, 3, 0.9, 2.0));
        let simbox = SimBox::new(10.0, 10.0, 10.0, 1.0, true).expect("box");
        let graph = ClusterGraph::build(&positions, &simbox, 1.0, |_| true).expect("graph");
        assert_eq!(graph.largest_component(), vec![0, 1, 2]);

        let graph = ClusterGraph::build(&positions, &simbox, 1.0, |i| i != 0).expect("graph");
        assert_eq!(graph.largest_component(), vec![3, 4, 5]);
    }

    #[test]
    fn only_crystalline_labels_join_clusters() {
        let positions = chain(1.0, 5, 0.9, 1.0);
        let simbox = SimBox::new(10.0, 10.0, 10.0, 1.0, true).expect("box");
        let labels = [
            TfLabel::Crystal,
            TfLabel::Crystal,
            TfLabel::Liquid,
            TfLabel::Crystal,
            TfLabel::Surface,
        ];
        let largest = largest_crystalline_cluster(&positions, &simbox, 1.0, &labels).expect("cluster");
        assert_eq!(largest, vec![0, 1]);
        let crystalline = labels.iter().filter(|l| l.is_crystalline()).count();
        assert!(largest.len() <= crystalline);
    }

    #[test]
    fn mismatched_labels_fail() {
        let positions = chain(1.0, 2, 0.9, 1.0);
        let simbox = SimBox::new(10.0, 10.0, 10.0, 1.0, true).expect("box");
        let err = largest_crystalline_cluster(&positions, &simbox, 1.0, &[TfLabel::Crystal])
            .expect_err("expected error");
        assert!(format!("{err}").contains("does not match"));
    }
}
