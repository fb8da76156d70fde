//! Crystallinity classifiers.
//!
//! Two independent label spaces exist: the ten Wolde-Frenkel link counting
//! method and the Lechner-Dellago decision regions on averaged invariants.
//! Both implement [`ParticleLabel`], so solid fractions and cluster
//! detection are written once against that trait.

use crate::error::AnalysisError;
use crate::neighbors::NeighborTable;
use crate::order::{link_dot, LdDescriptors, QlmMatrix};
use anyhow::{bail, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub trait ParticleLabel: Copy + Send + Sync {
    /// Whether the particle counts as solid for fractions and clusters.
    fn is_crystalline(self) -> bool;

    fn is_surface(self) -> bool;

    /// Stable integer code exposed to callers.
    fn code(self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TfLabel {
    Liquid,
    Crystal,
    Surface,
}

impl ParticleLabel for TfLabel {
    fn is_crystalline(self) -> bool {
        self == TfLabel::Crystal
    }

    fn is_surface(self) -> bool {
        self == TfLabel::Surface
    }

    fn code(self) -> i32 {
        match self {
            TfLabel::Liquid => 0,
            TfLabel::Crystal => 1,
            TfLabel::Surface => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LdLabel {
    Fcc,
    Hcp,
    Bcc,
    Liquid,
    Icosahedral,
    Surface,
}

impl LdLabel {
    /// Every label in code order.
    pub const ALL: [LdLabel; 6] = [
        LdLabel::Fcc,
        LdLabel::Hcp,
        LdLabel::Bcc,
        LdLabel::Liquid,
        LdLabel::Icosahedral,
        LdLabel::Surface,
    ];
}

impl ParticleLabel for LdLabel {
    fn is_crystalline(self) -> bool {
        !matches!(self, LdLabel::Liquid | LdLabel::Surface)
    }

    fn is_surface(self) -> bool {
        self == LdLabel::Surface
    }

    fn code(self) -> i32 {
        match self {
            LdLabel::Fcc => 0,
            LdLabel::Hcp => 1,
            LdLabel::Bcc => 2,
            LdLabel::Liquid => 3,
            LdLabel::Icosahedral => 4,
            LdLabel::Surface => 5,
        }
    }
}

pub fn check_surface(n_surface: usize, n_particles: usize) -> Result<()> {
    if n_surface > n_particles {
        bail!(AnalysisError::SurfaceOutOfRange {
            n_surface,
            n_particles,
        });
    }
    Ok(())
}

/// Number of crystalline links of every particle.
///
/// A link between `i` and a neighbor `j` exists when the dot product of their
/// normalized q6 vectors exceeds `threshold`. Surface particles (indices
/// below `n_surface`) are not evaluated and report zero links; links from a
/// non-surface particle to a surface neighbor still count.
pub fn count_links(
    tildes: &QlmMatrix,
    table: &NeighborTable,
    n_surface: usize,
    threshold: f64,
) -> Result<Vec<usize>> {
    check_surface(n_surface, table.len())?;
    if !threshold.is_finite() {
        bail!(AnalysisError::InvalidLinkThreshold(threshold));
    }
    let links = (0..table.len())
        .into_par_iter()
        .map(|i| {
            if i < n_surface {
                return 0;
            }
            let own = tildes.row(i);
            table
                .neighbors(i)
                .iter()
                .filter(|&&j| link_dot(own, tildes.row(j)) > threshold)
                .count()
        })
        .collect();
    Ok(links)
}

/// Ten Wolde-Frenkel labels from link counts.
pub fn classify_tf(links: &[usize], min_links: usize, n_surface: usize) -> Result<Vec<TfLabel>> {
    check_surface(n_surface, links.len())?;
    Ok(links
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            if i < n_surface {
                TfLabel::Surface
            } else if count >= min_links {
                TfLabel::Crystal
            } else {
                TfLabel::Liquid
            }
        })
        .collect())
}

/// Averaged Q6 below which a particle is liquid.
pub const LIQUID_Q6_MAX: f64 = 0.28;

/// Averaged W6 below which a solid-like particle is icosahedral
/// (ideal icosahedron: -0.1698; close-packed crystals: about -0.013).
pub const ICOSAHEDRAL_W6_MAX: f64 = -0.05;

/// Per-component scales (Q4, Q6, W4, W6) of the signature distance.
pub const SIGNATURE_SCALES: [f64; 4] = [0.05, 0.05, 0.05, 0.005];

/// Ideal-lattice (Q4, Q6, W4, W6) of the crystal structures. The BCC entry
/// uses both coordination shells (14 neighbors).
pub const REFERENCE_SIGNATURES: [(LdLabel, [f64; 4]); 3] = [
    (LdLabel::Fcc, [0.190941, 0.574524, -0.159317, -0.013161]),
    (LdLabel::Hcp, [0.097222, 0.484762, 0.134097, -0.012442]),
    (LdLabel::Bcc, [0.036370, 0.510688, 0.159317, 0.013161]),
];

/// Lechner-Dellago label of a non-surface particle with averaged invariants
/// `[q4, q6, w4, w6]`.
pub fn ld_label(signature: [f64; 4]) -> LdLabel {
    let [_, q6, _, w6] = signature;
    if q6 < LIQUID_Q6_MAX {
        return LdLabel::Liquid;
    }
    if w6 < ICOSAHEDRAL_W6_MAX {
        return LdLabel::Icosahedral;
    }

    let mut best = LdLabel::Liquid;
    let mut best_distance = f64::INFINITY;
    for (label, reference) in REFERENCE_SIGNATURES.iter() {
        let distance: f64 = signature
            .iter()
            .zip(reference)
            .zip(SIGNATURE_SCALES.iter())
            .map(|((value, ideal), scale)| ((value - ideal) / scale).powi(2))
            .sum();
        if distance < best_distance {
            best_distance = distance;
            best = *label;
        }
    }
    best
}

/// Lechner-Dellago labels for every particle; the first `n_surface` are
/// surface regardless of their invariants.
pub fn classify_ld(descriptors: &LdDescriptors, n_surface: usize) -> Result<Vec<LdLabel>> {
    check_surface(n_surface, descriptors.len())?;
    Ok((0..descriptors.len())
        .into_par_iter()
        .map(|i| {
            if i < n_surface {
                LdLabel::Surface
            } else {
                ld_label(descriptors.signature(i))
            }
        })
        .collect())
}

/// Fraction of crystalline particles among the non-surface ones; zero when
/// every particle is surface.
pub fn solid_fraction<L: ParticleLabel>(labels: &[L], n_surface: usize) -> Result<f64> {
    check_surface(n_surface, labels.len())?;
    let bulk = labels.len() - n_surface;
    if bulk == 0 {
        return Ok(0.0);
    }
    let solid = labels.iter().filter(|label| label.is_crystalline()).count();
    Ok(solid as f64 / bulk as f64)
}

/// Crystalline and bulk (non-surface) particle counts.
pub fn label_summary<L: ParticleLabel>(labels: &[L]) -> (usize, usize) {
    labels.iter().fold((0, 0), |(solid, bulk), label| {
        (
            solid + usize::from(label.is_crystalline()),
            bulk + usize::from(!label.is_surface()),
        )
    })
}

pub fn codes<L: ParticleLabel>(labels: &[L]) -> Vec<i32> {
    labels.iter().map(|label| label.code()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn codes_follow_published_mapping() {
        assert_eq!(codes(&[TfLabel::Liquid, TfLabel::Crystal, TfLabel::Surface]), vec![0, 1, 2]);
        assert_eq!(codes(&LdLabel::ALL), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn tf_surface_overrides_links() {
        let labels = classify_tf(&[20, 20, 3, 8, 9], 8, 2).expect("labels");
        assert_eq!(
            labels,
            vec![
                TfLabel::Surface,
                TfLabel::Surface,
                TfLabel::Liquid,
                TfLabel::Crystal,
                TfLabel::Crystal
            ]
        );
    }

    #[test]
    fn tf_fraction_does_not_grow_with_min_links() {
        let links = vec![0, 3, 5, 7, 8, 8, 10, 12, 12, 4];
        let mut previous = f64::INFINITY;
        for min_links in 0..=13 {
            let labels = classify_tf(&links, min_links, 1).expect("labels");
            let fraction = solid_fraction(&labels, 1).expect("fraction");
            assert!(fraction <= previous);
            previous = fraction;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn surface_count_above_particle_count_fails() {
        assert_err_contains(classify_tf(&[1, 2], 1, 3), "exceeds particle count");
        let descriptors = LdDescriptors {
            q4: vec![0.0],
            w4: vec![0.0],
            q6: vec![0.0],
            w6: vec![0.0],
        };
        assert_err_contains(classify_ld(&descriptors, 2), "exceeds particle count");
        assert_err_contains(solid_fraction::<TfLabel>(&[], 1), "exceeds particle count");
    }

    #[test]
    fn count_links_skips_surface_and_rejects_nan_threshold() {
        let row = |x: f64| vec![Complex::new(x, 0.0), Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)];
        let data = vec![row(1.0), row(1.0), row(-1.0)];
        let tildes = QlmMatrix::from_rows(1, data);
        let table = NeighborTable::from_lists(vec![vec![1, 2], vec![0, 2], vec![0, 1]]);

        let links = count_links(&tildes, &table, 0, 0.5).expect("links");
        assert_eq!(links, vec![1, 1, 0]);
        let links = count_links(&tildes, &table, 1, 0.5).expect("links");
        assert_eq!(links, vec![0, 1, 0]);
        assert_err_contains(count_links(&tildes, &table, 0, f64::NAN), "Link threshold");
    }

    #[test]
    fn ld_reference_signatures_classify_to_themselves() {
        for (label, signature) in REFERENCE_SIGNATURES {
            assert_eq!(ld_label(signature), label);
        }
        assert_eq!(ld_label([0.0, 0.663325, 0.0, -0.169754]), LdLabel::Icosahedral);
        assert_eq!(ld_label([0.1, 0.2, 0.05, -0.01]), LdLabel::Liquid);
        assert_eq!(ld_label([0.0, 0.0, 0.0, 0.0]), LdLabel::Liquid);
    }

    #[test]
    fn ld_surface_range_is_always_surface() {
        let fcc = REFERENCE_SIGNATURES[0].1;
        let descriptors = LdDescriptors {
            q4: vec![fcc[0]; 4],
            q6: vec![fcc[1]; 4],
            w4: vec![fcc[2]; 4],
            w6: vec![fcc[3]; 4],
        };
        let labels = classify_ld(&descriptors, 3).expect("labels");
        assert_eq!(
            labels,
            vec![LdLabel::Surface, LdLabel::Surface, LdLabel::Surface, LdLabel::Fcc]
        );
        assert_eq!(label_summary(&labels), (1, 1));
        assert_eq!(solid_fraction(&labels, 3).expect("fraction"), 1.0);
        assert_eq!(solid_fraction(&labels, 4).expect("fraction"), 0.0);
    }
}
