//! Named projections of the bond-order pipeline.
//!
//! Every operation builds its own neighbor table, order parameters and labels
//! from a [`Configuration`] and [`AnalysisSettings`], returns one result, and
//! keeps nothing between calls.

use crate::classify::{
    classify_ld, classify_tf, codes, count_links, label_summary, solid_fraction, LdLabel,
    ParticleLabel, TfLabel,
};
use crate::cluster::{largest_crystalline_cluster, ClusterGraph};
use crate::geometry::{positions_from_xyz, SimBox};
use crate::neighbors::{NeighborPolicy, NeighborTable};
use crate::order::{LdDescriptors, OrderParameterEngine};
use crate::settings::AnalysisSettings;
use anyhow::{Context, Result};
use log::debug;
use nalgebra::Vector3;

/// Particle positions together with the box they live in.
#[derive(Debug, Clone)]
pub struct Configuration {
    positions: Vec<Vector3<f64>>,
    simbox: SimBox,
}

impl Configuration {
    pub fn new(positions: Vec<Vector3<f64>>, simbox: SimBox) -> Self {
        Self { positions, simbox }
    }

    pub fn from_xyz(x: &[f64], y: &[f64], z: &[f64], simbox: SimBox) -> Result<Self> {
        Ok(Self::new(positions_from_xyz(x, y, z)?, simbox))
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn simbox(&self) -> &SimBox {
        &self.simbox
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Validated inputs plus the neighbor table every downstream stage reads.
struct Pipeline<'a> {
    config: &'a Configuration,
    settings: &'a AnalysisSettings,
    table: NeighborTable,
}

impl<'a> Pipeline<'a> {
    fn new(config: &'a Configuration, settings: &'a AnalysisSettings) -> Result<Self> {
        settings
            .validate(config.len())
            .context("Invalid analysis settings.")?;
        let table = settings
            .neighbors
            .build_table(config.positions(), config.simbox())?;
        debug!(
            "built {:?} neighbor table for {} particles ({} bonds)",
            settings.neighbors,
            table.len(),
            table.iter().map(<[usize]>::len).sum::<usize>()
        );
        Ok(Self {
            config,
            settings,
            table,
        })
    }

    fn tf_labels(&self) -> Result<Vec<TfLabel>> {
        let engine = OrderParameterEngine::new(6)?;
        let qlm = engine.qlms(self.config.positions(), self.config.simbox(), &self.table);
        let tildes = engine.qlm_tildes(&qlm);
        let links = count_links(
            &tildes,
            &self.table,
            self.settings.n_surface,
            self.settings.link_threshold,
        )?;
        let labels = classify_tf(&links, self.settings.min_links, self.settings.n_surface)?;
        let (solid, bulk) = label_summary(&labels);
        debug!("ten Wolde-Frenkel: {solid} of {bulk} bulk particles crystalline");
        Ok(labels)
    }

    fn ld_descriptors(&self) -> Result<LdDescriptors> {
        LdDescriptors::compute(self.config.positions(), self.config.simbox(), &self.table)
            .context("Failed to compute averaged bond-order invariants.")
    }

    fn ld_labels(&self) -> Result<Vec<LdLabel>> {
        let labels = classify_ld(&self.ld_descriptors()?, self.settings.n_surface)?;
        let (solid, bulk) = label_summary(&labels);
        debug!("Lechner-Dellago: {solid} of {bulk} bulk particles crystalline");
        Ok(labels)
    }

    fn cluster_cutoff(&self) -> f64 {
        self.settings.cluster_cutoff_or(self.config.simbox().cutoff)
    }
}

/// Global Q6 of the whole configuration, surface particles included.
pub fn q6_global(config: &Configuration, settings: &AnalysisSettings) -> Result<f64> {
    let pipeline = Pipeline::new(config, settings)?;
    let engine = OrderParameterEngine::new(6)?;
    let qlm = engine.qlms(config.positions(), config.simbox(), &pipeline.table);
    Ok(engine.global_ql(&qlm, 0..config.len()))
}

/// Per-particle ten Wolde-Frenkel labels.
pub fn tf_labels(config: &Configuration, settings: &AnalysisSettings) -> Result<Vec<TfLabel>> {
    Pipeline::new(config, settings)?.tf_labels()
}

/// Ten Wolde-Frenkel labels as integer codes (liquid 0, crystal 1, surface 2).
pub fn tf_codes(config: &Configuration, settings: &AnalysisSettings) -> Result<Vec<i32>> {
    Ok(codes(&tf_labels(config, settings)?))
}

pub fn solid_fraction_tf(config: &Configuration, settings: &AnalysisSettings) -> Result<f64> {
    solid_fraction(&tf_labels(config, settings)?, settings.n_surface)
}

/// Sorted members of the largest ten Wolde-Frenkel crystalline cluster.
pub fn tf_cluster_members(
    config: &Configuration,
    settings: &AnalysisSettings,
) -> Result<Vec<usize>> {
    let pipeline = Pipeline::new(config, settings)?;
    let labels = pipeline.tf_labels()?;
    largest_crystalline_cluster(
        config.positions(),
        config.simbox(),
        pipeline.cluster_cutoff(),
        &labels,
    )
}

pub fn largest_cluster_tf(config: &Configuration, settings: &AnalysisSettings) -> Result<usize> {
    Ok(tf_cluster_members(config, settings)?.len())
}

/// Averaged Q4, Q6, W4 and W6 of every particle.
pub fn ld_descriptors(
    config: &Configuration,
    settings: &AnalysisSettings,
) -> Result<LdDescriptors> {
    Pipeline::new(config, settings)?.ld_descriptors()
}

/// Q4, W4, Q6 and W6 back to back, each of length N.
pub fn q4w4q6w6(config: &Configuration, settings: &AnalysisSettings) -> Result<Vec<f64>> {
    Ok(ld_descriptors(config, settings)?.concatenated())
}

/// Per-particle Lechner-Dellago labels.
pub fn ld_labels(config: &Configuration, settings: &AnalysisSettings) -> Result<Vec<LdLabel>> {
    Pipeline::new(config, settings)?.ld_labels()
}

/// Lechner-Dellago labels as integer codes (FCC 0, HCP 1, BCC 2, liquid 3,
/// icosahedral 4, surface 5).
pub fn ld_codes(config: &Configuration, settings: &AnalysisSettings) -> Result<Vec<i32>> {
    Ok(codes(&ld_labels(config, settings)?))
}

pub fn solid_fraction_ld(config: &Configuration, settings: &AnalysisSettings) -> Result<f64> {
    solid_fraction(&ld_labels(config, settings)?, settings.n_surface)
}

fn ld_cluster(
    config: &Configuration,
    settings: &AnalysisSettings,
) -> Result<(Vec<LdLabel>, Vec<usize>)> {
    let pipeline = Pipeline::new(config, settings)?;
    let labels = pipeline.ld_labels()?;
    let members = largest_crystalline_cluster(
        config.positions(),
        config.simbox(),
        pipeline.cluster_cutoff(),
        &labels,
    )?;
    Ok((labels, members))
}

/// Sorted members of the largest Lechner-Dellago crystalline cluster.
pub fn ld_cluster_members(
    config: &Configuration,
    settings: &AnalysisSettings,
) -> Result<Vec<usize>> {
    Ok(ld_cluster(config, settings)?.1)
}

pub fn largest_cluster_ld(config: &Configuration, settings: &AnalysisSettings) -> Result<usize> {
    Ok(ld_cluster_members(config, settings)?.len())
}

/// Count of each Lechner-Dellago label inside the largest cluster, indexed
/// by label code.
pub fn cluster_polymorphs_ld(
    config: &Configuration,
    settings: &AnalysisSettings,
) -> Result<[usize; 6]> {
    let (labels, members) = ld_cluster(config, settings)?;
    let mut counts = [0usize; 6];
    for i in members {
        counts[labels[i].code() as usize] += 1;
    }
    Ok(counts)
}

/// Largest cluster when every particle of `config` counts as crystalline.
pub fn largest_cluster_members(
    config: &Configuration,
    settings: &AnalysisSettings,
) -> Result<Vec<usize>> {
    settings.validate(config.len())?;
    let cutoff = settings.cluster_cutoff_or(config.simbox().cutoff);
    let graph = ClusterGraph::build(config.positions(), config.simbox(), cutoff, |_| true)?;
    Ok(graph.largest_component())
}

/// Number of neighbors within the box cutoff, regardless of the configured
/// neighbor policy.
pub fn neighbor_counts(config: &Configuration) -> Result<Vec<usize>> {
    let table = NeighborPolicy::Cutoff.build_table(config.positions(), config.simbox())?;
    Ok(table.counts())
}
