use crate::classify::check_surface;
use crate::error::AnalysisError;
use crate::neighbors::NeighborPolicy;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Analysis parameters shared by every operation.
///
/// Missing fields take their defaults when deserialized, so a configuration
/// only needs to name what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub neighbors: NeighborPolicy,
    /// The first `n_surface` particles form the surface (substrate).
    pub n_surface: usize,
    /// q6 dot product above which two neighbors share a crystalline link.
    pub link_threshold: f64,
    /// Links needed for a ten Wolde-Frenkel crystal label.
    pub min_links: usize,
    /// Adjacency distance of the cluster graph; the box cutoff when unset.
    pub cluster_cutoff: Option<f64>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            neighbors: NeighborPolicy::default(),
            n_surface: 0,
            link_threshold: 0.5,
            min_links: 8,
            cluster_cutoff: None,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self, n_particles: usize) -> Result<()> {
        self.neighbors.validate()?;
        check_surface(self.n_surface, n_particles)?;
        if !self.link_threshold.is_finite() {
            bail!(AnalysisError::InvalidLinkThreshold(self.link_threshold));
        }
        if let Some(cutoff) = self.cluster_cutoff {
            if !cutoff.is_finite() || cutoff < 0.0 {
                bail!(AnalysisError::InvalidCutoff(cutoff));
            }
        }
        Ok(())
    }

    pub fn cluster_cutoff_or(&self, box_cutoff: f64) -> f64 {
        self.cluster_cutoff.unwrap_or(box_cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_twelve_nearest_neighbors() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.neighbors, NeighborPolicy::Nearest { k: 12 });
        assert_eq!(settings.min_links, 8);
        assert_eq!(settings.cluster_cutoff_or(1.4), 1.4);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: AnalysisSettings = serde_json::from_str(
            r#"{ "neighbors": { "policy": "cutoff" }, "n_surface": 10, "cluster_cutoff": 1.2 }"#,
        )
        .expect("settings should parse");
        assert_eq!(settings.neighbors, NeighborPolicy::Cutoff);
        assert_eq!(settings.n_surface, 10);
        assert_eq!(settings.link_threshold, 0.5);
        assert_eq!(settings.cluster_cutoff_or(1.4), 1.2);

        let nearest: AnalysisSettings =
            serde_json::from_str(r#"{ "neighbors": { "policy": "nearest", "k": 8 } }"#)
                .expect("settings should parse");
        assert_eq!(nearest.neighbors, NeighborPolicy::Nearest { k: 8 });
    }

    #[test]
    fn settings_survive_json_round_trip() {
        let settings = AnalysisSettings {
            neighbors: NeighborPolicy::Cutoff,
            n_surface: 3,
            link_threshold: 0.65,
            min_links: 6,
            cluster_cutoff: Some(1.5),
        };
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: AnalysisSettings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, settings);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut settings = AnalysisSettings::default();
        assert!(settings.validate(10).is_ok());

        settings.n_surface = 11;
        assert!(format!("{}", settings.validate(10).expect_err("surface")).contains("exceeds"));

        settings.n_surface = 0;
        settings.link_threshold = f64::NAN;
        assert!(settings.validate(10).is_err());

        settings.link_threshold = 0.5;
        settings.cluster_cutoff = Some(-1.0);
        assert!(settings.validate(10).is_err());

        settings.cluster_cutoff = None;
        settings.neighbors = NeighborPolicy::Nearest { k: 0 };
        assert!(settings.validate(10).is_err());
    }
}
