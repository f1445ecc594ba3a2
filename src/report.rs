//! Serializable summary of a finished clustering run.
//!
//! A [`ClusterReport`] flattens an [`ApOutcome`] together with the points it
//! refers to, so the result can be written out as JSON (or any serde format)
//! without the engine's matrices. Each member is recorded by index, survey
//! coordinate and orientation; the RSS vectors are not repeated.
//!
//! ```text
//! ClusterReport
//!   version, iterations, preference, cluster_count, metadata?
//!   clusters: [ ClusterRecord { exemplar: MemberRecord, members: [MemberRecord] } ]
//! ```
//!
//! # no_std
//!
//! This module requires the `serde` feature and only needs `alloc`.

use alloc::vec::Vec;

use crate::cluster::Cluster;
use crate::point::{ReferencePoint, SurveyMetadata};
use crate::propagation::ApOutcome;

/// Current report format version.
pub const REPORT_VERSION: u16 = 1;

/// A serializable snapshot of a run's clusters.
///
/// # Example
///
/// ```rust,ignore
/// let report = ClusterReport::from_outcome(ap.points(), &outcome, None);
/// let json = serde_json::to_string_pretty(&report)?;
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct ClusterReport {
    /// Format version, always [`REPORT_VERSION`] for new reports.
    pub version: u16,
    /// Survey the points came from, when known.
    pub metadata: Option<SurveyMetadata>,
    /// Full iterations performed.
    pub iterations: usize,
    /// Shared self-similarity used for the run.
    pub preference: Option<f64>,
    /// Number of clusters, equal to `clusters.len()`.
    pub cluster_count: usize,
    /// Clusters in the order the run produced them.
    pub clusters: Vec<ClusterRecord>,
}

/// One member of a cluster as it appears in a report.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MemberRecord {
    /// Index of the point in the input order.
    pub index: usize,
    /// Survey coordinate, x axis.
    pub x: f64,
    /// Survey coordinate, y axis.
    pub y: f64,
    /// Orientation label.
    pub orientation: char,
}

impl From<(usize, &ReferencePoint)> for MemberRecord {
    fn from((index, p): (usize, &ReferencePoint)) -> Self {
        Self { index, x: p.x, y: p.y, orientation: p.orientation }
    }
}

/// One cluster in a report. `members[0]` repeats the exemplar.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct ClusterRecord {
    /// The cluster's exemplar.
    pub exemplar: MemberRecord,
    /// All members, exemplar first.
    pub members: Vec<MemberRecord>,
}

impl ClusterRecord {
    fn from_cluster(points: &[ReferencePoint], cluster: &Cluster) -> Option<Self> {
        let member = |i: usize| points.get(i).map(|p| MemberRecord::from((i, p)));
        Some(Self {
            exemplar: member(cluster.exemplar)?,
            members: cluster.members.iter().filter_map(|&i| member(i)).collect(),
        })
    }
}

impl ClusterReport {
    /// Build a report from `outcome` and the points it indexes.
    ///
    /// Clusters whose exemplar index falls outside `points` are dropped, as
    /// are out-of-range member indices.
    pub fn from_outcome(
        points: &[ReferencePoint],
        outcome: &ApOutcome,
        metadata: Option<&SurveyMetadata>,
    ) -> Self {
        let clusters: Vec<ClusterRecord> = outcome
            .clusters
            .iter()
            .filter_map(|c| ClusterRecord::from_cluster(points, c))
            .collect();
        Self {
            version: REPORT_VERSION,
            metadata: metadata.cloned(),
            iterations: outcome.iterations,
            preference: outcome.preference,
            cluster_count: clusters.len(),
            clusters,
        }
    }

    /// The cluster containing point `index`, if any.
    pub fn find_cluster_of(&self, index: usize) -> Option<&ClusterRecord> {
        self.clusters.iter().find(|c| c.members.iter().any(|m| m.index == index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn outcome() -> ApOutcome {
        ApOutcome {
            clusters: vec![
                Cluster { exemplar: 1, members: vec![1, 0] },
                Cluster { exemplar: 2, members: vec![2] },
            ],
            iterations: 17,
            preference: Some(-12.5),
        }
    }

    fn points() -> Vec<ReferencePoint> {
        vec![
            ReferencePoint::with_features(0.0, 0.0, 'N', vec![-40.0]),
            ReferencePoint::with_features(1.0, 0.0, 'S', vec![-41.0]),
            ReferencePoint::with_features(7.5, 2.0, 'E', vec![-80.0]),
        ]
    }

    #[test]
    fn test_report_mirrors_outcome() {
        let report = ClusterReport::from_outcome(&points(), &outcome(), None);
        assert_eq!(report.version, REPORT_VERSION);
        assert_eq!(report.cluster_count, 2);
        assert_eq!(report.iterations, 17);
        assert_eq!(report.preference, Some(-12.5));
        assert_eq!(report.clusters[0].exemplar.orientation, 'S');
        assert_eq!(report.clusters[0].members.len(), 2);
        assert_eq!(report.clusters[1].exemplar.x, 7.5);
    }

    #[test]
    fn test_find_cluster_of_member() {
        let report = ClusterReport::from_outcome(&points(), &outcome(), None);
        assert_eq!(report.find_cluster_of(0).map(|c| c.exemplar.index), Some(1));
        assert_eq!(report.find_cluster_of(2).map(|c| c.exemplar.index), Some(2));
        assert!(report.find_cluster_of(9).is_none());
    }

    #[test]
    fn test_out_of_range_exemplar_is_dropped() {
        let mut bad = outcome();
        bad.clusters.push(Cluster { exemplar: 40, members: vec![40] });
        let report = ClusterReport::from_outcome(&points(), &bad, None);
        assert_eq!(report.cluster_count, 2);
    }

    #[test]
    fn test_metadata_is_carried() {
        let meta = SurveyMetadata {
            source_device_model: "Nexus 5".into(),
            building: "Library".into(),
            floor: 3,
        };
        let report = ClusterReport::from_outcome(&points(), &outcome(), Some(&meta));
        assert_eq!(report.metadata, Some(meta));
    }
}
