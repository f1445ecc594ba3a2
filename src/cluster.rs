//! Partition extraction from resolved exemplar pointers.
//!
//! Clusters are emitted in the order their exemplar is first met while
//! scanning the points in input order. Within a cluster the exemplar comes
//! first, followed by the remaining members in input order; the exemplar is
//! listed once.
//!
//! Two grouping rules are available:
//!
//! - [`Grouping::Structural`]: points belong together when their exemplars
//!   are the *same reading* (coordinate, orientation and RSS vector all equal),
//!   even if the exemplars are different indices. Duplicate survey records
//!   therefore collapse into one cluster.
//! - [`Grouping::ByIndex`]: points belong together when their exemplar
//!   indices are equal.
//!
//! Points that have never been resolved (`exemplar == None`) are skipped.
//!
//! The result is a partition when every designated exemplar points at
//! itself, which a converged run guarantees.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::point::ReferencePoint;

/// Rule deciding whether two points share a cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Grouping {
    /// Group by value equality of the exemplar's reading.
    #[default]
    Structural,
    /// Group by exemplar index.
    ByIndex,
}

/// One cluster: its exemplar and its members, exemplar first.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// Index of the cluster's exemplar point.
    pub exemplar: usize,
    /// Member indices. `members[0] == exemplar`.
    pub members: Vec<usize>,
}

impl Cluster {
    fn headed_by(exemplar: usize) -> Self {
        Self { exemplar, members: vec![exemplar] }
    }

    fn admit(&mut self, index: usize) {
        if index != self.exemplar {
            self.members.push(index);
        }
    }

    /// Number of members, exemplar included.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `false` for any cluster built by the extractor, which always lists the exemplar.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether point `index` is a member.
    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }
}

/// Groups points into clusters by their resolved exemplars.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClusterExtractor {
    grouping: Grouping,
}

impl ClusterExtractor {
    /// An extractor using `grouping`.
    pub fn new(grouping: Grouping) -> Self {
        Self { grouping }
    }

    /// Partition `points` by exemplar. Pure: repeated calls on the same points
    /// return identical clusters in identical order.
    pub fn extract(&self, points: &[ReferencePoint]) -> Vec<Cluster> {
        match self.grouping {
            Grouping::ByIndex => extract_by_index(points),
            Grouping::Structural => extract_structural(points),
        }
    }

    /// Number of clusters [`Self::extract`] would return.
    pub fn count(&self, points: &[ReferencePoint]) -> usize {
        self.extract(points).len()
    }
}

fn extract_by_index(points: &[ReferencePoint]) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut slot_of: HashMap<usize, usize> = HashMap::new();

    for (i, p) in points.iter().enumerate() {
        let Some(e) = p.exemplar else { continue };
        let slot = *slot_of.entry(e).or_insert_with(|| {
            clusters.push(Cluster::headed_by(e));
            clusters.len() - 1
        });
        clusters[slot].admit(i);
    }
    clusters
}

fn extract_structural(points: &[ReferencePoint]) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for (i, p) in points.iter().enumerate() {
        let Some(e) = p.exemplar else { continue };
        let head = &points[e];
        let slot = match clusters
            .iter()
            .position(|c| c.exemplar == e || points[c.exemplar].same_reading(head))
        {
            Some(slot) => slot,
            None => {
                clusters.push(Cluster::headed_by(e));
                clusters.len() - 1
            }
        };
        clusters[slot].admit(i);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned(exemplars: &[usize]) -> Vec<ReferencePoint> {
        exemplars
            .iter()
            .enumerate()
            .map(|(i, &e)| {
                let mut p = ReferencePoint::with_features(i as f64, 0.0, 'N', vec![i as f64]);
                p.exemplar = Some(e);
                p
            })
            .collect()
    }

    #[test]
    fn test_clusters_follow_first_encounter_order() {
        // 0→2, 1→1, 2→2, 3→1, 4→2
        let pts = assigned(&[2, 1, 2, 1, 2]);
        let clusters = ClusterExtractor::new(Grouping::ByIndex).extract(&pts);
        assert_eq!(
            clusters,
            vec![
                Cluster { exemplar: 2, members: vec![2, 0, 4] },
                Cluster { exemplar: 1, members: vec![1, 3] },
            ]
        );
    }

    #[test]
    fn test_structural_and_index_grouping_agree_on_distinct_readings() {
        let pts = assigned(&[0, 0, 2, 2, 0]);
        let by_index = ClusterExtractor::new(Grouping::ByIndex).extract(&pts);
        let structural = ClusterExtractor::new(Grouping::Structural).extract(&pts);
        assert_eq!(by_index, structural);
        assert_eq!(by_index.len(), 2);
    }

    #[test]
    fn test_structural_grouping_merges_duplicate_exemplar_readings() {
        let mut pts = assigned(&[0, 0, 2, 2]);
        // Point 2 is a duplicate survey record of point 0.
        pts[2].x = pts[0].x;
        pts[2].features = pts[0].features.clone();

        let structural = ClusterExtractor::new(Grouping::Structural).extract(&pts);
        assert_eq!(structural, vec![Cluster { exemplar: 0, members: vec![0, 1, 2, 3] }]);

        let by_index = ClusterExtractor::new(Grouping::ByIndex).count(&pts);
        assert_eq!(by_index, 2);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let pts = assigned(&[1, 1, 3, 3, 1, 3]);
        let ex = ClusterExtractor::default();
        assert_eq!(ex.extract(&pts), ex.extract(&pts));
    }

    #[test]
    fn test_unresolved_points_are_skipped() {
        let mut pts = assigned(&[0, 0, 2]);
        pts[1].exemplar = None;
        let clusters = ClusterExtractor::default().extract(&pts);
        assert_eq!(clusters.len(), 2);
        assert!(!clusters.iter().any(|c| c.contains(1)));
    }

    #[test]
    fn test_exemplar_listed_once_and_first() {
        let pts = assigned(&[1, 1, 1]);
        let clusters = ClusterExtractor::default().extract(&pts);
        assert_eq!(clusters[0].members, vec![1, 0, 2]);
        assert_eq!(clusters[0].len(), 3);
        assert!(!clusters[0].is_empty());
    }

    #[test]
    fn test_structural_grouping_matches_same_exemplar_index_first() {
        // A reading that is not equal to itself must still gather its members.
        let mut pts = assigned(&[1, 1, 1]);
        pts[1].features[0] = f64::NAN;
        let clusters = ClusterExtractor::new(Grouping::Structural).extract(&pts);
        assert_eq!(clusters, vec![Cluster { exemplar: 1, members: vec![1, 0, 2] }]);
    }

    #[test]
    fn test_is_empty_reflects_members() {
        let hand_built = Cluster { exemplar: 0, members: Vec::new() };
        assert!(hand_built.is_empty());
        assert!(!Cluster::headed_by(0).is_empty());
    }
}
