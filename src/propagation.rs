//! The Affinity Propagation run: setup, iteration loop, and result.
//!
//! ```text
//! setup:   validate config → check dimensionality → similarities + preference
//! repeat:  responsibilities → availabilities → combined → resolve exemplars
//!          → observe stability
//! until:   `convergence_rounds` consecutive stable rounds
//!          (or `max_iterations`, if set → DidNotConverge)
//! settle:  keep self-referential exemplars, reassign every other point
//! finally: extract clusters from the exemplar pointers
//! ```
//!
//! A converged run always yields a partition whose exemplars point at
//! themselves. A run stopped by `max_iterations` keeps its raw pointers.
//!
//! Fewer than two points never enter the loop: an empty input yields no
//! clusters, and a single point is its own exemplar.
//!
//! # Example
//!
//! ```
//! use refpoint_ap::point::ReferencePoint;
//! use refpoint_ap::propagation::{AffinityPropagation, ApConfig};
//!
//! let points = vec![
//!     ReferencePoint::with_features(0.0, 0.0, 'N', vec![-40.0, -80.0]),
//!     ReferencePoint::with_features(1.0, 0.0, 'N', vec![-41.0, -79.0]),
//!     ReferencePoint::with_features(1.0, 1.0, 'E', vec![-40.0, -79.0]),
//!     ReferencePoint::with_features(9.0, 0.0, 'N', vec![-80.0, -40.0]),
//!     ReferencePoint::with_features(9.0, 1.0, 'N', vec![-79.0, -41.0]),
//!     ReferencePoint::with_features(8.0, 1.0, 'E', vec![-80.0, -41.0]),
//! ];
//! let mut ap = AffinityPropagation::new(points, ApConfig::default()).unwrap();
//! let outcome = ap.run().unwrap();
//! assert_eq!(outcome.cluster_count(), 2);
//! assert_eq!(outcome.exemplars().collect::<Vec<_>>(), vec![2, 5]);
//! ```

use alloc::vec::Vec;

use tracing::{debug, info, trace, warn};

use crate::cluster::{Cluster, ClusterExtractor, Grouping};
use crate::convergence::{ConvergenceMonitor, ConvergenceState, DEFAULT_CONVERGENCE_ROUNDS};
use crate::error::{ApError, Result};
use crate::exemplar::{settle_exemplars, ExemplarFlagPolicy, ExemplarResolver};
use crate::matrix::SquareMatrix;
use crate::messages::MessagePassingEngine;
use crate::point::ReferencePoint;
use crate::similarity::compute_similarities;

/// Default preference scale.
pub const DEFAULT_GAMMA: f64 = 0.36;
/// Default quantile: the median off-diagonal similarity.
pub const DEFAULT_QUANTILE: f64 = 0.5;
/// Default damping factor.
pub const DEFAULT_DAMPING: f64 = 0.5;

/// Tunables for one run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ApConfig {
    /// Scale applied to the quantile similarity to form the preference.
    /// Values well below 1 pull the preference toward zero.
    pub gamma: f64,
    /// Position in the sorted off-diagonal similarities, in `[0, 1]`.
    /// Higher values give a less negative preference and more clusters.
    pub quantile: f64,
    /// Blend weight of the previous message value, in `(0, 1)`.
    pub damping: f64,
    /// Consecutive stable rounds required to stop.
    pub convergence_rounds: usize,
    /// Optional cap on full iterations. `None` iterates until convergence.
    pub max_iterations: Option<usize>,
    /// How `is_exemplar` flags are maintained.
    pub flag_policy: ExemplarFlagPolicy,
    /// How points are grouped into clusters at extraction.
    pub grouping: Grouping,
}

impl Default for ApConfig {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            quantile: DEFAULT_QUANTILE,
            damping: DEFAULT_DAMPING,
            convergence_rounds: DEFAULT_CONVERGENCE_ROUNDS,
            max_iterations: None,
            flag_policy: ExemplarFlagPolicy::default(),
            grouping: Grouping::default(),
        }
    }
}

impl ApConfig {
    /// Set `gamma`.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the quantile ("slider").
    pub fn with_quantile(mut self, quantile: f64) -> Self {
        self.quantile = quantile;
        self
    }

    /// Set the damping factor.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the stable-round threshold.
    pub fn with_convergence_rounds(mut self, rounds: usize) -> Self {
        self.convergence_rounds = rounds;
        self
    }

    /// Set or clear the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the exemplar flag policy.
    pub fn with_flag_policy(mut self, policy: ExemplarFlagPolicy) -> Self {
        self.flag_policy = policy;
        self
    }

    /// Set the cluster grouping rule.
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() {
            return Err(ApError::InvalidParameter {
                name: "gamma",
                value: self.gamma,
                reason: "must be finite",
            });
        }
        if !(0.0..=1.0).contains(&self.quantile) {
            return Err(ApError::InvalidParameter {
                name: "quantile",
                value: self.quantile,
                reason: "must lie in [0, 1]",
            });
        }
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(ApError::InvalidParameter {
                name: "damping",
                value: self.damping,
                reason: "must lie strictly between 0 and 1",
            });
        }
        if self.convergence_rounds == 0 {
            return Err(ApError::InvalidParameter {
                name: "convergence_rounds",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.max_iterations == Some(0) {
            return Err(ApError::InvalidParameter {
                name: "max_iterations",
                value: 0.0,
                reason: "must be at least 1 when set",
            });
        }
        Ok(())
    }
}

/// What happened in one [`AffinityPropagation::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationReport {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Points whose exemplar moved this iteration.
    pub changed: usize,
    /// Consecutive stable rounds after this iteration.
    pub stable_rounds: usize,
    /// Monitor state after this iteration.
    pub state: ConvergenceState,
}

/// Result of a finished run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApOutcome {
    /// Clusters in first-encounter order, exemplar first within each.
    pub clusters: Vec<Cluster>,
    /// Full iterations performed (0 for fewer than two points).
    pub iterations: usize,
    /// Shared self-similarity, `None` for fewer than two points.
    pub preference: Option<f64>,
}

impl ApOutcome {
    /// Number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Exemplar indices in cluster order.
    pub fn exemplars(&self) -> impl Iterator<Item = usize> + '_ {
        self.clusters.iter().map(|c| c.exemplar)
    }

    /// Cluster position of every point, `None` for points in no cluster.
    pub fn labels(&self, n_points: usize) -> Vec<Option<usize>> {
        let mut labels = alloc::vec![None; n_points];
        for (c, cluster) in self.clusters.iter().enumerate() {
            for &m in &cluster.members {
                if m < n_points && labels[m].is_none() {
                    labels[m] = Some(c);
                }
            }
        }
        labels
    }
}

/// One Affinity Propagation run over an owned set of points.
#[derive(Clone, Debug)]
pub struct AffinityPropagation {
    points: Vec<ReferencePoint>,
    config: ApConfig,
    preference: Option<f64>,
    engine: MessagePassingEngine,
    resolver: ExemplarResolver,
    monitor: ConvergenceMonitor,
    extractor: ClusterExtractor,
    settled: bool,
}

impl AffinityPropagation {
    /// Validate `config`, check the points share one dimensionality, and build
    /// the similarity matrix. Any prior clustering state on the points is cleared.
    pub fn new(mut points: Vec<ReferencePoint>, config: ApConfig) -> Result<Self> {
        config.validate()?;
        let (similarity, preference) =
            compute_similarities(&points, config.gamma, config.quantile)?;
        points.iter_mut().for_each(ReferencePoint::reset_clustering);

        debug!(
            n = points.len(),
            dimension = points.first().map_or(0, ReferencePoint::dimension),
            preference = ?preference,
            "similarity matrix ready"
        );

        let engine = MessagePassingEngine::new(similarity, config.damping);
        let monitor = ConvergenceMonitor::new(config.convergence_rounds)
            .with_max_iterations(config.max_iterations);
        Ok(Self {
            resolver: ExemplarResolver::new(config.flag_policy),
            extractor: ClusterExtractor::new(config.grouping),
            points,
            config,
            preference,
            engine,
            monitor,
            settled: false,
        })
    }

    /// Run one full iteration: both message sweeps, the combined matrix,
    /// exemplar resolution for every point, and the stability check. On the
    /// converged iteration the exemplar set is settled into a partition.
    ///
    /// With fewer than two points this settles the trivial assignment instead
    /// and reports `Converged`.
    pub fn step(&mut self) -> IterationReport {
        if self.points.len() < 2 {
            self.settle_trivially();
            return IterationReport {
                iteration: 0,
                changed: 0,
                stable_rounds: 0,
                state: ConvergenceState::Converged,
            };
        }

        self.engine.sweep();
        let changed = self.resolver.resolve_all(&mut self.points, self.engine.combined());
        let state = self.monitor.observe(changed == 0);
        if state == ConvergenceState::Converged {
            let moved = settle_exemplars(&mut self.points, self.engine.combined());
            if moved > 0 {
                debug!(moved, "reassigned points whose exemplar was not self-referential");
            }
        }
        let report = IterationReport {
            iteration: self.monitor.iterations(),
            changed,
            stable_rounds: self.monitor.stable_rounds(),
            state,
        };
        trace!(
            iteration = report.iteration,
            changed = report.changed,
            stable_rounds = report.stable_rounds,
            "iteration complete"
        );
        report
    }

    /// Iterate until convergence and return the clusters.
    ///
    /// Returns [`ApError::DidNotConverge`] if `max_iterations` is set and
    /// runs out first; the points keep their last assignment, so
    /// [`Self::clusters`] still reports the partial result.
    pub fn run(&mut self) -> Result<ApOutcome> {
        if self.points.len() < 2 {
            self.settle_trivially();
            return Ok(self.outcome());
        }

        while !self.monitor.is_converged() {
            if self.monitor.exhausted() {
                let iterations = self.monitor.iterations();
                warn!(iterations, "iteration bound reached before convergence");
                return Err(ApError::DidNotConverge { iterations });
            }
            self.step();
        }

        let outcome = self.outcome();
        info!(
            iterations = outcome.iterations,
            clusters = outcome.cluster_count(),
            "affinity propagation converged"
        );
        Ok(outcome)
    }

    fn settle_trivially(&mut self) {
        if self.settled {
            return;
        }
        match self.points.first_mut() {
            Some(only) => {
                warn!("single point: it is its own exemplar, skipping message passing");
                only.exemplar = Some(0);
                only.is_exemplar = true;
                only.exemplar_changed = false;
            }
            None => warn!("no points to cluster"),
        }
        self.settled = true;
    }

    /// `true` once the run has converged (or settled a trivial input).
    pub fn is_converged(&self) -> bool {
        self.settled || self.monitor.is_converged()
    }

    /// Clusters from the current exemplar pointers.
    pub fn clusters(&self) -> Vec<Cluster> {
        self.extractor.extract(&self.points)
    }

    /// Number of clusters from the current exemplar pointers.
    pub fn cluster_count(&self) -> usize {
        self.extractor.count(&self.points)
    }

    /// Snapshot of the current result.
    pub fn outcome(&self) -> ApOutcome {
        ApOutcome {
            clusters: self.clusters(),
            iterations: self.monitor.iterations(),
            preference: self.preference,
        }
    }

    /// Points with their current clustering state.
    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// Give the points back, clustering state included.
    pub fn into_points(self) -> Vec<ReferencePoint> {
        self.points
    }

    /// Configuration of this run.
    pub fn config(&self) -> &ApConfig {
        &self.config
    }

    /// Shared self-similarity, `None` for fewer than two points.
    pub fn preference(&self) -> Option<f64> {
        self.preference
    }

    /// Iterations performed so far.
    pub fn iterations(&self) -> usize {
        self.monitor.iterations()
    }

    /// Similarity matrix (preference on the diagonal).
    pub fn similarity(&self) -> &SquareMatrix {
        self.engine.similarity()
    }

    /// Responsibility matrix after the last iteration.
    pub fn responsibility(&self) -> &SquareMatrix {
        self.engine.responsibility()
    }

    /// Availability matrix after the last iteration.
    pub fn availability(&self) -> &SquareMatrix {
        self.engine.availability()
    }

    /// Combined matrix after the last iteration.
    pub fn combined(&self) -> &SquareMatrix {
        self.engine.combined()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn line(xs: &[f64]) -> Vec<ReferencePoint> {
        xs.iter()
            .map(|&x| ReferencePoint::with_features(x, 0.0, 'N', vec![x]))
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(ApConfig::default().validate().is_ok());
        assert!(ApConfig::default().with_quantile(1.5).validate().is_err());
        assert!(ApConfig::default().with_quantile(-0.1).validate().is_err());
        assert!(ApConfig::default().with_damping(0.0).validate().is_err());
        assert!(ApConfig::default().with_damping(1.0).validate().is_err());
        assert!(ApConfig::default().with_damping(f64::NAN).validate().is_err());
        assert!(ApConfig::default().with_gamma(f64::INFINITY).validate().is_err());
        assert!(ApConfig::default().with_convergence_rounds(0).validate().is_err());
        assert!(ApConfig::default().with_max_iterations(Some(0)).validate().is_err());
        assert!(ApConfig::default().with_max_iterations(Some(1)).validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_before_setup() {
        let err = AffinityPropagation::new(line(&[0.0, 1.0]), ApConfig::default().with_damping(2.0))
            .unwrap_err();
        assert!(matches!(err, ApError::InvalidParameter { name: "damping", .. }));
    }

    #[test]
    fn test_empty_input_has_no_clusters() {
        let mut ap = AffinityPropagation::new(Vec::new(), ApConfig::default()).unwrap();
        let outcome = ap.run().unwrap();
        assert_eq!(outcome.cluster_count(), 0);
        assert_eq!(outcome.preference, None);
        assert!(ap.is_converged());
    }

    #[test]
    fn test_single_point_is_its_own_cluster() {
        let mut ap = AffinityPropagation::new(line(&[3.0]), ApConfig::default()).unwrap();
        let outcome = ap.run().unwrap();
        assert_eq!(outcome.clusters, vec![Cluster { exemplar: 0, members: vec![0] }]);
        assert_eq!(outcome.iterations, 0);
        assert!(ap.points()[0].is_exemplar);
        assert_eq!(ap.step().state, ConvergenceState::Converged);
    }

    #[test]
    fn test_step_reports_progress() {
        let mut ap = AffinityPropagation::new(line(&[0.0, 0.1, 10.0, 10.1]), ApConfig::default())
            .unwrap();
        let first = ap.step();
        assert_eq!(first.iteration, 1);
        assert_eq!(first.changed, 4, "every point changes on its first resolution");
        assert_eq!(first.stable_rounds, 0);
        assert_eq!(first.state, ConvergenceState::Running);
    }

    #[test]
    fn test_iteration_cap_surfaces_did_not_converge() {
        let config = ApConfig::default().with_max_iterations(Some(3));
        let mut ap = AffinityPropagation::new(line(&[0.0, 0.1, 10.0, 10.1]), config).unwrap();
        assert_eq!(ap.run(), Err(ApError::DidNotConverge { iterations: 3 }));
        // The partial assignment is still available.
        assert!(ap.points().iter().all(|p| p.exemplar.is_some()));
    }

    #[test]
    fn test_labels_follow_cluster_order() {
        let outcome = ApOutcome {
            clusters: vec![
                Cluster { exemplar: 2, members: vec![2, 0] },
                Cluster { exemplar: 1, members: vec![1] },
            ],
            iterations: 12,
            preference: Some(-1.0),
        };
        assert_eq!(outcome.labels(4), vec![Some(0), Some(1), Some(0), None]);
        assert_eq!(outcome.exemplars().collect::<Vec<_>>(), vec![2, 1]);
    }
}
