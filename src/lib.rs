//! # refpoint-ap
//!
//! Affinity Propagation clustering for radio-fingerprint reference points.
//!
//! ---
//!
//! An indoor-positioning survey records, at many spots on a floor, the signal
//! strength of every visible access point. Neighbouring spots produce similar
//! fingerprints, and searching a few hundred of them on every position fix is
//! wasted work. This crate groups the survey into clusters of similar
//! fingerprints, each represented by one real survey point, its *exemplar*.
//! A locator then compares against exemplars first and only searches inside
//! the winning cluster.
//!
//! The number of clusters is not configured. Every point starts as a
//! candidate exemplar with the same *preference*, points exchange
//! responsibility and availability messages, and the exemplars that survive
//! are the ones enough points vote for. The preference is taken from the data
//! itself (a quantile of the pairwise similarities, scaled by `gamma`), so the
//! one knob is the quantile: higher gives more, tighter clusters.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! ReferencePoint[] → similarity (S, preference) → MessagePassingEngine (R, A, C)
//!                                                        │ each iteration
//!                                                        ▼
//!                        ConvergenceMonitor ◀── ExemplarResolver (argmax of C)
//!                               │ converged
//!                               ▼
//!                        ClusterExtractor → Vec<Cluster>
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`point`] | [`ReferencePoint`], [`SurveyMetadata`] | Survey location, orientation, RSS vector and clustering state |
//! | [`matrix`] | [`SquareMatrix`] | Dense row-major `n × n` storage |
//! | [`similarity`] | [`compute_similarities`] | Negative squared Euclidean similarities and the data-driven preference |
//! | [`messages`] | [`MessagePassingEngine`] | Damped responsibility and availability sweeps |
//! | [`exemplar`] | [`ExemplarResolver`], [`ExemplarFlagPolicy`] | Row argmax with lowest-index tie-break |
//! | [`convergence`] | [`ConvergenceMonitor`] | Consecutive stable-round termination |
//! | [`cluster`] | [`ClusterExtractor`], [`Cluster`], [`Grouping`] | Partition extraction in first-encounter order |
//! | [`propagation`] | [`AffinityPropagation`], [`ApConfig`], [`ApOutcome`] | The run: setup, iteration loop, result |
//! | [`error`] | [`ApError`] | Error type for the core |
//! | `report` | `ClusterReport` | Serialisable run summary (requires `serde` feature) |
//! | `io` | `load_dataset`, `write_clusters` | Survey parser and cluster file writers (requires `std` feature) |
//! | `settings` | `Settings` | Layered configuration for the command-line tool (requires `cli` feature) |
//!
//! ## Quick start
//!
//! ```
//! use refpoint_ap::{AffinityPropagation, ApConfig, ReferencePoint};
//!
//! let survey = vec![
//!     ReferencePoint::with_features(0.0, 0.0, 'N', vec![-40.0, -70.0]),
//!     ReferencePoint::with_features(1.0, 0.0, 'N', vec![-41.0, -71.0]),
//!     ReferencePoint::with_features(1.0, 1.0, 'E', vec![-40.0, -71.0]),
//!     ReferencePoint::with_features(8.0, 0.0, 'N', vec![-75.0, -45.0]),
//!     ReferencePoint::with_features(8.0, 1.0, 'S', vec![-76.0, -44.0]),
//!     ReferencePoint::with_features(9.0, 1.0, 'W', vec![-75.0, -44.0]),
//! ];
//!
//! let mut ap = AffinityPropagation::new(survey, ApConfig::default())?;
//! let outcome = ap.run()?;
//! assert_eq!(outcome.cluster_count(), 2);
//! assert_eq!(outcome.clusters[0].members, vec![2, 0, 1]);
//! # Ok::<(), refpoint_ap::ApError>(())
//! ```
//!
//! ## `no_std`
//!
//! The core is `#![no_std]` and needs only `alloc`. Enable `std` for the
//! dataset parser and cluster writers, `serde` for serialisation of
//! configuration, points and [`ApOutcome`], and `cli` for the
//! `refpoint-ap` binary.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod cluster;
pub mod convergence;
pub mod error;
pub mod exemplar;
pub mod matrix;
pub mod messages;
pub mod point;
pub mod propagation;
pub mod similarity;

#[cfg(feature = "serde")]
pub mod report;

#[cfg(feature = "std")]
pub mod io;

#[cfg(feature = "cli")]
pub mod settings;

pub use cluster::{Cluster, ClusterExtractor, Grouping};
pub use convergence::{ConvergenceMonitor, ConvergenceState, DEFAULT_CONVERGENCE_ROUNDS};
pub use error::{ApError, Result};
pub use exemplar::{ExemplarFlagPolicy, ExemplarResolver};
pub use matrix::SquareMatrix;
pub use messages::MessagePassingEngine;
pub use point::{ReferencePoint, SurveyMetadata};
pub use propagation::{AffinityPropagation, ApConfig, ApOutcome, IterationReport};
pub use similarity::compute_similarities;
