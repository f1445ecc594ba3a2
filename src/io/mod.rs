//! Survey file input and cluster file output.
//!
//! - [`dataset`] reads the comma-separated survey format into a [`Dataset`].
//! - [`writer`] writes each cluster to its own file, either as a survey
//!   record that [`dataset`] can read back or as plain `x y` lines for
//!   plotting.
//!
//! Requires the `std` feature.

pub mod dataset;
pub mod writer;

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ApError;

pub use dataset::{load_dataset, parse_dataset, Dataset, PsiMatrix};
pub use writer::{write_cluster_record, write_cluster_xy, write_clusters, ClusterFileNamer, OutputFormat};

/// Failures reading a survey or writing clusters.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The input could not be opened or read.
    #[error("cannot read survey data from {path}: {source}")]
    DataUnavailable {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A line of the input could not be understood.
    #[error("malformed survey data at line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A cluster file could not be written.
    #[error("cannot write cluster file {path}: {source}")]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Clustering the loaded points failed.
    #[error(transparent)]
    Clustering(#[from] ApError),
}

impl DatasetError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed { line, reason: reason.into() }
    }
}
