//! Cluster file writers.
//!
//! Two formats, one file per cluster:
//!
//! - [`OutputFormat::Record`]: the survey header with `number_of_points` set
//!   to the cluster size, then one framed block per member, exemplar first.
//!   The result parses back with [`super::parse_dataset`].
//! - [`OutputFormat::Xy`]: one `x y` line per member, for plotting.
//!
//! File names come from a [`ClusterFileNamer`] owned by the caller, so two
//! runs in one process never share a counter.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::DatasetError;
use crate::cluster::Cluster;
use crate::point::{ReferencePoint, SurveyMetadata};

/// Which cluster file layout to write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// Full survey record, readable as input.
    #[default]
    Record,
    /// `x y` coordinate lines only.
    Xy,
}

/// Hands out sequential cluster file names: `{prefix}{n}.{extension}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterFileNamer {
    prefix: String,
    extension: String,
    next: usize,
}

impl ClusterFileNamer {
    /// A namer starting at 0.
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), extension: extension.into(), next: 0 }
    }

    /// The conventional names for `format`: `cluster{n}.csv` or
    /// `cluster_matlab{n}.txt`.
    pub fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Record => Self::new("cluster", "csv"),
            OutputFormat::Xy => Self::new("cluster_matlab", "txt"),
        }
    }

    /// Replace the prefix, keeping extension and counter.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> usize {
        self.next
    }

    /// The next file name. Advances the counter.
    pub fn next_name(&mut self) -> String {
        let name = format!("{}{}.{}", self.prefix, self.next, self.extension);
        self.next += 1;
        name
    }
}

fn members<'a>(
    points: &'a [ReferencePoint],
    cluster: &'a Cluster,
) -> impl Iterator<Item = &'a ReferencePoint> + 'a {
    cluster.members.iter().filter_map(move |&i| points.get(i))
}

/// Write `cluster` in the full record layout.
pub fn write_cluster_record<W: Write>(
    out: &mut W,
    metadata: &SurveyMetadata,
    points: &[ReferencePoint],
    cluster: &Cluster,
) -> std::io::Result<()> {
    writeln!(out, "source_device_model,{}", metadata.source_device_model)?;
    writeln!(out, "building,{}", metadata.building)?;
    writeln!(out, "floor,{}", metadata.floor)?;
    writeln!(out, "number_of_points,{}", members(points, cluster).count())?;
    for p in members(points, cluster) {
        writeln!(out, "begin_new_point")?;
        writeln!(out, "Coordinate,{},{}", p.x, p.y)?;
        writeln!(out, "Labeled Point")?;
        writeln!(out, "{}", p.orientation)?;
        for v in &p.features {
            writeln!(out, "{v},")?;
        }
        writeln!(out, "end_of_point")?;
    }
    Ok(())
}

/// Write `cluster` as `x y` lines, exemplar first.
pub fn write_cluster_xy<W: Write>(
    out: &mut W,
    points: &[ReferencePoint],
    cluster: &Cluster,
) -> std::io::Result<()> {
    for p in members(points, cluster) {
        writeln!(out, "{} {}", p.x, p.y)?;
    }
    Ok(())
}

/// Write every cluster to its own file under `dir` and return the paths, in
/// cluster order.
pub fn write_clusters(
    dir: &Path,
    metadata: &SurveyMetadata,
    points: &[ReferencePoint],
    clusters: &[Cluster],
    format: OutputFormat,
    namer: &mut ClusterFileNamer,
) -> Result<Vec<PathBuf>, DatasetError> {
    let mut written = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let path = dir.join(namer.next_name());
        let fail = |source| DatasetError::Write { path: path.clone(), source };

        let mut out = BufWriter::new(File::create(&path).map_err(fail)?);
        let written_ok = match format {
            OutputFormat::Record => write_cluster_record(&mut out, metadata, points, cluster),
            OutputFormat::Xy => write_cluster_xy(&mut out, points, cluster),
        };
        written_ok.and_then(|()| out.flush()).map_err(fail)?;

        debug!(path = %path.display(), members = cluster.len(), "cluster written");
        written.push(path);
    }
    Ok(written)
}
