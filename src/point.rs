//! Reference points: surveyed locations carrying a radio fingerprint.
//!
//! A [`ReferencePoint`] is where a survey device stood (`x`, `y`), which way it
//! was facing (a one-character orientation label such as `'N'`), and the
//! received-signal-strength readings it recorded, one per access point. The
//! readings are the feature vector the clustering engine compares.
//!
//! Each point also carries its clustering state. The exemplar is stored as an
//! index into the shared point slice rather than a reference, so "same
//! exemplar" is plain index equality.

use alloc::string::String;
use alloc::vec::Vec;

/// Provenance of a survey: which device recorded it, where.
///
/// Carried alongside the points and reproduced in every written cluster file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurveyMetadata {
    /// Model string of the device that recorded the readings.
    pub source_device_model: String,
    /// Building identifier.
    pub building: String,
    /// Floor number.
    pub floor: i32,
}

/// A surveyed location with its signal-strength fingerprint and clustering state.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferencePoint {
    /// Survey coordinate, x axis.
    pub x: f64,
    /// Survey coordinate, y axis.
    pub y: f64,
    /// Orientation label recorded with the readings. Opaque to the engine.
    pub orientation: char,
    /// RSS readings in access-point order. Every point in a run has the same length.
    pub features: Vec<f64>,
    /// Index of this point's current exemplar. `None` until the first resolution.
    pub exemplar: Option<usize>,
    /// Whether some point currently designates this one as its exemplar.
    pub is_exemplar: bool,
    /// Whether the last resolution moved this point to a different exemplar.
    ///
    /// Starts `true` so that a run never counts as stable before every point
    /// has been resolved at least once.
    pub exemplar_changed: bool,
}

impl ReferencePoint {
    /// A point at `(x, y)` with no orientation label and no readings yet.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            orientation: ' ',
            features: Vec::new(),
            exemplar: None,
            is_exemplar: false,
            exemplar_changed: true,
        }
    }

    /// A fully specified point, ready for clustering.
    pub fn with_features(x: f64, y: f64, orientation: char, features: Vec<f64>) -> Self {
        Self { orientation, features, ..Self::new(x, y) }
    }

    /// Number of RSS readings (feature dimensionality).
    pub fn dimension(&self) -> usize {
        self.features.len()
    }

    /// `true` once the point has been resolved and its exemplar is itself.
    pub fn is_cluster_head(&self, own_index: usize) -> bool {
        self.exemplar == Some(own_index)
    }

    /// Structural equality on the survey reading: coordinate, orientation and
    /// every RSS value. Clustering state is ignored.
    ///
    /// Two distinct points taken at the same spot, facing the same way, with
    /// identical readings compare equal here.
    pub fn same_reading(&self, other: &ReferencePoint) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.orientation == other.orientation
            && self.features == other.features
    }

    /// Forget any clustering state, returning the point to its pre-run condition.
    pub fn reset_clustering(&mut self) {
        self.exemplar = None;
        self.is_exemplar = false;
        self.exemplar_changed = true;
    }
}
