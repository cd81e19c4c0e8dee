#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Proximity clustering for the violations map.
//!
//! Groups located records into visual clusters so overlapping markers merge
//! into one marker with a count. The grouping is a greedy single pass over
//! the input in order: each unprocessed seed absorbs every still-unprocessed
//! record whose planar distance (in decimal degrees) to the seed is strictly
//! below the threshold. Results depend on input order; a record consumed by
//! an earlier seed never joins a later cluster.
//!
//! Every call scans all pairs (O(n²)); the map shows tens to low hundreds
//! of markers.

pub mod export;

pub use export::clusters_to_geojson;

use cpa_map_violation_models::Located;
use geo::{Distance, Euclidean, Point};
use serde::{Deserialize, Serialize};

/// Default merge distance in decimal degrees (roughly 500 m at the
/// equator), suited to city-scale zoom.
pub const DEFAULT_THRESHOLD_DEGREES: f64 = 0.005;

/// Errors that can occur while configuring or running the clusterer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    /// Threshold was zero, negative or not finite.
    #[error("Invalid cluster threshold {0}: expected a positive finite number of degrees")]
    InvalidThreshold(f64),

    /// A record's coordinates were not finite or outside WGS84 bounds.
    #[error("Record {id} has invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates {
        /// Offending record.
        id: i64,
        /// Its latitude.
        lat: f64,
        /// Its longitude.
        lng: f64,
    },
}

/// Merge distance, in decimal degrees, below which records share a cluster.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ClusterThreshold(f64);

impl ClusterThreshold {
    /// Validates a threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidThreshold`] unless `degrees` is finite
    /// and strictly positive.
    pub fn new(degrees: f64) -> Result<Self, ClusterError> {
        if degrees.is_finite() && degrees > 0.0 {
            Ok(Self(degrees))
        } else {
            Err(ClusterError::InvalidThreshold(degrees))
        }
    }

    /// The threshold in decimal degrees.
    #[must_use]
    pub const fn degrees(self) -> f64 {
        self.0
    }
}

impl Default for ClusterThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD_DEGREES)
    }
}

impl TryFrom<f64> for ClusterThreshold {
    type Error = ClusterError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClusterThreshold> for f64 {
    fn from(value: ClusterThreshold) -> Self {
        value.0
    }
}

/// A group of records rendered as one map marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster<T> {
    /// Synthetic identifier derived from the seed record (`cluster-{id}`).
    pub id: String,
    /// Mean latitude of the members.
    pub lat: f64,
    /// Mean longitude of the members.
    pub lng: f64,
    /// Number of members.
    pub count: usize,
    /// Members in input order.
    pub members: Vec<T>,
}

impl<T: Located> Cluster<T> {
    /// Whether this cluster is a single unmerged record.
    #[must_use]
    pub const fn is_singleton(&self) -> bool {
        self.count == 1
    }

    /// Identifiers of the members, in order.
    #[must_use]
    pub fn member_ids(&self) -> Vec<i64> {
        self.members.iter().map(Located::id).collect()
    }

    /// Centroid as a `geo` point (`x` = longitude, `y` = latitude).
    #[must_use]
    pub fn centroid(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }

    fn from_members(seed_id: i64, members: Vec<T>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let n = members.len() as f64;
        let (lat_sum, lng_sum) = members
            .iter()
            .fold((0.0, 0.0), |(lat, lng), m| (lat + m.lat(), lng + m.lng()));

        Self {
            id: format!("cluster-{seed_id}"),
            lat: lat_sum / n,
            lng: lng_sum / n,
            count: members.len(),
            members,
        }
    }
}

fn point_of<T: Located>(record: &T) -> Point<f64> {
    Point::new(record.lng(), record.lat())
}

/// Partitions `records` into proximity clusters.
///
/// Walks `records` in order. Each record not yet assigned seeds a cluster
/// made of every unassigned record (the seed included) strictly closer than
/// `threshold` to the seed. Every input record lands in exactly one output
/// cluster; isolated records come back as singletons. Clusters are emitted
/// in seed order and members keep input order.
///
/// Coordinates are not validated; see [`try_cluster_records`].
#[must_use]
pub fn cluster_records<T: Located + Clone>(
    records: &[T],
    threshold: ClusterThreshold,
) -> Vec<Cluster<T>> {
    let limit = threshold.degrees();
    let mut processed = vec![false; records.len()];
    let mut clusters = Vec::new();

    for (i, seed) in records.iter().enumerate() {
        if processed[i] {
            continue;
        }
        let origin = point_of(seed);

        let neighbors: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(j, other)| {
                !processed[*j]
                    && (*j == i || Euclidean.distance(origin, point_of(*other)) < limit)
            })
            .map(|(j, _)| j)
            .collect();

        for &j in &neighbors {
            processed[j] = true;
        }

        let members = neighbors.iter().map(|&j| records[j].clone()).collect();
        clusters.push(Cluster::from_members(seed.id(), members));
    }

    log::debug!(
        "Clustered {} records into {} clusters (threshold {limit})",
        records.len(),
        clusters.len()
    );

    clusters
}

/// Like [`cluster_records`], but rejects records with unusable coordinates.
///
/// # Errors
///
/// Returns [`ClusterError::InvalidCoordinates`] for the first record whose
/// latitude or longitude is not finite or lies outside WGS84 bounds.
pub fn try_cluster_records<T: Located + Clone>(
    records: &[T],
    threshold: ClusterThreshold,
) -> Result<Vec<Cluster<T>>, ClusterError> {
    if let Some(bad) = records.iter().find(|r| !r.has_valid_coordinates()) {
        return Err(ClusterError::InvalidCoordinates {
            id: bad.id(),
            lat: bad.lat(),
            lng: bad.lng(),
        });
    }
    Ok(cluster_records(records, threshold))
}
