#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the violation map server.
//!
//! Query parameter structs arrive as loosely typed strings from the map
//! controls and are converted into the strongly typed filters of
//! `cpa_map_filter` before any record is touched.

use cpa_map_cluster::Cluster;
use cpa_map_filter::{
    CategoryFilter, DateRange, FilterParseError, PriceFilter, TextQuery, TypeFilter,
    ViolationFilter,
};
use cpa_map_violation_models::{Language, ViolationRecord, ViolationStatus, ViolationType};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Filter fields shared by the violation list, summary and cluster queries.
#[derive(Debug, Clone, Default)]
pub struct ViolationFilterParams {
    /// `all` or a violation type label.
    pub violation_type: Option<String>,
    /// Inclusive start date (`YYYY-MM-DD`).
    pub from: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`).
    pub to: Option<String>,
    /// Single day (`YYYY-MM-DD`); overrides `from`/`to`.
    pub date: Option<String>,
    /// Review state.
    pub status: Option<String>,
    /// Free-text search term.
    pub q: Option<String>,
}

impl ViolationFilterParams {
    /// Converts the raw parameters into a [`ViolationFilter`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterParseError`] if the type, status or a date does not
    /// parse.
    pub fn to_filter(&self) -> Result<ViolationFilter, FilterParseError> {
        let violation_type = match self.violation_type.as_deref() {
            Some(s) => s.parse()?,
            None => TypeFilter::All,
        };

        let date_range = match self.date.as_deref().map(str::trim) {
            Some(day) if !day.is_empty() => DateRange::parse(Some(day), Some(day))?,
            _ => DateRange::parse(self.from.as_deref(), self.to.as_deref())?,
        };

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("" | "all") => None,
            Some(s) => Some(
                s.parse::<ViolationStatus>()
                    .map_err(|_| FilterParseError::UnknownStatus(s.to_string()))?,
            ),
        };

        Ok(ViolationFilter {
            violation_type,
            date_range,
            status,
            search: TextQuery::new(self.q.clone().unwrap_or_default()),
        })
    }
}

/// Query parameters for the violations list and summary endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationQueryParams {
    /// `all` or a violation type label.
    #[serde(rename = "type")]
    pub violation_type: Option<String>,
    /// Inclusive start date.
    pub from: Option<String>,
    /// Inclusive end date.
    pub to: Option<String>,
    /// Single day.
    pub date: Option<String>,
    /// Review state.
    pub status: Option<String>,
    /// Free-text search term.
    pub q: Option<String>,
}

impl From<&ViolationQueryParams> for ViolationFilterParams {
    fn from(p: &ViolationQueryParams) -> Self {
        Self {
            violation_type: p.violation_type.clone(),
            from: p.from.clone(),
            to: p.to.clone(),
            date: p.date.clone(),
            status: p.status.clone(),
            q: p.q.clone(),
        }
    }
}

/// Query parameters for the clusters endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQueryParams {
    /// `all` or a violation type label.
    #[serde(rename = "type")]
    pub violation_type: Option<String>,
    /// Inclusive start date.
    pub from: Option<String>,
    /// Inclusive end date.
    pub to: Option<String>,
    /// Single day.
    pub date: Option<String>,
    /// Review state.
    pub status: Option<String>,
    /// Free-text search term.
    pub q: Option<String>,
    /// Merge distance in degrees (overrides the server default).
    pub threshold: Option<f64>,
}

impl From<&ClusterQueryParams> for ViolationFilterParams {
    fn from(p: &ClusterQueryParams) -> Self {
        Self {
            violation_type: p.violation_type.clone(),
            from: p.from.clone(),
            to: p.to.clone(),
            date: p.date.clone(),
            status: p.status.clone(),
            q: p.q.clone(),
        }
    }
}

/// Query parameters for the price list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQueryParams {
    /// `all` or a category id.
    pub category: Option<String>,
    /// Search term over names and product code.
    pub q: Option<String>,
}

impl PriceQueryParams {
    /// Converts the raw parameters into a [`PriceFilter`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterParseError::InvalidCategory`] if the category is
    /// neither `all` nor numeric.
    pub fn to_filter(&self) -> Result<PriceFilter, FilterParseError> {
        Ok(PriceFilter {
            category: match self.category.as_deref() {
                Some(s) => s.parse()?,
                None => CategoryFilter::All,
            },
            search: TextQuery::new(self.q.clone().unwrap_or_default()),
        })
    }
}

/// Query parameters selecting a display language.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LanguageQueryParams {
    /// Display language; Arabic when omitted.
    pub lang: Option<Language>,
}

/// A violation type option for the map's type selector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiViolationType {
    /// Canonical type.
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    /// Label in the requested language.
    pub label: String,
    /// Pin color for single markers of this type.
    pub marker_color: String,
}

impl ApiViolationType {
    /// Builds the selector option for `violation_type`.
    #[must_use]
    pub fn new(violation_type: ViolationType, language: Language) -> Self {
        Self {
            violation_type,
            label: violation_type.label(language).to_string(),
            marker_color: violation_type.marker_color().to_string(),
        }
    }
}

/// Response from the clusters endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse<'a> {
    /// Merge distance used, in degrees.
    pub threshold: f64,
    /// Number of records that passed the filter.
    pub record_count: usize,
    /// Clusters in seed order, each with its full member list.
    pub clusters: Vec<Cluster<&'a ViolationRecord>>,
}
