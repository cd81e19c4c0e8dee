#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record storage for the violation map.
//!
//! Violations live in a JSON file named after a fixed storage key inside
//! the data directory. When that file does not exist yet, the store starts
//! from the dataset bundled into the binary. The official price list is
//! read the same way.

pub mod audit;
pub mod prices;
pub mod store;

pub use audit::{AuditAction, AuditEntry};
pub use prices::PriceCatalog;
pub use store::{
    NewViolation, STORAGE_KEY, ViolationReport, ViolationStore, ViolationUpdate, parse_location,
};

use std::path::PathBuf;

use cpa_map_violation_models::ViolationRecord;

/// Violations shipped with the binary.
const BUNDLED_VIOLATIONS: &str = include_str!("../data/violations.json");

/// Price list shipped with the binary.
const BUNDLED_PRICES: &str = include_str!("../data/prices.json");

/// Errors that can occur while loading, editing or saving records.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Reading or writing a store file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A store file is not valid JSON for its record type.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// Two records share an identifier.
    #[error("Duplicate violation id {0}")]
    DuplicateId(i64),

    /// No record has the requested identifier.
    #[error("Violation {0} not found")]
    NotFound(i64),

    /// A location was malformed or outside WGS84 bounds.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
}

/// Returns the bundled violation records.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed. The data is compiled in, so
/// this is a development error caught by tests.
#[must_use]
pub fn bundled_violations() -> Vec<ViolationRecord> {
    serde_json::from_str(BUNDLED_VIOLATIONS)
        .unwrap_or_else(|e| panic!("Failed to parse bundled violations.json: {e}"))
}

/// Returns the bundled price list.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed.
#[must_use]
pub fn bundled_prices() -> PriceCatalog {
    serde_json::from_str(BUNDLED_PRICES)
        .unwrap_or_else(|e| panic!("Failed to parse bundled prices.json: {e}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use cpa_map_violation_models::Located;

    use super::*;

    #[test]
    fn bundled_violations_are_well_formed() {
        let records = bundled_violations();
        assert!(!records.is_empty());

        let ids: BTreeSet<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), records.len(), "bundled ids must be unique");

        for record in &records {
            assert!(
                record.has_valid_coordinates(),
                "record {} has invalid coordinates",
                record.id
            );
            assert!(!record.description.ar.is_empty());
            assert!(!record.description.en.is_empty());
        }
    }

    #[test]
    fn bundled_prices_reference_known_categories() {
        let catalog = bundled_prices();
        assert!(!catalog.items.is_empty());
        for item in &catalog.items {
            assert!(
                item.category(&catalog.categories).is_some(),
                "item {} references unknown category {}",
                item.code,
                item.category_id
            );
        }
    }
}
