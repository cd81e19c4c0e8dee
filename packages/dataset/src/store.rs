//! JSON-backed violation store with admin create/edit/delete.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use cpa_map_violation_models::{
    LocalizedText, Located, ViolationRecord, ViolationStatus, ViolationType,
};
use serde::Deserialize;

use crate::audit::{AuditAction, AuditEntry};
use crate::{DatasetError, bundled_violations};

/// Fixed storage key; the store file is `<data_dir>/cpa_violations.json`.
pub const STORAGE_KEY: &str = "cpa_violations";

/// Fields of a violation created from the admin panel. The id is assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewViolation {
    /// Latitude (decimal degrees).
    pub lat: f64,
    /// Longitude (decimal degrees).
    pub lng: f64,
    /// Logical violation category.
    pub violation_type: ViolationType,
    /// Day the violation was observed.
    pub report_date: NaiveDate,
    /// Description in both languages.
    pub description: LocalizedText,
    /// Initial review state.
    #[serde(default)]
    pub status: ViolationStatus,
}

/// A public report as submitted from the report form.
///
/// The location is the `lat, lng` string the form fills in from the
/// browser's geolocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    /// `"lat, lng"` in decimal degrees.
    pub location: String,
    /// Reported category.
    pub violation_type: ViolationType,
    /// What the reporter saw.
    pub description: LocalizedText,
    /// Observation day; defaults to today (UTC).
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
}

/// Full replacement of an existing violation from the admin panel.
///
/// Every field is required, so an edit never silently resets the review
/// state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationUpdate {
    /// Latitude (decimal degrees).
    pub lat: f64,
    /// Longitude (decimal degrees).
    pub lng: f64,
    /// Logical violation category.
    pub violation_type: ViolationType,
    /// Day the violation was observed.
    pub report_date: NaiveDate,
    /// Description in both languages.
    pub description: LocalizedText,
    /// Review state.
    pub status: ViolationStatus,
}

impl ViolationUpdate {
    /// Builds the replacement record for violation `id`.
    #[must_use]
    pub fn into_record(self, id: i64) -> ViolationRecord {
        ViolationRecord {
            id,
            lat: self.lat,
            lng: self.lng,
            violation_type: self.violation_type,
            report_date: self.report_date,
            description: self.description,
            status: self.status,
        }
    }
}

/// Parses a `"lat, lng"` location string.
///
/// # Errors
///
/// Returns [`DatasetError::InvalidLocation`] unless the string holds two
/// comma-separated numbers inside WGS84 bounds.
pub fn parse_location(location: &str) -> Result<(f64, f64), DatasetError> {
    let invalid = || DatasetError::InvalidLocation(location.to_string());

    let (lat, lng) = location.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

    if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat)
        || !(-180.0..=180.0).contains(&lng)
    {
        return Err(invalid());
    }
    Ok((lat, lng))
}

/// The violation collection plus where it is persisted.
#[derive(Debug, Clone)]
pub struct ViolationStore {
    path: Option<PathBuf>,
    records: Vec<ViolationRecord>,
    audit: Vec<AuditEntry>,
}

impl ViolationStore {
    /// Opens the store in `data_dir`.
    ///
    /// Falls back to the bundled dataset when the store file does not exist
    /// yet; the file is created on the first [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file exists but cannot be read or
    /// parsed, or contains duplicate ids.
    pub fn open(data_dir: &Path) -> Result<Self, DatasetError> {
        let path = data_dir.join(format!("{STORAGE_KEY}.json"));

        let records = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| DatasetError::Io {
                path: path.clone(),
                source,
            })?;
            let records: Vec<ViolationRecord> =
                serde_json::from_str(&contents).map_err(|source| DatasetError::Json {
                    path: path.clone(),
                    source,
                })?;
            log::info!("Loaded {} violations from {}", records.len(), path.display());
            records
        } else {
            log::info!(
                "No violation store at {}, using bundled dataset",
                path.display()
            );
            bundled_violations()
        };

        check_unique_ids(&records)?;

        Ok(Self {
            path: Some(path),
            records,
            audit: Vec::new(),
        })
    }

    /// Wraps `records` in a store that is never written to disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::DuplicateId`] if two records share an id.
    pub fn in_memory(records: Vec<ViolationRecord>) -> Result<Self, DatasetError> {
        check_unique_ids(&records)?;
        Ok(Self {
            path: None,
            records,
            audit: Vec::new(),
        })
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All records, in storage order.
    #[must_use]
    pub fn records(&self) -> &[ViolationRecord] {
        &self.records
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&ViolationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Changes made since the store was opened, newest first.
    ///
    /// The trail is kept in memory only; it is not part of the store file.
    #[must_use]
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit
    }

    fn record_audit(&mut self, action: AuditAction, id: i64) {
        self.audit.insert(0, AuditEntry::now(action, id));
    }

    fn next_id(&self) -> i64 {
        self.records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Appends a new record, assigning the next free id.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidLocation`] if the coordinates are
    /// not finite or outside WGS84 bounds.
    pub fn insert(&mut self, new: NewViolation) -> Result<&ViolationRecord, DatasetError> {
        self.push_record(new, AuditAction::Added)
    }

    fn push_record(
        &mut self,
        new: NewViolation,
        action: AuditAction,
    ) -> Result<&ViolationRecord, DatasetError> {
        let record = ViolationRecord {
            id: self.next_id(),
            lat: new.lat,
            lng: new.lng,
            violation_type: new.violation_type,
            report_date: new.report_date,
            description: new.description,
            status: new.status,
        };
        if !record.has_valid_coordinates() {
            return Err(DatasetError::InvalidLocation(format!(
                "{}, {}",
                record.lat, record.lng
            )));
        }

        log::info!(
            "Adding violation {} ({})",
            record.id,
            record.violation_type
        );
        self.record_audit(action, record.id);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Records a public report as a new pending violation.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidLocation`] if the location string
    /// does not parse.
    pub fn submit_report(
        &mut self,
        report: ViolationReport,
    ) -> Result<&ViolationRecord, DatasetError> {
        let (lat, lng) = parse_location(&report.location)?;
        self.push_record(
            NewViolation {
                lat,
                lng,
                violation_type: report.violation_type,
                report_date: report
                    .report_date
                    .unwrap_or_else(|| Utc::now().date_naive()),
                description: report.description,
                status: ViolationStatus::Pending,
            },
            AuditAction::Reported,
        )
    }

    /// Replaces the record with the same id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::NotFound`] if no record has that id, or
    /// [`DatasetError::InvalidLocation`] if the new coordinates are invalid.
    pub fn update(&mut self, record: ViolationRecord) -> Result<(), DatasetError> {
        if !record.has_valid_coordinates() {
            return Err(DatasetError::InvalidLocation(format!(
                "{}, {}",
                record.lat, record.lng
            )));
        }
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(DatasetError::NotFound(record.id))?;

        let id = record.id;
        log::info!("Updating violation {id}");
        *slot = record;
        self.record_audit(AuditAction::Updated, id);
        Ok(())
    }

    /// Removes and returns the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::NotFound`] if no record has that id.
    pub fn remove(&mut self, id: i64) -> Result<ViolationRecord, DatasetError> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(DatasetError::NotFound(id))?;

        log::info!("Deleting violation {id}");
        let removed = self.records.remove(idx);
        self.record_audit(AuditAction::Deleted, id);
        Ok(removed)
    }

    /// Writes the collection to the backing file, if any.
    ///
    /// Writes to a temporary sibling first and renames it into place so a
    /// crash never leaves a truncated store.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Io`] if the directory or file cannot be
    /// written.
    pub fn save(&self) -> Result<(), DatasetError> {
        let Some(path) = &self.path else {
            log::debug!("In-memory violation store, nothing to save");
            return Ok(());
        };

        let io_err = |source| DatasetError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.records).map_err(|source| {
            DatasetError::Json {
                path: path.clone(),
                source,
            }
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        log::info!(
            "Saved {} violations to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }
}

fn check_unique_ids(records: &[ViolationRecord]) -> Result<(), DatasetError> {
    let mut seen = BTreeSet::new();
    for record in records {
        if !seen.insert(record.id) {
            return Err(DatasetError::DuplicateId(record.id));
        }
    }
    Ok(())
}
