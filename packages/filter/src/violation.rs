//! Violation map filters: type selector, date range, status and search.

use std::str::FromStr;

use cpa_map_violation_models::{ViolationRecord, ViolationStatus, ViolationType};
use serde::Serialize;

use crate::{DateRange, FilterParseError, RecordFilter, SearchField, Searchable, TextQuery};

/// Violation type selector. `All` is the sentinel that always passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    /// No type restriction.
    #[default]
    All,
    /// Only records of exactly this type.
    Only(ViolationType),
}

impl TypeFilter {
    /// Whether `violation_type` passes.
    #[must_use]
    pub fn matches(self, violation_type: ViolationType) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => t == violation_type,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = FilterParseError;

    /// Accepts `all` or any display label / canonical name of a type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        ViolationType::from_label(s)
            .map(Self::Only)
            .ok_or_else(|| FilterParseError::UnknownViolationType(s.to_string()))
    }
}

impl Searchable for ViolationRecord {
    fn search_fields(&self) -> Vec<SearchField<'_>> {
        vec![
            SearchField::sensitive(&self.description.ar),
            SearchField::insensitive(&self.description.en),
            SearchField::sensitive(self.violation_type.label_ar()),
            SearchField::insensitive(self.violation_type.label_en()),
        ]
    }
}

/// Active filter state of the violations map and admin list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationFilter {
    /// Type selector.
    pub violation_type: TypeFilter,
    /// Inclusive report date range.
    pub date_range: DateRange,
    /// Review state restriction.
    pub status: Option<ViolationStatus>,
    /// Free-text search over descriptions and type labels.
    pub search: TextQuery,
}

impl RecordFilter<ViolationRecord> for ViolationFilter {
    fn matches(&self, record: &ViolationRecord) -> bool {
        self.violation_type.matches(record.violation_type)
            && self.date_range.contains(record.report_date)
            && self.status.is_none_or(|s| s == record.status)
            && self.search.matches(record)
    }

    fn is_active(&self) -> bool {
        self.violation_type != TypeFilter::All
            || self.date_range.is_active()
            || self.status.is_some()
            || self.search.is_active()
    }
}

/// Distinct violation types present in `records`, in first-seen order.
///
/// Feeds the map's type selector, which only offers types that occur.
#[must_use]
pub fn distinct_types<'a, I>(records: I) -> Vec<ViolationType>
where
    I: IntoIterator<Item = &'a ViolationRecord>,
{
    let mut types = Vec::new();
    for record in records {
        if !types.contains(&record.violation_type) {
            types.push(record.violation_type);
        }
    }
    types
}

/// Record counts per review state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSummary {
    /// All records counted.
    pub total: usize,
    /// Records awaiting review.
    pub pending: usize,
    /// Confirmed records.
    pub verified: usize,
    /// Corrected records.
    pub resolved: usize,
}

impl ViolationSummary {
    /// Counts `records` by status.
    #[must_use]
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ViolationRecord>,
    {
        records
            .into_iter()
            .fold(Self::default(), |mut summary, record| {
                summary.total += 1;
                match record.status {
                    ViolationStatus::Pending => summary.pending += 1,
                    ViolationStatus::Verified => summary.verified += 1,
                    ViolationStatus::Resolved => summary.resolved += 1,
                }
                summary
            })
    }

    /// Pending plus verified, i.e. not yet resolved.
    #[must_use]
    pub const fn active(&self) -> usize {
        self.pending + self.verified
    }
}
