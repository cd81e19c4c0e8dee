#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record filtering and free-text search.
//!
//! Every filter here is a pure function of `(collection, filter state)`:
//! the output is the ordered subsequence of the input for which all active
//! predicates hold. Nothing is reordered, cached or mutated, and a filter
//! with no active predicates hands back the full collection unchanged.

pub mod price;
pub mod violation;

pub use price::{CategoryFilter, PriceFilter, find_by_barcode};
pub use violation::{TypeFilter, ViolationFilter, ViolationSummary, distinct_types};

use chrono::NaiveDate;

/// Errors produced when parsing filter state from UI or query strings.
#[derive(Debug, thiserror::Error)]
pub enum FilterParseError {
    /// The violation type label matched no known type.
    #[error("Unknown violation type: {0}")]
    UnknownViolationType(String),

    /// The status was not `pending`, `verified` or `resolved`.
    #[error("Unknown violation status: {0}")]
    UnknownStatus(String),

    /// The price category was neither `all` nor a numeric id.
    #[error("Invalid price category: {0}")]
    InvalidCategory(String),

    /// A date bound was not `YYYY-MM-DD`.
    #[error("Invalid date '{value}': {source}")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// Underlying parse failure.
        source: chrono::ParseError,
    },
}

/// A filter over records of type `T`.
pub trait RecordFilter<T> {
    /// Whether `item` passes every active predicate.
    fn matches(&self, item: &T) -> bool;

    /// Whether any predicate is active. Inactive filters pass everything.
    fn is_active(&self) -> bool;

    /// Returns the ordered subsequence of `items` passing this filter.
    fn apply<'a>(&self, items: &'a [T]) -> Vec<&'a T> {
        if !self.is_active() {
            return items.iter().collect();
        }
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// How a searchable field is compared against the search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// Byte-exact substring match (Arabic text, product codes).
    Sensitive,
    /// Lowercased substring match (Latin text).
    Insensitive,
}

/// One string field exposed to free-text search.
#[derive(Debug, Clone, Copy)]
pub struct SearchField<'a> {
    /// Field contents.
    pub text: &'a str,
    /// Comparison mode.
    pub case: CaseSensitivity,
}

impl<'a> SearchField<'a> {
    /// A field compared byte-exactly.
    #[must_use]
    pub const fn sensitive(text: &'a str) -> Self {
        Self {
            text,
            case: CaseSensitivity::Sensitive,
        }
    }

    /// A field compared after lowercasing both sides.
    #[must_use]
    pub const fn insensitive(text: &'a str) -> Self {
        Self {
            text,
            case: CaseSensitivity::Insensitive,
        }
    }
}

/// Records that can be matched by [`TextQuery`].
pub trait Searchable {
    /// The fields a search term is matched against.
    fn search_fields(&self) -> Vec<SearchField<'_>>;
}

/// Substring search over a record's [`Searchable`] fields.
///
/// An empty term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextQuery {
    term: String,
    term_lower: String,
}

impl TextQuery {
    /// Creates a query for `term`. The term is used as typed.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        let term = term.into();
        let term_lower = term.to_lowercase();
        Self { term, term_lower }
    }

    /// The raw search term.
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Whether this query restricts anything.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.term.is_empty()
    }

    /// Whether any searchable field of `item` contains the term.
    #[must_use]
    pub fn matches<S: Searchable + ?Sized>(&self, item: &S) -> bool {
        if !self.is_active() {
            return true;
        }
        item.search_fields().iter().any(|field| match field.case {
            CaseSensitivity::Sensitive => field.text.contains(&self.term),
            CaseSensitivity::Insensitive => {
                field.text.to_lowercase().contains(&self.term_lower)
            }
        })
    }
}

/// Inclusive calendar date range. Unset bounds always pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest accepted date, inclusive.
    pub start: Option<NaiveDate>,
    /// Latest accepted date, inclusive.
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// A range bounded on both sides.
    #[must_use]
    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range covering exactly one day (the map's single date picker).
    #[must_use]
    pub const fn on(day: NaiveDate) -> Self {
        Self::between(day, day)
    }

    /// Parses optional `YYYY-MM-DD` bounds. Empty strings count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`FilterParseError::InvalidDate`] if a non-empty bound is
    /// not a valid date.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, FilterParseError> {
        Ok(Self {
            start: parse_date(start)?,
            end: parse_date(end)?,
        })
    }

    /// Whether either bound is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Whether `date` lies inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, FilterParseError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|source| FilterParseError::InvalidDate {
                value: s.to_string(),
                source,
            }),
    }
}
