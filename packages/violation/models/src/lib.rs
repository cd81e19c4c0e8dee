#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Violation record types, taxonomy and status definitions.
//!
//! This crate defines the market violation records reported to the
//! consumer protection office, the logical violation type taxonomy that the
//! bilingual display labels collapse onto, and the [`Located`] trait shared
//! by everything that can be placed on the violations map.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Display language for bilingual labels.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    /// Arabic (the site default).
    #[default]
    Ar,
    /// English.
    En,
}

/// A string carried in both site languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalizedText {
    /// Arabic text.
    pub ar: String,
    /// English text.
    pub en: String,
}

impl LocalizedText {
    /// Creates a new bilingual string.
    #[must_use]
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ar: ar.into(),
            en: en.into(),
        }
    }

    /// Returns the text for the given language.
    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Ar => &self.ar,
            Language::En => &self.en,
        }
    }
}

/// Logical violation category.
///
/// Reports arrive with Arabic and English display labels; both collapse
/// onto exactly one variant per record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Selling above the official price list
    PriceManipulation,
    /// Adulterated, mislabeled or underweight goods
    CommercialFraud,
    /// Hoarding or cornering supply of a commodity
    Monopoly,
    /// Anything not fitting the categories above
    Other,
}

impl ViolationType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PriceManipulation,
            Self::CommercialFraud,
            Self::Monopoly,
            Self::Other,
        ]
    }

    /// Arabic display label.
    #[must_use]
    pub const fn label_ar(self) -> &'static str {
        match self {
            Self::PriceManipulation => "تلاعب بالأسعار",
            Self::CommercialFraud => "غش تجاري",
            Self::Monopoly => "احتكار",
            Self::Other => "مخالفة أخرى",
        }
    }

    /// English display label.
    #[must_use]
    pub const fn label_en(self) -> &'static str {
        match self {
            Self::PriceManipulation => "Price Manipulation",
            Self::CommercialFraud => "Commercial Fraud",
            Self::Monopoly => "Monopoly",
            Self::Other => "Other Violation",
        }
    }

    /// Display label in the requested language.
    #[must_use]
    pub const fn label(self, language: Language) -> &'static str {
        match language {
            Language::Ar => self.label_ar(),
            Language::En => self.label_en(),
        }
    }

    /// Marker color used for individual (unclustered) map pins.
    #[must_use]
    pub const fn marker_color(self) -> &'static str {
        match self {
            Self::PriceManipulation => "red",
            Self::CommercialFraud => "orange",
            Self::Monopoly | Self::Other => "blue",
        }
    }

    /// Resolves a display label or canonical name to its logical type.
    ///
    /// Accepts the canonical `SCREAMING_SNAKE_CASE` name, the exact Arabic
    /// label, or the English label (case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Ok(t) = label.parse::<Self>() {
            return Some(t);
        }
        Self::all()
            .iter()
            .copied()
            .find(|t| t.label_ar() == label || t.label_en().eq_ignore_ascii_case(label))
    }
}

/// Review state of a reported violation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ViolationStatus {
    /// Submitted and awaiting review.
    #[default]
    Pending,
    /// Confirmed by an inspector.
    Verified,
    /// Confirmed and corrected.
    Resolved,
}

impl ViolationStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::Verified, Self::Resolved]
    }

    /// Display label in the requested language.
    #[must_use]
    pub const fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Pending, Language::Ar) => "قيد المراجعة",
            (Self::Pending, Language::En) => "Under Review",
            (Self::Verified, Language::Ar) => "مؤكد",
            (Self::Verified, Language::En) => "Verified",
            (Self::Resolved, Language::Ar) => "تم الحل",
            (Self::Resolved, Language::En) => "Resolved",
        }
    }
}

/// A reported market violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    /// Unique identifier within a collection.
    pub id: i64,
    /// Latitude (decimal degrees).
    pub lat: f64,
    /// Longitude (decimal degrees).
    pub lng: f64,
    /// Logical violation category.
    pub violation_type: ViolationType,
    /// Day the violation was observed.
    pub report_date: NaiveDate,
    /// Free-text description in both languages.
    pub description: LocalizedText,
    /// Review state.
    pub status: ViolationStatus,
}

/// Something with an identity and a map position.
///
/// The proximity clusterer is generic over this trait so it can group
/// owned records as well as borrowed, already-filtered views.
pub trait Located {
    /// Identifier of the underlying record.
    fn id(&self) -> i64;

    /// Latitude in decimal degrees.
    fn lat(&self) -> f64;

    /// Longitude in decimal degrees.
    fn lng(&self) -> f64;

    /// Whether the coordinates are finite and inside WGS84 bounds.
    fn has_valid_coordinates(&self) -> bool {
        let (lat, lng) = (self.lat(), self.lng());
        lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
    }
}

impl Located for ViolationRecord {
    fn id(&self) -> i64 {
        self.id
    }

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lng(&self) -> f64 {
        self.lng
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn lat(&self) -> f64 {
        (**self).lat()
    }

    fn lng(&self) -> f64 {
        (**self).lng()
    }
}
