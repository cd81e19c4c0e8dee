#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Official price list types.
//!
//! Price items are published by the office as the reference against which
//! price manipulation reports are judged. They are searched by name or
//! product code and looked up by barcode from the scan flow.

use chrono::NaiveDate;
use cpa_map_violation_models::LocalizedText;
use serde::{Deserialize, Serialize};

/// A grouping of price list items (food, medicine, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCategory {
    /// Category identifier referenced by [`PriceItem::category_id`].
    pub id: i32,
    /// Category name in both languages.
    pub name: LocalizedText,
}

/// A single entry of the official price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceItem {
    /// Unique item identifier.
    pub id: i64,
    /// Short product code printed on the list (e.g. `F01`).
    pub code: String,
    /// EAN/UPC barcode, when the product carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Product name in both languages.
    pub name: LocalizedText,
    /// Official price in Yemeni rials.
    pub price: u64,
    /// Owning [`PriceCategory`].
    pub category_id: i32,
    /// Day the price was last confirmed.
    pub last_updated: NaiveDate,
}

impl PriceItem {
    /// Currency all list prices are quoted in.
    pub const CURRENCY: &'static str = "YER";

    /// Resolves this item's category from a category list.
    #[must_use]
    pub fn category<'a>(&self, categories: &'a [PriceCategory]) -> Option<&'a PriceCategory> {
        categories.iter().find(|c| c.id == self.category_id)
    }
}
