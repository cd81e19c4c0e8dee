//! Price guide filters: category buttons and product search.

use std::str::FromStr;

use cpa_map_price_models::PriceItem;

use crate::{FilterParseError, RecordFilter, SearchField, Searchable, TextQuery};

/// Price category selector. `All` is the sentinel that always passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// No category restriction.
    #[default]
    All,
    /// Only items in this category.
    Only(i32),
}

impl FromStr for CategoryFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse()
            .map(Self::Only)
            .map_err(|_| FilterParseError::InvalidCategory(s.to_string()))
    }
}

impl Searchable for PriceItem {
    fn search_fields(&self) -> Vec<SearchField<'_>> {
        vec![
            SearchField::sensitive(&self.name.ar),
            SearchField::insensitive(&self.name.en),
            SearchField::sensitive(&self.code),
        ]
    }
}

/// Active filter state of the price guide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceFilter {
    /// Category selector.
    pub category: CategoryFilter,
    /// Search over the Arabic name, English name and product code.
    pub search: TextQuery,
}

impl RecordFilter<PriceItem> for PriceFilter {
    fn matches(&self, item: &PriceItem) -> bool {
        let category_ok = match self.category {
            CategoryFilter::All => true,
            CategoryFilter::Only(id) => item.category_id == id,
        };
        category_ok && self.search.matches(item)
    }

    fn is_active(&self) -> bool {
        self.category != CategoryFilter::All || self.search.is_active()
    }
}

/// Finds the price list entry carrying exactly `barcode`.
#[must_use]
pub fn find_by_barcode<'a>(items: &'a [PriceItem], barcode: &str) -> Option<&'a PriceItem> {
    let barcode = barcode.trim();
    if barcode.is_empty() {
        return None;
    }
    items
        .iter()
        .find(|item| item.barcode.as_deref() == Some(barcode))
}
