//! Official price list storage.

use std::path::Path;

use cpa_map_price_models::{PriceCategory, PriceItem};
use serde::{Deserialize, Serialize};

use crate::{DatasetError, bundled_prices};

/// File name of the price list inside the data directory.
pub const PRICES_FILE: &str = "cpa_prices.json";

/// The price list with its categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCatalog {
    /// Category buttons, in display order.
    pub categories: Vec<PriceCategory>,
    /// Price list entries, in display order.
    pub items: Vec<PriceItem>,
}

impl PriceCatalog {
    /// Loads `cpa_prices.json` from `data_dir`, falling back to the bundled
    /// price list when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file exists but cannot be read or
    /// parsed.
    pub fn open(data_dir: &Path) -> Result<Self, DatasetError> {
        let path = data_dir.join(PRICES_FILE);
        if !path.exists() {
            log::info!(
                "No price list at {}, using bundled prices",
                path.display()
            );
            return Ok(bundled_prices());
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;
        let catalog: Self = serde_json::from_str(&contents)
            .map_err(|source| DatasetError::Json { path, source })?;
        log::info!("Loaded {} price items", catalog.items.len());
        Ok(catalog)
    }
}
