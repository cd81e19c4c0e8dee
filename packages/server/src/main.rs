#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the violation map API server.
//!
//! Reads the optional config file named by `CPA_MAP_CONFIG`, then the
//! usual environment overrides.

use std::path::PathBuf;

use cpa_map_config::MapConfig;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config_path = std::env::var_os("CPA_MAP_CONFIG").map(PathBuf::from);
    let config = MapConfig::load(config_path.as_deref())?;

    cpa_map_server::run_server(config).await?;
    Ok(())
}
