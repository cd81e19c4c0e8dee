#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool for the violation map.
//!
//! Runs the same filter and cluster pipeline as the API server against the
//! local data directory, prints the price list, and starts the server.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cpa_map_cluster::{ClusterThreshold, cluster_records, clusters_to_geojson};
use cpa_map_config::MapConfig;
use cpa_map_dataset::{PriceCatalog, ViolationStore};
use cpa_map_filter::{RecordFilter, ViolationFilter, distinct_types, find_by_barcode};
use cpa_map_price_models::PriceItem;
use cpa_map_server_models::{PriceQueryParams, ViolationFilterParams};
use cpa_map_violation_models::{Language, ViolationRecord};

#[derive(Parser)]
#[command(name = "cpa_map", about = "Consumer protection violation map tool")]
struct Cli {
    /// TOML config file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the record stores (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List violations passing the given filters
    Violations {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Display language for labels and descriptions
        #[arg(long, default_value = "ar", value_parser = parse_language)]
        lang: Language,
    },
    /// Filter violations, then group them by proximity
    Clusters {
        #[command(flatten)]
        filter: FilterArgs,
        /// Merge distance in degrees (overrides config)
        #[arg(long)]
        threshold: Option<f64>,
        /// Print a `GeoJSON` `FeatureCollection`
        #[arg(long)]
        geojson: bool,
    },
    /// List the violation types present in the data
    Types {
        /// Display language for labels
        #[arg(long, default_value = "ar", value_parser = parse_language)]
        lang: Language,
    },
    /// Print the official price list
    Prices {
        /// `all` or a category id
        #[arg(long)]
        category: Option<String>,
        /// Search names and product codes
        #[arg(long, short)]
        query: Option<String>,
        /// Display language for names
        #[arg(long, default_value = "ar", value_parser = parse_language)]
        lang: Language,
    },
    /// Look up a price list entry by barcode
    Barcode {
        /// Scanned barcode
        code: String,
        /// Display language for the name
        #[arg(long, default_value = "ar", value_parser = parse_language)]
        lang: Language,
    },
    /// Start the API server
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        bind_addr: Option<String>,
        /// Listen port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Violation filter flags shared by `violations` and `clusters`.
#[derive(Args, Default)]
struct FilterArgs {
    /// `all` or a violation type (canonical name, Arabic or English label)
    #[arg(long = "type")]
    violation_type: Option<String>,
    /// Earliest report date, inclusive (`YYYY-MM-DD`)
    #[arg(long)]
    from: Option<String>,
    /// Latest report date, inclusive (`YYYY-MM-DD`)
    #[arg(long)]
    to: Option<String>,
    /// Single report date (`YYYY-MM-DD`); overrides --from/--to
    #[arg(long)]
    date: Option<String>,
    /// `pending`, `verified` or `resolved`
    #[arg(long)]
    status: Option<String>,
    /// Search descriptions and type labels
    #[arg(long, short)]
    query: Option<String>,
}

fn parse_language(s: &str) -> Result<Language, String> {
    s.parse()
        .map_err(|_| format!("unknown language '{s}' (expected ar or en)"))
}

impl FilterArgs {
    fn to_filter(&self) -> Result<ViolationFilter, cpa_map_filter::FilterParseError> {
        ViolationFilterParams {
            violation_type: self.violation_type.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            date: self.date.clone(),
            status: self.status.clone(),
            q: self.query.clone(),
        }
        .to_filter()
    }
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = MapConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Violations { filter, json, lang } => {
            let store = ViolationStore::open(&config.data_dir)?;
            let filtered = filter.to_filter()?.apply(store.records());
            if json {
                println!("{}", serde_json::to_string_pretty(&filtered)?);
            } else {
                print_violations(&filtered, lang);
            }
        }
        Commands::Clusters {
            filter,
            threshold,
            geojson,
        } => {
            let threshold = match threshold {
                Some(degrees) => ClusterThreshold::new(degrees)?,
                None => config.cluster_threshold,
            };
            let store = ViolationStore::open(&config.data_dir)?;
            let filtered = filter.to_filter()?.apply(store.records());
            let clusters = cluster_records(&filtered, threshold);

            if geojson {
                let collection = clusters_to_geojson(&clusters);
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                println!("{:<14} {:>5} {:>10} {:>10}  MEMBERS", "CLUSTER", "COUNT", "LAT", "LNG");
                println!("{}", "-".repeat(60));
                for cluster in &clusters {
                    let members: Vec<String> =
                        cluster.member_ids().iter().map(ToString::to_string).collect();
                    println!(
                        "{:<14} {:>5} {:>10.5} {:>10.5}  {}",
                        cluster.id,
                        cluster.count,
                        cluster.lat,
                        cluster.lng,
                        members.join(",")
                    );
                }
                println!();
                println!(
                    "{} records in {} clusters (threshold {} degrees)",
                    filtered.len(),
                    clusters.len(),
                    threshold.degrees()
                );
            }
        }
        Commands::Types { lang } => {
            let store = ViolationStore::open(&config.data_dir)?;
            println!("{:<20} {:<8} LABEL", "TYPE", "COLOR");
            println!("{}", "-".repeat(50));
            for violation_type in distinct_types(store.records()) {
                println!(
                    "{:<20} {:<8} {}",
                    violation_type.to_string(),
                    violation_type.marker_color(),
                    violation_type.label(lang)
                );
            }
        }
        Commands::Prices {
            category,
            query,
            lang,
        } => {
            let catalog = PriceCatalog::open(&config.data_dir)?;
            let filter = PriceQueryParams { category, q: query }.to_filter()?;
            let items = filter.apply(&catalog.items);
            println!("{:<6} {:>10}  NAME", "CODE", "PRICE");
            println!("{}", "-".repeat(50));
            for item in items {
                print_price(item, lang);
            }
        }
        Commands::Barcode { code, lang } => {
            let catalog = PriceCatalog::open(&config.data_dir)?;
            let item = find_by_barcode(&catalog.items, &code)
                .ok_or_else(|| format!("No price list entry for barcode {code}"))?;
            print_price(item, lang);
        }
        Commands::Serve { bind_addr, port } => {
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }
            actix_web::rt::System::new().block_on(cpa_map_server::run_server(config))?;
        }
    }

    Ok(())
}

fn print_violations(records: &[&ViolationRecord], lang: Language) {
    println!(
        "{:<4} {:<10} {:<9} {:<20} {:>9} {:>9}  DESCRIPTION",
        "ID", "DATE", "STATUS", "TYPE", "LAT", "LNG"
    );
    println!("{}", "-".repeat(90));
    for record in records {
        println!(
            "{:<4} {:<10} {:<9} {:<20} {:>9.4} {:>9.4}  {}",
            record.id,
            record.report_date,
            record.status.label(lang),
            record.violation_type.label(lang),
            record.lat,
            record.lng,
            record.description.get(lang)
        );
    }
    log::info!("{} violations", records.len());
}

fn print_price(item: &PriceItem, lang: Language) {
    println!(
        "{:<6} {:>6} {}  {}",
        item.code,
        item.price,
        PriceItem::CURRENCY,
        item.name.get(lang)
    );
}

#[cfg(test)]
mod tests {
    use cpa_map_filter::TypeFilter;
    use cpa_map_violation_models::{ViolationStatus, ViolationType};

    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cpa_map",
            "violations",
            "--data-dir",
            "/tmp/cpa",
            "--type",
            "MONOPOLY",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/cpa")));
        let Commands::Violations { filter, json, lang } = cli.command else {
            panic!("expected violations subcommand");
        };
        assert!(json);
        assert_eq!(lang, Language::Ar);
        assert_eq!(
            filter.to_filter().unwrap().violation_type,
            TypeFilter::Only(ViolationType::Monopoly)
        );
    }

    #[test]
    fn filter_args_convert_status_and_search() {
        let args = FilterArgs {
            status: Some("pending".to_string()),
            query: Some("flour".to_string()),
            ..FilterArgs::default()
        };
        let filter = args.to_filter().unwrap();
        assert_eq!(filter.status, Some(ViolationStatus::Pending));
        assert_eq!(filter.search.term(), "flour");
    }

    #[test]
    fn clusters_accepts_threshold_and_geojson() {
        let cli = Cli::try_parse_from(["cpa_map", "clusters", "--threshold", "0.01", "--geojson"])
            .unwrap();
        let Commands::Clusters {
            threshold, geojson, ..
        } = cli.command
        else {
            panic!("expected clusters subcommand");
        };
        assert_eq!(threshold, Some(0.01));
        assert!(geojson);
    }

    #[test]
    fn rejects_unknown_language() {
        assert!(Cli::try_parse_from(["cpa_map", "types", "--lang", "fr"]).is_err());
    }

    #[test]
    fn parses_language_flag() {
        let cli = Cli::try_parse_from(["cpa_map", "barcode", "89011234", "--lang", "en"]).unwrap();
        let Commands::Barcode { code, lang } = cli.command else {
            panic!("expected barcode subcommand");
        };
        assert_eq!(code, "89011234");
        assert_eq!(lang, Language::En);

        let cli = Cli::try_parse_from(["cpa_map", "types", "--lang", "EN"]).unwrap();
        let Commands::Types { lang } = cli.command else {
            panic!("expected types subcommand");
        };
        assert_eq!(lang, Language::En);
    }
}
