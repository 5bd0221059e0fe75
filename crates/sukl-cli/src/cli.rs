//! CLI argument parsing for the SUKL search tool.
//!
//! Global flags override every other configuration source.

use clap::{Args, Parser, Subcommand};

use sukl_search::{documents, drugs, pharmacies};

/// SUKL registry search
///
/// Searches the Czech drug, pharmacy and SPC document indexes and prints
/// the normalized result as JSON.
#[derive(Parser, Debug)]
#[command(name = "sukl-search")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/sukl-search/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Search service endpoint (e.g. https://my-search.search.windows.net)
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Registered medicinal products
    #[command(subcommand)]
    Drugs(DrugCommands),

    /// Pharmacies and dispensaries
    #[command(subcommand)]
    Pharmacies(PharmacyCommands),

    /// SPC / PIL document chunks
    #[command(subcommand)]
    Documents(DocumentCommands),
}

#[derive(Subcommand, Debug, Clone)]
pub enum DrugCommands {
    /// Search drugs by name, substance or indication
    Search(DrugSearchArgs),

    /// Show one drug by SUKL code
    Get {
        /// SUKL code; shorter codes are zero-padded
        code: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DrugSearchArgs {
    /// Search text
    pub query: String,

    /// ATC code or prefix (e.g. N02BE01, N02)
    #[arg(long)]
    pub atc: Option<String>,

    /// Marketing authorization holder
    #[arg(long)]
    pub holder: Option<String>,

    /// prescription, otc, restricted, reserved or otc-restricted
    #[arg(long)]
    pub dispensing: Option<String>,

    /// Only doping (true) or non-doping (false) drugs
    #[arg(long)]
    pub doping: Option<bool>,

    /// Only drugs with (true) or without (false) active deliveries
    #[arg(long)]
    pub available: Option<bool>,

    /// Dosage form (e.g. tableta)
    #[arg(long)]
    pub form: Option<String>,

    #[arg(long, default_value_t = drugs::DEFAULT_MAX_RESULTS,
          value_parser = clap::value_parser!(u32).range(1..=50))]
    pub max_results: u32,
}

impl From<DrugSearchArgs> for drugs::DrugSearchParams {
    fn from(args: DrugSearchArgs) -> Self {
        Self {
            query: args.query,
            atc: args.atc,
            holder: args.holder,
            dispensing: args.dispensing,
            doping: args.doping,
            available: args.available,
            form: args.form,
            max_results: args.max_results,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum PharmacyCommands {
    /// Search pharmacies; at least one criterion is required
    Search(PharmacySearchArgs),

    /// Show one pharmacy by workplace code
    Get {
        /// Workplace code (kodPracoviste)
        code: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PharmacySearchArgs {
    /// Search text (name, address, pharmacist)
    pub query: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    /// On-call pharmacies only
    #[arg(long)]
    pub emergency: Option<bool>,

    /// Pharmacies with mail order
    #[arg(long)]
    pub mail_order: Option<bool>,

    /// pharmacy, hospital or outlet
    #[arg(long = "type")]
    pub pharmacy_type: Option<String>,

    #[arg(long)]
    pub postal_code: Option<String>,

    #[arg(long, default_value_t = pharmacies::DEFAULT_MAX_RESULTS,
          value_parser = clap::value_parser!(u32).range(1..=50))]
    pub max_results: u32,
}

impl From<PharmacySearchArgs> for pharmacies::PharmacySearchParams {
    fn from(args: PharmacySearchArgs) -> Self {
        Self {
            query: args.query,
            city: args.city,
            emergency: args.emergency,
            mail_order: args.mail_order,
            pharmacy_type: args.pharmacy_type,
            postal_code: args.postal_code,
            max_results: args.max_results,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum DocumentCommands {
    /// Hybrid search over SPC/PIL text
    Search {
        /// Question or phrase, at least 2 characters
        query: String,

        #[arg(long, default_value_t = documents::DEFAULT_MAX_RESULTS,
              value_parser = clap::value_parser!(u32).range(1..=10))]
        max_results: u32,
    },
}
