//! Command implementations for the SUKL search tool.
//!
//! Handles:
//! - settings: defaults -> config file -> env -> CLI flags
//! - logging: JSON or pretty events on stderr
//! - catalogs: one shared transport behind the drug, pharmacy and
//!   document catalogs
//! - dispatch: run one command and render the payload

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sukl_search::{
    provider_from_settings, DocumentCatalog, DrugCatalog, DrugSearchParams, Lookup,
    PharmacyCatalog, PharmacySearchParams, SearchError, SearchTransport,
};
use sukl_types::{LogFormat, Settings};

use crate::cli::{Cli, Commands, DocumentCommands, DrugCommands, PharmacyCommands};

/// Exit status for rejected input.
pub const EXIT_INVALID_INPUT: u8 = 2;

/// Exit status for a lookup that found nothing.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Exit status for upstream and internal failures.
pub const EXIT_FAILURE: u8 = 1;

/// Result of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Payload(Value),
    NotFound { code: String },
}

/// The catalogs, sharing one transport and connection pool.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub drugs: DrugCatalog,
    pub pharmacies: PharmacyCatalog,
    pub documents: DocumentCatalog,
}

impl Catalogs {
    pub fn new(transport: Arc<SearchTransport>) -> Self {
        Self {
            drugs: DrugCatalog::new(transport.clone()),
            pharmacies: PharmacyCatalog::new(transport.clone()),
            documents: DocumentCatalog::new(transport),
        }
    }

    /// Build the transport and credential source from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = SearchTransport::http_client(settings.request_timeout())
            .context("Failed to build HTTP client")?;
        let tokens = provider_from_settings(client.clone(), &settings.auth)
            .context("Failed to set up credentials")?;
        let transport = SearchTransport::from_settings(client, settings, tokens)
            .context("Invalid search settings")?;
        Ok(Self::new(Arc::new(transport)))
    }
}

/// Load settings and apply the global CLI overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(endpoint) = &cli.endpoint {
        settings.search_endpoint = Some(endpoint.clone());
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    Ok(settings)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match settings.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish()),
    }
    .context("Failed to set tracing subscriber")
}

/// Run one command against the catalogs.
///
/// Failures are logged here with their internal detail; the returned error
/// is mapped to a generic message by [`user_message`].
pub async fn execute(catalogs: &Catalogs, command: Commands) -> Result<Output> {
    match command {
        Commands::Drugs(DrugCommands::Search(args)) => {
            let params = DrugSearchParams::from(args);
            let page = catalogs
                .drugs
                .search(&params)
                .await
                .inspect_err(|e| log_failure("drug_search_error", e))?;
            render(&page)
        }
        Commands::Drugs(DrugCommands::Get { code }) => {
            let lookup = catalogs
                .drugs
                .detail(&code)
                .await
                .inspect_err(|e| log_failure("drug_detail_error", e))?;
            render_lookup(lookup, code)
        }
        Commands::Pharmacies(PharmacyCommands::Search(args)) => {
            let params = PharmacySearchParams::from(args);
            let page = catalogs
                .pharmacies
                .search(&params)
                .await
                .inspect_err(|e| log_failure("pharmacy_search_error", e))?;
            render(&page)
        }
        Commands::Pharmacies(PharmacyCommands::Get { code }) => {
            let lookup = catalogs
                .pharmacies
                .detail(&code)
                .await
                .inspect_err(|e| log_failure("pharmacy_detail_error", e))?;
            render_lookup(lookup, code)
        }
        Commands::Documents(DocumentCommands::Search { query, max_results }) => {
            let page = catalogs
                .documents
                .search(&query, max_results)
                .await
                .inspect_err(|e| log_failure("document_search_error", e))?;
            render(&page)
        }
    }
}

/// Load settings, set up logging and catalogs, then run the parsed command.
pub async fn run(cli: Cli) -> Result<Output> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;

    info!(
        endpoint = settings.search_endpoint.as_deref().unwrap_or(""),
        api_version = %settings.api_version,
        "sukl_search_starting"
    );

    let catalogs = Catalogs::from_settings(&settings)?;
    execute(&catalogs, cli.command).await
}

/// Process exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SearchError>() {
        Some(SearchError::InvalidInput(_)) => EXIT_INVALID_INPUT,
        _ => EXIT_FAILURE,
    }
}

/// Message safe to show to the user. Upstream detail never appears here.
pub fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SearchError>() {
        Some(SearchError::InvalidInput(reason)) => format!("Invalid input: {}", reason),
        Some(SearchError::Upstream { .. }) => "Search service is unavailable".to_string(),
        Some(SearchError::Config(reason)) => format!("Invalid configuration: {}", reason),
        Some(_) => "Internal error".to_string(),
        // Local setup failures (configuration, logging) carry no upstream data.
        None => format!("{:#}", err),
    }
}

fn log_failure(event: &str, e: &SearchError) {
    match e {
        SearchError::InvalidInput(_) => {}
        _ => error!(
            status = e.status(),
            detail = e.detail().unwrap_or(""),
            error = %e,
            "{}",
            event
        ),
    }
}

fn render<T: Serialize>(payload: &T) -> Result<Output> {
    let value = serde_json::to_value(payload).context("Failed to render payload")?;
    Ok(Output::Payload(value))
}

fn render_lookup<T: Serialize>(lookup: Lookup<T>, code: String) -> Result<Output> {
    match lookup {
        Lookup::Found(record) => render(&record),
        Lookup::NotFound => Ok(Output::NotFound { code }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use secrecy::SecretString;
    use sukl_search::{RetryPolicy, StaticTokenProvider};

    fn offline_catalogs() -> Catalogs {
        // Nothing listens here; only validation paths may run.
        let tokens = Arc::new(StaticTokenProvider::new(SecretString::from("t".to_string())));
        let transport = SearchTransport::new(reqwest::Client::new(), "http://127.0.0.1:9", tokens)
            .with_policy(RetryPolicy::no_retry());
        Catalogs::new(Arc::new(transport))
    }

    #[test]
    fn test_exit_codes() {
        let invalid = anyhow::Error::new(SearchError::InvalidInput("x".to_string()));
        assert_eq!(exit_code(&invalid), EXIT_INVALID_INPUT);

        let upstream = anyhow::Error::new(SearchError::upstream(503, "secret detail"));
        assert_eq!(exit_code(&upstream), EXIT_FAILURE);

        let local = anyhow::anyhow!("Failed to load configuration");
        assert_eq!(exit_code(&local), EXIT_FAILURE);
    }

    #[test]
    fn test_user_message_hides_upstream_detail() {
        let upstream = anyhow::Error::new(SearchError::upstream(500, "stack trace from backend"));
        let message = user_message(&upstream);
        assert_eq!(message, "Search service is unavailable");
        assert!(!message.contains("stack trace"));

        let auth = anyhow::Error::new(SearchError::Auth("token endpoint said no".to_string()));
        assert_eq!(user_message(&auth), "Internal error");
    }

    #[test]
    fn test_user_message_through_context() {
        let err = anyhow::Error::new(SearchError::InvalidInput("query must not be empty".into()))
            .context("drugs search");
        assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
        assert_eq!(user_message(&err), "Invalid input: query must not be empty");
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_input_before_calling() {
        let catalogs = offline_catalogs();

        let cli = Cli::parse_from(["sukl-search", "documents", "search", "x"]);
        let err = execute(&catalogs, cli.command).await.unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);

        let cli = Cli::parse_from(["sukl-search", "pharmacies", "search", "--emergency", "false"]);
        let err = execute(&catalogs, cli.command).await.unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);

        let cli = Cli::parse_from(["sukl-search", "drugs", "get", "N02"]);
        let err = execute(&catalogs, cli.command).await.unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_render_lookup() {
        let found = render_lookup(Lookup::Found(serde_json::json!({"a": 1})), "1".into()).unwrap();
        assert_eq!(found, Output::Payload(serde_json::json!({"a": 1})));

        let missing = render_lookup::<Value>(Lookup::NotFound, "42".into()).unwrap();
        assert_eq!(missing, Output::NotFound { code: "42".into() });
    }

    #[test]
    fn test_endpoint_override() {
        let cli = Cli::parse_from([
            "sukl-search",
            "--endpoint",
            "http://localhost:7700",
            "--log-level",
            "warn",
            "drugs",
            "get",
            "1",
        ]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.endpoint().unwrap(), "http://localhost:7700");
        assert_eq!(settings.log_level, "warn");
    }
}
