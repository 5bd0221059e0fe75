//! # sukl-search
//!
//! Query translation and resilient transport between the SUKL domain
//! endpoints and the managed search backend.
//!
//! Pipeline: domain parameters -> [`FilterBuilder`] -> [`SearchTransport`]
//! (bearer token from a [`TokenProvider`], bounded retry) -> [`normalize`]
//! -> client payload.
//!
//! ## Modules
//! - `filter`: injection-safe filter expressions
//! - `query`: query body (keyword, semantic, hybrid)
//! - `auth`: bearer token sources
//! - `retry`: retry policy and backoff schedule
//! - `transport`: POST search / GET by key with retry
//! - `normalize`: response shaping and truncation
//! - `drugs`, `pharmacies`, `documents`: domain catalogs

pub mod auth;
pub mod documents;
pub mod drugs;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod pharmacies;
pub mod query;
pub mod retry;
pub mod transport;

pub use auth::{
    provider_from_settings, AccessToken, ManagedIdentityCredential, StaticTokenProvider,
    TokenProvider,
};
pub use documents::{DocumentCatalog, DocumentChunk};
pub use drugs::{DrugCatalog, DrugDetail, DrugSearchParams, DrugSummary};
pub use error::SearchError;
pub use filter::{FilterBuilder, FilterClause, Literal};
pub use normalize::{normalize, Answer, FromDocument, SearchPage, YesNo};
pub use pharmacies::{PharmacyCatalog, PharmacyDetail, PharmacySearchParams, PharmacySummary};
pub use query::{QueryType, SearchQuery};
pub use retry::{FixedSchedule, RetryPolicy};
pub use transport::{Lookup, SearchTransport};
