//! Pharmacy catalog over the `sukl-pharmacies` index.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::SearchError;
use crate::filter::FilterBuilder;
use crate::normalize::{normalize, passthrough, text, truthy, FromDocument, SearchPage, YesNo};
use crate::query::{QueryType, SearchQuery};
use crate::transport::{Lookup, SearchTransport};

pub const INDEX: &str = "sukl-pharmacies";
pub const SEMANTIC_CONFIG: &str = "sukl-pharmacies-semantic";

pub const MAX_RESULTS: RangeInclusive<u32> = 1..=50;
pub const DEFAULT_MAX_RESULTS: u32 = 10;

pub const SEARCH_FIELDS: &[&str] = &[
    "kodPracoviste",
    "nazev",
    "adresa",
    "mesto",
    "psc",
    "telefon",
    "typLekarnyNazev",
    "pohotovost",
    "zasilkovyProdej",
    "lekarnik",
];

pub const DETAIL_FIELDS: &[&str] = &[
    "kodPracoviste",
    "kodLekarny",
    "icz",
    "ico",
    "nazev",
    "ulice",
    "mesto",
    "psc",
    "adresa",
    "lekarnik",
    "www",
    "email",
    "telefon",
    "typLekarnyNazev",
    "zasilkovyProdej",
    "pohotovost",
    "pracovniDoba",
    "popisek",
];

/// Pharmacy type name -> SUKL code.
pub const PHARMACY_TYPES: &[(&str, &str)] = &[
    ("pharmacy", "Z"),
    ("hospital", "NO"),
    ("outlet", "V"),
];

/// Domain parameters of a pharmacy search.
#[derive(Debug, Clone)]
pub struct PharmacySearchParams {
    /// Free text over name, address, pharmacist
    pub query: Option<String>,
    pub city: Option<String>,
    /// On-call pharmacies
    pub emergency: Option<bool>,
    pub mail_order: Option<bool>,
    /// One of the [`PHARMACY_TYPES`] names
    pub pharmacy_type: Option<String>,
    pub postal_code: Option<String>,
    pub max_results: u32,
}

impl Default for PharmacySearchParams {
    fn default() -> Self {
        Self {
            query: None,
            city: None,
            emergency: None,
            mail_order: None,
            pharmacy_type: None,
            postal_code: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

fn given(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl PharmacySearchParams {
    /// At least one criterion narrows the search. A `false` flag does not
    /// count on its own.
    pub fn has_criteria(&self) -> bool {
        given(&self.query)
            || given(&self.city)
            || self.emergency == Some(true)
            || self.mail_order == Some(true)
            || given(&self.pharmacy_type)
            || given(&self.postal_code)
    }

    pub fn filter(&self) -> Option<String> {
        FilterBuilder::new()
            .equals("mesto", self.city.as_deref())
            .flag("pohotovost", self.emergency)
            .flag("zasilkovyProdej", self.mail_order)
            .category("typLekarny", self.pharmacy_type.as_deref(), PHARMACY_TYPES)
            .equals("psc", self.postal_code.as_deref().map(str::trim))
            .build()
    }

    /// Free text when given, otherwise match-all in simple mode.
    fn search_text(&self) -> (&str, QueryType) {
        match self.query.as_deref().filter(|q| !q.is_empty()) {
            Some(q) => (q, QueryType::Semantic),
            None => ("*", QueryType::Simple),
        }
    }
}

/// Pharmacy as listed in search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacySummary {
    pub kod_pracoviste: String,
    pub nazev: String,
    pub adresa: String,
    pub mesto: String,
    pub psc: String,
    pub telefon: String,
    pub typ: String,
    pub pohotovost: YesNo,
    pub zasilkovy_prodej: YesNo,
    pub lekarnik: String,
}

impl FromDocument for PharmacySummary {
    fn from_document(doc: &Value) -> Self {
        Self {
            kod_pracoviste: text(doc, "kodPracoviste"),
            nazev: text(doc, "nazev"),
            adresa: text(doc, "adresa"),
            mesto: text(doc, "mesto"),
            psc: text(doc, "psc"),
            telefon: text(doc, "telefon"),
            typ: text(doc, "typLekarnyNazev"),
            pohotovost: truthy(doc, "pohotovost").into(),
            zasilkovy_prodej: truthy(doc, "zasilkovyProdej").into(),
            lekarnik: text(doc, "lekarnik"),
        }
    }
}

/// Full pharmacy detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyDetail {
    pub kod_pracoviste: String,
    pub kod_lekarny: String,
    pub icz: String,
    pub ico: String,
    pub nazev: String,
    pub ulice: String,
    pub mesto: String,
    pub psc: String,
    pub adresa: String,
    pub lekarnik: String,
    pub www: String,
    pub email: String,
    pub telefon: String,
    pub typ: String,
    pub pohotovost: YesNo,
    pub zasilkovy_prodej: YesNo,
    /// Opening hours, free-form as stored in the index
    pub pracovni_doba: Value,
}

impl FromDocument for PharmacyDetail {
    fn from_document(doc: &Value) -> Self {
        Self {
            kod_pracoviste: text(doc, "kodPracoviste"),
            kod_lekarny: text(doc, "kodLekarny"),
            icz: text(doc, "icz"),
            ico: text(doc, "ico"),
            nazev: text(doc, "nazev"),
            ulice: text(doc, "ulice"),
            mesto: text(doc, "mesto"),
            psc: text(doc, "psc"),
            adresa: text(doc, "adresa"),
            lekarnik: text(doc, "lekarnik"),
            www: text(doc, "www"),
            email: text(doc, "email"),
            telefon: text(doc, "telefon"),
            typ: text(doc, "typLekarnyNazev"),
            pohotovost: truthy(doc, "pohotovost").into(),
            zasilkovy_prodej: truthy(doc, "zasilkovyProdej").into(),
            pracovni_doba: passthrough(doc, "pracovniDoba"),
        }
    }
}

/// Workplace codes are numeric and used as-is after trimming.
pub fn normalize_code(code: &str) -> Result<String, SearchError> {
    let key = code.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_digit()) {
        return Err(SearchError::InvalidInput(
            "workplace code must be numeric".to_string(),
        ));
    }
    Ok(key.to_string())
}

#[derive(Debug, Clone)]
pub struct PharmacyCatalog {
    transport: Arc<SearchTransport>,
}

impl PharmacyCatalog {
    pub fn new(transport: Arc<SearchTransport>) -> Self {
        Self { transport }
    }

    pub async fn search(
        &self,
        params: &PharmacySearchParams,
    ) -> Result<SearchPage<PharmacySummary>, SearchError> {
        if !params.has_criteria() {
            return Err(SearchError::InvalidInput(
                "at least one of query, city, emergency, mail_order, type or postal_code is required"
                    .to_string(),
            ));
        }
        if !MAX_RESULTS.contains(&params.max_results) {
            return Err(SearchError::InvalidInput(format!(
                "max_results must be within {:?}",
                MAX_RESULTS
            )));
        }

        let (text, query_type) = params.search_text();
        let query = SearchQuery::new(text)
            .with_query_type(query_type)
            .with_filter(params.filter())
            .with_select(SEARCH_FIELDS)
            .with_top(params.max_results)
            .with_semantic_configuration(SEMANTIC_CONFIG);

        let raw = self.transport.search(INDEX, &query).await?;
        Ok(normalize(&raw))
    }

    pub async fn detail(&self, code: &str) -> Result<Lookup<PharmacyDetail>, SearchError> {
        let key = normalize_code(code)?;
        let lookup = self
            .transport
            .get_document(INDEX, &key, DETAIL_FIELDS)
            .await?;
        Ok(lookup.map(|doc| PharmacyDetail::from_document(&doc)))
    }
}
