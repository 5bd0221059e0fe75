//! Drug catalog: search and detail over the `sukl-drugs` index.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::SearchError;
use crate::filter::FilterBuilder;
use crate::normalize::{
    flag, normalize, sentinel, text, truncate, FromDocument, SearchPage, YesNo,
    COMPOSITION_LIMIT, COMPOSITION_MARKER,
};
use crate::query::SearchQuery;
use crate::transport::{Lookup, SearchTransport};

pub const INDEX: &str = "sukl-drugs";
pub const SEMANTIC_CONFIG: &str = "sukl-drugs-semantic";

/// Allowed page sizes for drug search.
pub const MAX_RESULTS: RangeInclusive<u32> = 1..=50;

/// Page size when the caller does not choose one.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Width of a SUKL code; shorter codes are zero-padded.
pub const CODE_LEN: usize = 7;

/// Public detail page of a registered drug.
pub const DETAIL_URL_BASE: &str = "https://prehledy.sukl.cz/prehled_leciv.html#/leciva/";

/// Fields returned in search results (compact).
pub const SEARCH_FIELDS: &[&str] = &[
    "kodSukl",
    "nazev",
    "sila",
    "formaNazev",
    "cestaNazev",
    "drzitelNazev",
    "atc",
    "atcNazev",
    "ucinneLatky",
    "vydejNazev",
    "indikacniSkupinaNazev",
    "dodavky",
    "doping",
];

/// Fields returned for the detail view.
pub const DETAIL_FIELDS: &[&str] = &[
    "kodSukl",
    "nazev",
    "doplnekNazvu",
    "sila",
    "formaNazev",
    "baleni",
    "cestaNazev",
    "obalNazev",
    "drzitelNazev",
    "drzitelZeme",
    "regCislo",
    "stavRegistraceNazev",
    "atc",
    "atcNazev",
    "ucinneLatky",
    "vydejNazev",
    "dodavky",
    "indikacniSkupinaNazev",
    "doping",
    "ean",
    "datumRegistrace",
    "platnostDo",
    "spcSoubor",
    "pilSoubor",
    "slozeni",
    "synonyma",
    "popisek",
];

/// Dispensing mode name -> SUKL code.
pub const DISPENSING_MODES: &[(&str, &str)] = &[
    // na lékařský předpis
    ("prescription", "R"),
    // volně prodejné
    ("otc", "F"),
    // s omezením (§ 39)
    ("restricted", "L"),
    // vyhrazená léčiva
    ("reserved", "V"),
    // bez předpisu s omezením
    ("otc-restricted", "P"),
];

/// Domain parameters of a drug search.
#[derive(Debug, Clone)]
pub struct DrugSearchParams {
    /// Drug name, active substance, indication, ...
    pub query: String,
    /// ATC code or prefix (e.g. `N02BE01`, `N02`)
    pub atc: Option<String>,
    /// Marketing authorization holder
    pub holder: Option<String>,
    /// One of the [`DISPENSING_MODES`] names
    pub dispensing: Option<String>,
    pub doping: Option<bool>,
    /// Drugs with (or without) active deliveries
    pub available: Option<bool>,
    /// Dosage form (e.g. tableta, injekce)
    pub form: Option<String>,
    pub max_results: u32,
}

impl DrugSearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            atc: None,
            holder: None,
            dispensing: None,
            doping: None,
            available: None,
            form: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Filter expression for these parameters.
    pub fn filter(&self) -> Option<String> {
        FilterBuilder::new()
            .classification_code("atc", self.atc.as_deref())
            .matches("drzitelNazev", self.holder.as_deref())
            .category("vydej", self.dispensing.as_deref(), DISPENSING_MODES)
            .flag("doping", self.doping)
            .sentinel_flag("dodavky", self.available)
            .matches("formaNazev", self.form.as_deref())
            .build()
    }
}

/// Drug as listed in search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugSummary {
    pub kod_sukl: String,
    pub nazev: String,
    pub sila: String,
    pub forma: String,
    pub cesta: String,
    pub drzitel: String,
    pub atc: String,
    pub atc_nazev: String,
    pub ucinne_latky: String,
    pub vydej: String,
    pub indikace: String,
    pub dodavky: YesNo,
    pub doping: bool,
}

impl FromDocument for DrugSummary {
    fn from_document(doc: &Value) -> Self {
        Self {
            kod_sukl: text(doc, "kodSukl"),
            nazev: text(doc, "nazev"),
            sila: text(doc, "sila"),
            forma: text(doc, "formaNazev"),
            cesta: text(doc, "cestaNazev"),
            drzitel: text(doc, "drzitelNazev"),
            atc: text(doc, "atc"),
            atc_nazev: text(doc, "atcNazev"),
            ucinne_latky: text(doc, "ucinneLatky"),
            vydej: text(doc, "vydejNazev"),
            indikace: text(doc, "indikacniSkupinaNazev"),
            dodavky: sentinel(doc, "dodavky"),
            doping: flag(doc, "doping"),
        }
    }
}

/// Full drug detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDetail {
    pub kod_sukl: String,
    pub nazev: String,
    pub doplnek_nazvu: String,
    pub sila: String,
    pub forma: String,
    pub baleni: String,
    pub cesta: String,
    pub obal: String,
    pub drzitel: String,
    pub drzitel_zeme: String,
    pub reg_cislo: String,
    pub stav_registrace: String,
    pub atc: String,
    pub atc_nazev: String,
    pub ucinne_latky: String,
    pub vydej: String,
    pub dodavky: YesNo,
    pub indikace: String,
    pub doping: bool,
    pub ean: String,
    pub datum_registrace: String,
    pub platnost_do: String,
    pub sukl_url: Option<String>,
    pub slozeni: String,
    pub synonyma: String,
}

impl FromDocument for DrugDetail {
    fn from_document(doc: &Value) -> Self {
        let kod_sukl = text(doc, "kodSukl");
        Self {
            sukl_url: detail_url(&kod_sukl),
            nazev: text(doc, "nazev"),
            doplnek_nazvu: text(doc, "doplnekNazvu"),
            sila: text(doc, "sila"),
            forma: text(doc, "formaNazev"),
            baleni: text(doc, "baleni"),
            cesta: text(doc, "cestaNazev"),
            obal: text(doc, "obalNazev"),
            drzitel: text(doc, "drzitelNazev"),
            drzitel_zeme: text(doc, "drzitelZeme"),
            reg_cislo: text(doc, "regCislo"),
            stav_registrace: text(doc, "stavRegistraceNazev"),
            atc: text(doc, "atc"),
            atc_nazev: text(doc, "atcNazev"),
            ucinne_latky: text(doc, "ucinneLatky"),
            vydej: text(doc, "vydejNazev"),
            dodavky: sentinel(doc, "dodavky"),
            indikace: text(doc, "indikacniSkupinaNazev"),
            doping: flag(doc, "doping"),
            ean: text(doc, "ean"),
            datum_registrace: text(doc, "datumRegistrace"),
            platnost_do: text(doc, "platnostDo"),
            slozeni: truncate(&text(doc, "slozeni"), COMPOSITION_LIMIT, COMPOSITION_MARKER),
            synonyma: text(doc, "synonyma"),
            kod_sukl,
        }
    }
}

/// Link to the public detail page, if the code is known.
pub fn detail_url(kod_sukl: &str) -> Option<String> {
    (!kod_sukl.is_empty()).then(|| format!("{}{}", DETAIL_URL_BASE, kod_sukl))
}

/// Trim and zero-pad a SUKL code to [`CODE_LEN`] digits.
pub fn normalize_code(code: &str) -> Result<String, SearchError> {
    let code = code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(SearchError::InvalidInput(
            "SUKL code must be numeric".to_string(),
        ));
    }
    Ok(format!("{:0>width$}", code, width = CODE_LEN))
}

/// Drug search and detail over a shared transport.
#[derive(Debug, Clone)]
pub struct DrugCatalog {
    transport: Arc<SearchTransport>,
}

impl DrugCatalog {
    pub fn new(transport: Arc<SearchTransport>) -> Self {
        Self { transport }
    }

    pub async fn search(
        &self,
        params: &DrugSearchParams,
    ) -> Result<SearchPage<DrugSummary>, SearchError> {
        if params.query.is_empty() {
            return Err(SearchError::InvalidInput("query must not be empty".to_string()));
        }
        if !MAX_RESULTS.contains(&params.max_results) {
            return Err(SearchError::InvalidInput(format!(
                "max_results must be within {:?}",
                MAX_RESULTS
            )));
        }

        let query = SearchQuery::new(params.query.as_str())
            .with_filter(params.filter())
            .with_select(SEARCH_FIELDS)
            .with_top(params.max_results)
            .with_semantic_configuration(SEMANTIC_CONFIG);

        let raw = self.transport.search(INDEX, &query).await?;
        Ok(normalize(&raw))
    }

    pub async fn detail(&self, code: &str) -> Result<Lookup<DrugDetail>, SearchError> {
        let key = normalize_code(code)?;
        let lookup = self
            .transport
            .get_document(INDEX, &key, DETAIL_FIELDS)
            .await?;
        Ok(lookup.map(|doc| DrugDetail::from_document(&doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_all_parameters() {
        let params = DrugSearchParams {
            atc: Some("n02be".to_string()),
            holder: Some("Zentiva".to_string()),
            dispensing: Some("otc".to_string()),
            doping: Some(false),
            available: Some(true),
            form: Some("tableta".to_string()),
            ..DrugSearchParams::new("paracetamol")
        };

        assert_eq!(
            params.filter().as_deref(),
            Some(
                "search.ismatch('N02BE*', 'atc') \
                 and search.ismatch('Zentiva', 'drzitelNazev') \
                 and vydej eq 'F' \
                 and doping eq false \
                 and dodavky eq '1' \
                 and search.ismatch('tableta', 'formaNazev')"
            )
        );
    }

    #[test]
    fn test_filter_none() {
        assert_eq!(DrugSearchParams::new("ibalgin").filter(), None);
    }

    #[test]
    fn test_filter_drops_bad_values() {
        let params = DrugSearchParams {
            atc: Some("N02$".to_string()),
            dispensing: Some("black-market".to_string()),
            holder: Some("O'Brien".to_string()),
            ..DrugSearchParams::new("x")
        };
        assert_eq!(
            params.filter().as_deref(),
            Some("search.ismatch('O''Brien', 'drzitelNazev')")
        );
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("12345").unwrap(), "0012345");
        assert_eq!(normalize_code(" 0012345 ").unwrap(), "0012345");
        assert_eq!(normalize_code("123456789").unwrap(), "123456789");
        assert!(normalize_code("  ").is_err());
        assert!(matches!(
            normalize_code("12a45"),
            Err(SearchError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_summary_mapping() {
        let doc = json!({
            "kodSukl": "0012345",
            "nazev": "PARALEN",
            "formaNazev": "Tableta",
            "drzitelNazev": "Opella",
            "indikacniSkupinaNazev": "Analgetika",
            "vydejNazev": "volně prodejné",
            "dodavky": "1",
            "doping": true,
        });
        let summary = DrugSummary::from_document(&doc);
        assert_eq!(summary.kod_sukl, "0012345");
        assert_eq!(summary.forma, "Tableta");
        assert_eq!(summary.drzitel, "Opella");
        assert_eq!(summary.indikace, "Analgetika");
        assert_eq!(summary.dodavky, YesNo::Ano);
        assert!(summary.doping);
        assert_eq!(summary.sila, "");

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["kodSukl"], "0012345");
        assert_eq!(value["atcNazev"], "");
        assert_eq!(value["ucinneLatky"], "");
        assert_eq!(value["dodavky"], "ano");
    }

    #[test]
    fn test_summary_from_empty_document() {
        let summary = DrugSummary::from_document(&json!({}));
        assert_eq!(summary.nazev, "");
        assert_eq!(summary.dodavky, YesNo::Ne);
        assert!(!summary.doping);
    }

    #[test]
    fn test_detail_mapping() {
        let doc = json!({
            "kodSukl": "0012345",
            "nazev": "PARALEN",
            "stavRegistraceNazev": "Registrovaný",
            "dodavky": "0",
            "slozeni": "y".repeat(6000),
        });
        let detail = DrugDetail::from_document(&doc);
        assert_eq!(detail.stav_registrace, "Registrovaný");
        assert_eq!(detail.dodavky, YesNo::Ne);
        assert_eq!(
            detail.sukl_url.as_deref(),
            Some("https://prehledy.sukl.cz/prehled_leciv.html#/leciva/0012345")
        );
        assert!(detail.slozeni.ends_with(COMPOSITION_MARKER));
        assert!(detail.slozeni.starts_with(&"y".repeat(5000)));

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["stavRegistrace"], "Registrovaný");
        assert_eq!(value["suklUrl"], detail.sukl_url.clone().unwrap());
    }

    #[test]
    fn test_detail_without_code_has_no_url() {
        let detail = DrugDetail::from_document(&json!({"nazev": "X"}));
        assert_eq!(detail.sukl_url, None);
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["suklUrl"], Value::Null);
    }
}
