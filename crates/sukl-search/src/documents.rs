//! Hybrid search over SPC document chunks (`sukl-documents`).

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::SearchError;
use crate::normalize::{
    caption, normalize, passthrough, reranker_score, text, truncate, FromDocument, SearchPage,
    CONTENT_LIMIT, CONTENT_MARKER,
};
use crate::query::SearchQuery;
use crate::transport::SearchTransport;

pub const INDEX: &str = "sukl-documents";
pub const SEMANTIC_CONFIG: &str = "sukl-semantic";
pub const VECTOR_FIELD: &str = "chunk_vector";

pub const MAX_RESULTS: RangeInclusive<u32> = 1..=10;
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Shortest accepted query, in characters.
pub const MIN_QUERY_CHARS: usize = 2;

/// Returned fields; the vector field is left out.
pub const SELECT_FIELDS: &[&str] = &["chunk_id", "parent_id", "chunk", "title", "drug_codes"];

/// One matched document chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    pub title: String,
    pub drug_codes: Value,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

impl FromDocument for DocumentChunk {
    fn from_document(doc: &Value) -> Self {
        Self {
            title: text(doc, "title"),
            drug_codes: passthrough(doc, "drug_codes"),
            content: truncate(&text(doc, "chunk"), CONTENT_LIMIT, CONTENT_MARKER),
            highlight: caption(doc),
            relevance: reranker_score(doc),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentCatalog {
    transport: Arc<SearchTransport>,
}

impl DocumentCatalog {
    pub fn new(transport: Arc<SearchTransport>) -> Self {
        Self { transport }
    }

    /// Keyword + vector + semantic search with extractive answers.
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchPage<DocumentChunk>, SearchError> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(SearchError::InvalidInput(format!(
                "query must have at least {} characters",
                MIN_QUERY_CHARS
            )));
        }
        if !MAX_RESULTS.contains(&max_results) {
            return Err(SearchError::InvalidInput(format!(
                "max_results must be within {:?}",
                MAX_RESULTS
            )));
        }

        let query = SearchQuery::hybrid(query, VECTOR_FIELD, max_results)
            .with_select(SELECT_FIELDS)
            .with_semantic_configuration(SEMANTIC_CONFIG);

        let raw = self.transport.search(INDEX, &query).await?;
        Ok(normalize(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_mapping() {
        let doc = json!({
            "chunk_id": "c1",
            "title": "SPC Paralen",
            "drug_codes": ["0012345", "0012346"],
            "chunk": "z".repeat(2500),
            "@search.captions": [{"text": "plain", "highlights": "<em>hl</em>"}],
            "@search.rerankerScore": 3.14159,
        });
        let chunk = DocumentChunk::from_document(&doc);
        assert_eq!(chunk.title, "SPC Paralen");
        assert_eq!(chunk.content.chars().count(), 2001);
        assert!(chunk.content.ends_with(CONTENT_MARKER));
        assert_eq!(chunk.highlight.as_deref(), Some("<em>hl</em>"));
        assert_eq!(chunk.relevance, Some(3.14));

        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["drugCodes"], json!(["0012345", "0012346"]));
    }

    #[test]
    fn test_chunk_without_semantic_extras() {
        let chunk = DocumentChunk::from_document(&json!({"chunk": "short"}));
        assert_eq!(chunk.content, "short");

        let value = serde_json::to_value(&chunk).unwrap();
        assert!(value.get("highlight").is_none());
        assert!(value.get("relevance").is_none());
        assert_eq!(value["drugCodes"], "");
    }

    #[test]
    fn test_page_with_answers() {
        let raw = json!({
            "@odata.count": 7,
            "value": [{"title": "A", "chunk": "x"}],
            "@search.answers": [
                {"text": "low", "score": 0.4},
                {"text": "high", "score": 0.6},
            ],
        });
        let page: SearchPage<DocumentChunk> = normalize(&raw);
        assert_eq!(page.total, 7);

        let answers = page.answers.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].text, "high");
        assert_eq!(answers[0].confidence, 0.6);
    }
}
