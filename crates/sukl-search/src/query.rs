//! Structured search queries and their wire body.

use serde::{Serialize, Serializer};

/// Default extractive answers option for hybrid queries.
pub const DEFAULT_ANSWERS: &str = "extractive|count-3";

/// Default extractive captions option for hybrid queries.
pub const DEFAULT_CAPTIONS: &str = "extractive|highlight-true";

/// Backend query mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Simple,
    #[default]
    Semantic,
}

/// Vectorized text query for hybrid mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorQuery {
    pub kind: &'static str,
    pub text: String,
    pub fields: String,
    pub k: u32,
}

/// A query against one index.
///
/// Built per request with the `with_*` style setters and discarded after
/// the call.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    search: String,
    query_type: QueryType,
    top: u32,
    skip: Option<u32>,
    count: bool,
    filter: Option<String>,
    select: Vec<String>,
    order_by: Option<String>,
    semantic_configuration: Option<String>,
    answers: Option<String>,
    captions: Option<String>,
    vector_queries: Vec<VectorQuery>,
}

impl SearchQuery {
    /// Keyword/semantic query with the backend defaults
    /// (`semantic`, top 10, skip 0, count on).
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            query_type: QueryType::Semantic,
            top: 10,
            skip: Some(0),
            count: true,
            filter: None,
            select: Vec::new(),
            order_by: None,
            semantic_configuration: None,
            answers: None,
            captions: None,
            vector_queries: Vec::new(),
        }
    }

    /// Hybrid query: keyword + vector + semantic reranking, with extractive
    /// answers and captions enabled.
    pub fn hybrid(search: impl Into<String>, vector_fields: impl Into<String>, top: u32) -> Self {
        let search = search.into();
        let vector = VectorQuery {
            kind: "text",
            text: search.clone(),
            fields: vector_fields.into(),
            k: top,
        };

        Self {
            skip: None,
            top,
            answers: Some(DEFAULT_ANSWERS.to_string()),
            captions: Some(DEFAULT_CAPTIONS.to_string()),
            vector_queries: vec![vector],
            ..Self::new(search)
        }
    }

    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = top;
        for vector in &mut self.vector_queries {
            vector.k = top;
        }
        self
    }

    pub fn with_skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }

    /// Fields to return; order is preserved on the wire.
    pub fn with_select(mut self, fields: &[&str]) -> Self {
        self.select = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Semantic configuration name; only sent in semantic mode.
    pub fn with_semantic_configuration(mut self, name: impl Into<String>) -> Self {
        self.semantic_configuration = Some(name.into());
        self
    }

    pub fn with_answers(mut self, answers: Option<String>) -> Self {
        self.answers = answers;
        self
    }

    pub fn with_captions(mut self, captions: Option<String>) -> Self {
        self.captions = captions;
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn is_hybrid(&self) -> bool {
        !self.vector_queries.is_empty()
    }

    /// The request body for `POST /indexes/{index}/docs/search`.
    pub fn body(&self) -> SearchBody<'_> {
        let semantic = self.query_type == QueryType::Semantic;
        SearchBody {
            search: &self.search,
            query_type: self.query_type,
            top: self.top,
            skip: self.skip,
            count: self.count,
            filter: self.filter.as_deref(),
            select: &self.select,
            order_by: self.order_by.as_deref(),
            semantic_configuration: self
                .semantic_configuration
                .as_deref()
                .filter(|_| semantic),
            answers: self.answers.as_deref(),
            captions: self.captions.as_deref(),
            vector_queries: &self.vector_queries,
        }
    }
}

/// Serialized form of a [`SearchQuery`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody<'a> {
    search: &'a str,
    query_type: QueryType,
    top: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip: Option<u32>,
    count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty", serialize_with = "comma_joined")]
    select: &'a [String],
    #[serde(rename = "orderby", skip_serializing_if = "Option::is_none")]
    order_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic_configuration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answers: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    captions: Option<&'a str>,
    #[serde(skip_serializing_if = "<[VectorQuery]>::is_empty")]
    vector_queries: &'a [VectorQuery],
}

fn comma_joined<S: Serializer>(fields: &&[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&fields.join(","))
}
