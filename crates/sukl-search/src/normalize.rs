//! Mapping of raw backend results into client payloads.
//!
//! Everything here is total: missing or oddly typed fields fall back to
//! empty defaults instead of failing.

use serde::Serialize;
use serde_json::Value;

/// Free-text content longer than this is cut.
pub const CONTENT_LIMIT: usize = 2000;

/// Appended to cut free-text content.
pub const CONTENT_MARKER: &str = "…";

/// Composition text longer than this is cut.
pub const COMPOSITION_LIMIT: usize = 5000;

/// Appended to cut composition text.
pub const COMPOSITION_MARKER: &str = " … (zkráceno)";

/// Extractive answers at or below this confidence are dropped.
pub const ANSWER_MIN_CONFIDENCE: f64 = 0.5;

/// Typed record built field by field from one backend document.
pub trait FromDocument: Sized {
    fn from_document(doc: &Value) -> Self;
}

/// Human-readable rendering of a backend boolean or sentinel flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Ano,
    Ne,
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value {
            YesNo::Ano
        } else {
            YesNo::Ne
        }
    }
}

/// Extractive answer kept in the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub highlight: String,
    pub confidence: f64,
}

/// Client payload for a search call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage<T> {
    pub total: u64,
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<Answer>>,
}

/// Shape a raw search result into a page of `T` records.
pub fn normalize<T: FromDocument>(raw: &Value) -> SearchPage<T> {
    let items: Vec<T> = documents(raw).map(T::from_document).collect();
    let total = raw
        .get("@odata.count")
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);

    SearchPage {
        total,
        items,
        answers: answers(raw),
    }
}

/// Documents of a raw result, in backend order.
pub fn documents(raw: &Value) -> impl Iterator<Item = &Value> {
    raw.get("value")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Extractive answers above the confidence threshold, or `None` when the
/// backend sent none at all.
pub fn answers(raw: &Value) -> Option<Vec<Answer>> {
    let raw_answers = raw
        .get("@search.answers")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())?;

    Some(
        raw_answers
            .iter()
            .filter_map(|a| {
                let score = a.get("score").and_then(Value::as_f64).unwrap_or(0.0);
                if score <= ANSWER_MIN_CONFIDENCE {
                    return None;
                }
                let text = text(a, "text");
                Some(Answer {
                    highlight: non_empty(a, "highlights").unwrap_or_else(|| text.clone()),
                    text,
                    confidence: round2(score),
                })
            })
            .collect(),
    )
}

/// First semantic caption, preferring its highlighted variant.
pub fn caption(doc: &Value) -> Option<String> {
    let first = doc
        .get("@search.captions")
        .and_then(Value::as_array)
        .and_then(|c| c.first())?;
    Some(non_empty(first, "highlights").unwrap_or_else(|| text(first, "text")))
}

/// Reranker score rounded to two decimals.
pub fn reranker_score(doc: &Value) -> Option<f64> {
    doc.get("@search.rerankerScore")
        .and_then(Value::as_f64)
        .map(round2)
}

/// String field; scalars are stringified, anything else is empty.
pub fn text(doc: &Value, key: &str) -> String {
    match doc.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Field passed through as-is, defaulting to an empty string.
pub fn passthrough(doc: &Value, key: &str) -> Value {
    match doc.get(key) {
        Some(Value::Null) | None => Value::String(String::new()),
        Some(value) => value.clone(),
    }
}

/// Native boolean field, `false` when absent or not a boolean.
pub fn flag(doc: &Value, key: &str) -> bool {
    doc.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Loose truthiness: non-empty strings and collections, non-zero numbers.
pub fn truthy(doc: &Value, key: &str) -> bool {
    match doc.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Null) | None => false,
    }
}

/// Sentinel-encoded boolean: `'1'` is yes, anything else is no.
pub fn sentinel(doc: &Value, key: &str) -> YesNo {
    YesNo::from(doc.get(key).and_then(Value::as_str) == Some("1"))
}

/// Cut `value` to `limit` characters and append `marker` if it was longer.
pub fn truncate(value: &str, limit: usize, marker: &str) -> String {
    match value.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &value[..cut], marker),
        None => value.to_string(),
    }
}

/// Two-decimal rounding of the exact binary value, ties to even.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

fn non_empty(doc: &Value, key: &str) -> Option<String> {
    Some(text(doc, key)).filter(|s| !s.is_empty())
}
