//! Translation of domain parameters into backend filter expressions.
//!
//! Clauses are built only from a closed set of field names and a few rule
//! kinds. Every text literal is escaped when rendered, so raw user input
//! never reaches the backend grammar. Inputs a rule does not recognize
//! produce no clause rather than an error.

use std::fmt;

/// Canonical length of a full classification (ATC) code, e.g. `N02BE01`.
pub const CLASSIFICATION_CODE_LEN: usize = 7;

/// Right-hand side of an equality clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Quoted string literal
    Text(String),
    /// Native boolean
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(value) => write!(f, "'{}'", escape_literal(value)),
            Literal::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// One boolean predicate of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// `field eq <literal>`
    Eq {
        field: &'static str,
        value: Literal,
    },
    /// `search.ismatch('<pattern>', '<field>')`
    IsMatch {
        pattern: String,
        field: &'static str,
    },
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterClause::Eq { field, value } => write!(f, "{} eq {}", field, value),
            FilterClause::IsMatch { pattern, field } => {
                write!(f, "search.ismatch('{}', '{}')", escape_literal(pattern), field)
            }
        }
    }
}

/// Escape a string literal by doubling single quotes.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Check that a normalized code only uses `[A-Z0-9]`.
fn is_classification_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Accumulates clauses; rendered as an AND conjunction.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    clauses: Vec<FilterClause>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classification code: prefix match below the full length, exact match
    /// otherwise. Codes outside `[A-Z0-9]` after normalization are ignored.
    pub fn classification_code(mut self, field: &'static str, code: Option<&str>) -> Self {
        let Some(code) = code.filter(|c| !c.is_empty()) else {
            return self;
        };

        let normalized = code.trim().to_uppercase();
        if !is_classification_code(&normalized) {
            return self;
        }

        let clause = if normalized.len() < CLASSIFICATION_CODE_LEN {
            FilterClause::IsMatch {
                pattern: format!("{}*", normalized),
                field,
            }
        } else {
            FilterClause::Eq {
                field,
                value: Literal::Text(normalized),
            }
        };
        self.clauses.push(clause);
        self
    }

    /// Fuzzy text match against a searchable field.
    pub fn matches(mut self, field: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.clauses.push(FilterClause::IsMatch {
                pattern: value.to_string(),
                field,
            });
        }
        self
    }

    /// Exact string equality.
    pub fn equals(mut self, field: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.clauses.push(FilterClause::Eq {
                field,
                value: Literal::Text(value.to_string()),
            });
        }
        self
    }

    /// Enumerated attribute looked up (case-insensitively) in a fixed
    /// name -> code table. Unknown names add nothing.
    pub fn category(
        mut self,
        field: &'static str,
        value: Option<&str>,
        table: &[(&str, &'static str)],
    ) -> Self {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return self;
        };

        let key = value.to_lowercase();
        if let Some((_, code)) = table.iter().find(|(name, _)| *name == key) {
            self.clauses.push(FilterClause::Eq {
                field,
                value: Literal::Text((*code).to_string()),
            });
        }
        self
    }

    /// Tri-state boolean: absent adds nothing.
    pub fn flag(mut self, field: &'static str, value: Option<bool>) -> Self {
        if let Some(value) = value {
            self.clauses.push(FilterClause::Eq {
                field,
                value: Literal::Bool(value),
            });
        }
        self
    }

    /// Tri-state boolean stored by the backend as `'1'` / `'0'`.
    pub fn sentinel_flag(mut self, field: &'static str, value: Option<bool>) -> Self {
        if let Some(value) = value {
            let token = if value { "1" } else { "0" };
            self.clauses.push(FilterClause::Eq {
                field,
                value: Literal::Text(token.to_string()),
            });
        }
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Render the conjunction, or `None` when no rule applied.
    pub fn build(self) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }

        Some(
            self.clauses
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" and "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(&str, &str)] = &[("prescription", "R"), ("otc", "F")];

    #[test]
    fn test_full_code_is_exact_match() {
        let filter = FilterBuilder::new()
            .classification_code("atc", Some("n02be01"))
            .build();
        assert_eq!(filter.as_deref(), Some("atc eq 'N02BE01'"));
    }

    #[test]
    fn test_longer_code_is_exact_match() {
        let filter = FilterBuilder::new()
            .classification_code("atc", Some("N02BE0101"))
            .build();
        assert_eq!(filter.as_deref(), Some("atc eq 'N02BE0101'"));
    }

    #[test]
    fn test_short_code_is_prefix_match() {
        let filter = FilterBuilder::new()
            .classification_code("atc", Some(" n02 "))
            .build();
        assert_eq!(filter.as_deref(), Some("search.ismatch('N02*', 'atc')"));
    }

    #[test]
    fn test_malformed_code_is_ignored() {
        for code in ["N02$", "N02' or 1 eq 1", "N 02", "   ", "Ñ02"] {
            let filter = FilterBuilder::new()
                .classification_code("atc", Some(code))
                .build();
            assert_eq!(filter, None, "code {:?} should be dropped", code);
        }
    }

    #[test]
    fn test_quotes_are_doubled() {
        let filter = FilterBuilder::new()
            .matches("drzitelNazev", Some("O'Brien"))
            .build();
        assert_eq!(
            filter.as_deref(),
            Some("search.ismatch('O''Brien', 'drzitelNazev')")
        );

        let filter = FilterBuilder::new()
            .equals("mesto", Some("'; drop"))
            .build();
        assert_eq!(filter.as_deref(), Some("mesto eq '''; drop'"));
    }

    #[test]
    fn test_category_lookup() {
        let filter = FilterBuilder::new()
            .category("vydej", Some("OTC"), TABLE)
            .build();
        assert_eq!(filter.as_deref(), Some("vydej eq 'F'"));

        let filter = FilterBuilder::new()
            .category("vydej", Some("vending-machine"), TABLE)
            .build();
        assert_eq!(filter, None);
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            FilterBuilder::new().flag("doping", Some(true)).build().as_deref(),
            Some("doping eq true")
        );
        assert_eq!(
            FilterBuilder::new().flag("doping", Some(false)).build().as_deref(),
            Some("doping eq false")
        );
        assert_eq!(FilterBuilder::new().flag("doping", None).build(), None);
    }

    #[test]
    fn test_sentinel_flags() {
        assert_eq!(
            FilterBuilder::new()
                .sentinel_flag("dodavky", Some(true))
                .build()
                .as_deref(),
            Some("dodavky eq '1'")
        );
        assert_eq!(
            FilterBuilder::new()
                .sentinel_flag("dodavky", Some(false))
                .build()
                .as_deref(),
            Some("dodavky eq '0'")
        );
    }

    #[test]
    fn test_empty_strings_add_nothing() {
        let builder = FilterBuilder::new()
            .matches("formaNazev", Some(""))
            .equals("mesto", Some(""))
            .category("vydej", Some(""), TABLE)
            .classification_code("atc", Some(""));
        assert!(builder.clauses().is_empty());
        assert_eq!(builder.build(), None);
    }

    #[test]
    fn test_clauses_are_conjoined_in_order() {
        let filter = FilterBuilder::new()
            .classification_code("atc", Some("N02"))
            .category("vydej", Some("prescription"), TABLE)
            .flag("doping", Some(false))
            .build();
        assert_eq!(
            filter.as_deref(),
            Some("search.ismatch('N02*', 'atc') and vydej eq 'R' and doping eq false")
        );
    }
}
