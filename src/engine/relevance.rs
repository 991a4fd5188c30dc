//! Keyword-overlap relevance scoring shared by search and archival.

use crate::types::CharacterInfo;

/// Scores candidate text against a query.
///
/// Relevance of a field is the fraction of the query's whitespace-delimited
/// tokens that occur as case-insensitive substrings of the field. A record's
/// relevance is the maximum over its fields.
#[derive(Debug, Clone)]
pub struct RelevanceRanker {
    tokens: Vec<String>,
}

impl RelevanceRanker {
    /// Prepare a ranker for one query string.
    pub fn for_query(query: &str) -> Self {
        Self {
            tokens: tokenize(query),
        }
    }

    /// Lower-cased query tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the query has no tokens (and so matches nothing).
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Fraction of query tokens found in `field`.
    pub fn field_score(&self, field: &str) -> f64 {
        if self.tokens.is_empty() || field.is_empty() {
            return 0.0;
        }
        let haystack = field.to_lowercase();
        let found = self
            .tokens
            .iter()
            .filter(|t| haystack.contains(t.as_str()))
            .count();
        found as f64 / self.tokens.len() as f64
    }

    /// Best score over all fields of a record.
    pub fn score<'a, I>(&self, fields: I) -> f64
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields
            .into_iter()
            .map(|f| self.field_score(f))
            .fold(0.0, f64::max)
    }
}

/// Split a query into lower-cased whitespace-delimited tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Count entries in `mentioned` that name a protagonist or antagonist of
/// the core cast. Every matching entry counts, so a name listed twice
/// counts twice. Names are compared case-insensitively after trimming.
pub fn count_core_mentions(core_cast: &[CharacterInfo], mentioned: &[String]) -> usize {
    let core: Vec<String> = core_cast
        .iter()
        .filter(|c| c.role.is_core())
        .map(|c| c.name.trim().to_lowercase())
        .collect();
    mentioned
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty() && core.contains(name))
        .count()
}
