//! Search request and result types.

use serde::Serialize;

/// Typed slice of the core tier a search can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Character,
    Plot,
    World,
}

impl MemoryKind {
    /// Return a human-readable name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Plot => "plot",
            Self::World => "world",
        }
    }

    /// Parse a kind from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "character" => Some(Self::Character),
            "plot" => Some(Self::Plot),
            "world" => Some(Self::World),
            _ => None,
        }
    }
}

/// Which records a search considers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    /// Every tier: core, recent and long-term.
    #[default]
    Any,
    /// Only core records of one kind. Recent and long-term memory are
    /// untyped and therefore excluded.
    Only(MemoryKind),
    /// A filter name nobody recognises. Matches nothing.
    Unrecognized(String),
}

impl From<&str> for TypeFilter {
    fn from(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return TypeFilter::Any;
        }
        match MemoryKind::from_name(trimmed) {
            Some(kind) => TypeFilter::Only(kind),
            None => TypeFilter::Unrecognized(trimmed.to_string()),
        }
    }
}

/// Options for `TieredMemoryStore::search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub filter: TypeFilter,
    /// Maximum number of results.
    pub limit: usize,
    /// Minimum raw relevance (before tier weighting), inclusive.
    pub min_relevance: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filter: TypeFilter::Any,
            limit: 10,
            min_relevance: 0.3,
        }
    }
}

impl SearchOptions {
    /// Set the type filter from a name or kind.
    pub fn filter(mut self, filter: impl Into<TypeFilter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the result limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the minimum raw relevance.
    pub fn min_relevance(mut self, min: f64) -> Self {
        self.min_relevance = min;
        self
    }
}

impl From<MemoryKind> for TypeFilter {
    fn from(kind: MemoryKind) -> Self {
        TypeFilter::Only(kind)
    }
}

/// Where a search hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultSource {
    Character,
    World,
    Plot,
    Recent,
    LongTerm,
}

impl ResultSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::World => "world",
            Self::Plot => "plot",
            Self::Recent => "recent",
            Self::LongTerm => "long-term",
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub source: ResultSource,
    /// Character name, setting title, plot title or "Chapter N".
    pub title: String,
    /// Main text of the record.
    pub content: String,
    pub chapter: Option<u32>,
    /// Unweighted fraction of query tokens matched, 0.0-1.0.
    pub relevance: f64,
    /// Relevance after tier weighting; results are sorted by this.
    pub score: f64,
}
