//! Story facts held by the tiered memory store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Narrative role of a character. Protagonists and antagonists are the
/// "core" cast that raises the importance of archived chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CharacterRole {
    Protagonist,
    Antagonist,
    #[default]
    Supporting,
    Minor,
}

impl CharacterRole {
    /// Return a human-readable name for this role.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Protagonist => "protagonist",
            Self::Antagonist => "antagonist",
            Self::Supporting => "supporting",
            Self::Minor => "minor",
        }
    }

    /// Parse a role from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "protagonist" => Some(Self::Protagonist),
            "antagonist" => Some(Self::Antagonist),
            "supporting" => Some(Self::Supporting),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }

    /// Whether this role belongs to the core cast.
    pub fn is_core(&self) -> bool {
        matches!(self, Self::Protagonist | Self::Antagonist)
    }

    /// Ordering weight used when picking "top" characters for digests.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Protagonist => 0,
            Self::Antagonist => 1,
            Self::Supporting => 2,
            Self::Minor => 3,
        }
    }
}

impl std::fmt::Display for CharacterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A character in the story. Identity is the `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterInfo {
    pub name: String,
    #[serde(default)]
    pub role: CharacterRole,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traits: Vec<String>,
    /// Related character name -> relation label. Directed: only edges this
    /// character declares.
    #[serde(default)]
    pub relationships: BTreeMap<String, String>,
    #[serde(default)]
    pub first_appearance: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CharacterInfo {
    /// Create a character with the required fields.
    pub fn new(name: impl Into<String>, role: CharacterRole) -> Self {
        Self {
            name: name.into(),
            role,
            description: String::new(),
            traits: Vec::new(),
            relationships: BTreeMap::new(),
            first_appearance: None,
            status: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a personality trait.
    pub fn with_trait(mut self, t: impl Into<String>) -> Self {
        self.traits.push(t.into());
        self
    }

    /// Declare a relationship toward another character.
    pub fn related_to(mut self, other: impl Into<String>, relation: impl Into<String>) -> Self {
        self.relationships.insert(other.into(), relation.into());
        self
    }

    /// Set the chapter this character first appears in.
    pub fn first_appearance(mut self, chapter: u32) -> Self {
        self.first_appearance = Some(chapter);
        self
    }
}

/// A fact about the story world (place, faction, artefact, rule...).
/// Identity is the `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSetting {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl WorldSetting {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            description: description.into(),
        }
    }
}

/// Plot thread classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    #[default]
    Main,
    Subplot,
    Foreshadowing,
}

impl PlotKind {
    /// Return a human-readable name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Subplot => "subplot",
            Self::Foreshadowing => "foreshadowing",
        }
    }

    /// Parse a plot kind from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "main" => Some(Self::Main),
            "subplot" => Some(Self::Subplot),
            "foreshadowing" => Some(Self::Foreshadowing),
            _ => None,
        }
    }
}

/// A plot beat anchored to a chapter. Identity is `(chapter, title)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotPoint {
    pub chapter: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: PlotKind,
    #[serde(default)]
    pub resolved: bool,
}

impl PlotPoint {
    pub fn new(chapter: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            chapter,
            title: title.into(),
            description: description.into(),
            kind: PlotKind::Main,
            resolved: false,
        }
    }

    /// Set the plot kind.
    pub fn kind(mut self, kind: PlotKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Cultivation / magic / technology ladder of the story world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PowerSystem {
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
}

impl PowerSystem {
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty() && self.rules.is_empty() && self.limitations.is_empty()
    }
}

/// Permanent tier: never evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CoreMemory {
    #[serde(default)]
    pub characters: Vec<CharacterInfo>,
    #[serde(default)]
    pub world_settings: Vec<WorldSetting>,
    /// Always sorted by chapter ascending; equal chapters keep insertion order.
    #[serde(default)]
    pub main_plot: Vec<PlotPoint>,
    #[serde(default)]
    pub power_system: PowerSystem,
    /// Unix epoch milliseconds of the last core mutation.
    #[serde(default)]
    pub last_updated: u64,
}

/// Per-chapter digest held in the bounded recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMemory {
    pub chapter_number: u32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_events: Vec<String>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    /// Unix epoch milliseconds; stamped by the store when left at zero.
    #[serde(default)]
    pub timestamp: u64,
}

impl RecentMemory {
    pub fn new(chapter_number: u32, summary: impl Into<String>) -> Self {
        Self {
            chapter_number,
            summary: summary.into(),
            key_events: Vec::new(),
            characters: Vec::new(),
            locations: Vec::new(),
            timestamp: 0,
        }
    }

    /// Append a key event.
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.key_events.push(event.into());
        self
    }

    /// Append a character appearing in the chapter.
    pub fn character(mut self, name: impl Into<String>) -> Self {
        self.characters.push(name.into());
        self
    }

    /// Append a location visited in the chapter.
    pub fn location(mut self, place: impl Into<String>) -> Self {
        self.locations.push(place.into());
        self
    }
}

/// Archived chapter. Produced only by the archival transform; fields are
/// never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTermMemory {
    pub chapter_number: u32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// 0-100.
    pub importance: u8,
}
