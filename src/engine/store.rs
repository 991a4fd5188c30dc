//! Tiered memory store: permanent core facts, a bounded window of recent
//! chapters, and an unbounded archive of older chapters.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::MemoryConfig;
use crate::format::MemorySnapshot;
use crate::index::KeyIndex;
use crate::types::{
    CharacterInfo, Clock, CoreMemory, LongTermMemory, MemoryKind, PlotPoint, PowerSystem,
    RecentMemory, ResultSource, SearchOptions, SearchResult, SmemError, SmemResult, SystemClock,
    TypeFilter, WorldSetting,
};

use super::archive::archive;
use super::relevance::RelevanceRanker;
use super::summary::{relationship_graph, smart_summary};

/// Score multiplier for hits in the recent window.
pub const RECENT_WEIGHT: f64 = 1.2;

/// Counters over all three tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub characters: usize,
    pub world_settings: usize,
    pub plot_points: usize,
    pub recent_chapters: usize,
    pub long_term_chapters: usize,
    pub max_recent_chapters: usize,
    /// Mean importance of archived chapters.
    pub average_importance: Option<f64>,
    /// Lowest chapter number held in recent or long-term memory.
    pub earliest_chapter: Option<u32>,
    /// Highest chapter number held in recent or long-term memory.
    pub latest_chapter: Option<u32>,
    pub last_updated: u64,
}

/// Everything a writer needs before drafting a given chapter.
#[derive(Debug, Clone)]
pub struct ChapterContext<'a> {
    pub chapter: u32,
    pub core: &'a CoreMemory,
    /// Recent chapters before `chapter`, newest first.
    pub recent: Vec<&'a RecentMemory>,
    /// Most important archived chapters before `chapter`.
    pub archived: Vec<&'a LongTermMemory>,
    /// Unresolved plot points up to and including `chapter`.
    pub open_plot: Vec<&'a PlotPoint>,
}

/// The tiered memory store.
pub struct TieredMemoryStore {
    core: CoreMemory,
    /// Sorted by chapter number descending; at most `max_recent_chapters`.
    recent: Vec<RecentMemory>,
    /// Archival order.
    long_term: Vec<LongTermMemory>,
    character_index: KeyIndex<String>,
    setting_index: KeyIndex<String>,
    plot_index: KeyIndex<(u32, String)>,
    archive_index: KeyIndex<u32>,
    max_recent_chapters: usize,
    clock: Box<dyn Clock>,
}

impl TieredMemoryStore {
    /// Create an empty store. A window of 0 is raised to 1.
    pub fn new(max_recent_chapters: usize) -> Self {
        Self::with_clock(max_recent_chapters, SystemClock)
    }

    /// Create an empty store from validated configuration.
    pub fn with_config(config: &MemoryConfig) -> SmemResult<Self> {
        config.validate()?;
        Ok(Self::new(config.max_recent_chapters))
    }

    /// Create an empty store on a custom clock.
    pub fn with_clock(max_recent_chapters: usize, clock: impl Clock + 'static) -> Self {
        Self {
            core: CoreMemory::default(),
            recent: Vec::new(),
            long_term: Vec::new(),
            character_index: KeyIndex::new(),
            setting_index: KeyIndex::new(),
            plot_index: KeyIndex::new(),
            archive_index: KeyIndex::new(),
            max_recent_chapters: max_recent_chapters.max(1),
            clock: Box::new(clock),
        }
    }

    /// Capacity of the recent window.
    pub fn max_recent_chapters(&self) -> usize {
        self.max_recent_chapters
    }

    /// The permanent tier.
    pub fn core(&self) -> &CoreMemory {
        &self.core
    }

    /// Recent chapters, newest first.
    pub fn recent_memories(&self) -> &[RecentMemory] {
        &self.recent
    }

    /// Archived chapters in archival order.
    pub fn long_term_memories(&self) -> &[LongTermMemory] {
        &self.long_term
    }

    // ==================== Core tier ====================

    /// Insert a character, or overwrite the one with the same name in place.
    pub fn add_character(&mut self, info: CharacterInfo) {
        match self.character_index.get(info.name.as_str()) {
            Some(pos) => self.core.characters[pos] = info,
            None => {
                self.character_index
                    .insert(info.name.clone(), self.core.characters.len());
                self.core.characters.push(info);
            }
        }
        self.touch();
    }

    /// Look up a character by exact name.
    pub fn character(&self, name: &str) -> Option<&CharacterInfo> {
        self.character_index
            .get(name)
            .map(|pos| &self.core.characters[pos])
    }

    /// Remove a character by exact name.
    pub fn remove_character(&mut self, name: &str) -> Option<CharacterInfo> {
        let pos = self.character_index.get(name)?;
        let removed = self.core.characters.remove(pos);
        self.character_index
            .rebuild(&self.core.characters, |c| c.name.clone());
        self.touch();
        Some(removed)
    }

    /// Set the free-form status of an existing character.
    pub fn update_character_status(
        &mut self,
        name: &str,
        status: impl Into<String>,
    ) -> SmemResult<()> {
        let pos = self
            .character_index
            .get(name)
            .ok_or_else(|| SmemError::CharacterNotFound(name.to_string()))?;
        self.core.characters[pos].status = Some(status.into());
        self.touch();
        Ok(())
    }

    /// Insert a world setting, or overwrite the one with the same title.
    pub fn add_world_setting(&mut self, setting: WorldSetting) {
        match self.setting_index.get(setting.title.as_str()) {
            Some(pos) => self.core.world_settings[pos] = setting,
            None => {
                self.setting_index
                    .insert(setting.title.clone(), self.core.world_settings.len());
                self.core.world_settings.push(setting);
            }
        }
        self.touch();
    }

    /// Insert a plot point, or overwrite the one with the same chapter and
    /// title. The plot list stays sorted by chapter; equal chapters keep
    /// insertion order.
    pub fn add_plot_point(&mut self, point: PlotPoint) {
        let key = (point.chapter, point.title.clone());
        match self.plot_index.get(&key) {
            Some(pos) => self.core.main_plot[pos] = point,
            None => {
                self.core.main_plot.push(point);
                self.core.main_plot.sort_by_key(|p| p.chapter);
                self.plot_index
                    .rebuild(&self.core.main_plot, |p| (p.chapter, p.title.clone()));
            }
        }
        self.touch();
    }

    /// Replace the power system.
    pub fn set_power_system(&mut self, power: PowerSystem) {
        self.core.power_system = power;
        self.touch();
    }

    // ==================== Recent / long-term tiers ====================

    /// Insert or replace the digest of a chapter, then archive the oldest
    /// chapters until the recent window fits its capacity.
    ///
    /// Returns the chapter numbers archived by this call, oldest first.
    pub fn add_recent_memory(&mut self, mut entry: RecentMemory) -> Vec<u32> {
        if entry.timestamp == 0 {
            entry.timestamp = self.clock.now_millis();
        }
        let chapter = entry.chapter_number;
        match self
            .recent
            .binary_search_by(|m| chapter.cmp(&m.chapter_number))
        {
            Ok(pos) => self.recent[pos] = entry,
            Err(pos) => self.recent.insert(pos, entry),
        }
        self.enforce_capacity()
    }

    fn enforce_capacity(&mut self) -> Vec<u32> {
        let mut archived = Vec::new();
        while self.recent.len() > self.max_recent_chapters {
            // Sorted descending, so the last entry is the oldest chapter.
            let Some(oldest) = self.recent.pop() else {
                break;
            };
            let record = archive(oldest, &self.core.characters);
            log::debug!(
                "Archived chapter {} with importance {}",
                record.chapter_number,
                record.importance
            );
            archived.push(record.chapter_number);
            self.push_archive(record);
        }
        archived
    }

    fn push_archive(&mut self, record: LongTermMemory) {
        match self.archive_index.get(&record.chapter_number) {
            Some(pos) => self.long_term[pos] = record,
            None => {
                self.archive_index
                    .insert(record.chapter_number, self.long_term.len());
                self.long_term.push(record);
            }
        }
    }

    // ==================== Queries ====================

    /// Rank records by keyword overlap with `query`.
    ///
    /// A typed filter consults only the matching slice of the core tier.
    /// Recent hits are weighted by 1.2 and archived hits by
    /// `importance / 100`; `min_relevance` applies to the unweighted score.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let ranker = RelevanceRanker::for_query(query);
        if ranker.is_empty() || options.limit == 0 {
            return Vec::new();
        }

        let (kinds, include_chapters): (&[MemoryKind], bool) = match &options.filter {
            TypeFilter::Any => (
                &[MemoryKind::Character, MemoryKind::World, MemoryKind::Plot],
                true,
            ),
            TypeFilter::Only(kind) => (std::slice::from_ref(kind), false),
            TypeFilter::Unrecognized(name) => {
                log::debug!("Search filter {name:?} matches no memory type");
                return Vec::new();
            }
        };

        let mut hits = Vec::new();
        let min = options.min_relevance;

        for kind in kinds {
            match kind {
                MemoryKind::Character => {
                    for c in &self.core.characters {
                        let traits = c.traits.join(" ");
                        let status = c.status.as_deref().unwrap_or("");
                        let relevance = ranker.score([
                            c.name.as_str(),
                            c.description.as_str(),
                            traits.as_str(),
                            status,
                        ]);
                        push_hit(&mut hits, min, relevance, 1.0, || SearchResult {
                            source: ResultSource::Character,
                            title: c.name.clone(),
                            content: c.description.clone(),
                            chapter: c.first_appearance,
                            relevance,
                            score: relevance,
                        });
                    }
                }
                MemoryKind::World => {
                    for s in &self.core.world_settings {
                        let relevance = ranker.score([
                            s.title.as_str(),
                            s.category.as_str(),
                            s.description.as_str(),
                        ]);
                        push_hit(&mut hits, min, relevance, 1.0, || SearchResult {
                            source: ResultSource::World,
                            title: s.title.clone(),
                            content: s.description.clone(),
                            chapter: None,
                            relevance,
                            score: relevance,
                        });
                    }
                }
                MemoryKind::Plot => {
                    for p in &self.core.main_plot {
                        let relevance = ranker.score([p.title.as_str(), p.description.as_str()]);
                        push_hit(&mut hits, min, relevance, 1.0, || SearchResult {
                            source: ResultSource::Plot,
                            title: p.title.clone(),
                            content: p.description.clone(),
                            chapter: Some(p.chapter),
                            relevance,
                            score: relevance,
                        });
                    }
                }
            }
        }

        if include_chapters {
            for m in &self.recent {
                let events = m.key_events.join(" ");
                let characters = m.characters.join(" ");
                let locations = m.locations.join(" ");
                let relevance = ranker.score([
                    m.summary.as_str(),
                    events.as_str(),
                    characters.as_str(),
                    locations.as_str(),
                ]);
                push_hit(&mut hits, min, relevance, RECENT_WEIGHT, || SearchResult {
                    source: ResultSource::Recent,
                    title: format!("Chapter {}", m.chapter_number),
                    content: m.summary.clone(),
                    chapter: Some(m.chapter_number),
                    relevance,
                    score: relevance,
                });
            }
            for m in &self.long_term {
                let keywords = m.keywords.join(" ");
                let relevance = ranker.score([m.summary.as_str(), keywords.as_str()]);
                let weight = f64::from(m.importance) / 100.0;
                push_hit(&mut hits, min, relevance, weight, || SearchResult {
                    source: ResultSource::LongTerm,
                    title: format!("Chapter {}", m.chapter_number),
                    content: m.summary.clone(),
                    chapter: Some(m.chapter_number),
                    relevance,
                    score: relevance,
                });
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(options.limit);
        hits
    }

    /// Directed relationship adjacency, one entry per character.
    pub fn generate_relationship_graph(&self) -> BTreeMap<String, Vec<String>> {
        relationship_graph(&self.core.characters)
    }

    /// Plain-text digest of the most important facts.
    pub fn generate_smart_summary(&self) -> String {
        smart_summary(&self.core, &self.recent, &self.long_term)
    }

    /// Gather what is known before drafting `chapter`.
    pub fn context_for_chapter(&self, chapter: u32, archive_limit: usize) -> ChapterContext<'_> {
        let recent = self
            .recent
            .iter()
            .filter(|m| m.chapter_number < chapter)
            .collect();

        let mut archived: Vec<&LongTermMemory> = self
            .long_term
            .iter()
            .filter(|m| m.chapter_number < chapter)
            .collect();
        archived.sort_by(|a, b| {
            b.importance
                .cmp(&a.importance)
                .then(b.chapter_number.cmp(&a.chapter_number))
        });
        archived.truncate(archive_limit);

        let open_plot = self
            .core
            .main_plot
            .iter()
            .filter(|p| !p.resolved && p.chapter <= chapter)
            .collect();

        ChapterContext {
            chapter,
            core: &self.core,
            recent,
            archived,
            open_plot,
        }
    }

    /// Counters over all tiers.
    pub fn stats(&self) -> MemoryStats {
        let average_importance = if self.long_term.is_empty() {
            None
        } else {
            let total: u64 = self.long_term.iter().map(|m| u64::from(m.importance)).sum();
            Some(total as f64 / self.long_term.len() as f64)
        };
        let chapters = self
            .recent
            .iter()
            .map(|m| m.chapter_number)
            .chain(self.long_term.iter().map(|m| m.chapter_number));
        let (earliest, latest) = chapters.fold((None, None), |(lo, hi), c| {
            (
                Some(lo.map_or(c, |l: u32| l.min(c))),
                Some(hi.map_or(c, |h: u32| h.max(c))),
            )
        });

        MemoryStats {
            characters: self.core.characters.len(),
            world_settings: self.core.world_settings.len(),
            plot_points: self.core.main_plot.len(),
            recent_chapters: self.recent.len(),
            long_term_chapters: self.long_term.len(),
            max_recent_chapters: self.max_recent_chapters,
            average_importance,
            earliest_chapter: earliest,
            latest_chapter: latest,
            last_updated: self.core.last_updated,
        }
    }

    /// Forget everything. The window capacity is kept.
    pub fn clear(&mut self) {
        self.core = CoreMemory::default();
        self.recent.clear();
        self.long_term.clear();
        self.character_index.clear();
        self.setting_index.clear();
        self.plot_index.clear();
        self.archive_index.clear();
    }

    // ==================== Snapshots ====================

    /// Capture all three tiers.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot::new(
            self.core.clone(),
            self.recent.clone(),
            self.long_term.clone(),
            self.clock.now_millis(),
        )
    }

    /// Serialize all three tiers to a versioned JSON document.
    pub fn export(&self) -> SmemResult<String> {
        self.snapshot().to_json()
    }

    /// Replace all state with the contents of an exported document.
    ///
    /// The document is fully parsed and validated first; on error the store
    /// is left exactly as it was.
    pub fn import(&mut self, blob: &str) -> SmemResult<()> {
        let snapshot = MemorySnapshot::parse(blob)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Install an already validated snapshot. Ordering invariants are
    /// re-established and an oversized recent list is archived down to this
    /// store's capacity.
    pub(crate) fn apply_snapshot(&mut self, snapshot: MemorySnapshot) {
        self.core = snapshot.core_memory;
        self.core.main_plot.sort_by_key(|p| p.chapter);
        self.recent = snapshot.recent_memory;
        self.recent
            .sort_by(|a, b| b.chapter_number.cmp(&a.chapter_number));
        self.long_term = snapshot.long_term_memory;

        self.character_index
            .rebuild(&self.core.characters, |c| c.name.clone());
        self.setting_index
            .rebuild(&self.core.world_settings, |s| s.title.clone());
        self.plot_index
            .rebuild(&self.core.main_plot, |p| (p.chapter, p.title.clone()));
        self.archive_index
            .rebuild(&self.long_term, |m| m.chapter_number);

        let archived = self.enforce_capacity();
        log::info!(
            "Imported memory: {} characters, {} recent, {} archived ({} archived on import)",
            self.core.characters.len(),
            self.recent.len(),
            self.long_term.len(),
            archived.len()
        );
    }

    fn touch(&mut self) {
        self.core.last_updated = self.clock.now_millis();
    }
}

impl Default for TieredMemoryStore {
    fn default() -> Self {
        Self::new(crate::types::DEFAULT_MAX_RECENT_CHAPTERS)
    }
}

fn push_hit(
    hits: &mut Vec<SearchResult>,
    min_relevance: f64,
    relevance: f64,
    weight: f64,
    make: impl FnOnce() -> SearchResult,
) {
    if relevance <= 0.0 || relevance < min_relevance {
        return;
    }
    let mut hit = make();
    hit.score = relevance * weight;
    hits.push(hit);
}
