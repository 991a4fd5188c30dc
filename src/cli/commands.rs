//! CLI command implementations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::StoryMemoryConfig;
use crate::engine::{ContentCache, TieredMemoryStore};
use crate::format::{load_memory, save_memory, FileByteStore, CACHE_STORAGE_KEY, MEMORY_STORAGE_KEY};
use crate::types::{
    Analyzed, CharacterInfo, PlotPoint, RecentMemory, SearchOptions, SmemResult, SystemClock,
    WorldSetting,
};

/// Cache namespace of the `analyze` command.
const TEXT_STATS_PREFIX: &str = "text-stats";

/// A data directory plus the configuration it is used with.
pub struct Workspace {
    store: FileByteStore,
    config: StoryMemoryConfig,
}

impl Workspace {
    /// Open (creating if needed) the data directory.
    pub fn open(data_dir: &Path, config: StoryMemoryConfig) -> SmemResult<Self> {
        config.validate()?;
        let store = FileByteStore::open(data_dir)?;
        Ok(Self { store, config })
    }

    /// Directory snapshots are written to.
    pub fn data_dir(&self) -> PathBuf {
        self.store.dir().to_path_buf()
    }

    fn load(&self) -> SmemResult<TieredMemoryStore> {
        let mut memory = TieredMemoryStore::with_config(&self.config.memory)?;
        load_memory(&mut memory, &self.store, MEMORY_STORAGE_KEY)?;
        Ok(memory)
    }

    fn save(&mut self, memory: &TieredMemoryStore) {
        if !save_memory(memory, &mut self.store, MEMORY_STORAGE_KEY) {
            eprintln!("Warning: changes could not be written to {}", self.store.dir().display());
        }
    }

    /// The persistent cache behind `analyze`.
    pub fn analysis_cache(&self) -> ContentCache<TextStats> {
        let config = self.config.cache.clone().persistence(true);
        ContentCache::with_store(
            config,
            SystemClock,
            Box::new(self.store.clone()),
            CACHE_STORAGE_KEY,
        )
    }
}

/// Cheap structural statistics of a text, used by `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub dialogue_lines: usize,
}

/// Count characters (non-whitespace), words, sentences, paragraphs and
/// lines that open with a quotation mark.
pub fn text_stats(content: &str) -> TextStats {
    let sentence_ends = ['.', '!', '?', '。', '！', '？'];
    let dialogue_marks = ['"', '“', '「', '\''];
    TextStats {
        characters: content.chars().filter(|c| !c.is_whitespace()).count(),
        words: content.split_whitespace().count(),
        sentences: content
            .split(|c: char| sentence_ends.contains(&c))
            .filter(|s| !s.trim().is_empty())
            .count(),
        paragraphs: content
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count(),
        dialogue_lines: content
            .lines()
            .filter(|l| l.trim_start().starts_with(dialogue_marks))
            .count(),
    }
}

/// Write an empty memory store. Refuses to overwrite unless `force`.
pub fn cmd_init(ws: &mut Workspace, force: bool, json: bool) -> SmemResult<()> {
    let existing = ws.load()?;
    let populated = !existing.core().characters.is_empty()
        || !existing.recent_memories().is_empty()
        || !existing.long_term_memories().is_empty();
    if populated && !force {
        eprintln!(
            "Memory already exists in {} (use --force to reset)",
            ws.data_dir().display()
        );
        return Ok(());
    }
    let memory = TieredMemoryStore::with_config(&ws.config.memory)?;
    ws.save(&memory);
    if json {
        println!(
            "{}",
            serde_json::json!({
                "dataDir": ws.data_dir().display().to_string(),
                "maxRecentChapters": memory.max_recent_chapters(),
            })
        );
    } else {
        println!(
            "Initialized memory in {} (recent window: {} chapters)",
            ws.data_dir().display(),
            memory.max_recent_chapters()
        );
    }
    Ok(())
}

/// Add or replace a character.
pub fn cmd_add_character(ws: &mut Workspace, info: CharacterInfo, json: bool) -> SmemResult<()> {
    let mut memory = ws.load()?;
    let replaced = memory.character(&info.name).is_some();
    let name = info.name.clone();
    let role = info.role;
    memory.add_character(info);
    ws.save(&memory);
    if json {
        println!(
            "{}",
            serde_json::json!({"name": name, "role": role.name(), "replaced": replaced})
        );
    } else {
        let verb = if replaced { "Updated" } else { "Added" };
        println!("{verb} character {name} ({role})");
    }
    Ok(())
}

/// Add or replace a world setting.
pub fn cmd_add_setting(ws: &mut Workspace, setting: WorldSetting, json: bool) -> SmemResult<()> {
    let mut memory = ws.load()?;
    let title = setting.title.clone();
    memory.add_world_setting(setting);
    ws.save(&memory);
    if json {
        println!("{}", serde_json::json!({"title": title}));
    } else {
        println!("Stored world setting {title}");
    }
    Ok(())
}

/// Add or replace a plot point.
pub fn cmd_add_plot(ws: &mut Workspace, point: PlotPoint, json: bool) -> SmemResult<()> {
    let mut memory = ws.load()?;
    let (chapter, title) = (point.chapter, point.title.clone());
    memory.add_plot_point(point);
    ws.save(&memory);
    if json {
        println!("{}", serde_json::json!({"chapter": chapter, "title": title}));
    } else {
        println!("Stored plot point Ch.{chapter} {title}");
    }
    Ok(())
}

/// Record a chapter digest, reporting any chapters archived as a result.
pub fn cmd_add_chapter(ws: &mut Workspace, entry: RecentMemory, json: bool) -> SmemResult<()> {
    let mut memory = ws.load()?;
    let chapter = entry.chapter_number;
    let archived = memory.add_recent_memory(entry);
    ws.save(&memory);
    if json {
        println!(
            "{}",
            serde_json::json!({"chapter": chapter, "archived": archived})
        );
    } else {
        println!("Recorded chapter {chapter}");
        for c in &archived {
            let importance = memory
                .long_term_memories()
                .iter()
                .find(|m| m.chapter_number == *c)
                .map(|m| m.importance)
                .unwrap_or_default();
            println!("  Archived chapter {c} (importance {importance})");
        }
    }
    Ok(())
}

/// Keyword search across the memory tiers.
pub fn cmd_search(
    ws: &Workspace,
    query: &str,
    options: &SearchOptions,
    json: bool,
) -> SmemResult<()> {
    let memory = ws.load()?;
    let results = memory.search(query, options);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).unwrap_or_default()
        );
    } else if results.is_empty() {
        println!("No matches for {query:?}");
    } else {
        for r in &results {
            println!(
                "[{:.2}] {:<9} {}: {}",
                r.score,
                r.source.name(),
                r.title,
                truncate(&r.content, 72)
            );
        }
    }
    Ok(())
}

/// Print the smart summary digest.
pub fn cmd_summary(ws: &Workspace) -> SmemResult<()> {
    let memory = ws.load()?;
    let summary = memory.generate_smart_summary();
    if summary.is_empty() {
        println!("Memory is empty");
    } else {
        print!("{summary}");
    }
    Ok(())
}

/// Print the directed relationship graph.
pub fn cmd_graph(ws: &Workspace, json: bool) -> SmemResult<()> {
    let memory = ws.load()?;
    let graph = memory.generate_relationship_graph();
    if json {
        println!("{}", serde_json::to_string_pretty(&graph).unwrap_or_default());
    } else {
        for (name, related) in &graph {
            if related.is_empty() {
                println!("{name}");
            } else {
                println!("{name} -> {}", related.join(", "));
            }
        }
    }
    Ok(())
}

/// Print tier counters.
pub fn cmd_stats(ws: &Workspace, json: bool) -> SmemResult<()> {
    let memory = ws.load()?;
    let stats = memory.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    } else {
        println!("Data dir: {}", ws.data_dir().display());
        println!("Characters: {}", stats.characters);
        println!("World settings: {}", stats.world_settings);
        println!("Plot points: {}", stats.plot_points);
        println!(
            "Recent chapters: {}/{}",
            stats.recent_chapters, stats.max_recent_chapters
        );
        println!("Archived chapters: {}", stats.long_term_chapters);
        if let Some(avg) = stats.average_importance {
            println!("Average archived importance: {avg:.1}");
        }
        if let (Some(lo), Some(hi)) = (stats.earliest_chapter, stats.latest_chapter) {
            println!("Chapter span: {lo}-{hi}");
        }
        if stats.last_updated > 0 {
            println!("Last updated: {}", format_timestamp(stats.last_updated));
        }
    }
    Ok(())
}

/// Write the versioned snapshot to a file, or stdout.
pub fn cmd_export(ws: &Workspace, output: Option<&Path>) -> SmemResult<()> {
    let memory = ws.load()?;
    let text = memory.export()?;
    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            println!("Exported {} to {}", format_size(text.len() as u64), path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Replace the stored memory with an exported snapshot file.
pub fn cmd_import(ws: &mut Workspace, input: &Path, json: bool) -> SmemResult<()> {
    let text = std::fs::read_to_string(input)?;
    let mut memory = TieredMemoryStore::with_config(&ws.config.memory)?;
    memory.import(&text)?;
    ws.save(&memory);
    let stats = memory.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    } else {
        println!(
            "Imported {} characters, {} recent and {} archived chapters",
            stats.characters, stats.recent_chapters, stats.long_term_chapters
        );
    }
    Ok(())
}

/// Text statistics of `file`, served from the persistent cache when the
/// content is unchanged.
pub fn analyze_file(ws: &Workspace, file: &Path) -> SmemResult<Analyzed<TextStats>> {
    let content = std::fs::read_to_string(file)?;
    let mut cache = ws.analysis_cache();
    let result = cache.get_or_analyze(TEXT_STATS_PREFIX, &content, text_stats);
    // A hit only changes access metadata, which `set` never wrote.
    if result.from_cache {
        cache.flush();
    }
    Ok(result)
}

/// Compute text statistics for a file through the persistent cache.
pub fn cmd_analyze(ws: &Workspace, file: &Path, json: bool) -> SmemResult<()> {
    let result = analyze_file(ws, file)?;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "stats": result.value,
                "fromCache": result.from_cache,
                "elapsedMicros": result.elapsed.as_micros() as u64,
            })
        );
    } else {
        let s = &result.value;
        println!("File: {}", file.display());
        println!("Characters: {}", s.characters);
        println!("Words: {}", s.words);
        println!("Sentences: {}", s.sentences);
        println!("Paragraphs: {}", s.paragraphs);
        println!("Dialogue lines: {}", s.dialogue_lines);
        println!(
            "Source: {} ({} us)",
            if result.from_cache { "cache" } else { "computed" },
            result.elapsed.as_micros()
        );
    }
    Ok(())
}

/// Print analysis cache counters.
pub fn cmd_cache_stats(ws: &Workspace, json: bool) -> SmemResult<()> {
    let cache = ws.analysis_cache();
    let stats = cache.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    } else {
        println!(
            "Entries: {}/{}",
            stats.total_entries,
            cache.config().max_entries
        );
        println!(
            "Size: {} / {}",
            format_size(stats.total_size as u64),
            format_size(cache.config().max_size_bytes as u64)
        );
        println!(
            "Hits: {}  Misses: {}  Hit rate: {:.1}%",
            stats.hits,
            stats.misses,
            stats.hit_rate * 100.0
        );
        if let Some(oldest) = stats.oldest_entry {
            println!("Oldest entry: {}", format_timestamp(oldest));
        }
        if let Some(newest) = stats.newest_entry {
            println!("Newest entry: {}", format_timestamp(newest));
        }
    }
    Ok(())
}

/// Sweep expired entries from the analysis cache.
pub fn cmd_cache_clean(ws: &Workspace, json: bool) -> SmemResult<()> {
    let mut cache = ws.analysis_cache();
    let removed = cache.clean_expired();
    if json {
        println!(
            "{}",
            serde_json::json!({"removed": removed, "remaining": cache.len()})
        );
    } else {
        println!("Removed {removed} expired entries ({} remaining)", cache.len());
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_timestamp(millis: u64) -> String {
    match chrono::DateTime::from_timestamp_millis(millis as i64) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} ms", millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_stats_counts_structure() {
        let text = "\"Run!\" she said.\nHe ran.\n\nThe end?";
        let s = text_stats(text);
        assert_eq!(s.words, 7);
        assert_eq!(s.paragraphs, 2);
        assert_eq!(s.dialogue_lines, 1);
        assert_eq!(s.sentences, 4);
    }

    #[test]
    fn repeated_analysis_is_counted_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = dir.path().join("chapter.txt");
        std::fs::write(&chapter, "One line.\n\nAnother line.").unwrap();
        let data = dir.path().join("data");
        let open = || Workspace::open(&data, StoryMemoryConfig::default()).unwrap();

        assert!(!analyze_file(&open(), &chapter).unwrap().from_cache);
        let second = analyze_file(&open(), &chapter).unwrap();
        assert!(second.from_cache);
        assert_eq!(second.value.paragraphs, 2);

        let stats = open().analysis_cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
