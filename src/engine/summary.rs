//! Derived views over the core tier: relationship graph and digest text.

use std::collections::BTreeMap;

use crate::types::{CharacterInfo, CoreMemory, LongTermMemory, RecentMemory};

/// Characters listed in a smart summary.
pub const SUMMARY_CHARACTER_LIMIT: usize = 5;
/// World settings listed in a smart summary.
pub const SUMMARY_SETTING_LIMIT: usize = 5;
/// Open plot points listed in a smart summary.
pub const SUMMARY_PLOT_LIMIT: usize = 5;
/// Recent chapters listed in a smart summary.
pub const SUMMARY_RECENT_CHAPTERS: usize = 3;
/// Archived chapters listed in a smart summary.
pub const SUMMARY_ARCHIVE_LIMIT: usize = 3;

/// Directed adjacency from each character to the names it declares a
/// relationship with. Every character has an entry, possibly empty. No
/// reverse edges are inferred.
pub fn relationship_graph(characters: &[CharacterInfo]) -> BTreeMap<String, Vec<String>> {
    characters
        .iter()
        .map(|c| (c.name.clone(), c.relationships.keys().cloned().collect()))
        .collect()
}

/// Deterministic plain-text digest for feeding an external summarizer.
///
/// Sections: core cast (protagonists first), world, open plot threads,
/// power system, the newest recent chapters, and the most important
/// archived chapters. Empty sections are omitted.
pub fn smart_summary(
    core: &CoreMemory,
    recent: &[RecentMemory],
    long_term: &[LongTermMemory],
) -> String {
    let mut out = String::new();

    let mut cast: Vec<&CharacterInfo> = core.characters.iter().collect();
    cast.sort_by_key(|c| c.role.rank());
    if !cast.is_empty() {
        out.push_str("## Core Characters\n");
        for c in cast.iter().take(SUMMARY_CHARACTER_LIMIT) {
            out.push_str(&format!("- {} [{}]", c.name, c.role));
            if !c.description.is_empty() {
                out.push_str(&format!(": {}", c.description));
            }
            if let Some(status) = &c.status {
                out.push_str(&format!(" (status: {status})"));
            }
            out.push('\n');
        }
    }

    if !core.world_settings.is_empty() {
        out.push_str("## World\n");
        for s in core.world_settings.iter().take(SUMMARY_SETTING_LIMIT) {
            out.push_str(&format!("- {}", s.title));
            if !s.category.is_empty() {
                out.push_str(&format!(" ({})", s.category));
            }
            if !s.description.is_empty() {
                out.push_str(&format!(": {}", s.description));
            }
            out.push('\n');
        }
    }

    let open: Vec<_> = core.main_plot.iter().filter(|p| !p.resolved).collect();
    if !open.is_empty() {
        out.push_str("## Open Plot Threads\n");
        let skip = open.len().saturating_sub(SUMMARY_PLOT_LIMIT);
        for p in open.iter().skip(skip) {
            out.push_str(&format!("- Ch.{} {} [{}]", p.chapter, p.title, p.kind.name()));
            if !p.description.is_empty() {
                out.push_str(&format!(": {}", p.description));
            }
            out.push('\n');
        }
    }

    let power = &core.power_system;
    if !power.is_empty() {
        out.push_str("## Power System\n");
        if !power.levels.is_empty() {
            out.push_str(&format!("Levels: {}\n", power.levels.join(" > ")));
        }
        if !power.rules.is_empty() {
            out.push_str(&format!("Rules: {}\n", power.rules.join("; ")));
        }
        if !power.limitations.is_empty() {
            out.push_str(&format!("Limitations: {}\n", power.limitations.join("; ")));
        }
    }

    if !recent.is_empty() {
        out.push_str("## Recent Chapters\n");
        for m in recent.iter().take(SUMMARY_RECENT_CHAPTERS) {
            out.push_str(&format!("- Ch.{}: {}", m.chapter_number, m.summary));
            if !m.key_events.is_empty() {
                out.push_str(&format!(" | Events: {}", m.key_events.join("; ")));
            }
            out.push('\n');
        }
    }

    if !long_term.is_empty() {
        let mut archived: Vec<&LongTermMemory> = long_term.iter().collect();
        archived.sort_by(|a, b| {
            b.importance
                .cmp(&a.importance)
                .then(a.chapter_number.cmp(&b.chapter_number))
        });
        out.push_str("## Archived Highlights\n");
        for m in archived.iter().take(SUMMARY_ARCHIVE_LIMIT) {
            out.push_str(&format!(
                "- Ch.{} (importance {}): {}\n",
                m.chapter_number, m.importance, m.summary
            ));
        }
    }

    out
}
