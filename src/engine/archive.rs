//! Archival transform from recent memory to long-term memory.

use crate::types::{CharacterInfo, LongTermMemory, RecentMemory};

use super::relevance::count_core_mentions;

/// Importance every archived chapter starts from.
pub const BASE_IMPORTANCE: u32 = 50;
/// Bonus per key event.
pub const EVENT_WEIGHT: u32 = 5;
/// Ceiling on the total key-event bonus.
pub const EVENT_BONUS_CAP: u32 = 20;
/// Bonus per protagonist/antagonist appearing in the chapter.
pub const CORE_CHARACTER_WEIGHT: u32 = 10;
/// Ceiling on the final importance.
pub const MAX_IMPORTANCE: u32 = 100;
/// How many key events are folded into the keyword list.
pub const KEYWORD_EVENT_COUNT: usize = 3;

/// Calculate the archival importance of a chapter.
///
/// Formula: 50 + min(5 * events, 20) + 10 * core_mentions, clamped to 100.
pub fn calculate_importance(entry: &RecentMemory, core_cast: &[CharacterInfo]) -> u8 {
    let events = entry.key_events.len() as u32;
    let event_bonus = events.saturating_mul(EVENT_WEIGHT).min(EVENT_BONUS_CAP);
    let mentions = count_core_mentions(core_cast, &entry.characters) as u32;
    let core_bonus = mentions.saturating_mul(CORE_CHARACTER_WEIGHT);
    (BASE_IMPORTANCE + event_bonus)
        .saturating_add(core_bonus)
        .min(MAX_IMPORTANCE) as u8
}

/// Union of characters, locations and the first few key events, in that
/// order, without duplicates.
pub fn derive_keywords(entry: &RecentMemory) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let candidates = entry
        .characters
        .iter()
        .chain(entry.locations.iter())
        .chain(entry.key_events.iter().take(KEYWORD_EVENT_COUNT));
    for word in candidates {
        let word = word.trim();
        if !word.is_empty() && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Convert an evicted recent entry into its archived form.
pub fn archive(entry: RecentMemory, core_cast: &[CharacterInfo]) -> LongTermMemory {
    let importance = calculate_importance(&entry, core_cast);
    let keywords = derive_keywords(&entry);
    LongTermMemory {
        chapter_number: entry.chapter_number,
        summary: entry.summary,
        keywords,
        importance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CharacterRole;

    fn chapter(events: usize) -> RecentMemory {
        let mut entry = RecentMemory::new(1, "summary");
        for i in 0..events {
            entry = entry.event(format!("event {}", i));
        }
        entry
    }

    #[test]
    fn base_importance_without_events() {
        assert_eq!(calculate_importance(&chapter(0), &[]), 50);
    }

    #[test]
    fn event_bonus_is_capped() {
        assert_eq!(calculate_importance(&chapter(2), &[]), 60);
        assert_eq!(calculate_importance(&chapter(4), &[]), 70);
        assert_eq!(calculate_importance(&chapter(9), &[]), 70);
    }

    #[test]
    fn core_cast_raises_importance_up_to_cap() {
        let cast: Vec<CharacterInfo> = (0..5)
            .map(|i| CharacterInfo::new(format!("hero{}", i), CharacterRole::Protagonist))
            .collect();
        let mut entry = chapter(4);
        entry.characters = cast.iter().map(|c| c.name.clone()).collect();
        assert_eq!(calculate_importance(&entry, &cast), 100);

        entry.characters.truncate(2);
        assert_eq!(calculate_importance(&entry, &cast), 90);
    }

    #[test]
    fn keywords_take_first_three_events() {
        let entry = RecentMemory::new(4, "s")
            .character("Lin")
            .location("Cloud Peak")
            .location("Lin")
            .event("duel")
            .event("escape")
            .event("oath")
            .event("betrayal");
        let archived = archive(entry, &[]);
        assert_eq!(
            archived.keywords,
            vec!["Lin", "Cloud Peak", "duel", "escape", "oath"]
        );
        assert_eq!(archived.chapter_number, 4);
    }
}
