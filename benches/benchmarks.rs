//! Criterion benchmarks for story-memory.

use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

use story_memory::config::CacheConfig;
use story_memory::engine::{ContentCache, TieredMemoryStore};
use story_memory::format::{load_memory, save_memory, MemoryByteStore, MEMORY_STORAGE_KEY};
use story_memory::types::{CharacterInfo, CharacterRole, RecentMemory, SearchOptions, WorldSetting};

const WORDS: &[&str] = &[
    "sword", "mountain", "river", "sect", "elder", "storm", "jade", "oath", "shadow", "dawn",
    "blade", "temple", "exile", "fire", "moon",
];

fn random_text(rng: &mut impl Rng, words: usize) -> String {
    (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a store with a full recent window and a deep archive.
fn make_story(chapters: u32, characters: usize) -> TieredMemoryStore {
    let mut rng = rand::thread_rng();
    let mut store = TieredMemoryStore::new(10);
    for i in 0..characters {
        let role = if i % 10 == 0 {
            CharacterRole::Protagonist
        } else {
            CharacterRole::Supporting
        };
        store.add_character(
            CharacterInfo::new(format!("character_{i}"), role).description(random_text(&mut rng, 12)),
        );
        store.add_world_setting(WorldSetting::new(
            format!("place_{i}"),
            "place",
            random_text(&mut rng, 8),
        ));
    }
    for n in 1..=chapters {
        let mut entry = RecentMemory::new(n, random_text(&mut rng, 20))
            .character(format!("character_{}", rng.gen_range(0..characters)));
        for _ in 0..rng.gen_range(0..5) {
            entry = entry.event(random_text(&mut rng, 3));
        }
        store.add_recent_memory(entry);
    }
    store
}

fn bench_cache_set(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let texts: Vec<String> = (0..1_000).map(|_| random_text(&mut rng, 200)).collect();
    let mut cache: ContentCache<usize> = ContentCache::new(CacheConfig::default().max_entries(100));

    c.bench_function("cache_set_lru_100", |b| {
        let mut i = 0;
        b.iter(|| {
            let text = &texts[i % texts.len()];
            let key = ContentCache::<usize>::key_for("bench", text);
            cache.set(&key, text.len(), text);
            i += 1;
        })
    });
}

fn bench_cache_hit(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let texts: Vec<String> = (0..100).map(|_| random_text(&mut rng, 2_000)).collect();
    let mut cache: ContentCache<usize> = ContentCache::new(CacheConfig::default());
    for text in &texts {
        cache.get_or_analyze("bench", text, |t| t.len());
    }

    c.bench_function("cache_hit_2k_words", |b| {
        let mut i = 0;
        b.iter(|| {
            let _ = cache.get_or_analyze("bench", &texts[i % texts.len()], |t| t.len());
            i += 1;
        })
    });
}

fn bench_add_recent_memory(c: &mut Criterion) {
    let mut store = make_story(500, 50);

    c.bench_function("add_recent_memory_archiving", |b| {
        let mut n = 501;
        b.iter(|| {
            let _ = store.add_recent_memory(
                RecentMemory::new(n, "a new chapter")
                    .event("duel")
                    .character("character_0"),
            );
            n += 1;
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let store = make_story(5_000, 200);
    let options = SearchOptions::default();

    c.bench_function("search_5k_chapters", |b| {
        b.iter(|| {
            let _ = store.search("shadow sword mountain", &options);
        })
    });
}

fn bench_smart_summary(c: &mut Criterion) {
    let store = make_story(1_000, 100);

    c.bench_function("smart_summary_1k_chapters", |b| {
        b.iter(|| {
            let _ = store.generate_smart_summary();
        })
    });
}

fn bench_save_load(c: &mut Criterion) {
    let store = make_story(1_000, 100);
    let mut bytes = MemoryByteStore::new();

    c.bench_function("save_memory_1k_chapters", |b| {
        b.iter(|| {
            let _ = save_memory(&store, &mut bytes, MEMORY_STORAGE_KEY);
        })
    });

    c.bench_function("load_memory_1k_chapters", |b| {
        b.iter(|| {
            let mut restored = TieredMemoryStore::new(10);
            let _ = load_memory(&mut restored, &bytes, MEMORY_STORAGE_KEY);
        })
    });
}

criterion_group!(
    benches,
    bench_cache_set,
    bench_cache_hit,
    bench_add_recent_memory,
    bench_search,
    bench_smart_summary,
    bench_save_load,
);
criterion_main!(benches);
