//! CLI entry point for the `smem` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use story_memory::cli::commands::{self, Workspace};
use story_memory::config::{load_config, resolve_data_dir, StoryMemoryConfig};
use story_memory::types::{
    CharacterInfo, CharacterRole, PlotKind, PlotPoint, RecentMemory, SearchOptions, SmemError,
    WorldSetting,
};

#[derive(Parser)]
#[command(
    name = "smem",
    about = "Story memory CLI: tiered chapter memory and cached text analysis"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Data directory (defaults to $SMEM_DIR, then ./.smem)
    #[arg(long)]
    data_dir: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty memory store
    Init {
        /// Overwrite existing memory
        #[arg(long)]
        force: bool,
    },
    /// Add or replace a character in core memory
    AddCharacter {
        /// Character name (identity key)
        name: String,
        /// Role: protagonist, antagonist, supporting, minor
        #[arg(long, default_value = "supporting")]
        role: String,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
        /// Personality trait (repeatable)
        #[arg(long = "trait")]
        traits: Vec<String>,
        /// Relationship as NAME=RELATION (repeatable)
        #[arg(long = "relation")]
        relations: Vec<String>,
        /// Chapter of first appearance
        #[arg(long)]
        first_appearance: Option<u32>,
    },
    /// Add or replace a world setting
    AddSetting {
        /// Setting title (identity key)
        title: String,
        /// Category, e.g. location, faction, artefact
        #[arg(long, default_value = "")]
        category: String,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add or replace a plot point
    AddPlot {
        /// Chapter number
        chapter: u32,
        /// Plot point title
        title: String,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
        /// Kind: main, subplot, foreshadowing
        #[arg(long, default_value = "main")]
        kind: String,
    },
    /// Record a chapter digest in recent memory
    AddChapter {
        /// Chapter number
        chapter: u32,
        /// Chapter summary
        summary: String,
        /// Key event (repeatable)
        #[arg(long = "event")]
        events: Vec<String>,
        /// Character appearing in the chapter (repeatable)
        #[arg(long = "character")]
        characters: Vec<String>,
        /// Location visited in the chapter (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,
    },
    /// Keyword search across all memory tiers
    Search {
        /// Query text
        query: String,
        /// Restrict to a core type: character, plot, world
        #[arg(long = "type")]
        kind: Option<String>,
        /// Maximum results
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Minimum relevance 0.0-1.0
        #[arg(long, default_value = "0.3")]
        min_relevance: f64,
    },
    /// Print a digest of the most important facts
    Summary,
    /// Print the character relationship graph
    Graph,
    /// Statistics about the memory tiers
    Stats,
    /// Export memory as a versioned JSON snapshot
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace memory with a JSON snapshot
    Import {
        /// Snapshot file
        file: PathBuf,
    },
    /// Compute text statistics for a file, using the analysis cache
    Analyze {
        /// Text file to analyze
        file: PathBuf,
    },
    /// Analysis cache statistics
    CacheStats,
    /// Remove expired analysis cache entries
    CacheClean,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(3);
            }
        },
        None => StoryMemoryConfig::default(),
    };
    let data_dir = resolve_data_dir(cli.data_dir.as_deref().or(config.data_dir.as_deref()));

    let mut ws = match Workspace::open(&data_dir, config) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(exit_code(&e));
        }
    };

    let result = match cli.command {
        Commands::Init { force } => commands::cmd_init(&mut ws, force, json),
        Commands::AddCharacter {
            name,
            role,
            description,
            traits,
            relations,
            first_appearance,
        } => {
            let role = match CharacterRole::from_name(&role) {
                Some(role) => role,
                None => {
                    eprintln!("Invalid role: {}", role);
                    process::exit(3);
                }
            };
            let mut info = CharacterInfo::new(name, role).description(description);
            info.traits = traits;
            info.first_appearance = first_appearance;
            for relation in relations {
                match relation.split_once('=') {
                    Some((other, label)) => {
                        info = info.related_to(other.trim(), label.trim());
                    }
                    None => {
                        eprintln!("Invalid relation (expected NAME=RELATION): {}", relation);
                        process::exit(3);
                    }
                }
            }
            commands::cmd_add_character(&mut ws, info, json)
        }
        Commands::AddSetting {
            title,
            category,
            description,
        } => commands::cmd_add_setting(
            &mut ws,
            WorldSetting::new(title, category, description),
            json,
        ),
        Commands::AddPlot {
            chapter,
            title,
            description,
            kind,
        } => {
            let kind = match PlotKind::from_name(&kind) {
                Some(kind) => kind,
                None => {
                    eprintln!("Invalid plot kind: {}", kind);
                    process::exit(3);
                }
            };
            let point = PlotPoint::new(chapter, title, description).kind(kind);
            commands::cmd_add_plot(&mut ws, point, json)
        }
        Commands::AddChapter {
            chapter,
            summary,
            events,
            characters,
            locations,
        } => {
            let mut entry = RecentMemory::new(chapter, summary);
            entry.key_events = events;
            entry.characters = characters;
            entry.locations = locations;
            commands::cmd_add_chapter(&mut ws, entry, json)
        }
        Commands::Search {
            query,
            kind,
            limit,
            min_relevance,
        } => {
            let options = SearchOptions::default()
                .filter(kind.as_deref().unwrap_or(""))
                .limit(limit)
                .min_relevance(min_relevance);
            commands::cmd_search(&ws, &query, &options, json)
        }
        Commands::Summary => commands::cmd_summary(&ws),
        Commands::Graph => commands::cmd_graph(&ws, json),
        Commands::Stats => commands::cmd_stats(&ws, json),
        Commands::Export { output } => commands::cmd_export(&ws, output.as_deref()),
        Commands::Import { file } => commands::cmd_import(&mut ws, &file, json),
        Commands::Analyze { file } => commands::cmd_analyze(&ws, &file, json),
        Commands::CacheStats => commands::cmd_cache_stats(&ws, json),
        Commands::CacheClean => commands::cmd_cache_clean(&ws, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(e: &SmemError) -> i32 {
    match e {
        SmemError::Io(_) => 1,
        SmemError::Malformed(_)
        | SmemError::UnsupportedVersion(_)
        | SmemError::WrongSnapshotKind { .. }
        | SmemError::Compression(_) => 2,
        SmemError::Config(_) => 3,
        SmemError::CharacterNotFound(_) => 4,
        _ => 5,
    }
}
