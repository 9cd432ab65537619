//! Generate a synthetic catalog for performance testing.
//!
//! Usage:
//!     cargo run --release --bin generate-perf-catalog -- --count 20000 [--seed 7] [output_path]
//!
//! Default output: target/perf_catalog.json

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sift::CandidateFields;
use std::path::PathBuf;

/// Words used to build titles and descriptions
const WORDS: &[&str] = &[
    "audio", "video", "editor", "player", "browser", "music", "photo", "image", "paint", "draw",
    "office", "writer", "notes", "mail", "chat", "terminal", "code", "studio", "games", "chess",
    "maps", "weather", "clock", "calendar", "tasks", "files", "backup", "disk", "network", "system",
    "monitor", "recorder", "reader", "book", "podcast", "radio", "camera", "scanner", "font", "color",
];

const DEVELOPERS: &[&str] = &[
    "GNOME", "KDE", "Mozilla", "The Document Foundation", "Blender Foundation", "Valve",
    "Independent", "Open Source Community", "Flathub",
];

const TLDS: &[&str] = &["org", "com", "io", "dev", "net"];

#[derive(Parser, Debug)]
#[command(about = "Write a synthetic software catalog as JSON")]
struct Args {
    /// Number of entries to generate
    #[arg(long, default_value_t = 20_000)]
    count: usize,

    /// RNG seed, for reproducible catalogs
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Share of entries marked unsearchable
    #[arg(long, default_value_t = 0.02)]
    unsearchable: f64,

    output: Option<PathBuf>,
}

fn pick<'a>(rng: &mut StdRng, words: &[&'a str]) -> &'a str {
    words[rng.gen_range(0..words.len())]
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn generate_entry(rng: &mut StdRng, index: usize, unsearchable: f64) -> CandidateFields {
    let title_len = rng.gen_range(1..=3);
    let title_words: Vec<String> = (0..title_len).map(|_| capitalize(pick(rng, WORDS))).collect();
    let title = title_words.join(" ");

    let id = format!(
        "{}.{}.{}{}",
        pick(rng, TLDS),
        pick(rng, WORDS),
        title_words.concat(),
        index
    );

    let description_len = rng.gen_range(8..=30);
    let description: Vec<&str> = (0..description_len).map(|_| pick(rng, WORDS)).collect();

    let mut fields = CandidateFields::new(id)
        .with_title(title)
        .with_developer(pick(rng, DEVELOPERS))
        .with_description(description.join(" "))
        .with_searchable(!rng.gen_bool(unsearchable.clamp(0.0, 1.0)));

    if rng.gen_bool(0.5) {
        let keywords: Vec<&str> = (0..rng.gen_range(1..=4)).map(|_| pick(rng, WORDS)).collect();
        fields = fields.with_search_tokens(keywords.join(" "));
    }
    fields
}

fn main() -> Result<()> {
    let args = Args::parse();

    let output_path = args.output.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .map(|p| p.join("target"))
            .unwrap_or_else(|| PathBuf::from("target"))
            .join("perf_catalog.json")
    });

    println!("Generating {} catalog entries...", args.count);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let entries: Vec<CandidateFields> = (0..args.count)
        .map(|i| generate_entry(&mut rng, i, args.unsearchable))
        .collect();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(&output_path, json).with_context(|| format!("writing {}", output_path.display()))?;

    println!("Done! Output: {}", output_path.display());
    Ok(())
}
