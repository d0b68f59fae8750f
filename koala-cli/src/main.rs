//! Koala layout CLI
//!
//! Loads a JSON scene, ticks the engine until layout settles and prints
//! the box tree.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use koala_layout::Scene;
use owo_colors::OwoColorize;

/// Lay out a scene and print its box tree
#[derive(Parser, Debug)]
#[command(name = "koala-layout")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r"EXAMPLES:
    # Lay out a scene at its own viewport size
    koala-layout page.json

    # Override the viewport
    koala-layout page.json --width 1280 --height 720

    # Show per-pass reflow decisions
    koala-layout page.json --log-level debug
")]
struct Cli {
    /// Path to the JSON scene
    #[arg(value_name = "SCENE")]
    scene: PathBuf,

    /// Viewport width, overriding the scene's config
    #[arg(long)]
    width: Option<f32>,

    /// Viewport height, overriding the scene's config
    #[arg(long)]
    height: Option<f32>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: log::LevelFilter,

    /// Give up after this many ticks
    #[arg(long, default_value = "16")]
    max_ticks: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_default_env()
        .init();

    let json = fs::read_to_string(&cli.scene).with_context(|| format!("reading {}", cli.scene.display()))?;
    let mut scene = Scene::from_json(&json).with_context(|| format!("parsing {}", cli.scene.display()))?;
    if let Some(width) = cli.width {
        scene.config.viewport_width = width;
    }
    if let Some(height) = cli.height {
        scene.config.viewport_height = height;
    }
    let mut loaded = scene.load().context("loading scene")?;
    let engine = &mut loaded.engine;

    // Image completions arrive on later ticks; keep going until a tick
    // finds nothing to do.
    let mut ticks = 0;
    let mut passes = 0;
    while ticks < cli.max_ticks {
        ticks += 1;
        if engine.tick() {
            passes += 1;
        } else if engine.load_delay_count() == 0 {
            break;
        }
    }
    if engine.is_dirty() || engine.load_delay_count() > 0 {
        log::warn!(
            "layout not settled after {ticks} ticks, {} images pending",
            engine.load_delay_count()
        );
    }

    println!(
        "{} {}x{}",
        "=== Box Tree ===".bold(),
        engine.config().viewport_width,
        engine.config().viewport_height
    );
    print!("{}", engine.dump());
    let stats = engine.stats();
    println!(
        "\n{} {passes} passes in {ticks} ticks; last pass laid out {} blocks, reused {}",
        "===".bold(),
        stats.blocks_laid_out.green(),
        stats.blocks_skipped.cyan()
    );
    println!("{} {} stacking contexts", "===".bold(), engine.paint_order().len());
    Ok(())
}
