//! Headless driver for `particle-core`.
//!
//! Builds a demo scene, steps it at a fixed rate and logs what a renderer
//! would receive. Use `RUST_LOG=debug` (or `-v`) to follow the group's
//! internals.

mod scene;

use anyhow::Result;
use clap::Parser;

use scene::{Scene, SceneKind};

#[derive(Parser, Debug)]
#[command(name = "particle-run", about = "Runs a particle scene without a window")]
struct Cli {
    /// Scene to simulate
    #[arg(value_enum, default_value_t = SceneKind::Fountain)]
    scene: SceneKind,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 300)]
    frames: u32,

    /// Time step in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Seed of the random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Log a summary every N frames
    #[arg(long, default_value_t = 60)]
    report_every: u32,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut scene = Scene::new(cli.scene, cli.seed)?;
    for frame in 1..=cli.frames {
        let alive = scene.step_once(cli.dt);
        if cli.report_every > 0 && frame % cli.report_every == 0 {
            scene.report(frame);
        }
        if !alive {
            log::info!("Scene went idle after {frame} frames");
            break;
        }
    }
    scene.report(cli.frames);
    Ok(())
}
