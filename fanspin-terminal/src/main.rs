//! fanspin - Fan Animation in the terminal
//!
//! Loads a fan blade and its frame, spins the blade under keyboard control
//! and writes the final scene to an Open Inventor file when the viewer is
//! closed.
//! Controls:
//!   - Up / Down: raise / lower the target speed
//!   - Left: stop quickly
//!   - Right: stop at once and reset the blade
//!   - Q / ESC: close the viewer

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use fanspin_core::{load_mesh_or_empty, write_scene_to_path, FanConfig, FanScene, SpinController};
use fanspin_terminal::TerminalApp;

#[derive(Parser)]
#[command(name = "fanspin")]
#[command(about = "Spin a fan blade inside its frame and export the scene as Open Inventor")]
#[command(version)]
struct Cli {
    /// Blade mesh (.wrl or .stl)
    #[arg(long, default_value = "noctua nf-a15 blade.wrl")]
    blade: PathBuf,

    /// Frame mesh (.wrl or .stl)
    #[arg(long, default_value = "noctua nf-a15 frame.wrl")]
    frame: PathBuf,

    /// Inventor file written after the viewer closes
    #[arg(short, long, default_value = "AnimateFan.iv")]
    output: PathBuf,

    /// TOML file overriding animation, scene and viewer settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Animation frame rate (overrides the config file)
    #[arg(long)]
    fps: Option<u32>,

    /// Launch the viewer without waiting for Enter
    #[arg(long)]
    no_wait: bool,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => FanConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => FanConfig::default(),
    };
    if let Some(fps) = cli.fps {
        config.animation.fps = fps;
        config.validate()?;
    }

    let blade = load_mesh_or_empty(&cli.blade, "Blade");
    let frame = load_mesh_or_empty(&cli.frame, "Frame");
    let fan = FanScene::build(blade, frame, &config.scene)?;
    log::info!("The model components are built");

    let spin = SpinController::new(config.animation.clone());
    let mut app = TerminalApp::new(fan, spin, &config).context("Failed to set up the viewer")?;

    if !cli.no_wait {
        print!("Press Enter to launch the viewer: ");
        io::stdout().flush()?;
        io::stdin().lock().read_line(&mut String::new())?;
    }

    app.run().context("Viewer failed")?;
    log::info!("The viewer is closed");

    let fan = app.into_scene();
    log::info!("Generating the IV file...");
    write_scene_to_path(&fan.scene, &cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    log::info!("The output file is generated as {}", cli.output.display());

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
