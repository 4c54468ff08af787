//! vkframe - Main Entry Point
//!
//! Opens a window, draws a coloured quad every frame and rebuilds the
//! swapchain whenever the window changes. Configuration is read from
//! `vkframe.toml`, or from the file named by `VKFRAME_CONFIG`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use vkframe_core::{Config, Timer};
use vkframe_platform::Window;
use vkframe_renderer::{ErrorClass, FrameOutcome, Renderer};

const CONFIG_ENV: &str = "VKFRAME_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "vkframe.toml";
const STATS_INTERVAL: Duration = Duration::from_secs(5);

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn run(config: &Config) -> Result<()> {
    let mut window = Window::new(
        config.window.width,
        config.window.height,
        &config.window.title,
    )
    .context("Failed to create window")?;

    let mut renderer = Renderer::new(&window, config).context("Failed to create renderer")?;
    info!("Initialization complete, entering main loop");

    let mut timer = Timer::new(STATS_INTERVAL);
    let mut last_presented = 0;

    while !window.should_close() {
        window.poll_events();
        if window.should_close() {
            break;
        }

        match renderer.render_frame(&mut window) {
            Ok(FrameOutcome::Presented { .. }) => {}
            Ok(FrameOutcome::SurfaceStale) => debug!("Surface stale, frame skipped"),
            Err(e) => match e.class() {
                ErrorClass::TransientFrame => warn!("Frame skipped: {}", e),
                ErrorClass::FatalInit => return Err(e).context("Renderer failed"),
            },
        }

        if let Some(interval) = timer.tick() {
            let stats = renderer.stats();
            let fps = (stats.presented - last_presented) as f64 / interval.as_secs_f64();
            last_presented = stats.presented;
            info!(
                "{:.1} fps | presented {} | rebuilds {} | skipped {}",
                fps, stats.presented, stats.rebuilds, stats.skipped
            );
        }
    }

    info!(
        "Shutting down after {:.1}s",
        timer.elapsed().as_secs_f64()
    );

    // The renderer's surface must go before the window it was created from
    drop(renderer);
    drop(window);
    Ok(())
}

fn main() -> Result<()> {
    vkframe_core::init_logging();
    info!("Starting vkframe");

    let path = config_path();
    let config = Config::load(&path).with_context(|| format!("Invalid config {:?}", path))?;

    if let Err(e) = run(&config) {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
