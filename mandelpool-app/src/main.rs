mod app_dir;
mod preferences;

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use mandelpool_render::{Engine, BLACK};

use preferences::{Preferences, SavedView};

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Poll the engine on our own timer until the current generation finishes.
///
/// Returns `false` if the workers exited without completing the frame.
fn poll_until_complete(engine: &Engine, refresh_rate: u32) -> bool {
    let interval = Duration::from_secs(1) / refresh_rate.max(1);
    let mut last_logged = -1.0f32;
    loop {
        thread::sleep(interval);
        if engine.is_complete() {
            return true;
        }
        let progress = engine.progress();
        if progress - last_logged >= 0.1 {
            debug!(
                generation = engine.generation(),
                percent = (progress * 100.0) as u32,
                elapsed_ms = engine.elapsed_millis(),
                "Rendering"
            );
            last_logged = progress;
        }
        if engine.live_workers() == 0 && !engine.is_complete() {
            warn!(generation = engine.generation(), "Render stopped before completion");
            return false;
        }
    }
}

fn report_frame(engine: &Engine) {
    let viewport = engine.viewport();
    let image = engine.current_image();
    let escaped = image.snapshot().iter().filter(|&&p| p != BLACK).count();
    let top_left = engine.complex_coordinate_at(0.0, 0.0);
    let centre =
        engine.complex_coordinate_at(viewport.width as f64 / 2.0, viewport.height as f64 / 2.0);
    info!(
        generation = engine.generation(),
        elapsed_ms = engine.elapsed_millis(),
        escaped,
        total = image.len(),
        scale = viewport.scale,
        "Frame at {centre} (top-left {top_left})"
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting mandelpool");

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(app_dir::preferences_path);
    let mut prefs = Preferences::load(&path);

    let viewport = match prefs.viewport() {
        Ok(vp) => vp,
        Err(e) => {
            error!("Invalid view in preferences: {e}");
            return ExitCode::FAILURE;
        }
    };
    let engine = match Engine::new(viewport, prefs.params) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Invalid render parameters: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        width = viewport.width,
        height = viewport.height,
        threads = prefs.params.thread_count,
        algorithm = prefs.params.algorithm.label(),
        "Engine started"
    );

    if !poll_until_complete(&engine, prefs.refresh_rate) {
        return ExitCode::FAILURE;
    }
    report_frame(&engine);

    let (cx, cy) = (viewport.width as f64 / 2.0, viewport.height as f64 / 2.0);
    for step in 1..=prefs.zoom_steps {
        if let Err(e) = engine.zoom(cx, cy, prefs.zoom_factor) {
            error!("Zoom step {step} rejected: {e}");
            break;
        }
        if !poll_until_complete(&engine, prefs.refresh_rate) {
            break;
        }
        report_frame(&engine);
    }

    prefs.view = Some(SavedView::from(&engine.viewport()));
    prefs.save(&path);
    ExitCode::SUCCESS
}
