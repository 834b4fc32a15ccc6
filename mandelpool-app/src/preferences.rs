use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use mandelpool_core::{Complex, RenderParams, Viewport};

// ---------------------------------------------------------------------------
// Saved view
// ---------------------------------------------------------------------------

/// Origin and scale captured so the next run resumes where this one ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub origin_re: f64,
    pub origin_im: f64,
    pub scale: f64,
}

impl From<&Viewport> for SavedView {
    fn from(vp: &Viewport) -> Self {
        Self {
            origin_re: vp.origin.re,
            origin_im: vp.origin.im,
            scale: vp.scale,
        }
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub params: RenderParams,
    /// Last view; `None` starts from the fitted framing.
    #[serde(default)]
    pub view: Option<SavedView>,
    /// Progress polls per second.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
    /// Number of zoom-at-centre steps to run after the first frame.
    #[serde(default)]
    pub zoom_steps: u32,
    #[serde(default = "default_zoom_factor")]
    pub zoom_factor: f64,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_refresh_rate() -> u32 {
    25
}
fn default_zoom_factor() -> f64 {
    0.5
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            params: RenderParams::default(),
            view: None,
            refresh_rate: default_refresh_rate(),
            zoom_steps: 0,
            zoom_factor: default_zoom_factor(),
        }
    }
}

impl Preferences {
    /// Load preferences from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(json) => match serde_json::from_str::<Preferences>(&json) {
                    Ok(prefs) => {
                        info!("Loaded preferences from {}", path.display());
                        return prefs;
                    }
                    Err(e) => {
                        error!("Failed to parse preferences: {e}");
                    }
                },
                Err(e) => {
                    error!("Failed to read preferences file: {e}");
                }
            }
        } else {
            debug!("No preferences file at {}", path.display());
        }
        Self::default()
    }

    /// Persist preferences to `path`.
    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, &json) {
                    error!("Failed to write preferences: {e}");
                } else {
                    debug!("Saved preferences");
                }
            }
            Err(e) => error!("Failed to serialize preferences: {e}"),
        }
    }

    /// The starting viewport: the saved view if any, otherwise the full set.
    pub fn viewport(&self) -> mandelpool_core::Result<Viewport> {
        match self.view {
            Some(v) => Viewport::new(
                Complex::new(v.origin_re, v.origin_im),
                v.scale,
                self.width,
                self.height,
            ),
            None => Viewport::fitted(self.width, self.height),
        }
    }
}
