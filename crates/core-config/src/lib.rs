//! Configuration: the `miniread.toml` tuning file and the JSON settings store.
//!
//! The tuning file carries engine and view knobs that rarely change. It is
//! read once at startup; a missing or malformed file yields defaults so a bad
//! edit never keeps the reader from starting. Out-of-range values are clamped
//! by [`Config::sanitize`], each clamp logged on the `config` target.
//!
//! User state that changes while reading (recent files, reading positions,
//! window and font preferences) lives in [`store::SettingsStore`].

use anyhow::Result;
use core_state::ReaderConfig;
use core_text::BreakPolicy;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub mod store;

pub use store::{DEFAULT_MAX_RECENT_FILES, ReadingRecord, SettingsStore};

#[cfg(test)]
mod test_support;

const CONFIG_FILE_NAME: &str = "miniread.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReaderSection {
    pub history_capacity: usize,
    pub retreat_sample_chars: usize,
    pub tail_sample_chars: usize,
}

impl Default for ReaderSection {
    fn default() -> Self {
        let defaults = ReaderConfig::default();
        Self {
            history_capacity: defaults.history_capacity,
            retreat_sample_chars: defaults.retreat_sample_chars,
            tail_sample_chars: defaults.tail_sample_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BreaksSection {
    pub punct_tolerance: f64,
    pub quote_tolerance: f64,
    pub quote_lookahead: f64,
    pub backtrack_window: f64,
}

impl Default for BreaksSection {
    fn default() -> Self {
        let policy = BreakPolicy::default();
        Self {
            punct_tolerance: policy.punct_tolerance,
            quote_tolerance: policy.quote_tolerance,
            quote_lookahead: policy.quote_lookahead,
            backtrack_window: policy.backtrack_window,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewSection {
    /// Blank columns kept on each side of the display line.
    pub margin: u16,
    /// Page turns between reading-position saves.
    pub position_save_interval: u32,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            margin: 1,
            position_save_interval: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub reader: ReaderSection,
    #[serde(default)]
    pub breaks: BreaksSection,
    #[serde(default)]
    pub view: ViewSection,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,
    pub file: ConfigFile,
}

/// Local `miniread.toml` first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("miniread").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    let mut cfg = match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Config {
            raw: Some(content),
            file,
        },
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Config::default()
        }
    };
    cfg.sanitize();
    Ok(cfg)
}

impl Config {
    /// Clamp out-of-range values into their usable domain. Returns the
    /// number of fields changed.
    pub fn sanitize(&mut self) -> usize {
        let mut clamped = 0;
        let reader = &mut self.file.reader;
        clamped += clamp_min("reader.history_capacity", &mut reader.history_capacity, 1);
        clamped += clamp_min("reader.retreat_sample_chars", &mut reader.retreat_sample_chars, 1);
        clamped += clamp_min("reader.tail_sample_chars", &mut reader.tail_sample_chars, 1);

        let breaks = &mut self.file.breaks;
        clamped += clamp_range("breaks.punct_tolerance", &mut breaks.punct_tolerance, 1.0, f64::MAX);
        clamped += clamp_range("breaks.quote_tolerance", &mut breaks.quote_tolerance, 1.0, f64::MAX);
        clamped += clamp_range("breaks.quote_lookahead", &mut breaks.quote_lookahead, 0.0, 1.0);
        clamped += clamp_range("breaks.backtrack_window", &mut breaks.backtrack_window, 0.0, 1.0);

        let view = &mut self.file.view;
        clamped += clamp_min(
            "view.position_save_interval",
            &mut view.position_save_interval,
            1,
        );
        clamped
    }

    /// Engine configuration assembled from the `[reader]` and `[breaks]` sections.
    pub fn reader_config(&self) -> ReaderConfig {
        let reader = &self.file.reader;
        let breaks = &self.file.breaks;
        ReaderConfig {
            history_capacity: reader.history_capacity,
            retreat_sample_chars: reader.retreat_sample_chars,
            tail_sample_chars: reader.tail_sample_chars,
            breaks: BreakPolicy {
                punct_tolerance: breaks.punct_tolerance,
                quote_tolerance: breaks.quote_tolerance,
                quote_lookahead: breaks.quote_lookahead,
                backtrack_window: breaks.backtrack_window,
            },
        }
    }

    /// Display width for a terminal of `columns`, after the side margins.
    pub fn text_width(&self, columns: u16) -> u32 {
        let margin = self.file.view.margin.saturating_mul(2);
        u32::from(columns.saturating_sub(margin).max(1))
    }
}

fn clamp_min<T>(field: &'static str, value: &mut T, min: T) -> usize
where
    T: PartialOrd + Copy + std::fmt::Debug,
{
    if *value < min {
        info!(target: "config", field, raw = ?*value, clamped = ?min, "config_value_clamped");
        *value = min;
        1
    } else {
        0
    }
}

fn clamp_range(field: &'static str, value: &mut f64, min: f64, max: f64) -> usize {
    let raw = *value;
    let clamped = if raw.is_nan() { min } else { raw.clamp(min, max) };
    if clamped != raw {
        info!(target: "config", field, raw, clamped, "config_value_clamped");
        *value = clamped;
        1
    } else {
        0
    }
}
