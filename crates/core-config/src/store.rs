//! Persistent user settings kept as a JSON document.
//!
//! The document is a loose tree rather than a typed struct so hosts can keep
//! their own keys under the known groups (`window`, `font`, `display`,
//! `hotkeys`) without a schema change here. Reading state has typed helpers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const DEFAULT_MAX_RECENT_FILES: usize = 10;

/// Per-file reading record stored under `reading_history`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub char_index: u64,
    /// Unix time in seconds.
    #[serde(default)]
    pub last_read: f64,
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    data: Value,
}

impl SettingsStore {
    /// `~/.miniread/config.json`, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".miniread").join("config.json"))
    }

    /// Built-in settings tree.
    pub fn defaults() -> Value {
        json!({
            "window": {
                "x": 100,
                "y": 100,
                "width": 800,
                "height": 60,
                "opacity": 0.95,
                "always_on_top": true
            },
            "font": {
                "family": "Microsoft YaHei",
                "size": 16,
                "bold": false,
                "italic": false,
                "color": "#FFFFFF"
            },
            "display": {
                "background_color": "#2D2D2D",
                "text_color": "#FFFFFF",
                "border_radius": 8,
                "show_controls": true
            },
            "hotkeys": {
                "toggle_visibility": "ctrl+shift+r",
                "increase_font": "ctrl+shift+up",
                "decrease_font": "ctrl+shift+down",
                "open_file": "ctrl+shift+o"
            },
            "recent_files": [],
            "last_position": {
                "file": "",
                "char_index": 0
            },
            "reading_history": {}
        })
    }

    /// Load `path` merged over the defaults. A missing file is created; a
    /// corrupt one is ignored (and overwritten on the next save).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut data = Self::defaults();
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(loaded) => merge_top_level(&mut data, loaded),
                Err(e) => {
                    warn!(target: "config.store", path = %path.display(), error = %e, "store_corrupt_using_defaults");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let store = Self { path, data };
                store.save()?;
                debug!(target: "config.store", path = %store.path.display(), "store_created");
                return Ok(store);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading settings {}", path.display()));
            }
        }
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating settings dir {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing settings {}", self.path.display()))?;
        debug!(target: "config.store", path = %self.path.display(), "store_saved");
        Ok(())
    }

    /// Value at a dot-separated path such as `"font.size"`.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        key_path
            .split('.')
            .try_fold(&self.data, |node, key| node.as_object()?.get(key))
    }

    /// Set the value at a dot-separated path, creating intermediate objects.
    /// Non-object intermediates are replaced.
    pub fn set(&mut self, key_path: &str, value: Value) {
        let mut node = &mut self.data;
        for key in key_path.split('.') {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = &mut node[key];
        }
        *node = value;
    }

    pub fn set_and_save(&mut self, key_path: &str, value: Value) -> Result<()> {
        self.set(key_path, value);
        self.save()
    }

    pub fn recent_files(&self) -> Vec<String> {
        self.get("recent_files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Move `file` to the front of the recent list, keeping at most `max` entries.
    pub fn add_recent_file(&mut self, file: &str, max: usize) -> Result<()> {
        let mut recent = self.recent_files();
        recent.retain(|f| f != file);
        recent.insert(0, file.to_string());
        recent.truncate(max);
        self.set("recent_files", json!(recent));
        self.save()
    }

    pub fn save_reading_position(&mut self, file: &str, char_index: usize) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.save_reading_position_at(file, char_index, now)
    }

    /// [`save_reading_position`](Self::save_reading_position) with an explicit timestamp.
    pub fn save_reading_position_at(
        &mut self,
        file: &str,
        char_index: usize,
        last_read: f64,
    ) -> Result<()> {
        let record = ReadingRecord {
            char_index: char_index as u64,
            last_read,
        };
        self.set(
            "last_position",
            json!({ "file": file, "char_index": record.char_index }),
        );
        let mut history = self.history_object();
        history.insert(file.to_string(), serde_json::to_value(record)?);
        self.set("reading_history", Value::Object(history));
        debug!(target: "config.store", char_index, "reading_position_saved");
        self.save()
    }

    /// Saved offset for `file`: its history record, else `last_position`
    /// when it names the same file, else 0.
    pub fn reading_position(&self, file: &str) -> usize {
        let from_history = self
            .get("reading_history")
            .and_then(|h| h.get(file))
            .map(|record| record.get("char_index").and_then(Value::as_u64).unwrap_or(0));
        let index = from_history.or_else(|| {
            let last = self.get("last_position")?;
            (last.get("file")?.as_str()? == file)
                .then(|| last.get("char_index").and_then(Value::as_u64).unwrap_or(0))
        });
        index
            .and_then(|i| usize::try_from(i).ok())
            .unwrap_or(0)
    }

    /// File named by `last_position`, if any.
    pub fn last_file(&self) -> Option<String> {
        self.get("last_position.file")
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
    }

    /// Well-formed entries of `reading_history`.
    pub fn reading_history(&self) -> BTreeMap<String, ReadingRecord> {
        self.history_object()
            .into_iter()
            .filter_map(|(file, record)| {
                serde_json::from_value::<ReadingRecord>(record)
                    .ok()
                    .map(|r| (file, r))
            })
            .collect()
    }

    /// Drop the record for `file`. Returns whether one existed.
    pub fn remove_reading_history(&mut self, file: &str) -> Result<bool> {
        let mut history = self.history_object();
        if history.remove(file).is_none() {
            return Ok(false);
        }
        self.set("reading_history", Value::Object(history));
        self.save()?;
        Ok(true)
    }

    pub fn reset_to_default(&mut self) -> Result<()> {
        self.data = Self::defaults();
        self.save()
    }

    fn history_object(&self) -> Map<String, Value> {
        self.get("reading_history")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

/// Keep only known top-level keys of `loaded`; nested objects merge recursively.
fn merge_top_level(defaults: &mut Value, loaded: Value) {
    let (Value::Object(base), Value::Object(loaded)) = (defaults, loaded) else {
        return;
    };
    for (key, value) in loaded {
        if let Some(slot) = base.get_mut(&key) {
            merge_value(slot, value);
        }
    }
}

fn merge_value(slot: &mut Value, value: Value) {
    match (slot, value) {
        (Value::Object(base), Value::Object(loaded)) => {
            for (key, value) in loaded {
                match base.get_mut(&key) {
                    Some(inner) => merge_value(inner, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
