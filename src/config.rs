//! Persisted settings: LedFx connection, ranking flags and color presets.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::events::EventBus;
use crate::pipeline::resolve::{ColorData, SlotValue};

/// File name of the persisted configuration.
pub const CONFIG_FILE: &str = "color-extractor-config.json";
const APP_DIR: &str = "ledfx-palette";
const DEFAULT_URL: &str = "http://127.0.0.1:8888/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file {0} does not hold a JSON object")]
    NotAnObject(PathBuf),

    #[error("the default preset cannot be {0}")]
    ProtectedPreset(&'static str),

    #[error("no preset at index {index} ({len} presets)")]
    PresetOutOfRange { index: usize, len: usize },

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    pub color_data: ColorData,
}

impl Preset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color_data: ColorData::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub device_id: Option<String>,
    pub led_fx_url: String,
    pub sort_colors: bool,
    pub debug: bool,
    pub presets: Vec<Preset>,
    pub selected_preset: usize,
}

impl Default for Config {
    fn default() -> Self {
        let gradient: IndexMap<u8, usize> =
            [(0, 0), (20, 1), (40, 2), (60, 3), (80, 4), (100, 0)].into_iter().collect();
        let mut color_data = ColorData::new();
        color_data.insert("gradient".to_string(), SlotValue::Gradient(gradient));
        color_data.insert("strobe_color".to_string(), SlotValue::Index(0));

        Self {
            device_id: None,
            led_fx_url: DEFAULT_URL.to_string(),
            sort_colors: true,
            debug: false,
            presets: vec![Preset {
                name: "Default".to_string(),
                color_data,
            }],
            selected_preset: 0,
        }
    }
}

impl Config {
    /// The changes that turn `self` into `other`, in key order.
    pub fn changes_to(&self, other: &Config) -> Vec<ConfigChange> {
        let mut changes = Vec::new();
        if self.device_id != other.device_id {
            changes.push(ConfigChange::DeviceId(other.device_id.clone()));
        }
        if self.led_fx_url != other.led_fx_url {
            changes.push(ConfigChange::LedFxUrl(other.led_fx_url.clone()));
        }
        if self.sort_colors != other.sort_colors {
            changes.push(ConfigChange::SortColors(other.sort_colors));
        }
        if self.debug != other.debug {
            changes.push(ConfigChange::Debug(other.debug));
        }
        if self.presets != other.presets {
            changes.push(ConfigChange::Presets(other.presets.clone()));
        }
        if self.selected_preset != other.selected_preset {
            changes.push(ConfigChange::SelectedPreset(other.selected_preset));
        }
        changes
    }

    /// Color data of the selected preset, or of preset 0 if the stored
    /// selection no longer exists.
    pub fn selected_color_data(&self) -> Option<&ColorData> {
        self.presets
            .get(self.selected_preset)
            .or_else(|| self.presets.first())
            .map(|p| &p.color_data)
    }
}

/// One changed setting with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    DeviceId(Option<String>),
    LedFxUrl(String),
    SortColors(bool),
    Debug(bool),
    Presets(Vec<Preset>),
    SelectedPreset(usize),
}

impl ConfigChange {
    /// Persisted key name.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigChange::DeviceId(_) => "deviceId",
            ConfigChange::LedFxUrl(_) => "ledFxUrl",
            ConfigChange::SortColors(_) => "sortColors",
            ConfigChange::Debug(_) => "debug",
            ConfigChange::Presets(_) => "presets",
            ConfigChange::SelectedPreset(_) => "selectedPreset",
        }
    }

    /// Build a change from a key and its textual value. Presets are edited
    /// through the preset operations instead.
    pub fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        let invalid = |key: &'static str, reason: &str| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let parse_bool = |key: &'static str| match value.trim() {
            "true" | "on" | "yes" | "1" => Ok(true),
            "false" | "off" | "no" | "0" => Ok(false),
            _ => Err(invalid(key, "expected true or false")),
        };

        match key {
            "deviceId" => {
                let id = value.trim();
                Ok(ConfigChange::DeviceId(
                    (!id.is_empty() && id != "none").then(|| id.to_string()),
                ))
            }
            "ledFxUrl" => Ok(ConfigChange::LedFxUrl(value.trim().to_string())),
            "sortColors" => parse_bool("sortColors").map(ConfigChange::SortColors),
            "debug" => parse_bool("debug").map(ConfigChange::Debug),
            "selectedPreset" => value
                .trim()
                .parse::<usize>()
                .map(ConfigChange::SelectedPreset)
                .map_err(|_| invalid("selectedPreset", "expected a preset index")),
            "presets" => Err(invalid("presets", "use the preset commands")),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    fn apply(&self, config: &mut Config) {
        match self {
            ConfigChange::DeviceId(v) => config.device_id = v.clone(),
            ConfigChange::LedFxUrl(v) => config.led_fx_url = v.clone(),
            ConfigChange::SortColors(v) => config.sort_colors = *v,
            ConfigChange::Debug(v) => config.debug = *v,
            ConfigChange::Presets(v) => config.presets = v.clone(),
            ConfigChange::SelectedPreset(v) => config.selected_preset = *v,
        }
    }
}

/// Resolve `$XDG_CONFIG_HOME/ledfx-palette/color-extractor-config.json`.
pub fn default_config_path() -> PathBuf {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            PathBuf::from(home).join(".config")
        });
    config_home.join(APP_DIR).join(CONFIG_FILE)
}

/// Owns the persisted [`Config`] and notifies subscribers of every change.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
    changes: EventBus<ConfigChange>,
}

impl ConfigStore {
    /// Load the config at `path`. A missing file is created with defaults;
    /// keys missing from an existing file are backfilled and written back.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let (config, backfilled) = load_with_defaults(&path, &content)?;
                if backfilled {
                    tracing::info!(path = %path.display(), "backfilled missing config keys");
                    write_config(&path, &config)?;
                }
                config
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                write_config(&path, &config)?;
                config
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        Ok(Self {
            path,
            config,
            changes: EventBus::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ConfigChange) + 'static) {
        self.changes.subscribe(subscriber);
    }

    /// Apply, persist, then notify. Memory is only updated once the write
    /// succeeded.
    pub fn set(&mut self, change: ConfigChange) -> Result<(), ConfigError> {
        if let ConfigChange::SelectedPreset(index) = change {
            self.check_index(index)?;
        }
        let mut config = self.config.clone();
        change.apply(&mut config);
        write_config(&self.path, &config)?;
        self.config = config;
        tracing::debug!(key = change.key(), "config updated");
        self.changes.publish(&change);
        Ok(())
    }

    /// Re-read the file after another process edited it. Subscribers hear
    /// about every field that differs; the changes are also returned.
    pub fn reload(&mut self) -> Result<Vec<ConfigChange>, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let (config, _) = load_with_defaults(&self.path, &content)?;
        let changes = self.config.changes_to(&config);
        self.config = config;
        for change in &changes {
            tracing::debug!(key = change.key(), "config changed on disk");
            self.changes.publish(change);
        }
        Ok(changes)
    }

    /// Append an empty preset and select it. Returns its index.
    pub fn add_preset(&mut self, name: &str) -> Result<usize, ConfigError> {
        let mut presets = self.config.presets.clone();
        presets.push(Preset::new(name));
        let index = presets.len() - 1;
        self.set(ConfigChange::Presets(presets))?;
        self.set(ConfigChange::SelectedPreset(index))?;
        Ok(index)
    }

    pub fn rename_preset(&mut self, index: usize, name: &str) -> Result<(), ConfigError> {
        self.check_editable(index, "renamed")?;
        let mut presets = self.config.presets.clone();
        presets[index].name = name.to_string();
        self.set(ConfigChange::Presets(presets))
    }

    /// Remove a preset and fall back to the default selection.
    pub fn delete_preset(&mut self, index: usize) -> Result<Preset, ConfigError> {
        self.check_editable(index, "deleted")?;
        let mut presets = self.config.presets.clone();
        let removed = presets.remove(index);
        self.set(ConfigChange::Presets(presets))?;
        self.set(ConfigChange::SelectedPreset(0))?;
        Ok(removed)
    }

    pub fn select_preset(&mut self, index: usize) -> Result<(), ConfigError> {
        self.set(ConfigChange::SelectedPreset(index))
    }

    pub fn set_slot(&mut self, index: usize, slot: &str, value: SlotValue) -> Result<(), ConfigError> {
        self.check_index(index)?;
        let mut presets = self.config.presets.clone();
        presets[index].color_data.insert(slot.to_string(), value);
        self.set(ConfigChange::Presets(presets))
    }

    /// Remove a slot. Returns whether it existed.
    pub fn clear_slot(&mut self, index: usize, slot: &str) -> Result<bool, ConfigError> {
        self.check_index(index)?;
        let mut presets = self.config.presets.clone();
        if presets[index].color_data.shift_remove(slot).is_none() {
            return Ok(false);
        }
        self.set(ConfigChange::Presets(presets))?;
        Ok(true)
    }

    fn check_index(&self, index: usize) -> Result<(), ConfigError> {
        let len = self.config.presets.len();
        if index >= len {
            return Err(ConfigError::PresetOutOfRange { index, len });
        }
        Ok(())
    }

    fn check_editable(&self, index: usize, action: &'static str) -> Result<(), ConfigError> {
        if index == 0 {
            return Err(ConfigError::ProtectedPreset(action));
        }
        self.check_index(index)
    }
}

/// Parse stored JSON, filling top-level keys it lacks from the defaults.
/// Returns whether anything was filled in.
fn load_with_defaults(path: &Path, content: &str) -> Result<(Config, bool), ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let Value::Object(mut stored) = serde_json::from_str(content).map_err(parse_err)? else {
        return Err(ConfigError::NotAnObject(path.to_path_buf()));
    };
    let Value::Object(defaults) = serde_json::to_value(Config::default()).map_err(parse_err)? else {
        unreachable!("Config serializes to an object");
    };

    let mut backfilled = false;
    for (key, value) in defaults {
        if !stored.contains_key(&key) {
            stored.insert(key, value);
            backfilled = true;
        }
    }

    let config = serde_json::from_value(Value::Object(stored)).map_err(parse_err)?;
    Ok((config, backfilled))
}

fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let content = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::open(dir.path().join(CONFIG_FILE)).unwrap()
    }

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get(), &Config::default());
        assert!(store.path().exists());
    }

    #[test]
    fn defaults_match_original_layout() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["ledFxUrl"], "http://127.0.0.1:8888/");
        assert_eq!(json["deviceId"], Value::Null);
        assert_eq!(json["sortColors"], true);
        assert_eq!(json["presets"][0]["name"], "Default");
        assert_eq!(json["presets"][0]["colorData"]["gradient"]["20"], 1);
        assert_eq!(json["presets"][0]["colorData"]["strobe_color"], 0);
    }

    #[test]
    fn missing_keys_are_backfilled_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"deviceId":"desk","debug":true}"#).unwrap();

        let store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.get().device_id.as_deref(), Some("desk"));
        assert!(store.get().debug);
        assert!(store.get().sort_colors);
        assert_eq!(store.get().presets.len(), 1);

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["selectedPreset"], 0);
        assert_eq!(written["deviceId"], "desk");
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(ConfigStore::open(&path), Err(ConfigError::NotAnObject(_))));

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ConfigStore::open(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn set_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        store.set(ConfigChange::SortColors(false)).unwrap();
        assert_eq!(*seen.borrow(), vec![ConfigChange::SortColors(false)]);

        let reopened = ConfigStore::open(store.path()).unwrap();
        assert!(!reopened.get().sort_colors);
    }

    #[test]
    fn failed_write_leaves_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        store.subscribe(move |_| *sink.borrow_mut() += 1);

        // a directory where the file should be makes the write fail
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();

        assert!(matches!(
            store.set(ConfigChange::SortColors(false)),
            Err(ConfigError::Io { .. })
        ));
        assert!(store.get().sort_colors);
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn reload_picks_up_edits_from_another_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |change: &ConfigChange| sink.borrow_mut().push(change.key()));

        let mut other = ConfigStore::open(store.path()).unwrap();
        other.set(ConfigChange::DeviceId(Some("desk".into()))).unwrap();
        other.set(ConfigChange::SortColors(false)).unwrap();

        let changes = store.reload().unwrap();
        assert_eq!(
            changes,
            vec![
                ConfigChange::DeviceId(Some("desk".into())),
                ConfigChange::SortColors(false),
            ]
        );
        assert_eq!(*seen.borrow(), vec!["deviceId", "sortColors"]);
        assert_eq!(store.get(), other.get());

        assert!(store.reload().unwrap().is_empty());
    }

    #[test]
    fn add_preset_selects_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let index = store.add_preset("Chill").unwrap();
        assert_eq!(index, 1);
        assert_eq!(store.get().selected_preset, 1);
        assert!(store.get().selected_color_data().unwrap().is_empty());
    }

    #[test]
    fn default_preset_is_protected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(
            store.delete_preset(0),
            Err(ConfigError::ProtectedPreset("deleted"))
        ));
        assert!(matches!(
            store.rename_preset(0, "Mine"),
            Err(ConfigError::ProtectedPreset("renamed"))
        ));
        assert_eq!(store.get().presets[0].name, "Default");
    }

    #[test]
    fn delete_preset_reselects_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.add_preset("A").unwrap();
        store.add_preset("B").unwrap();
        let removed = store.delete_preset(2).unwrap();
        assert_eq!(removed.name, "B");
        assert_eq!(store.get().selected_preset, 0);
        assert_eq!(store.get().presets.len(), 2);
        assert!(matches!(
            store.delete_preset(5),
            Err(ConfigError::PresetOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn rename_and_edit_slots() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let index = store.add_preset("New Preset").unwrap();
        store.rename_preset(index, "Party").unwrap();
        store.set_slot(index, "color_lows", SlotValue::Index(3)).unwrap();
        assert_eq!(store.get().presets[index].name, "Party");
        assert_eq!(
            store.get().selected_color_data().unwrap()["color_lows"],
            SlotValue::Index(3)
        );

        assert!(store.clear_slot(index, "color_lows").unwrap());
        assert!(!store.clear_slot(index, "color_lows").unwrap());
    }

    #[test]
    fn select_out_of_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        assert!(store.select_preset(3).is_err());
        assert_eq!(store.get().selected_preset, 0);
    }

    #[test]
    fn stale_selection_falls_back_to_default() {
        let config = Config {
            selected_preset: 9,
            ..Config::default()
        };
        assert!(config.selected_color_data().unwrap().contains_key("gradient"));
    }

    #[test]
    fn parse_changes() {
        assert_eq!(
            ConfigChange::parse("sortColors", "off").unwrap(),
            ConfigChange::SortColors(false)
        );
        assert_eq!(
            ConfigChange::parse("deviceId", "none").unwrap(),
            ConfigChange::DeviceId(None)
        );
        assert_eq!(
            ConfigChange::parse("ledFxUrl", " http://10.0.0.2:8888 ").unwrap(),
            ConfigChange::LedFxUrl("http://10.0.0.2:8888".to_string())
        );
        assert!(matches!(
            ConfigChange::parse("volume", "3"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(ConfigChange::parse("debug", "maybe").is_err());
        assert!(ConfigChange::parse("presets", "[]").is_err());
    }
}
