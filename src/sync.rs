use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::color::Palette;
use crate::config::{ConfigChange, ConfigStore};
use crate::events::{ColorsUpdated, EventBus};
use crate::ledfx::{HttpTransport, LedFxClient, Transport};
use crate::pipeline::extract::extract_with_retry;
use crate::pipeline::rank::{log_scores, rank_palette};

/// How long to wait for artwork to show up before giving up.
pub const ARTWORK_WAIT: Duration = Duration::from_secs(5);
/// Delay between a track change and reading its artwork.
pub const TRACK_CHANGE_SETTLE: Duration = Duration::from_millis(500);
const ARTWORK_POLL: Duration = Duration::from_millis(50);

/// Poll until `path` exists. Returns false on timeout.
pub fn wait_for_artwork(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if path.is_file() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(ARTWORK_POLL);
    }
}

/// Drives color-update cycles: artwork in, palette to LedFx and subscribers out.
pub struct ColorSync<T = HttpTransport> {
    store: ConfigStore,
    transport: T,
    colors: EventBus<ColorsUpdated>,
    artwork_wait: Duration,
}

impl ColorSync<HttpTransport> {
    pub fn new(store: ConfigStore) -> Self {
        Self::with_transport(store, HttpTransport::new())
    }
}

impl<T: Transport> ColorSync<T> {
    pub fn with_transport(store: ConfigStore, transport: T) -> Self {
        Self {
            store,
            transport,
            colors: EventBus::new(),
            artwork_wait: ARTWORK_WAIT,
        }
    }

    /// Override the artwork wait timeout.
    pub fn artwork_wait(mut self, timeout: Duration) -> Self {
        self.artwork_wait = timeout;
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ColorsUpdated) + 'static) {
        self.colors.subscribe(subscriber);
    }

    /// Client for the currently configured LedFx URL.
    pub fn client(&self) -> LedFxClient<&T> {
        LedFxClient::with_transport(&self.store.get().led_fx_url, &self.transport)
    }

    /// Run one cycle. Returns the published palette, or `None` when no
    /// colors could be extracted.
    pub fn update_colors(&mut self, artwork: &Path) -> Option<Palette> {
        if !wait_for_artwork(artwork, self.artwork_wait) {
            tracing::warn!(path = %artwork.display(), "artwork did not appear in time");
            return None;
        }
        let extracted = extract_with_retry(artwork)?;

        let config = self.store.get();
        let palette = if config.sort_colors {
            rank_palette(&extracted)
        } else {
            extracted
        };
        if config.debug {
            log_scores(palette.colors());
        }

        if let Some(device_id) = config.device_id.as_deref() {
            let pushed = match config.selected_color_data() {
                Some(color_data) => self.client().set_effect_colors(device_id, color_data, &palette),
                None => false,
            };
            if pushed {
                tracing::info!(device_id, "pushed colors to LedFx");
            } else {
                tracing::warn!(device_id, "failed to push colors to LedFx");
            }
        }

        self.colors.publish(&ColorsUpdated(palette));
        Some(palette)
    }

    /// A new track started: give the artwork a moment, then update.
    pub fn on_track_change(&mut self, artwork: &Path) -> Option<Palette> {
        thread::sleep(TRACK_CHANGE_SETTLE);
        self.update_colors(artwork)
    }

    /// Only the ranking toggle changes the palette itself.
    pub fn on_config_change(&mut self, change: &ConfigChange, artwork: &Path) -> Option<Palette> {
        match change {
            ConfigChange::SortColors(_) => self.update_colors(artwork),
            _ => None,
        }
    }

    /// The config file changed on disk: reload it and react to each changed
    /// field. A file that fails to load keeps the current settings.
    pub fn reload_config(&mut self, artwork: &Path) -> Option<Palette> {
        let changes = match self.store.reload() {
            Ok(changes) => changes,
            Err(err) => {
                tracing::warn!("keeping previous settings: {err}");
                return None;
            }
        };
        let mut palette = None;
        for change in &changes {
            tracing::info!(key = change.key(), "setting changed");
            palette = self.on_config_change(change, artwork).or(palette);
        }
        palette
    }
}

/// Detects file changes by modification time.
#[derive(Debug)]
pub struct FileWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file exists and changed since the last poll. The first
    /// poll of an existing file counts as a change.
    pub fn poll(&mut self) -> bool {
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        match modified {
            Some(time) if self.last_seen != Some(time) => {
                self.last_seen = Some(time);
                true
            }
            _ => false,
        }
    }
}
