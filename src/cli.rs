use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::pipeline::resolve::SlotValue;

/// Push album-art color palettes to LedFx lighting effects.
#[derive(Parser, Debug)]
#[command(name = "ledfx-palette", version, about)]
pub struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/ledfx-palette/color-extractor-config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract and print the palette of an artwork image
    Extract {
        /// Path to the artwork
        image: PathBuf,

        /// Keep extraction order instead of ranking
        #[arg(long)]
        no_sort: bool,

        /// Print colored swatches
        #[arg(long)]
        preview: bool,
    },

    /// Extract the palette and push it to the configured device
    Push {
        /// Path to the artwork
        image: PathBuf,
    },

    /// Push colors every time the artwork file changes
    Watch {
        /// Path to the artwork the player writes
        image: PathBuf,

        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval: u64,
    },

    /// Show what the selected preset's slots resolve to for a palette
    Resolve {
        /// Five comma-separated hex colors, e.g. "#FF0000,#00FF00,..."
        #[arg(long)]
        palette: String,
    },

    /// List LedFx devices
    Devices,

    /// List LedFx virtuals
    Virtuals,

    /// Show the active effect of a virtual
    Effect {
        /// Virtual id (defaults to the configured device)
        id: Option<String>,
    },

    /// List known effects
    Effects,

    /// List color slots, optionally only those of the given effects
    Slots {
        /// Effect types to filter by
        effects: Vec<String>,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage color presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration as JSON
    Show,

    /// Print the config file location
    Path,

    /// Set deviceId, ledFxUrl, sortColors, debug or selectedPreset
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// List presets, marking the selected one
    List,

    /// Add an empty preset and select it
    Add { name: String },

    /// Rename a preset (not the default)
    Rename { index: usize, name: String },

    /// Delete a preset (not the default)
    Delete { index: usize },

    /// Make a preset active
    Select { index: usize },

    /// Point a slot at a palette index ("2") or gradient ("0:0,50:1,100:0")
    SetSlot {
        index: usize,
        slot: String,
        value: SlotValue,
    },

    /// Remove a slot from a preset
    ClearSlot { index: usize, slot: String },
}
