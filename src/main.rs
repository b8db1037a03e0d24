use std::io::IsTerminal;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ledfx_palette::cli::{Args, Command, ConfigAction, PresetAction};
use ledfx_palette::color::Palette;
use ledfx_palette::config::{default_config_path, ConfigChange, ConfigStore};
use ledfx_palette::effects::{effect_name, slots_for_effects, EFFECT_NAMES};
use ledfx_palette::events::ColorsUpdated;
use ledfx_palette::pipeline::extract::palette_from_file;
use ledfx_palette::pipeline::rank::{log_scores, rank_palette};
use ledfx_palette::preview::{render_palette, render_slots};
use ledfx_palette::sync::{FileWatcher, ColorSync};

/// `info` everywhere, plus debug output from this crate only when asked.
fn log_filter(debug: bool) -> Result<EnvFilter> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    if !debug {
        return Ok(filter);
    }
    Ok(filter.add_directive("ledfx_palette=debug".parse()?))
}

fn init_logging(debug: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug)?)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path = args.config.clone().unwrap_or_else(default_config_path);
    let store = ConfigStore::open(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    init_logging(args.verbose || store.get().debug)?;

    let mut sync = ColorSync::new(store);
    match args.command {
        Command::Extract {
            image,
            no_sort,
            preview,
        } => extract(&sync, &image, no_sort, preview),
        Command::Push { image } => push(&mut sync, &image),
        Command::Watch { image, interval } => watch(&mut sync, &image, Duration::from_millis(interval)),
        Command::Resolve { palette } => {
            let palette = Palette::from_hex_list(&palette)?;
            let config = sync.store().get();
            let color_data = config.selected_color_data().context("no presets configured")?;
            print!("{}", render_slots(color_data, &palette));
            Ok(())
        }
        Command::Devices => {
            let devices = sync.client().list_devices().context("could not list LedFx devices")?;
            for device in devices {
                println!("{}\t{}", device.id, device.name);
            }
            Ok(())
        }
        Command::Virtuals => {
            let virtuals = sync.client().list_virtuals().context("could not list LedFx virtuals")?;
            for id in virtuals {
                println!("{id}");
            }
            Ok(())
        }
        Command::Effect { id } => {
            let Some(id) = id.or_else(|| sync.store().get().device_id.clone()) else {
                bail!("no virtual given and no deviceId configured");
            };
            let effect = sync.client().get_effect(&id).context("could not read the active effect")?;
            let name = effect_name(&effect.effect_type).unwrap_or(effect.effect_type.as_str());
            println!("{name} ({})", effect.effect_type);
            for key in effect.color_keys() {
                println!("  {key} = {}", effect.config[key]);
            }
            Ok(())
        }
        Command::Effects => {
            for (ty, name) in EFFECT_NAMES {
                println!("{ty}\t{name}");
            }
            Ok(())
        }
        Command::Slots { effects } => {
            let effects: Vec<&str> = effects.iter().map(String::as_str).collect();
            for slot in slots_for_effects(&effects) {
                println!("{slot}");
            }
            Ok(())
        }
        Command::Config { action } => config(sync.store_mut(), action),
        Command::Preset { action } => preset(sync.store_mut(), action),
    }
}

fn extract(sync: &ColorSync, image: &Path, no_sort: bool, preview: bool) -> Result<()> {
    let config = sync.store().get();
    let extracted = palette_from_file(image)?;
    let palette = if config.sort_colors && !no_sort {
        rank_palette(&extracted)
    } else {
        extracted
    };
    if config.debug {
        log_scores(palette.colors());
    }

    if preview {
        print!("{}", render_palette(&palette, std::io::stdout().is_terminal()));
    } else {
        for color in palette.iter() {
            println!("{color}");
        }
    }
    Ok(())
}

fn push(sync: &mut ColorSync, image: &Path) -> Result<()> {
    if sync.store().get().device_id.is_none() {
        bail!("no deviceId configured; set one with `config set deviceId <id>`");
    }
    let palette = sync
        .update_colors(image)
        .with_context(|| format!("could not extract colors from {}", image.display()))?;
    print!("{}", render_palette(&palette, std::io::stdout().is_terminal()));
    Ok(())
}

fn watch(sync: &mut ColorSync, image: &Path, interval: Duration) -> Result<()> {
    let colored = std::io::stdout().is_terminal();
    sync.subscribe(move |ColorsUpdated(palette)| print!("{}", render_palette(palette, colored)));

    let mut artwork = FileWatcher::new(image);
    let mut settings = FileWatcher::new(sync.store().path());
    // the store was just loaded, so the current file is the baseline
    settings.poll();
    tracing::info!(path = %artwork.path().display(), "watching artwork");
    loop {
        if settings.poll() {
            sync.reload_config(artwork.path());
        }
        if artwork.poll() {
            sync.on_track_change(artwork.path());
        }
        thread::sleep(interval);
    }
}

fn config(store: &mut ConfigStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(store.get())?);
        }
        ConfigAction::Path => println!("{}", store.path().display()),
        ConfigAction::Set { key, value } => {
            store.set(ConfigChange::parse(&key, &value)?)?;
        }
    }
    Ok(())
}

fn preset(store: &mut ConfigStore, action: PresetAction) -> Result<()> {
    match action {
        PresetAction::List => {
            let config = store.get();
            for (i, preset) in config.presets.iter().enumerate() {
                let marker = if i == config.selected_preset { '*' } else { ' ' };
                println!("{marker} {i}  {}", preset.name);
                for (slot, value) in &preset.color_data {
                    println!("      {slot} = {value}");
                }
            }
        }
        PresetAction::Add { name } => {
            let index = store.add_preset(&name)?;
            println!("added preset {index}: {name}");
        }
        PresetAction::Rename { index, name } => store.rename_preset(index, &name)?,
        PresetAction::Delete { index } => {
            let removed = store.delete_preset(index)?;
            println!("deleted preset {index}: {}", removed.name);
        }
        PresetAction::Select { index } => store.select_preset(index)?,
        PresetAction::SetSlot { index, slot, value } => store.set_slot(index, &slot, value)?,
        PresetAction::ClearSlot { index, slot } => {
            if !store.clear_slot(index, &slot)? {
                bail!("preset {index} has no slot '{slot}'");
            }
        }
    }
    Ok(())
}
