//! Known LedFx effects and the color slots they expose.

/// Effect type and display name.
pub const EFFECT_NAMES: &[(&str, &str)] = &[
    ("gradient", "Gradient"),
    ("fade", "Fade"),
    ("rainbow", "Rainbow"),
    ("random_flash", "Random Flash"),
    ("singleColor", "Single Color"),
    ("bar", "Bar"),
    ("multiBar", "Multicolor Bar"),
    ("strobe", "BPM Strobe"),
    ("blade_power_plus", "Blade Power+"),
    ("energy", "Energy"),
    ("magnitude", "Magnitude"),
    ("pitchSpectrum", "Pitch Spectrum"),
    ("power", "Power"),
    ("rain", "Rain"),
    ("real_strobe", "Strobe"),
    ("scan", "Scan"),
    ("scan_and_flare", "Scan and Flare"),
    ("scan_multi", "Scan Multi"),
    ("scroll", "Scroll"),
    ("scroll_plus", "Scroll+"),
    ("spectrum", "Spectrum"),
    ("wavelength", "Wavelength"),
    ("block_reflections", "Block Reflections"),
    ("crawler", "Crawler"),
    ("energy2", "Energy 2"),
    ("fire", "Fire"),
    ("glitch", "Glitch"),
    ("lava_lamp", "Lava Lamp"),
    ("marching", "Marching"),
    ("melt", "Melt"),
    ("melt_and_sparkle", "Melt and Sparkle"),
    ("water", "Water"),
    ("bands", "Bands"),
    ("bands_matrix", "Bands Matrix"),
    ("blocks", "Blocks"),
    ("equalizer", "Equalizer"),
    ("digitalrain2d", "Digital Rain"),
    ("equalizer2d", "Equalizer2d"),
    ("noise2d", "Noise"),
    ("plasma2d", "Plasma"),
    ("plasmawled", "PlasmaWled2d"),
    ("texter2d", "Texter"),
    ("metro", "Metro"),
    ("pixels", "Pixels"),
    ("vumeter", "VuMeter"),
];

/// Color slot and the effect types that have it.
pub const COLOR_SLOTS: &[(&str, &[&str])] = &[
    (
        "background_color",
        &[
            "gradient", "fade", "rainbow", "random_flash", "singleColor", "bar", "multiBar",
            "strobe", "blade_power_plus", "energy", "magnitude", "pitchSpectrum", "power", "rain",
            "real_strobe", "scan", "scan_and_flare", "scan_multi", "scroll", "scroll_plus",
            "spectrum", "wavelength", "block_reflections", "crawler", "energy2", "fire", "glitch",
            "lava_lamp", "marching", "melt", "melt_and_sparkle", "water", "bands", "bands_matrix",
            "blocks", "equalizer", "equalizer2d", "noise2d", "plasma2d", "plasmawled", "texter2d",
            "metro", "pixels",
        ],
    ),
    (
        "gradient",
        &[
            "gradient", "fade", "bar", "multiBar", "strobe", "blade_power_plus", "magnitude",
            "pitchSpectrum", "power", "real_strobe", "scan", "scan_and_flare", "scan_multi",
            "wavelength", "block_reflections", "crawler", "energy2", "fire", "glitch", "lava_lamp",
            "marching", "melt", "melt_and_sparkle", "water", "bands", "bands_matrix", "blocks",
            "equalizer", "digitalrain2d", "equalizer2d", "noise2d", "plasma2d", "plasmawled",
            "texter2d",
        ],
    ),
    ("hit_color", &["random_flash"]),
    ("color", &["singleColor"]),
    (
        "color_high",
        &["energy", "rain", "scan_multi", "scroll", "scroll_plus", "vumeter"],
    ),
    (
        "color_lows",
        &["energy", "rain", "scan_multi", "scroll", "scroll_plus"],
    ),
    (
        "color_mids",
        &["energy", "rain", "scan_multi", "scroll", "scroll_plus", "vumeter"],
    ),
    ("sparks_color", &["power"]),
    ("strobe_color", &["real_strobe"]),
    ("color_scan", &["scan", "scan_and_flare"]),
    ("text_color", &["texter2d"]),
    ("flash_color", &["metro"]),
    ("pixel_color", &["pixels"]),
    ("color_max", &["vumeter"]),
    ("color_min", &["vumeter"]),
];

/// Display name of an effect type.
pub fn effect_name(effect_type: &str) -> Option<&'static str> {
    EFFECT_NAMES
        .iter()
        .find(|(ty, _)| *ty == effect_type)
        .map(|(_, name)| *name)
}

/// Color slots of one effect type, in catalogue order.
pub fn slots_for_effect(effect_type: &str) -> Vec<&'static str> {
    slots_for_effects(&[effect_type])
}

/// Slots used by any of `effect_types`; every slot when the list is empty.
pub fn slots_for_effects(effect_types: &[&str]) -> Vec<&'static str> {
    COLOR_SLOTS
        .iter()
        .filter(|(_, effects)| {
            effect_types.is_empty() || effects.iter().any(|e| effect_types.contains(e))
        })
        .map(|(slot, _)| *slot)
        .collect()
}
