use crate::color::{Color, Palette};

const LUM_MIN: f64 = 0.0;
const LUM_MAX: f64 = 90.0;
const LUM_EXPONENT: f64 = 3.0;
const LUM_CAP: f64 = 0.5;

const SAT_MIN: f64 = 0.0;
const SAT_MAX: f64 = 0.9;
const SAT_EXPONENT: f64 = 1.1;

const NORMALIZED_FLOOR: f64 = 0.001;
const PRIORITY_FLOOR: f64 = 0.00001;

/// The terms that make up a color's ranking priority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub luminance: f64,
    pub exp_luminance: f64,
    pub saturation: f64,
    pub exp_saturation: f64,
    pub priority: f64,
}

/// Normalize `value` into `[min, max]`, clamp to `[0.001, 1]` and raise it to `exponent`.
fn shaped(value: f64, min: f64, max: f64, exponent: f64) -> f64 {
    let normalized = (value - min) / (max - min);
    normalized.clamp(NORMALIZED_FLOOR, 1.0).powf(exponent)
}

/// Score a color. Mid-tone, saturated colors score highest; near-black,
/// near-white and gray colors sink to the bottom.
pub fn score(color: Color) -> Score {
    let luminance = color.luminance();
    let saturation = color.saturation();

    let exp_luminance = shaped(luminance, LUM_MIN, LUM_MAX, LUM_EXPONENT).min(LUM_CAP);
    let exp_saturation = shaped(saturation, SAT_MIN, SAT_MAX, SAT_EXPONENT);

    Score {
        luminance,
        exp_luminance,
        saturation,
        exp_saturation,
        priority: (exp_saturation * exp_luminance).max(PRIORITY_FLOOR),
    }
}

pub fn priority(color: Color) -> f64 {
    score(color).priority
}

/// Order colors by descending priority. Ties keep their input order.
pub fn rank(colors: &[Color]) -> Vec<Color> {
    let mut scored: Vec<(f64, Color)> = colors.iter().map(|&c| (priority(c), c)).collect();
    // `sort_by` is stable
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, c)| c).collect()
}

/// Return the palette reordered by priority.
pub fn rank_palette(palette: &Palette) -> Palette {
    let mut colors = *palette.colors();
    colors.copy_from_slice(&rank(palette.colors()));
    Palette(colors)
}

/// Emit one debug record per color with every term of its score.
pub fn log_scores(colors: &[Color]) {
    for &color in colors {
        let s = score(color);
        tracing::debug!(
            color = %color,
            luminance = s.luminance,
            exp_luminance = s.exp_luminance,
            saturation = s.saturation,
            exp_saturation = s.exp_saturation,
            priority = s.priority,
            "color score"
        );
    }
}
