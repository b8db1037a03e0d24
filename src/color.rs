use anyhow::{bail, Result};
use palette::{FromColor, IntoColor, Lab, Srgb};

/// Number of colors extracted from every piece of artwork.
pub const PALETTE_SIZE: usize = 5;

/// Core color type used throughout the pipeline.
/// Wraps sRGB u8 components and provides the formats LedFx accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color string like `#ff8800` or `#FF8800`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            bail!(
                "invalid hex color: expected 6 hex digits, got {}",
                hex.len()
            );
        }
        let r = u8::from_str_radix(&hex[0..2], 16)?;
        let g = u8::from_str_radix(&hex[2..4], 16)?;
        let b = u8::from_str_radix(&hex[4..6], 16)?;
        Ok(Self { r, g, b })
    }

    /// Serialize to uppercase hex `#RRGGBB`, the form LedFx stores.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// CSS functional notation, `rgb(R, G, B)`.
    pub fn to_rgb_string(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    /// Rec. 601 luma in [0, 255].
    pub fn luminance(self) -> f64 {
        0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b)
    }

    /// Channel spread in [0, 1]: `(max - min) / 255`.
    pub fn saturation(self) -> f64 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        f64::from(max - min) / 255.0
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrast_text(self) -> Color {
        if self.luminance() > 128.0 {
            Color::BLACK
        } else {
            Color::WHITE
        }
    }

    /// Convert to `palette::Srgb<u8>`.
    pub fn to_srgb_u8(self) -> Srgb<u8> {
        Srgb::new(self.r, self.g, self.b)
    }

    /// Convert to CIELAB (for K-means clustering).
    pub fn to_lab(self) -> Lab {
        let srgb_f32: Srgb<f32> = self.to_srgb_u8().into_format();
        srgb_f32.into_color()
    }

    /// Create from CIELAB.
    pub fn from_lab(lab: Lab) -> Self {
        let srgb_f32: Srgb<f32> = Srgb::from_color(lab);
        let r = (srgb_f32.red.clamp(0.0, 1.0) * 255.0).round() as u8;
        let g = (srgb_f32.green.clamp(0.0, 1.0) * 255.0).round() as u8;
        let b = (srgb_f32.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { r, g, b }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// The five dominant colors of a piece of artwork.
///
/// Before ranking the order follows cluster weight; after ranking it follows
/// priority and slot indices refer to that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette(pub [Color; PALETTE_SIZE]);

impl Palette {
    pub fn new(colors: [Color; PALETTE_SIZE]) -> Self {
        Self(colors)
    }

    /// Parse a comma-separated list of exactly five hex colors.
    pub fn from_hex_list(list: &str) -> Result<Self> {
        let colors = list
            .split(',')
            .map(Color::from_hex)
            .collect::<Result<Vec<_>>>()?;
        Self::try_from(colors)
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.0.get(index).copied()
    }

    pub fn colors(&self) -> &[Color; PALETTE_SIZE] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.0.iter()
    }
}

impl TryFrom<Vec<Color>> for Palette {
    type Error = anyhow::Error;

    fn try_from(colors: Vec<Color>) -> Result<Self> {
        let len = colors.len();
        match <[Color; PALETTE_SIZE]>::try_from(colors) {
            Ok(colors) => Ok(Self(colors)),
            Err(_) => bail!("a palette holds exactly {PALETTE_SIZE} colors, got {len}"),
        }
    }
}
