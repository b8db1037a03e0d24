use crossterm::style::{style, Color as TermColor, Stylize};

use crate::color::{Color, Palette};
use crate::pipeline::rank::priority;
use crate::pipeline::resolve::{resolve, ColorData};

fn to_term(c: Color) -> TermColor {
    TermColor::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// One line per palette entry: index, hex swatch and ranking priority.
/// With `colored` the hex label is drawn on its own color.
pub fn render_palette(palette: &Palette, colored: bool) -> String {
    let mut out = String::new();
    for (i, &c) in palette.iter().enumerate() {
        let label = format!("{:^9}", c.to_hex());
        let swatch = if colored {
            style(label)
                .with(to_term(c.contrast_text()))
                .on(to_term(c))
                .to_string()
        } else {
            label
        };
        out.push_str(&format!("  {i} {swatch}  priority {:.5}\n", priority(c)));
    }
    out
}

/// What each configured slot resolves to against `palette`.
pub fn render_slots(color_data: &ColorData, palette: &Palette) -> String {
    let width = color_data.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (slot, value) in color_data {
        let resolved = resolve(value, palette).unwrap_or_else(|| "(unset)".to_string());
        out.push_str(&format!("  {slot:<width$}  {resolved}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::resolve::SlotValue;

    fn palette() -> Palette {
        Palette::new([
            Color::new(220, 30, 40),
            Color::new(30, 60, 200),
            Color::new(120, 120, 120),
            Color::BLACK,
            Color::WHITE,
        ])
    }

    #[test]
    fn plain_palette_lists_every_color() {
        let out = render_palette(&palette(), false);
        assert_eq!(out.lines().count(), 5);
        assert!(out.contains("#DC1E28"));
        assert!(out.contains("  4  #FFFFFF "));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn colored_palette_uses_ansi() {
        let out = render_palette(&palette(), true);
        assert!(out.contains('\x1b'));
        assert!(out.contains("#DC1E28"));
    }

    #[test]
    fn slots_show_resolved_or_unset() {
        let mut data = ColorData::new();
        data.insert("strobe_color".into(), SlotValue::Index(1));
        data.insert(
            "gradient".into(),
            SlotValue::Gradient([(50, 0)].into_iter().collect()),
        );
        let out = render_slots(&data, &palette());
        assert!(out.contains("strobe_color  #1E3CC8"));
        assert!(out.contains("gradient      (unset)"));
    }
}
