use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::color::{Palette, PALETTE_SIZE};

/// A gradient needs at least this many stops to be considered set.
pub const MIN_GRADIENT_STOPS: usize = 2;
pub const MAX_STOP: u8 = 100;
const GRADIENT_ANGLE: u32 = 90;

/// What a color slot points at: one palette entry, or a gradient whose stops
/// (percentages, in insertion order) each point at a palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SlotValue {
    Index(usize),
    Gradient(IndexMap<u8, usize>),
}

/// Slot name to slot value, as stored in a preset.
pub type ColorData = IndexMap<String, SlotValue>;

impl SlotValue {
    /// Single indices are always set; gradients need two stops.
    pub fn is_set(&self) -> bool {
        match self {
            SlotValue::Index(_) => true,
            SlotValue::Gradient(stops) => stops.len() >= MIN_GRADIENT_STOPS,
        }
    }
}

/// Turn a slot value into the string LedFx expects: `#RRGGBB` for a single
/// index, `linear-gradient(90deg, rgb(..) P%, ...)` for a gradient.
///
/// Returns `None` for an unset gradient or an index outside the palette.
pub fn resolve(value: &SlotValue, palette: &Palette) -> Option<String> {
    match value {
        SlotValue::Index(index) => {
            let color = palette.get(*index);
            if color.is_none() {
                tracing::warn!(index, "slot points outside the palette");
            }
            color.map(|c| c.to_hex())
        }
        SlotValue::Gradient(stops) => {
            if !value.is_set() {
                return None;
            }
            let parts = stops
                .iter()
                .map(|(stop, &index)| {
                    let color = palette.get(index);
                    if color.is_none() {
                        tracing::warn!(index, stop, "gradient stop points outside the palette");
                    }
                    color.map(|c| format!("{} {stop}%", c.to_rgb_string()))
                })
                .collect::<Option<Vec<_>>>()?;
            Some(format!(
                "linear-gradient({GRADIENT_ANGLE}deg, {})",
                parts.join(", ")
            ))
        }
    }
}

fn check_index(index: usize) -> anyhow::Result<usize> {
    if index >= PALETTE_SIZE {
        bail!("palette index {index} out of range (0-{})", PALETTE_SIZE - 1);
    }
    Ok(index)
}

fn check_stop(stop: u8) -> anyhow::Result<u8> {
    if stop > MAX_STOP {
        bail!("gradient stop {stop}% out of range (0-{MAX_STOP})");
    }
    Ok(stop)
}

/// Parses `2` as a single index and `0:0,50:1,100:0` as a gradient.
impl FromStr for SlotValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if !s.contains(':') {
            let index = s
                .parse::<usize>()
                .with_context(|| format!("invalid palette index: {s}"))?;
            return Ok(SlotValue::Index(check_index(index)?));
        }

        let mut stops = IndexMap::new();
        for part in s.split(',') {
            let Some((stop, index)) = part.split_once(':') else {
                bail!("invalid gradient stop '{part}', expected STOP:INDEX");
            };
            let stop = stop
                .trim()
                .parse::<u8>()
                .with_context(|| format!("invalid gradient stop: {stop}"))?;
            let index = index
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid palette index: {index}"))?;
            stops.insert(check_stop(stop)?, check_index(index)?);
        }
        Ok(SlotValue::Gradient(stops))
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Index(index) => write!(f, "{index}"),
            SlotValue::Gradient(stops) => {
                let parts: Vec<String> = stops
                    .iter()
                    .map(|(stop, index)| format!("{stop}:{index}"))
                    .collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

// Hand-written because untagged enums cannot read JSON string keys as integers.
impl<'de> Deserialize<'de> for SlotValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotVisitor;

        impl<'de> Visitor<'de> for SlotVisitor {
            type Value = SlotValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a palette index or a map of gradient stops to palette indices")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SlotValue, E> {
                usize::try_from(v)
                    .map(SlotValue::Index)
                    .map_err(|_| E::custom(format!("palette index {v} too large")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SlotValue, E> {
                usize::try_from(v)
                    .map(SlotValue::Index)
                    .map_err(|_| E::custom(format!("negative palette index {v}")))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SlotValue, A::Error> {
                let mut stops = IndexMap::new();
                while let Some((key, index)) = map.next_entry::<String, usize>()? {
                    let stop = key
                        .parse::<u8>()
                        .ok()
                        .filter(|s| *s <= MAX_STOP)
                        .ok_or_else(|| {
                            <A::Error as de::Error>::custom(format!("invalid gradient stop '{key}'"))
                        })?;
                    stops.insert(stop, index);
                }
                Ok(SlotValue::Gradient(stops))
            }
        }

        deserializer.deserialize_any(SlotVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn test_palette() -> Palette {
        Palette::new([
            Color::new(10, 20, 30),
            Color::new(200, 100, 50),
            Color::new(255, 0, 128),
            Color::new(0, 0, 0),
            Color::new(255, 255, 255),
        ])
    }

    fn gradient(stops: &[(u8, usize)]) -> SlotValue {
        SlotValue::Gradient(stops.iter().copied().collect())
    }

    #[test]
    fn index_resolves_to_uppercase_hex() {
        let out = resolve(&SlotValue::Index(2), &test_palette());
        assert_eq!(out.as_deref(), Some("#FF0080"));
    }

    #[test]
    fn index_out_of_range_is_unset() {
        assert_eq!(resolve(&SlotValue::Index(5), &test_palette()), None);
    }

    #[test]
    fn gradient_resolves_to_css() {
        let out = resolve(&gradient(&[(0, 0), (50, 1), (100, 0)]), &test_palette());
        assert_eq!(
            out.as_deref(),
            Some(
                "linear-gradient(90deg, rgb(10, 20, 30) 0%, rgb(200, 100, 50) 50%, rgb(10, 20, 30) 100%)"
            )
        );
    }

    #[test]
    fn gradient_keeps_insertion_order() {
        let out = resolve(&gradient(&[(100, 1), (0, 0)]), &test_palette()).unwrap();
        assert_eq!(
            out,
            "linear-gradient(90deg, rgb(200, 100, 50) 100%, rgb(10, 20, 30) 0%)"
        );
    }

    #[test]
    fn single_stop_gradient_is_unset() {
        let value = gradient(&[(50, 1)]);
        assert!(!value.is_set());
        assert_eq!(resolve(&value, &test_palette()), None);
        assert_eq!(resolve(&gradient(&[]), &test_palette()), None);
    }

    #[test]
    fn gradient_with_bad_index_is_unset() {
        assert_eq!(resolve(&gradient(&[(0, 0), (100, 9)]), &test_palette()), None);
    }

    #[test]
    fn parse_index_and_gradient() {
        assert_eq!("3".parse::<SlotValue>().unwrap(), SlotValue::Index(3));
        assert_eq!(
            "0:0, 50:1,100:0".parse::<SlotValue>().unwrap(),
            gradient(&[(0, 0), (50, 1), (100, 0)])
        );
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert!("5".parse::<SlotValue>().is_err());
        assert!("0:0,101:1".parse::<SlotValue>().is_err());
        assert!("0:0,50".parse::<SlotValue>().is_err());
        assert!("red".parse::<SlotValue>().is_err());
    }

    #[test]
    fn display_matches_parse_syntax() {
        let value = gradient(&[(100, 4), (0, 2)]);
        assert_eq!(value.to_string(), "100:4,0:2");
        assert_eq!(value.to_string().parse::<SlotValue>().unwrap(), value);
    }

    #[test]
    fn json_keeps_stop_order() {
        let data: ColorData =
            serde_json::from_str(r#"{"gradient":{"100":1,"0":0,"40":2},"strobe_color":0}"#)
                .unwrap();
        assert_eq!(data["gradient"], gradient(&[(100, 1), (0, 0), (40, 2)]));
        assert_eq!(data["strobe_color"], SlotValue::Index(0));

        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(
            json,
            r#"{"gradient":{"100":1,"0":0,"40":2},"strobe_color":0}"#
        );
    }

    #[test]
    fn json_rejects_bad_stop() {
        assert!(serde_json::from_str::<SlotValue>(r#"{"abc":1}"#).is_err());
        assert!(serde_json::from_str::<SlotValue>(r#"{"150":1}"#).is_err());
        assert!(serde_json::from_str::<SlotValue>(r#""red""#).is_err());
    }
}
