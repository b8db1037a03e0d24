use std::path::Path;

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use kmeans_colors::get_kmeans_hamerly;
use palette::{IntoColor, Lab, Srgb};

use crate::color::{Color, Palette, PALETTE_SIZE};

/// A color extracted from the image with its cluster weight.
#[derive(Debug, Clone)]
pub struct ExtractedColor {
    pub color: Color,
    pub weight: f32,
}

const MAX_DIM: u32 = 256;
const MAX_ITER: usize = 20;
const CONVERGE: f32 = 5.0;
const SEED: u64 = 42;

/// Extra attempts after the first failed extraction.
pub const MAX_RETRIES: usize = 3;

/// Load an image, resize to fit within 256x256 (preserving aspect ratio),
/// and convert all pixels to CIELAB space.
pub fn load_and_prepare(path: &Path) -> Result<Vec<Lab>> {
    let img = image::open(path).with_context(|| {
        if !path.exists() {
            format!("file not found: {}", path.display())
        } else {
            format!(
                "unsupported or corrupt artwork: {}. Supported formats: PNG, JPEG, WebP, BMP, TIFF, GIF",
                path.display()
            )
        }
    })?;

    let img = if img.width() > MAX_DIM || img.height() > MAX_DIM {
        img.resize(MAX_DIM, MAX_DIM, FilterType::Triangle)
    } else {
        img
    };
    let rgb_img = img.to_rgb8();

    let pixels: Vec<Lab> = rgb_img
        .pixels()
        .map(|p| {
            let srgb: Srgb<f32> = Srgb::new(p[0], p[1], p[2]).into_format();
            srgb.into_color()
        })
        .collect();

    Ok(pixels)
}

/// Run K-means on LAB pixels to extract dominant colors.
///
/// Returns the non-empty clusters sorted by weight (descending).
/// Uses Hamerly's algorithm with K-means++ initialization.
pub fn extract_colors(pixels: &[Lab], k: usize) -> Vec<ExtractedColor> {
    if pixels.is_empty() || k == 0 {
        return Vec::new();
    }
    let result = get_kmeans_hamerly(k, MAX_ITER, CONVERGE, false, pixels, SEED);

    let total = pixels.len() as f32;

    let mut counts = vec![0u32; result.centroids.len()];
    for &idx in &result.indices {
        counts[idx as usize] += 1;
    }

    let mut colors: Vec<ExtractedColor> = result
        .centroids
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[*i] > 0)
        .map(|(i, lab)| ExtractedColor {
            color: Color::from_lab(*lab),
            weight: counts[i] as f32 / total,
        })
        .collect();

    colors.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    colors
}

/// Reduce pixels to exactly five colors, heaviest cluster first.
///
/// Images with fewer distinct clusters (a flat cover, say) repeat their
/// clusters in weight order to fill the palette.
pub fn extract_palette(pixels: &[Lab]) -> Result<Palette> {
    let extracted = extract_colors(pixels, PALETTE_SIZE);
    if extracted.is_empty() {
        bail!("artwork has no pixels to extract colors from");
    }
    let colors: Vec<Color> = extracted
        .iter()
        .map(|e| e.color)
        .cycle()
        .take(PALETTE_SIZE)
        .collect();
    Palette::try_from(colors)
}

/// Load artwork and extract its palette.
pub fn palette_from_file(path: &Path) -> Result<Palette> {
    let pixels = load_and_prepare(path)?;
    extract_palette(&pixels)
        .with_context(|| format!("failed to extract colors from {}", path.display()))
}

/// Extract with up to [`MAX_RETRIES`] immediate retries.
///
/// Extraction is best-effort: after the last failure the error is logged and
/// `None` is returned.
pub fn extract_with_retry(path: &Path) -> Option<Palette> {
    retry(MAX_RETRIES, || palette_from_file(path))
}

fn retry<T>(retries: usize, mut attempt: impl FnMut() -> Result<T>) -> Option<T> {
    for n in 0..=retries {
        match attempt() {
            Ok(value) => return Some(value),
            Err(err) if n < retries => {
                tracing::warn!(attempt = n + 1, "error extracting colors, retrying: {err:#}");
            }
            Err(err) => {
                tracing::error!("error extracting colors, giving up: {err:#}");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lab(r: u8, g: u8, b: u8) -> Lab {
        Color::new(r, g, b).to_lab()
    }

    fn write_solid(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_fn(width, height, |_, _| image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }

    // --- load_and_prepare tests ---

    #[test]
    fn load_small_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_solid(dir.path(), "4x4.png", 4, 4, [128, 128, 128]);
        assert_eq!(load_and_prepare(&path).unwrap().len(), 16);
    }

    #[test]
    fn load_large_image_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_solid(dir.path(), "640x320.png", 640, 320, [10, 200, 30]);
        assert_eq!(load_and_prepare(&path).unwrap().len(), 256 * 128);
    }

    #[test]
    fn load_file_not_found() {
        let err = load_and_prepare(Path::new("/nonexistent/cover.png"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("file not found"), "got: {err}");
    }

    #[test]
    fn load_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.txt");
        std::fs::write(&path, "this is not an image").unwrap();
        let err = load_and_prepare(&path).unwrap_err().to_string();
        assert!(err.contains("unsupported"), "got: {err}");
    }

    // --- extract tests ---

    #[test]
    fn two_color_image_splits_weight() {
        let mut pixels = vec![lab(200, 50, 50); 600];
        pixels.extend(vec![lab(50, 50, 200); 400]);

        let colors = extract_colors(&pixels, PALETTE_SIZE);
        assert!(colors.len() >= 2);
        let total: f32 = colors.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-3);
        for pair in colors.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }

    #[test]
    fn palette_always_has_five_colors() {
        let pixels = vec![lab(200, 50, 50); 500];
        let palette = extract_palette(&pixels).unwrap();
        assert_eq!(palette.colors().len(), PALETTE_SIZE);
        let red = palette.get(0).unwrap();
        assert!(red.r > 190 && red.g < 60 && red.b < 60, "got {red}");
    }

    #[test]
    fn palette_from_empty_pixels_fails() {
        assert!(extract_palette(&[]).is_err());
    }

    #[test]
    fn palette_heaviest_cluster_first() {
        let mut pixels = vec![lab(20, 180, 40); 700];
        pixels.extend(vec![lab(240, 240, 240); 300]);
        let first = extract_palette(&pixels).unwrap().get(0).unwrap();
        assert!(first.g > 150 && first.r < 60, "got {first}");
    }

    // --- retry tests ---

    #[test]
    fn retry_gives_up_after_three_retries() {
        let mut calls = 0;
        let out: Option<()> = retry(MAX_RETRIES, || {
            calls += 1;
            bail!("decode failed")
        });
        assert!(out.is_none());
        assert_eq!(calls, MAX_RETRIES + 1);
    }

    #[test]
    fn retry_stops_on_first_success() {
        let mut calls = 0;
        let out = retry(MAX_RETRIES, || {
            calls += 1;
            if calls < 2 {
                bail!("transient");
            }
            Ok(calls)
        });
        assert_eq!(out, Some(2));
        assert_eq!(calls, 2);
    }

    #[test]
    fn extract_with_retry_missing_file() {
        assert!(extract_with_retry(Path::new("/nonexistent/cover.png")).is_none());
    }
}
