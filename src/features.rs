//! Color feature extraction: RGB/HSV conversion, dominant colors by k-means
//! or HSV histogram peaks, and coarse palette categories.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// One dominant color and the share of pixels it covers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorInfo {
    pub rgb: [u8; 3],
    /// Fraction of pixels, in [0, 1]
    pub weight: f64,
    /// Degrees, [0, 360)
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl ColorInfo {
    pub fn from_rgb(rgb: [u8; 3], weight: f64) -> Self {
        let (hue, saturation, brightness) = rgb_to_hsv(rgb);
        Self {
            rgb,
            weight,
            hue,
            saturation,
            brightness,
        }
    }
}

/// Returns (hue in degrees, saturation, value), the latter two in [0, 1]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f64, f64, f64) {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (hue % 360.0, saturation, max)
}

pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let c = value * saturation;
    let h = (hue.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b)]
}

/// Dominant color extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// k-means on the full (already bounded) image
    KMeans,
    /// k-means on a 150px thumbnail with fewer iterations
    KMeansFast,
    /// Peaks of a 36x16x16 HSV histogram
    Histogram,
}

/// Shrink so that neither side exceeds the bounds, keeping aspect ratio
pub fn bound_image(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if image.width() > max_width || image.height() > max_height {
        image.resize(max_width, max_height, FilterType::Triangle)
    } else {
        image
    }
}

/// Dominant colors sorted by weight, heaviest first
pub fn dominant_colors(image: &RgbImage, algorithm: Algorithm, k: usize) -> Vec<ColorInfo> {
    match algorithm {
        Algorithm::KMeans => kmeans_colors(image, k, 20),
        Algorithm::KMeansFast => {
            let thumb = DynamicImage::ImageRgb8(image.clone());
            let thumb = bound_image(thumb, 150, 150).to_rgb8();
            kmeans_colors(&thumb, k, 10)
        }
        Algorithm::Histogram => histogram_colors(image, k),
    }
}

fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// k-means++ seeded clustering in RGB space.
///
/// The RNG is seeded from the pixel count so the same image always yields the
/// same palette.
pub fn kmeans_colors(image: &RgbImage, k: usize, iterations: usize) -> Vec<ColorInfo> {
    let pixels: Vec<[f64; 3]> = image
        .pixels()
        .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
        .collect();

    if pixels.is_empty() || k == 0 {
        return Vec::new();
    }

    let k = k.min(pixels.len());
    let mut rng = StdRng::seed_from_u64(pixels.len() as u64);

    let mut centers: Vec<[f64; 3]> = Vec::with_capacity(k);
    centers.push(pixels[rng.gen_range(0..pixels.len())]);
    let mut nearest: Vec<f64> = pixels.iter().map(|p| distance_sq(p, &centers[0])).collect();

    while centers.len() < k {
        let sum: f64 = nearest.iter().sum();
        let next = if sum == 0.0 {
            pixels[rng.gen_range(0..pixels.len())]
        } else {
            let mut target = rng.gen_range(0.0..sum);
            let mut chosen = pixels.len() - 1;
            for (i, d) in nearest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            pixels[chosen]
        };
        for (i, p) in pixels.iter().enumerate() {
            nearest[i] = nearest[i].min(distance_sq(p, &next));
        }
        centers.push(next);
    }

    let mut labels = vec![0usize; pixels.len()];
    for _ in 0..iterations {
        let mut moved = false;
        for (i, p) in pixels.iter().enumerate() {
            let best = centers
                .iter()
                .enumerate()
                .map(|(c, center)| (c, distance_sq(p, center)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(c, _)| c)
                .unwrap_or(0);
            if labels[i] != best {
                labels[i] = best;
                moved = true;
            }
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (p, &label) in pixels.iter().zip(&labels) {
            for c in 0..3 {
                sums[label][c] += p[c];
            }
            counts[label] += 1;
        }

        let mut shift = 0.0f64;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let updated = [
                sums[c][0] / counts[c] as f64,
                sums[c][1] / counts[c] as f64,
                sums[c][2] / counts[c] as f64,
            ];
            shift = shift.max(distance_sq(&updated, &centers[c]).sqrt());
            centers[c] = updated;
        }

        if !moved || shift < 1.0 {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for &label in &labels {
        counts[label] += 1;
    }

    let total = pixels.len() as f64;
    let mut colors: Vec<ColorInfo> = centers
        .iter()
        .zip(&counts)
        .map(|(center, &count)| {
            let rgb = [
                center[0].clamp(0.0, 255.0) as u8,
                center[1].clamp(0.0, 255.0) as u8,
                center[2].clamp(0.0, 255.0) as u8,
            ];
            ColorInfo::from_rgb(rgb, count as f64 / total)
        })
        .collect();

    colors.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    colors
}

const HUE_BINS: usize = 36;
const SAT_BINS: usize = 16;
const VAL_BINS: usize = 16;

/// Top `k` bins of a coarse HSV histogram, each reported at its bin center
pub fn histogram_colors(image: &RgbImage, k: usize) -> Vec<ColorInfo> {
    let total = image.width() as usize * image.height() as usize;
    if total == 0 {
        return Vec::new();
    }

    let mut bins = vec![0u32; HUE_BINS * SAT_BINS * VAL_BINS];
    for pixel in image.pixels() {
        let (h, s, v) = rgb_to_hsv(pixel.0);
        let hb = ((h / 360.0 * HUE_BINS as f64) as usize).min(HUE_BINS - 1);
        let sb = ((s * SAT_BINS as f64) as usize).min(SAT_BINS - 1);
        let vb = ((v * VAL_BINS as f64) as usize).min(VAL_BINS - 1);
        bins[(hb * SAT_BINS + sb) * VAL_BINS + vb] += 1;
    }

    let mut peaks: Vec<(usize, u32)> = bins
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(index, count)| (index, *count))
        .collect();
    peaks.sort_by(|a, b| b.1.cmp(&a.1));

    peaks
        .into_iter()
        .take(k)
        .map(|(index, count)| {
            let hb = index / (SAT_BINS * VAL_BINS);
            let sb = (index / VAL_BINS) % SAT_BINS;
            let vb = index % VAL_BINS;

            let hue = (hb as f64 + 0.5) * 360.0 / HUE_BINS as f64;
            let saturation = (sb as f64 + 0.5) / SAT_BINS as f64;
            let brightness = (vb as f64 + 0.5) / VAL_BINS as f64;

            ColorInfo {
                rgb: hsv_to_rgb(hue, saturation, brightness),
                weight: count as f64 / total as f64,
                hue,
                saturation,
                brightness,
            }
        })
        .collect()
}

/// Coarse palette category of a single color
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PaletteCategory {
    Vibrant,
    Dark,
    Light,
    Muted,
    Medium,
}

impl PaletteCategory {
    pub fn of(color: &ColorInfo) -> Self {
        if color.saturation > 0.6 && color.brightness > 0.6 {
            PaletteCategory::Vibrant
        } else if color.brightness < 0.3 {
            PaletteCategory::Dark
        } else if color.brightness > 0.8 && color.saturation < 0.3 {
            PaletteCategory::Light
        } else if color.saturation < 0.4 {
            PaletteCategory::Muted
        } else {
            PaletteCategory::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaletteCategory::Vibrant => "Vibrant",
            PaletteCategory::Dark => "Dark",
            PaletteCategory::Light => "Light",
            PaletteCategory::Muted => "Muted",
            PaletteCategory::Medium => "Medium",
        }
    }
}

/// Colors bucketed by category, categories in declaration order and colors
/// in input order. Empty categories are omitted.
pub fn by_category(colors: &[ColorInfo]) -> Vec<(PaletteCategory, Vec<&ColorInfo>)> {
    let mut rows: Vec<(PaletteCategory, Vec<&ColorInfo>)> = Vec::new();
    for color in colors {
        let category = PaletteCategory::of(color);
        match rows.iter_mut().find(|(c, _)| *c == category) {
            Some((_, members)) => members.push(color),
            None => rows.push((category, vec![color])),
        }
    }
    rows.sort_by_key(|(category, _)| *category);
    rows
}

/// One row of `swatch`-sized squares per category
pub fn render_palette(colors: &[ColorInfo], swatch: u32) -> RgbImage {
    let rows = by_category(colors);

    let padding = swatch / 8;
    let columns = rows.iter().map(|(_, members)| members.len()).max().unwrap_or(0) as u32;
    let width = (columns * (swatch + padding) + padding).max(1);
    let height = (rows.len() as u32 * (swatch + padding) + padding).max(1);
    let mut canvas = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));

    for (row, (_, members)) in rows.iter().enumerate() {
        let top = padding + row as u32 * (swatch + padding);
        for (column, color) in members.iter().enumerate() {
            let left = padding + column as u32 * (swatch + padding);
            for y in top..top + swatch {
                for x in left..left + swatch {
                    canvas.put_pixel(x, y, image::Rgb(color.rgb));
                }
            }
        }
    }

    canvas
}
