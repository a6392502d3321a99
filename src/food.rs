//! Food photo heuristics
//!
//! Derives colour and texture statistics from an uploaded photo and maps
//! them to salt, food-type, stimulation and flavour labels with fixed
//! thresholds. There is no model here: every label is a comparison against
//! one of the constants below.
//!
//! # Statistics
//!
//! | Statistic | How |
//! |-----------|-----|
//! | `avg_saturation` | mean S channel (0-255) |
//! | `avg_brightness` | mean V channel (0-255) |
//! | `texture` | variance of the 3x3 Laplacian of the grayscale image |
//! | `color_hist` | 180 x 256 hue/saturation histogram |
//!
//! HSV uses the 8-bit convention where hue is halved to fit in `[0, 180)`.
//! The Laplacian is evaluated in `f64` so negative responses are kept.
//!
//! # Labels
//!
//! | Label | Rule |
//! |-------|------|
//! | salt estimate | saturation > 100 High, < 50 Low, else Medium |
//! | food type | texture > 1000 Curry/Dal, < 500 Soup, else Solid Food |
//! | stimulation | round(saturation / 40) clamped to 1..=5 |
//! | flavour intensity | saturation > 100 Strong, < 50 Mild, else Medium |

use crate::error::{Error, Result};
use image::{ImageReader, Limits, RgbImage};
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const HUE_BINS: usize = 180;
pub const SATURATION_BINS: usize = 256;

/// Above this mean saturation the salt estimate is High
pub const SALT_HIGH_SATURATION: f64 = 100.0;
/// Below this mean saturation the salt estimate is Low
pub const SALT_LOW_SATURATION: f64 = 50.0;

/// Above this Laplacian variance the dish is Curry/Dal
pub const TEXTURE_CURRY_THRESHOLD: f64 = 1000.0;
/// Below this Laplacian variance the dish is Soup
pub const TEXTURE_SOUP_THRESHOLD: f64 = 500.0;

/// Saturation units per stimulation level
pub const STIMULATION_SATURATION_STEP: f64 = 40.0;
pub const STIMULATION_MIN: u8 = 1;
pub const STIMULATION_MAX: u8 = 5;

/// Upload limit applied when nothing else is configured (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Largest width or height decoded when nothing else is configured
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 8192;

/// Image file extensions picked up when scanning a directory
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

// ============================================================================
// Statistics
// ============================================================================

/// Hue x saturation pixel counts
#[derive(Debug, Clone, PartialEq)]
pub struct ColorHistogram {
    bins: Vec<u32>,
}

impl Default for ColorHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorHistogram {
    fn new() -> Self {
        Self {
            bins: vec![0; HUE_BINS * SATURATION_BINS],
        }
    }

    fn add(&mut self, hue: u8, saturation: u8) {
        self.bins[hue as usize * SATURATION_BINS + saturation as usize] += 1;
    }

    /// Count for one (hue, saturation) cell; out-of-range cells are 0
    pub fn get(&self, hue: usize, saturation: usize) -> u32 {
        if hue >= HUE_BINS || saturation >= SATURATION_BINS {
            return 0;
        }
        self.bins[hue * SATURATION_BINS + saturation]
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&c| c as u64).sum()
    }

    /// Most populated cell as `(hue, saturation, count)`, lowest index on ties
    pub fn peak(&self) -> (usize, usize, u32) {
        let (idx, count) = self
            .bins
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
        (idx / SATURATION_BINS, idx % SATURATION_BINS, count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageStatistics {
    pub width: u32,
    pub height: u32,
    pub avg_saturation: f64,
    pub avg_brightness: f64,
    /// Variance of the Laplacian of the grayscale image
    pub texture: f64,
    /// Too large for JSON responses; use [`ColorHistogram::peak`] for a summary
    #[serde(skip)]
    pub color_hist: ColorHistogram,
}

/// Compute colour and texture statistics for an RGB raster.
pub fn analyze(image: &RgbImage) -> Result<ImageStatistics> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage("image has no pixels".to_string()));
    }

    let mut hist = ColorHistogram::new();
    let mut sat_sum = 0u64;
    let mut val_sum = 0u64;
    let mut gray = Vec::with_capacity(width as usize * height as usize);

    for px in image.pixels() {
        let [r, g, b] = px.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        hist.add(h, s);
        sat_sum += s as u64;
        val_sum += v as u64;
        gray.push(rgb_to_gray(r, g, b) as f64);
    }

    let n = (width as u64 * height as u64) as f64;
    let stats = ImageStatistics {
        width,
        height,
        avg_saturation: sat_sum as f64 / n,
        avg_brightness: val_sum as f64 / n,
        texture: variance(&laplacian(&gray, width as usize, height as usize)),
        color_hist: hist,
    };

    debug!(
        width,
        height,
        saturation = stats.avg_saturation,
        brightness = stats.avg_brightness,
        texture = stats.texture,
        "image statistics"
    );
    Ok(stats)
}

/// RGB to 8-bit HSV: H in `[0, 180)`, S and V in `[0, 255]`
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { (255.0 * diff / v).round() } else { 0.0 };

    let h = if diff == 0.0 {
        0.0
    } else {
        let deg = if v == rf {
            60.0 * (gf - bf) / diff
        } else if v == gf {
            120.0 + 60.0 * (bf - rf) / diff
        } else {
            240.0 + 60.0 * (rf - gf) / diff
        };
        let deg = if deg < 0.0 { deg + 360.0 } else { deg };
        (deg / 2.0).round()
    };

    // 359.x degrees rounds up to 180, which wraps back to red
    let h = (h as u32 % HUE_BINS as u32) as u8;
    (h, s as u8, v as u8)
}

/// ITU-R BT.601 luma in 14-bit fixed point, rounded
fn rgb_to_gray(r: u8, g: u8, b: u8) -> u8 {
    let y = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
    y.min(255) as u8
}

/// Mirror an out-of-range index without repeating the edge pixel
fn reflect101(i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let i = if i < 0 { -i } else { i };
    let i = if i >= n { 2 * n - 2 - i } else { i };
    i as usize
}

/// 3x3 Laplacian `[0 1 0; 1 -4 1; 0 1 0]`
fn laplacian(gray: &[f64], width: usize, height: usize) -> Vec<f64> {
    let at = |x: isize, y: isize| gray[reflect101(y, height) * width + reflect101(x, width)];

    let mut out = Vec::with_capacity(gray.len());
    for y in 0..height as isize {
        for x in 0..width as isize {
            out.push(at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y));
        }
    }
    out
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

// ============================================================================
// Labels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaltEstimate {
    Low,
    Medium,
    High,
}

impl SaltEstimate {
    pub fn from_saturation(avg_saturation: f64) -> Self {
        if avg_saturation > SALT_HIGH_SATURATION {
            SaltEstimate::High
        } else if avg_saturation < SALT_LOW_SATURATION {
            SaltEstimate::Low
        } else {
            SaltEstimate::Medium
        }
    }

    /// Shown next to the estimate, relative to the recommended level
    pub fn delta(&self) -> &'static str {
        match self {
            SaltEstimate::High => "+25%",
            SaltEstimate::Low => "-15%",
            SaltEstimate::Medium => "Normal",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            SaltEstimate::High => "Reduce saltiness by 25%",
            SaltEstimate::Low => "Enhance saltiness by 15%",
            SaltEstimate::Medium => "Maintain current flavor profile",
        }
    }
}

impl fmt::Display for SaltEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaltEstimate::Low => write!(f, "Low"),
            SaltEstimate::Medium => write!(f, "Medium"),
            SaltEstimate::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FoodType {
    Soup,
    #[serde(rename = "Curry/Dal")]
    CurryDal,
    #[serde(rename = "Solid Food")]
    SolidFood,
}

impl FoodType {
    pub fn from_texture(texture: f64) -> Self {
        if texture > TEXTURE_CURRY_THRESHOLD {
            FoodType::CurryDal
        } else if texture < TEXTURE_SOUP_THRESHOLD {
            FoodType::Soup
        } else {
            FoodType::SolidFood
        }
    }
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoodType::Soup => write!(f, "Soup"),
            FoodType::CurryDal => write!(f, "Curry/Dal"),
            FoodType::SolidFood => write!(f, "Solid Food"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlavorIntensity {
    Mild,
    Medium,
    Strong,
}

impl FlavorIntensity {
    pub fn from_saturation(avg_saturation: f64) -> Self {
        if avg_saturation > SALT_HIGH_SATURATION {
            FlavorIntensity::Strong
        } else if avg_saturation < SALT_LOW_SATURATION {
            FlavorIntensity::Mild
        } else {
            FlavorIntensity::Medium
        }
    }
}

impl fmt::Display for FlavorIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlavorIntensity::Mild => write!(f, "Mild"),
            FlavorIntensity::Medium => write!(f, "Medium"),
            FlavorIntensity::Strong => write!(f, "Strong"),
        }
    }
}

/// Recommended device stimulation level, always within 1..=5
pub fn stimulation_level(avg_saturation: f64) -> u8 {
    let level = (avg_saturation / STIMULATION_SATURATION_STEP).round();
    level.clamp(STIMULATION_MIN as f64, STIMULATION_MAX as f64) as u8
}

/// Statistics plus every label derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodAnalysis {
    pub statistics: ImageStatistics,
    pub salt_estimate: SaltEstimate,
    pub salt_delta: &'static str,
    pub food_type: FoodType,
    pub stimulation_level: u8,
    pub flavor_intensity: FlavorIntensity,
    /// Mean saturation on a 0-100 scale
    pub saturation_percent: u8,
    pub recommendation: &'static str,
}

impl FoodAnalysis {
    pub fn from_statistics(statistics: ImageStatistics) -> Self {
        let saturation = statistics.avg_saturation;
        let salt_estimate = SaltEstimate::from_saturation(saturation);

        Self {
            salt_estimate,
            salt_delta: salt_estimate.delta(),
            food_type: FoodType::from_texture(statistics.texture),
            stimulation_level: stimulation_level(saturation),
            flavor_intensity: FlavorIntensity::from_saturation(saturation),
            saturation_percent: (saturation / 2.55).clamp(0.0, 100.0) as u8,
            recommendation: salt_estimate.recommendation(),
            statistics,
        }
    }
}

/// Bounds applied to an upload before and during decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    /// Largest accepted encoded file
    pub max_bytes: u64,
    /// Largest accepted width or height in pixels
    pub max_dimension: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

/// Decode an uploaded image and analyze it.
///
/// Uploads over `limits.max_bytes` are rejected before decoding; the header
/// is checked against `limits.max_dimension` before any pixels are decoded.
pub fn analyze_bytes(bytes: &[u8], limits: &ImageLimits) -> Result<FoodAnalysis> {
    let size = bytes.len() as u64;
    if size > limits.max_bytes {
        return Err(Error::ImageTooLarge { size, limit: limits.max_bytes });
    }

    let image = decode_bounded(bytes, limits.max_dimension)?;
    let stats = analyze(&image.to_rgb8())?;
    Ok(FoodAnalysis::from_statistics(stats))
}

fn decode_bounded(bytes: &[u8], max_dimension: u32) -> Result<image::DynamicImage> {
    let invalid = |e: image::ImageError| Error::InvalidImage(e.to_string());
    let reader = || {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| Error::InvalidImage(e.to_string()))
    };

    let (width, height) = reader()?.into_dimensions().map_err(invalid)?;
    if width > max_dimension || height > max_dimension {
        return Err(Error::ImageDimensions {
            width,
            height,
            limit: max_dimension,
        });
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);

    let mut decoder = reader()?;
    decoder.limits(limits);
    debug!(width, height, "decoding image");
    decoder.decode().map_err(invalid)
}

/// Read an image file (bounded by `limits`) and analyze it
pub fn analyze_path<P: AsRef<Path>>(path: P, limits: &ImageLimits) -> Result<FoodAnalysis> {
    let file = std::fs::File::open(path.as_ref())?;
    let size = file.metadata()?.len();
    if size > limits.max_bytes {
        return Err(Error::ImageTooLarge { size, limit: limits.max_bytes });
    }

    let mut bytes = Vec::with_capacity(size as usize);
    file.take(limits.max_bytes + 1).read_to_end(&mut bytes)?;
    analyze_bytes(&bytes, limits)
}

// ============================================================================
// Batch
// ============================================================================

/// Result for one file in a batch; errors are captured per file
#[derive(Debug, Clone, Serialize)]
pub struct FoodReport {
    pub file_path: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FoodAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FoodReport {
    pub fn from_path(path: &Path, limits: &ImageLimits) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let (analysis, error) = match analyze_path(path, limits) {
            Ok(a) => (Some(a), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            file_path: path.display().to_string(),
            file_name,
            analysis,
            error,
        }
    }
}

/// Image files under `path`, or `path` itself when it is a file
pub fn collect_images(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb};
    use std::io::Cursor;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(rgb))
    }

    fn checkerboard(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    // ==========================================================================
    // COLOUR CONVERSION TESTS
    // ==========================================================================

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
    }

    #[test]
    fn test_hsv_grays_have_no_saturation() {
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
        assert_eq!(rgb_to_hsv(128, 128, 128), (0, 0, 128));
        assert_eq!(rgb_to_hsv(255, 255, 255), (0, 0, 255));
    }

    #[test]
    fn test_hsv_hue_wraps_below_180() {
        // Just short of 360 degrees
        let (h, _, _) = rgb_to_hsv(255, 0, 1);
        assert!(h < HUE_BINS as u8);
    }

    #[test]
    fn test_gray_extremes() {
        assert_eq!(rgb_to_gray(0, 0, 0), 0);
        assert_eq!(rgb_to_gray(255, 255, 255), 255);
        assert_eq!(rgb_to_gray(100, 100, 100), 100);
    }

    // ==========================================================================
    // LAPLACIAN TESTS
    // ==========================================================================

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-1, 1), 0);
    }

    #[test]
    fn test_flat_image_has_no_texture() {
        let stats = analyze(&solid(8, 6, [200, 120, 40])).unwrap();
        assert_eq!(stats.texture, 0.0);
    }

    #[test]
    fn test_checkerboard_texture() {
        // Every pixel has four opposite neighbours: response is +/-1020
        let stats = analyze(&checkerboard(4)).unwrap();
        assert!((stats.texture - 1020.0 * 1020.0).abs() < 1e-6);
        assert_eq!(FoodType::from_texture(stats.texture), FoodType::CurryDal);
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 4.0);
    }

    // ==========================================================================
    // STATISTICS TESTS
    // ==========================================================================

    #[test]
    fn test_solid_red_statistics() {
        let stats = analyze(&solid(10, 10, [255, 0, 0])).unwrap();
        assert_eq!(stats.avg_saturation, 255.0);
        assert_eq!(stats.avg_brightness, 255.0);
        assert_eq!(stats.color_hist.get(0, 255), 100);
        assert_eq!(stats.color_hist.total(), 100);
        assert_eq!(stats.color_hist.peak(), (0, 255, 100));
    }

    #[test]
    fn test_half_saturated_image() {
        let img = RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgb([0, 255, 0])
            } else {
                Rgb([128, 128, 128])
            }
        });

        let stats = analyze(&img).unwrap();
        assert_eq!(stats.avg_saturation, 127.5);
        assert_eq!(stats.avg_brightness, (255.0 * 4.0 + 128.0 * 4.0) / 8.0);
        assert_eq!(stats.color_hist.get(60, 255), 4);
        assert_eq!(stats.color_hist.get(0, 0), 4);
    }

    #[test]
    fn test_histogram_out_of_range_is_zero() {
        let stats = analyze(&solid(1, 1, [10, 20, 30])).unwrap();
        assert_eq!(stats.color_hist.get(HUE_BINS, 0), 0);
        assert_eq!(stats.color_hist.get(0, SATURATION_BINS), 0);
    }

    #[test]
    fn test_empty_image_is_invalid() {
        let err = analyze(&RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    // ==========================================================================
    // THRESHOLD TESTS
    // ==========================================================================
    //
    // Comparisons are strict: exactly 100 is not High and exactly 50 is not
    // Low.
    // ==========================================================================

    #[test]
    fn test_salt_estimate_boundaries() {
        assert_eq!(SaltEstimate::from_saturation(100.0), SaltEstimate::Medium);
        assert_eq!(SaltEstimate::from_saturation(100.01), SaltEstimate::High);
        assert_eq!(SaltEstimate::from_saturation(50.0), SaltEstimate::Medium);
        assert_eq!(SaltEstimate::from_saturation(49.99), SaltEstimate::Low);
        assert_eq!(SaltEstimate::from_saturation(100.0).delta(), "Normal");
        assert_eq!(SaltEstimate::from_saturation(100.01).delta(), "+25%");
        assert_eq!(SaltEstimate::from_saturation(49.99).delta(), "-15%");
    }

    #[test]
    fn test_flavor_intensity_boundaries() {
        assert_eq!(FlavorIntensity::from_saturation(SALT_HIGH_SATURATION), FlavorIntensity::Medium);
        assert_eq!(FlavorIntensity::from_saturation(100.01), FlavorIntensity::Strong);
        assert_eq!(FlavorIntensity::from_saturation(SALT_LOW_SATURATION), FlavorIntensity::Medium);
        assert_eq!(FlavorIntensity::from_saturation(49.99), FlavorIntensity::Mild);
    }

    #[test]
    fn test_food_type_boundaries() {
        assert_eq!(FoodType::from_texture(TEXTURE_CURRY_THRESHOLD), FoodType::SolidFood);
        assert_eq!(FoodType::from_texture(1000.5), FoodType::CurryDal);
        assert_eq!(FoodType::from_texture(TEXTURE_SOUP_THRESHOLD), FoodType::SolidFood);
        assert_eq!(FoodType::from_texture(499.9), FoodType::Soup);
    }

    #[test]
    fn test_stimulation_level_in_range() {
        for tenth in 0..=2550 {
            let level = stimulation_level(tenth as f64 / 10.0);
            assert!((STIMULATION_MIN..=STIMULATION_MAX).contains(&level), "level {}", level);
        }
        assert_eq!(stimulation_level(0.0), 1);
        assert_eq!(stimulation_level(100.0), 3);
        assert_eq!(stimulation_level(140.0), 4);
        assert_eq!(stimulation_level(255.0), 5);
    }

    #[test]
    fn test_labels_serialize_with_display_names() {
        assert_eq!(serde_json::to_string(&FoodType::CurryDal).unwrap(), "\"Curry/Dal\"");
        assert_eq!(FoodType::SolidFood.to_string(), "Solid Food");
    }

    // ==========================================================================
    // DECODING TESTS
    // ==========================================================================

    #[test]
    fn test_analyze_bytes_png() {
        let bytes = png_bytes(solid(6, 6, [128, 128, 128]));
        let analysis = analyze_bytes(&bytes, &ImageLimits::default()).unwrap();

        assert_eq!(analysis.salt_estimate, SaltEstimate::Low);
        assert_eq!(analysis.flavor_intensity, FlavorIntensity::Mild);
        assert_eq!(analysis.food_type, FoodType::Soup);
        assert_eq!(analysis.stimulation_level, 1);
        assert_eq!(analysis.recommendation, "Enhance saltiness by 15%");
        assert_eq!(analysis.saturation_percent, 0);
    }

    #[test]
    fn test_analyze_bytes_rejects_garbage() {
        let err = analyze_bytes(b"definitely not a jpeg", &ImageLimits::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn test_analyze_bytes_enforces_limit() {
        let bytes = png_bytes(solid(4, 4, [1, 2, 3]));
        let limits = ImageLimits {
            max_bytes: 8,
            ..ImageLimits::default()
        };
        let err = analyze_bytes(&bytes, &limits).unwrap_err();
        assert!(matches!(err, Error::ImageTooLarge { limit: 8, .. }));
    }

    #[test]
    fn test_analyze_bytes_rejects_oversized_dimensions() {
        let limits = ImageLimits {
            max_dimension: 32,
            ..ImageLimits::default()
        };

        let wide = png_bytes(solid(64, 2, [10, 20, 30]));
        let err = analyze_bytes(&wide, &limits).unwrap_err();
        assert!(matches!(
            err,
            Error::ImageDimensions { width: 64, height: 2, limit: 32 }
        ));

        let tall = png_bytes(solid(2, 33, [10, 20, 30]));
        assert!(matches!(
            analyze_bytes(&tall, &limits),
            Err(Error::ImageDimensions { height: 33, .. })
        ));

        let fits = png_bytes(solid(32, 32, [10, 20, 30]));
        assert!(analyze_bytes(&fits, &limits).is_ok());
    }

    #[test]
    fn test_batch_report_captures_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("red.png"), png_bytes(solid(3, 3, [255, 0, 0]))).unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"nope").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let files = collect_images(dir.path());
        assert_eq!(files.len(), 2);

        let reports: Vec<FoodReport> = files
            .iter()
            .map(|p| FoodReport::from_path(p, &ImageLimits::default()))
            .collect();

        // Sorted: broken.jpg, red.png
        assert!(reports[0].error.is_some());
        let red = reports[1].analysis.as_ref().unwrap();
        assert_eq!(red.salt_estimate, SaltEstimate::High);
        assert_eq!(red.stimulation_level, 5);
        assert_eq!(reports[1].file_name, "red.png");
    }
}
