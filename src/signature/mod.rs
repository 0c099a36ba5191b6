//! # Signature Cleanup
//!
//! Turns a drawn stroke, uploaded scan or camera photo of a signature into a
//! trimmed asset with a transparent background:
//!
//! ```text
//! bitmap → grayscale → 5×5 Gaussian blur → adaptive threshold (21×21 mean)
//!        → dilate + connected components (drop specks) → soft alpha → crop
//! ```
//!
//! The adaptive threshold compares every pixel to the mean of its own
//! neighbourhood, so shadows and uneven paper don't turn into ink. Soft alpha
//! derives transparency from the same local contrast, which keeps the
//! anti-aliased edges of thin pen strokes instead of a jagged silhouette.
//!
//! The pipeline never fails. An undecodable input comes back unchanged with
//! zero dimensions; an input with no visible ink comes back uncropped.
//! Sources are raw bytes, `data:image/...;base64,` URIs or bare base64, as the
//! capture UI produces them.

pub mod components;
pub mod filters;
pub mod matte;

use std::io::Cursor;

use image::{ImageEncoder, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::FolioError;
use matte::CropBox;

/// Pipeline constants. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignatureConfig {
    /// Side of the square window used for the local mean.
    pub block_size: usize,
    /// How much darker than the local mean a pixel must be to count as ink.
    pub threshold_c: f32,
    /// Side of the square structuring element used to join stroke fragments.
    pub dilation_size: usize,
    /// Components with less ink than this are always noise.
    pub noise_floor: usize,
    /// Components with less ink than this fraction of the largest are noise.
    pub noise_ratio: f64,
    pub alpha_gain: f32,
    /// Pixels at or below this alpha don't count towards the crop box.
    pub visibility_threshold: u8,
    pub crop_padding: u32,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            block_size: 21,
            threshold_c: 10.0,
            dilation_size: 5,
            noise_floor: 50,
            noise_ratio: 0.05,
            alpha_gain: 2.0,
            visibility_threshold: 10,
            crop_padding: 20,
        }
    }
}

/// Measurements from one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureReport {
    pub ink_pixels: usize,
    pub components: usize,
    pub kept_components: usize,
    pub noise_floor: f64,
    /// `None` when nothing visible remained and the input was returned as is.
    pub crop: Option<CropBox>,
}

/// The result of processing a decoded bitmap.
#[derive(Debug, Clone)]
pub struct SignatureOutput {
    pub image: RgbaImage,
    pub report: SignatureReport,
}

/// An encoded signature asset, ready to become an image element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSignature {
    /// PNG bytes, or the original input when processing fell back.
    #[serde(skip)]
    pub data: Vec<u8>,
    /// `data:` URI for the processed PNG, or the original source string.
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl ProcessedSignature {
    fn fallback(data: Vec<u8>, src: String) -> Self {
        Self {
            data,
            src,
            width: 0,
            height: 0,
        }
    }

    /// Did processing fail and hand back the original input?
    pub fn is_fallback(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// A signature pipeline bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct SignatureProcessor {
    config: SignatureConfig,
}

impl SignatureProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SignatureConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline over a decoded bitmap.
    pub fn process_bitmap(&self, bitmap: &RgbaImage) -> SignatureOutput {
        let cfg = &self.config;
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return SignatureOutput {
                image: bitmap.clone(),
                report: SignatureReport {
                    ink_pixels: 0,
                    components: 0,
                    kept_components: 0,
                    noise_floor: cfg.noise_floor as f64,
                    crop: None,
                },
            };
        }

        let gray = filters::grayscale(bitmap);
        let blurred = filters::gaussian_blur(&gray);
        let means = filters::local_means(&blurred, cfg.block_size);
        let ink = filters::adaptive_threshold(&blurred, &means, cfg.threshold_c);
        let region = components::dilate(&ink, cfg.dilation_size);
        let filtered = components::filter_components(&ink, &region, cfg.noise_floor, cfg.noise_ratio);
        let matted = matte::soft_alpha(&blurred, &means, &filtered.kept, cfg.alpha_gain);
        let crop = matte::visible_bounds(&matted, cfg.visibility_threshold, cfg.crop_padding);

        let report = SignatureReport {
            ink_pixels: ink.count(),
            components: filtered.components,
            kept_components: filtered.kept_components,
            noise_floor: filtered.noise_floor,
            crop,
        };
        debug!(
            "signature: {}x{}, {} ink px, kept {}/{} components (floor {}), crop {:?}",
            bitmap.width(),
            bitmap.height(),
            report.ink_pixels,
            report.kept_components,
            report.components,
            report.noise_floor,
            report.crop
        );

        let image = match crop {
            Some(bounds) => matte::crop(&matted, bounds),
            None => bitmap.clone(),
        };
        SignatureOutput { image, report }
    }

    /// Process encoded image bytes (PNG, JPEG or WebP).
    pub fn process_bytes(&self, data: &[u8]) -> ProcessedSignature {
        match self.try_process_bytes(data) {
            Ok(processed) => processed,
            Err(e) => {
                warn!("signature: returning input unchanged: {}", e);
                ProcessedSignature::fallback(data.to_vec(), String::new())
            }
        }
    }

    /// Process a data URI or bare base64 string. The fallback hands the
    /// source string back untouched.
    pub fn process_source(&self, src: &str) -> ProcessedSignature {
        let result = read_source_bytes(src).and_then(|bytes| self.try_process_bytes(&bytes));
        match result {
            Ok(processed) => processed,
            Err(e) => {
                warn!("signature: returning source unchanged: {}", e);
                ProcessedSignature::fallback(Vec::new(), src.to_string())
            }
        }
    }

    fn try_process_bytes(&self, data: &[u8]) -> Result<ProcessedSignature, FolioError> {
        let bitmap = decode_bitmap(data)?;
        let output = self.process_bitmap(&bitmap);
        if output.report.crop.is_none() {
            // Nothing visible: the original, uncropped.
            return Ok(ProcessedSignature {
                data: data.to_vec(),
                src: data_uri(data, sniff_mime(data)),
                width: bitmap.width(),
                height: bitmap.height(),
            });
        }
        let png = encode_png(&output.image)?;
        Ok(ProcessedSignature {
            src: data_uri(&png, "image/png"),
            data: png,
            width: output.image.width(),
            height: output.image.height(),
        })
    }
}

/// Process encoded bytes with the default configuration.
pub fn process_signature(data: &[u8]) -> ProcessedSignature {
    SignatureProcessor::new().process_bytes(data)
}

/// Process on a worker thread. The caller's thread stays free while the
/// per-pixel passes run; the handle yields the processed asset.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_process_signature(
    processor: SignatureProcessor,
    data: Vec<u8>,
) -> std::thread::JoinHandle<ProcessedSignature> {
    std::thread::spawn(move || processor.process_bytes(&data))
}

/// Resolve a source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, FolioError> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| FolioError::Source("Invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }
    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, FolioError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| FolioError::Source(format!("Base64 decode error: {}", e)))
}

fn data_uri(bytes: &[u8], mime: &str) -> String {
    use base64::Engine;
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn sniff_mime(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    }
}

/// Decode any supported format to RGBA.
fn decode_bitmap(data: &[u8]) -> Result<RgbaImage, FolioError> {
    if data.len() < 4 {
        return Err(FolioError::Image("Image data too short".to_string()));
    }
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| FolioError::Image(format!("Format detection error: {}", e)))?;
    Ok(reader.decode()?.to_rgba8())
}

fn encode_png(bitmap: &RgbaImage) -> Result<Vec<u8>, FolioError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder.write_image(
        bitmap.as_raw(),
        bitmap.width(),
        bitmap.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(buf)
}
