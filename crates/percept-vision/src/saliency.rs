//! Attention-based saliency via ONNX Runtime.
//!
//! The model produces a single-channel attention heatmap; the salient
//! object is reported as the bounding box of the region above a fixed
//! fraction of the peak activation. At most one observation per frame.

use crate::geometry::NormalizedRect;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use percept_hw::Frame;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const SALIENCY_INPUT_SIZE: u32 = 256;
/// Heatmap cells at or above this fraction of the peak belong to the
/// salient region.
const SALIENCY_REGION_FRACTION: f32 = 0.5;
/// Peaks below this are treated as "nothing salient".
const SALIENCY_MIN_PEAK: f32 = 0.1;

#[derive(Error, Debug)]
pub enum SaliencyError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame dimensions do not match pixel data ({width}x{height}, {len} bytes)")]
    BadFrame { width: u32, height: u32, len: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// The single most salient region of a frame.
#[derive(Debug, Clone)]
pub struct SalientRegion {
    pub rect: NormalizedRect,
    /// Peak heatmap activation inside the region.
    pub confidence: f32,
}

/// Attention-based saliency model.
pub struct SaliencyModel {
    session: Session,
}

impl SaliencyModel {
    /// Load the saliency ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, SaliencyError> {
        if !Path::new(model_path).exists() {
            return Err(SaliencyError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded saliency model"
        );

        Ok(Self { session })
    }

    /// Find the most salient region of a frame, if any.
    pub fn salient_region(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<SalientRegion>, SaliencyError> {
        let input = preprocess(frame)?;
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (shape, heatmap) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SaliencyError::InferenceFailed(format!("heatmap: {e}")))?;

        // Accept [1, 1, H, W] or [H, W]; the trailing two dims are the map.
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let (h, w) = match dims.as_slice() {
            [.., h, w] if h * w > 0 && heatmap.len() >= h * w => (*h, *w),
            _ => {
                return Err(SaliencyError::InferenceFailed(format!(
                    "unexpected heatmap shape {dims:?}"
                )))
            }
        };

        Ok(heatmap_region(&heatmap[..h * w], w, h))
    }
}

/// Scale to the square input and normalize channels to [0, 1].
fn preprocess(frame: &Frame) -> Result<Array4<f32>, SaliencyError> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
        SaliencyError::BadFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        },
    )?;

    let resized = DynamicImage::ImageRgb8(image)
        .resize_exact(SALIENCY_INPUT_SIZE, SALIENCY_INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let s = SALIENCY_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    Ok(tensor)
}

/// Bounding box of the above-threshold region of a heatmap.
///
/// The heatmap is row-major with row 0 at the top; the returned rect is
/// normalized with a bottom-left origin. Returns `None` when the peak is
/// too weak to call anything salient.
pub fn heatmap_region(map: &[f32], width: usize, height: usize) -> Option<SalientRegion> {
    let peak = map.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !peak.is_finite() || peak < SALIENCY_MIN_PEAK {
        return None;
    }

    let threshold = peak * SALIENCY_REGION_FRACTION;
    let mut min_x = usize::MAX;
    let mut max_x = 0usize;
    let mut min_y = usize::MAX;
    let mut max_y = 0usize;

    for y in 0..height {
        for x in 0..width {
            if map[y * width + x] >= threshold {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }

    if min_x == usize::MAX {
        return None;
    }

    let w = width as f32;
    let h = height as f32;
    Some(SalientRegion {
        rect: NormalizedRect {
            x: min_x as f32 / w,
            // Flip from top-row-first indexing to a bottom-left origin.
            y: 1.0 - (max_y + 1) as f32 / h,
            width: (max_x - min_x + 1) as f32 / w,
            height: (max_y - min_y + 1) as f32 / h,
        },
        confidence: peak,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heatmap_single_hot_cell() {
        // 4x4 map, hot cell at (1, 2) — third row from the top.
        let mut map = vec![0.0f32; 16];
        map[2 * 4 + 1] = 1.0;
        let region = heatmap_region(&map, 4, 4).unwrap();
        assert!((region.confidence - 1.0).abs() < 1e-6);
        assert!((region.rect.x - 0.25).abs() < 1e-6);
        // Row 2 of 4 ⇒ bottom-left y = 1 - 3/4 = 0.25
        assert!((region.rect.y - 0.25).abs() < 1e-6);
        assert!((region.rect.width - 0.25).abs() < 1e-6);
        assert!((region.rect.height - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_heatmap_region_spans_hot_cells() {
        // Hot cells at opposite corners of a 4x4 map span the full map.
        let mut map = vec![0.0f32; 16];
        map[0] = 0.9;
        map[15] = 0.8;
        let region = heatmap_region(&map, 4, 4).unwrap();
        assert!((region.rect.x - 0.0).abs() < 1e-6);
        assert!((region.rect.y - 0.0).abs() < 1e-6);
        assert!((region.rect.width - 1.0).abs() < 1e-6);
        assert!((region.rect.height - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_heatmap_region_excludes_sub_threshold_cells() {
        // A weak cell below half the peak does not widen the region.
        let mut map = vec![0.0f32; 16];
        map[2 * 4 + 1] = 1.0;
        map[0] = 0.3; // below 0.5 * peak
        let region = heatmap_region(&map, 4, 4).unwrap();
        assert!((region.rect.width - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_heatmap_weak_peak_is_not_salient() {
        let map = vec![0.05f32; 16];
        assert!(heatmap_region(&map, 4, 4).is_none());
    }

    #[test]
    fn test_heatmap_all_nan() {
        let map = vec![f32::NAN; 4];
        assert!(heatmap_region(&map, 2, 2).is_none());
    }
}
