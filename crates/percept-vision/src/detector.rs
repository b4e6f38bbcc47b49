//! Face-rectangle detection via ONNX Runtime.
//!
//! Runs a single-stage detector in the UltraFace family: the model emits
//! per-prior class scores `[1, N, 2]` and boxes `[1, N, 4]` already in
//! normalized corner form, so decoding is threshold + NMS with no anchor
//! arithmetic.

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
const DETECTOR_INPUT_WIDTH: u32 = 320;
const DETECTOR_INPUT_HEIGHT: u32 = 240;
const DETECTOR_MEAN: f32 = 127.0;
const DETECTOR_STD: f32 = 128.0;
const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DETECTOR_NMS_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame dimensions do not match pixel data ({width}x{height}, {len} bytes)")]
    BadFrame { width: u32, height: u32, len: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// A detected face: normalized bottom-left-origin box plus confidence.
#[derive(Debug, Clone)]
pub struct FaceDetection {
    pub rect: NormalizedRect,
    pub confidence: f32,
}

/// Corner-form working representation during decode/NMS (top-left origin,
/// normalized to [0, 1]).
#[derive(Debug, Clone, Copy)]
struct CornerBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

/// Output tensor indices: (scores_idx, boxes_idx).
type OutputIndices = (usize, usize);

/// Single-stage ONNX face detector.
pub struct FaceDetector {
    session: Session,
    output_indices: OutputIndices,
}

impl FaceDetector {
    /// Load the detection ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();
        if output_names.len() < 2 {
            return Err(DetectorError::InferenceFailed(format!(
                "detector requires 2 outputs (scores, boxes), got {}",
                output_names.len()
            )));
        }
        let output_indices = discover_output_indices(&output_names);

        tracing::info!(
            path = model_path,
            outputs = ?output_names,
            ?output_indices,
            "loaded face detection model"
        );

        Ok(Self {
            session,
            output_indices,
        })
    }

    /// Detect faces in a frame, sorted by confidence descending.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, DetectorError> {
        let input = preprocess(frame)?;
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (scores_idx, boxes_idx) = self.output_indices;
        let (_, scores) = outputs[scores_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[boxes_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("boxes: {e}")))?;

        let candidates = decode(scores, boxes, DETECTOR_CONFIDENCE_THRESHOLD);
        let mut kept = nms(candidates, DETECTOR_NMS_THRESHOLD);
        kept.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(kept.into_iter().map(to_detection).collect())
    }
}

/// Find the scores/boxes output pair by name, falling back to positional
/// ordering when the export used generic names.
fn discover_output_indices(names: &[String]) -> OutputIndices {
    let scores = names.iter().position(|n| n == "scores");
    let boxes = names.iter().position(|n| n == "boxes");
    match (scores, boxes) {
        (Some(s), Some(b)) => (s, b),
        _ => (0, 1),
    }
}

/// Stretch-resize to the fixed input size and normalize to (x-127)/128.
fn preprocess(frame: &Frame) -> Result<Array4<f32>, DetectorError> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
        DetectorError::BadFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        },
    )?;

    let resized = DynamicImage::ImageRgb8(image)
        .resize_exact(DETECTOR_INPUT_WIDTH, DETECTOR_INPUT_HEIGHT, FilterType::Triangle)
        .to_rgb8();

    let (w, h) = (DETECTOR_INPUT_WIDTH as usize, DETECTOR_INPUT_HEIGHT as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - DETECTOR_MEAN) / DETECTOR_STD;
        }
    }
    Ok(tensor)
}

/// Threshold-filter the raw prior outputs into candidate corner boxes.
///
/// `scores` is `[background, face]` pairs per prior; `boxes` is
/// `[x1, y1, x2, y2]` per prior, normalized to the input, top-left origin.
fn decode(scores: &[f32], boxes: &[f32], threshold: f32) -> Vec<CornerBox> {
    let priors = scores.len() / 2;
    let mut candidates = Vec::new();

    for i in 0..priors {
        let score = scores[i * 2 + 1];
        if score <= threshold {
            continue;
        }
        let off = i * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        let x1 = boxes[off].clamp(0.0, 1.0);
        let y1 = boxes[off + 1].clamp(0.0, 1.0);
        let x2 = boxes[off + 2].clamp(0.0, 1.0);
        let y2 = boxes[off + 3].clamp(0.0, 1.0);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }
        candidates.push(CornerBox { x1, y1, x2, y2, score });
    }

    candidates
}

/// Non-Maximum Suppression over corner boxes.
fn nms(mut candidates: Vec<CornerBox>, iou_threshold: f32) -> Vec<CornerBox> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<CornerBox> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection-over-Union of two corner boxes.
fn iou(a: &CornerBox, b: &CornerBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Flip a top-left-origin corner box into the bottom-left-origin
/// normalized rect used by overlay rendering.
fn to_detection(b: CornerBox) -> FaceDetection {
    FaceDetection {
        rect: NormalizedRect {
            x: b.x1,
            y: 1.0 - b.y2,
            width: b.x2 - b.x1,
            height: b.y2 - b.y1,
        },
        confidence: b.score,
    }
}
