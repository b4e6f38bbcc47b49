//! ONNX image classifier via ONNX Runtime.
//!
//! Consumes a fixed-size square color input; frames are converted with
//! center-crop semantics (scale so the shorter dimension fits, crop
//! centered on the longer one) before inference.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use percept_hw::Frame;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const CLASSIFIER_INPUT_SIZE: u32 = 224;
/// ImageNet channel means and stds, applied after scaling to [0, 1].
const CLASSIFIER_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CLASSIFIER_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("labels file not found: {0}")]
    LabelsNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame dimensions do not match pixel data ({width}x{height}, {len} bytes)")]
    BadFrame { width: u32, height: u32, len: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// The winning label plus the full label→score mapping.
#[derive(Debug, Clone)]
pub struct Classification {
    pub label: String,
    /// Probability of the winning label only.
    pub confidence: f32,
    pub scores: Vec<(String, f32)>,
}

/// ONNX image classifier with a labels file (one label per line).
pub struct ImageClassifier {
    session: Session,
    labels: Vec<String>,
}

impl ImageClassifier {
    /// Load the classification model and its labels file.
    pub fn load(model_path: &str, labels_path: &str) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }
        let raw_labels = std::fs::read_to_string(labels_path)
            .map_err(|_| ClassifierError::LabelsNotFound(labels_path.to_string()))?;
        let labels = parse_labels(&raw_labels);

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            labels = labels.len(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            "loaded classification model"
        );

        Ok(Self { session, labels })
    }

    /// Classify one frame, returning the winning label and the full
    /// score distribution (softmax over the model output).
    pub fn classify(&mut self, frame: &Frame) -> Result<Classification, ClassifierError> {
        let input = preprocess_center_crop(frame, CLASSIFIER_INPUT_SIZE)?;

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("output tensor: {e}")))?;

        if logits.is_empty() {
            return Err(ClassifierError::InferenceFailed("empty output".into()));
        }

        let probs = softmax(logits);
        drop(outputs);
        let (winner, confidence) = argmax(&probs)
            .ok_or_else(|| ClassifierError::InferenceFailed("no finite score".into()))?;

        let scores = probs
            .iter()
            .enumerate()
            .map(|(i, &p)| (self.label_for(i), p))
            .collect();

        Ok(Classification {
            label: self.label_for(winner),
            confidence,
            scores,
        })
    }

    fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class {index}"))
    }
}

/// Parse a labels file: one label per line, blank lines skipped.
pub fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert a frame into a square NCHW tensor with center-crop semantics.
///
/// The shorter dimension is scaled to `side`, the longer one is cropped
/// centered, then channels are normalized with the ImageNet statistics.
pub fn preprocess_center_crop(frame: &Frame, side: u32) -> Result<Array4<f32>, ClassifierError> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
        ClassifierError::BadFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        },
    )?;

    let square = DynamicImage::ImageRgb8(image)
        .resize_to_fill(side, side, FilterType::Triangle)
        .to_rgb8();

    let s = side as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in square.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] =
                (value - CLASSIFIER_MEAN[c]) / CLASSIFIER_STD[c];
        }
    }
    Ok(tensor)
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|&e| e / sum).collect()
    } else {
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}

/// Index and value of the maximum finite element. First-seen wins ties.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn solid_frame(width: u32, height: u32, rgb: (u8, u8, u8)) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
        }
        Frame {
            data,
            width,
            height,
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels("tabby cat\n\n  goldfish  \nspace shuttle\n");
        assert_eq!(labels, vec!["tabby cat", "goldfish", "space shuttle"]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        // Larger logit → larger probability
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1001.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[1] > probs[0]);
    }

    #[test]
    fn test_argmax_first_seen_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), Some((1, 0.5)));
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.3]), Some((1, 0.3)));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let frame = solid_frame(8, 8, (255, 0, 0));
        let tensor = preprocess_center_crop(&frame, 4).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);

        // Red channel: (1.0 - mean) / std; green/blue: (0.0 - mean) / std.
        let red = (1.0 - CLASSIFIER_MEAN[0]) / CLASSIFIER_STD[0];
        let green = (0.0 - CLASSIFIER_MEAN[1]) / CLASSIFIER_STD[1];
        assert!((tensor[[0, 0, 0, 0]] - red).abs() < 1e-4);
        assert!((tensor[[0, 1, 2, 2]] - green).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_center_crops_wide_frame() {
        // 6x2 frame: outer thirds black, middle third white. A centered
        // crop keeps only the middle columns.
        let mut frame = solid_frame(6, 2, (0, 0, 0));
        for y in 0..2u32 {
            for x in 2..4u32 {
                let idx = ((y * 6 + x) * 3) as usize;
                frame.data[idx] = 255;
                frame.data[idx + 1] = 255;
                frame.data[idx + 2] = 255;
            }
        }

        let tensor = preprocess_center_crop(&frame, 2).unwrap();
        // Every kept pixel comes from the white middle band.
        let white = (1.0 - CLASSIFIER_MEAN[0]) / CLASSIFIER_STD[0];
        for y in 0..2 {
            for x in 0..2 {
                assert!(
                    (tensor[[0, 0, y, x]] - white).abs() < 0.05,
                    "pixel ({x},{y}) not from the center crop"
                );
            }
        }
    }

    #[test]
    fn test_preprocess_rejects_mismatched_dimensions() {
        let frame = Frame {
            data: vec![0; 5], // not width*height*3
            width: 2,
            height: 2,
            timestamp: Instant::now(),
            sequence: 0,
        };
        assert!(matches!(
            preprocess_center_crop(&frame, 4),
            Err(ClassifierError::BadFrame { .. })
        ));
    }
}
