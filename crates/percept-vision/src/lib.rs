//! percept-vision — Inference layer over captured frames.
//!
//! ONNX-backed image classification, face-rectangle detection, and
//! attention-based saliency, plus the coordinate-space and orientation
//! helpers shared by overlay rendering.

pub mod classifier;
pub mod detector;
pub mod geometry;
pub mod orientation;
pub mod request;
pub mod saliency;

pub use classifier::{Classification, ClassifierError, ImageClassifier};
pub use detector::{DetectorError, FaceDetection, FaceDetector};
pub use geometry::{mirror_horizontal, to_screen_rect, NormalizedRect, ScreenRect, Viewport};
pub use orientation::{exif_orientation, orient_upright, DeviceOrientation, ExifOrientation};
pub use request::{Observation, ObservationKind, VisionHandler, VisionRequest};
pub use saliency::{SaliencyError, SaliencyModel, SalientRegion};
