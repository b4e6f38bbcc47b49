//! Vision request dispatch — a frame plus orientation metadata in, a
//! list of typed observations out.
//!
//! Callers configure which request types run; a failing backend is
//! logged and contributes no observations, it never tears down the
//! caller's pipeline.

use crate::classifier::ImageClassifier;
use crate::detector::FaceDetector;
use crate::geometry::NormalizedRect;
use crate::orientation::{orient_upright, ExifOrientation};
use crate::saliency::SaliencyModel;
use percept_hw::Frame;
use serde::Serialize;

/// Request types a [`VisionHandler`] can run per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionRequest {
    FaceRectangles,
    AttentionSaliency,
    Classification,
}

/// What kind of thing an observation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Face,
    SalientObject,
    Classification,
}

/// One typed observation. Consumers read bounding boxes for overlay
/// rendering and do not interpret observations further.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub bounding_box: Option<NormalizedRect>,
    pub confidence: f32,
    pub identifier: Option<String>,
}

/// Runs configured vision backends against oriented frames.
///
/// Backends are optional; a request whose backend is not loaded is
/// skipped with a warning.
#[derive(Default)]
pub struct VisionHandler {
    detector: Option<FaceDetector>,
    saliency: Option<SaliencyModel>,
    classifier: Option<ImageClassifier>,
}

impl VisionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(mut self, detector: FaceDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_saliency(mut self, saliency: SaliencyModel) -> Self {
        self.saliency = Some(saliency);
        self
    }

    pub fn with_classifier(mut self, classifier: ImageClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Run the given requests against one frame.
    ///
    /// The frame is first rotated upright per the EXIF orientation so
    /// every backend sees upright pixels.
    pub fn perform(
        &mut self,
        frame: &Frame,
        orientation: ExifOrientation,
        requests: &[VisionRequest],
    ) -> Vec<Observation> {
        let oriented = orient_upright(frame, orientation);
        let mut observations = Vec::new();

        for request in requests {
            match request {
                VisionRequest::FaceRectangles => {
                    self.perform_faces(&oriented, &mut observations)
                }
                VisionRequest::AttentionSaliency => {
                    self.perform_saliency(&oriented, &mut observations)
                }
                VisionRequest::Classification => {
                    self.perform_classification(&oriented, &mut observations)
                }
            }
        }

        observations
    }

    fn perform_faces(&mut self, frame: &Frame, out: &mut Vec<Observation>) {
        let Some(detector) = self.detector.as_mut() else {
            tracing::warn!("face-rectangle request skipped: no detector loaded");
            return;
        };
        match detector.detect(frame) {
            Ok(faces) => out.extend(faces.into_iter().map(|f| Observation {
                kind: ObservationKind::Face,
                bounding_box: Some(f.rect),
                confidence: f.confidence,
                identifier: None,
            })),
            Err(e) => tracing::warn!(error = %e, "face detection failed; frame dropped"),
        }
    }

    fn perform_saliency(&mut self, frame: &Frame, out: &mut Vec<Observation>) {
        let Some(saliency) = self.saliency.as_mut() else {
            tracing::warn!("saliency request skipped: no saliency model loaded");
            return;
        };
        match saliency.salient_region(frame) {
            Ok(Some(region)) => out.push(Observation {
                kind: ObservationKind::SalientObject,
                bounding_box: Some(region.rect),
                confidence: region.confidence,
                identifier: None,
            }),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "saliency failed; frame dropped"),
        }
    }

    fn perform_classification(&mut self, frame: &Frame, out: &mut Vec<Observation>) {
        let Some(classifier) = self.classifier.as_mut() else {
            tracing::warn!("classification request skipped: no classifier loaded");
            return;
        };
        match classifier.classify(frame) {
            Ok(result) => out.push(Observation {
                kind: ObservationKind::Classification,
                bounding_box: None,
                confidence: result.confidence,
                identifier: Some(result.label),
            }),
            Err(e) => tracing::warn!(error = %e, "vision classification failed; frame dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn frame() -> Frame {
        Frame {
            data: vec![0; 2 * 2 * 3],
            width: 2,
            height: 2,
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_unloaded_backends_yield_no_observations() {
        let mut handler = VisionHandler::new();
        let observations = handler.perform(
            &frame(),
            ExifOrientation::RightTop,
            &[
                VisionRequest::FaceRectangles,
                VisionRequest::AttentionSaliency,
                VisionRequest::Classification,
            ],
        );
        assert!(observations.is_empty());
    }

    #[test]
    fn test_empty_request_list() {
        let mut handler = VisionHandler::new();
        assert!(handler
            .perform(&frame(), ExifOrientation::TopLeft, &[])
            .is_empty());
    }

    #[test]
    fn test_observation_serializes() {
        let obs = Observation {
            kind: ObservationKind::Face,
            bounding_box: Some(NormalizedRect {
                x: 0.1,
                y: 0.2,
                width: 0.3,
                height: 0.4,
            }),
            confidence: 0.9,
            identifier: None,
        };
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("\"kind\":\"face\""));
        assert!(json.contains("\"bounding_box\""));
    }
}
