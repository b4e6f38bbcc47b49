//! Frame router: pulls frames off the capture slot on a dedicated
//! thread and feeds them to one of two inference paths, chosen per
//! frame by an atomic mode flag.

use percept_hw::frame::Frame;
use percept_hw::slot::FrameSlot;
use percept_vision::classifier::{Classification, ImageClassifier};
use percept_vision::orientation::ExifOrientation;
use percept_vision::request::{Observation, VisionHandler, VisionRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// One routed inference result.
#[derive(Debug)]
pub enum RouterEvent {
    /// Classification path: a single top label.
    Classification(Classification),
    /// Vision path: the observations for one frame.
    Observations(Vec<Observation>),
}

/// The two inference paths a frame can be routed to.
pub trait FramePipeline: Send {
    /// Classification path. `None` means the frame was skipped.
    fn classify(&mut self, frame: &Frame) -> Option<RouterEvent>;
    /// Vision-request path. `None` means the frame was skipped.
    fn analyze(&mut self, frame: &Frame) -> Option<RouterEvent>;
}

/// Production pipeline backed by ONNX models.
pub struct ModelPipeline {
    classifier: Option<ImageClassifier>,
    handler: VisionHandler,
    orientation: ExifOrientation,
    requests: Vec<VisionRequest>,
}

impl ModelPipeline {
    pub fn new(
        classifier: Option<ImageClassifier>,
        handler: VisionHandler,
        orientation: ExifOrientation,
        requests: Vec<VisionRequest>,
    ) -> Self {
        Self {
            classifier,
            handler,
            orientation,
            requests,
        }
    }
}

impl FramePipeline for ModelPipeline {
    fn classify(&mut self, frame: &Frame) -> Option<RouterEvent> {
        let classifier = self.classifier.as_mut()?;
        match classifier.classify(frame) {
            Ok(result) => Some(RouterEvent::Classification(result)),
            Err(e) => {
                // A bad frame is not fatal to the stream.
                tracing::debug!(error = %e, "classification failed; frame skipped");
                None
            }
        }
    }

    fn analyze(&mut self, frame: &Frame) -> Option<RouterEvent> {
        let observations = self.handler.perform(frame, self.orientation, &self.requests);
        Some(RouterEvent::Observations(observations))
    }
}

/// Owns the router thread and the mode flag.
///
/// The mode flag is read once per frame with relaxed ordering; a toggle
/// takes effect on the next frame pulled from the slot, never
/// mid-inference.
pub struct Router {
    vision_mode: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Router {
    /// Spawn the router thread. It runs until the slot closes or the
    /// event receiver is dropped.
    pub fn spawn(
        slot: Arc<FrameSlot>,
        mut pipeline: Box<dyn FramePipeline>,
        events: mpsc::UnboundedSender<RouterEvent>,
    ) -> std::io::Result<Self> {
        let vision_mode = Arc::new(AtomicBool::new(false));
        let mode = Arc::clone(&vision_mode);

        let handle = std::thread::Builder::new()
            .name("percept-router".into())
            .spawn(move || {
                while let Some(frame) = slot.recv() {
                    let event = if mode.load(Ordering::Relaxed) {
                        pipeline.analyze(&frame)
                    } else {
                        pipeline.classify(&frame)
                    };
                    let Some(event) = event else { continue };
                    if events.send(event).is_err() {
                        tracing::debug!("event receiver dropped; router stopping");
                        break;
                    }
                }
                tracing::debug!("router thread exiting");
            })?;

        Ok(Self {
            vision_mode,
            handle: Some(handle),
        })
    }

    pub fn vision_mode(&self) -> bool {
        self.vision_mode.load(Ordering::Relaxed)
    }

    pub fn set_vision_mode(&self, on: bool) {
        self.vision_mode.store(on, Ordering::Relaxed);
    }

    /// Flip the mode flag, returning the new value.
    pub fn toggle(&self) -> bool {
        let now = !self.vision_mode();
        self.set_vision_mode(now);
        now
    }

    /// Wait for the router thread to finish. Callers close the slot
    /// first; join without it blocks until the next published frame.
    ///
    /// Dropping a `Router` without calling this detaches the thread
    /// instead, which then exits on slot close or receiver drop.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn test_frame(sequence: u32) -> Frame {
        Frame {
            data: vec![0u8; 12],
            width: 2,
            height: 2,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Pipeline stub that reports which path each frame took.
    struct PathProbe;

    impl FramePipeline for PathProbe {
        fn classify(&mut self, frame: &Frame) -> Option<RouterEvent> {
            Some(RouterEvent::Classification(Classification {
                label: format!("classify-{}", frame.sequence),
                confidence: 1.0,
                scores: Vec::new(),
            }))
        }

        fn analyze(&mut self, _frame: &Frame) -> Option<RouterEvent> {
            Some(RouterEvent::Observations(Vec::new()))
        }
    }

    /// Pipeline stub that skips every frame on the classification path.
    struct SkipClassify;

    impl FramePipeline for SkipClassify {
        fn classify(&mut self, _frame: &Frame) -> Option<RouterEvent> {
            None
        }

        fn analyze(&mut self, _frame: &Frame) -> Option<RouterEvent> {
            Some(RouterEvent::Observations(Vec::new()))
        }
    }

    #[test]
    fn test_default_path_is_classification() {
        let slot = Arc::new(FrameSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::spawn(Arc::clone(&slot), Box::new(PathProbe), tx).unwrap();
        assert!(!router.vision_mode());

        slot.publish(test_frame(1));
        let event = rx.blocking_recv().unwrap();
        assert!(matches!(event, RouterEvent::Classification(_)));

        slot.close();
        router.join();
    }

    #[test]
    fn test_toggle_takes_effect_on_next_frame() {
        let slot = Arc::new(FrameSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::spawn(Arc::clone(&slot), Box::new(PathProbe), tx).unwrap();

        slot.publish(test_frame(1));
        assert!(matches!(
            rx.blocking_recv().unwrap(),
            RouterEvent::Classification(_)
        ));

        assert!(router.toggle());
        slot.publish(test_frame(2));
        assert!(matches!(
            rx.blocking_recv().unwrap(),
            RouterEvent::Observations(_)
        ));

        assert!(!router.toggle());
        slot.publish(test_frame(3));
        assert!(matches!(
            rx.blocking_recv().unwrap(),
            RouterEvent::Classification(_)
        ));

        slot.close();
        router.join();
    }

    #[test]
    fn test_skipped_frames_emit_nothing() {
        let slot = Arc::new(FrameSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::spawn(Arc::clone(&slot), Box::new(SkipClassify), tx).unwrap();

        slot.publish(test_frame(1));
        router.set_vision_mode(true);
        slot.publish(test_frame(2));

        // Only vision-path frames produce events; classification frames
        // are silently skipped by this pipeline.
        let event = rx.blocking_recv().unwrap();
        assert!(matches!(event, RouterEvent::Observations(_)));

        slot.close();
        router.join();
        while let Some(event) = rx.blocking_recv() {
            assert!(matches!(event, RouterEvent::Observations(_)));
        }
    }

    #[test]
    fn test_drop_detaches_without_blocking() {
        let slot = Arc::new(FrameSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::spawn(Arc::clone(&slot), Box::new(PathProbe), tx).unwrap();

        // Slot open, receiver alive: drop must return immediately, and
        // the detached thread keeps routing until the slot closes.
        drop(router);
        slot.publish(test_frame(1));
        assert!(matches!(
            rx.blocking_recv().unwrap(),
            RouterEvent::Classification(_)
        ));
        slot.close();
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_slot_close_stops_router() {
        let slot = Arc::new(FrameSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::spawn(Arc::clone(&slot), Box::new(PathProbe), tx).unwrap();

        slot.close();
        router.join();
        assert!(rx.blocking_recv().is_none());
    }
}
