//! Capture session — lifecycle around a frame producer, a capacity-one
//! delivery slot, and an optional live preview sink.
//!
//! A session is created once per presentation, started when processing
//! begins and stopped at teardown. `start`/`stop` are idempotent.

use crate::camera::{Camera, CameraError, CameraFacing};
use crate::format::{select_format, CaptureSpec};
use crate::frame::Frame;
use crate::slot::FrameSlot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Consecutive per-frame capture failures tolerated before the capture
/// thread gives up (a wedged driver would otherwise spin forever).
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// A rendering surface mirroring the live feed.
///
/// `resize` is forwarded synchronously whenever the hosting surface's
/// bounds change; `render` is called from the capture thread.
pub trait PreviewSink: Send {
    fn render(&mut self, frame: &Frame);
    fn resize(&mut self, width: u32, height: u32);
}

/// Source of captured frames. Implemented by the camera; tests substitute
/// synthetic producers.
pub trait FrameProducer: Send + 'static {
    /// Stream frames into `emit` until it returns `false` or the source
    /// fails unrecoverably. Per-frame errors are skipped internally.
    fn stream(&mut self, emit: &mut dyn FnMut(Frame) -> bool) -> Result<(), CameraError>;
}

/// Streams from an opened, configured camera.
struct CameraProducer {
    camera: Arc<Camera>,
}

impl FrameProducer for CameraProducer {
    fn stream(&mut self, emit: &mut dyn FnMut(Frame) -> bool) -> Result<(), CameraError> {
        let mut stream = self.camera.open_stream()?;
        let mut consecutive_failures = 0u32;

        loop {
            match self.camera.next_frame(&mut stream) {
                Ok(frame) => {
                    consecutive_failures = 0;
                    if !emit(frame) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    tracing::warn!(error = %e, consecutive_failures, "frame capture failed");
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(e);
                    }
                }
            }
        }
    }
}

enum RunState {
    Idle(Box<dyn FrameProducer>),
    Running(JoinHandle<Box<dyn FrameProducer>>),
    /// Transient placeholder while ownership moves between states.
    Poisoned,
}

/// Owns the capture device and the frame-delivery slot.
pub struct CaptureSession {
    state: RunState,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    preview: Arc<Mutex<Option<Box<dyn PreviewSink>>>>,
    warmup_frames: usize,
    pub width: u32,
    pub height: u32,
}

impl CaptureSession {
    /// Resolve a device for `facing`, negotiate the best-matching format
    /// for `spec`, and build a stopped session around it.
    ///
    /// Fails when no device exists for the facing, no enumerated format
    /// satisfies the spec, or the driver rejects the chosen format; there
    /// is no degraded mode, so callers treat these as fatal.
    pub fn configure(
        facing: CameraFacing,
        spec: CaptureSpec,
        warmup_frames: usize,
    ) -> Result<Self, CameraError> {
        let info = facing.resolve()?;
        tracing::info!(facing = ?facing, device = %info.path, card = %info.name, "selected camera");

        let mut camera = Camera::open(&info.path)?;
        let formats = camera.formats()?;
        let selected = select_format(&formats, &spec)
            .copied()
            .ok_or(CameraError::NoMatchingFormat)?;
        camera.apply_format(&selected, spec.fps)?;

        let (width, height) = (camera.width, camera.height);
        Ok(Self::with_producer(
            Box::new(CameraProducer {
                camera: Arc::new(camera),
            }),
            warmup_frames,
            width,
            height,
        ))
    }

    /// Build a session around an arbitrary producer (tests use this).
    pub fn with_producer(
        producer: Box<dyn FrameProducer>,
        warmup_frames: usize,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            state: RunState::Idle(producer),
            slot: Arc::new(FrameSlot::new()),
            stop: Arc::new(AtomicBool::new(false)),
            preview: Arc::new(Mutex::new(None)),
            warmup_frames,
            width,
            height,
        }
    }

    /// The delivery slot consumers read from.
    pub fn slot(&self) -> Arc<FrameSlot> {
        Arc::clone(&self.slot)
    }

    /// Bind a preview surface mirroring the live feed.
    pub fn attach_preview(&self, sink: Box<dyn PreviewSink>) {
        *self.preview.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    /// Forward a bounds change to the attached preview, synchronously.
    pub fn resize_preview(&self, width: u32, height: u32) {
        if let Some(sink) = self
            .preview
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            sink.resize(width, height);
        }
    }

    /// Whether the capture thread is currently running.
    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running(_))
    }

    /// Start capture. A no-op when already running; fails only when the
    /// capture thread cannot be spawned.
    pub fn start(&mut self) -> Result<(), CameraError> {
        let producer = match std::mem::replace(&mut self.state, RunState::Poisoned) {
            RunState::Idle(p) => p,
            running @ RunState::Running(_) => {
                tracing::debug!("start ignored: session already running");
                self.state = running;
                return Ok(());
            }
            RunState::Poisoned => unreachable!("capture session state poisoned"),
        };

        self.stop.store(false, Ordering::SeqCst);
        self.slot.reopen();

        let slot = Arc::clone(&self.slot);
        let stop = Arc::clone(&self.stop);
        let preview = Arc::clone(&self.preview);
        let warmup = self.warmup_frames;

        let handle = std::thread::Builder::new()
            .name("percept-capture".into())
            .spawn(move || {
                tracing::info!("capture thread started");
                let mut producer = producer;
                let mut discarded = 0usize;

                let result = producer.stream(&mut |frame| {
                    if stop.load(Ordering::SeqCst) {
                        return false;
                    }
                    // Discard warmup frames for AGC/AE stabilization.
                    if discarded < warmup {
                        discarded += 1;
                        return true;
                    }
                    if let Some(sink) = preview.lock().unwrap_or_else(|e| e.into_inner()).as_mut()
                    {
                        sink.render(&frame);
                    }
                    slot.publish(frame);
                    true
                });

                if let Err(e) = result {
                    tracing::error!(error = %e, "capture thread exiting on error");
                    slot.close();
                }
                tracing::info!(overwritten = slot.overwritten(), "capture thread stopped");
                producer
            });

        match handle {
            Ok(handle) => {
                self.state = RunState::Running(handle);
                Ok(())
            }
            Err(e) => {
                // The producer moved into the never-run closure and is
                // gone; the session cannot restart after this.
                self.state = RunState::Idle(Box::new(DeadProducer));
                Err(CameraError::ThreadSpawn(e))
            }
        }
    }

    /// Stop capture: halt frame delivery, wake blocked consumers, join
    /// the capture thread. A no-op when already stopped.
    pub fn stop(&mut self) {
        let handle = match std::mem::replace(&mut self.state, RunState::Poisoned) {
            RunState::Running(h) => h,
            idle @ RunState::Idle(_) => {
                tracing::debug!("stop ignored: session not running");
                self.state = idle;
                return;
            }
            RunState::Poisoned => unreachable!("capture session state poisoned"),
        };

        self.stop.store(true, Ordering::SeqCst);
        self.slot.close();

        match handle.join() {
            Ok(producer) => self.state = RunState::Idle(producer),
            Err(_) => {
                // The thread panicked; the session can no longer restart,
                // but stop itself must not propagate the panic.
                tracing::error!("capture thread panicked");
                self.state = RunState::Idle(Box::new(DeadProducer));
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Replacement producer after a capture-thread panic: fails immediately.
struct DeadProducer;

impl FrameProducer for DeadProducer {
    fn stream(&mut self, _emit: &mut dyn FnMut(Frame) -> bool) -> Result<(), CameraError> {
        Err(CameraError::CaptureFailed(
            "previous capture thread panicked".into(),
        ))
    }
}
