//! percept-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2 device discovery and format negotiation, a capture
//! session with an idempotent start/stop lifecycle, and single-frame
//! hand-off to consumers via a capacity-one overwrite slot.

pub mod camera;
pub mod format;
pub mod frame;
pub mod session;
pub mod slot;

pub use camera::{list_devices, Camera, CameraError, CameraFacing, DeviceInfo};
pub use format::{select_format, CaptureSpec, DeviceFormat};
pub use frame::Frame;
pub use session::{CaptureSession, FrameProducer, PreviewSink};
pub use slot::FrameSlot;
