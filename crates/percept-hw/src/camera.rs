//! V4L2 camera access via the `v4l` crate — device discovery, facing-based
//! selection, format enumeration and application.

use crate::format::DeviceFormat;
use crate::frame::{self, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Fallback frame-rate range when the driver does not enumerate intervals.
const DEFAULT_FPS_RANGE: (u32, u32) = (1, 30);

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("no {0:?} camera present")]
    NoCameraForFacing(CameraFacing),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("no format matches the requested capture spec")]
    NoMatchingFormat,
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("capture thread spawn failed: {0}")]
    ThreadSpawn(std::io::Error),
    #[error("frame conversion: {0}")]
    Frame(#[from] frame::FrameError),
}

/// Which physical camera to use. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Back,
    Front,
}

impl CameraFacing {
    /// Resolve to a physical device path.
    ///
    /// V4L2 carries no facing metadata, so Front prefers a device whose
    /// card name suggests a user-facing camera and falls back to the
    /// second enumerated device. Back takes the first capture device.
    pub fn resolve(self) -> Result<DeviceInfo, CameraError> {
        let devices = list_devices();
        if devices.is_empty() {
            return Err(CameraError::NoCameraForFacing(self));
        }

        match self {
            CameraFacing::Back => Ok(devices[0].clone()),
            CameraFacing::Front => {
                let by_name = devices.iter().find(|d| {
                    let name = d.name.to_ascii_lowercase();
                    name.contains("front") || name.contains("user")
                });
                by_name
                    .or_else(|| devices.get(1))
                    .cloned()
                    .ok_or(CameraError::NoCameraForFacing(self))
            }
        }
    }
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        let current = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        Ok(Self {
            device,
            width: current.width,
            height: current.height,
            device_path: device_path.to_string(),
            fourcc: current.fourcc,
        })
    }

    /// Enumerate discrete YUYV formats with their supported rate ranges.
    ///
    /// Stepwise sizes are skipped — every webcam of interest reports
    /// discrete sizes, and the selection algorithm wants a finite list.
    pub fn formats(&self) -> Result<Vec<DeviceFormat>, CameraError> {
        let yuyv = FourCC::new(b"YUYV");
        let descriptions = self
            .device
            .enum_formats()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to enumerate formats: {e}")))?;

        if !descriptions.iter().any(|d| d.fourcc == yuyv) {
            return Err(CameraError::FormatNegotiationFailed(
                "device does not support YUYV".into(),
            ));
        }

        let sizes = self.device.enum_framesizes(yuyv).map_err(|e| {
            CameraError::CaptureFailed(format!("failed to enumerate frame sizes: {e}"))
        })?;

        let mut formats = Vec::new();
        for size in sizes {
            let FrameSizeEnum::Discrete(discrete) = size.size else {
                tracing::debug!(device = %self.device_path, "skipping stepwise frame size");
                continue;
            };

            let (fps_min, fps_max) = self.fps_range(yuyv, discrete.width, discrete.height);
            formats.push(DeviceFormat {
                width: discrete.width,
                height: discrete.height,
                fps_min,
                fps_max,
                fourcc: yuyv,
            });
        }

        tracing::debug!(
            device = %self.device_path,
            count = formats.len(),
            "enumerated capture formats"
        );
        Ok(formats)
    }

    /// Supported fps range for one discrete frame size.
    ///
    /// V4L2 intervals are seconds-per-frame fractions; fps = den / num.
    fn fps_range(&self, fourcc: FourCC, width: u32, height: u32) -> (u32, u32) {
        let Ok(intervals) = self.device.enum_frameintervals(fourcc, width, height) else {
            return DEFAULT_FPS_RANGE;
        };

        let mut min = u32::MAX;
        let mut max = 0u32;
        for interval in intervals {
            match interval.interval {
                FrameIntervalEnum::Discrete(f) if f.numerator > 0 => {
                    let fps = f.denominator / f.numerator;
                    min = min.min(fps);
                    max = max.max(fps);
                }
                FrameIntervalEnum::Stepwise(s) => {
                    if s.max.numerator > 0 {
                        min = min.min(s.max.denominator / s.max.numerator);
                    }
                    if s.min.numerator > 0 {
                        max = max.max(s.min.denominator / s.min.numerator);
                    }
                }
                _ => {}
            }
        }

        if max == 0 {
            DEFAULT_FPS_RANGE
        } else {
            (min.min(max), max)
        }
    }

    /// Apply a selected format and optional frame rate to the device.
    ///
    /// The driver holds its own exclusive configuration lock for the
    /// duration of each ioctl; a driver that silently negotiates a
    /// different size or pixel format is treated as a hard failure.
    pub fn apply_format(
        &mut self,
        format: &DeviceFormat,
        fps: Option<u32>,
    ) -> Result<(), CameraError> {
        let requested = Format::new(format.width, format.height, format.fourcc);
        let negotiated = self.device.set_format(&requested).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        if negotiated.fourcc != format.fourcc
            || negotiated.width != format.width
            || negotiated.height != format.height
        {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "driver substituted {}x{} {:?} for requested {}x{} {:?}",
                negotiated.width,
                negotiated.height,
                negotiated.fourcc,
                format.width,
                format.height,
                format.fourcc
            )));
        }

        if let Some(fps) = fps {
            self.device
                .set_params(&Parameters::with_fps(fps))
                .map_err(|e| {
                    CameraError::FormatNegotiationFailed(format!("failed to set frame rate: {e}"))
                })?;
        }

        self.width = negotiated.width;
        self.height = negotiated.height;
        self.fourcc = negotiated.fourcc;

        tracing::info!(
            device = %self.device_path,
            width = self.width,
            height = self.height,
            fourcc = ?self.fourcc,
            fps = ?fps,
            "applied capture format"
        );
        Ok(())
    }

    /// Start a memory-mapped capture stream on this device.
    pub fn open_stream(&self) -> Result<MmapStream<'_>, CameraError> {
        MmapStream::with_buffers(&self.device, v4l::buffer::Type::VideoCapture, 4)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))
    }

    /// Dequeue one buffer from a stream and convert it to an RGB frame.
    pub fn next_frame(&self, stream: &mut MmapStream) -> Result<Frame, CameraError> {
        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let rgb = frame::yuyv_to_rgb(buf, self.width, self.height)?;
        Ok(Frame {
            data: rgb,
            width: self.width,
            height: self.height,
            timestamp: std::time::Instant::now(),
            sequence: meta.sequence,
        })
    }
}

/// List available V4L2 video capture devices.
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for i in 0..16 {
        let path = format!("/dev/video{i}");
        if !Path::new(&path).exists() {
            continue;
        }
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            continue;
        }
        devices.push(DeviceInfo {
            path,
            name: caps.card.clone(),
            driver: caps.driver.clone(),
            bus: caps.bus.clone(),
        });
    }

    devices
}
