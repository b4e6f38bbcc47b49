//! Capture format negotiation — preferred-spec matching over enumerated
//! hardware formats.

use v4l::FourCC;

/// Desired capture parameters, applied once at configuration time.
///
/// Both fields are optional: with neither set, the highest-resolution
/// format wins; with only `fps` set, the first rate-compatible format
/// with the greatest width wins; with `size` set, the first format
/// meeting or exceeding both dimensions wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureSpec {
    /// Preferred frame rate in frames per second.
    pub fps: Option<u32>,
    /// Preferred frame dimensions (width, height).
    pub size: Option<(u32, u32)>,
}

/// One hardware format as enumerated from the driver: a discrete frame
/// size plus the frame-rate range it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFormat {
    pub width: u32,
    pub height: u32,
    pub fps_min: u32,
    pub fps_max: u32,
    pub fourcc: FourCC,
}

impl DeviceFormat {
    /// Whether this format can deliver the given frame rate.
    pub fn supports_fps(&self, fps: u32) -> bool {
        self.fps_min <= fps && fps <= self.fps_max
    }
}

/// Pick the best-matching format for a preferred spec.
///
/// If a frame rate is given, only rate-compatible formats are considered.
/// If a size is given, the first format whose width and height both meet
/// or exceed it wins. Otherwise the format with the maximum width wins,
/// first-seen on ties (strictly-greater replacement).
///
/// Returns `None` when no format satisfies the spec; configuration then
/// fails rather than falling back to an arbitrary format.
pub fn select_format<'a>(
    formats: &'a [DeviceFormat],
    spec: &CaptureSpec,
) -> Option<&'a DeviceFormat> {
    let rate_ok = |f: &&DeviceFormat| match spec.fps {
        Some(fps) => f.supports_fps(fps),
        None => true,
    };

    match spec.size {
        Some((w, h)) => formats
            .iter()
            .filter(rate_ok)
            .find(|f| f.width >= w && f.height >= h),
        None => {
            let mut selected: Option<&DeviceFormat> = None;
            for format in formats.iter().filter(rate_ok) {
                match selected {
                    Some(prev) if format.width <= prev.width => {}
                    _ => selected = Some(format),
                }
            }
            selected
        }
    }
}
