//! Device-orientation metadata for vision requests.
//!
//! Maps the physical device orientation to an EXIF orientation code and
//! can reorient an RGB frame to upright before inference. The mapping
//! only supports the rear-facing camera.

use percept_hw::Frame;

/// Physical orientation of the device at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

/// EXIF orientation codes (subset reachable from the rear camera).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ExifOrientation {
    /// Row 0 at top, column 0 at left — upright.
    TopLeft = 1,
    /// Row 0 at bottom, column 0 at right — rotated 180°.
    BottomRight = 3,
    /// Row 0 at right, column 0 at top — needs 90° CW to display.
    RightTop = 6,
    /// Row 0 at left, column 0 at bottom — needs 90° CCW to display.
    LeftBottom = 8,
}

impl ExifOrientation {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// EXIF orientation for the rear camera at a given device orientation.
pub fn exif_orientation(orientation: DeviceOrientation) -> ExifOrientation {
    match orientation {
        DeviceOrientation::PortraitUpsideDown => ExifOrientation::LeftBottom,
        DeviceOrientation::LandscapeLeft => ExifOrientation::TopLeft,
        DeviceOrientation::LandscapeRight => ExifOrientation::BottomRight,
        _ => ExifOrientation::RightTop,
    }
}

/// Rotate a frame upright according to its EXIF orientation.
///
/// `TopLeft` is a cheap pass-through; the three rotations copy pixels.
pub fn orient_upright(frame: &Frame, exif: ExifOrientation) -> Frame {
    match exif {
        ExifOrientation::TopLeft => frame.clone(),
        ExifOrientation::BottomRight => rotate_180(frame),
        ExifOrientation::RightTop => rotate_90_cw(frame),
        ExifOrientation::LeftBottom => rotate_90_ccw(frame),
    }
}

fn rotate_180(frame: &Frame) -> Frame {
    let mut data = Vec::with_capacity(frame.data.len());
    for px in frame.data.chunks_exact(3).rev() {
        data.extend_from_slice(px);
    }
    Frame { data, ..frame.clone() }
}

fn rotate_90_cw(frame: &Frame) -> Frame {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let mut data = vec![0u8; frame.data.len()];
    for y in 0..h {
        for x in 0..w {
            let src = (y * w + x) * 3;
            // (x, y) → (h - 1 - y, x) in an h-wide destination
            let dst = (x * h + (h - 1 - y)) * 3;
            data[dst..dst + 3].copy_from_slice(&frame.data[src..src + 3]);
        }
    }
    Frame {
        data,
        width: frame.height,
        height: frame.width,
        ..frame.clone()
    }
}

fn rotate_90_ccw(frame: &Frame) -> Frame {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let mut data = vec![0u8; frame.data.len()];
    for y in 0..h {
        for x in 0..w {
            let src = (y * w + x) * 3;
            // (x, y) → (y, w - 1 - x) in an h-wide destination
            let dst = ((w - 1 - x) * h + y) * 3;
            data[dst..dst + 3].copy_from_slice(&frame.data[src..src + 3]);
        }
    }
    Frame {
        data,
        width: frame.height,
        height: frame.width,
        ..frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_rear_camera_orientation_mapping() {
        assert_eq!(
            exif_orientation(DeviceOrientation::PortraitUpsideDown),
            ExifOrientation::LeftBottom
        );
        assert_eq!(
            exif_orientation(DeviceOrientation::LandscapeLeft),
            ExifOrientation::TopLeft
        );
        assert_eq!(
            exif_orientation(DeviceOrientation::LandscapeRight),
            ExifOrientation::BottomRight
        );
        // Everything else collapses to RightTop.
        for other in [
            DeviceOrientation::Portrait,
            DeviceOrientation::FaceUp,
            DeviceOrientation::FaceDown,
            DeviceOrientation::Unknown,
        ] {
            assert_eq!(exif_orientation(other), ExifOrientation::RightTop);
        }
    }

    #[test]
    fn test_exif_codes() {
        assert_eq!(ExifOrientation::TopLeft.code(), 1);
        assert_eq!(ExifOrientation::BottomRight.code(), 3);
        assert_eq!(ExifOrientation::RightTop.code(), 6);
        assert_eq!(ExifOrientation::LeftBottom.code(), 8);
    }

    /// 2x1 frame: pixel A then pixel B.
    fn two_pixel_frame() -> Frame {
        Frame {
            data: vec![1, 1, 1, 2, 2, 2],
            width: 2,
            height: 1,
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_orient_upright_identity() {
        let frame = two_pixel_frame();
        let out = orient_upright(&frame, ExifOrientation::TopLeft);
        assert_eq!(out.data, frame.data);
        assert_eq!((out.width, out.height), (2, 1));
    }

    #[test]
    fn test_rotate_180() {
        let frame = two_pixel_frame();
        let out = orient_upright(&frame, ExifOrientation::BottomRight);
        assert_eq!(out.data, vec![2, 2, 2, 1, 1, 1]);
        assert_eq!((out.width, out.height), (2, 1));
    }

    #[test]
    fn test_rotate_90_cw() {
        // CW maps (x,y) → (h-1-y, x): A(0,0) → (0,0), B(1,0) → (0,1).
        let frame = two_pixel_frame();
        let out = orient_upright(&frame, ExifOrientation::RightTop);
        assert_eq!((out.width, out.height), (1, 2));
        assert_eq!(out.data, vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_rotate_90_ccw() {
        // CCW maps (x,y) → (y, w-1-x): A(0,0) → (0,1), B(1,0) → (0,0).
        let frame = two_pixel_frame();
        let out = orient_upright(&frame, ExifOrientation::LeftBottom);
        assert_eq!((out.width, out.height), (1, 2));
        assert_eq!(out.data, vec![2, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn test_rotations_compose_to_identity() {
        let frame = Frame {
            data: (0..24).collect(),
            width: 4,
            height: 2,
            timestamp: Instant::now(),
            sequence: 0,
        };
        let cw = orient_upright(&frame, ExifOrientation::RightTop);
        let back = orient_upright(&cw, ExifOrientation::LeftBottom);
        assert_eq!(back.data, frame.data);
        assert_eq!((back.width, back.height), (4, 2));
    }
}
