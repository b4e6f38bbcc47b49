//! Coordinate-space conversion between normalized vision coordinates
//! (origin bottom-left) and screen space (origin top-left).
//!
//! The viewport is explicit configuration passed by the caller, never a
//! process-wide screen constant.

use serde::Serialize;

/// A normalized bounding box with origin at the bottom-left, all
/// components in [0, 1]. This is what detection backends report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The surface the overlay is rendered on.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    /// Surface width in points.
    pub width: f32,
    /// Device pixel scale; the displayed image height is `width / scale`.
    pub scale: f32,
}

impl Viewport {
    /// Displayed image height at device scale.
    pub fn image_height(&self) -> f32 {
        self.width / self.scale
    }
}

/// A rectangle in screen space, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }
}

/// Convert a normalized bottom-left-origin box into a top-left-origin
/// screen rectangle for the given viewport.
///
/// Width and x scale by the viewport width; height and y scale by the
/// image height at device scale, with the y axis flipped:
/// `y = (1 - box.y) * image_height - height`.
pub fn to_screen_rect(rect: &NormalizedRect, viewport: &Viewport) -> ScreenRect {
    let image_height = viewport.image_height();
    let width = rect.width * viewport.width;
    let height = rect.height * image_height;
    ScreenRect {
        x: rect.x * viewport.width,
        y: (1.0 - rect.y) * image_height - height,
        width,
        height,
    }
}

/// Mirror a screen rect horizontally for front-camera rendering.
///
/// Detection coordinates are defined against the rear camera; the front
/// camera feed is flipped 180° about the vertical axis.
pub fn mirror_horizontal(rect: &ScreenRect, surface_width: f32) -> ScreenRect {
    ScreenRect {
        x: surface_width - rect.max_x(),
        ..*rect
    }
}
