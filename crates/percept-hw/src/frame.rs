//! Frame type and pixel conversion — packed YUYV to RGB24.

/// A captured color camera frame (RGB24, row-major).
///
/// Ownership is transient: a frame is delivered at most once, in capture
/// order, and consumers must not hold it beyond handling one callback.
#[derive(Clone)]
pub struct Frame {
    /// RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// RGB bytes for the pixel at (x, y). Panics when out of bounds;
    /// intended for tests and small diagnostic reads.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = ((y * self.width + x) * 3) as usize;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; the chroma pair is
/// shared by both pixels.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        push_bt601(&mut rgb, y0, u, v);
        push_bt601(&mut rgb, y1, u, v);
    }
    Ok(rgb)
}

/// One YUV→RGB pixel, BT.601 studio-swing integer approximation.
fn push_bt601(rgb: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    rgb.push(r.clamp(0, 255) as u8);
    rgb.push(g.clamp(0, 255) as u8);
    rgb.push(b.clamp(0, 255) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_black() {
        // 2x1 image: Y=16 (studio black), neutral chroma
        let yuyv = vec![16, 128, 16, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_yuyv_white() {
        // Y=235 (studio white), neutral chroma
        let yuyv = vec![235, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        let yuyv = vec![128, 128, 128, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        // R == G == B for neutral chroma
        assert_eq!(rgb[0], rgb[1]);
        assert_eq!(rgb[1], rgb[2]);
    }

    #[test]
    fn test_yuyv_output_length() {
        let yuyv = vec![128u8; 4 * 2 * 2]; // 4x2 image, 2 bytes/pixel
        let rgb = yuyv_to_rgb(&yuyv, 4, 2).unwrap();
        assert_eq!(rgb.len(), 4 * 2 * 3);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![128, 128]; // too short for 2x1
        assert!(yuyv_to_rgb(&yuyv, 2, 1).is_err());
    }

    #[test]
    fn test_frame_pixel_accessor() {
        let frame = Frame {
            data: vec![1, 2, 3, 4, 5, 6],
            width: 2,
            height: 1,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        };
        assert_eq!(frame.pixel(0, 0), (1, 2, 3));
        assert_eq!(frame.pixel(1, 0), (4, 5, 6));
    }
}
