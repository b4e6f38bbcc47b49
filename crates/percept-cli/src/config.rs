use percept_hw::camera::CameraFacing;
use percept_hw::format::CaptureSpec;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Which camera to use for live capture.
    pub camera_facing: CameraFacing,
    /// Directory containing ONNX model files and labels.
    pub model_dir: PathBuf,
    /// Preferred capture width in pixels; unset together with the height
    /// lets format selection pick the highest resolution.
    pub capture_width: Option<u32>,
    /// Preferred capture height in pixels.
    pub capture_height: Option<u32>,
    /// Preferred capture rate in frames per second; unset accepts any.
    pub capture_fps: Option<u32>,
    /// Number of frames to discard at startup (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Overlay surface width in points.
    pub viewport_width: f32,
    /// Overlay scale factor (surface points per image pixel).
    pub viewport_scale: f32,
}

impl Config {
    /// Load configuration from `PERCEPT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("PERCEPT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir());

        let camera_facing = match std::env::var("PERCEPT_CAMERA_FACING").as_deref() {
            Ok("front") => CameraFacing::Front,
            _ => CameraFacing::Back,
        };

        Self {
            camera_facing,
            model_dir,
            capture_width: env_opt_u32("PERCEPT_CAPTURE_WIDTH"),
            capture_height: env_opt_u32("PERCEPT_CAPTURE_HEIGHT"),
            capture_fps: env_opt_u32("PERCEPT_CAPTURE_FPS"),
            warmup_frames: env_usize("PERCEPT_WARMUP_FRAMES", 4),
            viewport_width: env_f32("PERCEPT_VIEWPORT_WIDTH", 640.0),
            viewport_scale: env_f32("PERCEPT_VIEWPORT_SCALE", 1.0),
        }
    }

    /// The capture preferences the camera should negotiate. A size is
    /// only preferred when both dimensions are set.
    pub fn capture_spec(&self) -> CaptureSpec {
        CaptureSpec {
            fps: self.capture_fps,
            size: match (self.capture_width, self.capture_height) {
                (Some(w), Some(h)) => Some((w, h)),
                _ => None,
            },
        }
    }

    /// Path to the image-classification model.
    pub fn classifier_model_path(&self) -> String {
        self.model_dir
            .join("classifier.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the class-label list for the classifier.
    pub fn classifier_labels_path(&self) -> String {
        self.model_dir
            .join("labels.txt")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face-detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("face_detector.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the attention-saliency model.
    pub fn saliency_model_path(&self) -> String {
        self.model_dir
            .join("saliency.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("percept/models")
}

fn env_opt_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            camera_facing: CameraFacing::Back,
            model_dir: PathBuf::from("/tmp/models"),
            capture_width: None,
            capture_height: None,
            capture_fps: None,
            warmup_frames: 4,
            viewport_width: 640.0,
            viewport_scale: 1.0,
        }
    }

    #[test]
    fn test_capture_spec_with_preferences() {
        let cfg = Config {
            capture_width: Some(1280),
            capture_height: Some(720),
            capture_fps: Some(30),
            ..base_config()
        };
        let spec = cfg.capture_spec();
        assert_eq!(spec.fps, Some(30));
        assert_eq!(spec.size, Some((1280, 720)));
    }

    #[test]
    fn test_capture_spec_without_preferences() {
        // No preferences: format selection falls through to the
        // highest-resolution branch.
        let spec = base_config().capture_spec();
        assert_eq!(spec.fps, None);
        assert_eq!(spec.size, None);
    }

    #[test]
    fn test_capture_spec_partial_size_is_no_preference() {
        let cfg = Config {
            capture_width: Some(1280),
            ..base_config()
        };
        assert_eq!(cfg.capture_spec().size, None);
    }

    #[test]
    fn test_model_paths() {
        let cfg = base_config();
        assert_eq!(cfg.classifier_model_path(), "/tmp/models/classifier.onnx");
        assert_eq!(cfg.saliency_model_path(), "/tmp/models/saliency.onnx");
    }
}
