//! Camera Capture Library for Road Guardian
//!
//! Provides the frame side of the monitoring pipeline:
//! - RGB video frames with grayscale conversion and resizing
//! - Low-light contrast enhancement
//! - Frame sources (image-sequence replay, OpenCV capture with `vision`)

#[cfg(feature = "vision")]
pub mod device;
pub mod frame;
pub mod source;

#[cfg(feature = "vision")]
pub use device::DeviceSource;
pub use frame::{enhance_low_light, VideoFrame};
pub use source::{open_source, FrameSource, ImageSequenceSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Source identifier (device index, stream URL or image-sequence directory)
    pub source: String,
    /// Processing width (frames are resized to this)
    pub width: u32,
    /// Processing height
    pub height: u32,
    /// Frame rate used to timestamp replayed frames
    pub fps: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "0".to_string(),
            width: 640,
            height: 480,
            fps: 30.0,
        }
    }
}
