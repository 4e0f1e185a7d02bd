//! Live capture through OpenCV `VideoCapture`

use crate::{CameraConfig, CameraError, FrameSource, VideoFrame};
use opencv::{core, imgproc, prelude::*, videoio};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Camera device or video stream read through OpenCV.
///
/// Numeric identifiers open a device index; anything else is passed to
/// OpenCV as a file or stream URL. Frames are stamped with the time since
/// the source was opened.
pub struct DeviceSource {
    capture: videoio::VideoCapture,
    frame: core::Mat,
    started: Instant,
    sequence: u32,
}

impl DeviceSource {
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let mut capture = match config.source.parse::<i32>() {
            Ok(index) => videoio::VideoCapture::new(index, videoio::CAP_ANY),
            Err(_) => videoio::VideoCapture::from_file(&config.source, videoio::CAP_ANY),
        }
        .map_err(|e| CameraError::Open(format!("{}: {}", config.source, e)))?;

        let opened = capture
            .is_opened()
            .map_err(|e| CameraError::Open(format!("{}: {}", config.source, e)))?;
        if !opened {
            return Err(CameraError::Open(format!("{}: capture could not be opened", config.source)));
        }

        // Requested size is a hint; frames are resized downstream
        for (prop, value) in [
            (videoio::CAP_PROP_FRAME_WIDTH, config.width as f64),
            (videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64),
        ] {
            if let Err(e) = capture.set(prop, value) {
                warn!("Capture property {} not applied: {}", prop, e);
            }
        }

        info!("Opened capture {} ({}x{} requested)", config.source, config.width, config.height);
        Ok(Self {
            capture,
            frame: core::Mat::default(),
            started: Instant::now(),
            sequence: 0,
        })
    }
}

impl FrameSource for DeviceSource {
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        // A failed grab ends the stream
        match self.capture.read(&mut self.frame) {
            Ok(true) if !self.frame.empty() => {}
            Ok(_) => {
                info!("Capture returned no frame, ending stream");
                return Ok(None);
            }
            Err(e) => {
                warn!("Capture read failed, ending stream: {}", e);
                return Ok(None);
            }
        }

        let mut rgb = core::Mat::default();
        imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| CameraError::Format(e.to_string()))?;
        let data = rgb
            .data_bytes()
            .map_err(|e| CameraError::Format(e.to_string()))?
            .to_vec();

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        debug!("Captured frame {} ({}x{})", sequence, rgb.cols(), rgb.rows());

        Ok(Some(VideoFrame::new(
            data,
            rgb.cols() as u32,
            rgb.rows() as u32,
            self.started.elapsed().as_nanos() as u64,
            sequence,
        )))
    }
}
