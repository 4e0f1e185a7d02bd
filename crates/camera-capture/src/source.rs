//! Frame sources

use crate::{CameraConfig, CameraError, VideoFrame};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions accepted by the image-sequence source
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Lazy sequence of video frames
pub trait FrameSource {
    /// Read the next frame. `Ok(None)` signals end of stream.
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

/// Replays a directory of still images as a video stream.
///
/// Files are read in lexicographic order and stamped at `sequence / fps`.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    frame_interval_ns: u64,
}

impl ImageSequenceSource {
    /// Open a directory of frames
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        if !(fps.is_finite() && fps > 0.0) {
            return Err(CameraError::Format(format!("invalid replay fps {}", fps)));
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::Open(format!("{}: no image frames found", dir.display())));
        }

        info!("Opened image sequence {} ({} frames @ {} fps)", dir.display(), paths.len(), fps);

        Ok(Self {
            paths,
            next: 0,
            frame_interval_ns: (1e9 / fps) as u64,
        })
    }

    /// Total number of frames in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };

        let image = image::open(path)
            .map_err(|e| CameraError::Stream(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        let sequence = self.next as u32;
        self.next += 1;
        debug!("Read frame {} from {}", sequence, path.display());

        Ok(Some(VideoFrame::from_rgb_image(
            image,
            sequence as u64 * self.frame_interval_ns,
            sequence,
        )))
    }
}

/// Open the source named by `config.source`.
///
/// A directory is replayed as an image sequence. Any other identifier (a
/// device index or stream URL) is opened through OpenCV when built with the
/// `vision` feature, and fails with [`CameraError::Open`] otherwise.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource + Send>, CameraError> {
    let path = Path::new(&config.source);
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(path, config.fps)?));
    }

    #[cfg(feature = "vision")]
    {
        Ok(Box::new(crate::device::DeviceSource::open(config)?))
    }

    #[cfg(not(feature = "vision"))]
    {
        Err(CameraError::Open(format!(
            "{}: live capture needs a build with the `vision` feature",
            config.source
        )))
    }
}
