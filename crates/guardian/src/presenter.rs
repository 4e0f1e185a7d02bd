//! Presentation: overlay text and frame annotation

use anyhow::Context;
use camera_capture::VideoFrame;
use dms::DmsAnalysis;
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ALERT_TEXT: &str = "DROWSINESS ALERT!";
pub const YAWN_TEXT: &str = "YAWNING DETECTED";

const RED: [u8; 3] = [255, 0, 0];
const ORANGE: [u8; 3] = [255, 165, 0];
const WHITE: [u8; 3] = [255, 255, 255];
const LANDMARK_GREEN: [u8; 3] = [0, 255, 0];

/// One line of text to render on top of the frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayText {
    pub text: String,
    /// Baseline-left anchor (pixels)
    pub x: i32,
    pub y: i32,
    /// RGB
    pub color: [u8; 3],
    pub scale: f32,
}

impl OverlayText {
    fn new(text: impl Into<String>, x: i32, y: i32, color: [u8; 3], scale: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            color,
            scale,
        }
    }
}

/// Overlay for one analyzed frame. Readouts appear only for measured faces.
pub fn overlay_for(analysis: &DmsAnalysis) -> Vec<OverlayText> {
    let mut overlay = Vec::new();
    if analysis.alarm_active {
        overlay.push(OverlayText::new(ALERT_TEXT, 10, 30, RED, 0.7));
    }
    if analysis.yawning {
        overlay.push(OverlayText::new(YAWN_TEXT, 10, 60, ORANGE, 0.7));
    }
    if let (Some(ear), Some(mar)) = (analysis.ear, analysis.mar) {
        overlay.push(OverlayText::new(format!("EAR: {:.2}", ear), 480, 30, WHITE, 0.6));
        overlay.push(OverlayText::new(format!("MAR: {:.2}", mar), 480, 55, WHITE, 0.6));
    }
    overlay
}

/// Consumer of per-frame analysis results
pub trait Presenter {
    fn present(&mut self, frame: &VideoFrame, analysis: &DmsAnalysis) -> anyhow::Result<()>;
}

/// Logs alarm/yawn transitions at info and readouts at debug
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    alarm_shown: bool,
    yawn_shown: bool,
}

impl Presenter for ConsolePresenter {
    fn present(&mut self, frame: &VideoFrame, analysis: &DmsAnalysis) -> anyhow::Result<()> {
        if analysis.alarm_active != self.alarm_shown {
            if analysis.alarm_active {
                info!(frame = frame.sequence, "{}", ALERT_TEXT);
            } else {
                info!(frame = frame.sequence, "Drowsiness alert cleared");
            }
            self.alarm_shown = analysis.alarm_active;
        }
        if analysis.yawning != self.yawn_shown {
            if analysis.yawning {
                info!(frame = frame.sequence, "{}", YAWN_TEXT);
            }
            self.yawn_shown = analysis.yawning;
        }

        let readout: Vec<String> = overlay_for(analysis)
            .into_iter()
            .map(|item| item.text)
            .collect();
        if !readout.is_empty() {
            debug!(frame = frame.sequence, "{}", readout.join(" | "));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct OverlayRecord<'a> {
    sequence: u32,
    timestamp_secs: f64,
    overlay: &'a [OverlayText],
}

/// Writes annotated PNG frames plus an `overlay.jsonl` sidecar with the
/// overlay text of every frame.
pub struct FrameRecorder {
    dir: PathBuf,
    overlay_log: BufWriter<File>,
}

impl FrameRecorder {
    pub fn create(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create record directory {}", dir.display()))?;
        let log_path = dir.join("overlay.jsonl");
        let overlay_log = File::create(&log_path)
            .with_context(|| format!("cannot create {}", log_path.display()))?;

        info!("Recording annotated frames to {}", dir.display());
        Ok(Self {
            dir,
            overlay_log: BufWriter::new(overlay_log),
        })
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Presenter for FrameRecorder {
    fn present(&mut self, frame: &VideoFrame, analysis: &DmsAnalysis) -> anyhow::Result<()> {
        let mut canvas = frame
            .to_rgb_image()
            .context("frame buffer does not match its dimensions")?;

        let overlay = overlay_for(analysis);
        for item in &overlay {
            // No font is bundled; frame the text slot so alerts stay visible
            let width = (item.text.len() as f32 * 18.0 * item.scale).max(1.0) as u32;
            let height = (30.0 * item.scale).max(1.0) as u32;
            let rect = Rect::at(item.x, item.y - height as i32).of_size(width, height);
            draw_hollow_rect_mut(&mut canvas, rect, Rgb(item.color));
        }

        if let Some(face) = &analysis.landmarks {
            for p in &face.points {
                draw_filled_circle_mut(&mut canvas, (p.x as i32, p.y as i32), 1, Rgb(LANDMARK_GREEN));
            }
        }

        let path = self.dir.join(format!("frame_{:06}.png", frame.sequence));
        canvas
            .save(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;

        let record = OverlayRecord {
            sequence: frame.sequence,
            timestamp_secs: frame.timestamp_secs(),
            overlay: &overlay,
        };
        serde_json::to_writer(&mut self.overlay_log, &record)?;
        self.overlay_log.write_all(b"\n")?;
        self.overlay_log.flush()?;
        Ok(())
    }
}
