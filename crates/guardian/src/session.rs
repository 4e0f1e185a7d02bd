//! Monitoring session: frame source -> DMS -> presenters

use crate::presenter::{ConsolePresenter, FrameRecorder, Presenter};
use crate::settings::Settings;
use alerting::{GpsNotifier, HttpLocationProvider};
use camera_capture::{open_source, CameraError, FrameSource};
use dms::{DmsError, DmsModule, OnnxLandmarkDetector};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Video source unavailable: {0}")]
    SourceUnavailable(#[from] CameraError),

    #[error("Driver monitoring setup failed: {0}")]
    Dms(#[from] DmsError),

    #[error("Output setup failed: {0}")]
    Output(String),
}

impl SessionError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionError::SourceUnavailable(_) => 1,
            _ => 2,
        }
    }
}

/// Totals reported when a session ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub faces_skipped: u64,
    pub alarms: u64,
    pub notifications: u64,
}

/// Single-threaded read/analyze/present loop
pub struct Session {
    source: Box<dyn FrameSource + Send>,
    module: DmsModule,
    presenters: Vec<Box<dyn Presenter + Send>>,
    frame_size: (u32, u32),
}

impl Session {
    pub fn new(
        source: Box<dyn FrameSource + Send>,
        module: DmsModule,
        presenters: Vec<Box<dyn Presenter + Send>>,
        frame_size: (u32, u32),
    ) -> Self {
        Self {
            source,
            module,
            presenters,
            frame_size,
        }
    }

    /// Run until the source ends, fails, or `stop` is set
    pub fn run(&mut self, stop: &AtomicBool) -> SessionSummary {
        let mut frames = 0u64;

        while !stop.load(Ordering::Relaxed) {
            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Video source exhausted");
                    break;
                }
                Err(e) => {
                    warn!("Frame read failed, ending session: {}", e);
                    break;
                }
            };
            frames += 1;

            let (width, height) = self.frame_size;
            let frame = if (frame.width, frame.height) != (width, height) {
                frame.resize(width, height)
            } else {
                frame
            };

            let analysis = match self.module.analyze(&frame) {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!("Frame {} analysis failed: {}", frame.sequence, e);
                    continue;
                }
            };

            for presenter in &mut self.presenters {
                if let Err(e) = presenter.present(&frame, &analysis) {
                    warn!("Presenter failed on frame {}: {:#}", frame.sequence, e);
                }
            }
        }

        if stop.load(Ordering::Relaxed) {
            info!("Stop requested");
        }

        let state = self.module.detector().state();
        SessionSummary {
            frames,
            faces_skipped: self.module.faces_skipped(),
            alarms: state.total_alarms,
            notifications: state.total_notifications,
        }
    }
}

/// Build every component from `settings` and run the session to completion
pub fn run_session(settings: &Settings, stop: Arc<AtomicBool>) -> Result<SessionSummary, SessionError> {
    let model_path = settings
        .model
        .path
        .as_ref()
        .ok_or_else(|| SessionError::Config("landmark model path is required".into()))?;
    let landmark_detector = OnnxLandmarkDetector::load(model_path, settings.model.input_size, settings.model.point_count)
        .map_err(|e| SessionError::Config(e.to_string()))?
        .with_face_score_threshold(settings.model.face_score_threshold);

    let provider = HttpLocationProvider::with_timeout(settings.location.timeout())
        .map_err(|e| SessionError::Config(e.to_string()))?;
    let notifier = GpsNotifier::new(provider, settings.location.endpoint.clone());
    let module = DmsModule::new(settings.dms_config(), Box::new(landmark_detector), Box::new(notifier))?;

    let camera = settings.camera_config();
    let source = open_source(&camera)?;
    info!("Monitoring source {} at {}x{}", camera.source, camera.width, camera.height);

    let mut presenters: Vec<Box<dyn Presenter + Send>> = vec![Box::new(ConsolePresenter::default())];
    if let Some(dir) = &settings.record_dir {
        let recorder = FrameRecorder::create(dir).map_err(|e| SessionError::Output(format!("{:#}", e)))?;
        presenters.push(Box::new(recorder));
    }

    let mut session = Session::new(source, module, presenters, (camera.width, camera.height));
    Ok(session.run(&stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::Notify;
    use camera_capture::VideoFrame;
    use dms::{DetectionConfig, DmsAnalysis, DmsConfig, FaceLandmarks, LandmarkDetector, Point};
    use image::GrayImage;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct ScriptedSource {
        frames: VecDeque<Result<VideoFrame, CameraError>>,
    }

    impl ScriptedSource {
        fn new(count: u32, fps: f64) -> Self {
            let frames = (0..count)
                .map(|i| Ok(VideoFrame::new(vec![50; 16 * 12 * 3], 16, 12, (i as f64 * 1e9 / fps) as u64, i)))
                .collect();
            Self { frames }
        }
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            self.frames.pop_front().transpose()
        }
    }

    /// Returns closed-eye landmarks for every frame
    struct ClosedEyes;

    impl LandmarkDetector for ClosedEyes {
        fn detect(&self, _frame: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError> {
            let mut points = vec![Point::default(); 68];
            for (start, cx) in [(36usize, 0.0), (42, 30.0)] {
                points[start] = Point::new(cx, 0.0);
                points[start + 1] = Point::new(cx + 3.0, -0.5);
                points[start + 2] = Point::new(cx + 7.0, -0.5);
                points[start + 3] = Point::new(cx + 10.0, 0.0);
                points[start + 4] = Point::new(cx + 7.0, 0.5);
                points[start + 5] = Point::new(cx + 3.0, 0.5);
            }
            for (i, x) in [(48, 0.0), (50, 7.0), (52, 13.0), (54, 20.0), (56, 13.0), (58, 7.0)] {
                points[i] = Point::new(x, 40.0);
            }
            points[50].y = 38.0;
            points[52].y = 38.0;
            points[56].y = 42.0;
            points[58].y = 42.0;
            Ok(vec![FaceLandmarks { points }])
        }
    }

    struct SilentNotifier(Arc<Mutex<usize>>);

    impl Notify for SilentNotifier {
        fn notify(&self, event_count: usize) -> String {
            *self.0.lock().unwrap() += 1;
            format!("count {}", event_count)
        }
    }

    struct FrameSizes(Arc<Mutex<Vec<(u32, u32)>>>);

    impl Presenter for FrameSizes {
        fn present(&mut self, frame: &VideoFrame, _analysis: &DmsAnalysis) -> anyhow::Result<()> {
            self.0.lock().unwrap().push((frame.width, frame.height));
            Ok(())
        }
    }

    fn module(notified: Arc<Mutex<usize>>) -> DmsModule {
        let config = DmsConfig {
            detection: DetectionConfig {
                ear_consec_frames: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        DmsModule::new(config, Box::new(ClosedEyes), Box::new(SilentNotifier(notified))).unwrap()
    }

    #[test]
    fn test_runs_until_source_ends() {
        let notified = Arc::new(Mutex::new(0));
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let mut session = Session::new(
            Box::new(ScriptedSource::new(5, 10.0)),
            module(notified.clone()),
            vec![Box::new(FrameSizes(sizes.clone()))],
            (32, 24),
        );

        let summary = session.run(&AtomicBool::new(false));
        assert_eq!(
            summary,
            SessionSummary {
                frames: 5,
                faces_skipped: 0,
                alarms: 1,
                notifications: 0,
            }
        );
        assert_eq!(*notified.lock().unwrap(), 0);
        // Frames are resized to the configured capture size
        assert_eq!(sizes.lock().unwrap().as_slice(), &[(32, 24); 5]);
    }

    #[test]
    fn test_stop_flag_ends_before_first_frame() {
        let mut session = Session::new(
            Box::new(ScriptedSource::new(5, 10.0)),
            module(Arc::new(Mutex::new(0))),
            vec![],
            (16, 12),
        );
        assert_eq!(session.run(&AtomicBool::new(true)).frames, 0);
    }

    #[test]
    fn test_read_error_ends_session() {
        let mut source = ScriptedSource::new(2, 10.0);
        source.frames.push_back(Err(CameraError::Stream("decode failed".into())));
        source.frames.push_back(Ok(VideoFrame::new(vec![0; 16 * 12 * 3], 16, 12, 0, 9)));

        let mut session = Session::new(Box::new(source), module(Arc::new(Mutex::new(0))), vec![], (16, 12));
        assert_eq!(session.run(&AtomicBool::new(false)).frames, 2);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SessionError::SourceUnavailable(CameraError::Open("0".into())).exit_code(), 1);
        assert_eq!(SessionError::Config("bad".into()).exit_code(), 2);
        assert_eq!(SessionError::Dms(DmsError::Config("bad".into())).exit_code(), 2);
    }

    #[test]
    fn test_missing_model_is_config_error() {
        let mut settings = Settings::default();
        settings.model.path = Some(PathBuf::from("/nonexistent/landmarks.onnx"));
        let err = run_session(&settings, Arc::new(AtomicBool::new(false))).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
