//! Facial landmark detection

use crate::geometry::Point;
use crate::DmsError;
use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Minimum face score for a landmark set to be reported
pub const DEFAULT_FACE_SCORE_THRESHOLD: f32 = 0.5;

/// Ordered landmark points of one detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<Point>,
}

/// Produces zero or more landmark sets per preprocessed grayscale frame
pub trait LandmarkDetector {
    fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError>;
}

/// 68-point landmark regressor backed by an ONNX model.
///
/// The model takes a `1x3xNxN` tensor in `[0, 1]` and returns `2 * K`
/// values: `K` normalized `(x, y)` pairs. The whole frame is treated as one
/// face region, which suits a cabin camera framed on the driver.
///
/// A face score in `[0, 1]` gates the result. It is read from a second
/// model output, or from one trailing value after the `2 * K` coordinates.
/// Frames scoring below the threshold yield no face. Models without a score
/// report a face on every frame.
pub struct OnnxLandmarkDetector {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    point_count: usize,
    face_score_threshold: f32,
}

impl OnnxLandmarkDetector {
    /// Load the model at `path` with a square `input_size` input
    pub fn load(path: impl AsRef<Path>, input_size: u32, point_count: usize) -> Result<Self, DmsError> {
        let path = path.as_ref();
        check_dimensions(input_size, point_count)?;
        info!("Loading landmark model from {}", path.display());

        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
            .and_then(|model| model.into_optimized())
            .map_err(|e| DmsError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        Self::from_model(model, input_size, point_count)
    }

    /// Wrap an already typed model
    pub fn from_model(model: TypedModel, input_size: u32, point_count: usize) -> Result<Self, DmsError> {
        check_dimensions(input_size, point_count)?;
        let model = model
            .into_runnable()
            .map_err(|e| DmsError::ModelLoad(e.to_string()))?;

        Ok(Self {
            model,
            input_size,
            point_count,
            face_score_threshold: DEFAULT_FACE_SCORE_THRESHOLD,
        })
    }

    pub fn with_face_score_threshold(mut self, threshold: f32) -> Self {
        self.face_score_threshold = threshold;
        self
    }

    pub fn face_score_threshold(&self) -> f32 {
        self.face_score_threshold
    }

    fn to_tensor(&self, frame: &GrayImage) -> Tensor {
        let side = self.input_size;
        let resized = imageops::resize(frame, side, side, FilterType::Triangle);

        // Grayscale replicated across the three input channels
        tract_ndarray::Array4::from_shape_fn((1, 3, side as usize, side as usize), |(_, _, y, x)| {
            resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
        })
        .into()
    }

    /// Score from a second output, else the value after the coordinates
    fn face_score(&self, outputs: &[TValue], coordinates: &[f32]) -> Result<Option<f32>, DmsError> {
        if let Some(score) = outputs.get(1) {
            let view = score
                .to_array_view::<f32>()
                .map_err(|e| DmsError::Inference(e.to_string()))?;
            return Ok(view.iter().next().copied());
        }
        Ok(coordinates.get(self.point_count * 2).copied())
    }
}

fn check_dimensions(input_size: u32, point_count: usize) -> Result<(), DmsError> {
    if input_size == 0 || point_count == 0 {
        return Err(DmsError::Config("model input size and point count must be positive".into()));
    }
    Ok(())
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DmsError::ImageProcessing("empty frame".into()));
        }

        let input = self.to_tensor(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| DmsError::Inference("model produced no outputs".into()))?;
        let values: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if values.len() < self.point_count * 2 {
            return Err(DmsError::Inference(format!(
                "expected {} landmark values, got {}",
                self.point_count * 2,
                values.len()
            )));
        }

        if let Some(score) = self.face_score(&outputs, &values)? {
            // NaN scores count as no face
            if !(score >= self.face_score_threshold) {
                debug!("Face score {:.3} below {:.3}, no face", score, self.face_score_threshold);
                return Ok(Vec::new());
            }
        }

        let points = values
            .chunks_exact(2)
            .take(self.point_count)
            .map(|xy| Point::new(xy[0] as f64 * width as f64, xy[1] as f64 * height as f64))
            .collect();
        debug!("Regressed {} landmarks", self.point_count);

        Ok(vec![FaceLandmarks { points }])
    }
}
