//! Cascade face detector via `rustface` (SeetaFace funnel-structured cascade).

use crate::types::BoundingBox;
use image::GrayImage;
use std::path::Path;
use thiserror::Error;

// Detection parameters. The pyramid factor is rustface's shrink ratio per level.
const CASCADE_MIN_FACE_SIZE: u32 = 30;
const CASCADE_PYRAMID_SCALE: f32 = 0.8;
const CASCADE_WINDOW_STEP: u32 = 4;
const CASCADE_SCORE_THRESHOLD: f64 = 2.0;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("cascade model not found: {0} — download seeta_fd_frontal_v1.0.bin into models/")]
    ModelNotFound(String),
    #[error("failed to load cascade model {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can find face regions in a grayscale image.
pub trait FaceDetector {
    /// Detect faces, returning boxes clamped to the image in detector order.
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Classical cascade detector backed by a SeetaFace model file.
pub struct CascadeDetector {
    inner: Box<dyn rustface::Detector>,
}

impl CascadeDetector {
    /// Load the cascade model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let mut inner =
            rustface::create_detector(model_path).map_err(|source| DetectorError::ModelLoad {
                path: model_path.to_string(),
                source,
            })?;
        inner.set_min_face_size(CASCADE_MIN_FACE_SIZE);
        inner.set_pyramid_scale_factor(CASCADE_PYRAMID_SCALE);
        inner.set_slide_window_step(CASCADE_WINDOW_STEP, CASCADE_WINDOW_STEP);
        inner.set_score_thresh(CASCADE_SCORE_THRESHOLD);

        tracing::info!(path = model_path, "loaded cascade face detector");

        Ok(Self { inner })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError> {
        let (width, height) = gray.dimensions();
        let mut data = rustface::ImageData::new(gray.as_raw(), width, height);

        let boxes = self
            .inner
            .detect(&mut data)
            .into_iter()
            .filter_map(|face| {
                let rect = face.bbox();
                clamp_box(
                    rect.x(),
                    rect.y(),
                    rect.width(),
                    rect.height(),
                    face.score(),
                    width,
                    height,
                )
            })
            .collect();

        Ok(boxes)
    }
}

/// Intersect a signed detector rectangle with the image bounds.
///
/// Returns `None` when nothing of the rectangle lies inside the image.
pub fn clamp_box(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    score: f64,
    image_width: u32,
    image_height: u32,
) -> Option<BoundingBox> {
    let x0 = i64::from(x).clamp(0, i64::from(image_width));
    let y0 = i64::from(y).clamp(0, i64::from(image_height));
    let x1 = (i64::from(x) + i64::from(width)).clamp(0, i64::from(image_width));
    let y1 = (i64::from(y) + i64::from(height)).clamp(0, i64::from(image_height));

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(BoundingBox {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
        score,
    })
}
