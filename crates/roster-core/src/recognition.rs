//! Recognition source: frame → detected faces → labelled recognition events.

use crate::detector::{DetectorError, FaceDetector};
use crate::gallery::Gallery;
use crate::types::{BoundingBox, FaceSignature, Matcher, PersonLabel, SIGNATURE_SIDE};
use chrono::NaiveDateTime;
use image::imageops::{self, FilterType};
use image::GrayImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("frame buffer too short: expected {expected} bytes for {width}x{height}, got {actual}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
}

/// One labelled face sighting.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub bbox: BoundingBox,
    pub label: PersonLabel,
    /// Distance to the nearest gallery entry, `None` for an empty gallery.
    pub distance: Option<f64>,
    pub timestamp: NaiveDateTime,
}

/// Crop a face region and reduce it to a 100x100 flattened signature.
pub fn extract_signature(gray: &GrayImage, bbox: &BoundingBox) -> FaceSignature {
    let crop = imageops::crop_imm(gray, bbox.x, bbox.y, bbox.width, bbox.height).to_image();
    let patch = imageops::resize(&crop, SIGNATURE_SIDE, SIGNATURE_SIDE, FilterType::Triangle);
    FaceSignature::from_patch(patch.into_raw())
}

/// Detects faces in a frame and labels each one against the gallery.
pub struct RecognitionSource<D, M> {
    detector: D,
    matcher: M,
    gallery: Gallery,
}

impl<D: FaceDetector, M: Matcher> RecognitionSource<D, M> {
    pub fn new(detector: D, matcher: M, gallery: Gallery) -> Self {
        Self {
            detector,
            matcher,
            gallery,
        }
    }

    /// Recognize every face in a raw grayscale frame.
    ///
    /// All recognitions from one frame share `timestamp`. Output order is
    /// the detector's order.
    pub fn recognize(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        timestamp: NaiveDateTime,
    ) -> Result<Vec<Recognition>, RecognitionError> {
        let expected = width as usize * height as usize;
        let gray = frame
            .get(..expected)
            .and_then(|data| GrayImage::from_raw(width, height, data.to_vec()))
            .ok_or(RecognitionError::InvalidFrame {
                width,
                height,
                expected,
                actual: frame.len(),
            })?;

        self.recognize_image(&gray, timestamp)
    }

    /// Recognize every face in an already-decoded grayscale image.
    pub fn recognize_image(
        &mut self,
        gray: &GrayImage,
        timestamp: NaiveDateTime,
    ) -> Result<Vec<Recognition>, RecognitionError> {
        let faces = self.detector.detect(gray)?;

        let recognitions = faces
            .into_iter()
            .map(|bbox| {
                let signature = extract_signature(gray, &bbox);
                let result = self.matcher.compare(&signature, self.gallery.entries());
                Recognition {
                    bbox,
                    label: result.label,
                    distance: result.distance,
                    timestamp,
                }
            })
            .collect();

        Ok(recognitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GalleryEntry, NearestNeighborMatcher, SIGNATURE_LEN};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    /// Reports the same fixed boxes for every image.
    struct FixedDetector(Vec<BoundingBox>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    fn bbox(x: u32, y: u32, side: u32) -> BoundingBox {
        BoundingBox { x, y, width: side, height: side, score: 5.0 }
    }

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn flat_entry(label: &str, value: u8) -> GalleryEntry {
        GalleryEntry {
            label: label.into(),
            signature: FaceSignature::from_bytes(vec![value; SIGNATURE_LEN]).unwrap(),
            source: PathBuf::from(format!("{label}.png")),
        }
    }

    /// 200x100 frame: left half dark (20), right half bright (220).
    fn split_frame() -> Vec<u8> {
        let mut data = vec![0u8; 200 * 100];
        for y in 0..100 {
            for x in 0..200 {
                data[y * 200 + x] = if x < 100 { 20 } else { 220 };
            }
        }
        data
    }

    #[test]
    fn test_extract_signature_uniform_patch() {
        let gray = GrayImage::from_pixel(64, 48, image::Luma([77]));
        let sig = extract_signature(&gray, &bbox(4, 4, 40));
        assert_eq!(sig.as_bytes().len(), SIGNATURE_LEN);
        assert!(sig.as_bytes().iter().all(|&p| p == 77));
    }

    #[test]
    fn test_recognize_labels_each_face_in_detector_order() {
        let gallery = Gallery::from_entries(vec![flat_entry("Dark", 20), flat_entry("Bright", 220)]);
        let detector = FixedDetector(vec![bbox(120, 10, 60), bbox(10, 10, 60)]);
        let mut source = RecognitionSource::new(detector, NearestNeighborMatcher::default(), gallery);

        let out = source.recognize(&split_frame(), 200, 100, ts()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, PersonLabel::Known("Bright".into()));
        assert_eq!(out[1].label, PersonLabel::Known("Dark".into()));
        assert!(out.iter().all(|r| r.timestamp == ts()));
        assert_eq!(out[0].distance, Some(0.0));
    }

    #[test]
    fn test_recognize_unknown_when_too_far() {
        // 220 vs 20 → distance 200 * 100 = 20_000
        let gallery = Gallery::from_entries(vec![flat_entry("Dark", 20)]);
        let detector = FixedDetector(vec![bbox(120, 10, 60)]);
        let mut source = RecognitionSource::new(detector, NearestNeighborMatcher::default(), gallery);

        let out = source.recognize(&split_frame(), 200, 100, ts()).unwrap();
        assert_eq!(out[0].label, PersonLabel::Unknown);
    }

    #[test]
    fn test_recognize_no_faces() {
        let mut source = RecognitionSource::new(
            FixedDetector(vec![]),
            NearestNeighborMatcher::default(),
            Gallery::default(),
        );
        let out = source.recognize(&split_frame(), 200, 100, ts()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_recognize_rejects_short_frame() {
        let mut source = RecognitionSource::new(
            FixedDetector(vec![]),
            NearestNeighborMatcher::default(),
            Gallery::default(),
        );
        let err = source.recognize(&[0u8; 10], 200, 100, ts()).unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidFrame { actual: 10, .. }));
    }
}
