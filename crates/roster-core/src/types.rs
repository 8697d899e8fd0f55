use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Side length of the square grayscale patch used as a face signature.
pub const SIGNATURE_SIDE: u32 = 100;

/// Number of bytes in a flattened face signature.
pub const SIGNATURE_LEN: usize = (SIGNATURE_SIDE * SIGNATURE_SIDE) as usize;

/// Default L2 distance above which a query is labelled unknown.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 5200.0;

/// Label reported when no gallery entry is close enough.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Axis-aligned face region in frame pixel coordinates, clamped to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detector score (cascade classifier output, not a probability).
    pub score: f64,
}

/// Flattened 100x100 grayscale patch, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceSignature(Vec<u8>);

impl FaceSignature {
    /// Wrap raw signature bytes. Returns `None` unless exactly [`SIGNATURE_LEN`] bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() == SIGNATURE_LEN).then_some(Self(bytes))
    }

    /// Wrap the raw buffer of a freshly resized 100x100 patch.
    pub(crate) fn from_patch(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), SIGNATURE_LEN);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Euclidean (L2) distance between two signatures.
    pub fn distance(&self, other: &FaceSignature) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| {
                let d = f64::from(a) - f64::from(b);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Identity attached to a detected face.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PersonLabel {
    Known(String),
    Unknown,
}

impl PersonLabel {
    /// Name of a known person. `None` for the unknown sentinel, and for a
    /// `Known` label that is empty or spells the sentinel.
    pub fn known_name(&self) -> Option<&str> {
        match self {
            PersonLabel::Known(name) if !name.is_empty() && name != UNKNOWN_LABEL => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PersonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonLabel::Known(name) => f.write_str(name),
            PersonLabel::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

/// One known face in the gallery.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    /// Normalized person name.
    pub label: String,
    pub signature: FaceSignature,
    /// Image file the signature was extracted from.
    pub source: PathBuf,
}

/// Result of matching a query signature against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub label: PersonLabel,
    /// Distance to the nearest gallery entry, `None` for an empty gallery.
    pub distance: Option<f64>,
}

/// Strategy for comparing a query signature against the gallery.
pub trait Matcher {
    fn compare(&self, query: &FaceSignature, gallery: &[GalleryEntry]) -> MatchResult;
}

/// Nearest-neighbor matcher with a fixed distance threshold.
///
/// Ties resolve to the first-encountered gallery entry: the scan only moves
/// to a later entry when it is strictly closer.
pub struct NearestNeighborMatcher {
    pub threshold: f64,
}

impl Default for NearestNeighborMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl Matcher for NearestNeighborMatcher {
    fn compare(&self, query: &FaceSignature, gallery: &[GalleryEntry]) -> MatchResult {
        let mut best_dist = f64::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, entry) in gallery.iter().enumerate() {
            let dist = query.distance(&entry.signature);
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= self.threshold => MatchResult {
                label: PersonLabel::Known(gallery[idx].label.clone()),
                distance: Some(best_dist),
            },
            Some(_) => MatchResult {
                label: PersonLabel::Unknown,
                distance: Some(best_dist),
            },
            None => MatchResult {
                label: PersonLabel::Unknown,
                distance: None,
            },
        }
    }
}
