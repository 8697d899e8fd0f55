//! Known-face gallery loaded from a directory of labelled photos.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognition::extract_signature;
use crate::types::{GalleryEntry, UNKNOWN_LABEL};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GALLERY_EXTENSIONS: [&str; 2] = ["jpg", "png"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery directory not readable: {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
}

/// Ordered set of known face signatures. Order decides nearest-neighbor ties.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn from_entries(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    /// Load every face found in the `.jpg`/`.png` files of `dir`.
    ///
    /// Files are visited in file-name order; each detected face becomes one
    /// entry labelled with the normalized file stem. Unreadable images, and
    /// files whose stem normalizes to an empty name or to the unknown
    /// sentinel, are skipped with a warning.
    pub fn load_dir<D: FaceDetector>(dir: &Path, detector: &mut D) -> Result<Self, GalleryError> {
        let read_dir = std::fs::read_dir(dir).map_err(|source| GalleryError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_gallery_extension(p))
            .collect();
        paths.sort();

        let mut entries = Vec::new();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping gallery file with non-UTF-8 name");
                continue;
            };
            let label = normalize_name(stem);
            if label.is_empty() || label == UNKNOWN_LABEL {
                tracing::warn!(path = %path.display(), label = %label, "skipping gallery file with reserved or empty name");
                continue;
            }

            let gray = match image::open(&path) {
                Ok(img) => img.to_luma8(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable gallery image");
                    continue;
                }
            };

            let faces = detector.detect(&gray)?;
            if faces.is_empty() {
                tracing::warn!(path = %path.display(), "no face found in gallery image");
            }
            for bbox in &faces {
                entries.push(GalleryEntry {
                    label: label.clone(),
                    signature: extract_signature(&gray, bbox),
                    source: path.clone(),
                });
            }
        }

        tracing::info!(dir = %dir.display(), faces = entries.len(), "gallery loaded");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn has_gallery_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            GALLERY_EXTENSIONS
                .iter()
                .any(|allowed| e.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Strip a trailing numeric suffix and capitalize: `alice2` → `Alice`.
///
/// The first character is uppercased and the rest lowercased, so several
/// photos of one person (`bob1.jpg`, `Bob2.png`) share a label.
pub fn normalize_name(stem: &str) -> String {
    let trimmed = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use image::{GrayImage, Luma};

    /// Reports one face covering the whole image, or none for tiny images.
    struct WholeImageDetector;

    impl FaceDetector for WholeImageDetector {
        fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError> {
            let (width, height) = gray.dimensions();
            if width < 8 {
                return Ok(vec![]);
            }
            Ok(vec![BoundingBox { x: 0, y: 0, width, height, score: 1.0 }])
        }
    }

    fn write_image(dir: &Path, name: &str, side: u32, value: u8) {
        GrayImage::from_pixel(side, side, Luma([value]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("alice2"), "Alice");
        assert_eq!(normalize_name("BOB"), "Bob");
        assert_eq!(normalize_name("carol123"), "Carol");
        assert_eq!(normalize_name("mary_jane01"), "Mary_jane");
        assert_eq!(normalize_name("dave2x"), "Dave2x");
        assert_eq!(normalize_name("42"), "");
    }

    #[test]
    fn test_load_dir_labels_and_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "bob1.png", 32, 90);
        write_image(dir.path(), "alice.png", 32, 30);
        write_image(dir.path(), "bob2.png", 32, 100);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let gallery = Gallery::load_dir(dir.path(), &mut WholeImageDetector).unwrap();
        let labels: Vec<&str> = gallery.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Alice", "Bob", "Bob"]);
        assert!(gallery.entries()[0].signature.as_bytes().iter().all(|&p| p == 30));
        assert!(gallery.entries()[1].source.ends_with("bob1.png"));
    }

    #[test]
    fn test_load_dir_skips_faceless_and_corrupt_images() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "tiny.png", 4, 50);
        std::fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();
        write_image(dir.path(), "erin.png", 16, 50);

        let gallery = Gallery::load_dir(dir.path(), &mut WholeImageDetector).unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].label, "Erin");
    }

    #[test]
    fn test_load_dir_skips_reserved_and_empty_names() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "unknown.png", 16, 40);
        write_image(dir.path(), "UNKNOWN2.jpg", 16, 40);
        write_image(dir.path(), "42.png", 16, 40);
        write_image(dir.path(), "frank.png", 16, 40);

        let gallery = Gallery::load_dir(dir.path(), &mut WholeImageDetector).unwrap();
        let labels: Vec<&str> = gallery.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Frank"]);
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let err = Gallery::load_dir(Path::new("/nonexistent/known_faces"), &mut WholeImageDetector)
            .unwrap_err();
        assert!(matches!(err, GalleryError::Directory { .. }));
    }
}
