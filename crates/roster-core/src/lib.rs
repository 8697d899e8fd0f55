//! roster-core — Face-recognition attendance logging.
//!
//! A cascade detector and nearest-neighbor gallery match turn camera frames
//! into labelled sightings; a per-person cooldown and a daily visit
//! reconciler fold those sightings into one first/last-seen record per
//! person per day in SQLite.

pub mod config;
pub mod cooldown;
pub mod detector;
pub mod gallery;
pub mod recognition;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod timestamp;
pub mod types;

pub use config::Config;
pub use cooldown::CooldownFilter;
pub use detector::{CascadeDetector, FaceDetector};
pub use gallery::Gallery;
pub use recognition::{Recognition, RecognitionSource};
pub use reconciler::{VisitOutcome, VisitReconciler};
pub use session::{Observation, Session};
pub use store::{SqliteVisitStore, StoreError, VisitRecord, VisitStore};
pub use types::{BoundingBox, FaceSignature, GalleryEntry, MatchResult, Matcher, NearestNeighborMatcher, PersonLabel};
