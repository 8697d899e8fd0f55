use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, TimeDelta};
use roster_core::{
    CascadeDetector, Config, CooldownFilter, FaceDetector, Gallery, Matcher, NearestNeighborMatcher,
    Observation, RecognitionSource, Session, SqliteVisitStore, VisitStore,
};
use roster_hw::{Camera, CameraError, FrameSource};
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters reported when the capture loop exits.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub faces: u64,
    pub recorded: u64,
    pub storage_failures: u64,
}

/// Open every resource, then run the capture loop until `stop` is set.
///
/// Fails fast at startup if the store, model, gallery or camera is
/// unavailable. Resources are released when this returns.
pub fn run(config: &Config, stop: &AtomicBool) -> Result<LoopStats> {
    let store = SqliteVisitStore::open(&config.db_path)
        .with_context(|| format!("opening visit store {}", config.db_path.display()))?;

    let mut detector = CascadeDetector::load(&config.model_path_str())?;
    let gallery = Gallery::load_dir(&config.gallery_dir, &mut detector)
        .with_context(|| format!("loading gallery from {}", config.gallery_dir.display()))?;
    if gallery.is_empty() {
        tracing::warn!(dir = %config.gallery_dir.display(), "gallery is empty; every face will be Unknown");
    }

    let matcher = NearestNeighborMatcher {
        threshold: config.match_threshold,
    };
    let mut source = RecognitionSource::new(detector, matcher, gallery);

    let mut camera = Camera::open(&config.camera_device)?;
    camera.warm_up(config.warmup_frames);

    let cooldown = CooldownFilter::new(TimeDelta::seconds(config.cooldown_secs));
    let mut session = Session::new(store, cooldown);

    tracing::info!(
        device = %config.camera_device,
        db = %config.db_path.display(),
        threshold = config.match_threshold,
        cooldown_secs = config.cooldown_secs,
        "capture loop starting"
    );

    let result = capture_loop(&mut camera, &mut source, &mut session, stop, || {
        Local::now().naive_local()
    });

    match &result {
        Ok(stats) => tracing::info!(?stats, "capture loop stopped"),
        Err(e) => tracing::error!(error = %e, "frame acquisition failed; capture loop terminated"),
    }
    Ok(result?)
}

/// Read → recognize → filter → reconcile, once per frame, until `stop` is
/// set or acquisition fails.
///
/// Acquisition errors end the loop. Recognition and storage failures only
/// affect the current frame.
pub fn capture_loop<F, D, M, S, C>(
    frames: &mut F,
    source: &mut RecognitionSource<D, M>,
    session: &mut Session<S>,
    stop: &AtomicBool,
    now: C,
) -> Result<LoopStats, CameraError>
where
    F: FrameSource,
    D: FaceDetector,
    M: Matcher,
    S: VisitStore,
    C: Fn() -> NaiveDateTime,
{
    let mut stats = LoopStats::default();

    while !stop.load(Ordering::Relaxed) {
        let frame = frames.next_frame()?;
        stats.frames += 1;
        let timestamp = now();

        let recognitions = match source.recognize(&frame.data, frame.width, frame.height, timestamp) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(seq = frame.sequence, error = %e, "recognition failed; frame skipped");
                continue;
            }
        };
        stats.faces += recognitions.len() as u64;

        for recognition in &recognitions {
            let observation = session.observe(recognition);
            tracing::debug!(
                seq = frame.sequence,
                label = %recognition.label,
                distance = ?recognition.distance,
                x = recognition.bbox.x,
                y = recognition.bbox.y,
                w = recognition.bbox.width,
                h = recognition.bbox.height,
                ?observation,
                "face"
            );
            match observation {
                Observation::Recorded(_) => stats.recorded += 1,
                Observation::StorageFailed(_) => stats.storage_failures += 1,
                Observation::Unknown | Observation::CoolingDown => {}
            }
        }

        tracing::debug!(seq = frame.sequence, faces = recognitions.len(), "frame processed");
    }

    Ok(stats)
}
