//! Capture session: cooldown filter plus reconciler, owned together.

use crate::cooldown::CooldownFilter;
use crate::reconciler::{VisitOutcome, VisitReconciler};
use crate::recognition::Recognition;
use crate::store::VisitStore;
use chrono::NaiveDateTime;

/// What happened to one recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Face not in the gallery; never persisted.
    Unknown,
    /// Within the cooldown window of the person's last accepted sighting.
    CoolingDown,
    /// Accepted and reconciled.
    Recorded(VisitOutcome),
    /// Accepted, but the store write failed. The sighting is lost.
    StorageFailed(String),
}

/// Per-run state for the capture loop: created at start, dropped at shutdown.
pub struct Session<S> {
    cooldown: CooldownFilter,
    reconciler: VisitReconciler<S>,
}

impl<S: VisitStore> Session<S> {
    pub fn new(store: S, cooldown: CooldownFilter) -> Self {
        Self {
            cooldown,
            reconciler: VisitReconciler::new(store),
        }
    }

    pub fn store(&self) -> &S {
        self.reconciler.store()
    }

    /// Route one recognition through the cooldown gate into the store.
    ///
    /// Storage failures are logged and reported in the return value; they
    /// never abort the caller.
    pub fn observe(&mut self, recognition: &Recognition) -> Observation {
        match recognition.label.known_name() {
            Some(name) => self.observe_known(name, recognition.timestamp),
            None => Observation::Unknown,
        }
    }

    fn observe_known(&mut self, name: &str, timestamp: NaiveDateTime) -> Observation {
        if !self.cooldown.accept(name, timestamp) {
            return Observation::CoolingDown;
        }

        match self.reconciler.record_visit(name, timestamp) {
            Ok(outcome) => Observation::Recorded(outcome),
            Err(e) => {
                tracing::error!(name, error = %e, "failed to record visit; sighting dropped");
                Observation::StorageFailed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SqliteVisitStore, StoreError, VisitRecord};
    use crate::types::{BoundingBox, PersonLabel};
    use chrono::{NaiveDate, TimeDelta};

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn seen(label: PersonLabel, timestamp: NaiveDateTime) -> Recognition {
        Recognition {
            bbox: BoundingBox { x: 0, y: 0, width: 50, height: 50, score: 3.0 },
            label,
            distance: Some(1000.0),
            timestamp,
        }
    }

    fn alice(timestamp: NaiveDateTime) -> Recognition {
        seen(PersonLabel::Known("Alice".into()), timestamp)
    }

    fn session() -> Session<SqliteVisitStore> {
        Session::new(SqliteVisitStore::open_in_memory().unwrap(), CooldownFilter::default())
    }

    /// Store that always fails, to exercise the non-fatal path.
    struct BrokenStore;

    impl VisitStore for BrokenStore {
        fn find_for_day(&self, _: &str, _: NaiveDate) -> Result<Option<VisitRecord>, StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
        fn insert_first_seen(&self, _: &str, _: NaiveDateTime) -> Result<i64, StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
        fn set_last_seen(&self, _: i64, _: NaiveDateTime) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn test_unknown_never_persists() {
        let mut s = session();
        for minute in 0..5 {
            let obs = s.observe(&seen(PersonLabel::Unknown, at(1, 9, minute * 2, 0)));
            assert_eq!(obs, Observation::Unknown);
        }
        assert!(s.store().visits_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap().is_empty());
        assert!(s.store().visits_for("Unknown").unwrap().is_empty());
    }

    #[test]
    fn test_reserved_labels_never_persist() {
        let mut s = session();
        let unknown = seen(PersonLabel::Known("Unknown".into()), at(1, 9, 0, 0));
        let empty = seen(PersonLabel::Known(String::new()), at(1, 9, 0, 0));
        assert_eq!(s.observe(&unknown), Observation::Unknown);
        assert_eq!(s.observe(&empty), Observation::Unknown);
        assert!(s.store().visits_for("Unknown").unwrap().is_empty());
        assert!(s.store().visits_for("").unwrap().is_empty());
    }

    #[test]
    fn test_cooldown_collapses_burst() {
        let mut s = session();
        let obs: Vec<Observation> = (0..30)
            .map(|i| s.observe(&alice(at(1, 9, 0, 0) + TimeDelta::seconds(2 * i))))
            .collect();
        let recorded = obs.iter().filter(|o| matches!(o, Observation::Recorded(_))).count();
        assert_eq!(recorded, 1);
        assert!(obs[1..].iter().all(|o| *o == Observation::CoolingDown));
    }

    #[test]
    fn test_events_more_than_a_minute_apart_both_accepted() {
        let mut s = session();
        assert!(matches!(
            s.observe(&alice(at(1, 9, 0, 0))),
            Observation::Recorded(VisitOutcome::Created { .. })
        ));
        assert!(matches!(
            s.observe(&alice(at(1, 9, 1, 1))),
            Observation::Recorded(VisitOutcome::Extended { .. })
        ));
    }

    #[test]
    fn test_two_day_scenario() {
        let mut s = session();
        s.observe(&alice(at(1, 9, 0, 0)));
        s.observe(&alice(at(1, 9, 2, 0)));
        s.observe(&alice(at(2, 9, 0, 0)));

        let visits = s.store().visits_for("Alice").unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].first_seen, at(1, 9, 0, 0));
        assert_eq!(visits[0].last_seen, Some(at(1, 9, 2, 0)));
        assert_eq!(visits[1].first_seen, at(2, 9, 0, 0));
        assert_eq!(visits[1].last_seen, None);
    }

    #[test]
    fn test_cooldown_spans_midnight() {
        let mut s = session();
        let new_year = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let before_midnight = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 50)
            .unwrap();

        assert!(matches!(
            s.observe(&alice(before_midnight)),
            Observation::Recorded(VisitOutcome::Created { .. })
        ));
        // 40 s later, already on the new day: still inside the window.
        assert_eq!(s.observe(&alice(at(1, 0, 0, 30))), Observation::CoolingDown);
        assert!(s.store().visits_on(new_year).unwrap().is_empty());

        assert!(matches!(
            s.observe(&alice(at(1, 0, 1, 0))),
            Observation::Recorded(VisitOutcome::Created { .. })
        ));
        let visits = s.store().visits_for("Alice").unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].first_seen, before_midnight - TimeDelta::seconds(50));
        assert_eq!(visits[0].last_seen, None);
        assert_eq!(visits[1].first_seen, at(1, 0, 1, 0));
        assert_eq!(visits[1].last_seen, None);
    }

    #[test]
    fn test_storage_failure_is_not_fatal() {
        let mut s = Session::new(BrokenStore, CooldownFilter::default());
        let obs = s.observe(&alice(at(1, 9, 0, 0)));
        assert!(matches!(obs, Observation::StorageFailed(_)));

        // The sighting still counted for the cooldown.
        assert_eq!(s.observe(&alice(at(1, 9, 0, 30))), Observation::CoolingDown);
        assert!(matches!(
            s.observe(&alice(at(1, 9, 2, 0))),
            Observation::StorageFailed(_)
        ));
    }
}
