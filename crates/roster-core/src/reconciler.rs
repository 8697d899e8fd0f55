//! Daily visit reconciliation.
//!
//! Each `(name, calendar day)` moves through
//! `NoRecord → FirstSeenOnly → FirstAndLastSeen` and never back. Sightings
//! are compared at minute precision, the precision of the stored format.

use crate::store::{StoreError, VisitStore};
use crate::timestamp::truncate_to_minute;
use chrono::NaiveDateTime;

/// What a reconciled sighting did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// First sighting of the day: a new record was created.
    Created { id: i64 },
    /// `last_seen` was set or advanced.
    Extended { id: i64 },
    /// Not later than the record's latest sighting; dropped.
    Stale { id: i64 },
}

/// Upserts accepted sightings into a [`VisitStore`].
pub struct VisitReconciler<S> {
    store: S,
}

impl<S: VisitStore> VisitReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fold one sighting of `name` into that day's record.
    pub fn record_visit(&self, name: &str, timestamp: NaiveDateTime) -> Result<VisitOutcome, StoreError> {
        let stamp = truncate_to_minute(timestamp);
        let day = stamp.date();

        let Some(record) = self.store.find_for_day(name, day)? else {
            let id = self.store.insert_first_seen(name, stamp)?;
            tracing::info!(id, name, first_seen = %stamp, "new visit recorded");
            return Ok(VisitOutcome::Created { id });
        };

        if stamp > record.latest() {
            self.store.set_last_seen(record.id, stamp)?;
            tracing::debug!(id = record.id, name, last_seen = %stamp, "visit extended");
            Ok(VisitOutcome::Extended { id: record.id })
        } else {
            tracing::debug!(
                id = record.id,
                name,
                sighting = %stamp,
                latest = %record.latest(),
                "stale sighting dropped"
            );
            Ok(VisitOutcome::Stale { id: record.id })
        }
    }
}
