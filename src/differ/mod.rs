//! Change detection between the stored state and a freshly fetched dataset.

use crate::record::{FacilityId, FacilityState, Record};
use crate::store::StateStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;


/// Records from `fetched` that are new or whose `state` differs from `current`.
///
/// Changed records are stamped with `observed_at`; unchanged ones are dropped.
/// Output keeps the fetch order. Only `state` is compared: a new description
/// or position alone is not a change.
///
/// If the same id appears more than once in `fetched`, later occurrences are
/// compared against the earlier ones, as if each change had already been
/// applied.
pub fn diff(current: &StateStore, fetched: Vec<Record>, observed_at: DateTime<Utc>) -> Vec<Record> {
    let mut pending: HashMap<FacilityId, FacilityState> = HashMap::new();

    fetched
        .into_iter()
        .filter_map(|record| {
            let known = pending
                .get(&record.id)
                .copied()
                .or_else(|| current.state_of(record.id));

            if known == Some(record.state) {
                return None;
            }

            pending.insert(record.id, record.state);
            Some(record.observed(observed_at))
        })
        .collect()
}
