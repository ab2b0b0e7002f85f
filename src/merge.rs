//! Month-scoped merge of parsed events into an existing event list.
//!
//! A paste replaces every event in the months it touches and leaves all other
//! months untouched. These functions are pure; [`crate::state::EventStore`]
//! runs them inside its locked read-modify-write cycle.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::event::Event;

/// New id of the form `<unix millis>-<8 hex chars>`.
pub fn generate_event_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Replace the events of every month in `affected` with `incoming`.
pub fn merge_month_scoped(
    existing: Vec<Event>,
    affected: &BTreeSet<String>,
    incoming: Vec<Event>,
) -> Vec<Event> {
    merge_month_scoped_with(existing, affected, incoming, generate_event_id)
}

/// [`merge_month_scoped`] with a caller-supplied id generator.
///
/// Incoming events keep any id they already carry. An id-less incoming event
/// identical to a replaced one inherits that event's id, so re-pasting the same
/// text leaves the store unchanged. Everything else gets a fresh id that is
/// unique within the result.
pub fn merge_month_scoped_with<F>(
    existing: Vec<Event>,
    affected: &BTreeSet<String>,
    mut incoming: Vec<Event>,
    next_id: F,
) -> Vec<Event>
where
    F: FnMut() -> String,
{
    let (replaced, mut retained): (Vec<Event>, Vec<Event>) =
        existing.into_iter().partition(|event| affected.contains(&event.month_key()));
    debug!(
        "Merging {} events: replacing {} in {:?}, retaining {}",
        incoming.len(),
        replaced.len(),
        affected,
        retained.len()
    );

    let mut taken: HashSet<String> = retained
        .iter()
        .chain(incoming.iter())
        .filter_map(|event| event.id.clone())
        .collect();

    let mut reusable: Vec<&Event> =
        replaced.iter().filter(|old| old.id.as_ref().is_some_and(|id| !taken.contains(id))).collect();
    for event in incoming.iter_mut().filter(|event| event.id.is_none()) {
        if let Some(pos) = reusable.iter().position(|old| old.same_entry(event)) {
            let old = reusable.swap_remove(pos);
            if let Some(id) = &old.id {
                taken.insert(id.clone());
                event.id = Some(id.clone());
            }
        }
    }

    assign_missing_ids(&mut incoming, &mut taken, next_id);
    retained.extend(incoming);
    retained
}

/// Give every id-less event an id not yet in `taken`.
pub fn assign_missing_ids<F>(events: &mut [Event], taken: &mut HashSet<String>, mut next_id: F)
where
    F: FnMut() -> String,
{
    for event in events.iter_mut().filter(|event| event.id.is_none()) {
        let id = loop {
            let candidate = next_id();
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        event.id = Some(id);
    }
}
