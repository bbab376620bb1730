use crate::app::ports::DocumentStorePort;
use crate::error::StoreError;
use crate::types::EventRecord;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use tracing::debug;

/// Drop every item whose id already appeared earlier in `items`.
pub fn first_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

/// Keep only candidates whose id is not yet stored in `collection`, in original order.
///
/// Lookups run with at most `concurrency` in flight. Any lookup failure aborts the filter:
/// guessing "absent" would risk writing a duplicate.
pub async fn filter_new(
    candidates: Vec<EventRecord>,
    store: &dyn DocumentStorePort,
    collection: &str,
    concurrency: usize,
) -> Result<Vec<EventRecord>, StoreError> {
    // a page listing the same event twice must not produce a batch with a repeated key
    let unique = first_by_id(candidates, |r: &EventRecord| r.id.as_str());

    let flagged: Vec<(EventRecord, bool)> = stream::iter(unique)
        .map(|record| async move {
            let exists = store.exists(collection, &record.id).await?;
            Ok::<_, StoreError>((record, exists))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let total = flagged.len();
    let fresh: Vec<EventRecord> = flagged
        .into_iter()
        .filter_map(|(record, exists)| (!exists).then_some(record))
        .collect();
    debug!("{} of {} candidates are new", fresh.len(), total);
    Ok(fresh)
}
