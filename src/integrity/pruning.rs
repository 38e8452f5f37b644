//! Message-history pruning: time-based eviction of old messages for
//! inactive threads.
//!
//! A thread becomes eligible once it holds more than the retained count
//! and its prune time has passed. The prune time backs off on both
//! navigation (don't evict what the user just read) and on previous
//! prunes (don't rescan constantly):
//!
//! ```text
//! prune_time = max(last_navigated_to + 1h, last_pruned + 6h)
//! ```
//!
//! The scheduler sleeps until [`next_message_prune_time`] rather than
//! polling, re-evaluating on every store change and on app-foreground
//! transitions (a deadline may have passed while backgrounded).

use crate::time::MS_IN_HOUR;
use crate::types::message::{MessageStore, ThreadMessageInfo};
use crate::types::thread::thread_id_is_pending;

/// Messages retained per thread after a prune
pub const DEFAULT_NUMBER_PER_THREAD: usize = 20;

/// Backoff after the user navigates to a thread
pub const NAVIGATION_BACKOFF_MS: i64 = MS_IN_HOUR;

/// Backoff after a thread was last pruned
pub const PRUNE_BACKOFF_MS: i64 = 6 * MS_IN_HOUR;

/// The instant a thread becomes eligible for pruning.
pub fn prune_time(thread: &ThreadMessageInfo) -> i64 {
    std::cmp::max(
        thread.last_navigated_to + NAVIGATION_BACKOFF_MS,
        thread.last_pruned + PRUNE_BACKOFF_MS,
    )
}

fn exceeds_retention(thread: &ThreadMessageInfo) -> bool {
    thread.message_ids.len() > DEFAULT_NUMBER_PER_THREAD
}

/// The earliest prune deadline across all threads exceeding the
/// retention threshold, or `None` when no thread does. The scheduler
/// sleeps until exactly this instant.
pub fn next_message_prune_time(store: &MessageStore) -> Option<i64> {
    store
        .threads
        .values()
        .filter(|thread| exceeds_retention(thread))
        .map(prune_time)
        .min()
}

/// The threads to prune right now. Never includes the active thread or a
/// pending thread: pruning must not destroy history the user is viewing
/// or history for a thread the server has not assigned an identity to.
pub fn prune_thread_ids(
    store: &MessageStore,
    active_thread_id: Option<&str>,
    now: i64,
) -> Vec<String> {
    let mut ids: Vec<String> = store
        .threads
        .iter()
        .filter(|(id, thread)| {
            exceeds_retention(thread)
                && now >= prune_time(thread)
                && Some(id.as_str()) != active_thread_id
                && !thread_id_is_pending(id)
        })
        .map(|(id, _)| id.clone())
        .collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn thread_view(count: usize, last_navigated_to: i64, last_pruned: i64) -> ThreadMessageInfo {
        ThreadMessageInfo {
            message_ids: (0..count).map(|i| format!("m{i}")).collect(),
            start_reached: false,
            last_navigated_to,
            last_pruned,
        }
    }

    fn store_with(threads: Vec<(&str, ThreadMessageInfo)>) -> MessageStore {
        MessageStore {
            messages: HashMap::new(),
            threads: threads
                .into_iter()
                .map(|(id, thread)| (id.to_string(), thread))
                .collect(),
            local: HashMap::new(),
            current_as_of: 0,
        }
    }

    #[test]
    fn test_prune_time_takes_the_later_backoff() {
        let thread = thread_view(25, 10 * MS_IN_HOUR, 0);
        assert_eq!(prune_time(&thread), 11 * MS_IN_HOUR);
        let thread = thread_view(25, 0, 10 * MS_IN_HOUR);
        assert_eq!(prune_time(&thread), 16 * MS_IN_HOUR);
    }

    #[test]
    fn test_next_prune_time_ignores_threads_below_retention() {
        let store = store_with(vec![
            ("256|84015", thread_view(5, 0, 0)),
            ("256|84020", thread_view(25, MS_IN_HOUR, 0)),
        ]);
        assert_eq!(next_message_prune_time(&store), Some(2 * MS_IN_HOUR));
    }

    #[test]
    fn test_next_prune_time_none_when_nothing_exceeds_retention() {
        let store = store_with(vec![("256|84015", thread_view(20, 0, 0))]);
        assert_eq!(next_message_prune_time(&store), None);
    }

    #[test]
    fn test_prune_thread_ids_excludes_active_thread() {
        let store = store_with(vec![
            ("256|84015", thread_view(25, 0, 0)),
            ("256|84020", thread_view(25, 0, 0)),
        ]);
        let now = 100 * MS_IN_HOUR;
        let ids = prune_thread_ids(&store, Some("256|84015"), now);
        assert_eq!(ids, vec!["256|84020".to_string()]);
    }

    #[test]
    fn test_prune_thread_ids_excludes_pending_threads() {
        let store = store_with(vec![
            ("pending/sidebar/83809", thread_view(25, 0, 0)),
            ("256|84020", thread_view(25, 0, 0)),
        ]);
        let now = 100 * MS_IN_HOUR;
        let ids = prune_thread_ids(&store, None, now);
        assert_eq!(ids, vec!["256|84020".to_string()]);
    }

    #[test]
    fn test_prune_thread_ids_respects_deadline() {
        let store = store_with(vec![("256|84015", thread_view(25, 0, 0))]);
        assert!(prune_thread_ids(&store, None, PRUNE_BACKOFF_MS - 1).is_empty());
        assert_eq!(
            prune_thread_ids(&store, None, PRUNE_BACKOFF_MS),
            vec!["256|84015".to_string()]
        );
    }
}
