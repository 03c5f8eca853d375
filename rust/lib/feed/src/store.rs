use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bjjtrack_feed_client::FeedPage;

use crate::config::FeedFilter;

/// Callback type for feed state change notifications.
pub type ChangeHandler = Arc<dyn Fn(&FeedState) + Send + Sync>;

/// Unique handle for a subscription, returned by `FeedStore::subscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Everything a feed view renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedState {
    /// `None` until the first load succeeds, and after a failed load.
    pub page: Option<FeedPage>,
    /// Inputs of the most recent full load.
    pub filter: FeedFilter,
    /// A full load is in flight.
    pub loading: bool,
    /// A "load more" is in flight.
    pub loading_more: bool,
    /// Message of the last failed full load.
    pub error: Option<String>,
}

impl FeedState {
    pub fn has_more(&self) -> bool {
        self.page.as_ref().is_some_and(FeedPage::has_more)
    }
}

/// Feed state holder owned by one controller.
///
/// - `snapshot()` clones the current state for rendering.
/// - `subscribe(handler)` registers a change handler, called after every write.
/// - Writes carry a generation: `advance` starts a new one, `commit` only
///   applies when its generation is still current. The check and the write
///   happen under the same lock.
pub struct FeedStore {
    slot: RwLock<Slot>,
    handlers: RwLock<Vec<HandlerEntry>>,
    next_id: AtomicU64,
}

struct Slot {
    state: FeedState,
    generation: u64,
}

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: ChangeHandler,
}

impl FeedStore {
    pub fn new(filter: FeedFilter) -> Self {
        Self {
            slot: RwLock::new(Slot {
                state: FeedState {
                    filter,
                    ..FeedState::default()
                },
                generation: 0,
            }),
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> FeedState {
        self.read().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Start a new generation, apply `f`, and return the new generation.
    ///
    /// Any write still holding an older generation is dropped by `commit`.
    pub(crate) fn advance(&self, f: impl FnOnce(&mut FeedState)) -> u64 {
        let (generation, state) = {
            let mut slot = self.write();
            slot.generation += 1;
            f(&mut slot.state);
            (slot.generation, slot.state.clone())
        };
        self.notify(&state);
        generation
    }

    /// Apply `f` if `generation` is still current. Returns `None` when stale.
    pub(crate) fn commit<R>(&self, generation: u64, f: impl FnOnce(&mut FeedState) -> R) -> Option<R> {
        let (out, state) = {
            let mut slot = self.write();
            if slot.generation != generation {
                return None;
            }
            let out = f(&mut slot.state);
            (out, slot.state.clone())
        };
        self.notify(&state);
        Some(out)
    }

    /// Apply `f`; subscribers are notified only when it returns `Some`.
    /// Returns the result together with the generation it was applied under.
    pub(crate) fn try_update<R>(&self, f: impl FnOnce(&mut FeedState) -> Option<R>) -> Option<(R, u64)> {
        let (out, generation, state) = {
            let mut slot = self.write();
            let out = f(&mut slot.state)?;
            (out, slot.generation, slot.state.clone())
        };
        self.notify(&state);
        Some((out, generation))
    }

    /// Read the state without writing. Returns the current generation too.
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&FeedState) -> R) -> (R, u64) {
        let slot = self.read();
        (f(&slot.state), slot.generation)
    }

    /// Subscribe to state changes.
    ///
    /// The handler runs synchronously on the task that wrote the state, after
    /// the store lock is released, so it may call `snapshot()`.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&FeedState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(HandlerEntry {
                id,
                handler: Arc::new(handler),
            });
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let len = handlers.len();
        handlers.retain(|entry| entry.id != id);
        handlers.len() < len
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn notify(&self, state: &FeedState) {
        let entries: Vec<HandlerEntry> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for entry in entries {
            (entry.handler)(state);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::config::FeedView;

    fn store() -> FeedStore {
        FeedStore::new(FeedFilter::new(FeedView::My, 30))
    }

    #[test]
    fn new_store_is_empty() {
        let s = store();
        let snap = s.snapshot();
        assert!(snap.page.is_none());
        assert!(!snap.loading);
        assert!(!snap.has_more());
        assert_eq!(snap.filter.days_back, 30);
        assert_eq!(s.generation(), 0);
    }

    #[test]
    fn commit_drops_stale_generation() {
        let s = store();
        let old = s.advance(|st| st.loading = true);
        let new = s.advance(|st| st.filter.days_back = 7);
        assert!(new > old);

        assert!(s.commit(old, |st| st.error = Some("stale".into())).is_none());
        assert!(s.snapshot().error.is_none());

        assert_eq!(s.commit(new, |st| { st.loading = false; 1 }), Some(1));
        assert!(!s.snapshot().loading);
    }

    #[test]
    fn try_update_reports_generation() {
        let s = store();
        let g = s.advance(|_| {});
        assert!(s.try_update(|st| st.page.as_ref().map(|_| ())).is_none());
        assert_eq!(s.try_update(|st| { st.loading = true; Some(5) }), Some((5, g)));
        let (loading, at) = s.inspect(|st| st.loading);
        assert!(loading);
        assert_eq!(at, g);
    }

    #[test]
    fn subscribers_see_every_write() {
        let s = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = {
            let seen = Arc::clone(&seen);
            s.subscribe(move |st| seen.lock().unwrap().push(st.loading))
        };
        assert_eq!(s.subscriber_count(), 1);

        let g = s.advance(|st| st.loading = true);
        s.commit(g, |st| st.loading = false);
        s.try_update(|st| st.page.as_ref().map(|_| ()));
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);

        assert!(s.unsubscribe(id));
        assert!(!s.unsubscribe(id));
        s.try_update(|st| { st.loading = true; Some(()) });
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn handler_may_read_snapshot() {
        let s = Arc::new(store());
        let observed = Arc::new(Mutex::new(None));
        {
            let weak = Arc::downgrade(&s);
            let observed = Arc::clone(&observed);
            s.subscribe(move |_| {
                if let Some(store) = weak.upgrade() {
                    *observed.lock().unwrap() = Some(store.snapshot().filter.days_back);
                }
            });
        }
        s.advance(|st| st.filter.days_back = 90);
        assert_eq!(*observed.lock().unwrap(), Some(90));
    }
}
