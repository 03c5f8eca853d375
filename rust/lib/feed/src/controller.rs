use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bjjtrack_feed_client::{
    ActivityKey, ActivityKind, ApiError, FeedGateway, FeedPage, FeedQuery, LikeRequest, NewComment,
    VisibilityLevel,
};

use crate::config::{FeedConfig, FeedFilter, FeedView};
use crate::mutation::{MutationKind, MutationLog, MutationPhase};
use crate::notice::{Notice, Notifier};
use crate::store::{FeedState, FeedStore, SubscriptionId};

/// A boxed, `Send`-able future returned by controller operations.
///
/// The synchronous part of an operation (generation bump, optimistic edit,
/// re-entrancy check) has already happened when the future is returned. The
/// network part runs on a spawned task, so dropping the future does not
/// cancel it; awaiting only observes the outcome.
pub type Pending<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// How a full load or a load-more ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Response written to the store.
    Committed,
    /// A newer load started meanwhile; the response was dropped.
    Stale,
    /// Request failed; error state and notice were emitted.
    Failed,
    /// Nothing was requested (guard, or controller torn down).
    Skipped,
}

/// How a social mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Server accepted the change.
    Confirmed,
    /// Server rejected an optimistic change; the feed was reloaded.
    Reconciled,
    /// Server rejected a non-optimistic change; nothing to undo.
    Rejected,
    /// No network call was made.
    Skipped,
}

fn ready<T: Send + 'static>(value: T) -> Pending<T> {
    Box::pin(future::ready(value))
}

/// Run `task` on the current Tokio runtime. `lost` is reported if the task
/// panics.
fn spawn<T, F>(task: F, lost: T) -> Pending<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let handle = tokio::spawn(task);
    Box::pin(async move {
        handle.await.unwrap_or_else(|e| {
            error!(error = %e, "feed task aborted");
            lost
        })
    })
}

/// Activity feed controller.
///
/// Owns the [`FeedStore`] of one view. Presentation code reads
/// [`snapshot`](Self::snapshot) or subscribes, and changes the feed only
/// through the `handle_*` operations. Operations must be called from within
/// a Tokio runtime.
///
/// ```ignore
/// let feed = FeedController::new(gateway, Arc::new(TracingNotifier), FeedConfig::default());
/// feed.retry().await;
/// feed.handle_like(ActivityKind::Session, 42).await;
/// feed.teardown();
/// ```
#[derive(Clone)]
pub struct FeedController {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: Arc<dyn FeedGateway>,
    notifier: Arc<dyn Notifier>,
    config: FeedConfig,
    store: FeedStore,
    mutations: MutationLog,
    cancel: CancellationToken,
}

impl FeedController {
    pub fn new(gateway: Arc<dyn FeedGateway>, notifier: Arc<dyn Notifier>, config: FeedConfig) -> Self {
        let store = FeedStore::new(config.filter());
        Self {
            inner: Arc::new(Inner {
                gateway,
                notifier,
                config,
                store,
                mutations: MutationLog::default(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ====================================================================
    // State
    // ====================================================================

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> FeedState {
        self.inner.store.snapshot()
    }

    pub fn store(&self) -> &FeedStore {
        &self.inner.store
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&FeedState) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.store.unsubscribe(id)
    }

    pub fn mutations(&self) -> &MutationLog {
        &self.inner.mutations
    }

    /// Phase of the latest optimistic mutation on an activity.
    pub fn phase_of(&self, kind: ActivityKind, id: i64) -> MutationPhase {
        self.inner.mutations.phase_of(ActivityKey::new(kind, id))
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ====================================================================
    // Loading
    // ====================================================================

    /// Full load for `filter`, replacing the page on success.
    pub fn load(&self, filter: FeedFilter) -> Pending<LoadOutcome> {
        self.inner.load(filter)
    }

    /// Reload with the current filter.
    pub fn retry(&self) -> Pending<LoadOutcome> {
        self.inner.retry()
    }

    /// Change the lookback window and reload.
    pub fn set_days_back(&self, days_back: u32) -> Pending<LoadOutcome> {
        let filter = FeedFilter {
            days_back,
            ..self.snapshot().filter
        };
        self.inner.load(filter)
    }

    /// Switch between own and friends' activity and reload.
    pub fn set_view(&self, view: FeedView) -> Pending<LoadOutcome> {
        let filter = FeedFilter {
            view,
            ..self.snapshot().filter
        };
        self.inner.load(filter)
    }

    /// Append the next page. No-op while a full load or another load-more is
    /// in flight, and before the first page arrived.
    pub fn handle_load_more(&self) -> Pending<LoadOutcome> {
        self.inner.load_more()
    }

    // ====================================================================
    // Mutations
    // ====================================================================

    pub fn handle_like(&self, kind: ActivityKind, id: i64) -> Pending<MutationOutcome> {
        let key = ActivityKey::new(kind, id);
        self.inner.optimistic(
            MutationKind::Like,
            key,
            move |page| {
                page.find_mut(key)?.like();
                Some(LikeRequest::from(key))
            },
            |gateway, req| async move { gateway.like(&req).await },
        )
    }

    pub fn handle_unlike(&self, kind: ActivityKind, id: i64) -> Pending<MutationOutcome> {
        let key = ActivityKey::new(kind, id);
        self.inner.optimistic(
            MutationKind::Unlike,
            key,
            move |page| {
                page.find_mut(key)?.unlike();
                Some(LikeRequest::from(key))
            },
            |gateway, req| async move { gateway.unlike(&req).await },
        )
    }

    /// Remove a rest-day check-in from the feed and delete it remotely.
    pub fn handle_delete_rest(&self, checkin_id: i64) -> Pending<MutationOutcome> {
        let key = ActivityKey::new(ActivityKind::Rest, checkin_id);
        self.inner.optimistic(
            MutationKind::DeleteRest,
            key,
            move |page| page.remove(key).map(|_| checkin_id),
            |gateway, id| async move { gateway.delete_rest_checkin(id).await },
        )
    }

    /// Change who can see a session. The full session payload, with the new
    /// level merged in, is sent to the server.
    pub fn handle_visibility_change(
        &self,
        kind: ActivityKind,
        id: i64,
        visibility: VisibilityLevel,
    ) -> Pending<MutationOutcome> {
        if kind != ActivityKind::Session {
            debug!(%kind, id, "visibility change ignored for non-session activity");
            return ready(MutationOutcome::Skipped);
        }
        let key = ActivityKey::new(kind, id);
        self.inner.optimistic(
            MutationKind::Visibility,
            key,
            move |page| {
                let item = page.find_mut(key)?;
                item.set_visibility(visibility);
                Some(Value::Object(item.data.clone()))
            },
            move |gateway, payload| async move {
                gateway.update_session(id, &payload).await.map(|_| ())
            },
        )
    }

    /// Post a comment. The comment count changes only after the server
    /// accepts it.
    pub fn handle_add_comment(
        &self,
        kind: ActivityKind,
        id: i64,
        text: impl Into<String>,
    ) -> Pending<MutationOutcome> {
        self.inner.add_comment(ActivityKey::new(kind, id), text.into())
    }

    pub fn handle_delete_comment(
        &self,
        kind: ActivityKind,
        id: i64,
        comment_id: i64,
    ) -> Pending<MutationOutcome> {
        let key = ActivityKey::new(kind, id);
        self.inner.optimistic(
            MutationKind::DeleteComment,
            key,
            move |page| {
                let item = page.find_mut(key)?;
                item.comment_count = item.comment_count.saturating_sub(1);
                Some(comment_id)
            },
            |gateway, comment_id| async move { gateway.delete_comment(comment_id).await },
        )
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    /// Tear the view down. Pending operations resolve as no-ops, their
    /// mutation records end `Abandoned`, and new operations are skipped.
    pub fn teardown(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        self.inner.cancel.cancel();
        self.inner.store.advance(|state| {
            state.loading = false;
            state.loading_more = false;
        });
        debug!("feed controller torn down");
    }
}

impl Inner {
    fn retry(self: &Arc<Self>) -> Pending<LoadOutcome> {
        let (filter, _) = self.store.inspect(|state| state.filter);
        self.load(filter)
    }

    fn load(self: &Arc<Self>, filter: FeedFilter) -> Pending<LoadOutcome> {
        if self.cancel.is_cancelled() {
            return ready(LoadOutcome::Skipped);
        }
        let generation = self.store.advance(|state| {
            state.filter = filter;
            state.loading = true;
            state.loading_more = false;
            state.error = None;
        });
        debug!(generation, view = ?filter.view, days_back = filter.days_back, "feed load started");

        let inner = Arc::clone(self);
        spawn(
            async move { inner.finish_load(generation, filter).await },
            LoadOutcome::Skipped,
        )
    }

    async fn finish_load(&self, generation: u64, filter: FeedFilter) -> LoadOutcome {
        let query = filter.query(self.config.initial_limit, 0);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return LoadOutcome::Skipped,
            result = self.fetch(filter, &query) => result,
        };

        match result {
            Ok(page) => {
                let (count, total) = (page.items.len(), page.total);
                let committed = self.store.commit(generation, move |state| {
                    state.page = Some(page);
                    state.loading = false;
                    state.error = None;
                });
                if committed.is_some() {
                    info!(generation, count, total, "feed loaded");
                    LoadOutcome::Committed
                } else {
                    debug!(generation, "dropping stale feed response");
                    LoadOutcome::Stale
                }
            }
            Err(e) => {
                let message = e.to_string();
                let committed = self.store.commit(generation, move |state| {
                    state.page = None;
                    state.loading = false;
                    state.error = Some(message);
                });
                if committed.is_some() {
                    warn!(generation, error = %e, "feed load failed");
                    self.notifier.notify(Notice::error("Failed to load activity feed"));
                    LoadOutcome::Failed
                } else {
                    debug!(generation, error = %e, "dropping stale feed error");
                    LoadOutcome::Stale
                }
            }
        }
    }

    fn load_more(self: &Arc<Self>) -> Pending<LoadOutcome> {
        if self.cancel.is_cancelled() {
            return ready(LoadOutcome::Skipped);
        }
        let begun = self.store.try_update(|state| {
            // The displayed page is about to be replaced; its length is no
            // offset into the next one.
            if state.loading || state.loading_more {
                return None;
            }
            let offset = state.page.as_ref()?.items.len();
            state.loading_more = true;
            Some((state.filter, offset))
        });
        let Some(((filter, offset), generation)) = begun else {
            debug!("load more skipped");
            return ready(LoadOutcome::Skipped);
        };

        let inner = Arc::clone(self);
        spawn(
            async move { inner.finish_load_more(generation, filter, offset).await },
            LoadOutcome::Skipped,
        )
    }

    async fn finish_load_more(&self, generation: u64, filter: FeedFilter, offset: usize) -> LoadOutcome {
        let query = filter.query(self.config.page_size, offset);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return LoadOutcome::Skipped,
            result = self.fetch(filter, &query) => result,
        };

        match result {
            Ok(next) => {
                let added = next.items.len();
                let committed = self.store.commit(generation, move |state| {
                    if let Some(page) = state.page.as_mut() {
                        page.append(next);
                    }
                    state.loading_more = false;
                });
                if committed.is_some() {
                    info!(generation, offset, added, "feed page appended");
                    LoadOutcome::Committed
                } else {
                    debug!(generation, "dropping load-more response for replaced feed");
                    LoadOutcome::Stale
                }
            }
            Err(e) => {
                let committed = self.store.commit(generation, |state| state.loading_more = false);
                if committed.is_some() {
                    warn!(generation, offset, error = %e, "load more failed");
                    self.notifier.notify(Notice::error("Failed to load more activity"));
                    LoadOutcome::Failed
                } else {
                    LoadOutcome::Stale
                }
            }
        }
    }

    async fn fetch(&self, filter: FeedFilter, query: &FeedQuery) -> Result<FeedPage, ApiError> {
        match filter.view {
            FeedView::My => self.gateway.my_feed(query).await,
            FeedView::Friends => self.gateway.friends_feed(query).await,
        }
    }

    /// Apply `apply` to the loaded page right away, then run `remote`.
    ///
    /// `apply` returns `None` when there is nothing to change (no page, no
    /// matching item); no request is made then. A failed `remote` reloads
    /// the whole feed.
    fn optimistic<C, F, Fut>(
        self: &Arc<Self>,
        kind: MutationKind,
        key: ActivityKey,
        apply: impl FnOnce(&mut FeedPage) -> Option<C>,
        remote: F,
    ) -> Pending<MutationOutcome>
    where
        C: Send + 'static,
        F: FnOnce(Arc<dyn FeedGateway>, C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return ready(MutationOutcome::Skipped);
        }
        let applied = self
            .store
            .try_update(|state| state.page.as_mut().and_then(apply));
        let Some((ctx, _)) = applied else {
            debug!(%key, ?kind, "mutation skipped: activity not loaded");
            return ready(MutationOutcome::Skipped);
        };

        let seq = self.mutations.begin(kind, key);
        debug!(seq, %key, ?kind, "optimistic mutation applied");

        let inner = Arc::clone(self);
        let gateway = Arc::clone(&self.gateway);
        let task = async move {
            let result = tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => {
                    inner.mutations.settle(seq, MutationPhase::Abandoned);
                    debug!(seq, %key, "mutation abandoned by teardown");
                    return MutationOutcome::Skipped;
                }
                result = remote(gateway, ctx) => result,
            };

            match result {
                Ok(()) => {
                    inner.mutations.settle(seq, MutationPhase::Confirmed);
                    debug!(seq, %key, "mutation confirmed");
                    MutationOutcome::Confirmed
                }
                Err(e) => {
                    inner.mutations.settle(seq, MutationPhase::Reconciling);
                    warn!(seq, %key, error = %e, "failed to {}, reloading feed", kind.describe());
                    inner
                        .notifier
                        .notify(Notice::error(format!("Failed to {}", kind.describe())));
                    inner.retry().await;
                    MutationOutcome::Reconciled
                }
            }
        };
        spawn(task, MutationOutcome::Skipped)
    }

    fn add_comment(self: &Arc<Self>, key: ActivityKey, text: String) -> Pending<MutationOutcome> {
        let comment = text.trim().to_string();
        if self.cancel.is_cancelled() || comment.is_empty() {
            return ready(MutationOutcome::Skipped);
        }
        let (present, generation) = self
            .store
            .inspect(|state| state.page.as_ref().is_some_and(|page| page.find(key).is_some()));
        if !present {
            debug!(%key, "comment skipped: activity not loaded");
            return ready(MutationOutcome::Skipped);
        }

        let req = NewComment {
            activity_type: key.kind,
            activity_id: key.id,
            comment,
        };
        let inner = Arc::clone(self);
        let task = async move {
            let result = tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => return MutationOutcome::Skipped,
                result = inner.gateway.add_comment(&req) => result,
            };

            match result {
                Ok(created) => {
                    // A reload since the call began already carries the new count.
                    inner.store.commit(generation, |state| {
                        if let Some(item) = state.page.as_mut().and_then(|page| page.find_mut(key)) {
                            item.comment_count += 1;
                        }
                    });
                    debug!(%key, comment_id = created.id, "comment posted");
                    MutationOutcome::Confirmed
                }
                Err(e) => {
                    warn!(%key, error = %e, "failed to post comment");
                    inner.notifier.notify(Notice::error("Failed to post comment"));
                    MutationOutcome::Rejected
                }
            }
        };
        spawn(task, MutationOutcome::Skipped)
    }
}
