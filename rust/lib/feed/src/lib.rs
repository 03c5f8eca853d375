//! Activity feed controller.
//!
//! Holds one view's feed page in memory, applies social mutations
//! optimistically, and reconciles with the server when they fail.
//!
//! # Pieces
//!
//! - [`FeedStore`]: the page plus loading/error flags, with subscriptions
//! - [`FeedController`]: load, load-more, like/unlike, delete rest day,
//!   visibility and comment mutations
//! - [`MutationLog`]: per-mutation `Optimistic → Confirmed | Reconciling`
//!   state machine
//! - [`Notifier`]: injected sink for user-facing notices
//!
//! # Ordering
//!
//! Every full load starts a new store generation. Responses commit only if
//! their generation is still current, so a slow response for an old filter
//! never overwrites a newer one. `teardown()` cancels everything in flight.
//!
//! # Example
//!
//! ```ignore
//! use bjjtrack_feed::{FeedConfig, FeedController, TracingNotifier};
//!
//! let feed = FeedController::new(gateway, Arc::new(TracingNotifier), FeedConfig::default());
//! feed.retry().await;
//!
//! // Applied before this line returns; the request runs on a spawned task.
//! let pending = feed.handle_like(ActivityKind::Session, 42);
//! assert!(feed.snapshot().page.unwrap().items[0].has_liked);
//! pending.await;
//! ```

pub mod config;
pub mod controller;
pub mod mutation;
pub mod notice;
pub mod store;

pub use config::{FeedConfig, FeedFilter, FeedView};
pub use controller::{FeedController, LoadOutcome, MutationOutcome, Pending};
pub use mutation::{MutationKind, MutationLog, MutationPhase, MutationRecord};
pub use notice::{ChannelNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use store::{ChangeHandler, FeedState, FeedStore, SubscriptionId};
