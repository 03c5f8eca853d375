//! Transient user-facing notifications (toasts).
//!
//! The controller never reaches for a global toast queue; a [`Notifier`] is
//! injected at construction.

use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Notification sink.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

impl<F> Notifier for F
where
    F: Fn(Notice) + Send + Sync + 'static,
{
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(notice = %notice.message),
            NoticeLevel::Error => error!(notice = %notice.message),
        }
    }
}

/// Forwards notices to a channel. Sends after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn closure_notifier_receives_notices() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |n: Notice| seen.lock().unwrap().push(n)
        };
        sink.notify(Notice::error("Failed to like activity"));
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Notice::error("Failed to like activity")]
        );
    }

    #[test]
    fn channel_notifier_forwards_in_order() {
        let (sink, mut rx) = ChannelNotifier::channel();
        sink.notify(Notice::info("Feed refreshed"));
        sink.notify(Notice::error("Failed to load activity feed"));
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Info);
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Error);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_notifier_tolerates_closed_receiver() {
        let (sink, rx) = ChannelNotifier::channel();
        drop(rx);
        sink.notify(Notice::info("nobody listening"));
    }
}
