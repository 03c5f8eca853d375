//! Optimistic mutation lifecycle.
//!
//! Each optimistic edit is tracked as a small state machine:
//!
//! ```text
//! Idle ──apply──▶ Optimistic ──ack──────▶ Confirmed
//!                            ├─fail─────▶ Reconciling (full reload)
//!                            └─teardown─▶ Abandoned
//! ```
//!
//! `MutationLog` keeps the most recent records so callers (and tests) can
//! observe transitions per activity.

use std::collections::VecDeque;
use std::sync::Mutex;

use bjjtrack_feed_client::ActivityKey;

/// Default number of records kept in a `MutationLog`.
pub const DEFAULT_HISTORY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Like,
    Unlike,
    DeleteRest,
    Visibility,
    DeleteComment,
}

impl MutationKind {
    /// Phrase used in failure notices ("Failed to ...").
    pub fn describe(&self) -> &'static str {
        match self {
            MutationKind::Like => "like activity",
            MutationKind::Unlike => "unlike activity",
            MutationKind::DeleteRest => "delete rest day",
            MutationKind::Visibility => "update session visibility",
            MutationKind::DeleteComment => "delete comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// No mutation recorded.
    Idle,
    /// Applied locally, remote call outstanding.
    Optimistic,
    /// Remote call succeeded; local state is final.
    Confirmed,
    /// Remote call failed; the feed is being reloaded from the server.
    Reconciling,
    /// The view was torn down before the server answered.
    Abandoned,
}

impl MutationPhase {
    pub fn can_transition(self, to: MutationPhase) -> bool {
        matches!(
            (self, to),
            (MutationPhase::Idle, MutationPhase::Optimistic)
                | (MutationPhase::Optimistic, MutationPhase::Confirmed)
                | (MutationPhase::Optimistic, MutationPhase::Reconciling)
                | (MutationPhase::Optimistic, MutationPhase::Abandoned)
        )
    }

    pub fn is_settled(self) -> bool {
        matches!(
            self,
            MutationPhase::Confirmed | MutationPhase::Reconciling | MutationPhase::Abandoned
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub seq: u64,
    pub kind: MutationKind,
    pub key: ActivityKey,
    pub phase: MutationPhase,
}

/// Bounded history of mutation records, oldest first.
pub struct MutationLog {
    inner: Mutex<LogInner>,
    capacity: usize,
}

struct LogInner {
    records: VecDeque<MutationRecord>,
    next_seq: u64,
}

impl MutationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LogInner {
                records: VecDeque::new(),
                next_seq: 1,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Record a freshly applied optimistic mutation. Returns its sequence number.
    pub fn begin(&self, kind: MutationKind, key: ActivityKey) -> u64 {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        if inner.records.len() == self.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(MutationRecord {
            seq,
            kind,
            key,
            phase: MutationPhase::Optimistic,
        });
        seq
    }

    /// Move record `seq` to `phase`. Returns false for unknown records and
    /// illegal transitions.
    pub fn settle(&self, seq: u64, phase: MutationPhase) -> bool {
        let mut inner = self.lock();
        match inner.records.iter_mut().find(|r| r.seq == seq) {
            Some(record) if record.phase.can_transition(phase) => {
                record.phase = phase;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, seq: u64) -> Option<MutationRecord> {
        self.lock().records.iter().find(|r| r.seq == seq).cloned()
    }

    /// Phase of the latest mutation on `key`.
    pub fn phase_of(&self, key: ActivityKey) -> MutationPhase {
        self.lock()
            .records
            .iter()
            .rev()
            .find(|r| r.key == key)
            .map(|r| r.phase)
            .unwrap_or(MutationPhase::Idle)
    }

    pub fn records(&self) -> Vec<MutationRecord> {
        self.lock().records.iter().cloned().collect()
    }

    /// Number of records still waiting on the server.
    pub fn in_flight(&self) -> usize {
        self.lock()
            .records
            .iter()
            .filter(|r| r.phase == MutationPhase::Optimistic)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MutationLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bjjtrack_feed_client::ActivityKind;

    fn key(id: i64) -> ActivityKey {
        ActivityKey::new(ActivityKind::Session, id)
    }

    #[test]
    fn transitions_follow_the_machine() {
        use MutationPhase::*;
        assert!(Idle.can_transition(Optimistic));
        assert!(Optimistic.can_transition(Confirmed));
        assert!(Optimistic.can_transition(Reconciling));
        assert!(!Idle.can_transition(Confirmed));
        assert!(!Confirmed.can_transition(Reconciling));
        assert!(!Reconciling.can_transition(Optimistic));
        assert!(Optimistic.can_transition(Abandoned));
        assert!(!Abandoned.can_transition(Confirmed));
        assert!(Abandoned.is_settled());
    }

    #[test]
    fn settle_once() {
        let log = MutationLog::default();
        let seq = log.begin(MutationKind::Like, key(42));
        assert_eq!(log.phase_of(key(42)), MutationPhase::Optimistic);
        assert_eq!(log.in_flight(), 1);

        assert!(log.settle(seq, MutationPhase::Confirmed));
        assert!(!log.settle(seq, MutationPhase::Reconciling));
        assert_eq!(log.get(seq).unwrap().phase, MutationPhase::Confirmed);
        assert_eq!(log.in_flight(), 0);
    }

    #[test]
    fn phase_of_reports_latest_record() {
        let log = MutationLog::default();
        let first = log.begin(MutationKind::Like, key(1));
        log.settle(first, MutationPhase::Confirmed);
        let second = log.begin(MutationKind::Unlike, key(1));
        log.settle(second, MutationPhase::Reconciling);

        assert_eq!(log.phase_of(key(1)), MutationPhase::Reconciling);
        assert_eq!(log.phase_of(key(2)), MutationPhase::Idle);
    }

    #[test]
    fn history_is_bounded() {
        let log = MutationLog::new(2);
        log.begin(MutationKind::Like, key(1));
        log.begin(MutationKind::Like, key(2));
        let third = log.begin(MutationKind::Like, key(3));

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, key(2));
        assert_eq!(records[1].seq, third);
        assert_eq!(log.phase_of(key(1)), MutationPhase::Idle);
    }
}
