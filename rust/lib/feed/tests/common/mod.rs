//! Scripted in-memory gateway and fixtures for controller tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::sync::oneshot;

use bjjtrack_feed::{FeedConfig, FeedController, Notice};
use bjjtrack_feed_client::{
    ApiError, Comment, FeedGateway, FeedItem, FeedPage, FeedQuery, LikeRequest, NewComment,
};

/// A request the gateway received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MyFeed(FeedQuery),
    FriendsFeed(FeedQuery),
    Like(LikeRequest),
    Unlike(LikeRequest),
    DeleteRest(i64),
    UpdateSession(i64, Value),
    AddComment(NewComment),
    DeleteComment(i64),
}

impl Call {
    pub fn is_feed(&self) -> bool {
        matches!(self, Call::MyFeed(_) | Call::FriendsFeed(_))
    }
}

pub type FeedReply = Result<FeedPage, ApiError>;

enum Reply {
    Ready(FeedReply),
    Gated(oneshot::Receiver<FeedReply>),
}

struct Scripted {
    /// Only answer queries with this lookback; `None` answers any.
    days_back: Option<u32>,
    reply: Reply,
}

/// Feed responses are consumed in order; mutation calls succeed unless
/// `fail_mutations(true)` was set or the activity was passed to `reject`.
#[derive(Default)]
pub struct ScriptedGateway {
    feeds: Mutex<VecDeque<Scripted>>,
    fail_mutations: AtomicBool,
    rejected: Mutex<HashSet<i64>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_page(&self, page: FeedPage) {
        self.push(None, Reply::Ready(Ok(page)));
    }

    pub fn push_error(&self) {
        self.push(None, Reply::Ready(Err(server_error())));
    }

    /// Next feed query with `days_back` waits until the sender fires.
    pub fn gate(&self, days_back: Option<u32>) -> oneshot::Sender<FeedReply> {
        let (tx, rx) = oneshot::channel();
        self.push(days_back, Reply::Gated(rx));
        tx
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Like/unlike calls on activity `id` fail.
    pub fn reject(&self, id: i64) {
        self.rejected.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn feed_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_feed).collect()
    }

    fn push(&self, days_back: Option<u32>, reply: Reply) {
        self.feeds.lock().unwrap().push_back(Scripted { days_back, reply });
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn next_feed(&self, query: &FeedQuery) -> FeedReply {
        let scripted = {
            let mut feeds = self.feeds.lock().unwrap();
            feeds
                .iter()
                .position(|s| s.days_back.is_none_or(|d| d == query.days_back))
                .and_then(|pos| feeds.remove(pos))
        };
        match scripted.map(|s| s.reply) {
            Some(Reply::Ready(reply)) => reply,
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Decode("gate dropped".into()))),
            None => Err(ApiError::Decode("no scripted feed response".into())),
        }
    }

    fn social_result(&self, req: &LikeRequest) -> Result<(), ApiError> {
        if self.rejected.lock().unwrap().contains(&req.activity_id) {
            return Err(server_error());
        }
        self.mutation_result()
    }

    fn mutation_result(&self) -> Result<(), ApiError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl FeedGateway for ScriptedGateway {
    async fn my_feed(&self, query: &FeedQuery) -> Result<FeedPage, ApiError> {
        self.record(Call::MyFeed(query.clone()));
        self.next_feed(query).await
    }

    async fn friends_feed(&self, query: &FeedQuery) -> Result<FeedPage, ApiError> {
        self.record(Call::FriendsFeed(query.clone()));
        self.next_feed(query).await
    }

    async fn like(&self, req: &LikeRequest) -> Result<(), ApiError> {
        self.record(Call::Like(req.clone()));
        self.social_result(req)
    }

    async fn unlike(&self, req: &LikeRequest) -> Result<(), ApiError> {
        self.record(Call::Unlike(req.clone()));
        self.social_result(req)
    }

    async fn delete_rest_checkin(&self, checkin_id: i64) -> Result<(), ApiError> {
        self.record(Call::DeleteRest(checkin_id));
        self.mutation_result()
    }

    async fn update_session(&self, session_id: i64, payload: &Value) -> Result<Value, ApiError> {
        self.record(Call::UpdateSession(session_id, payload.clone()));
        self.mutation_result().map(|_| payload.clone())
    }

    async fn add_comment(&self, req: &NewComment) -> Result<Comment, ApiError> {
        self.record(Call::AddComment(req.clone()));
        self.mutation_result().map(|_| Comment {
            id: 1,
            activity_type: req.activity_type,
            activity_id: req.activity_id,
            user_id: Some(5),
            comment: req.comment.clone(),
            created_at: None,
        })
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<(), ApiError> {
        self.record(Call::DeleteComment(comment_id));
        self.mutation_result()
    }
}

pub fn server_error() -> ApiError {
    ApiError::Server {
        status: 500,
        message: "internal error".into(),
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn session(id: i64, like_count: u32, has_liked: bool) -> FeedItem {
    serde_json::from_value(json!({
        "type": "session",
        "id": id,
        "date": "2026-10-01",
        "data": {
            "id": id,
            "class_type": "gi",
            "duration_mins": 90,
            "visibility_level": "full",
        },
        "has_liked": has_liked,
        "like_count": like_count,
    }))
    .unwrap()
}

pub fn rest(id: i64) -> FeedItem {
    serde_json::from_value(json!({
        "type": "rest",
        "id": id,
        "data": { "rest_type": "recovery" },
    }))
    .unwrap()
}

pub fn readiness(id: i64) -> FeedItem {
    serde_json::from_value(json!({
        "type": "readiness",
        "id": id,
        "data": { "sleep": 4, "stress": 2 },
    }))
    .unwrap()
}

pub fn page(items: Vec<FeedItem>, total: usize) -> FeedPage {
    FeedPage {
        limit: items.len(),
        items,
        total,
        offset: 0,
        server_has_more: None,
    }
}

/// Sessions with ids `from..to`, no likes.
pub fn sessions(from: i64, to: i64) -> Vec<FeedItem> {
    (from..to).map(|id| session(id, 0, false)).collect()
}

pub type Notices = Arc<Mutex<Vec<Notice>>>;

pub fn controller(gateway: &Arc<ScriptedGateway>) -> (FeedController, Notices) {
    let notices: Notices = Arc::default();
    let sink = {
        let notices = Arc::clone(&notices);
        move |n: Notice| notices.lock().unwrap().push(n)
    };
    let gateway: Arc<dyn FeedGateway> = gateway.clone();
    let feed = FeedController::new(gateway, Arc::new(sink), FeedConfig::default());
    (feed, notices)
}
