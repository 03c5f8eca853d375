//! Activity feed commands.
//!
//! Mutations only act on activities the controller has loaded, so every
//! command loads the feed first.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use bjjtrack_feed::{
    FeedController, FeedFilter, FeedState, FeedView, LoadOutcome, MutationOutcome, TracingNotifier,
};
use bjjtrack_feed_client::{
    ActivityKey, ActivityKind, FeedGateway, FeedItem, HttpGateway, NoAuth, StaticToken,
    TokenSource, VisibilityLevel,
};

use crate::config::ClientConfig;

/// Which feed to load before acting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub friends: bool,
    pub days_back: Option<u32>,
}

impl Selection {
    fn apply(&self, mut filter: FeedFilter) -> FeedFilter {
        if self.friends {
            filter.view = FeedView::Friends;
        }
        if let Some(days_back) = self.days_back {
            filter.days_back = days_back;
        }
        filter
    }
}

/// Build a controller for the current context.
fn connect(client_config_path: &Path) -> Result<FeedController> {
    let config = ClientConfig::load(client_config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `feedctl context set <name> --server <url>`."))?;
    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `feedctl context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }

    let token_source: Arc<dyn TokenSource> = if ctx.token.is_empty() {
        Arc::new(NoAuth)
    } else {
        Arc::new(StaticToken::new(ctx.token.clone()))
    };
    let gateway = match config.timeout() {
        Some(timeout) => HttpGateway::with_timeout(&ctx.server, token_source, timeout)?,
        None => HttpGateway::new(&ctx.server, token_source),
    };
    debug!(context = %ctx.name, server = %ctx.server, "connecting");

    let gateway: Arc<dyn FeedGateway> = Arc::new(gateway);
    Ok(FeedController::new(gateway, Arc::new(TracingNotifier), config.feed.clone()))
}

async fn open(selection: Selection, client_config_path: &Path) -> Result<FeedController> {
    let feed = connect(client_config_path)?;
    let filter = selection.apply(feed.snapshot().filter);
    match feed.load(filter).await {
        LoadOutcome::Committed => Ok(feed),
        _ => {
            let reason = feed.snapshot().error.unwrap_or_else(|| "no response".to_string());
            anyhow::bail!("Failed to load activity feed: {}", reason)
        }
    }
}

/// `feedctl feed`: print the feed, following up to `pages` pages.
pub async fn show(
    selection: Selection,
    pages: usize,
    output_json: bool,
    client_config_path: &Path,
) -> Result<()> {
    let feed = open(selection, client_config_path).await?;

    for _ in 1..pages.max(1) {
        if !feed.snapshot().has_more() {
            break;
        }
        if feed.handle_load_more().await == LoadOutcome::Failed {
            anyhow::bail!("Failed to load more activity.");
        }
    }

    let state = feed.snapshot();
    feed.teardown();

    if output_json {
        let page = state.page.unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print!("{}", render_table(&state));
    }
    Ok(())
}

pub async fn like(selection: Selection, kind: ActivityKind, id: i64, path: &Path) -> Result<()> {
    let feed = open(selection, path).await?;
    let outcome = feed.handle_like(kind, id).await;
    finish(&feed, "like", ActivityKey::new(kind, id), outcome)
}

pub async fn unlike(selection: Selection, kind: ActivityKind, id: i64, path: &Path) -> Result<()> {
    let feed = open(selection, path).await?;
    let outcome = feed.handle_unlike(kind, id).await;
    finish(&feed, "unlike", ActivityKey::new(kind, id), outcome)
}

pub async fn delete_rest(selection: Selection, checkin_id: i64, path: &Path) -> Result<()> {
    let feed = open(selection, path).await?;
    let outcome = feed.handle_delete_rest(checkin_id).await;
    finish(
        &feed,
        "delete rest day",
        ActivityKey::new(ActivityKind::Rest, checkin_id),
        outcome,
    )
}

pub async fn visibility(
    selection: Selection,
    session_id: i64,
    level: VisibilityLevel,
    path: &Path,
) -> Result<()> {
    let feed = open(selection, path).await?;
    let outcome = feed
        .handle_visibility_change(ActivityKind::Session, session_id, level)
        .await;
    finish(
        &feed,
        "change visibility",
        ActivityKey::new(ActivityKind::Session, session_id),
        outcome,
    )
}

pub async fn comment(
    selection: Selection,
    kind: ActivityKind,
    id: i64,
    text: &str,
    path: &Path,
) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Comment cannot be empty.");
    }
    let feed = open(selection, path).await?;
    let outcome = feed.handle_add_comment(kind, id, text).await;
    finish(&feed, "comment", ActivityKey::new(kind, id), outcome)
}

pub async fn delete_comment(
    selection: Selection,
    kind: ActivityKind,
    id: i64,
    comment_id: i64,
    path: &Path,
) -> Result<()> {
    let feed = open(selection, path).await?;
    let outcome = feed.handle_delete_comment(kind, id, comment_id).await;
    finish(&feed, "delete comment", ActivityKey::new(kind, id), outcome)
}

fn finish(feed: &FeedController, action: &str, key: ActivityKey, outcome: MutationOutcome) -> Result<()> {
    let state = feed.snapshot();
    feed.teardown();
    match outcome {
        MutationOutcome::Confirmed => {
            println!("{}: ok", action);
            if let Some(item) = state.page.as_ref().and_then(|page| page.find(key)) {
                print!("{}", render_table_rows(std::slice::from_ref(item)));
            }
            Ok(())
        }
        MutationOutcome::Reconciled => {
            anyhow::bail!("Server rejected {} on {}; feed reloaded.", action, key)
        }
        MutationOutcome::Rejected => anyhow::bail!("Server rejected {} on {}.", action, key),
        MutationOutcome::Skipped => {
            anyhow::bail!("Nothing to {}: {} is not in the loaded feed.", action, key)
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

const HEADER: &str = "TYPE        ID        DATE          LIKES  COMMENTS  VISIBILITY";

fn render_table(state: &FeedState) -> String {
    let Some(page) = state.page.as_ref() else {
        return "No activity.\n".to_string();
    };
    if page.items.is_empty() {
        return "No activity.\n".to_string();
    }
    let mut out = render_table_rows(&page.items);
    out.push_str(&format!("\n{} of {} shown\n", page.items.len(), page.total));
    out
}

fn render_table_rows(items: &[FeedItem]) -> String {
    let mut out = format!("{}\n", HEADER);
    for item in items {
        let liked = if item.has_liked { "*" } else { "" };
        let visibility = item
            .visibility()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<12}{:<10}{:<14}{:<7}{:<10}{}\n",
            item.kind.to_string(),
            item.id,
            item.date.as_deref().unwrap_or("-"),
            format!("{}{}", item.like_count, liked),
            item.comment_count,
            visibility,
        ));
    }
    out
}
