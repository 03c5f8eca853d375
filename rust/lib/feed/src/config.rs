//! Controller configuration and feed filter inputs.

use serde::{Deserialize, Serialize};

use bjjtrack_feed_client::FeedQuery;

/// Whose activity the feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedView {
    /// The viewer's own activity.
    #[default]
    My,
    /// Activity of the viewer's friends.
    Friends,
}

/// Inputs that select a feed. Changing either triggers a full reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilter {
    pub view: FeedView,
    pub days_back: u32,
}

impl FeedFilter {
    pub fn new(view: FeedView, days_back: u32) -> Self {
        Self { view, days_back }
    }

    /// Build the query for one page. Only the own-feed asks for social
    /// enrichment.
    pub fn query(&self, limit: usize, offset: usize) -> FeedQuery {
        FeedQuery {
            limit,
            offset,
            days_back: self.days_back,
            enrich_social: match self.view {
                FeedView::My => Some(true),
                FeedView::Friends => None,
            },
        }
    }
}

impl Default for FeedFilter {
    fn default() -> Self {
        FeedConfig::default().filter()
    }
}

/// Feed controller settings. Stored as the `[feed]` table of the CLI config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Page size of a full (re)load.
    pub initial_limit: usize,
    /// Page size of each "load more".
    pub page_size: usize,
    /// Default lookback window in days.
    pub days_back: u32,
    /// Default view.
    pub view: FeedView,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            initial_limit: 100,
            page_size: 50,
            days_back: 30,
            view: FeedView::My,
        }
    }
}

impl FeedConfig {
    pub fn filter(&self) -> FeedFilter {
        FeedFilter::new(self.view, self.days_back)
    }
}
