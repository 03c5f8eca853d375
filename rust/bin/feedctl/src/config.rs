//! Client-side configuration.
//!
//! Reads/writes `~/.bjjtrack/config.toml` (or `$BJJTRACK_HOME/config.toml`).
//! The `[feed]` table is handed to the controller as its `FeedConfig`:
//!
//! ```toml
//! current-context = "prod"
//! timeout_secs = 15
//!
//! [[contexts]]
//! name = "prod"
//! server = "https://api.example.com"
//! token = "..."
//!
//! [feed]
//! page_size = 50
//! days_back = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use bjjtrack_feed::FeedConfig;

/// A single context: one API server and its credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "prod").
    pub name: String,

    /// Server URL (e.g. "http://localhost:8080").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Bearer token obtained from the web app.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

/// Client configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the currently active context.
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    /// Per-request HTTP timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// List of configured contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,

    /// Feed controller settings.
    #[serde(default)]
    pub feed: FeedConfig,
}

impl ClientConfig {
    /// Default config file path: `$BJJTRACK_HOME/config.toml`, falling back
    /// to `~/.bjjtrack/config.toml`.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load and validate the config. A missing file is an empty config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        let config: ClientConfig =
            toml::from_str(&content).with_context(|| format!("parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config, creating its directory.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("write {}", path.display()))
    }

    /// Reject settings the feed controller cannot page with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.feed.initial_limit == 0 || self.feed.page_size == 0 {
            anyhow::bail!("[feed] initial_limit and page_size must be at least 1");
        }
        if self.timeout_secs == Some(0) {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Per-request timeout for the HTTP gateway.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The active context, if `current-context` names one.
    pub fn current(&self) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == self.current_context)
    }

    /// Context `name`, created empty if missing. The first context created
    /// becomes current.
    pub fn context_entry(&mut self, name: &str) -> &mut Context {
        if self.current_context.is_empty() {
            self.current_context = name.to_string();
        }
        let pos = match self.contexts.iter().position(|c| c.name == name) {
            Some(pos) => pos,
            None => {
                self.contexts.push(Context {
                    name: name.to_string(),
                    server: String::new(),
                    token: String::new(),
                });
                self.contexts.len() - 1
            }
        };
        &mut self.contexts[pos]
    }

    /// Remove context `name`, clearing `current-context` if it pointed there.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let pos = self.contexts.iter().position(|c| c.name == name)?;
        if self.current_context == name {
            self.current_context.clear();
        }
        Some(self.contexts.remove(pos))
    }
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("BJJTRACK_HOME") {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bjjtrack")
}
