//! `feedctl`: command-line client for the BJJ training activity feed.
//!
//! Manages server contexts and drives the feed controller: list your own or
//! friends' activity, like, comment, change session visibility.

mod commands;
mod config;

use clap::{Args, Parser, Subcommand};

use bjjtrack_feed_client::{ActivityKind, VisibilityLevel};

use commands::feed::Selection;

/// Activity feed CLI.
#[derive(Parser, Debug)]
#[command(name = "feedctl", about = "BJJ training activity feed client")]
struct Cli {
    /// Path to client config file (default: ~/.bjjtrack/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

/// Which feed to load.
#[derive(Args, Debug, Clone, Copy)]
struct FeedArgs {
    /// Use friends' activity instead of your own.
    #[arg(long)]
    friends: bool,
    /// Lookback window in days (default from config).
    #[arg(long = "days")]
    days: Option<u32>,
}

impl From<FeedArgs> for Selection {
    fn from(args: FeedArgs) -> Self {
        Selection {
            friends: args.friends,
            days_back: args.days,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts.
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Show the activity feed.
    Feed {
        #[command(flatten)]
        feed: FeedArgs,
        /// Number of pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Like an activity.
    Like {
        /// Activity type: session, readiness or rest.
        kind: ActivityKind,
        id: i64,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Remove your like from an activity.
    Unlike {
        kind: ActivityKind,
        id: i64,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Delete a rest-day check-in.
    DeleteRest {
        /// Check-in ID.
        id: i64,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Change who can see a session.
    Visibility {
        /// Session ID.
        id: i64,
        /// private, attendance, summary or full.
        level: VisibilityLevel,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Comment on an activity.
    Comment {
        kind: ActivityKind,
        id: i64,
        /// Comment text.
        text: String,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Delete one of your comments.
    DeleteComment {
        kind: ActivityKind,
        id: i64,
        /// Comment ID.
        comment_id: i64,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create or update a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        /// Bearer token.
        #[arg(long)]
        token: Option<String>,
    },
    /// List all contexts.
    List,
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json_output = cli.output == "json";

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Set {
                name,
                server,
                token,
            } => {
                commands::context::set(&name, server.as_deref(), token.as_deref(), &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Feed { feed, pages } => {
            commands::feed::show(feed.into(), pages, json_output, &config_path).await?;
        }

        Commands::Like { kind, id, feed } => {
            commands::feed::like(feed.into(), kind, id, &config_path).await?;
        }

        Commands::Unlike { kind, id, feed } => {
            commands::feed::unlike(feed.into(), kind, id, &config_path).await?;
        }

        Commands::DeleteRest { id, feed } => {
            commands::feed::delete_rest(feed.into(), id, &config_path).await?;
        }

        Commands::Visibility { id, level, feed } => {
            commands::feed::visibility(feed.into(), id, level, &config_path).await?;
        }

        Commands::Comment {
            kind,
            id,
            text,
            feed,
        } => {
            commands::feed::comment(feed.into(), kind, id, &text, &config_path).await?;
        }

        Commands::DeleteComment {
            kind,
            id,
            comment_id,
            feed,
        } => {
            commands::feed::delete_comment(feed.into(), kind, id, comment_id, &config_path).await?;
        }

        Commands::Version => {
            println!("feedctl v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
