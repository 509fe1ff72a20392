use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gamedata_core::{
    EnkaManager, FetchClient, Language, NoticeEvent, NoticeEventKind, NoticeManager,
    NoticeOptions, RequestOptions,
};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::output;

/// Default `notices --watch` refresh interval in seconds
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = concat!(
    "Environment variables:\n",
    "  GAMEDATA_ENKA_URL      Enka.Network base URL\n",
    "  GAMEDATA_NOTICE_URL    Announcement API base URL\n",
    "  GAMEDATA_LANGUAGE      Default announcement language\n",
    "  GAMEDATA_USER_AGENT    User-Agent header\n",
    "  RUST_LOG               Log filter (default: warn)\n\n",
    "Examples:",
    r"
  # Show a player's showcase
  $ gamedata showcase 800000000

  # Follow the announcement feed in Japanese
  $ gamedata notices --lang ja-jp --watch
"
))]
pub struct RootCommand {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, value_name = "PATH", env = "GAMEDATA_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    /// Show the public showcase of a UID
    Showcase { uid: u64 },
    /// List game accounts linked to an Enka.Network profile
    Accounts { username: String },
    /// List saved builds of one linked account
    Builds { username: String, hash: String },
    /// List current announcements
    Notices {
        /// Announcement language, e.g. en-us or ja-jp
        #[arg(long, value_name = "TAG")]
        lang: Option<Language>,

        /// Keep running and print notices as they are added or removed
        #[arg(long)]
        watch: bool,

        /// Refresh interval for --watch, in seconds (minimum 60)
        #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
        interval: u64,
    },
}

impl RootCommand {
    pub async fn run(self, config: Config) -> Result<()> {
        let client = FetchClient::new(config.client_config()?)
            .context("Failed to create HTTP client")?;
        let options = RequestOptions::new();

        match self.action {
            SubCommands::Showcase { uid } => {
                let enka = EnkaManager::new(client);
                let data = enka.fetch_all(uid, &options).await?;
                if self.json {
                    print_json(&*data)?;
                } else {
                    print!("{}", output::showcase(&data, Utc::now()));
                }
            }
            SubCommands::Accounts { username } => {
                let enka = EnkaManager::new(client);
                let accounts = enka.fetch_accounts(&username, &options).await?;
                if self.json {
                    print_json(&accounts)?;
                } else {
                    print!("{}", output::accounts(&accounts));
                }
            }
            SubCommands::Builds { username, hash } => {
                let enka = EnkaManager::new(client);
                let builds = enka.fetch_builds(&username, &hash, &options).await?;
                if self.json {
                    print_json(&builds)?;
                } else {
                    print!("{}", output::builds(&builds));
                }
            }
            SubCommands::Notices { lang, watch, interval } => {
                let update_interval = watch.then(|| Duration::from_secs(interval));
                let manager = NoticeManager::new(
                    client,
                    NoticeOptions {
                        language: lang,
                        update_interval,
                        ..NoticeOptions::default()
                    },
                )?;

                manager.update().await?;
                let notices = manager.notices();
                if self.json {
                    print_json(&notices)?;
                } else {
                    for notice in &notices {
                        println!("{}", output::notice_line(notice));
                    }
                }

                if watch {
                    watch_notices(Arc::new(manager)).await?;
                }
            }
        }
        Ok(())
    }
}

async fn watch_notices(manager: Arc<NoticeManager>) -> Result<()> {
    let print_change = |event: &NoticeEvent| {
        let marker = match event {
            NoticeEvent::AddNotice(_) => '+',
            NoticeEvent::RemoveNotice(_) => '-',
        };
        println!("{} {}", marker, output::notice_line(event.notice()));
    };
    manager.on(NoticeEventKind::AddNotice, print_change);
    manager.on(NoticeEventKind::RemoveNotice, print_change);

    let Some(handle) = Arc::clone(&manager).spawn_refresh() else {
        return Ok(());
    };
    info!(language = %manager.language(), "Watching notices");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.abort();
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
