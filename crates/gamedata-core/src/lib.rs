//! Client library for game-data web services.
//!
//! Two feeds are provided:
//!
//! - [`EnkaManager`]: player showcase snapshots from Enka.Network, served from
//!   a TTL cache and refreshed only when the server-declared TTL has passed.
//! - [`NoticeManager`]: the in-game announcement list, synchronized on
//!   demand or on an interval, with added/removed notices reported as events.
//!
//! Both go through a shared [`FetchClient`], which merges per-call
//! [`RequestOptions`] over the configured defaults and maps failures into
//! [`Error`]. Payloads are checked against a declared schema before they
//! become typed records, so a malformed response never reaches the caches.
//!
//! # Example
//!
//! ```no_run
//! use gamedata_core::{ClientConfig, EnkaManager, FetchClient, RequestOptions};
//!
//! # async fn run() -> gamedata_core::Result<()> {
//! let client = FetchClient::new(ClientConfig::default())?;
//! let enka = EnkaManager::new(client);
//! let data = enka.fetch_all(800000000, &RequestOptions::new()).await?;
//! println!("{} (AR {})", data.player.nickname, data.player.level);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod assets;
pub mod cache;
pub mod clock;
pub mod config;
pub mod decode;
pub mod enka;
pub mod error;
pub mod models;
pub mod notice;
pub mod sync;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use api::{FetchClient, RequestOptions, Transport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use enka::{EnkaEvent, EnkaEventKind, EnkaManager, EnkaOptions};
pub use error::{
    ContentNotFoundError, Error, ManagerError, NetworkError, Result, Service, ValidationError,
};
pub use models::{EnkaAccount, EnkaBuild, EnkaData, Notice};
pub use notice::{Language, NoticeEvent, NoticeEventKind, NoticeManager, NoticeOptions};
pub use sync::{ChangeSet, ListenerId};
