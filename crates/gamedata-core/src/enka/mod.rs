//! Enka.Network showcase feed.
//!
//! `EnkaManager` serves UID showcase snapshots from a TTL cache, going to the
//! network only when no fresh snapshot exists, and announces every network
//! refresh with a `GET_NEW_ENKA_DATA` event. It also looks up the accounts
//! and saved builds linked to an Enka.Network profile.

pub mod manager;
pub mod uid;

pub use manager::{EnkaEvent, EnkaEventKind, EnkaManager, EnkaOptions};
pub use uid::validate_uid;
