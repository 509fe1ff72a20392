//! Typed records decoded from the remote services.
//!
//! - `EnkaData`, `PlayerDetail`, `CharacterDetail`: UID showcase snapshots
//! - `EnkaAccount`, `EnkaBuild`: accounts and saved builds on an Enka profile
//! - `Notice`: one game announcement
//!
//! The `Api*` types mirror the wire format and stay crate-private; each one
//! declares its [`Schema`](crate::decode::Schema) next to its serde model.

pub mod account;
pub mod enka;
pub mod notice;

pub use account::{EnkaAccount, EnkaBuild};
pub use enka::{CharacterDetail, EnkaData, EnkaOwner, PlayerDetail, ShowcaseEntry};
pub use notice::Notice;
