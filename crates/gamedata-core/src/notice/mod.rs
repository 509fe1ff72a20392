//! In-game announcement feed.
//!
//! `NoticeManager` pulls the announcement list and its detail content,
//! keeps the set of notices seen on the last successful update, and emits
//! `ADD_NOTICE` / `REMOVE_NOTICE` for the difference. Updates can be driven
//! by the caller or by a background refresh loop.

pub mod language;
pub mod manager;

pub use language::Language;
pub use manager::{
    validate_update_interval, NoticeEvent, NoticeEventKind, NoticeManager, NoticeOptions,
    NoticeUrlParams,
};
