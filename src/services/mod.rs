//! Interaction engines.
//!
//! Each engine validates against storage, performs its write, lets the ledger
//! catch counter drift and hands notifications to the [`Notifier`].

pub mod background;
pub mod comment;
pub mod fork;
pub mod notify;
pub mod toggle;
pub mod views;

pub use comment::{CommentEngine, REPLY_MESSAGE};
pub use fork::{ForkEngine, ForkOutcome};
pub use notify::{Dispatch, NotificationFeed, Notifier};
pub use toggle::{RelationStatus, ToggleEngine, ToggleOutcome};
pub use views::{origin_hash, Tracked, ViewTracker};
