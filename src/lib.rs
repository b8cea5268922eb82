//! snipsocial - interaction and notification core
//!
//! Likes, bookmarks and follows as toggles, forks with provenance, threaded
//! comments, view tracking and the notifications they fan out, kept
//! consistent with the denormalized counters shown next to every snippet and
//! profile.

pub mod config;
pub mod error;
pub mod facade;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::InteractionError;
pub use facade::{InteractionService, InteractionServiceBuilder};
pub use identity::Actor;
