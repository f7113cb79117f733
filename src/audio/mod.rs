//! Audio module - the sound catalog and one-at-a-time playback
//!
//! This module provides:
//! - The immutable sound catalog
//! - The platform audio backend traits and the cpal/symphonia implementation
//! - The playback session that keeps at most one clip playing

mod backend;
mod catalog;
mod decode;
#[cfg(test)]
pub(crate) mod mock;
mod output;
mod session;

pub use backend::{AudioBackend, AudioMode, BackendError, Clip, OnFinish};
pub use catalog::{Catalog, CatalogError, SoundEntry};
pub use output::CpalBackend;
pub use session::{PlaybackSession, PlaybackTicket, SessionError, SessionState};
