//! Platform audio abstraction
//!
//! The session manager only talks to these traits. [`super::CpalBackend`]
//! is the real implementation; tests use an in-memory mock.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by an audio backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to open file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to probe audio format: {0}")]
    Probe(String),

    #[error("No audio tracks found")]
    NoTracks,

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Output stream error: {0}")]
    Stream(String),

    #[error("Playback thread error: {0}")]
    Thread(String),
}

/// Audio subsystem options, applied once before the first clip plays.
///
/// The platform flags are passed through as-is; backends that have no such
/// concept just record them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMode {
    pub plays_in_silent_mode: bool,
    pub stays_active_in_background: bool,
    pub duck_others: bool,
    /// Output gain, 0.0 - 1.0
    pub volume: f32,
    /// Preferred output device; `None` uses the host default
    pub output_device: Option<String>,
}

impl Default for AudioMode {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: true,
            stays_active_in_background: false,
            duck_others: true,
            volume: 1.0,
            output_device: None,
        }
    }
}

/// Called once when a clip plays through to its end
pub type OnFinish = Box<dyn FnOnce() + Send + 'static>;

/// The platform audio subsystem
pub trait AudioBackend: Send {
    /// One-time setup. Called again only if a previous attempt failed.
    fn configure(&mut self, mode: &AudioMode) -> Result<(), BackendError>;

    /// Load an asset into a playable clip
    fn load(&mut self, asset: &Path) -> Result<Box<dyn Clip>, BackendError>;
}

/// A loaded, playable audio resource
pub trait Clip: Send {
    /// Start playback. `on_finish` fires at most once, possibly from another
    /// thread, when the clip reaches its end. It does not fire after `stop`.
    fn play(&mut self, on_finish: OnFinish) -> Result<(), BackendError>;

    /// Halt playback
    fn stop(&mut self) -> Result<(), BackendError>;

    /// Free the resource
    fn release(self: Box<Self>) -> Result<(), BackendError>;
}
