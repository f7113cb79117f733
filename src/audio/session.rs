//! Playback session
//!
//! Owns at most one playing clip. Starting a new sound stops and releases
//! the previous one first; a clip that plays to its end releases itself.
//!
//! ## Completion notifications
//!
//! Clips report their natural end from the backend's playback thread. Every
//! play request gets a new generation number and the completion callback
//! carries the generation it was created for, so a late notification from a
//! clip that has since been replaced is ignored instead of clearing the new
//! clip.

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::backend::{AudioBackend, AudioMode, BackendError, Clip, OnFinish};
use super::catalog::Catalog;

/// Errors surfaced by [`PlaybackSession::play`]
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    #[error("Failed to play {filename}: {source}")]
    Playback {
        filename: String,
        #[source]
        source: BackendError,
    },
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Playing,
}

struct ActiveClip {
    generation: u64,
    filename: String,
    clip: Box<dyn Clip>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    /// Generation of the most recent play request
    generation: u64,
    active: Option<ActiveClip>,
    /// The current clip reported completion before it was registered
    finished_early: bool,
}

impl Inner {
    fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && self.state != SessionState::Idle
    }
}

/// State shared with completion callbacks and tickets
#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Shared {
    /// Natural end of the clip started by play request `generation`
    fn finish(&self, generation: u64) {
        let finished = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                log::trace!("Ignoring stale completion (generation {})", generation);
                return;
            }
            match inner.active.take() {
                Some(active) if active.generation == generation => {
                    inner.state = SessionState::Idle;
                    Some(active)
                }
                other => {
                    inner.active = other;
                    if inner.state == SessionState::Loading {
                        inner.finished_early = true;
                    }
                    None
                }
            }
        };

        if let Some(active) = finished {
            log::debug!("Finished playing {}", active.filename);
            release_clip(active.clip, &active.filename);
            self.changed.notify_all();
        }
    }
}

fn completion_callback(shared: Weak<Shared>, generation: u64) -> OnFinish {
    Box::new(move || {
        if let Some(shared) = shared.upgrade() {
            shared.finish(generation);
        }
    })
}

/// Release a clip, logging instead of returning failures
fn release_clip(clip: Box<dyn Clip>, filename: &str) {
    if let Err(e) = clip.release() {
        log::warn!("Failed to release {}: {}", filename, e);
    }
}

/// Handle to one play request.
///
/// Lets a caller wait for the sound to end. Dropping it has no effect on
/// playback.
pub struct PlaybackTicket {
    shared: Arc<Shared>,
    generation: u64,
}

impl PlaybackTicket {
    /// Whether this request's clip is still loading or playing
    pub fn is_current(&self) -> bool {
        self.shared.inner.lock().is_live(self.generation)
    }

    /// Block until the clip finishes, is stopped, or is replaced
    pub fn wait(&self) {
        let mut inner = self.shared.inner.lock();
        while inner.is_live(self.generation) {
            self.shared.changed.wait(&mut inner);
        }
    }

    /// Like [`wait`](Self::wait) with a timeout. Returns `true` if the clip
    /// is done.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock();
        while inner.is_live(self.generation) {
            if self
                .shared
                .changed
                .wait_until(&mut inner, deadline)
                .timed_out()
            {
                return !inner.is_live(self.generation);
            }
        }
        true
    }
}

/// One-at-a-time sound player
pub struct PlaybackSession {
    catalog: Arc<Catalog>,
    backend: Box<dyn AudioBackend>,
    mode: AudioMode,
    assets_dir: PathBuf,
    initialized: bool,
    shared: Arc<Shared>,
}

impl PlaybackSession {
    /// Create an idle session. The backend is configured lazily on the first
    /// play request.
    pub fn new(
        catalog: Arc<Catalog>,
        backend: Box<dyn AudioBackend>,
        mode: AudioMode,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            backend,
            mode,
            assets_dir: assets_dir.into(),
            initialized: false,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Play the catalog sound named `filename`, replacing whatever is playing.
    ///
    /// The catalog lookup happens before anything is torn down, so an
    /// unknown name leaves the current sound playing.
    pub fn play(&mut self, filename: &str) -> Result<PlaybackTicket, SessionError> {
        let (filename, asset) = match self.catalog.get(filename) {
            Some(entry) => (entry.filename.clone(), entry.asset_path(&self.assets_dir)),
            None => return Err(SessionError::UnknownSound(filename.to_string())),
        };

        self.ensure_configured()
            .map_err(|source| SessionError::Playback {
                filename: filename.clone(),
                source,
            })?;

        self.release_active();

        let generation = {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            inner.state = SessionState::Loading;
            inner.finished_early = false;
            inner.generation
        };
        // Wake tickets of the request we just replaced
        self.shared.changed.notify_all();

        log::debug!("Loading {} from {}", filename, asset.display());
        let mut clip = match self.backend.load(&asset) {
            Ok(clip) => clip,
            Err(source) => {
                log::error!("Failed to load {}: {}", filename, source);
                self.reset_to_idle(generation);
                return Err(SessionError::Playback { filename, source });
            }
        };

        let on_finish = completion_callback(Arc::downgrade(&self.shared), generation);
        if let Err(source) = clip.play(on_finish) {
            log::error!("Failed to start {}: {}", filename, source);
            release_clip(clip, &filename);
            self.reset_to_idle(generation);
            return Err(SessionError::Playback { filename, source });
        }

        let leftover = {
            let mut inner = self.shared.inner.lock();
            if inner.finished_early {
                inner.finished_early = false;
                inner.state = SessionState::Idle;
                Some(clip)
            } else {
                inner.state = SessionState::Playing;
                inner.active = Some(ActiveClip {
                    generation,
                    filename: filename.clone(),
                    clip,
                });
                None
            }
        };

        match leftover {
            Some(clip) => {
                log::debug!("{} finished before playback was registered", filename);
                release_clip(clip, &filename);
                self.shared.changed.notify_all();
            }
            None => log::info!("Playing {}", filename),
        }

        Ok(PlaybackTicket {
            shared: Arc::clone(&self.shared),
            generation,
        })
    }

    /// Stop and release the current sound. Does nothing if nothing plays.
    pub fn stop(&mut self) {
        if let Some(filename) = self.release_active() {
            log::info!("Stopped {}", filename);
        }
    }

    /// Whether a clip is currently active
    pub fn is_playing(&self) -> bool {
        self.shared.inner.lock().active.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Filename of the active clip
    pub fn now_playing(&self) -> Option<String> {
        self.shared
            .inner
            .lock()
            .active
            .as_ref()
            .map(|active| active.filename.clone())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Configure the backend once; a failed attempt is retried next time
    fn ensure_configured(&mut self) -> Result<(), BackendError> {
        if !self.initialized {
            self.backend.configure(&self.mode)?;
            self.initialized = true;
            log::debug!("Audio configured: {:?}", self.mode);
        }
        Ok(())
    }

    /// Take the active clip out of the session, stop it and release it.
    /// Failures are logged only. Returns the released clip's filename.
    fn release_active(&mut self) -> Option<String> {
        let active = {
            let mut inner = self.shared.inner.lock();
            let active = inner.active.take();
            if active.is_some() {
                inner.state = SessionState::Idle;
            }
            active
        };

        let ActiveClip {
            filename, mut clip, ..
        } = active?;

        if let Err(e) = clip.stop() {
            log::warn!("Failed to stop {}: {}", filename, e);
        }
        release_clip(clip, &filename);
        self.shared.changed.notify_all();
        Some(filename)
    }

    fn reset_to_idle(&self, generation: u64) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.generation == generation {
                inner.state = SessionState::Idle;
                inner.finished_early = false;
            }
        }
        self.shared.changed.notify_all();
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop();
    }
}
