//! In-memory audio backend for tests
//!
//! Records every call and hands completion callbacks back to the test so it
//! can decide when (and from which thread) a clip "finishes".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::backend::{AudioBackend, AudioMode, BackendError, Clip, OnFinish};

#[derive(Default)]
pub struct MockState {
    pub configure_calls: usize,
    /// Loaded clips by file name, in order
    pub loaded: Vec<String>,
    /// Full asset paths passed to `load`
    pub paths: Vec<PathBuf>,
    pub stopped: Vec<String>,
    pub released: Vec<String>,
    pub fail_configure: bool,
    pub fail_load: bool,
    pub fail_play: bool,
    pub fail_stop: bool,
    pub fail_release: bool,
    /// Fire the completion callback from inside `play`
    pub finish_on_play: bool,
    live: Vec<u64>,
    finishers: Vec<(String, OnFinish)>,
    next_id: u64,
}

/// Shared handle to the mock's recorded state
#[derive(Clone, Default)]
pub struct MockAudio(Arc<Mutex<MockState>>);

impl MockAudio {
    pub fn backend(&self) -> Box<dyn AudioBackend> {
        Box::new(MockBackend {
            audio: self.clone(),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock()
    }

    /// Clips loaded and not yet released
    pub fn live_clips(&self) -> usize {
        self.0.lock().live.len()
    }

    /// Take the completion callback of the latest clip named `name`
    pub fn take_finisher(&self, name: &str) -> Option<OnFinish> {
        let mut state = self.0.lock();
        let index = state.finishers.iter().rposition(|(n, _)| n == name)?;
        Some(state.finishers.remove(index).1)
    }

    /// Make the latest clip named `name` reach its end
    pub fn finish(&self, name: &str) {
        // The lock must not be held while the callback runs
        if let Some(on_finish) = self.take_finisher(name) {
            on_finish();
        }
    }
}

struct MockBackend {
    audio: MockAudio,
}

impl AudioBackend for MockBackend {
    fn configure(&mut self, _mode: &AudioMode) -> Result<(), BackendError> {
        let mut state = self.audio.state();
        state.configure_calls += 1;
        if state.fail_configure {
            return Err(BackendError::NoOutputDevice);
        }
        Ok(())
    }

    fn load(&mut self, asset: &Path) -> Result<Box<dyn Clip>, BackendError> {
        let mut state = self.audio.state();
        if state.fail_load {
            return Err(BackendError::Probe("mock load failure".to_string()));
        }

        let name = asset
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let id = state.next_id;
        state.next_id += 1;
        state.loaded.push(name.clone());
        state.paths.push(asset.to_path_buf());
        state.live.push(id);

        Ok(Box::new(MockClip {
            id,
            name,
            audio: self.audio.clone(),
        }))
    }
}

struct MockClip {
    id: u64,
    name: String,
    audio: MockAudio,
}

impl Clip for MockClip {
    fn play(&mut self, on_finish: OnFinish) -> Result<(), BackendError> {
        let finish_now = {
            let mut state = self.audio.state();
            if state.fail_play {
                return Err(BackendError::Stream("mock play failure".to_string()));
            }
            if state.finish_on_play {
                Some(on_finish)
            } else {
                state.finishers.push((self.name.clone(), on_finish));
                None
            }
        };

        if let Some(on_finish) = finish_now {
            on_finish();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        let mut state = self.audio.state();
        state.stopped.push(self.name.clone());
        if state.fail_stop {
            return Err(BackendError::Stream("mock stop failure".to_string()));
        }
        Ok(())
    }

    fn release(self: Box<Self>) -> Result<(), BackendError> {
        let mut state = self.audio.state();
        state.released.push(self.name.clone());
        state.live.retain(|&id| id != self.id);
        if state.fail_release {
            return Err(BackendError::Thread("mock release failure".to_string()));
        }
        Ok(())
    }
}
