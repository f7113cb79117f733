//! cpal playback backend
//!
//! Each clip gets its own playback thread. The thread owns the cpal output
//! stream (streams are not `Send` on every platform), decodes the asset and
//! feeds stereo samples to the output callback through a lock-free ring
//! buffer. When the stream runs dry at the end of the file the thread fires
//! the clip's completion callback. A stream that fails mid-clip ends the clip
//! the same way instead of leaving the thread waiting on a buffer nobody
//! drains.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use super::backend::{AudioBackend, AudioMode, BackendError, Clip, OnFinish};
use super::decode::DecodedSource;

/// ~1 second of stereo audio at 48 kHz
const RING_BUFFER_SIZE: usize = 48000 * 2;

/// How long the decoder backs off when the ring buffer is full
const PACE: Duration = Duration::from_millis(5);

/// Grace period after the ring buffer drains, covering device latency
const DRAIN_TAIL: Duration = Duration::from_millis(60);

/// Find the preferred output device, or the host default
fn find_output_device(preferred: Option<&str>) -> Result<cpal::Device, BackendError> {
    let host = cpal::default_host();

    if let Some(name) = preferred {
        match host.output_devices() {
            Ok(devices) => {
                for device in devices {
                    if device.name().map(|n| n == name).unwrap_or(false) {
                        return Ok(device);
                    }
                }
                log::warn!("Output device {:?} not found, using default", name);
            }
            Err(e) => log::warn!("Failed to list output devices: {}", e),
        }
    }

    host.default_output_device()
        .ok_or(BackendError::NoOutputDevice)
}

/// Desktop audio backend built on cpal and symphonia
#[derive(Default)]
pub struct CpalBackend {
    mode: AudioMode,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for CpalBackend {
    fn configure(&mut self, mode: &AudioMode) -> Result<(), BackendError> {
        let device = find_output_device(mode.output_device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using output device: {}", device_name);

        // Desktop hosts have no silent switch, background policy or ducking
        log::debug!(
            "Audio mode: silent_mode={} background={} duck_others={}",
            mode.plays_in_silent_mode,
            mode.stays_active_in_background,
            mode.duck_others
        );

        self.mode = mode.clone();
        Ok(())
    }

    fn load(&mut self, asset: &Path) -> Result<Box<dyn Clip>, BackendError> {
        let source = DecodedSource::open(asset)?;
        Ok(Box::new(CpalClip {
            source: Some(source),
            mode: self.mode.clone(),
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }))
    }
}

/// A loaded clip. Plays once.
pub struct CpalClip {
    /// Taken by the playback thread on `play`
    source: Option<DecodedSource>,
    mode: AudioMode,
    is_running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl Clip for CpalClip {
    fn play(&mut self, on_finish: OnFinish) -> Result<(), BackendError> {
        let source = self
            .source
            .take()
            .ok_or_else(|| BackendError::Thread("clip was already played".to_string()))?;

        let (ready_tx, ready_rx) = mpsc::channel();
        let is_running = Arc::clone(&self.is_running);
        let mode = self.mode.clone();

        self.is_running.store(true, Ordering::Relaxed);

        let handle = thread::Builder::new()
            .name("meowboard-playback".to_string())
            .spawn(move || playback_thread(source, mode, is_running, ready_tx, on_finish))
            .map_err(|e| BackendError::Thread(e.to_string()))?;

        let ready = ready_rx.recv();
        self.thread_handle = Some(handle);

        match ready {
            Ok(result) => result,
            Err(_) => Err(BackendError::Thread(
                "playback thread exited before starting".to_string(),
            )),
        }
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.is_running.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn release(mut self: Box<Self>) -> Result<(), BackendError> {
        self.is_running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.thread_handle.take() {
            // Released from its own completion callback: the thread is
            // about to return, joining here would deadlock
            if handle.thread().id() == thread::current().id() {
                return Ok(());
            }
            handle
                .join()
                .map_err(|_| BackendError::Thread("playback thread panicked".to_string()))?;
        }

        Ok(())
    }
}

impl Drop for CpalClip {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
    }
}

/// Pick a stream config for the clip's sample rate, falling back to the
/// device default
fn output_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<(StreamConfig, SampleFormat), BackendError> {
    let matching = device.supported_output_configs().ok().and_then(|mut configs| {
        configs
            .find(|c| {
                c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate().0 <= sample_rate
                    && sample_rate <= c.max_sample_rate().0
            })
            .map(|c| c.with_sample_rate(cpal::SampleRate(sample_rate)))
    });

    let config = match matching {
        Some(c) => c,
        None => {
            let c = device
                .default_output_config()
                .map_err(|e| BackendError::Stream(e.to_string()))?;
            if c.sample_rate().0 != sample_rate {
                log::warn!(
                    "Device runs at {} Hz but clip is {} Hz, pitch will be off",
                    c.sample_rate().0,
                    sample_rate
                );
            }
            c
        }
    };

    Ok((config.config(), config.sample_format()))
}

/// Build and start the output stream draining `consumer`.
/// `failed` is raised when the stream reports an error.
fn open_output_stream(
    mode: &AudioMode,
    sample_rate: u32,
    consumer: HeapCons<f32>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream, BackendError> {
    let device = find_output_device(mode.output_device.as_deref())?;
    let (config, sample_format) = output_config(&device, sample_rate)?;

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, consumer, failed)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, consumer, failed)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, consumer, failed)?,
        format => {
            return Err(BackendError::Stream(format!(
                "Unsupported sample format: {:?}",
                format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| BackendError::Stream(e.to_string()))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<f32>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream, BackendError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let left = consumer.try_pop().unwrap_or(0.0);
                    let right = consumer.try_pop().unwrap_or(0.0);
                    write_frame(frame, left, right);
                }
            },
            move |err| {
                log::error!("Audio output error: {}", err);
                failed.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| BackendError::Stream(e.to_string()))
}

/// Write one stereo frame into a device frame of any width
fn write_frame<T>(frame: &mut [T], left: f32, right: f32)
where
    T: SizedSample + FromSample<f32>,
{
    match frame {
        [] => {}
        [mono] => *mono = T::from_sample((left + right) / 2.0),
        [l, r, rest @ ..] => {
            *l = T::from_sample(left);
            *r = T::from_sample(right);
            for ch in rest {
                *ch = T::EQUILIBRIUM;
            }
        }
    }
}

/// How a wait on the ring buffer ended
#[derive(Debug, Clone, Copy, PartialEq)]
enum Feed {
    /// All samples pushed, or the buffer drained
    Done,
    /// The clip was stopped
    Stopped,
    /// The output stream failed and stopped draining
    Failed,
}

/// Push whole L/R pairs of `chunk`, waiting while the buffer is full
fn push_chunk(
    producer: &mut HeapProd<f32>,
    chunk: &[f32],
    is_running: &AtomicBool,
    failed: &AtomicBool,
) -> Feed {
    let mut pending = chunk;
    while !pending.is_empty() {
        if !is_running.load(Ordering::Relaxed) {
            return Feed::Stopped;
        }
        if failed.load(Ordering::Relaxed) {
            return Feed::Failed;
        }
        let room = producer.vacant_len().min(pending.len()) & !1;
        let pushed = producer.push_slice(&pending[..room]);
        pending = &pending[pushed..];
        if !pending.is_empty() {
            thread::sleep(PACE);
        }
    }
    Feed::Done
}

/// Wait for the output callback to play out what is left in the buffer
fn wait_drained(producer: &HeapProd<f32>, is_running: &AtomicBool, failed: &AtomicBool) -> Feed {
    loop {
        if !is_running.load(Ordering::Relaxed) {
            return Feed::Stopped;
        }
        if failed.load(Ordering::Relaxed) {
            return Feed::Failed;
        }
        if producer.is_empty() {
            return Feed::Done;
        }
        thread::sleep(PACE);
    }
}

/// Playback thread function
fn playback_thread(
    mut source: DecodedSource,
    mode: AudioMode,
    is_running: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), BackendError>>,
    on_finish: OnFinish,
) {
    let (mut producer, consumer) = HeapRb::<f32>::new(RING_BUFFER_SIZE).split();
    let failed = Arc::new(AtomicBool::new(false));

    let stream = match open_output_stream(&mode, source.sample_rate, consumer, Arc::clone(&failed))
    {
        Ok(s) => s,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let volume = mode.volume.clamp(0.0, 1.0);

    let end = loop {
        if !is_running.load(Ordering::Relaxed) {
            break Feed::Stopped;
        }

        let mut chunk = match source.next_stereo() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break wait_drained(&producer, &is_running, &failed),
            Err(e) => {
                // Treat as the end of the clip so the session lets go of it
                log::error!("Playback error in {}: {}", source.name, e);
                break wait_drained(&producer, &is_running, &failed);
            }
        };

        for sample in chunk.iter_mut() {
            *sample *= volume;
        }

        match push_chunk(&mut producer, &chunk, &is_running, &failed) {
            Feed::Done => {}
            other => break other,
        }
    };

    if end == Feed::Done {
        thread::sleep(DRAIN_TAIL);
    }

    drop(stream);

    match end {
        Feed::Stopped => {}
        _ if !is_running.load(Ordering::Relaxed) => {}
        Feed::Done => {
            log::debug!("Reached end of {}", source.name);
            on_finish();
        }
        Feed::Failed => {
            log::warn!("Output stream failed, ending {} early", source.name);
            on_finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_frame_stereo() {
        let mut frame = [0.0_f32; 2];
        write_frame(&mut frame, 0.25, -0.5);
        assert_eq!(frame, [0.25, -0.5]);
    }

    #[test]
    fn test_write_frame_mono_downmix() {
        let mut frame = [0.0_f32; 1];
        write_frame(&mut frame, 0.5, 0.0);
        assert_eq!(frame, [0.25]);
    }

    #[test]
    fn test_write_frame_surround_silences_extra_channels() {
        let mut frame = [0.7_f32; 6];
        write_frame(&mut frame, 0.1, 0.2);
        assert_eq!(frame, [0.1, 0.2, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_write_frame_integer_format() {
        let mut frame = [0_i16; 2];
        write_frame(&mut frame, 0.0, 1.0);
        assert_eq!(frame[0], 0);
        assert!(frame[1] > 32000);
    }

    #[test]
    fn test_push_chunk_keeps_pairs_together() {
        let (mut producer, mut consumer) = HeapRb::<f32>::new(5).split();
        let running = AtomicBool::new(true);
        let failed = AtomicBool::new(false);

        // Only four of the five slots are used so frames never split
        let feeder = thread::spawn(move || {
            let result = push_chunk(&mut producer, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &running, &failed);
            (result, producer)
        });

        let mut received = Vec::new();
        while received.len() < 6 {
            match consumer.try_pop() {
                Some(sample) => received.push(sample),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        let (result, _producer) = feeder.join().unwrap();

        assert_eq!(result, Feed::Done);
        assert_eq!(received, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_push_chunk_gives_up_when_stream_fails() {
        // Nobody drains the buffer, as after a device error
        let (mut producer, _consumer) = HeapRb::<f32>::new(4).split();
        let running = AtomicBool::new(true);
        let failed = Arc::new(AtomicBool::new(false));

        let raise = Arc::clone(&failed);
        let fail_later = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            raise.store(true, Ordering::Relaxed);
        });

        let result = push_chunk(&mut producer, &[0.5; 16], &running, &failed);
        fail_later.join().unwrap();

        assert_eq!(result, Feed::Failed);
    }

    #[test]
    fn test_wait_drained_gives_up_when_stream_fails() {
        let (mut producer, _consumer) = HeapRb::<f32>::new(4).split();
        producer.push_slice(&[0.1, 0.2]);
        let running = AtomicBool::new(true);
        let failed = Arc::new(AtomicBool::new(false));

        let raise = Arc::clone(&failed);
        let fail_later = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            raise.store(true, Ordering::Relaxed);
        });

        assert_eq!(wait_drained(&producer, &running, &failed), Feed::Failed);
        fail_later.join().unwrap();
    }

    #[test]
    fn test_wait_drained_stop_wins_over_failure() {
        let (mut producer, _consumer) = HeapRb::<f32>::new(4).split();
        producer.push_slice(&[0.1, 0.2]);
        let running = AtomicBool::new(false);
        let failed = AtomicBool::new(true);

        assert_eq!(wait_drained(&producer, &running, &failed), Feed::Stopped);
    }

    #[test]
    fn test_wait_drained_empty_buffer() {
        let (producer, _consumer) = HeapRb::<f32>::new(4).split();
        let running = AtomicBool::new(true);
        let failed = AtomicBool::new(false);

        assert_eq!(wait_drained(&producer, &running, &failed), Feed::Done);
    }

    #[test]
    fn test_load_missing_asset() {
        let mut backend = CpalBackend::new();
        let result = backend.load(Path::new("missing/classic-meow.m4a"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
