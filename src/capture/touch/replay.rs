//! Frame source replaying a recorded trace
//!
//! Traces are JSON arrays of `TouchFrame`s. Frames are pushed from a dedicated
//! thread, like a driver callback, spaced by their recorded timestamps. The
//! source's clock follows trace time, so a trace classifies the same at any
//! replay speed.

use crate::capture::touch::source::{FrameSink, FrameSource, SourceClock};
use crate::capture::touch::types::TouchFrame;
use crate::engine::{GestureError, GestureResult};
use parking_lot::Mutex as ParkingMutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Completion = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy)]
struct TracePosition {
    /// Instant that trace offset zero maps to
    base: Instant,
    /// Trace offset of the last delivered frame
    offset: Duration,
    /// Wall time that frame was delivered
    marked_at: Instant,
}

/// Clock reading trace time instead of wall time.
///
/// While a frame is delivered it reads `base + (timestamp - first timestamp)`.
/// Between frames it advances at wall speed divided by the time scale, and not
/// at all when replaying as fast as possible.
#[derive(Debug)]
pub struct TraceClock {
    time_scale: f64,
    position: ParkingMutex<TracePosition>,
}

impl TraceClock {
    fn new(time_scale: f64) -> Self {
        let now = Instant::now();
        Self {
            time_scale,
            position: ParkingMutex::new(TracePosition {
                base: now,
                offset: Duration::ZERO,
                marked_at: now,
            }),
        }
    }

    fn restart(&self) {
        let now = Instant::now();
        *self.position.lock() = TracePosition {
            base: now,
            offset: Duration::ZERO,
            marked_at: now,
        };
    }

    /// Move to `offset` seconds into the trace. Never runs backwards.
    fn advance_to(&self, offset: f64) {
        let mut position = self.position.lock();
        if let Ok(offset) = Duration::try_from_secs_f64(offset) {
            position.offset = position.offset.max(offset);
        }
        position.marked_at = Instant::now();
    }
}

impl SourceClock for TraceClock {
    fn now(&self) -> Instant {
        let position = *self.position.lock();
        let between = if self.time_scale > 0.0 {
            Duration::try_from_secs_f64(position.marked_at.elapsed().as_secs_f64() / self.time_scale)
                .unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        let elapsed = position.offset.saturating_add(between);
        position.base.checked_add(elapsed).unwrap_or(position.base + position.offset)
    }
}

pub struct ReplaySource {
    frames: Arc<Vec<TouchFrame>>,
    /// 1.0 replays in real time, 0.0 as fast as possible
    time_scale: f64,
    clock: Arc<TraceClock>,
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    on_finished: Arc<ParkingMutex<Option<Completion>>>,
}

impl ReplaySource {
    pub fn new(frames: Vec<TouchFrame>, time_scale: f64) -> Self {
        let time_scale = if time_scale.is_finite() { time_scale.max(0.0) } else { 1.0 };
        Self {
            frames: Arc::new(frames),
            time_scale,
            clock: Arc::new(TraceClock::new(time_scale)),
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            on_finished: Arc::new(ParkingMutex::new(None)),
        }
    }

    /// Load a trace file
    pub fn from_path(path: &Path, time_scale: f64) -> GestureResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let frames: Vec<TouchFrame> = serde_json::from_str(&content)?;
        tracing::info!("Loaded {} frames from {:?}", frames.len(), path);
        Ok(Self::new(frames, time_scale))
    }

    /// Run `f` once the last frame has been delivered (or replay was stopped)
    pub fn on_finished(self, f: impl FnOnce() + Send + 'static) -> Self {
        *self.on_finished.lock() = Some(Box::new(f));
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn open(&mut self, sink: FrameSink) -> GestureResult<()> {
        if self.is_running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.frames.is_empty() {
            return Err(GestureError::DeviceNotFound(
                "Replay trace contains no frames".to_string(),
            ));
        }

        self.is_running.store(true, Ordering::SeqCst);
        self.clock.restart();

        let frames = self.frames.clone();
        let clock = self.clock.clone();
        let is_running = self.is_running.clone();
        let on_finished = self.on_finished.clone();
        let time_scale = self.time_scale;

        let handle = std::thread::spawn(move || {
            tracing::debug!("Replay started ({} frames, scale={})", frames.len(), time_scale);

            let first_ts = frames[0].timestamp;
            let mut previous_ts: Option<f64> = None;
            for frame in frames.iter() {
                if !is_running.load(Ordering::SeqCst) {
                    break;
                }
                if let Some(prev) = previous_ts {
                    let gap = (frame.timestamp - prev) * time_scale;
                    if gap.is_finite() && gap > 0.0 {
                        std::thread::sleep(Duration::from_secs_f64(gap));
                    }
                }
                previous_ts = Some(frame.timestamp);
                clock.advance_to(frame.timestamp - first_ts);
                sink(frame.clone());
            }

            is_running.store(false, Ordering::SeqCst);
            let done = on_finished.lock().take();
            if let Some(done) = done {
                done();
            }
            tracing::debug!("Replay thread stopped");
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn clock(&self) -> Arc<dyn SourceClock> {
        self.clock.clone()
    }

    fn close(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::touch::types::{FingerRecord, FingerState};
    use tempfile::TempDir;

    fn trace() -> Vec<TouchFrame> {
        vec![
            TouchFrame::new(0.0, vec![FingerRecord::new(1, FingerState::Down, 0.5, 0.5)]),
            TouchFrame::new(0.05, vec![FingerRecord::new(1, FingerState::Up, 0.5, 0.5)]),
        ]
    }

    #[test]
    fn test_replays_every_frame_in_order() {
        let received = Arc::new(ParkingMutex::new(Vec::new()));
        let sink_received = received.clone();
        let sink: FrameSink = Arc::new(move |frame: TouchFrame| {
            sink_received.lock().push(frame.timestamp);
        });

        let (tx, rx) = std::sync::mpsc::channel();
        let mut source = ReplaySource::new(trace(), 0.0).on_finished(move || {
            let _ = tx.send(());
        });
        source.open(sink).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        source.close();

        assert_eq!(*received.lock(), vec![0.0, 0.05]);
    }

    #[test]
    fn test_clock_reads_trace_time_at_full_speed() {
        let frames = vec![
            TouchFrame::new(10.0, Vec::new()),
            TouchFrame::new(12.5, Vec::new()),
        ];
        let readings = Arc::new(ParkingMutex::new(Vec::new()));

        let mut source = ReplaySource::new(frames, 0.0);
        let clock = source.clock();
        let sink_clock = clock.clone();
        let sink_readings = readings.clone();
        let sink: FrameSink = Arc::new(move |_: TouchFrame| {
            sink_readings.lock().push(sink_clock.now());
        });

        let (tx, rx) = std::sync::mpsc::channel();
        source = source.on_finished(move || {
            let _ = tx.send(());
        });
        source.open(sink).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        source.close();

        let readings = readings.lock();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1] - readings[0], Duration::from_millis(2500));
        // Nothing advances between frames when unscaled
        assert_eq!(clock.now(), readings[1]);
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let clock = TraceClock::new(0.0);
        clock.advance_to(2.0);
        let later = clock.now();
        clock.advance_to(1.0);
        assert_eq!(clock.now(), later);
        clock.advance_to(f64::NAN);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_empty_trace_fails_to_open() {
        let mut source = ReplaySource::new(Vec::new(), 1.0);
        let sink: FrameSink = Arc::new(|_: TouchFrame| {});
        assert!(matches!(source.open(sink), Err(GestureError::DeviceNotFound(_))));
        source.close();
    }

    #[test]
    fn test_load_trace_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.json");
        std::fs::write(
            &path,
            r#"[
                {"timestamp": 0.0, "fingerCount": 1, "fingers": [{"id": 1, "state": "down", "x": 0.5, "y": 0.5}]},
                {"timestamp": 0.05, "fingerCount": 0}
            ]"#,
        )
        .unwrap();

        let source = ReplaySource::from_path(&path, 1.0).unwrap();
        assert_eq!(source.frame_count(), 2);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ReplaySource::from_path(&path, 1.0),
            Err(GestureError::SerializationError(_))
        ));
    }
}
