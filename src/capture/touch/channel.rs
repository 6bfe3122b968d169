use crate::capture::touch::source::{FrameSink, FrameSource, SourceClock};
use crate::capture::touch::types::TouchFrame;
use crate::config::{ClassifierConfig, EngineConfig};
use crate::engine::{GestureResult, InputChannel};
use crate::processing::gesture::GestureEvent;
use crate::processing::tap_classifier::{ClassifierState, ClassifierStats, TapClassifier};
use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Owns one tap classifier and feeds it from a frame source.
///
/// Frame processing (source thread) and the recovery tick (tick thread) are
/// serialized through a single mutex around the classifier. Gestures leave
/// through an unbounded queue so the source thread never waits on actions.
pub struct TrackpadChannel {
    id: String,
    engine: EngineConfig,
    classifier: Arc<ParkingMutex<TapClassifier>>,
    source: Arc<ParkingMutex<Box<dyn FrameSource>>>,
    gesture_tx: UnboundedSender<GestureEvent>,
    is_running: Arc<AtomicBool>,
    tick_handle: Arc<ParkingMutex<Option<std::thread::JoinHandle<()>>>>,
}

impl TrackpadChannel {
    pub fn new(
        classifier: ClassifierConfig,
        engine: EngineConfig,
        source: Box<dyn FrameSource>,
        gesture_tx: UnboundedSender<GestureEvent>,
    ) -> Self {
        Self {
            id: "trackpad".to_string(),
            engine,
            classifier: Arc::new(ParkingMutex::new(TapClassifier::new(classifier))),
            source: Arc::new(ParkingMutex::new(source)),
            gesture_tx,
            is_running: Arc::new(AtomicBool::new(false)),
            tick_handle: Arc::new(ParkingMutex::new(None)),
        }
    }

    pub fn stats(&self) -> ClassifierStats {
        self.classifier.lock().stats()
    }

    pub fn classifier_state(&self) -> ClassifierState {
        self.classifier.lock().state()
    }

    /// Reset the classifier without stopping the channel
    pub fn reset(&self) {
        self.classifier.lock().reset();
        tracing::info!("Trackpad classifier reset");
    }

    fn frame_sink(&self, clock: Arc<dyn SourceClock>) -> FrameSink {
        let is_running = self.is_running.clone();
        let classifier = self.classifier.clone();
        let gesture_tx = self.gesture_tx.clone();

        Arc::new(move |frame: TouchFrame| {
            if !is_running.load(Ordering::SeqCst) {
                return;
            }
            let detection = classifier.lock().process_frame(&frame, clock.now());
            if let Some(detection) = detection {
                let event = GestureEvent::from(detection);
                tracing::info!("Gesture {} ({})", event.gesture, event.source);
                if gesture_tx.send(event).is_err() {
                    tracing::warn!("Gesture receiver dropped; discarding {}", detection.gesture);
                }
            }
        })
    }

    /// Wake the tick thread and wait for it. The running flag must already be clear.
    fn join_tick_thread(&self) {
        if let Some(handle) = self.tick_handle.lock().take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }

    fn spawn_tick_thread(&self, clock: Arc<dyn SourceClock>) -> std::thread::JoinHandle<()> {
        let is_running = self.is_running.clone();
        let classifier = self.classifier.clone();
        let interval = self.engine.tick_interval();

        std::thread::spawn(move || {
            tracing::debug!("Trackpad recovery tick started (interval={:?})", interval);

            while is_running.load(Ordering::SeqCst) {
                // `stop` unparks us so shutdown does not wait out the interval
                std::thread::park_timeout(interval);
                if !is_running.load(Ordering::SeqCst) {
                    break;
                }
                if classifier.lock().tick(clock.now()) {
                    tracing::info!("Recovered trackpad classifier from a stuck episode");
                }
            }

            tracing::debug!("Trackpad recovery tick stopped");
        })
    }
}

#[async_trait]
impl InputChannel for TrackpadChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&mut self) -> GestureResult<()> {
        if self.is_running.load(Ordering::SeqCst) {
            tracing::debug!("Trackpad channel already running");
            return Ok(());
        }

        self.classifier.lock().reset();
        self.is_running.store(true, Ordering::SeqCst);

        let mut source = self.source.lock();
        let clock = source.clock();
        let sink = self.frame_sink(clock.clone());
        if let Err(e) = source.open(sink) {
            self.is_running.store(false, Ordering::SeqCst);
            tracing::error!("Failed to open frame source '{}': {}", source.name(), e);
            return Err(e);
        }
        let source_name = source.name().to_string();
        drop(source);

        *self.tick_handle.lock() = Some(self.spawn_tick_thread(clock));

        tracing::info!("Trackpad channel started (source={})", source_name);
        Ok(())
    }

    async fn stop(&mut self) -> GestureResult<()> {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.source.lock().close();

        self.join_tick_thread();

        // Waits for any frame still being classified
        let stats = {
            let mut classifier = self.classifier.lock();
            classifier.reset();
            classifier.stats()
        };

        tracing::info!(
            "Trackpad channel stopped (frames={}, rejected={}, taps={}, recoveries={})",
            stats.frames_processed,
            stats.frames_rejected,
            stats.taps_emitted,
            stats.forced_recoveries
        );
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl Drop for TrackpadChannel {
    fn drop(&mut self) {
        if self.is_running.swap(false, Ordering::SeqCst) {
            self.source.lock().close();
            self.join_tick_thread();
        }
    }
}
