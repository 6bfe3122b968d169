use hotkeymaster_lib::capture::touch::{
    FingerRecord, FingerState, ReplaySource, TouchFrame, TrackpadChannel,
};
use hotkeymaster_lib::config::{ClassifierConfig, Config, EngineConfig};
use hotkeymaster_lib::dispatch::{spawn_dispatcher, ActionRunner, BindingHandler};
use hotkeymaster_lib::engine::InputChannel;
use hotkeymaster_lib::processing::{ClassifierStats, Gesture, GestureEvent, GestureSource};
use parking_lot::Mutex as ParkingMutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

fn uniform(ts: f64, n: i32, state: FingerState) -> TouchFrame {
    TouchFrame::new(
        ts,
        (1..=n)
            .map(|id| FingerRecord::new(id, state, 0.4 + id as f32 * 0.015, 0.5))
            .collect(),
    )
}

/// Moves for fingers the classifier never saw go down, one direction per finger
fn unseen(ts: f64, state: FingerState, step: f32, directions: &[(f32, f32)]) -> TouchFrame {
    TouchFrame::new(
        ts,
        directions
            .iter()
            .enumerate()
            .map(|(i, &(dx, dy))| {
                FingerRecord::new(
                    i as i32 + 1,
                    state,
                    0.5 + i as f32 * 0.015 + dx * step,
                    0.5 + dy * step,
                )
            })
            .collect(),
    )
}

fn three_finger_tap(t: f64) -> Vec<TouchFrame> {
    vec![
        uniform(t, 3, FingerState::Down),
        uniform(t + 0.05, 3, FingerState::Move),
        uniform(t + 0.10, 3, FingerState::Up),
    ]
}

fn jitter_burst(t: f64) -> Vec<TouchFrame> {
    let jitter = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];
    let mut frames: Vec<TouchFrame> = (0..6)
        .map(|i| unseen(t + i as f64 * 0.01, FingerState::Move, (i % 2) as f32 * 0.004, &jitter))
        .collect();
    frames.push(unseen(t + 0.06, FingerState::Up, 0.004, &jitter));
    frames
}

fn swipe_burst(t: f64) -> Vec<TouchFrame> {
    let parallel = [(1.0, 0.02), (1.0, 0.0), (1.0, -0.02), (1.0, 0.01)];
    let mut frames: Vec<TouchFrame> = (0..6)
        .map(|i| unseen(t + i as f64 * 0.008, FingerState::Move, i as f32 * 0.012, &parallel))
        .collect();
    frames.push(unseen(t + 0.048, FingerState::Up, 0.072, &parallel));
    frames
}

fn write_trace(dir: &Path, frames: &[TouchFrame]) -> PathBuf {
    let path = dir.join("trace.json");
    std::fs::write(&path, serde_json::to_string_pretty(frames).unwrap()).unwrap();
    path
}

/// Replay a trace file as fast as possible and collect what the channel emits
async fn classify_trace(
    path: &Path,
    gesture_tx: mpsc::UnboundedSender<GestureEvent>,
) -> ClassifierStats {
    let (done_tx, done_rx) = oneshot::channel();
    let source = ReplaySource::from_path(path, 0.0)
        .unwrap()
        .on_finished(move || {
            let _ = done_tx.send(());
        });

    let mut channel = TrackpadChannel::new(
        ClassifierConfig::default(),
        EngineConfig::default(),
        Box::new(source),
        gesture_tx,
    );
    channel.start().await.unwrap();
    timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("replay did not finish")
        .unwrap();
    channel.stop().await.unwrap();
    channel.stats()
}

async fn drain(mut rx: mpsc::UnboundedReceiver<GestureEvent>) -> Vec<(Gesture, GestureSource)> {
    let mut out = Vec::new();
    while let Some(event) = rx.recv().await {
        out.push((event.gesture, event.source));
    }
    out
}

#[tokio::test]
async fn test_trace_yields_episode_and_phantom_taps() {
    let dir = TempDir::new().unwrap();
    let mut frames = three_finger_tap(0.0);
    frames.extend(jitter_burst(1.0));
    let path = write_trace(dir.path(), &frames);

    let (tx, rx) = mpsc::unbounded_channel();
    let stats = classify_trace(&path, tx).await;

    assert_eq!(
        drain(rx).await,
        vec![
            (Gesture::TapThree, GestureSource::Episode),
            (Gesture::TapFour, GestureSource::Phantom),
        ]
    );
    assert_eq!(stats.frames_processed, frames.len() as u64);
    assert_eq!(stats.phantom_taps_emitted, 1);
}

#[tokio::test]
async fn test_debounce_follows_trace_time_not_replay_speed() {
    let dir = TempDir::new().unwrap();
    let mut frames = jitter_burst(0.0);
    frames.extend(jitter_burst(2.0));
    let path = write_trace(dir.path(), &frames);

    let (tx, rx) = mpsc::unbounded_channel();
    let stats = classify_trace(&path, tx).await;

    assert_eq!(
        drain(rx).await,
        vec![
            (Gesture::TapFour, GestureSource::Phantom),
            (Gesture::TapFour, GestureSource::Phantom),
        ]
    );
    assert_eq!(stats.phantom_debounced, 0);
}

#[tokio::test]
async fn test_repeated_burst_inside_trace_window_is_debounced() {
    let dir = TempDir::new().unwrap();
    let mut frames = jitter_burst(0.0);
    frames.extend(jitter_burst(0.1));
    let path = write_trace(dir.path(), &frames);

    let (tx, rx) = mpsc::unbounded_channel();
    let stats = classify_trace(&path, tx).await;

    assert_eq!(drain(rx).await, vec![(Gesture::TapFour, GestureSource::Phantom)]);
    assert_eq!(stats.phantom_debounced, 1);
}

#[tokio::test]
async fn test_swipe_trace_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_trace(dir.path(), &swipe_burst(0.0));

    let (tx, rx) = mpsc::unbounded_channel();
    let stats = classify_trace(&path, tx).await;

    assert!(drain(rx).await.is_empty());
    assert_eq!(stats.phantom_rejected, 1);
}

#[tokio::test]
async fn test_malformed_frames_do_not_break_classification() {
    let dir = TempDir::new().unwrap();
    let mut frames = vec![TouchFrame {
        timestamp: 0.0,
        finger_count: 5,
        fingers: vec![FingerRecord::new(1, FingerState::Down, 0.5, 0.5)],
    }];
    frames.extend(three_finger_tap(0.1));
    let path = write_trace(dir.path(), &frames);

    let (tx, rx) = mpsc::unbounded_channel();
    let stats = classify_trace(&path, tx).await;

    assert_eq!(drain(rx).await, vec![(Gesture::TapThree, GestureSource::Episode)]);
    assert_eq!(stats.frames_rejected, 1);
}

#[derive(Default)]
struct RecordingRunner(ParkingMutex<Vec<String>>);

impl ActionRunner for RecordingRunner {
    fn run(&self, action: &str) {
        self.0.lock().push(action.to_string());
    }
}

#[tokio::test]
async fn test_configured_bindings_run_through_dispatcher() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        r#"{ "bindings": [
            { "gesture": "tap-3", "scope": { "kind": "global" }, "action": "open example.com" },
            { "gesture": "tap-4", "scope": { "kind": "global" }, "action": "run say four" }
        ] }"#,
    )
    .unwrap();
    let config = Config::load(&config_path).unwrap();

    let trace_path = write_trace(dir.path(), &three_finger_tap(0.0));
    let runner = Arc::new(RecordingRunner::default());
    let handler = Arc::new(BindingHandler::new(config.bindings.clone(), runner.clone()));

    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = spawn_dispatcher(rx, handler);
    classify_trace(&trace_path, tx).await;

    let handled = timeout(Duration::from_secs(5), dispatcher)
        .await
        .expect("dispatcher did not finish")
        .unwrap();
    assert_eq!(handled, 1);
    assert_eq!(*runner.0.lock(), vec!["open example.com"]);
}
