//! Real-time multi-finger tap classifier
//!
//! Consumes touch frames one at a time and decides, when a touch episode ends,
//! whether it was an intentional N-finger tap. Two detectors share one emitter:
//!
//! - the episode path follows every finger from `Down` to `Up` and classifies
//!   the completed episode by duration and per-finger travel;
//! - the phantom path handles up-only bursts where the driver never showed the
//!   downs (fast taps, and OS navigation swipes that look like taps). Only
//!   trajectory history, finger synchrony and speed separate those two.
//!
//! The classifier is a plain owned state machine. Callers serialize access
//! (see `TrackpadChannel`) and supply the current time from the frame source's
//! clock, which keeps every decision reproducible in tests and on replay.

use crate::capture::touch::types::{FingerState, TouchFrame};
use crate::config::ClassifierConfig;
use crate::engine::{GestureError, GestureResult};
use crate::processing::gesture::{Gesture, GestureSource, TapDetection};
use crate::processing::trajectory::{angular_spread, max_pairwise_distance, Point, TrajectoryRing};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

/// Coarse classifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassifierState {
    Idle,
    EpisodeActive,
}

/// Running counters, mostly for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStats {
    pub frames_processed: u64,
    pub frames_rejected: u64,
    pub episodes_completed: u64,
    pub taps_emitted: u64,
    pub phantom_taps_emitted: u64,
    pub phantom_rejected: u64,
    pub phantom_debounced: u64,
    pub forced_recoveries: u64,
}

/// One finger taking part in the current episode
#[derive(Debug, Clone, Copy)]
struct TrackedFinger {
    down_position: Point,
    max_displacement: f32,
    released: bool,
}

impl TrackedFinger {
    fn observe(&mut self, position: Point) {
        let distance = self.down_position.distance_to(position);
        if distance > self.max_displacement {
            self.max_displacement = distance;
        }
    }
}

#[derive(Debug, Default)]
struct Episode {
    start_time: Option<f64>,
    fingers: HashMap<i32, TrackedFinger>,
    last_activity: Option<Instant>,
}

impl Episode {
    fn is_idle(&self) -> bool {
        self.fingers.is_empty()
    }

    fn all_released(&self) -> bool {
        self.fingers.values().all(|f| f.released)
    }

    fn max_displacement(&self) -> f32 {
        self.fingers
            .values()
            .map(|f| f.max_displacement)
            .fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, Copy)]
struct LastEmission {
    finger_count: usize,
    at: Instant,
}

/// Why an up-only burst was judged to be a swipe
#[derive(Debug, Clone, Copy, PartialEq)]
enum PhantomRejection {
    Spread(f32),
    Travel(f32),
    Synchronized(f32),
    Speed(f32),
}

impl fmt::Display for PhantomRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhantomRejection::Spread(d) => write!(f, "finger spread {:.3}", d),
            PhantomRejection::Travel(d) => write!(f, "finger travel {:.3}", d),
            PhantomRejection::Synchronized(a) => write!(f, "directions within {:.1} degrees", a),
            PhantomRejection::Speed(v) => write!(f, "finger speed {:.2}/s", v),
        }
    }
}

pub struct TapClassifier {
    config: ClassifierConfig,
    episode: Episode,
    /// Fingers reported `Down`/`Move` in the previous frame, at their last position
    previous_active: HashMap<i32, Point>,
    history: HashMap<i32, TrajectoryRing>,
    last_emission: Option<LastEmission>,
    stats: ClassifierStats,
}

impl TapClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("Classifier running with questionable config: {}", e);
        }
        Self {
            config,
            episode: Episode::default(),
            previous_active: HashMap::new(),
            history: HashMap::new(),
            last_emission: None,
            stats: ClassifierStats::default(),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn state(&self) -> ClassifierState {
        if self.episode.is_idle() {
            ClassifierState::Idle
        } else {
            ClassifierState::EpisodeActive
        }
    }

    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    /// Drop every piece of tracked state, including debounce memory
    pub fn reset(&mut self) {
        self.reset_episode();
        self.previous_active.clear();
        self.history.clear();
        self.last_emission = None;
    }

    fn reset_episode(&mut self) {
        self.episode = Episode::default();
    }

    /// Feed one frame. Returns the tap completed by this frame, if any.
    ///
    /// Malformed frames are logged and discarded; they never disturb state.
    pub fn process_frame(&mut self, frame: &TouchFrame, now: Instant) -> Option<TapDetection> {
        if let Err(e) = validate_frame(frame) {
            self.stats.frames_rejected += 1;
            tracing::warn!("Discarding touch frame at t={:.3}: {}", frame.timestamp, e);
            return None;
        }
        self.stats.frames_processed += 1;

        let was_idle = self.episode.is_idle();

        self.record_history(frame);
        self.apply_records(frame, now);
        self.apply_synthetic_releases(frame, now);

        let detection = if let Some(detection) = self.check_completion(frame) {
            Some(detection)
        } else if was_idle {
            self.check_phantom(frame, now)
        } else {
            None
        };

        self.prune_history(frame);

        if let Some(detection) = detection {
            self.last_emission = Some(LastEmission {
                finger_count: detection.gesture.finger_count(),
                at: now,
            });
            self.stats.taps_emitted += 1;
            tracing::debug!("Tap detected: {} ({})", detection.gesture, detection.source);
        }
        detection
    }

    /// Periodic stuck-episode check. Returns true if the episode was discarded.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.episode.is_idle() {
            return false;
        }
        let Some(last_activity) = self.episode.last_activity else {
            return false;
        };

        let idle_for = now.saturating_duration_since(last_activity);
        if idle_for <= self.config.stuck_episode_timeout() {
            return false;
        }

        tracing::warn!(
            "Forcing classifier reset: episode with {} finger(s) idle for {:?}",
            self.episode.fingers.len(),
            idle_for
        );
        self.stats.forced_recoveries += 1;
        self.reset();
        true
    }

    fn record_history(&mut self, frame: &TouchFrame) {
        let window = self.config.phantom_trajectory_window;
        for finger in &frame.fingers {
            self.history
                .entry(finger.id)
                .or_insert_with(|| TrajectoryRing::new(window))
                .push(finger.position(), frame.timestamp);
        }
    }

    fn apply_records(&mut self, frame: &TouchFrame, now: Instant) {
        for finger in &frame.fingers {
            let position = finger.position();
            match finger.state {
                FingerState::Down => {
                    if self.episode.fingers.contains_key(&finger.id) {
                        continue;
                    }
                    self.episode.fingers.insert(
                        finger.id,
                        TrackedFinger {
                            down_position: position,
                            max_displacement: 0.0,
                            released: false,
                        },
                    );
                    self.episode.start_time.get_or_insert(frame.timestamp);
                    self.episode.last_activity = Some(now);
                }
                FingerState::Move => {
                    if let Some(tracked) = self.episode.fingers.get_mut(&finger.id) {
                        tracked.observe(position);
                        self.episode.last_activity = Some(now);
                    }
                }
                FingerState::Up => {
                    if let Some(tracked) = self.episode.fingers.get_mut(&finger.id) {
                        if tracked.released {
                            continue;
                        }
                        tracked.observe(position);
                        tracked.released = true;
                        self.episode.last_activity = Some(now);
                    }
                }
            }
        }
    }

    /// Fingers the driver stopped reporting without an `Up`
    fn apply_synthetic_releases(&mut self, frame: &TouchFrame, now: Instant) {
        let present: HashSet<i32> = frame.fingers.iter().map(|f| f.id).collect();

        for (id, last_position) in &self.previous_active {
            if present.contains(id) {
                continue;
            }
            if let Some(tracked) = self.episode.fingers.get_mut(id) {
                if !tracked.released {
                    tracked.observe(*last_position);
                    tracked.released = true;
                    self.episode.last_activity = Some(now);
                    tracing::debug!("Synthetic release for finger {}", id);
                }
            }
        }

        self.previous_active = frame
            .fingers
            .iter()
            .filter(|f| f.state.is_active())
            .map(|f| (f.id, f.position()))
            .collect();
    }

    fn check_completion(&mut self, frame: &TouchFrame) -> Option<TapDetection> {
        if self.episode.is_idle() || !self.episode.all_released() || frame.has_active() {
            return None;
        }

        let start = self.episode.start_time.unwrap_or(frame.timestamp);
        let duration = frame.timestamp - start;
        let finger_count = self.episode.fingers.len();
        let max_displacement = self.episode.max_displacement();
        self.stats.episodes_completed += 1;
        self.reset_episode();

        let is_tap = duration <= self.config.max_tap_duration_secs
            && max_displacement <= self.config.max_tap_displacement;

        tracing::debug!(
            "Episode complete: fingers={} duration={:.3}s max_displacement={:.3} tap={}",
            finger_count,
            duration,
            max_displacement,
            is_tap
        );

        if !is_tap {
            return None;
        }
        Gesture::from_finger_count(finger_count).map(|gesture| TapDetection {
            gesture,
            source: GestureSource::Episode,
        })
    }

    fn check_phantom(&mut self, frame: &TouchFrame, now: Instant) -> Option<TapDetection> {
        if !frame.is_all_up() {
            return None;
        }
        let count = frame.fingers.len();
        if count != 3 && count != 4 {
            return None;
        }

        if let Some(reason) = self.phantom_rejection(frame) {
            self.stats.phantom_rejected += 1;
            tracing::debug!("Up-only burst of {} fingers treated as swipe: {}", count, reason);
            return None;
        }

        if let Some(last) = self.last_emission {
            if last.finger_count == count
                && now.saturating_duration_since(last.at) < self.config.phantom_debounce()
            {
                self.stats.phantom_debounced += 1;
                tracing::debug!("Suppressing repeated {}-finger phantom tap", count);
                return None;
            }
        }

        self.stats.phantom_taps_emitted += 1;
        Gesture::from_finger_count(count).map(|gesture| TapDetection {
            gesture,
            source: GestureSource::Phantom,
        })
    }

    fn phantom_rejection(&self, frame: &TouchFrame) -> Option<PhantomRejection> {
        let strict = self.config.phantom_strict_displacement;

        let positions: Vec<Point> = frame.fingers.iter().map(|f| f.position()).collect();
        let spread = max_pairwise_distance(&positions);
        if spread > strict {
            return Some(PhantomRejection::Spread(spread));
        }

        let motions: Vec<_> = frame
            .fingers
            .iter()
            .map(|f| self.history.get(&f.id).map(|h| h.summary()).unwrap_or_default())
            .collect();

        if let Some(m) = motions.iter().find(|m| m.displacement > strict) {
            return Some(PhantomRejection::Travel(m.displacement));
        }

        // Only meaningful when every finger has a direction of travel
        let directions: Option<Vec<f32>> = motions.iter().map(|m| m.direction).collect();
        if let Some(directions) = directions {
            let spread = angular_spread(&directions);
            if spread <= self.config.phantom_sync_angle_deg {
                return Some(PhantomRejection::Synchronized(spread));
            }
        }

        if let Some(m) = motions.iter().find(|m| m.speed > self.config.phantom_max_speed) {
            return Some(PhantomRejection::Speed(m.speed));
        }

        None
    }

    /// Forget history of fingers that lifted or vanished this frame
    fn prune_history(&mut self, frame: &TouchFrame) {
        let active: HashSet<i32> = frame
            .fingers
            .iter()
            .filter(|f| f.state.is_active())
            .map(|f| f.id)
            .collect();
        self.history.retain(|id, _| active.contains(id));
    }
}

fn validate_frame(frame: &TouchFrame) -> GestureResult<()> {
    if frame.finger_count < 0 {
        return Err(GestureError::MalformedFrame(format!(
            "negative finger count {}",
            frame.finger_count
        )));
    }
    if frame.finger_count as usize != frame.fingers.len() {
        return Err(GestureError::MalformedFrame(format!(
            "finger count {} does not match {} record(s)",
            frame.finger_count,
            frame.fingers.len()
        )));
    }
    if !frame.timestamp.is_finite() {
        return Err(GestureError::MalformedFrame(
            "non-finite timestamp".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(frame.fingers.len());
    for finger in &frame.fingers {
        if !finger.x.is_finite() || !finger.y.is_finite() {
            return Err(GestureError::MalformedFrame(format!(
                "finger {} has a non-finite position",
                finger.id
            )));
        }
        if !seen.insert(finger.id) {
            return Err(GestureError::MalformedFrame(format!(
                "finger {} reported twice",
                finger.id
            )));
        }
    }
    Ok(())
}
