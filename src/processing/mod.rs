//! Gesture recognition
//!
//! The tap classifier turns a stream of touch frames into tap gestures. The
//! trajectory helpers hold the short per-finger motion history it uses to tell
//! phantom taps from swipes.

pub mod gesture;
pub mod tap_classifier;
pub mod trajectory;

pub use gesture::{Gesture, GestureEvent, GestureSource, TapDetection};
pub use tap_classifier::{ClassifierState, ClassifierStats, TapClassifier};
pub use trajectory::{Point, TrajectoryRing};
