//! Gesture outcomes handed to the action dispatcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of gestures the classifier can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    #[serde(rename = "tap-1")]
    TapOne,
    #[serde(rename = "tap-2")]
    TapTwo,
    #[serde(rename = "tap-3")]
    TapThree,
    #[serde(rename = "tap-4")]
    TapFour,
}

impl Gesture {
    pub const ALL: [Gesture; 4] = [
        Gesture::TapOne,
        Gesture::TapTwo,
        Gesture::TapThree,
        Gesture::TapFour,
    ];

    /// Tap gesture for `count` fingers, if one exists
    pub fn from_finger_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Gesture::TapOne),
            2 => Some(Gesture::TapTwo),
            3 => Some(Gesture::TapThree),
            4 => Some(Gesture::TapFour),
            _ => None,
        }
    }

    pub fn finger_count(self) -> usize {
        match self {
            Gesture::TapOne => 1,
            Gesture::TapTwo => 2,
            Gesture::TapThree => 3,
            Gesture::TapFour => 4,
        }
    }

    /// Name used by bindings (`"tap-1"` .. `"tap-4"`)
    pub fn name(self) -> &'static str {
        match self {
            Gesture::TapOne => "tap-1",
            Gesture::TapTwo => "tap-2",
            Gesture::TapThree => "tap-3",
            Gesture::TapFour => "tap-4",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gesture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.name() == s)
            .ok_or_else(|| format!("unknown gesture '{}'", s))
    }
}

/// Which detector produced a tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureSource {
    /// A full down..up episode was observed
    Episode,
    /// An up-only burst with no visible downs
    Phantom,
}

impl fmt::Display for GestureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureSource::Episode => write!(f, "episode"),
            GestureSource::Phantom => write!(f, "phantom"),
        }
    }
}

/// A classified tap, as returned by the classifier for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapDetection {
    pub gesture: Gesture,
    pub source: GestureSource,
}

/// Gesture event delivered to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    pub gesture: Gesture,
    pub fingers: usize,
    pub source: GestureSource,
    pub emitted_at: DateTime<Utc>,
}

impl From<TapDetection> for GestureEvent {
    fn from(detection: TapDetection) -> Self {
        Self {
            gesture: detection.gesture,
            fingers: detection.gesture.finger_count(),
            source: detection.source,
            emitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_count_mapping() {
        assert_eq!(Gesture::from_finger_count(0), None);
        assert_eq!(Gesture::from_finger_count(3), Some(Gesture::TapThree));
        assert_eq!(Gesture::from_finger_count(5), None);
        for g in Gesture::ALL {
            assert_eq!(Gesture::from_finger_count(g.finger_count()), Some(g));
        }
    }

    #[test]
    fn test_names_parse_back() {
        assert_eq!("tap-4".parse::<Gesture>(), Ok(Gesture::TapFour));
        assert!("swipe-left".parse::<Gesture>().is_err());
        assert_eq!(serde_json::to_string(&Gesture::TapTwo).unwrap(), "\"tap-2\"");
    }

    #[test]
    fn test_event_from_detection() {
        let event = GestureEvent::from(TapDetection {
            gesture: Gesture::TapThree,
            source: GestureSource::Phantom,
        });
        assert_eq!(event.fingers, 3);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"source\":\"phantom\""));
        assert!(json.contains("\"emittedAt\""));
    }
}
