//! Per-finger trajectory history
//!
//! Keeps the last few positions of each finger in a fixed-capacity ring so a
//! long-running process never accumulates history, and derives the motion
//! statistics the phantom-tap filter relies on.

use serde::{Deserialize, Serialize};

/// Travel below this is too small to assign a meaningful direction
pub const MIN_DIRECTION_DISPLACEMENT: f32 = 1e-3;

/// Normalized 2D position on the touch surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Direction of travel from `self` to `other` in degrees, (-180, 180]
    pub fn direction_to(&self, other: Point) -> f32 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub position: Point,
    /// Driver timestamp, seconds
    pub timestamp: f64,
}

/// Motion between the oldest and newest sample of a ring
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSummary {
    /// Straight-line travel, normalized units
    pub displacement: f32,
    /// Average speed, normalized units per second (0 when no time elapsed)
    pub speed: f32,
    /// Direction of travel in degrees, `None` when the finger barely moved
    pub direction: Option<f32>,
}

/// Fixed-capacity ring of recent samples for one finger
#[derive(Debug, Clone)]
pub struct TrajectoryRing {
    samples: Vec<TrajectorySample>,
    capacity: usize,
    /// Index of the oldest sample once the ring has wrapped
    start: usize,
}

impl TrajectoryRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            start: 0,
        }
    }

    /// Append a sample, overwriting the oldest one when full
    pub fn push(&mut self, position: Point, timestamp: f64) {
        let sample = TrajectorySample {
            position,
            timestamp,
        };
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.start] = sample;
            self.start = (self.start + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<&TrajectorySample> {
        self.samples.get(self.start)
    }

    pub fn newest(&self) -> Option<&TrajectorySample> {
        if self.samples.is_empty() {
            return None;
        }
        let idx = (self.start + self.samples.len() - 1) % self.samples.len();
        self.samples.get(idx)
    }

    /// Samples in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &TrajectorySample> {
        self.samples[self.start..]
            .iter()
            .chain(self.samples[..self.start].iter())
    }

    pub fn summary(&self) -> MotionSummary {
        let (oldest, newest) = match (self.oldest(), self.newest()) {
            (Some(o), Some(n)) => (o, n),
            _ => return MotionSummary::default(),
        };

        let displacement = oldest.position.distance_to(newest.position);
        let elapsed = newest.timestamp - oldest.timestamp;
        let speed = if elapsed > 0.0 {
            (displacement as f64 / elapsed) as f32
        } else {
            0.0
        };
        let direction = (displacement > MIN_DIRECTION_DISPLACEMENT)
            .then(|| oldest.position.direction_to(newest.position));

        MotionSummary {
            displacement,
            speed,
            direction,
        }
    }
}

/// Largest distance between any two points (0 for fewer than two)
pub fn max_pairwise_distance(points: &[Point]) -> f32 {
    let mut max = 0.0f32;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            max = max.max(a.distance_to(*b));
        }
    }
    max
}

/// Largest angle (degrees, 0..=180) between any two directions
pub fn angular_spread(directions: &[f32]) -> f32 {
    let mut max = 0.0f32;
    for (i, a) in directions.iter().enumerate() {
        for b in &directions[i + 1..] {
            let diff = (a - b).rem_euclid(360.0);
            max = max.max(diff.min(360.0 - diff));
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_never_exceeds_capacity() {
        let mut ring = TrajectoryRing::new(7);
        for i in 0..50 {
            ring.push(Point::new(i as f32, 0.0), i as f64);
            assert!(ring.len() <= 7);
        }
        assert_eq!(ring.len(), 7);
        assert_eq!(ring.oldest().unwrap().timestamp, 43.0);
        assert_eq!(ring.newest().unwrap().timestamp, 49.0);

        let times: Vec<f64> = ring.iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![43.0, 44.0, 45.0, 46.0, 47.0, 48.0, 49.0]);
    }

    #[test]
    fn test_summary_speed_and_direction() {
        let mut ring = TrajectoryRing::new(7);
        ring.push(Point::new(0.2, 0.5), 0.0);
        ring.push(Point::new(0.3, 0.5), 0.05);
        ring.push(Point::new(0.4, 0.5), 0.1);

        let motion = ring.summary();
        assert!((motion.displacement - 0.2).abs() < 1e-5);
        assert!((motion.speed - 2.0).abs() < 1e-3);
        assert!(motion.direction.unwrap().abs() < 1e-3);
    }

    #[test]
    fn test_single_sample_is_stationary() {
        let mut ring = TrajectoryRing::new(3);
        assert_eq!(ring.summary(), MotionSummary::default());
        ring.push(Point::new(0.5, 0.5), 1.0);
        let motion = ring.summary();
        assert_eq!(motion.displacement, 0.0);
        assert_eq!(motion.speed, 0.0);
        assert!(motion.direction.is_none());
    }

    #[test]
    fn test_angular_spread_wraps() {
        assert!((angular_spread(&[170.0, -175.0]) - 15.0).abs() < 1e-3);
        assert!((angular_spread(&[0.0, 90.0, 45.0]) - 90.0).abs() < 1e-3);
        assert!((angular_spread(&[0.0, 180.0]) - 180.0).abs() < 1e-3);
        assert_eq!(angular_spread(&[30.0]), 0.0);
    }

    #[test]
    fn test_max_pairwise_distance() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(0.3, 0.4),
            Point::new(0.1, 0.0),
        ];
        assert!((max_pairwise_distance(&points) - 0.5).abs() < 1e-6);
        assert_eq!(max_pairwise_distance(&points[..1]), 0.0);
    }
}
