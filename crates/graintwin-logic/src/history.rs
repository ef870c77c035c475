//! Rolling log of past readings for trend charts.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentState;

/// Default number of points kept (30 ticks = 30 seconds at the nominal rate).
pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

/// Immutable snapshot of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Wall-clock label, `HH:MM:SS` UTC.
    pub time: String,
    pub temp1: f64,
    pub temp2: f64,
    pub temp3: f64,
    pub humidity: f64,
    pub pest_count: u32,
}

impl HistoryPoint {
    pub fn from_state(state: &EnvironmentState) -> Self {
        Self {
            time: format_time_label(state.last_updated),
            temp1: state.temperatures[0],
            temp2: state.temperatures[1],
            temp3: state.temperatures[2],
            humidity: state.humidity,
            pest_count: state.pest_count,
        }
    }
}

/// Format milliseconds since the epoch as `HH:MM:SS` (UTC).
pub fn format_time_label(epoch_millis: u64) -> String {
    let secs_of_day = (epoch_millis / 1000) % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs_of_day / 3600,
        (secs_of_day / 60) % 60,
        secs_of_day % 60
    )
}

/// Fixed-capacity FIFO of [`HistoryPoint`]s, oldest first.
///
/// Deserialization goes through [`HistoryBuffer::new`] and
/// [`push`](HistoryBuffer::push), so a decoded buffer obeys the same
/// capacity as one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredHistory")]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

#[derive(Deserialize)]
struct StoredHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl From<StoredHistory> for HistoryBuffer {
    fn from(stored: StoredHistory) -> Self {
        let mut history = HistoryBuffer::new(stored.capacity);
        for point in stored.points {
            history.push(point);
        }
        history
    }
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a point, evicting the oldest once over capacity.
    pub fn push(&mut self, point: HistoryPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    pub fn oldest(&self) -> Option<&HistoryPoint> {
        self.points.front()
    }

    /// Temperature series for probe `sensor` (0 = bottom), oldest first.
    pub fn temperature_series(&self, sensor: usize) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| match sensor {
                0 => p.temp1,
                1 => p.temp2,
                _ => p.temp3,
            })
            .collect()
    }

    pub fn humidity_series(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.humidity).collect()
    }
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One block character per value, scaled between the series min and max.
/// A flat series renders at the lowest level.
pub fn sparkline(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    values
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                return SPARK_LEVELS[0];
            }
            let level = ((v - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: u32) -> HistoryPoint {
        HistoryPoint {
            time: format!("t{}", i),
            temp1: i as f64,
            temp2: 0.0,
            temp3: 0.0,
            humidity: 45.0,
            pest_count: 0,
        }
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut history = HistoryBuffer::new(30);
        for i in 0..100 {
            history.push(point(i));
            assert!(history.len() <= 30);
        }
        assert_eq!(history.len(), 30);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut history = HistoryBuffer::new(30);
        for i in 1..=31 {
            history.push(point(i));
        }
        assert!(history.iter().all(|p| p.time != "t1"));
        assert_eq!(history.oldest().map(|p| p.time.as_str()), Some("t2"));
        assert_eq!(history.latest().map(|p| p.time.as_str()), Some("t31"));
    }

    #[test]
    fn test_series_in_arrival_order() {
        let mut history = HistoryBuffer::new(3);
        for i in 0..5 {
            history.push(point(i));
        }
        assert_eq!(history.temperature_series(0), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.humidity_series().len(), 3);
    }

    #[test]
    fn test_time_label() {
        // 1970-01-01T13:05:09.500Z
        let millis = ((13 * 3600 + 5 * 60 + 9) * 1000 + 500) as u64;
        assert_eq!(format_time_label(millis), "13:05:09");
        assert_eq!(format_time_label(86_400_000), "00:00:00");
    }

    #[test]
    fn test_point_from_state() {
        let state = EnvironmentState::initial(0);
        let p = HistoryPoint::from_state(&state);
        assert_eq!(p.temp2, 25.0);
        assert_eq!(p.time, "00:00:00");
    }

    #[test]
    fn test_decoded_buffer_respects_capacity() {
        let points: Vec<_> = (0..40).map(point).collect();
        let json = serde_json::json!({ "points": points, "capacity": 30 }).to_string();
        let history: HistoryBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(history.len(), 30);
        assert_eq!(history.capacity(), 30);
        // The newest points survive.
        assert_eq!(history.oldest().map(|p| p.time.as_str()), Some("t10"));
        assert_eq!(history.latest().map(|p| p.time.as_str()), Some("t39"));

        let empty: HistoryBuffer =
            serde_json::from_str(r#"{"points":[],"capacity":0}"#).unwrap();
        assert_eq!(empty.capacity(), 1);
    }

    #[test]
    fn test_sparkline_scales_to_range() {
        assert_eq!(sparkline(&[]), "");
        assert_eq!(sparkline(&[25.0, 25.0]), "▁▁");
        assert_eq!(sparkline(&[0.0, 7.0, 3.5]), "▁█▅");
        assert_eq!(sparkline(&[40.0, 30.0]).chars().count(), 2);
    }
}
