//! Fixed-cadence send buffer for local pointer samples
//!
//! Pointer samples are appended as they arrive; the render tick flushes the
//! buffer as one chunk once the flush interval has passed, and releasing the
//! pointer flushes whatever is left.

use std::time::{Duration, Instant};

use crate::messages::Point;

/// About one frame at 60 Hz
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug)]
pub struct ChunkBuffer {
    points: Vec<Point>,
    interval: Duration,
    last_flush: Instant,
}

impl ChunkBuffer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            points: Vec::new(),
            interval,
            last_flush: now,
        }
    }

    /// Start a new stroke; the first point goes out with the next flush
    pub fn begin(&mut self, first: Point) {
        self.points.clear();
        self.points.push(first);
    }

    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Called on every render tick. Yields a chunk when the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<Point>> {
        if now.duration_since(self.last_flush) <= self.interval {
            return None;
        }
        self.last_flush = now;
        self.take()
    }

    /// Pointer released: the remaining tail, if any
    pub fn finish(&mut self) -> Option<Vec<Point>> {
        self.take()
    }

    fn take(&mut self) -> Option<Vec<Point>> {
        if self.points.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.points))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flushes_only_after_interval() {
        let t0 = Instant::now();
        let mut buffer = ChunkBuffer::new(FLUSH_INTERVAL, t0);
        buffer.begin(Point::new(0.0, 0.0));
        buffer.push(Point::new(1.0, 0.0));

        assert!(buffer.poll(t0 + Duration::from_millis(10)).is_none());
        assert_eq!(buffer.len(), 2);

        let chunk = buffer.poll(t0 + Duration::from_millis(17)).unwrap();
        assert_eq!(chunk.len(), 2);
        assert!(buffer.is_empty());

        buffer.push(Point::new(2.0, 0.0));
        assert!(buffer.poll(t0 + Duration::from_millis(20)).is_none());
        assert!(buffer.poll(t0 + Duration::from_millis(34)).is_some());
    }

    #[test]
    fn test_empty_buffer_never_flushes() {
        let t0 = Instant::now();
        let mut buffer = ChunkBuffer::new(FLUSH_INTERVAL, t0);
        assert!(buffer.poll(t0 + Duration::from_secs(1)).is_none());
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_finish_returns_tail() {
        let t0 = Instant::now();
        let mut buffer = ChunkBuffer::new(FLUSH_INTERVAL, t0);
        buffer.begin(Point::new(0.0, 0.0));
        buffer.poll(t0 + Duration::from_millis(17));
        buffer.push(Point::new(3.0, 3.0));

        assert_eq!(buffer.finish(), Some(vec![Point::new(3.0, 3.0)]));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_begin_discards_stale_points() {
        let t0 = Instant::now();
        let mut buffer = ChunkBuffer::new(FLUSH_INTERVAL, t0);
        buffer.push(Point::new(9.0, 9.0));
        buffer.begin(Point::new(0.0, 0.0));
        assert_eq!(buffer.finish(), Some(vec![Point::new(0.0, 0.0)]));
    }
}
