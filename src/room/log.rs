//! Per-room operation history with undo/redo
//!
//! Entries are only ever appended or moved whole between the history and
//! the redo stack; nothing is reordered or edited in place.

use serde::Serialize;

use crate::models::Entry;

/// Point-in-time copy of a room's history, ready to go on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
}

/// Append-only history of drawing operations with an undo/redo stack
#[derive(Debug, Default)]
pub struct OperationLog {
    entries: Vec<Entry>,
    redo_stack: Vec<Entry>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation. New work invalidates anything that was undone.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.redo_stack.clear();
    }

    /// Move the newest entry onto the redo stack
    pub fn undo(&mut self) -> bool {
        match self.entries.pop() {
            Some(entry) => {
                self.redo_stack.push(entry);
                true
            }
            None => false,
        }
    }

    /// Move the most recently undone entry back into the history
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(entry) => {
                self.entries.push(entry);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.clone(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Composite, Operation, Point, Style};
    use uuid::Uuid;

    fn stroke(x: f64) -> Entry {
        Entry::new(
            Uuid::nil(),
            Operation::Stroke {
                points: vec![Point::new(x, 0.0), Point::new(x + 1.0, 1.0)],
                style: Style {
                    color: "#222".to_string(),
                    size: 3.0,
                    composite: Composite::Normal,
                },
            },
        )
    }

    #[test]
    fn test_undo_then_redo_restores_history() {
        let mut log = OperationLog::new();
        let original: Vec<Entry> = (0..5).map(|i| stroke(i as f64)).collect();
        for entry in &original {
            log.push(entry.clone());
        }

        for n in 0..=original.len() {
            for _ in 0..n {
                assert!(log.undo());
            }
            assert_eq!(log.len(), original.len() - n);
            for _ in 0..n {
                assert!(log.redo());
            }
            assert_eq!(log.entries(), original.as_slice());
        }
    }

    #[test]
    fn test_push_after_undo_clears_redo() {
        let mut log = OperationLog::new();
        log.push(stroke(1.0));
        log.push(stroke(2.0));
        assert!(log.undo());
        assert!(log.can_redo());

        log.push(stroke(3.0));
        assert!(!log.can_redo());
        assert!(!log.redo());
        assert_eq!(log.entries(), &[stroke(1.0), stroke(3.0)]);
    }

    #[test]
    fn test_empty_stacks_report_no_change() {
        let mut log = OperationLog::new();
        assert!(!log.undo());
        assert!(!log.redo());
        assert!(log.is_empty());
        assert!(!log.can_redo());

        log.push(stroke(1.0));
        assert!(!log.redo());
        assert_eq!(log.len(), 1);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_undo_is_lifo() {
        let mut log = OperationLog::new();
        log.push(stroke(1.0));
        log.push(stroke(2.0));
        log.push(stroke(3.0));

        log.undo();
        log.undo();
        assert_eq!(log.entries(), &[stroke(1.0)]);

        log.redo();
        assert_eq!(log.entries(), &[stroke(1.0), stroke(2.0)]);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let mut log = OperationLog::new();
        log.push(stroke(1.0));
        let snapshot = log.snapshot();

        log.push(stroke(2.0));
        log.undo();
        log.undo();

        assert_eq!(snapshot.entries, vec![stroke(1.0)]);
        assert!(log.snapshot().entries.is_empty());
    }
}
