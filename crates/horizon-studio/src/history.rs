//! Linear undo/redo history of buffer snapshots.
//!
//! Each entry owns an immutable, shared [`PixelBuffer`]; stepping back and
//! forth only moves a cursor and never copies pixels. Pushing a new entry
//! discards everything after the cursor, so there is never a branch.

use std::sync::Arc;

use horizon_studio_render::PixelBuffer;

use crate::logging::targets;

/// One point in the history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    buffer: Arc<PixelBuffer>,
    label: String,
}

impl HistoryEntry {
    pub fn new(buffer: Arc<PixelBuffer>, label: impl Into<String>) -> Self {
        Self {
            buffer,
            label: label.into(),
        }
    }

    /// The snapshot.
    #[inline]
    pub fn buffer(&self) -> &Arc<PixelBuffer> {
        &self.buffer
    }

    /// Name of the operation that produced the snapshot.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Configuration for [`HistoryManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryConfig {
    /// Maximum number of entries to keep. `None` keeps everything.
    pub capacity: Option<usize>,
}

impl HistoryConfig {
    /// Keep every entry.
    pub fn unlimited() -> Self {
        Self { capacity: None }
    }

    /// Keep at most `max` entries (at least one).
    pub fn with_limit(max: usize) -> Self {
        Self {
            capacity: Some(max.max(1)),
        }
    }
}

/// A non-empty, linear sequence of snapshots with a cursor.
///
/// The entry under the cursor is the current state. The cursor always
/// indexes a valid entry.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    config: HistoryConfig,
}

impl HistoryManager {
    /// Create a history whose only entry is `initial`.
    pub fn new(initial: HistoryEntry, config: HistoryConfig) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            config,
        }
    }

    /// Append `entry` after the cursor, dropping any redo entries, and make
    /// it current. When a capacity is set the oldest entries are evicted.
    pub fn push(&mut self, entry: HistoryEntry) {
        let discarded = self.entries.len() - (self.cursor + 1);
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;

        let mut evicted = 0;
        if let Some(capacity) = self.config.capacity {
            if self.entries.len() > capacity {
                evicted = self.entries.len() - capacity;
                self.entries.drain(..evicted);
                self.cursor = self.entries.len() - 1;
            }
        }
        tracing::trace!(
            target: targets::HISTORY,
            label = self.current().label(),
            len = self.entries.len(),
            discarded,
            evicted,
            "pushed history entry"
        );
    }

    /// Step back one entry. Returns the new current entry, or `None` when
    /// already at the oldest entry.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Step forward one entry. Returns the new current entry, or `None` when
    /// already at the newest entry.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    /// The entry under the cursor.
    #[inline]
    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a history holds at least its initial entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of entries behind the cursor.
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Number of entries ahead of the cursor.
    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }

    /// Labels of every entry, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(HistoryEntry::label)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_studio_render::Color;

    fn entry(shade: u8, label: &str) -> HistoryEntry {
        let buffer = PixelBuffer::from_color(2, 2, Color::from_rgb8(shade, shade, shade)).unwrap();
        HistoryEntry::new(Arc::new(buffer), label)
    }

    fn history() -> HistoryManager {
        HistoryManager::new(entry(0, "open"), HistoryConfig::default())
    }

    #[test]
    fn test_push_advances_cursor() {
        let mut h = history();
        h.push(entry(1, "a"));
        h.push(entry(2, "b"));
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), 2);
        assert_eq!(h.current().label(), "b");
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn test_undo_redo() {
        let mut h = history();
        h.push(entry(1, "a"));
        assert_eq!(h.undo().map(|e| e.label().to_string()), Some("open".into()));
        assert!(h.undo().is_none());
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.redo().map(|e| e.label().to_string()), Some("a".into()));
        assert!(h.redo().is_none());
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn test_push_discards_redo_entries() {
        let mut h = history();
        h.push(entry(1, "a"));
        h.push(entry(2, "b"));
        h.undo();
        h.undo();
        h.push(entry(3, "c"));
        assert_eq!(h.labels().collect::<Vec<_>>(), ["open", "c"]);
        assert_eq!(h.cursor(), 1);
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn test_snapshots_are_shared_not_copied() {
        let mut h = history();
        let e = entry(9, "a");
        let ptr = Arc::as_ptr(e.buffer());
        h.push(e);
        h.undo();
        h.redo();
        assert_eq!(Arc::as_ptr(h.current().buffer()), ptr);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = HistoryManager::new(entry(0, "open"), HistoryConfig::with_limit(3));
        for i in 1..=5 {
            h.push(entry(i, &format!("op{i}")));
        }
        assert_eq!(h.labels().collect::<Vec<_>>(), ["op3", "op4", "op5"]);
        assert_eq!(h.cursor(), 2);
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn test_capacity_one_keeps_current() {
        let mut h = HistoryManager::new(entry(0, "open"), HistoryConfig::with_limit(0));
        h.push(entry(1, "a"));
        assert_eq!(h.len(), 1);
        assert_eq!(h.current().label(), "a");
        assert!(!h.can_undo());
    }
}
