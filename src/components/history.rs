// ============================================================================
// HISTORY ENGINE — linear undo/redo stack over reversible edit records
// ============================================================================

use crate::canvas::CanvasState;
use crate::components::diff::SurfaceDiff;
use crate::error::Result;
use crate::surface::Surface;

/// Which direction invoking this record will move the document.
///
/// `Undo` means the record's edit is currently applied; invoking it
/// restores the pre-edit state. `Redo` is the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Undo,
    Redo,
}

/// One reversible edit on the canvas.
pub trait HistoryItem: Send + Sync {
    /// Icon resource name shown in the history pad.
    fn icon(&self) -> &str {
        "history-default"
    }

    fn label(&self) -> &str;

    /// Whether applying or reverting this record makes the document dirty.
    /// Records like selection changes override this with `false`.
    fn causes_dirty(&self) -> bool {
        true
    }

    fn undo(&mut self, canvas: &mut CanvasState) -> Result<()>;

    fn redo(&mut self, canvas: &mut CanvasState) -> Result<()>;

    fn memory_size(&self) -> usize;
}

// ============================================================================
// SIMPLE HISTORY ITEM — one layer's pixels, as a diff or a full snapshot
// ============================================================================

enum Payload {
    Diff(SurfaceDiff),
    Snapshot(Surface),
}

/// Records a pixel edit to a single layer.
///
/// Captured as a [`SurfaceDiff`] against the pre-edit surface when the
/// change is localized, or as a full snapshot when the diff engine declines.
/// Undo and redo are the same swap either way, so one stored copy serves
/// both directions.
pub struct SimpleHistoryItem {
    icon: String,
    label: String,
    layer_index: usize,
    payload: Payload,
}

impl SimpleHistoryItem {
    /// Capture the edit to layer `layer_index`, where `before` is the
    /// layer's surface as it was before the edit and the canvas already
    /// holds the post-edit pixels.
    pub fn capture(
        icon: &str,
        label: &str,
        canvas: &CanvasState,
        layer_index: usize,
        before: Surface,
    ) -> Result<Self> {
        let after = canvas.layer(layer_index)?.surface();
        let payload = match SurfaceDiff::create(&before, after)? {
            Some(diff) => Payload::Diff(diff),
            None => {
                log::debug!("'{label}' changed most of the layer, keeping a full snapshot");
                Payload::Snapshot(before)
            }
        };
        Ok(Self {
            icon: icon.to_string(),
            label: label.to_string(),
            layer_index,
            payload,
        })
    }

    fn swap(&mut self, canvas: &mut CanvasState) -> Result<()> {
        let layer = canvas.layer_mut(self.layer_index)?;
        let invalid = match &mut self.payload {
            Payload::Diff(diff) => {
                diff.apply_and_swap(layer.surface_mut())?;
                Some(diff.bounds())
            }
            Payload::Snapshot(stored) => {
                std::mem::swap(stored, layer.surface_mut());
                None
            }
        };
        canvas.mark_dirty(invalid);
        Ok(())
    }
}

impl HistoryItem for SimpleHistoryItem {
    fn icon(&self) -> &str {
        &self.icon
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn undo(&mut self, canvas: &mut CanvasState) -> Result<()> {
        self.swap(canvas)
    }

    fn redo(&mut self, canvas: &mut CanvasState) -> Result<()> {
        self.swap(canvas)
    }

    fn memory_size(&self) -> usize {
        match &self.payload {
            Payload::Diff(diff) => diff.memory_bytes(),
            Payload::Snapshot(surface) => surface.memory_bytes(),
        }
    }
}

// ============================================================================
// COMPOUND HISTORY ITEM — several records undone and redone as one step
// ============================================================================

pub struct CompoundHistoryItem {
    icon: String,
    label: String,
    items: Vec<Box<dyn HistoryItem>>,
}

impl CompoundHistoryItem {
    pub fn new(icon: &str, label: &str) -> Self {
        Self { icon: icon.to_string(), label: label.to_string(), items: Vec::new() }
    }

    pub fn push(&mut self, item: Box<dyn HistoryItem>) {
        self.items.push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl HistoryItem for CompoundHistoryItem {
    fn icon(&self) -> &str {
        &self.icon
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn causes_dirty(&self) -> bool {
        self.items.iter().any(|i| i.causes_dirty())
    }

    /// Children undo in reverse of the order they were applied.  A child
    /// failure re-applies the children already undone, so the canvas never
    /// ends up partially reverted.
    fn undo(&mut self, canvas: &mut CanvasState) -> Result<()> {
        for i in (0..self.items.len()).rev() {
            if let Err(err) = self.items[i].undo(canvas) {
                for item in &mut self.items[i + 1..] {
                    if let Err(rollback) = item.redo(canvas) {
                        log::warn!("'{}': rollback after failed undo: {rollback}", self.label);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn redo(&mut self, canvas: &mut CanvasState) -> Result<()> {
        for i in 0..self.items.len() {
            if let Err(err) = self.items[i].redo(canvas) {
                for item in self.items[..i].iter_mut().rev() {
                    if let Err(rollback) = item.undo(canvas) {
                        log::warn!("'{}': rollback after failed redo: {rollback}", self.label);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn memory_size(&self) -> usize {
        self.items.iter().map(|i| i.memory_size()).sum()
    }
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

struct Entry {
    item: Box<dyn HistoryItem>,
    state: ItemState,
}

/// Linear undo/redo stack with a cursor, a clean point, and memory limits.
///
/// `cursor` counts the records currently applied; everything below it is
/// undoable, everything at or above is redoable. Pushing while redo
/// records exist discards them; there is no branching.
pub struct HistoryManager {
    entries: Vec<Entry>,
    cursor: usize,
    /// Cursor position at the last save, `None` once the saved state has
    /// been truncated out of the stack.
    clean_cursor: Option<usize>,
    max_entries: usize,
    max_memory_bytes: usize,
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryManager {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            clean_cursor: Some(0),
            max_entries,
            max_memory_bytes: 100 * 1024 * 1024,
            total_memory: 0,
        }
    }

    pub fn with_memory_limit(max_entries: usize, max_memory_bytes: usize) -> Self {
        Self { max_memory_bytes, ..Self::new(max_entries) }
    }

    /// Commit an already-applied edit. Any redoable records are discarded.
    pub fn push(&mut self, canvas: &mut CanvasState, item: Box<dyn HistoryItem>) {
        if self.cursor < self.entries.len() {
            log::debug!(
                "push truncates {} redoable record(s)",
                self.entries.len() - self.cursor
            );
            for entry in self.entries.drain(self.cursor..) {
                self.total_memory = self.total_memory.saturating_sub(entry.item.memory_size());
            }
            // The saved state is gone if it lived in the truncated tail.
            if self.clean_cursor.is_some_and(|c| c > self.cursor) {
                self.clean_cursor = None;
            }
        }

        log::debug!("push '{}'", item.label());
        self.total_memory += item.memory_size();
        self.entries.push(Entry { item, state: ItemState::Undo });
        self.cursor += 1;
        self.prune();
        self.update_dirty(canvas);
    }

    /// Revert the newest applied record. Returns its label, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self, canvas: &mut CanvasState) -> Result<Option<String>> {
        if self.cursor == 0 {
            return Ok(None);
        }
        let entry = &mut self.entries[self.cursor - 1];
        debug_assert_eq!(entry.state, ItemState::Undo);
        entry.item.undo(canvas)?;
        entry.state = ItemState::Redo;
        self.cursor -= 1;
        let label = self.entries[self.cursor].item.label().to_string();
        log::debug!("undo '{label}'");
        self.update_dirty(canvas);
        Ok(Some(label))
    }

    /// Reapply the oldest reverted record.
    pub fn redo(&mut self, canvas: &mut CanvasState) -> Result<Option<String>> {
        if self.cursor == self.entries.len() {
            return Ok(None);
        }
        let entry = &mut self.entries[self.cursor];
        debug_assert_eq!(entry.state, ItemState::Redo);
        entry.item.redo(canvas)?;
        entry.state = ItemState::Undo;
        self.cursor += 1;
        let label = self.entries[self.cursor - 1].item.label().to_string();
        log::debug!("redo '{label}'");
        self.update_dirty(canvas);
        Ok(Some(label))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.cursor.checked_sub(1).map(|i| self.entries[i].item.label())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|e| e.item.label())
    }

    /// Labels of every record, oldest first, with the applied count equal
    /// to the cursor.
    pub fn labels(&self) -> impl Iterator<Item = (&str, ItemState)> {
        self.entries.iter().map(|e| (e.item.label(), e.state))
    }

    /// Mark the current position as the saved state.
    pub fn mark_clean(&mut self, canvas: &mut CanvasState) {
        self.clean_cursor = Some(self.cursor);
        canvas.set_dirty(false);
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.clean_cursor = Some(0);
        self.total_memory = 0;
    }

    /// Whether the document differs from the clean point: some record with
    /// `causes_dirty` lies between the cursor and the saved position.
    fn is_dirty(&self) -> bool {
        match self.clean_cursor {
            None => true,
            Some(clean) => {
                let lo = clean.min(self.cursor);
                let hi = clean.max(self.cursor);
                self.entries[lo..hi].iter().any(|e| e.item.causes_dirty())
            }
        }
    }

    fn update_dirty(&self, canvas: &mut CanvasState) {
        canvas.set_dirty(self.is_dirty());
    }

    /// Drop the oldest applied records to stay within the count and memory
    /// limits. The record below the cursor is always kept so one undo
    /// remains possible.
    fn prune(&mut self) {
        let mut removed = 0usize;
        while self.cursor - removed > 1
            && (self.entries.len() - removed > self.max_entries
                || self.total_memory > self.max_memory_bytes)
        {
            self.total_memory = self.total_memory.saturating_sub(self.entries[removed].item.memory_size());
            removed += 1;
        }
        if removed > 0 {
            log::debug!("pruned {removed} old history record(s)");
            self.entries.drain(..removed);
            self.cursor -= removed;
            self.clean_cursor = match self.clean_cursor {
                Some(c) if c >= removed => Some(c - removed),
                _ => None,
            };
        }
    }
}
