use std::collections::HashMap;

/// Opaque handle to a position inside a buffer that survives edits
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MarkId(pub(crate) u64);

/// Controls whether a mark advances when text is inserted at its exact offset
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Gravity {
    /// Mark stays before text inserted at its offset
    #[default]
    Left,
    /// Mark moves after text inserted at its offset
    Right,
}

#[derive(Clone, Debug, PartialEq)]
struct Mark {
    offset: usize,
    gravity: Gravity,
}

/// Table of live marks owned by one buffer
///
/// Offsets are kept up to date by the owning buffer, which calls
/// [`MarkSet::adjust_for_insert`] / [`MarkSet::adjust_for_delete`] on every
/// mutation. A mark stays valid until it is released.
#[derive(Clone, Debug, Default)]
pub struct MarkSet {
    marks: HashMap<MarkId, Mark>,
    next_id: u64,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, offset: usize, gravity: Gravity) -> MarkId {
        self.next_id += 1;
        let id = MarkId(self.next_id);
        self.marks.insert(id, Mark { offset, gravity });
        id
    }

    pub fn offset(&self, id: MarkId) -> Option<usize> {
        self.marks.get(&id).map(|mark| mark.offset)
    }

    /// Move a live mark; returns false if the mark was already released
    pub fn move_to(&mut self, id: MarkId, offset: usize) -> bool {
        match self.marks.get_mut(&id) {
            Some(mark) => {
                mark.offset = offset;
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, id: MarkId) -> bool {
        self.marks.remove(&id).is_some()
    }

    /// Number of live marks
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn adjust_for_insert(&mut self, at: usize, len: usize) {
        if len == 0 {
            return;
        }
        for mark in self.marks.values_mut() {
            let moves = mark.offset > at || (mark.offset == at && mark.gravity == Gravity::Right);
            if moves {
                mark.offset += len;
            }
        }
    }

    pub fn adjust_for_delete(&mut self, range: std::ops::Range<usize>) {
        if range.is_empty() {
            return;
        }
        let removed = range.len();
        for mark in self.marks.values_mut() {
            if mark.offset >= range.end {
                mark.offset -= removed;
            } else if mark.offset > range.start {
                // Marks inside the deleted text collapse onto its start
                mark.offset = range.start;
            }
        }
    }
}
