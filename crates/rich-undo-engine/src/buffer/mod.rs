//! Host buffer contract
//!
//! The undo engine never owns the document it records. It talks to it through
//! [`TextBuffer`] (reads and replays), is told about user edits through
//! [`EditObserver`], and registers itself once via [`ObservableBuffer`].
//!
//! Offsets are UTF-8 byte offsets into the buffer text.

use std::ops::Range;
use std::rc::Rc;

use crate::marks::{Gravity, MarkId};
use crate::styled::Fragment;
use crate::tags::{TagId, TagTable};

pub mod rich;

pub use rich::RichBuffer;

/// An editable formatted-text buffer
pub trait TextBuffer {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn text(&self) -> String;

    fn slice(&self, range: Range<usize>) -> String;

    /// Content and formatting of `range`
    fn fragment(&self, range: Range<usize>) -> Fragment;

    fn insert_fragment(&mut self, at: usize, fragment: &Fragment);

    fn delete(&mut self, range: Range<usize>);

    fn apply_tag(&mut self, tag: TagId, range: Range<usize>);

    fn remove_tag(&mut self, tag: TagId, range: Range<usize>);

    /// Offset of the insertion cursor
    fn cursor(&self) -> usize;

    /// Offset of the selection anchor (equal to the cursor when nothing is selected)
    fn selection_bound(&self) -> usize;

    fn set_cursor(&mut self, offset: usize);

    fn set_selection_bound(&mut self, offset: usize);

    fn create_mark(&mut self, offset: usize, gravity: Gravity) -> MarkId;

    fn mark_offset(&self, mark: MarkId) -> Option<usize>;

    fn release_mark(&mut self, mark: MarkId) -> bool;

    fn tag_table(&self) -> &TagTable;
}

/// Receives edit notifications from a buffer
///
/// Notifications are delivered synchronously. Insertions and tag changes are
/// reported after they happened, deletions before, so the deleted content can
/// still be read from `buffer`.
pub trait EditObserver {
    /// `end` is the offset just past the inserted text, `length` counts characters
    fn on_insert_text(&self, buffer: &dyn TextBuffer, end: usize, text: &str, length: usize);

    fn on_delete_range(&self, buffer: &dyn TextBuffer, start: usize, end: usize);

    fn on_tag_applied(&self, buffer: &dyn TextBuffer, tag: TagId, start: usize, end: usize);

    fn on_tag_removed(&self, buffer: &dyn TextBuffer, tag: TagId, start: usize, end: usize);
}

/// Registration handle returned by [`ObservableBuffer::connect`]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ObserverId(pub(crate) u64);

/// A buffer that reports its edits to registered observers
pub trait ObservableBuffer: TextBuffer {
    fn connect(&mut self, observer: Rc<dyn EditObserver>) -> ObserverId;

    fn disconnect(&mut self, id: ObserverId) -> bool;
}
