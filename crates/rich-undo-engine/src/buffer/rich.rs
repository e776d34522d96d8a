use std::ops::Range;
use std::rc::Rc;

use crate::buffer::{EditObserver, ObservableBuffer, ObserverId, TextBuffer};
use crate::marks::{Gravity, MarkId};
use crate::styled::{Fragment, StyledText};
use crate::tags::{TagId, TagTable};

/// Reference host buffer: rope-backed formatted text with a cursor,
/// a selection anchor and edit notifications
///
/// Every mutation goes through the [`TextBuffer`] methods so observers see
/// user edits and undo replays alike. The cursor and the selection anchor
/// are right-gravity marks, so typing at the cursor pushes them forward.
pub struct RichBuffer {
    content: StyledText,
    tag_table: TagTable,
    insert_mark: MarkId,
    selection_mark: MarkId,
    observers: Vec<(ObserverId, Rc<dyn EditObserver>)>,
    next_observer: u64,
}

impl RichBuffer {
    pub fn new(tag_table: TagTable) -> Self {
        let mut content = StyledText::new();
        let insert_mark = content.create_mark(0, Gravity::Right);
        let selection_mark = content.create_mark(0, Gravity::Right);
        Self {
            content,
            tag_table,
            insert_mark,
            selection_mark,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Create a buffer holding `bytes`, with the default tag table
    ///
    /// No observers are connected yet, so the initial content never shows
    /// up in undo history.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let mut buffer = Self::new(TagTable::with_defaults());
        buffer.content.insert_fragment(0, &Fragment::plain(text));
        buffer.place_cursor(0);
        Ok(buffer)
    }

    /// Insert plain text, as typing or a plain paste would
    pub fn insert(&mut self, at: usize, text: &str) {
        self.insert_fragment(at, &Fragment::plain(text));
    }

    /// Insert at the cursor
    pub fn insert_at_cursor(&mut self, text: &str) {
        let at = self.cursor();
        self.insert(at, text);
    }

    /// Delete the character before the cursor
    pub fn backspace(&mut self) {
        let cursor = self.cursor();
        if cursor == 0 {
            return;
        }
        let prev = self.content.clamp(cursor - 1);
        self.delete(prev..cursor);
    }

    /// Delete the character after the cursor
    pub fn delete_forward(&mut self) {
        let cursor = self.cursor();
        let next = self.content.slice(cursor..self.len()).chars().next();
        if let Some(ch) = next {
            self.delete(cursor..cursor + ch.len_utf8());
        }
    }

    /// Move the cursor and collapse the selection onto it
    pub fn place_cursor(&mut self, offset: usize) {
        self.set_cursor(offset);
        self.set_selection_bound(offset);
    }

    /// Current selection, ordered
    pub fn selection(&self) -> Range<usize> {
        let cursor = self.cursor();
        let bound = self.selection_bound();
        cursor.min(bound)..cursor.max(bound)
    }

    /// Replace the whole content
    ///
    /// Observers are notified as for any other edit; callers loading stored
    /// content wrap this in a freeze of their undo manager.
    pub fn set_content(&mut self, fragment: &Fragment) {
        let len = self.len();
        self.delete(0..len);
        self.insert_fragment(0, fragment);
        self.place_cursor(0);
    }

    /// Whole content with formatting
    pub fn content(&self) -> Fragment {
        self.content.fragment(0..self.content.len())
    }

    pub fn has_tag(&self, tag: TagId, range: Range<usize>) -> bool {
        self.content.has_tag(tag, range)
    }

    pub fn tag_table_mut(&mut self) -> &mut TagTable {
        &mut self.tag_table
    }

    fn observers(&self) -> Vec<Rc<dyn EditObserver>> {
        self.observers
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect()
    }
}

impl TextBuffer for RichBuffer {
    fn len(&self) -> usize {
        self.content.len()
    }

    fn text(&self) -> String {
        self.content.text()
    }

    fn slice(&self, range: Range<usize>) -> String {
        self.content.slice(range).into_owned()
    }

    fn fragment(&self, range: Range<usize>) -> Fragment {
        self.content.fragment(range)
    }

    fn insert_fragment(&mut self, at: usize, fragment: &Fragment) {
        if fragment.is_empty() {
            return;
        }
        let at = self.content.insert_fragment(at, fragment);
        let end = at + fragment.len();
        let length = fragment.text.chars().count();
        for observer in self.observers() {
            observer.on_insert_text(&*self, end, &fragment.text, length);
        }
    }

    fn delete(&mut self, range: Range<usize>) {
        let range = self.content.clamp_range(range);
        if range.is_empty() {
            return;
        }
        // Observers must see the text before it goes away
        for observer in self.observers() {
            observer.on_delete_range(&*self, range.start, range.end);
        }
        self.content.delete(range);
    }

    fn apply_tag(&mut self, tag: TagId, range: Range<usize>) {
        // Only the parts that gain the tag are reported
        let changed = self.content.untagged_parts(tag, range.clone());
        self.content.apply_tag(tag, range);
        for part in changed {
            for observer in self.observers() {
                observer.on_tag_applied(&*self, tag, part.start, part.end);
            }
        }
    }

    fn remove_tag(&mut self, tag: TagId, range: Range<usize>) {
        let changed = self.content.tagged_parts(tag, range.clone());
        self.content.remove_tag(tag, range);
        for part in changed {
            for observer in self.observers() {
                observer.on_tag_removed(&*self, tag, part.start, part.end);
            }
        }
    }

    fn cursor(&self) -> usize {
        self.content.marks().offset(self.insert_mark).unwrap_or(0)
    }

    fn selection_bound(&self) -> usize {
        self.content
            .marks()
            .offset(self.selection_mark)
            .unwrap_or(0)
    }

    fn set_cursor(&mut self, offset: usize) {
        let offset = self.content.clamp(offset);
        self.content.marks_mut().move_to(self.insert_mark, offset);
    }

    fn set_selection_bound(&mut self, offset: usize) {
        let offset = self.content.clamp(offset);
        self.content.marks_mut().move_to(self.selection_mark, offset);
    }

    fn create_mark(&mut self, offset: usize, gravity: Gravity) -> MarkId {
        self.content.create_mark(offset, gravity)
    }

    fn mark_offset(&self, mark: MarkId) -> Option<usize> {
        self.content.marks().offset(mark)
    }

    fn release_mark(&mut self, mark: MarkId) -> bool {
        // The cursor and selection marks live as long as the buffer
        if mark == self.insert_mark || mark == self.selection_mark {
            return false;
        }
        self.content.marks_mut().release(mark)
    }

    fn tag_table(&self) -> &TagTable {
        &self.tag_table
    }
}

impl ObservableBuffer for RichBuffer {
    fn connect(&mut self, observer: Rc<dyn EditObserver>) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.push((id, observer));
        id
    }

    fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }
}

impl std::fmt::Debug for RichBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RichBuffer")
            .field("content", &self.content)
            .field("cursor", &self.cursor())
            .field("selection_bound", &self.selection_bound())
            .field("observers", &self.observers.len())
            .finish()
    }
}
