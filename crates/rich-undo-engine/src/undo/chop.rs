use std::ops::Range;

use crate::buffer::TextBuffer;
use crate::marks::{Gravity, MarkId};
use crate::styled::{Fragment, StyledText};

/// Side buffer holding text removed from (or copied out of) a live buffer
///
/// Content lives here independently of the live document, so undo can
/// reinsert it with its formatting long after the live text is gone. New
/// captures are appended at the end; every mark has left gravity, so a
/// capture never grows the chop that ends where it starts.
#[derive(Debug, Default)]
pub struct SnippetStore {
    content: StyledText,
}

/// Bytes and marks currently held by a [`SnippetStore`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SnippetUsage {
    pub bytes: usize,
    pub marks: usize,
}

impl SnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `range` of `buffer`, formatting included, to the end of the store
    pub fn capture(&mut self, buffer: &dyn TextBuffer, range: Range<usize>) -> Chop {
        let fragment = buffer.fragment(range);
        let start = self.content.len();
        self.content.insert_fragment(start, &fragment);
        let end = self.content.len();
        Chop {
            start: self.content.create_mark(start, Gravity::Left),
            end: self.content.create_mark(end, Gravity::Left),
        }
    }

    /// Copy the content of `source` in front of `target`, growing `target`
    pub fn splice_before(&mut self, target: &Chop, source: &Chop) {
        let fragment = source.fragment(self);
        let at = target.start(self);
        self.content.insert_fragment(at, &fragment);
    }

    pub fn usage(&self) -> SnippetUsage {
        SnippetUsage {
            bytes: self.content.len(),
            marks: self.content.marks().len(),
        }
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    fn offset(&self, mark: MarkId) -> usize {
        // A chop's marks stay live until the chop is destroyed
        self.content.marks().offset(mark).unwrap_or(0)
    }
}

/// A retained piece of formatted text, bracketed by two marks in a [`SnippetStore`]
///
/// The start never passes the end. A chop is not `Clone`: exactly one owner
/// releases its marks through [`Chop::destroy`].
#[derive(Debug, PartialEq, Eq)]
pub struct Chop {
    start: MarkId,
    end: MarkId,
}

impl Chop {
    pub fn start(&self, store: &SnippetStore) -> usize {
        store.offset(self.start)
    }

    pub fn end(&self, store: &SnippetStore) -> usize {
        store.offset(self.end)
    }

    pub fn range(&self, store: &SnippetStore) -> Range<usize> {
        self.start(store)..self.end(store)
    }

    pub fn len(&self, store: &SnippetStore) -> usize {
        self.range(store).len()
    }

    pub fn is_empty(&self, store: &SnippetStore) -> bool {
        self.len(store) == 0
    }

    pub fn text(&self, store: &SnippetStore) -> String {
        store.content.slice(self.range(store)).into_owned()
    }

    pub fn first_char(&self, store: &SnippetStore) -> Option<char> {
        store.content.slice(self.range(store)).chars().next()
    }

    pub fn fragment(&self, store: &SnippetStore) -> Fragment {
        store.content.fragment(self.range(store))
    }

    /// Grow this chop so it ends where `other` ends
    ///
    /// Only meaningful when `other` directly follows this chop in the store.
    pub fn extend_to(&mut self, other: &Chop, store: &mut SnippetStore) {
        debug_assert_eq!(self.end(store), other.start(store), "chops are not contiguous");
        let end = other.end(store);
        store.content.marks_mut().move_to(self.end, end);
    }

    /// Delete the chop's text from the store; the marks survive, now coincident
    pub fn erase(&self, store: &mut SnippetStore) {
        let range = self.range(store);
        store.content.delete(range);
    }

    /// Release both marks, leaving any text in place
    pub fn destroy(self, store: &mut SnippetStore) {
        store.content.marks_mut().release(self.start);
        store.content.marks_mut().release(self.end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RichBuffer;
    use pretty_assertions::assert_eq;

    fn live_buffer() -> RichBuffer {
        let mut buffer = RichBuffer::from_bytes(b"hello world").unwrap();
        let bold = buffer.tag_table().lookup("bold").unwrap();
        buffer.apply_tag(bold, 0..5);
        buffer
    }

    #[test]
    fn test_capture_copies_text_and_formatting() {
        let buffer = live_buffer();
        let bold = buffer.tag_table().lookup("bold").unwrap();
        let mut store = SnippetStore::new();

        let chop = store.capture(&buffer, 3..8);

        assert_eq!(chop.text(&store), "lo wo");
        assert_eq!(chop.fragment(&store), Fragment::plain("lo wo").with_tag(bold, 0..2));
        // The live buffer is untouched
        assert_eq!(buffer.text(), "hello world");
    }

    #[test]
    fn test_consecutive_captures_do_not_overlap() {
        let buffer = live_buffer();
        let mut store = SnippetStore::new();

        let first = store.capture(&buffer, 0..2);
        let second = store.capture(&buffer, 2..4);

        assert_eq!(first.range(&store), 0..2);
        assert_eq!(second.range(&store), 2..4);
        assert_eq!(store.text(), "hell");
    }

    #[test]
    fn test_extend_to_absorbs_following_chop() {
        let buffer = live_buffer();
        let mut store = SnippetStore::new();
        let mut first = store.capture(&buffer, 0..1);
        let second = store.capture(&buffer, 1..2);

        first.extend_to(&second, &mut store);
        second.destroy(&mut store);

        assert_eq!(first.text(&store), "he");
        assert_eq!(store.usage(), SnippetUsage { bytes: 2, marks: 2 });
    }

    #[test]
    fn test_splice_before_prepends_content() {
        let buffer = live_buffer();
        let mut store = SnippetStore::new();
        let target = store.capture(&buffer, 4..5);
        let source = store.capture(&buffer, 3..4);

        store.splice_before(&target, &source);

        assert_eq!(target.text(&store), "lo");
        assert_eq!(source.text(&store), "l");
        assert_eq!(store.text(), "lol");
    }

    #[test]
    fn test_erase_keeps_marks_until_destroy() {
        let buffer = live_buffer();
        let mut store = SnippetStore::new();
        let chop = store.capture(&buffer, 0..5);

        chop.erase(&mut store);
        assert!(chop.is_empty(&store));
        assert_eq!(store.usage(), SnippetUsage { bytes: 0, marks: 2 });

        chop.destroy(&mut store);
        assert_eq!(store.usage(), SnippetUsage::default());
    }

    #[test]
    fn test_erase_in_middle_shifts_later_chops() {
        let buffer = live_buffer();
        let mut store = SnippetStore::new();
        let first = store.capture(&buffer, 0..2);
        let second = store.capture(&buffer, 6..11);

        first.erase(&mut store);
        first.destroy(&mut store);

        assert_eq!(second.range(&store), 0..5);
        assert_eq!(second.text(&store), "world");
        assert_eq!(second.first_char(&store), Some('w'));
    }
}
