use crate::buffer::TextBuffer;
use crate::tags::TagId;
use crate::undo::chop::{Chop, SnippetStore};

/// One undo step
///
/// Each variant knows how to invert and reapply itself against the live
/// buffer, and whether it can absorb the action recorded right after it.
#[derive(Debug)]
pub enum EditAction {
    Insert(InsertAction),
    Erase(EraseAction),
    TagApply(TagAction),
    TagRemove(TagAction),
}

impl EditAction {
    pub fn undo(&self, buffer: &mut dyn TextBuffer, store: &SnippetStore) {
        match self {
            EditAction::Insert(insert) => insert.undo(buffer, store),
            EditAction::Erase(erase) => erase.undo(buffer, store),
            EditAction::TagApply(action) => action.remove(buffer),
            EditAction::TagRemove(action) => action.apply(buffer),
        }
    }

    pub fn redo(&self, buffer: &mut dyn TextBuffer, store: &SnippetStore) {
        match self {
            EditAction::Insert(insert) => insert.redo(buffer, store),
            EditAction::Erase(erase) => erase.redo(buffer),
            EditAction::TagApply(action) => action.apply(buffer),
            EditAction::TagRemove(action) => action.remove(buffer),
        }
    }

    /// Whether `other`, recorded right after `self`, can be folded into it
    pub fn can_merge(&self, other: &EditAction, store: &SnippetStore) -> bool {
        match (self, other) {
            (EditAction::Insert(insert), EditAction::Insert(next)) => {
                insert.can_merge(next, store)
            }
            (EditAction::Erase(erase), EditAction::Erase(next)) => erase.can_merge(next, store),
            _ => false,
        }
    }

    /// Fold `other` into `self`, releasing whatever `other` no longer needs
    ///
    /// # Panics
    ///
    /// Tag actions never merge, and neither do actions of different kinds;
    /// calling this without a successful [`EditAction::can_merge`] is a bug.
    pub fn merge(&mut self, other: EditAction, store: &mut SnippetStore) {
        match (self, other) {
            (EditAction::Insert(insert), EditAction::Insert(next)) => insert.merge(next, store),
            (EditAction::Erase(erase), EditAction::Erase(next)) => erase.merge(next, store),
            (EditAction::TagApply(_) | EditAction::TagRemove(_), _) => {
                panic!("TagApply/TagRemove actions cannot be merged")
            }
            (this, other) => panic!(
                "cannot merge {} action into {} action",
                other.kind(),
                this.kind()
            ),
        }
    }

    /// Release the action's storage in the snippet store
    pub fn destroy(self, store: &mut SnippetStore) {
        match self {
            EditAction::Insert(insert) => insert.destroy(store),
            EditAction::Erase(erase) => erase.destroy(store),
            EditAction::TagApply(_) | EditAction::TagRemove(_) => {}
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EditAction::Insert(_) => "Insert",
            EditAction::Erase(_) => "Erase",
            EditAction::TagApply(_) => "TagApply",
            EditAction::TagRemove(_) => "TagRemove",
        }
    }
}

/// True when `chop` begins a new line
fn starts_line(chop: &Chop, store: &SnippetStore) -> bool {
    chop.first_char(store) == Some('\n')
}

/// Typed steps never span a line: a newline closes the step before it and opens its own
fn crosses_line(top: &Chop, next: &Chop, store: &SnippetStore) -> bool {
    starts_line(top, store) || starts_line(next, store)
}

/// True when merging `chop` would join two words
fn starts_word(chop: &Chop, store: &SnippetStore) -> bool {
    matches!(chop.first_char(store), Some(' ' | '\t'))
}

/// A contiguous insertion
#[derive(Debug)]
pub struct InsertAction {
    index: usize,
    is_paste: bool,
    chop: Chop,
}

impl InsertAction {
    /// Record `text` (of `length` characters) that was just inserted, ending at `end`
    pub fn new(
        buffer: &dyn TextBuffer,
        end: usize,
        text: &str,
        length: usize,
        store: &mut SnippetStore,
    ) -> Self {
        let index = end.saturating_sub(text.len());
        Self {
            index,
            // Single characters are assumed typed, anything longer pasted
            is_paste: length > 1,
            chop: store.capture(buffer, index..end),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_paste(&self) -> bool {
        self.is_paste
    }

    pub fn text(&self, store: &SnippetStore) -> String {
        self.chop.text(store)
    }

    fn undo(&self, buffer: &mut dyn TextBuffer, store: &SnippetStore) {
        let end = self.index + self.chop.len(store);
        buffer.delete(self.index..end);
        buffer.set_cursor(self.index);
        buffer.set_selection_bound(self.index);
    }

    fn redo(&self, buffer: &mut dyn TextBuffer, store: &SnippetStore) {
        buffer.insert_fragment(self.index, &self.chop.fragment(store));
        buffer.set_selection_bound(self.index);
        buffer.set_cursor(self.index + self.chop.len(store));
    }

    fn can_merge(&self, next: &InsertAction, store: &SnippetStore) -> bool {
        if self.is_paste || next.is_paste {
            return false;
        }
        // The new text must start right where this one ends
        if next.index != self.index + self.chop.len(store) {
            return false;
        }
        !crosses_line(&self.chop, &next.chop, store) && !starts_word(&next.chop, store)
    }

    fn merge(&mut self, next: InsertAction, store: &mut SnippetStore) {
        self.chop.extend_to(&next.chop, store);
        next.chop.destroy(store);
    }

    fn destroy(self, store: &mut SnippetStore) {
        self.chop.erase(store);
        self.chop.destroy(store);
    }
}

/// A contiguous deletion
#[derive(Debug)]
pub struct EraseAction {
    start: usize,
    end: usize,
    is_forward: bool,
    is_cut: bool,
    chop: Chop,
}

impl EraseAction {
    /// Record `[start, end)` of `buffer`, which is about to be deleted
    pub fn new(buffer: &dyn TextBuffer, start: usize, end: usize, store: &mut SnippetStore) -> Self {
        let chop = store.capture(buffer, start..end);
        Self {
            start,
            end,
            // Deleting at or after the cursor is the Delete key, before it Backspace
            is_forward: buffer.cursor() <= start,
            is_cut: chop.text(store).chars().count() > 1,
            chop,
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    pub fn is_forward(&self) -> bool {
        self.is_forward
    }

    pub fn is_cut(&self) -> bool {
        self.is_cut
    }

    pub fn text(&self, store: &SnippetStore) -> String {
        self.chop.text(store)
    }

    fn undo(&self, buffer: &mut dyn TextBuffer, store: &SnippetStore) {
        buffer.insert_fragment(self.start, &self.chop.fragment(store));
        let (cursor, bound) = if self.is_forward {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        buffer.set_cursor(cursor);
        buffer.set_selection_bound(bound);
    }

    fn redo(&self, buffer: &mut dyn TextBuffer) {
        buffer.delete(self.start..self.end);
        buffer.set_cursor(self.start);
        buffer.set_selection_bound(self.start);
    }

    fn can_merge(&self, next: &EraseAction, store: &SnippetStore) -> bool {
        if self.is_cut || next.is_cut {
            return false;
        }
        let anchor = if self.is_forward { next.start } else { next.end };
        if self.start != anchor {
            return false;
        }
        // Never group Delete runs with Backspace runs
        if self.is_forward != next.is_forward {
            return false;
        }
        !starts_line(&self.chop, store) && !starts_word(&next.chop, store)
    }

    fn merge(&mut self, next: EraseAction, store: &mut SnippetStore) {
        if self.start == next.start {
            // Delete key: the text after the anchor keeps disappearing
            self.end += next.end - next.start;
            self.chop.extend_to(&next.chop, store);
            next.chop.destroy(store);
        } else {
            // Backspace: the anchor walks backwards
            self.start = next.start;
            store.splice_before(&self.chop, &next.chop);
            next.destroy(store);
        }
    }

    fn destroy(self, store: &mut SnippetStore) {
        self.chop.erase(store);
        self.chop.destroy(store);
    }
}

/// A tag applied to or removed from `[start, end)`
///
/// Applying and removing a tag are exact inverses given the range, so no
/// content is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAction {
    tag: TagId,
    start: usize,
    end: usize,
}

impl TagAction {
    pub fn new(tag: TagId, start: usize, end: usize) -> Self {
        Self { tag, start, end }
    }

    pub fn tag(&self) -> TagId {
        self.tag
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    fn apply(&self, buffer: &mut dyn TextBuffer) {
        buffer.set_selection_bound(self.start);
        buffer.apply_tag(self.tag, self.range());
        buffer.set_cursor(self.end);
    }

    fn remove(&self, buffer: &mut dyn TextBuffer) {
        buffer.set_selection_bound(self.start);
        buffer.remove_tag(self.tag, self.range());
        buffer.set_cursor(self.end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RichBuffer;
    use crate::undo::chop::SnippetUsage;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn typed(buffer: &mut RichBuffer, store: &mut SnippetStore, text: &str) -> EditAction {
        let at = buffer.cursor();
        buffer.insert(at, text);
        let end = at + text.len();
        EditAction::Insert(InsertAction::new(
            &*buffer,
            end,
            text,
            text.chars().count(),
            store,
        ))
    }

    fn erased(
        buffer: &mut RichBuffer,
        store: &mut SnippetStore,
        range: std::ops::Range<usize>,
    ) -> EditAction {
        let action = EditAction::Erase(EraseAction::new(&*buffer, range.start, range.end, store));
        buffer.delete(range);
        action
    }

    #[test]
    fn test_insert_undo_and_redo() {
        let mut buffer = RichBuffer::from_bytes(b"ac").unwrap();
        let mut store = SnippetStore::new();
        buffer.place_cursor(1);
        let action = typed(&mut buffer, &mut store, "b");

        action.undo(&mut buffer, &store);
        assert_eq!(buffer.text(), "ac");
        assert_eq!(buffer.selection(), 1..1);

        action.redo(&mut buffer, &store);
        assert_eq!(buffer.text(), "abc");
        assert_eq!(buffer.selection_bound(), 1);
        assert_eq!(buffer.cursor(), 2);
    }

    #[test]
    fn test_paste_is_flagged() {
        let mut buffer = RichBuffer::from_bytes(b"").unwrap();
        let mut store = SnippetStore::new();

        let EditAction::Insert(action) = typed(&mut buffer, &mut store, "hello") else {
            panic!("expected an insert action");
        };

        assert!(action.is_paste());
        assert_eq!(action.index(), 0);
        assert_eq!(action.text(&store), "hello");
    }

    #[rstest]
    #[case("a", "b", true)]
    #[case("a", " ", false)]
    #[case("a", "\t", false)]
    #[case(" ", "b", true)]
    #[case("\n", "b", false)]
    #[case("a", "\n", false)]
    #[case("a", "bc", false)]
    fn test_insert_merge_boundaries(
        #[case] first: &str,
        #[case] second: &str,
        #[case] expected: bool,
    ) {
        let mut buffer = RichBuffer::from_bytes(b"").unwrap();
        let mut store = SnippetStore::new();
        let top = typed(&mut buffer, &mut store, first);
        let next = typed(&mut buffer, &mut store, second);

        assert_eq!(top.can_merge(&next, &store), expected);
    }

    #[test]
    fn test_insert_merge_requires_adjacency() {
        let mut buffer = RichBuffer::from_bytes(b"xyz").unwrap();
        let mut store = SnippetStore::new();
        buffer.place_cursor(0);
        let top = typed(&mut buffer, &mut store, "a");
        buffer.place_cursor(3);
        let next = typed(&mut buffer, &mut store, "b");

        assert!(!top.can_merge(&next, &store));
    }

    #[test]
    fn test_insert_merge_grows_chop() {
        let mut buffer = RichBuffer::from_bytes(b"").unwrap();
        let mut store = SnippetStore::new();
        let mut top = typed(&mut buffer, &mut store, "h");
        let next = typed(&mut buffer, &mut store, "i");

        top.merge(next, &mut store);
        top.undo(&mut buffer, &store);

        assert_eq!(buffer.text(), "");
        assert_eq!(store.usage(), SnippetUsage { bytes: 2, marks: 2 });
    }

    #[test]
    fn test_backspace_merge_prepends_text() {
        let mut buffer = RichBuffer::from_bytes(b"abcd").unwrap();
        let mut store = SnippetStore::new();
        buffer.place_cursor(4);
        let mut top = erased(&mut buffer, &mut store, 3..4);
        let next = erased(&mut buffer, &mut store, 2..3);

        assert!(top.can_merge(&next, &store));
        top.merge(next, &mut store);

        let EditAction::Erase(erase) = &top else {
            panic!("expected an erase action");
        };
        assert_eq!(erase.range(), 2..4);
        assert!(!erase.is_forward());
        assert_eq!(erase.text(&store), "cd");
        // The merged-in chop is fully released
        assert_eq!(store.usage(), SnippetUsage { bytes: 2, marks: 2 });

        top.undo(&mut buffer, &store);
        assert_eq!(buffer.text(), "abcd");
        assert_eq!(buffer.cursor(), 4);
        assert_eq!(buffer.selection_bound(), 2);
    }

    #[test]
    fn test_forward_delete_merge_extends_end() {
        let mut buffer = RichBuffer::from_bytes(b"abcd").unwrap();
        let mut store = SnippetStore::new();
        buffer.place_cursor(1);
        let mut top = erased(&mut buffer, &mut store, 1..2);
        let next = erased(&mut buffer, &mut store, 1..2);

        assert!(top.can_merge(&next, &store));
        top.merge(next, &mut store);

        let EditAction::Erase(erase) = &top else {
            panic!("expected an erase action");
        };
        assert_eq!(erase.range(), 1..3);
        assert!(erase.is_forward());
        assert_eq!(erase.text(&store), "bc");

        top.undo(&mut buffer, &store);
        assert_eq!(buffer.text(), "abcd");
        assert_eq!(buffer.cursor(), 1);
        assert_eq!(buffer.selection_bound(), 3);

        top.redo(&mut buffer, &store);
        assert_eq!(buffer.text(), "ad");
        assert_eq!(buffer.selection(), 1..1);
    }

    #[test]
    fn test_erase_directions_never_merge() {
        let mut buffer = RichBuffer::from_bytes(b"abcd").unwrap();
        let mut store = SnippetStore::new();
        buffer.place_cursor(2);
        // Backspace removes "b", cursor lands on 1, then Delete removes "c"
        let top = erased(&mut buffer, &mut store, 1..2);
        let next = erased(&mut buffer, &mut store, 1..2);

        assert!(!top.can_merge(&next, &store));
    }

    #[test]
    fn test_cut_never_merges() {
        let mut buffer = RichBuffer::from_bytes(b"abcdef").unwrap();
        let mut store = SnippetStore::new();
        buffer.place_cursor(2);
        let top = erased(&mut buffer, &mut store, 2..4);
        let next = erased(&mut buffer, &mut store, 2..3);

        let EditAction::Erase(erase) = &top else {
            panic!("expected an erase action");
        };
        assert!(erase.is_cut());
        assert!(!top.can_merge(&next, &store));
    }

    #[test]
    fn test_tag_actions_invert_each_other() {
        let mut buffer = RichBuffer::from_bytes(b"hello").unwrap();
        let bold = buffer.tag_table().lookup("bold").unwrap();
        let store = SnippetStore::new();
        buffer.apply_tag(bold, 1..4);
        let action = EditAction::TagApply(TagAction::new(bold, 1, 4));

        action.undo(&mut buffer, &store);
        assert!(!buffer.has_tag(bold, 1..4));
        assert_eq!(buffer.selection_bound(), 1);
        assert_eq!(buffer.cursor(), 4);

        action.redo(&mut buffer, &store);
        assert!(buffer.has_tag(bold, 1..4));
    }

    #[test]
    fn test_tag_actions_never_merge() {
        let bold = TagId(0);
        let store = SnippetStore::new();
        let first = EditAction::TagApply(TagAction::new(bold, 0, 2));
        let second = EditAction::TagApply(TagAction::new(bold, 2, 4));

        assert!(!first.can_merge(&second, &store));
    }

    #[test]
    #[should_panic(expected = "TagApply/TagRemove actions cannot be merged")]
    fn test_tag_action_merge_panics() {
        let mut store = SnippetStore::new();
        let mut first = EditAction::TagRemove(TagAction::new(TagId(0), 0, 2));

        first.merge(EditAction::TagRemove(TagAction::new(TagId(0), 2, 4)), &mut store);
    }

    #[test]
    #[should_panic(expected = "cannot merge Erase action into Insert action")]
    fn test_mismatched_merge_panics() {
        let mut buffer = RichBuffer::from_bytes(b"ab").unwrap();
        let mut store = SnippetStore::new();
        let mut top = typed(&mut buffer, &mut store, "x");
        let next = erased(&mut buffer, &mut store, 0..1);

        top.merge(next, &mut store);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut buffer = RichBuffer::from_bytes(b"abc").unwrap();
        let mut store = SnippetStore::new();
        let insert = typed(&mut buffer, &mut store, "x");
        let erase = erased(&mut buffer, &mut store, 0..2);

        insert.destroy(&mut store);
        erase.destroy(&mut store);

        assert_eq!(store.usage(), SnippetUsage::default());
    }
}
