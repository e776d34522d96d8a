//! Undo/redo history for a formatted-text buffer
//!
//! An [`UndoManager`] registers itself as an [`EditObserver`] on one buffer,
//! turns every reported edit into an [`EditAction`], and coalesces typing
//! into word-sized steps. Replaying an action edits the same buffer, so the
//! manager freezes itself around replays and ignores what it hears while
//! frozen.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::buffer::{EditObserver, ObservableBuffer, ObserverId, TextBuffer};
use crate::tags::TagId;

pub mod action;
pub mod chop;

pub use action::{EditAction, EraseAction, InsertAction, TagAction};
pub use chop::{Chop, SnippetStore, SnippetUsage};

/// Whether there is anything to undo or redo, as passed to change handlers
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UndoStatus {
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UndoOptions {
    /// Fold consecutive typing and deleting into single steps
    pub coalesce: bool,
}

impl Default for UndoOptions {
    fn default() -> Self {
        Self { coalesce: true }
    }
}

/// Registration handle returned by [`UndoManager::connect_undo_changed`]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct HandlerId(u64);

#[derive(Debug, Default)]
struct Stacks {
    undo: Vec<EditAction>,
    redo: Vec<EditAction>,
    /// The top of `undo` may absorb the next compatible edit
    merge_armed: bool,
}

impl Stacks {
    fn release_all(&mut self, store: &mut SnippetStore) {
        for action in self.undo.drain(..).chain(self.redo.drain(..)) {
            action.destroy(store);
        }
        self.merge_armed = false;
    }
}

type ChangeHandler = Rc<dyn Fn(UndoStatus)>;

pub struct UndoManager {
    frozen: Cell<u32>,
    stacks: RefCell<Stacks>,
    store: RefCell<SnippetStore>,
    options: UndoOptions,
    handlers: RefCell<Vec<(HandlerId, ChangeHandler)>>,
    next_handler: Cell<u64>,
    observer: Cell<Option<ObserverId>>,
}

impl UndoManager {
    pub fn new(options: UndoOptions) -> Self {
        Self {
            frozen: Cell::new(0),
            stacks: RefCell::new(Stacks::default()),
            store: RefCell::new(SnippetStore::new()),
            options,
            handlers: RefCell::new(Vec::new()),
            next_handler: Cell::new(0),
            observer: Cell::new(None),
        }
    }

    /// Start recording the edits of `buffer`
    pub fn attach(buffer: &mut impl ObservableBuffer) -> Rc<Self> {
        Self::with_options(buffer, UndoOptions::default())
    }

    pub fn with_options(buffer: &mut impl ObservableBuffer, options: UndoOptions) -> Rc<Self> {
        let manager = Rc::new(Self::new(options));
        let observer: Rc<dyn EditObserver> = manager.clone();
        manager.observer.set(Some(buffer.connect(observer)));
        log::debug!("Undo manager attached ({options:?})");
        manager
    }

    /// Stop recording; history recorded so far stays usable
    pub fn detach(&self, buffer: &mut impl ObservableBuffer) -> bool {
        match self.observer.take() {
            Some(id) => {
                log::debug!("Undo manager detached");
                buffer.disconnect(id)
            }
            None => false,
        }
    }

    pub fn options(&self) -> UndoOptions {
        self.options
    }

    /// Revert the most recent step; does nothing when there is none
    pub fn undo(&self, buffer: &mut dyn TextBuffer) {
        self.replay(buffer, Direction::Undo);
    }

    /// Reapply the most recently undone step; does nothing when there is none
    pub fn redo(&self, buffer: &mut dyn TextBuffer) {
        self.replay(buffer, Direction::Redo);
    }

    pub fn can_undo(&self) -> bool {
        !self.stacks.borrow().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.stacks.borrow().redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.stacks.borrow().undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.stacks.borrow().redo.len()
    }

    pub fn status(&self) -> UndoStatus {
        let stacks = self.stacks.borrow();
        UndoStatus {
            can_undo: !stacks.undo.is_empty(),
            can_redo: !stacks.redo.is_empty(),
        }
    }

    /// Ignore edits until the matching [`UndoManager::thaw_undo`]; nests
    pub fn freeze_undo(&self) {
        self.frozen.set(self.frozen.get() + 1);
    }

    pub fn thaw_undo(&self) {
        let frozen = self.frozen.get();
        debug_assert!(frozen > 0, "thaw_undo called without a matching freeze_undo");
        self.frozen.set(frozen.saturating_sub(1));
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get() > 0
    }

    /// Freeze until the returned guard is dropped
    pub fn frozen(&self) -> FreezeGuard<'_> {
        self.freeze_undo();
        FreezeGuard { manager: self }
    }

    /// Drop every undo and redo step
    pub fn clear_undo_history(&self) {
        {
            let mut stacks = self.stacks.borrow_mut();
            let mut store = self.store.borrow_mut();
            let cleared = stacks.undo.len() + stacks.redo.len();
            stacks.release_all(&mut store);
            log::debug!("Cleared undo history ({cleared} steps)");
        }
        self.emit_changed();
    }

    /// Call `handler` whenever undo or redo becomes available or unavailable
    pub fn connect_undo_changed(&self, handler: impl Fn(UndoStatus) + 'static) -> HandlerId {
        let id = HandlerId(self.next_handler.get());
        self.next_handler.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    pub fn disconnect_undo_changed(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Storage currently retained by the history
    pub fn snippet_usage(&self) -> SnippetUsage {
        self.store.borrow().usage()
    }

    fn replay(&self, buffer: &mut dyn TextBuffer, direction: Direction) {
        let action = {
            let mut stacks = self.stacks.borrow_mut();
            let from = match direction {
                Direction::Undo => &mut stacks.undo,
                Direction::Redo => &mut stacks.redo,
            };
            match from.pop() {
                Some(action) => action,
                None => return,
            }
        };

        log::debug!("{direction:?} {} action", action.kind());
        {
            let _frozen = self.frozen();
            let store = self.store.borrow();
            match direction {
                Direction::Undo => action.undo(buffer, &store),
                Direction::Redo => action.redo(buffer, &store),
            }
        }

        let changed = {
            let mut stacks = self.stacks.borrow_mut();
            let stacks = &mut *stacks;
            let (from, to) = match direction {
                Direction::Undo => (&stacks.undo, &mut stacks.redo),
                Direction::Redo => (&stacks.redo, &mut stacks.undo),
            };
            to.push(action);
            let changed = from.is_empty() || to.len() == 1;
            stacks.merge_armed = false;
            changed
        };
        if changed {
            self.emit_changed();
        }
    }

    /// Merge `build`'s action into the top step or push it as a new one
    fn record(&self, build: impl FnOnce(&mut SnippetStore) -> EditAction) {
        let changed = {
            let mut store = self.store.borrow_mut();
            let store = &mut *store;
            let mut stacks = self.stacks.borrow_mut();
            let action = build(&mut *store);

            if self.options.coalesce && stacks.merge_armed {
                if let Some(top) = stacks.undo.last_mut() {
                    if top.can_merge(&action, store) {
                        log::trace!("Merging {} action into undo step", action.kind());
                        top.merge(action, store);
                        return;
                    }
                }
            }

            log::trace!("Pushing {} action", action.kind());
            stacks.undo.push(action);
            stacks.merge_armed = true;

            let had_redo = !stacks.redo.is_empty();
            for stale in stacks.redo.drain(..) {
                stale.destroy(store);
            }
            stacks.undo.len() == 1 || had_redo
        };
        if changed {
            self.emit_changed();
        }
    }

    fn emit_changed(&self) {
        let status = self.status();
        // Handlers may query the manager, so nothing stays borrowed while they run
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(status);
        }
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(UndoOptions::default())
    }
}

impl EditObserver for UndoManager {
    fn on_insert_text(&self, buffer: &dyn TextBuffer, end: usize, text: &str, length: usize) {
        if self.is_frozen() {
            return;
        }
        self.record(|store| EditAction::Insert(InsertAction::new(buffer, end, text, length, store)));
    }

    fn on_delete_range(&self, buffer: &dyn TextBuffer, start: usize, end: usize) {
        if self.is_frozen() {
            return;
        }
        self.record(|store| EditAction::Erase(EraseAction::new(buffer, start, end, store)));
    }

    fn on_tag_applied(&self, buffer: &dyn TextBuffer, tag: TagId, start: usize, end: usize) {
        if self.is_frozen() || !buffer.tag_table().is_undoable(tag) {
            return;
        }
        self.record(|_| EditAction::TagApply(TagAction::new(tag, start, end)));
    }

    fn on_tag_removed(&self, buffer: &dyn TextBuffer, tag: TagId, start: usize, end: usize) {
        if self.is_frozen() || !buffer.tag_table().is_undoable(tag) {
            return;
        }
        self.record(|_| EditAction::TagRemove(TagAction::new(tag, start, end)));
    }
}

impl Drop for UndoManager {
    fn drop(&mut self) {
        self.stacks.get_mut().release_all(self.store.get_mut());
    }
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("frozen", &self.frozen.get())
            .field("undo_depth", &self.undo_depth())
            .field("redo_depth", &self.redo_depth())
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Copy, Clone, Debug)]
enum Direction {
    Undo,
    Redo,
}

/// Keeps an [`UndoManager`] frozen while alive
#[must_use = "the manager thaws as soon as the guard is dropped"]
pub struct FreezeGuard<'a> {
    manager: &'a UndoManager,
}

impl Drop for FreezeGuard<'_> {
    fn drop(&mut self) {
        self.manager.thaw_undo();
    }
}
