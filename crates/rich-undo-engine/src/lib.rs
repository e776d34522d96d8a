pub mod buffer;
pub mod marks;
pub mod styled;
pub mod tags;
pub mod undo;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use buffer::{EditObserver, ObservableBuffer, ObserverId, RichBuffer, TextBuffer};
pub use marks::{Gravity, MarkId, MarkSet};
pub use styled::{Fragment, StyledText, TagRun};
pub use tags::{TagError, TagId, TagTable};
pub use undo::{FreezeGuard, HandlerId, UndoManager, UndoOptions, UndoStatus};
