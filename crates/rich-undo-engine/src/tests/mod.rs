//! Shared helpers for unit tests

use crate::buffer::{RichBuffer, TextBuffer};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Type `text` at the cursor one character at a time, as a user would
pub fn type_text(buffer: &mut RichBuffer, text: &str) {
    for ch in text.chars() {
        let at = buffer.cursor();
        buffer.insert(at, ch.encode_utf8(&mut [0; 4]));
    }
}
