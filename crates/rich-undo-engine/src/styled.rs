use std::borrow::Cow;
use std::ops::Range;

use serde::Serialize;
use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::marks::{Gravity, MarkId, MarkSet};
use crate::tags::TagId;

/// A tag applied over `[start, end)`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagRun {
    pub tag: TagId,
    pub start: usize,
    pub end: usize,
}

impl TagRun {
    pub fn new(tag: TagId, range: Range<usize>) -> Self {
        Self {
            tag,
            start: range.start,
            end: range.end,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Formatted text detached from any buffer; run offsets are relative to `text`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub text: String,
    pub runs: Vec<TagRun>,
}

impl Fragment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            runs: Vec::new(),
        }
    }

    /// Add a run; the run is clipped to the text
    pub fn with_tag(mut self, tag: TagId, range: Range<usize>) -> Self {
        let end = range.end.min(self.text.len());
        let start = range.start.min(end);
        self.runs.push(TagRun::new(tag, start..end));
        normalize_runs(&mut self.runs);
        self
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Rope-backed formatted text with its own mark table
///
/// Shared by the live buffer and the snippet store. Tag runs are kept
/// normalized: per tag they are sorted, non-empty and never overlap or
/// touch, so equal content always compares equal.
#[derive(Clone, Default)]
pub struct StyledText {
    rope: Rope,
    runs: Vec<TagRun>,
    marks: MarkSet,
}

impl StyledText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragment(fragment: &Fragment) -> Self {
        let mut text = Self::new();
        text.insert_fragment(0, fragment);
        text
    }

    pub fn len(&self) -> usize {
        self.rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len() == 0
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn runs(&self) -> &[TagRun] {
        &self.runs
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn marks_mut(&mut self) -> &mut MarkSet {
        &mut self.marks
    }

    pub fn create_mark(&mut self, offset: usize, gravity: Gravity) -> MarkId {
        let offset = self.clamp(offset);
        self.marks.create(offset, gravity)
    }

    /// Clamp an offset to the text and snap it back onto a char boundary
    pub fn clamp(&self, offset: usize) -> usize {
        let len = self.rope.len();
        let mut offset = offset.min(len);
        while offset > 0 && offset < len && is_continuation_byte(self.rope.byte_at(offset)) {
            offset -= 1;
        }
        offset
    }

    pub fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.clamp(range.start);
        let end = self.clamp(range.end).max(start);
        start..end
    }

    pub fn slice(&self, range: Range<usize>) -> Cow<'_, str> {
        let range = self.clamp_range(range);
        self.rope.slice_to_cow(range)
    }

    pub fn fragment(&self, range: Range<usize>) -> Fragment {
        let range = self.clamp_range(range);
        let runs = self
            .runs
            .iter()
            .filter_map(|run| {
                let start = run.start.max(range.start);
                let end = run.end.min(range.end);
                (start < end).then(|| TagRun::new(run.tag, start - range.start..end - range.start))
            })
            .collect();
        Fragment {
            text: self.rope.slice_to_cow(range).into_owned(),
            runs,
        }
    }

    /// Insert formatted text; returns the offset the text landed at
    pub fn insert_fragment(&mut self, at: usize, fragment: &Fragment) -> usize {
        let at = self.clamp(at);
        let inserted = fragment.text.len();
        if inserted == 0 {
            return at;
        }

        let mut builder = Builder::new(self.rope.len());
        builder.replace(at..at, Rope::from(fragment.text.as_str()));
        self.rope = builder.build().apply(&self.rope);

        // Plain insertion splits any run it lands inside
        let mut runs = Vec::with_capacity(self.runs.len() + fragment.runs.len() + 1);
        for run in &self.runs {
            if run.start >= at {
                runs.push(TagRun::new(run.tag, run.start + inserted..run.end + inserted));
            } else if run.end > at {
                runs.push(TagRun::new(run.tag, run.start..at));
                runs.push(TagRun::new(run.tag, at + inserted..run.end + inserted));
            } else {
                runs.push(*run);
            }
        }
        runs.extend(
            fragment
                .runs
                .iter()
                .map(|run| TagRun::new(run.tag, run.start + at..run.end + at)),
        );
        normalize_runs(&mut runs);
        self.runs = runs;

        self.marks.adjust_for_insert(at, inserted);
        at
    }

    pub fn delete(&mut self, range: Range<usize>) -> Range<usize> {
        let range = self.clamp_range(range);
        if range.is_empty() {
            return range;
        }

        let mut builder = Builder::new(self.rope.len());
        builder.delete(range.clone());
        self.rope = builder.build().apply(&self.rope);

        let map = |offset: usize| {
            if offset >= range.end {
                offset - range.len()
            } else {
                offset.min(range.start)
            }
        };
        for run in &mut self.runs {
            run.start = map(run.start);
            run.end = map(run.end);
        }
        normalize_runs(&mut self.runs);

        self.marks.adjust_for_delete(range.clone());
        range
    }

    pub fn apply_tag(&mut self, tag: TagId, range: Range<usize>) -> Range<usize> {
        let range = self.clamp_range(range);
        if !range.is_empty() {
            self.runs.push(TagRun::new(tag, range.clone()));
            normalize_runs(&mut self.runs);
        }
        range
    }

    pub fn remove_tag(&mut self, tag: TagId, range: Range<usize>) -> Range<usize> {
        let range = self.clamp_range(range);
        if range.is_empty() {
            return range;
        }
        let mut runs = Vec::with_capacity(self.runs.len() + 1);
        for run in &self.runs {
            if run.tag != tag || run.end <= range.start || run.start >= range.end {
                runs.push(*run);
                continue;
            }
            if run.start < range.start {
                runs.push(TagRun::new(tag, run.start..range.start));
            }
            if run.end > range.end {
                runs.push(TagRun::new(tag, range.end..run.end));
            }
        }
        self.runs = runs;
        normalize_runs(&mut self.runs);
        range
    }

    /// Parts of `range` carrying `tag`, in order
    pub fn tagged_parts(&self, tag: TagId, range: Range<usize>) -> Vec<Range<usize>> {
        let range = self.clamp_range(range);
        self.runs
            .iter()
            .filter(|run| run.tag == tag)
            .filter_map(|run| {
                let start = run.start.max(range.start);
                let end = run.end.min(range.end);
                (start < end).then_some(start..end)
            })
            .collect()
    }

    /// Parts of `range` not carrying `tag`, in order
    pub fn untagged_parts(&self, tag: TagId, range: Range<usize>) -> Vec<Range<usize>> {
        let range = self.clamp_range(range);
        let mut gaps = Vec::new();
        let mut at = range.start;
        for part in self.tagged_parts(tag, range.clone()) {
            if part.start > at {
                gaps.push(at..part.start);
            }
            at = part.end;
        }
        if at < range.end {
            gaps.push(at..range.end);
        }
        gaps
    }

    /// Whether `tag` covers every byte of `range`
    pub fn has_tag(&self, tag: TagId, range: Range<usize>) -> bool {
        self.runs
            .iter()
            .any(|run| run.tag == tag && run.start <= range.start && run.end >= range.end)
    }
}

impl std::fmt::Debug for StyledText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyledText")
            .field("text", &self.text())
            .field("runs", &self.runs)
            .field("marks", &self.marks.len())
            .finish()
    }
}

fn is_continuation_byte(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Sort runs and coalesce overlapping or touching runs of the same tag
pub(crate) fn normalize_runs(runs: &mut Vec<TagRun>) {
    runs.retain(|run| run.start < run.end);
    runs.sort_by_key(|run| (run.tag, run.start, run.end));

    let mut merged: Vec<TagRun> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        match merged.last_mut() {
            Some(last) if last.tag == run.tag && run.start <= last.end => {
                last.end = last.end.max(run.end);
            }
            _ => merged.push(run),
        }
    }
    *runs = merged;
}
