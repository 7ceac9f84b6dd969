//! Selection reconciliation.
//!
//! The host editor is reached through the [`Editor`] trait. [`classify`]
//! captures the current selections as live markers, and [`apply`] folds
//! results back into those markers inside one undo transaction.
//!
//! [`TextBuffer`] is an in-memory editor used by the CLI and by tests.

use std::collections::BTreeMap;

use thiserror::Error;

/// A byte range in the buffer, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// Create a range, swapping the ends if given backwards.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// A caret at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self { start: offset, end: offset }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Handle to a range that follows edits made through the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// The host editor's buffer and selection API.
pub trait Editor {
    /// Full buffer text.
    fn text(&self) -> String;

    /// Replace the whole buffer.
    fn set_text(&mut self, text: &str);

    /// Current selections in the host's order. Carets are empty ranges.
    fn selections(&self) -> Vec<TextRange>;

    /// Text covered by `range`.
    fn text_in_range(&self, range: TextRange) -> String;

    /// Replace the text covered by `range`.
    fn set_text_in_range(&mut self, range: TextRange, text: &str);

    /// Start tracking `range` across later edits.
    fn create_marker(&mut self, range: TextRange) -> MarkerId;

    /// Current range of a marker, `None` once destroyed.
    fn marker_range(&self, marker: MarkerId) -> Option<TextRange>;

    fn destroy_marker(&mut self, marker: MarkerId);

    /// Open an undo group. Calls nest.
    fn begin_transaction(&mut self);

    /// Close the innermost undo group.
    fn commit_transaction(&mut self);
}

/// Run `f` with every edit grouped into one undo step.
pub fn transact<E, T>(editor: &mut E, f: impl FnOnce(&mut E) -> T) -> T
where
    E: Editor + ?Sized,
{
    editor.begin_transaction();
    let result = f(editor);
    editor.commit_transaction();
    result
}

/// One captured selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Position in the host's selection order
    pub index: usize,

    /// Range at capture time
    pub range: TextRange,

    /// Live handle for the range
    pub marker: MarkerId,

    /// Text at capture time
    pub text: String,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Ordered selections captured before any command runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selections: Vec<Selection>,
}

impl SelectionSet {
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// True iff at least one selection covers text.
    pub fn has_selection(&self) -> bool {
        self.selections.iter().any(|s| !s.is_empty())
    }

    pub fn get(&self, index: usize) -> Option<&Selection> {
        self.selections.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter()
    }

    /// Selections that cover text, in order.
    pub fn non_empty(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter().filter(|s| !s.is_empty())
    }

    /// Stop tracking every captured range.
    pub fn release<E: Editor + ?Sized>(&self, editor: &mut E) {
        for selection in &self.selections {
            editor.destroy_marker(selection.marker);
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// True iff some selection is non-empty
    pub has_selection: bool,

    /// Every selection, empty ones included
    pub selections: SelectionSet,
}

/// Capture the editor's selections as markers and decide whether any of them
/// covers text. Callers fall back to the whole buffer when none does.
pub fn classify<E: Editor + ?Sized>(editor: &mut E) -> Classification {
    let selections: Vec<Selection> = editor
        .selections()
        .into_iter()
        .enumerate()
        .map(|(index, range)| Selection {
            index,
            range,
            marker: editor.create_marker(range),
            text: if range.is_empty() { String::new() } else { editor.text_in_range(range) },
        })
        .collect();

    let selections = SelectionSet { selections };
    Classification { has_selection: selections.has_selection(), selections }
}

/// Write `results[i]` into selection `i` for every non-empty selection, as
/// one undo step. Empty selections are left alone whatever `results` holds.
///
/// Returns the number of ranges written.
pub fn apply<E, S>(editor: &mut E, selections: &SelectionSet, results: &[S]) -> usize
where
    E: Editor + ?Sized,
    S: AsRef<str>,
{
    transact(editor, |editor| {
        let mut written = 0;
        for selection in selections.non_empty() {
            let Some(result) = results.get(selection.index) else {
                tracing::debug!(index = selection.index, "No result for selection");
                continue;
            };
            write_selection(editor, selection, result.as_ref());
            written += 1;
        }
        written
    })
}

/// Write one result into its selection's live range.
pub fn write_selection<E: Editor + ?Sized>(editor: &mut E, selection: &Selection, text: &str) {
    let range = editor.marker_range(selection.marker).unwrap_or(selection.range);
    editor.set_text_in_range(range, text);
}

/// A selection set the buffer refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRange {
    /// Out of bounds or splits a character.
    #[error("Range {}..{} is outside the text or not on a character boundary", .0.start, .0.end)]
    Boundary(TextRange),

    /// Two non-empty ranges share bytes.
    #[error("Ranges {}..{} and {}..{} overlap", .0.start, .0.end, .1.start, .1.end)]
    Overlap(TextRange, TextRange),
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    inserted_len: usize,
    removed: String,
}

/// In-memory [`Editor`] with marker tracking and grouped undo.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    text: String,
    selections: Vec<TextRange>,
    markers: BTreeMap<MarkerId, TextRange>,
    next_marker: u64,
    undo_stack: Vec<Vec<Edit>>,
    pending: Vec<Edit>,
    depth: usize,
}

impl TextBuffer {
    /// Create a buffer with a caret at the start.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), selections: vec![TextRange::caret(0)], ..Self::default() }
    }

    /// Replace the selections. Every range must lie on character boundaries
    /// and non-empty ranges must be disjoint. Touching ranges are fine.
    pub fn select(&mut self, ranges: Vec<TextRange>) -> Result<(), InvalidRange> {
        if let Some(&range) = ranges.iter().find(|r| !self.is_valid(**r)) {
            return Err(InvalidRange::Boundary(range));
        }

        let mut sorted: Vec<TextRange> =
            ranges.iter().copied().filter(|r| !r.is_empty()).collect();
        sorted.sort_by_key(|r| (r.start, r.end));
        if let Some(pair) = sorted.windows(2).find(|pair| pair[1].start < pair[0].end) {
            return Err(InvalidRange::Overlap(pair[0], pair[1]));
        }

        self.selections = ranges;
        Ok(())
    }

    /// Builder form of [`TextBuffer::select`].
    pub fn with_selections(mut self, ranges: Vec<TextRange>) -> Result<Self, InvalidRange> {
        self.select(ranges)?;
        Ok(self)
    }

    /// Revert the most recent undo group. Returns false if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(group) = self.undo_stack.pop() else {
            return false;
        };
        for edit in group.into_iter().rev() {
            let range = TextRange::new(edit.start, edit.start + edit.inserted_len);
            self.replace(range, &edit.removed);
        }
        true
    }

    /// Number of undo groups recorded.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    fn is_valid(&self, range: TextRange) -> bool {
        range.end <= self.text.len()
            && self.text.is_char_boundary(range.start)
            && self.text.is_char_boundary(range.end)
    }

    fn clamp(&self, range: TextRange) -> TextRange {
        TextRange::new(self.floor_boundary(range.start), self.floor_boundary(range.end))
    }

    fn floor_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Replace without recording undo, shifting markers and selections.
    fn replace(&mut self, range: TextRange, text: &str) -> String {
        let removed = self.text[range.start..range.end].to_string();
        self.text.replace_range(range.start..range.end, text);

        for marker in self.markers.values_mut() {
            *marker = shift(*marker, range, text.len());
        }
        for selection in &mut self.selections {
            *selection = shift(*selection, range, text.len());
        }
        removed
    }

    fn record(&mut self, edit: Edit) {
        if self.depth > 0 {
            self.pending.push(edit);
        } else {
            self.undo_stack.push(vec![edit]);
        }
    }
}

/// Map `range` across an edit that replaced `edited` with `inserted` bytes.
fn shift(range: TextRange, edited: TextRange, inserted: usize) -> TextRange {
    let edited_end_after = edited.start + inserted;
    let moved = |offset: usize| offset - edited.end + edited_end_after;

    let start = if range.start < edited.start {
        range.start
    } else if range.start >= edited.end {
        moved(range.start)
    } else {
        edited.start
    };
    let end = if range.end >= edited.end && range.end > edited.start {
        moved(range.end)
    } else if range.end <= edited.start {
        range.end
    } else {
        edited_end_after
    };

    TextRange { start, end: end.max(start) }
}

impl Editor for TextBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        let whole = TextRange::new(0, self.text.len());
        self.set_text_in_range(whole, text);
    }

    fn selections(&self) -> Vec<TextRange> {
        self.selections.clone()
    }

    fn text_in_range(&self, range: TextRange) -> String {
        let range = self.clamp(range);
        self.text[range.start..range.end].to_string()
    }

    fn set_text_in_range(&mut self, range: TextRange, text: &str) {
        let range = self.clamp(range);
        let removed = self.replace(range, text);
        self.record(Edit { start: range.start, inserted_len: text.len(), removed });
    }

    fn create_marker(&mut self, range: TextRange) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        let range = self.clamp(range);
        self.markers.insert(id, range);
        id
    }

    fn marker_range(&self, marker: MarkerId) -> Option<TextRange> {
        self.markers.get(&marker).copied()
    }

    fn destroy_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
    }

    fn begin_transaction(&mut self) {
        self.depth += 1;
    }

    fn commit_transaction(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0 && !self.pending.is_empty() {
            let group = std::mem::take(&mut self.pending);
            self.undo_stack.push(group);
        }
    }
}
