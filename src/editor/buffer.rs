//! Text buffer with splice bookkeeping.
//!
//! Every mutation reports a [`Splice`] describing which bytes were replaced,
//! so offsets held elsewhere (the AI insertion anchor, an edit span) can be
//! remapped instead of going stale.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("range {start}..{end} out of bounds for buffer of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// Bytes `start..start + removed` were replaced by `inserted` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl Splice {
    fn end(self) -> usize {
        self.start + self.removed
    }

    /// Remap an offset, staying before text inserted exactly at it.
    #[must_use]
    pub fn map_left(self, pos: usize) -> usize {
        if pos <= self.start {
            pos
        } else if pos >= self.end() {
            pos - self.removed + self.inserted
        } else {
            self.start + self.inserted
        }
    }

    /// Remap an offset, moving past text inserted exactly at it.
    #[must_use]
    pub fn map_right(self, pos: usize) -> usize {
        if pos < self.start || (pos == self.start && self.removed > 0) {
            pos
        } else if pos >= self.end() {
            pos - self.removed + self.inserted
        } else {
            self.start + self.inserted
        }
    }
}

/// Smallest single splice turning `old` into `new` (common prefix and suffix).
#[must_use]
pub fn diff(old: &str, new: &str) -> Splice {
    let (a, b) = (old.as_bytes(), new.as_bytes());
    let mut prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    while !(old.is_char_boundary(prefix) && new.is_char_boundary(prefix)) {
        prefix -= 1;
    }

    let max_suffix = a.len().min(b.len()) - prefix;
    let mut suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();
    while !(old.is_char_boundary(a.len() - suffix) && new.is_char_boundary(b.len() - suffix)) {
        suffix -= 1;
    }

    Splice { start: prefix, removed: a.len() - prefix - suffix, inserted: b.len() - prefix - suffix }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
}

impl Buffer {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Validate that `range` is in bounds and on character boundaries.
    ///
    /// # Errors
    ///
    /// Returns a [`BufferError`] describing the first violation.
    pub fn check_range(&self, range: &Range<usize>) -> Result<(), BufferError> {
        if range.start > range.end || range.end > self.text.len() {
            return Err(BufferError::OutOfBounds { start: range.start, end: range.end, len: self.text.len() });
        }
        for pos in [range.start, range.end] {
            if !self.text.is_char_boundary(pos) {
                return Err(BufferError::NotCharBoundary(pos));
            }
        }
        Ok(())
    }

    /// Text covered by `range`.
    ///
    /// # Errors
    ///
    /// Returns a [`BufferError`] for an invalid range.
    pub fn slice(&self, range: Range<usize>) -> Result<&str, BufferError> {
        self.check_range(&range)?;
        Ok(&self.text[range])
    }

    /// Replace `range` with `text`.
    ///
    /// # Errors
    ///
    /// Returns a [`BufferError`] for an invalid range; the buffer is unchanged.
    pub fn splice(&mut self, range: Range<usize>, text: &str) -> Result<Splice, BufferError> {
        self.check_range(&range)?;
        let splice = Splice { start: range.start, removed: range.len(), inserted: text.len() };
        self.text.replace_range(range, text);
        Ok(splice)
    }

    /// Insert `text` at `at`.
    ///
    /// # Errors
    ///
    /// Returns a [`BufferError`] for an invalid offset.
    pub fn insert(&mut self, at: usize, text: &str) -> Result<Splice, BufferError> {
        self.splice(at..at, text)
    }

    /// Replace the whole text, reporting the minimal splice that changed.
    pub fn replace_all(&mut self, text: &str) -> Splice {
        let splice = diff(&self.text, text);
        self.text = text.to_string();
        splice
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
