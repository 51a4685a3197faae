//! Single-pass marker scanner.
//!
//! Classifies each line of a converted document while walking it once, in
//! order. The scan moves through three states:
//!
//! ```text
//! BeforeBody --body start--> InBody --body end--> AfterBody
//! ```
//!
//! A body-end marker seen in `BeforeBody` is an ordinary preamble line, and a
//! second body-start inside the body is an ordinary body line. Only the first
//! start and the first end after it are structural.

use super::types::Markers;

/// Position of the scanner relative to the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    BeforeBody,
    InBody,
    AfterBody,
}

/// Role of a single scanned line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Preamble,
    BodyStart,
    Body,
    BodyEnd,
    Trailer,
}

/// A classified line with its zero-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine<S> {
    pub index: usize,
    pub kind: LineKind,
    pub text: S,
}

/// Lazy iterator classifying lines against a set of [`Markers`].
pub struct BodyScanner<'m, I> {
    lines: I,
    markers: &'m Markers,
    state: ScanState,
    index: usize,
}

impl<'m, I, S> BodyScanner<'m, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    #[must_use]
    pub fn new(lines: impl IntoIterator<IntoIter = I>, markers: &'m Markers) -> Self {
        Self {
            lines: lines.into_iter(),
            markers,
            state: ScanState::BeforeBody,
            index: 0,
        }
    }

    /// State after the most recently yielded line.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Classify `line` and advance the state machine.
    fn classify(&mut self, line: &str) -> LineKind {
        match self.state {
            ScanState::BeforeBody if self.markers.is_body_start(line) => {
                self.state = ScanState::InBody;
                LineKind::BodyStart
            }
            ScanState::BeforeBody => LineKind::Preamble,
            ScanState::InBody if self.markers.is_body_end(line) => {
                self.state = ScanState::AfterBody;
                LineKind::BodyEnd
            }
            ScanState::InBody => LineKind::Body,
            ScanState::AfterBody => LineKind::Trailer,
        }
    }
}

impl<I, S> Iterator for BodyScanner<'_, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = ScannedLine<S>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.lines.next()?;
        let kind = self.classify(text.as_ref());
        let index = self.index;
        self.index += 1;
        Some(ScannedLine { index, kind, text })
    }
}
