//! Document splitting for converted notebooks.
//!
//! A converted document is walked once, in order, and cut into the lines
//! before `\begin{document}` (the preamble) and the lines inside the
//! document environment (the body).

mod scanner;
mod splitter;
mod types;

pub use scanner::{BodyScanner, LineKind, ScanState, ScannedLine};
pub use splitter::DocumentSplitter;
pub use types::{Body, Markers, Preamble, SourceDocument};

pub(crate) use types::join_lines;
