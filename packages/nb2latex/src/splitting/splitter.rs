//! Preamble and body extraction for converted documents.

use super::scanner::{BodyScanner, LineKind, ScanState};
use super::types::{Body, Markers, Preamble, SourceDocument};
use crate::error::{Nb2LatexError, Result};

/// Splits converted documents into a preamble and a body.
///
/// The splitter only looks at one document at a time and never mutates it.
#[derive(Debug, Clone, Default)]
pub struct DocumentSplitter {
    markers: Markers,
}

impl DocumentSplitter {
    #[must_use]
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Extract the lines strictly between the first body-start marker and the
    /// first body-end marker after it, dropping title-render lines.
    ///
    /// # Errors
    /// `Nb2LatexError::Structural` when either marker is missing.
    pub fn extract_body(&self, document: &SourceDocument) -> Result<Body> {
        let mut scanner = BodyScanner::new(document.lines.iter(), &self.markers);
        let mut start = None;
        let mut lines = Vec::new();

        for line in scanner.by_ref() {
            match line.kind {
                LineKind::BodyStart => start = Some(line.index),
                LineKind::Body => {
                    if self.markers.is_title_render(line.text) {
                        continue;
                    }
                    if self.markers.is_body_start(line.text) {
                        tracing::warn!(
                            document = %document.name,
                            line = line.index + 1,
                            "Nested body-start marker kept as body content"
                        );
                    }
                    lines.push(line.text.clone());
                }
                LineKind::BodyEnd => break,
                LineKind::Preamble | LineKind::Trailer => {}
            }
        }

        match (start, scanner.state()) {
            (None, _) => Err(Nb2LatexError::structural(
                &document.name,
                format!("no {} marker", self.markers.body_start),
            )),
            (Some(start), ScanState::InBody) => Err(Nb2LatexError::structural(
                &document.name,
                format!(
                    "no {} after {} on line {}",
                    self.markers.body_end,
                    self.markers.body_start,
                    start + 1
                ),
            )),
            _ => {
                tracing::debug!(document = %document.name, lines = lines.len(), "Extracted body");
                Ok(Body::new(lines))
            }
        }
    }

    /// Extract every line before the first body-start marker.
    ///
    /// Only the body-start marker has to be present; the scan stops there.
    ///
    /// # Errors
    /// `Nb2LatexError::Structural` when no body-start marker exists.
    pub fn extract_preamble(&self, document: &SourceDocument) -> Result<Preamble> {
        let mut lines = Vec::new();

        for line in BodyScanner::new(document.lines.iter(), &self.markers) {
            match line.kind {
                LineKind::Preamble => lines.push(line.text.clone()),
                _ => {
                    tracing::debug!(document = %document.name, lines = lines.len(), "Extracted preamble");
                    return Ok(Preamble::new(lines));
                }
            }
        }

        Err(Nb2LatexError::structural(
            &document.name,
            format!("no {} marker", self.markers.body_start),
        ))
    }
}
