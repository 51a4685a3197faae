//! Types for the document splitting system.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Marker strings recognized while scanning a converted document.
///
/// A line is a marker line when it *contains* the marker, so indented or
/// trailing-comment variants such as `  \begin{document} % body` match too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Opens the document body.
    pub body_start: String,
    /// Closes the document body.
    pub body_end: String,
    /// Renders the per-document title; dropped from extracted bodies.
    pub title_render: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            body_start: r"\begin{document}".to_string(),
            body_end: r"\end{document}".to_string(),
            title_render: r"\maketitle".to_string(),
        }
    }
}

impl Markers {
    pub fn is_body_start(&self, line: &str) -> bool {
        line.contains(&self.body_start)
    }

    pub fn is_body_end(&self, line: &str) -> bool {
        line.contains(&self.body_end)
    }

    pub fn is_title_render(&self, line: &str) -> bool {
        line.contains(&self.title_render)
    }
}

/// A converted document as produced by the notebook converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Identifier used in diagnostics (usually the file name).
    pub name: String,
    pub lines: Vec<String>,
}

impl SourceDocument {
    #[must_use]
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    /// Build a document from raw text. Accepts both `\n` and `\r\n` endings.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, text.lines().map(str::to_string).collect())
    }

    /// Read a document from disk, naming it after the file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_text(name, &text))
    }
}

/// Lines preceding the body of the primary document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preamble {
    lines: Vec<String>,
}

impl Preamble {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Lines inside the body of one document, title-render lines removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    lines: Vec<String>,
}

impl Body {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serialize as file content, one line per row with a final newline.
    pub fn render(&self) -> String {
        join_lines(&self.lines)
    }
}

pub(crate) fn join_lines(lines: &[String]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}
