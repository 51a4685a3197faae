//! Assembly of the merged document.
//!
//! The merged document reuses one preamble, adds a shared title page and
//! table of contents, and pulls in every extracted body with `\input`,
//! separated by page breaks, in exactly the order the caller gave.

use std::fmt;

use crate::config::body_file_name;
use crate::error::{Nb2LatexError, Result};
use crate::splitting::{join_lines, Body, Preamble};

/// A LaTeX line synthesized by the merger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Title(String),
    BeginDocument,
    MakeTitle,
    TableOfContents,
    ClearPage,
    Input(String),
    EndDocument,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title(title) => write!(f, "\\title{{{title}}}"),
            Self::BeginDocument => f.write_str("\\begin{document}"),
            Self::MakeTitle => f.write_str("\\maketitle"),
            Self::TableOfContents => f.write_str("\\tableofcontents"),
            Self::ClearPage => f.write_str("\\clearpage"),
            Self::Input(file) => write!(f, "\\input{{{file}}}"),
            Self::EndDocument => f.write_str("\\end{document}"),
        }
    }
}

/// Reference from the merged document to one extracted body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyInclusion {
    /// Document name the body was extracted from.
    pub name: String,
    /// File the body is written to and `\input` from.
    pub file_name: String,
}

/// Merged document descriptor: one preamble, a header block and one
/// inclusion per body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    preamble: Preamble,
    title: String,
    inclusions: Vec<BodyInclusion>,
}

impl MergedDocument {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }

    pub fn inclusions(&self) -> &[BodyInclusion] {
        &self.inclusions
    }

    /// Header block emitted right after the preamble.
    pub fn header(&self) -> [Directive; 4] {
        [
            Directive::Title(self.title.clone()),
            Directive::BeginDocument,
            Directive::MakeTitle,
            Directive::TableOfContents,
        ]
    }

    /// Every synthesized directive, in output order.
    pub fn directives(&self) -> Vec<Directive> {
        let mut directives = self.header().to_vec();
        for inclusion in &self.inclusions {
            directives.push(Directive::ClearPage);
            directives.push(Directive::Input(inclusion.file_name.clone()));
        }
        directives.push(Directive::EndDocument);
        directives
    }

    /// Full document as lines: preamble followed by the directives.
    pub fn lines(&self) -> Vec<String> {
        self.preamble
            .lines()
            .iter()
            .cloned()
            .chain(self.directives().iter().map(ToString::to_string))
            .collect()
    }

    /// Serialize to LaTeX source.
    pub fn render(&self) -> String {
        join_lines(&self.lines())
    }
}

/// Merge one preamble and the ordered bodies into a single document.
///
/// Bodies keep the given order; nothing is sorted or deduplicated.
///
/// # Errors
/// `Nb2LatexError::Configuration` when `bodies` is empty.
pub fn merge(title: &str, preamble: Preamble, bodies: &[(String, Body)]) -> Result<MergedDocument> {
    if bodies.is_empty() {
        return Err(Nb2LatexError::Configuration(
            "at least one document is required to merge".to_string(),
        ));
    }

    let inclusions = bodies
        .iter()
        .map(|(name, _)| BodyInclusion {
            name: name.clone(),
            file_name: body_file_name(name),
        })
        .collect();

    tracing::info!(title, documents = bodies.len(), "Merged documents");

    Ok(MergedDocument {
        preamble,
        title: title.to_string(),
        inclusions,
    })
}
