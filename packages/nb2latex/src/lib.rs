//! nb2latex - Merge converted Jupyter notebooks into one LaTeX document.
//!
//! Every notebook is converted to LaTeX, split into a preamble and a body,
//! and the bodies are spliced into a single document under the preamble of
//! the first notebook, with a shared title page and table of contents. The
//! result is compiled twice with `pdflatex` and all artifacts are moved into
//! `<title> files/`.
//!
//! # Example
//!
//! ```
//! use nb2latex::merging::merge;
//! use nb2latex::splitting::{DocumentSplitter, SourceDocument};
//!
//! let doc = SourceDocument::from_text(
//!     "Intro.tex",
//!     "\\documentclass{article}\n\\begin{document}\n\\maketitle\nHello\n\\end{document}\n",
//! );
//! let splitter = DocumentSplitter::default();
//! let preamble = splitter.extract_preamble(&doc).unwrap();
//! let body = splitter.extract_body(&doc).unwrap();
//!
//! let merged = merge("Report", preamble, &[("Intro".to_string(), body)]).unwrap();
//! assert!(merged.render().contains("\\input{IntroBody.tex}"));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Build configuration, naming conventions and validation
//! - [`error`]: Error types and Result alias
//! - [`splitting`]: Preamble/body extraction over a marker state machine
//! - [`merging`]: Assembly of the merged document
//! - [`tools`]: Converter, compiler and micromamba collaborators
//! - [`collect`]: Moving artifacts into the output directory
//! - [`pipeline`]: The sequential build
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod merging;
pub mod pipeline;
pub mod splitting;
pub mod tools;

// Re-export commonly used items
pub use config::{BuildConfig, EnvironmentConfig};
pub use error::{Nb2LatexError, Result};
pub use merging::{merge, MergedDocument};
pub use pipeline::{BuildReport, Pipeline, Stage};
pub use splitting::{Body, DocumentSplitter, Preamble, SourceDocument};
