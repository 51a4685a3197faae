//! Typesetting of the merged document.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::process::{ToolCommand, ToolFailure};
use crate::error::{Nb2LatexError, Result};

/// Turns a merged LaTeX document into a PDF.
///
/// One call is one pass; the build runs a fixed number of passes so that the
/// table of contents and cross references settle.
pub trait Compiler {
    /// Compile `document` (a path inside the working directory) and return the
    /// path of the produced artifact.
    fn compile(&self, document: &Path, pass: u8) -> Result<PathBuf>;
}

impl<T: Compiler + ?Sized> Compiler for &T {
    fn compile(&self, document: &Path, pass: u8) -> Result<PathBuf> {
        (**self).compile(document, pass)
    }
}

/// Compiler backed by `pdflatex`.
#[derive(Debug, Clone)]
pub struct PdfLatex {
    program: String,
    environment: Option<String>,
    timeout: Option<Duration>,
}

impl PdfLatex {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            environment: None,
            timeout: None,
        }
    }

    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, work_dir: &Path, file_name: &str) -> ToolCommand {
        ToolCommand::new(&self.program, work_dir)
            .args(["-interaction=nonstopmode", file_name])
            .in_environment(self.environment.as_deref())
            .timeout(self.timeout)
    }
}

/// Split `document` into its directory and file name.
fn locate(document: &Path) -> Result<(PathBuf, String)> {
    let file_name = document
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Nb2LatexError::Configuration(format!("not a document path: {}", document.display()))
        })?;
    let dir = match document.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

impl Compiler for PdfLatex {
    fn compile(&self, document: &Path, pass: u8) -> Result<PathBuf> {
        let (work_dir, file_name) = locate(document)?;
        tracing::info!(document = %file_name, pass, "Compiling LaTeX");

        self.command(&work_dir, &file_name)
            .run()
            .map_err(|failure| match failure {
                ToolFailure::Unavailable { program, source } => {
                    Nb2LatexError::ToolingUnavailable { tool: program, source }
                }
                other => Nb2LatexError::Compilation {
                    pass,
                    message: other.message(&self.program),
                    output: other.diagnostic_output(),
                },
            })?;

        Ok(document.with_extension("pdf"))
    }
}
