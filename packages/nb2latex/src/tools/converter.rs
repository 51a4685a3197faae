//! Notebook → LaTeX conversion.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::process::{ToolCommand, ToolFailure};
use crate::config::NOTEBOOK_EXTENSION;
use crate::error::{Nb2LatexError, Result};

/// Turns one input document into one converted LaTeX document.
pub trait Converter {
    /// Convert document `name` inside `work_dir` and return the path of the
    /// produced `<name>.tex`.
    fn convert(&self, work_dir: &Path, name: &str) -> Result<PathBuf>;
}

impl<T: Converter + ?Sized> Converter for &T {
    fn convert(&self, work_dir: &Path, name: &str) -> Result<PathBuf> {
        (**self).convert(work_dir, name)
    }
}

/// Converter backed by `jupyter nbconvert --to latex`.
#[derive(Debug, Clone)]
pub struct NbConvert {
    program: String,
    environment: Option<String>,
    timeout: Option<Duration>,
}

impl NbConvert {
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

    fn command(&self, work_dir: &Path, name: &str) -> ToolCommand {
        ToolCommand::new(&self.program, work_dir)
            .args([
                "nbconvert".to_string(),
                format!("{name}.{NOTEBOOK_EXTENSION}"),
                "--to".to_string(),
                "latex".to_string(),
            ])
            .in_environment(self.environment.as_deref())
            .timeout(self.timeout)
    }
}

impl Converter for NbConvert {
    fn convert(&self, work_dir: &Path, name: &str) -> Result<PathBuf> {
        tracing::info!(document = name, "Converting notebook to LaTeX");

        self.command(work_dir, name).run().map_err(|failure| match failure {
            ToolFailure::Unavailable { program, source } => {
                Nb2LatexError::ToolingUnavailable { tool: program, source }
            }
            other => Nb2LatexError::Conversion {
                document: name.to_string(),
                message: other.message(&self.program),
                output: other.diagnostic_output(),
            },
        })?;

        let tex = work_dir.join(format!("{name}.tex"));
        if !tex.is_file() {
            return Err(Nb2LatexError::Conversion {
                document: name.to_string(),
                message: format!("converter did not produce {}", tex.display()),
                output: String::new(),
            });
        }
        Ok(tex)
    }
}
