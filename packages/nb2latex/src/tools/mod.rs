//! External collaborators: notebook converter, LaTeX compiler and the
//! micromamba environment they run in.
//!
//! The build only talks to the [`Converter`] and [`Compiler`] traits, so tests
//! can substitute fakes that return canned documents.

mod compiler;
mod converter;
mod environment;
mod process;

pub use compiler::{Compiler, PdfLatex};
pub use converter::{Converter, NbConvert};
pub use environment::Micromamba;
pub use process::{ToolCommand, ToolFailure, ToolOutput, MICROMAMBA_PROGRAM};
