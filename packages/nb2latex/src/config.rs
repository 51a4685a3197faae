//! Build configuration and input validation.
//!
//! All naming conventions (file extensions, marker strings, tool names) live
//! on [`BuildConfig`] rather than in process-wide state, so independent builds
//! can run side by side in one process.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{Nb2LatexError, Result};
use crate::splitting::Markers;

/// Title used when none is given on the command line.
pub const DEFAULT_TITLE: &str = "My Document";

/// Extensions of the compiled title that are moved into the output directory.
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["aux", "log", "out", "toc", "tex", "pdf"];

/// Extension of the notebook sources, stripped from input names.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Suffix appended to a document name to form its extracted body file.
pub const BODY_FILE_SUFFIX: &str = "Body.tex";

/// Suffix appended to the title to form the output directory name.
pub const OUTPUT_DIR_SUFFIX: &str = " files";

/// Default micromamba environment name.
pub const DEFAULT_ENV_NAME: &str = "nb2latex";

/// Default micromamba environment specification file.
pub const DEFAULT_ENV_FILE: &str = "environment.yml";

/// Program used to convert notebooks (`jupyter nbconvert`).
pub const DEFAULT_CONVERTER_PROGRAM: &str = "jupyter";

/// Program used to typeset the merged document.
pub const DEFAULT_COMPILER_PROGRAM: &str = "pdflatex";

/// Titles end up in file names and in `\title{...}`: no path separators,
/// braces or control characters.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/\\{}\p{Cc}]+$").expect("valid regex"));

/// Document names are file stems in the working directory.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DOCUMENT_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/\\\p{Cc}]+$").expect("valid regex"));

/// Micromamba environment used to run the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub name: String,
    pub file: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENV_NAME.to_string(),
            file: PathBuf::from(DEFAULT_ENV_FILE),
        }
    }
}

/// Configuration for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Document title, also the base name of the merged document.
    pub title: String,
    /// Directory in which conversion and compilation run.
    pub work_dir: PathBuf,
    /// Extensions of `<title>.<ext>` files moved into the output directory.
    pub extensions: Vec<String>,
    /// Also move `<name>.tex` and `<name>Body.tex` into the output directory.
    pub collect_intermediates: bool,
    /// Marker lines recognized by the splitter.
    pub markers: Markers,
    /// Upper bound for a single external tool invocation.
    pub tool_timeout: Option<Duration>,
    /// Run external tools inside this micromamba environment.
    pub environment: Option<EnvironmentConfig>,
    pub converter_program: String,
    pub compiler_program: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            work_dir: PathBuf::from("."),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            collect_intermediates: true,
            markers: Markers::default(),
            tool_timeout: None,
            environment: None,
            converter_program: DEFAULT_CONVERTER_PROGRAM.to_string(),
            compiler_program: DEFAULT_COMPILER_PROGRAM.to_string(),
        }
    }
}

impl BuildConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_collect_intermediates(mut self, collect: bool) -> Self {
        self.collect_intermediates = collect;
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_environment(mut self, environment: Option<EnvironmentConfig>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_converter_program(mut self, program: impl Into<String>) -> Self {
        self.converter_program = program.into();
        self
    }

    pub fn with_compiler_program(mut self, program: impl Into<String>) -> Self {
        self.compiler_program = program.into();
        self
    }

    /// Validate the parts of the configuration that end up in file names.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if self.extensions.iter().any(|e| e.is_empty() || e.contains(['/', '\\'])) {
            return Err(Nb2LatexError::Configuration(format!(
                "invalid artifact extension list: {:?}",
                self.extensions
            )));
        }
        Ok(())
    }

    /// File name of the merged document (`<title>.tex`).
    pub fn merged_file_name(&self) -> String {
        format!("{}.tex", self.title)
    }

    /// Path of the merged document inside the working directory.
    pub fn merged_path(&self) -> PathBuf {
        self.work_dir.join(self.merged_file_name())
    }

    /// Directory collecting the final artifacts (`<work_dir>/<title> files`).
    pub fn output_dir(&self) -> PathBuf {
        output_dir_for(&self.work_dir, &self.title)
    }

    /// Path of the compiled PDF once artifacts have been collected.
    pub fn output_pdf(&self) -> PathBuf {
        self.output_dir().join(format!("{}.pdf", self.title))
    }
}

/// Output directory for `title` below `work_dir`.
pub fn output_dir_for(work_dir: &Path, title: &str) -> PathBuf {
    work_dir.join(format!("{title}{OUTPUT_DIR_SUFFIX}"))
}

/// File name of the extracted body for document `name`.
pub fn body_file_name(name: &str) -> String {
    format!("{name}{BODY_FILE_SUFFIX}")
}

/// Validate a document title.
///
/// # Examples
/// ```
/// use nb2latex::config::validate_title;
///
/// assert!(validate_title("Report").is_ok());
/// assert!(validate_title("My Document").is_ok());
/// assert!(validate_title("").is_err());
/// assert!(validate_title("../escape").is_err());
/// ```
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() || !TITLE_PATTERN.is_match(title) {
        return Err(Nb2LatexError::Configuration(format!(
            "invalid title '{title}': must be non-empty and free of path separators, braces and control characters"
        )));
    }
    Ok(())
}

/// Normalize a notebook argument into a document name.
///
/// Strips a trailing `.ipynb` extension and rejects names that cannot be used
/// as a file stem in the working directory.
///
/// # Examples
/// ```
/// use nb2latex::config::normalize_document_name;
///
/// assert_eq!(normalize_document_name("Intro.ipynb").unwrap(), "Intro");
/// assert_eq!(normalize_document_name("Methods").unwrap(), "Methods");
/// assert!(normalize_document_name(".ipynb").is_err());
/// ```
pub fn normalize_document_name(raw: &str) -> Result<String> {
    let name = raw
        .strip_suffix(NOTEBOOK_EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
        .unwrap_or(raw);

    if name.trim().is_empty() || !DOCUMENT_NAME_PATTERN.is_match(name) {
        return Err(Nb2LatexError::Configuration(format!(
            "invalid notebook name '{raw}'"
        )));
    }
    Ok(name.to_string())
}
