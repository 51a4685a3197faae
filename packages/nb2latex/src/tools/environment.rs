//! Micromamba environment management.
//!
//! The converter and compiler usually live in a dedicated micromamba
//! environment created from `environment.yml`. This module checks that
//! micromamba is installed and creates the environment on first use.

use std::path::Path;
use std::time::Duration;

use super::process::{ToolCommand, ToolFailure, MICROMAMBA_PROGRAM};
use crate::config::EnvironmentConfig;
use crate::error::{output_suffix, Nb2LatexError, Result};

/// Handle on the micromamba executable.
#[derive(Debug, Clone)]
pub struct Micromamba {
    program: String,
    timeout: Option<Duration>,
}

impl Default for Micromamba {
    fn default() -> Self {
        Self {
            program: MICROMAMBA_PROGRAM.to_string(),
            timeout: None,
        }
    }
}

impl Micromamba {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, work_dir: &Path, args: &[&str]) -> Result<String> {
        ToolCommand::new(&self.program, work_dir)
            .args(args.iter().copied())
            .timeout(self.timeout)
            .run()
            .map(|output| output.stdout)
            .map_err(|failure| match failure {
                ToolFailure::Unavailable { source, .. } => Nb2LatexError::ToolingUnavailable {
                    tool: self.program.clone(),
                    source,
                },
                other => Nb2LatexError::Configuration(format!(
                    "`{} {}` failed: {}{}",
                    self.program,
                    args.join(" "),
                    other.message(&self.program),
                    output_suffix(&other.diagnostic_output())
                )),
            })
    }

    /// Fail with `ToolingUnavailable` unless micromamba can be started.
    pub fn check_available(&self, work_dir: &Path) -> Result<()> {
        let version = self.run(work_dir, &["--version"])?;
        tracing::debug!(version = %version.trim(), "Found micromamba");
        Ok(())
    }

    /// Whether an environment called `name` is listed by `micromamba env list`.
    pub fn environment_exists(&self, work_dir: &Path, name: &str) -> Result<bool> {
        let listing = self.run(work_dir, &["env", "list"])?;
        Ok(listing_contains(&listing, name))
    }

    /// Make sure `env` exists, creating it from its specification file when
    /// missing. Returns `true` when the environment was created.
    pub fn ensure(&self, work_dir: &Path, env: &EnvironmentConfig) -> Result<bool> {
        self.check_available(work_dir)?;

        if self.environment_exists(work_dir, &env.name)? {
            tracing::info!(environment = %env.name, "Environment exists");
            return Ok(false);
        }

        let file = env.file.to_string_lossy();
        tracing::info!(environment = %env.name, file = %file, "Creating environment");
        self.run(work_dir, &["create", "-y", "-n", &env.name, "-f", &file])?;
        Ok(true)
    }
}

/// Match `name` against the first column of an `env list` table.
fn listing_contains(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|first| first == name)
}
