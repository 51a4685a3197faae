//! Relocation of build artifacts into the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::output_dir_for;
use crate::error::Result;

/// Files moved by one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedArtifacts {
    pub output_dir: PathBuf,
    pub moved: Vec<PathBuf>,
}

/// Moves generated files from a working directory into `<title> files/`.
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    work_dir: PathBuf,
}

impl ArtifactCollector {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Move every existing `<title>.<ext>` into the output directory.
    ///
    /// Extensions without a matching file are skipped; the compiler does not
    /// write every auxiliary file on every run.
    pub fn collect(&self, title: &str, extensions: &[String]) -> Result<CollectedArtifacts> {
        let names: Vec<String> = extensions.iter().map(|ext| format!("{title}.{ext}")).collect();
        self.collect_files(title, &names)
    }

    /// Move the named files (relative to the working directory) into the
    /// output directory for `title`, creating it when absent.
    pub fn collect_files(&self, title: &str, names: &[String]) -> Result<CollectedArtifacts> {
        let output_dir = output_dir_for(&self.work_dir, title);
        fs::create_dir_all(&output_dir)?;

        let mut moved = Vec::new();
        for name in names {
            let source = self.work_dir.join(name);
            if !source.is_file() {
                tracing::debug!(file = %source.display(), "Artifact not present, skipping");
                continue;
            }
            let target = output_dir.join(name);
            move_file(&source, &target)?;
            moved.push(target);
        }

        tracing::info!(output_dir = %output_dir.display(), files = moved.len(), "Collected artifacts");
        Ok(CollectedArtifacts { output_dir, moved })
    }
}

/// Move `source` to `target`, replacing an existing target.
///
/// Falls back to copy and remove when a rename is impossible, e.g. across
/// filesystems.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if target.exists() {
        fs::remove_file(target)?;
    }

    if let Err(rename_err) = fs::rename(source, target) {
        tracing::debug!(error = %rename_err, file = %source.display(), "Rename failed, copying instead");
        fs::copy(source, target).map_err(|_| rename_err)?;
        fs::remove_file(source)?;
    }
    Ok(())
}
