//! Staged output directory with all-or-nothing commit.

use crate::RenderError;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes go to a sibling staging directory that replaces the real output
/// directory only on [`StagedOutput::commit`]. Dropping without commit
/// discards the staging directory and leaves the previous output untouched.
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub fn new(target: &Path) -> Result<Self, RenderError> {
        let staging = sibling(target, "staging");
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| RenderError::io(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| RenderError::io(&staging, e))?;

        Ok(Self {
            target: target.to_path_buf(),
            staging,
            committed: false,
        })
    }

    /// Write `contents` at `rel_path`, creating parent directories
    pub fn write(&self, rel_path: &str, contents: impl AsRef<[u8]>) -> Result<(), RenderError> {
        let path = self.staging.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
        }
        fs::write(&path, contents).map_err(|e| RenderError::io(&path, e))
    }

    /// Swap the staging directory into place
    pub fn commit(mut self) -> Result<PathBuf, RenderError> {
        if let Some(parent) = self.target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
            }
        }

        let backup = sibling(&self.target, "old");
        if self.target.exists() {
            if backup.exists() {
                fs::remove_dir_all(&backup).map_err(|e| RenderError::io(&backup, e))?;
            }
            fs::rename(&self.target, &backup).map_err(|e| RenderError::io(&self.target, e))?;
        }

        if let Err(err) = fs::rename(&self.staging, &self.target) {
            // Put the previous site back before reporting
            if backup.exists() {
                if let Err(restore) = fs::rename(&backup, &self.target) {
                    tracing::warn!(
                        "Failed to restore previous output from {:?}: {}",
                        backup,
                        restore
                    );
                }
            }
            return Err(RenderError::io(&self.target, err));
        }
        self.committed = true;

        if backup.exists() {
            if let Err(err) = fs::remove_dir_all(&backup) {
                tracing::warn!("Failed to remove previous output {:?}: {}", backup, err);
            }
        }

        tracing::debug!("Committed output to {:?}", self.target);
        Ok(self.target.clone())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if !self.committed && self.staging.exists() {
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "site".to_string());
    target.with_file_name(format!(".{name}.{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("_site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.html"), "old").unwrap();

        let staged = StagedOutput::new(&target).unwrap();
        staged.write("til/a/index.html", "new").unwrap();
        staged.commit().unwrap();

        assert!(!target.join("stale.html").exists());
        assert_eq!(
            fs::read_to_string(target.join("til/a/index.html")).unwrap(),
            "new"
        );
        assert!(!dir.path().join("._site.staging").exists());
        assert!(!dir.path().join("._site.old").exists());
    }

    #[test]
    fn dropping_without_commit_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("_site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("index.html"), "old").unwrap();

        {
            let staged = StagedOutput::new(&target).unwrap();
            staged.write("index.html", "half-written").unwrap();
        }

        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "old");
        assert!(!dir.path().join("._site.staging").exists());
    }

    #[test]
    fn failed_swap_restores_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("_site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("index.html"), "old").unwrap();

        let staged = StagedOutput::new(&target).unwrap();
        staged.write("index.html", "new").unwrap();
        fs::remove_dir_all(dir.path().join("._site.staging")).unwrap();

        assert!(matches!(staged.commit(), Err(RenderError::Io { .. })));
        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "old");
        assert!(!dir.path().join("._site.old").exists());
    }
}
