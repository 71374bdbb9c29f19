//! Per-job scratch directory.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Exclusively owned temporary directory for one download job.
///
/// Removed when dropped, so any early return inside the pipeline cleans up.
/// On success it is handed to the caller together with the finished file.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates `tubedrop_<random>` under `root`.
    pub fn create(root: &Path) -> io::Result<Self> {
        fs_err::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("tubedrop_").tempdir_in(root)?;
        log::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Removes the directory and reports failures instead of ignoring them.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}
