//! Scoped working directories for container round-trips

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{ErrorContext, Result};

/// Temporary directory owned by one coordinator invocation.
///
/// The directory and everything in it is removed when the value is dropped,
/// on every exit path including early returns and unwinding.
#[derive(Debug)]
pub struct WorkArea {
    dir: TempDir,
}

impl WorkArea {
    /// Create a fresh directory under `root` (or the system temp dir)
    pub fn create(root: Option<&Path>, stem: &str) -> Result<Self> {
        let prefix = format!("opt_{}_", stem);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).with_file_context(root.to_path_buf())?;
                builder.tempdir_in(root).with_file_context(root.to_path_buf())?
            }
            None => builder.tempdir()?,
        };

        debug!("Created work area {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file directly inside the work area
    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Files in the work area with the given extension, sorted by name
    pub async fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(self.path())
            .await
            .with_file_context(self.path().to_path_buf())?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_file_context(self.path().to_path_buf())?
        {
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if matches && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        debug!("Removing work area {:?}", self.dir.path());
    }
}
