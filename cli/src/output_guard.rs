use std::path::{Path, PathBuf};

/// Deletes its target file on drop unless `commit()` was called first.
/// Guarantees §7's "no successful-looking truncated file" rule without
/// threading a success flag through every fallible step of the driver.
pub struct OutputGuard {
    path: PathBuf,
    committed: bool,
}

impl OutputGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), committed: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
