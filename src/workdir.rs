use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::BenchError;

const PREFIX: &str = "sweepbench-";

/// A disposable directory owned by one invocation.
///
/// The process working directory is never changed. Callers pass [`ScopedWorkdir::path`]
/// to the tool explicitly. The directory and everything in it is removed exactly once,
/// either by [`ScopedWorkdir::close`] or on drop.
#[derive(Debug)]
pub struct ScopedWorkdir {
    dir: TempDir,
}

impl ScopedWorkdir {
    /// Creates a fresh directory under `parent`, or under the system temp dir when `None`.
    pub fn acquire(parent: Option<&Path>) -> Result<Self, BenchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|source| BenchError::WorkdirCreate { source })?;

        tracing::trace!(path = %dir.path().display(), "acquired workdir");
        Ok(Self { dir })
    }

    /// Creates a fresh directory inside this one.
    pub fn nested(&self) -> Result<Self, BenchError> {
        Self::acquire(Some(self.path()))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Removes the directory now and reports failure instead of ignoring it.
    pub fn close(self) -> Result<(), BenchError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| BenchError::WorkdirRemove { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directory_removed_on_drop() {
        let cwd_before = std::env::current_dir().unwrap();
        let path = {
            let wd = ScopedWorkdir::acquire(None).unwrap();
            fs::write(wd.join("out.tre"), "(a,b);").unwrap();
            fs::create_dir(wd.join("sub")).unwrap();
            fs::write(wd.join("sub").join("x"), "x").unwrap();
            assert!(wd.path().is_dir());
            wd.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::env::current_dir().unwrap(), cwd_before);
    }

    #[test]
    fn directory_removed_on_close() {
        let wd = ScopedWorkdir::acquire(None).unwrap();
        let path = wd.path().to_path_buf();
        wd.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn directory_removed_when_operation_fails() {
        fn failing(wd: &ScopedWorkdir) -> Result<(), String> {
            fs::write(wd.join("partial"), "x").unwrap();
            Err("tool exploded".to_string())
        }

        let cwd_before = std::env::current_dir().unwrap();
        let mut seen = None;
        let result = (|| {
            let wd = ScopedWorkdir::acquire(None).map_err(|e| e.to_string())?;
            seen = Some(wd.path().to_path_buf());
            failing(&wd)
        })();

        assert!(result.is_err());
        assert!(!seen.unwrap().exists());
        assert_eq!(std::env::current_dir().unwrap(), cwd_before);
    }

    #[test]
    fn workdirs_are_unique() {
        let a = ScopedWorkdir::acquire(None).unwrap();
        let b = ScopedWorkdir::acquire(None).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn nested_lives_inside_parent() {
        let parent = ScopedWorkdir::acquire(None).unwrap();
        let child = parent.nested().unwrap();
        assert!(child.path().starts_with(parent.path()));
        let child_path = child.path().to_path_buf();
        drop(child);
        assert!(!child_path.exists());
        assert!(parent.path().exists());
    }

    #[test]
    fn acquire_in_missing_parent_fails() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let err = ScopedWorkdir::acquire(Some(&missing)).unwrap_err();
        assert!(matches!(err, BenchError::WorkdirCreate { .. }));
    }
}
