use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Workspace is the project tree generated files are written into.
///
/// Paths are relative to the workspace root and use `/` separators.
pub trait Workspace: Send + Sync {
    /// Read a file. Returns None if it does not exist.
    fn read(&self, path: &str) -> Result<Option<String>, WorkspaceError>;

    /// Replace a file atomically, creating parent directories.
    fn write(&self, path: &str, content: &str) -> Result<(), WorkspaceError>;

    /// Remove a file. Returns WorkspaceError::NotFound if it does not exist.
    fn remove(&self, path: &str) -> Result<(), WorkspaceError>;

    fn exists(&self, path: &str) -> Result<bool, WorkspaceError>;
}

/// FsWorkspace is a Workspace on the local filesystem.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never sees a half-written file. With a trash directory, removed
/// files are moved to `{trash_dir}/{timestamp}/{path}` instead of deleted.
pub struct FsWorkspace {
    root: PathBuf,
    trash_dir: Option<PathBuf>,
}

impl FsWorkspace {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            trash_dir: None,
        }
    }

    pub fn with_trash(mut self, trash_dir: Option<PathBuf>) -> Self {
        self.trash_dir = trash_dir;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path. Rejects absolute paths and `..` components.
    fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(WorkspaceError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn ensure_parent(path: &Path) -> Result<(), WorkspaceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    Ok(())
}

impl Workspace for FsWorkspace {
    fn read(&self, path: &str) -> Result<Option<String>, WorkspaceError> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&full)
            .map(Some)
            .map_err(|e| io_error(&full, e))
    }

    fn write(&self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        ensure_parent(&full)?;

        let mut tmp_name = full.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".crudgen-{}.tmp", std::process::id()));
        let tmp = full.with_file_name(tmp_name);

        fs::write(&tmp, content).map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &full) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&full, e));
        }
        tracing::debug!(path, bytes = content.len(), "wrote file");
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(WorkspaceError::NotFound(path.to_string()));
        }
        match &self.trash_dir {
            Some(trash) => {
                let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S").to_string();
                let dest = trash.join(stamp).join(path);
                ensure_parent(&dest)?;
                fs::rename(&full, &dest).map_err(|e| io_error(&full, e))?;
                tracing::debug!(path, trash = %dest.display(), "moved file to trash");
            }
            None => {
                fs::remove_file(&full).map_err(|e| io_error(&full, e))?;
                tracing::debug!(path, "removed file");
            }
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, WorkspaceError> {
        Ok(self.resolve(path)?.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());

        ws.write("a/b/c.go", "package c\n").unwrap();
        assert_eq!(ws.read("a/b/c.go").unwrap().as_deref(), Some("package c\n"));
        ws.write("a/b/c.go", "package d\n").unwrap();
        assert_eq!(ws.read("a/b/c.go").unwrap().as_deref(), Some("package d\n"));

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("a/b"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);

        ws.remove("a/b/c.go").unwrap();
        assert!(!ws.exists("a/b/c.go").unwrap());
        assert_eq!(ws.read("a/b/c.go").unwrap(), None);
        assert_eq!(
            ws.remove("a/b/c.go"),
            Err(WorkspaceError::NotFound("a/b/c.go".into()))
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());
        for bad in ["", "../x.go", "a/../../x.go", "/etc/passwd"] {
            assert!(
                matches!(ws.write(bad, "x"), Err(WorkspaceError::InvalidPath(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn remove_moves_into_trash() {
        let dir = tempfile::tempdir().unwrap();
        let trash = dir.path().join(".trash");
        let ws = FsWorkspace::new(dir.path()).with_trash(Some(trash.clone()));

        ws.write("web/api/tag.ts", "export {}\n").unwrap();
        ws.remove("web/api/tag.ts").unwrap();
        assert!(!ws.exists("web/api/tag.ts").unwrap());

        let batches: Vec<_> = fs::read_dir(&trash).unwrap().collect();
        assert_eq!(batches.len(), 1);
        let batch = batches[0].as_ref().unwrap().path();
        assert_eq!(
            fs::read_to_string(batch.join("web/api/tag.ts")).unwrap(),
            "export {}\n"
        );
    }
}
