//! Workspace confinement for file tools.
//!
//! Every path a file tool touches is resolved against a single root
//! directory. Resolution rejects `..` components and follows symlinks on the
//! existing part of the path, so neither traversal nor a link pointing out
//! of the root can escape it.

use mastermind_core::context::Resource;
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Error returned when a path cannot be used inside the workspace.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Path must not be empty")]
    Empty,

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// The directory file tools are confined to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Use `root` as the workspace, creating it if needed.
    pub fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative (or in-workspace absolute) path.
    ///
    /// The target does not need to exist; its nearest existing ancestor is
    /// canonicalized and must lie inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        if path.trim().is_empty() {
            return Err(PathError::Empty);
        }

        let input = Path::new(path);
        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathError::PathTraversal { path: path.into() });
        }

        let candidate = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        // Walk up to the deepest ancestor that exists.
        let mut existing = candidate.as_path();
        let mut remainder: Vec<&std::ffi::OsStr> = Vec::new();
        while !existing.exists() {
            match (existing.file_name(), existing.parent()) {
                (Some(name), Some(parent)) => {
                    remainder.push(name);
                    existing = parent;
                }
                _ => return Err(PathError::OutsideWorkspace { path: path.into() }),
            }
        }

        let mut resolved = existing
            .canonicalize()
            .map_err(|e| PathError::CanonicalizeFailed {
                path: path.into(),
                reason: e.to_string(),
            })?;
        for name in remainder.into_iter().rev() {
            resolved.push(name);
        }

        if !resolved.starts_with(&self.root) {
            return Err(PathError::OutsideWorkspace { path: path.into() });
        }
        Ok(resolved)
    }

    /// Snapshot the workspace's text files as named resources.
    ///
    /// Walks the tree breadth-first in name order and skips hidden entries,
    /// symlinks, files over `max_file_bytes` and files that are not UTF-8.
    /// Stops after `max_files` resources.
    pub async fn resources(
        &self,
        max_files: usize,
        max_file_bytes: u64,
    ) -> std::io::Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut pending = VecDeque::from([self.root.clone()]);

        while let Some(dir) = pending.pop_front() {
            let mut entries = Vec::new();
            let mut reader = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = reader.next_entry().await? {
                entries.push(entry);
            }
            entries.sort_by_key(|e| e.file_name());

            for entry in entries {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push_back(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let size = entry.metadata().await?.len();
                if size > max_file_bytes {
                    debug!(path = %path.display(), size, "Skipping large workspace file");
                    continue;
                }
                let content = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) if e.kind() == std::io::ErrorKind::InvalidData => continue,
                    Err(e) => return Err(e),
                };

                let name = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let mut resource = Resource::new(name, "file", content);
                resource.metadata.insert("bytes".into(), size.into());
                resources.push(resource);

                if resources.len() >= max_files {
                    return Ok(resources);
                }
            }
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("ws")).unwrap();
        (dir, ws)
    }

    #[test]
    fn relative_paths_resolve_inside_root() {
        let (_dir, ws) = workspace();
        let resolved = ws.resolve("notes/today.md").unwrap();
        assert!(resolved.starts_with(ws.root()));
        assert!(resolved.ends_with("notes/today.md"));
    }

    #[test]
    fn traversal_blocked() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            ws.resolve("../../../etc/passwd"),
            Err(PathError::PathTraversal { .. })
        ));
        assert!(matches!(
            ws.resolve("notes/../../secret"),
            Err(PathError::PathTraversal { .. })
        ));
    }

    #[test]
    fn absolute_outside_root_blocked() {
        let (dir, ws) = workspace();
        let outside = dir.path().join("outside.txt");
        std::fs::write(&outside, "x").unwrap();
        assert!(matches!(
            ws.resolve(outside.to_str().unwrap()),
            Err(PathError::OutsideWorkspace { .. })
        ));
    }

    #[test]
    fn absolute_inside_root_allowed() {
        let (_dir, ws) = workspace();
        let inside = ws.root().join("a.txt");
        assert_eq!(ws.resolve(inside.to_str().unwrap()).unwrap(), inside);
    }

    #[test]
    fn empty_path_rejected() {
        let (_dir, ws) = workspace();
        assert!(matches!(ws.resolve("  "), Err(PathError::Empty)));
    }

    #[tokio::test]
    async fn resources_snapshot_text_files() {
        let (_dir, ws) = workspace();
        std::fs::create_dir_all(ws.root().join("docs")).unwrap();
        std::fs::write(ws.root().join("b.md"), "second").unwrap();
        std::fs::write(ws.root().join("a.md"), "first").unwrap();
        std::fs::write(ws.root().join("docs/runbook.md"), "restart the cache").unwrap();
        std::fs::write(ws.root().join(".env"), "SECRET=1").unwrap();
        std::fs::write(ws.root().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(ws.root().join("huge.txt"), "x".repeat(100)).unwrap();

        let resources = ws.resources(10, 64).await.unwrap();
        let names: Vec<&str> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md", "docs/runbook.md"]);
        assert_eq!(resources[2].content, "restart the cache");
        assert_eq!(resources[2].kind, "file");
        assert_eq!(resources[2].metadata["bytes"], 17);

        assert_eq!(ws.resources(1, 64).await.unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_blocked() {
        let (dir, ws) = workspace();
        let secret_dir = dir.path().join("secret");
        std::fs::create_dir(&secret_dir).unwrap();
        std::os::unix::fs::symlink(&secret_dir, ws.root().join("link")).unwrap();
        assert!(matches!(
            ws.resolve("link/key.pem"),
            Err(PathError::OutsideWorkspace { .. })
        ));
    }
}
