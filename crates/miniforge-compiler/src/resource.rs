//! The fetch capability and its two implementations.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Where source files come from. Paths are `/`-separated logical paths.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn has(&self, path: &str) -> bool;

    async fn get(&self, path: &str) -> io::Result<String>;

    /// Resolve `reference` as written in the file at `base`.
    fn resolve_relative_path(&self, base: &str, reference: &str) -> String {
        resolve_path(base, reference)
    }
}

/// Join `reference` onto the directory of `base` and normalize `.` and
/// `..` segments. References starting with `/` ignore `base`.
pub fn resolve_path(base: &str, reference: &str) -> String {
    let absolute = reference.starts_with('/') || base.starts_with('/');
    let dir = if reference.starts_with('/') {
        ""
    } else {
        base.rsplit_once('/').map_or("", |(dir, _)| dir)
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // Nothing above the root.
                _ if absolute => {}
                _ => segments.push(".."),
            },
            segment => segments.push(segment),
        }
    }
    let path = segments.join("/");
    if absolute {
        format!("/{path}")
    } else {
        path
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// File system
// ══════════════════════════════════════════════════════════════════════════════

/// Reads files below a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemResourceHandler {
    root: PathBuf,
}

impl FileSystemResourceHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ResourceHandler for FileSystemResourceHandler {
    async fn has(&self, path: &str) -> bool {
        tokio::fs::metadata(self.locate(path))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn get(&self, path: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.locate(path)).await
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// In memory
// ══════════════════════════════════════════════════════════════════════════════

/// Serves files from a map and counts reads per path.
#[derive(Debug, Default)]
pub struct MemoryResourceHandler {
    files: HashMap<String, String>,
    reads: Mutex<HashMap<String, usize>>,
}

impl MemoryResourceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    /// How often `path` was read with [`ResourceHandler::get`].
    pub fn reads(&self, path: &str) -> usize {
        self.reads.lock().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ResourceHandler for MemoryResourceHandler {
    async fn has(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    async fn get(&self, path: &str) -> io::Result<String> {
        *self.reads.lock().entry(path.to_string()).or_default() += 1;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_base_directory() {
        assert_eq!(resolve_path("lib/main.src", "util.src"), "lib/util.src");
        assert_eq!(resolve_path("lib/main.src", "./util.src"), "lib/util.src");
        assert_eq!(resolve_path("lib/main.src", "../util.src"), "util.src");
        assert_eq!(resolve_path("main.src", "lib/a.src"), "lib/a.src");
        assert_eq!(resolve_path("main.src", "../a.src"), "../a.src");
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(resolve_path("/app/main.src", "util.src"), "/app/util.src");
        assert_eq!(resolve_path("/app/main.src", "/lib/x.src"), "/lib/x.src");
        assert_eq!(resolve_path("/app/main.src", "../../x.src"), "/x.src");
        assert_eq!(resolve_path("", "main.src"), "main.src");
    }

    #[tokio::test]
    async fn test_memory_handler_counts_reads() {
        let handler = MemoryResourceHandler::new().with_file("a.src", "x = 1");
        assert!(handler.has("a.src").await);
        assert!(!handler.has("b.src").await);
        assert_eq!(handler.get("a.src").await.unwrap(), "x = 1");
        assert!(handler.get("b.src").await.is_err());
        assert_eq!(handler.reads("a.src"), 1);
        assert_eq!(handler.reads("b.src"), 1);
    }
}
