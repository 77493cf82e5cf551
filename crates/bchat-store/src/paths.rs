use std::path::{Path, PathBuf};

use bchat_core::config::PathsConfig;

use crate::error::StoreError;

/// Files whose presence marks a project root during upward discovery.
const ROOT_MARKERS: &[&str] = &["config/config.json", ".git"];

/// Centralized path resolution for the chat store.
///
/// Relative entries in the config resolve against the project root; absolute
/// entries are taken as-is.
#[derive(Clone, Debug)]
pub struct PathManager {
    project_root: PathBuf,
    paths: PathsConfig,
}

impl PathManager {
    pub fn new(project_root: PathBuf, paths: PathsConfig) -> Self {
        Self { project_root, paths }
    }

    /// Walk upward from `start` looking for a root marker. Falls back to
    /// `start` itself when nothing is found.
    pub fn discover(start: &Path, paths: PathsConfig) -> Self {
        let mut current = start.to_path_buf();
        loop {
            if ROOT_MARKERS.iter().any(|m| current.join(m).exists()) {
                return Self::new(current, paths);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Self::new(start.to_path_buf(), paths),
            }
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn chats_dir(&self) -> PathBuf {
        self.resolve(&self.paths.chats_dir)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.resolve(&self.paths.logs_dir)
    }

    pub fn chat_index_path(&self) -> PathBuf {
        self.resolve(&self.paths.chat_index)
    }

    pub fn context_summary_path(&self) -> PathBuf {
        self.resolve(&self.paths.context_summary)
    }

    /// Create every directory the store writes into.
    pub fn ensure_directories(&self) -> Result<(), StoreError> {
        let mut dirs = vec![self.chats_dir(), self.logs_dir()];
        for file in [self.chat_index_path(), self.context_summary_path()] {
            if let Some(parent) = file.parent() {
                dirs.push(parent.to_path_buf());
            }
        }
        dirs.sort();
        dirs.dedup();
        for dir in dirs {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    fn resolve(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bchat_paths_test_{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let pm = PathManager::new(PathBuf::from("/proj"), PathsConfig::default());
        assert_eq!(pm.chats_dir(), PathBuf::from("/proj/chats"));
        assert_eq!(pm.chat_index_path(), PathBuf::from("/proj/chats/chat_index.json"));
    }

    #[test]
    fn absolute_paths_kept() {
        let paths = PathsConfig {
            chats_dir: "/var/bchat/chats".into(),
            ..PathsConfig::default()
        };
        let pm = PathManager::new(PathBuf::from("/proj"), paths);
        assert_eq!(pm.chats_dir(), PathBuf::from("/var/bchat/chats"));
    }

    #[test]
    fn discover_finds_marker_in_ancestor() {
        let root = temp_dir();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(root.join("config/config.json"), "{}").unwrap();
        let nested = root.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let pm = PathManager::discover(&nested, PathsConfig::default());
        assert_eq!(pm.project_root(), root.as_path());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn ensure_directories_creates_tree() {
        let root = temp_dir();
        let pm = PathManager::new(root.clone(), PathsConfig::default());
        pm.ensure_directories().unwrap();
        assert!(root.join("chats").is_dir());
        assert!(root.join("logs").is_dir());

        fs::remove_dir_all(&root).ok();
    }
}
