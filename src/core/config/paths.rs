use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::errors::RagError;

/// Filesystem layout for persisted state.
///
/// Each session gets its own directory under `store_dir`; directories are
/// independent and deleting one fully removes that session's knowledge base.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub data_dir: PathBuf,
    pub store_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl StorePaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let store_dir = data_dir.join("vector_stores");
        let log_dir = data_dir.join("logs");

        for dir in [&data_dir, &store_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        StorePaths {
            data_dir,
            store_dir,
            log_dir,
        }
    }

    /// Storage directory for one session, derived deterministically from its
    /// identifier. Identifiers that could alias or escape another session's
    /// directory are rejected.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf, RagError> {
        if session_id.is_empty() {
            return Err(RagError::Configuration(
                "session identifier must not be empty".to_string(),
            ));
        }
        if session_id == ".."
            || session_id.contains('/')
            || session_id.contains('\\')
            || session_id.contains("..")
        {
            return Err(RagError::Configuration(format!(
                "session identifier '{}' contains path components",
                session_id
            )));
        }
        Ok(self.store_dir.join(session_id))
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("SESSIONRAG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return PathBuf::from("data");
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("sessionrag");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("sessionrag");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("sessionrag")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_paths() -> StorePaths {
        let base = std::env::temp_dir().join(format!("sessionrag-paths-{}", uuid::Uuid::new_v4()));
        StorePaths::with_data_dir(base)
    }

    #[test]
    fn session_dirs_are_disjoint_per_identifier() {
        let paths = scratch_paths();
        let a = paths.session_dir("session-a").unwrap();
        let b = paths.session_dir("session-b").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(&paths.store_dir));
    }

    #[test]
    fn path_like_identifiers_are_rejected() {
        let paths = scratch_paths();
        assert!(paths.session_dir("").is_err());
        assert!(paths.session_dir("../other").is_err());
        assert!(paths.session_dir("a/b").is_err());
        assert!(paths.session_dir("a\\b").is_err());
    }
}
