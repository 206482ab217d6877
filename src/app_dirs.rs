use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Centralized application directory resolution
#[derive(Debug, Clone)]
pub struct AppDirs {
    state_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AppDirs {
    /// Resolve the default directories: `$HOME/.local/state/rowmark` for state,
    /// the platform cache dir for throwaway display files.
    pub fn resolve() -> Self {
        let proj = ProjectDirs::from("", "", "rowmark");
        let state_dir = if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("rowmark")
        } else if let Some(pd) = &proj {
            pd.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".rowmark")
        };
        let cache_dir = proj
            .map(|pd| pd.cache_dir().to_path_buf())
            .unwrap_or_else(|| state_dir.join("cache"));
        Self {
            state_dir,
            cache_dir,
        }
    }

    /// Keep everything under one root, used by `--data-dir` and tests.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            cache_dir: root.join("cache"),
            state_dir: root,
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Small scalar state (row, crop, counter, widget positions...)
    pub fn kv_path(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }

    /// Image and pdf payloads
    pub fn blob_db_path(&self) -> PathBuf {
        self.state_dir.join("blobs.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("rowmark.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_paths_stay_under_root() {
        let dirs = AppDirs::rooted_at("/tmp/rowmark-test");
        assert!(dirs.kv_path().starts_with("/tmp/rowmark-test"));
        assert!(dirs.blob_db_path().starts_with("/tmp/rowmark-test"));
        assert!(dirs.cache_dir().starts_with("/tmp/rowmark-test"));
        assert_eq!(dirs.kv_path().file_name().unwrap(), "state.json");
    }
}
