//! Path resolution for the record snapshot

use std::path::PathBuf;

/// Resolves where sitecheck keeps its files
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Default data directory: `~/.sitecheck`
    pub fn new() -> std::io::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;

        Ok(Self {
            data_dir: home.join(".sitecheck"),
        })
    }

    /// Use an explicit data directory
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Get records.jsonl path
    pub fn records_file(&self) -> PathBuf {
        self.data_dir.join("records.jsonl")
    }

    /// Held exclusively while the snapshot is rewritten
    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join("records.lock")
    }

    /// Directory export files are written to
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_new() {
        let paths = Paths::new().unwrap();
        assert!(paths.data_dir.ends_with(".sitecheck"));
    }

    #[test]
    fn test_records_file() {
        let paths = Paths::at("/tmp/sc");
        assert_eq!(paths.records_file(), PathBuf::from("/tmp/sc/records.jsonl"));
        assert_eq!(paths.lock_file(), PathBuf::from("/tmp/sc/records.lock"));
        assert_eq!(paths.exports_dir(), PathBuf::from("/tmp/sc/exports"));
    }
}
