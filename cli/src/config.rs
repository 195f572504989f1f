use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DB_ENV_VAR: &str = "FITLOG_DB";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database location: `FITLOG_DB` if set, otherwise
    /// `fitlog.db` in the platform data directory.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(DB_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::from_db_path(PathBuf::from(path));
        }

        let proj_dirs =
            ProjectDirs::from("", "", "fitlog").context("Could not determine home directory")?;
        Self::from_data_dir(proj_dirs.data_dir())
    }

    pub fn from_data_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(Config {
            db_path: data_dir.join("fitlog.db"),
        })
    }

    fn from_db_path(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
        Ok(Config { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("fitlog");
        let config = Config::from_data_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(config.db_path, dir.join("fitlog.db"));
    }

    #[test]
    fn test_explicit_path_creates_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a").join("b.db");
        let config = Config::from_db_path(path.clone()).unwrap();
        assert_eq!(config.db_path, path);
        assert!(tmp.path().join("a").is_dir());
    }

    #[test]
    fn test_bare_file_name_is_accepted() {
        let config = Config::from_db_path(PathBuf::from("fitlog.db")).unwrap();
        assert_eq!(config.db_path, PathBuf::from("fitlog.db"));
    }
}
