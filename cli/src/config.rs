use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory and create it if needed.
    ///
    /// `data_dir` comes from `--data-dir` / `WEIGHTLOG_DATA_DIR` and wins over
    /// the per-user default.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "weightlog")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("weightlog.db");

        Ok(Config { db_path, data_dir })
    }
}
