use std::path::PathBuf;

/// Explicit configuration threaded into entry points. Nothing in this
/// crate reads ambient/global state.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Default per-user database location, created on first use.
    pub fn locate() -> std::io::Result<Self> {
        let proj_dirs = directories::ProjectDirs::from("com", "finport", "finport")
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not determine data directory",
                )
            })?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(Self::new(data_dir.join("finport.db")))
    }
}
