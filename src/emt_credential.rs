// Bearer token loading
use crate::emt_models::{EmtError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The API bearer token. Loaded once and never refreshed.
#[derive(Clone, PartialEq)]
pub struct Credential {
    token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

impl Credential {
    pub const FILE_NAME: &'static str = "token.txt";

    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EmtError::Credential("token is empty".to_string()));
        }
        Ok(Credential {
            token: token.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EmtError::Credential(format!("missing token file {}", path.display())));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| EmtError::Credential(format!("failed to read {}: {}", path.display(), e)))?;

        Self::new(&contents)
            .map_err(|_| EmtError::Credential(format!("{} is empty", path.display())))
    }

    /// `token.txt` in the working directory, else the per-user config dir.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(Self::FILE_NAME);
        if local.exists() {
            return local;
        }

        match dirs::config_dir() {
            Some(mut path) => {
                path.push("emt_bus");
                path.push(Self::FILE_NAME);
                if path.exists() { path } else { local }
            }
            None => local,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}
