//! Path management for InsideMentor configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/insidementor/     # Config directory
//! ├── config.toml             # Gateway tunables (MentorSettings)
//! └── secret.json             # Gemini / Firebase credentials (SecretConfig)
//! ```

use mentor_core::config::{FirebaseConfig, GeminiConfig, SecretConfig};
use mentor_core::{MentorError, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "insidementor";

/// Resolves configuration file locations, optionally under a custom base directory.
#[derive(Debug, Clone)]
pub struct MentorPaths {
    base: Option<PathBuf>,
}

impl MentorPaths {
    /// Uses `base` instead of the platform config directory when given.
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the configuration directory (e.g. `~/.config/insidementor/`).
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| MentorError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join(APP_DIR))
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn secret_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    /// Ensures the secret file exists, creating a template if it doesn't.
    ///
    /// The template carries the same `your_...` placeholders as the setup
    /// scripts, so a fresh install runs in fallback mode until edited.
    /// On Unix the file is created with mode 600.
    pub fn ensure_secret_file(&self) -> Result<PathBuf> {
        let secret_path = self.secret_file()?;
        if secret_path.exists() {
            return Ok(secret_path);
        }
        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            gemini: Some(GeminiConfig {
                api_key: "your_gemini_api_key_here".to_string(),
                model_name: None,
            }),
            firebase: Some(FirebaseConfig {
                api_key: Some("your_firebase_api_key_here".to_string()),
                auth_domain: Some("your_project_id.firebaseapp.com".to_string()),
                project_id: Some("your_project_id".to_string()),
                storage_bucket: Some("your_project_id.appspot.com".to_string()),
                messaging_sender_id: Some("your_messaging_sender_id".to_string()),
                app_id: Some("your_app_id".to_string()),
            }),
        };
        std::fs::write(&secret_path, serde_json::to_string_pretty(&template)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(secret_path)
    }
}

impl Default for MentorPaths {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_secret_file_writes_placeholder_template() {
        let dir = tempfile::tempdir().unwrap();
        let paths = MentorPaths::new(Some(dir.path()));

        let path = paths.ensure_secret_file().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let secrets: SecretConfig = serde_json::from_str(&content).unwrap();

        assert!(secrets.usable_gemini().is_none());
        assert!(secrets.usable_firebase().is_none());
    }
}
