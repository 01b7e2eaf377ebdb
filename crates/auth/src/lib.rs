use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Key under which a profile's password is stored.
///
/// The server address is part of the key so that re-pointing a profile at
/// another server does not reuse the old password.
pub fn token_key(base_url: &str, profile: &str) -> String {
    format!("{}|{}", base_url.trim_end_matches('/'), profile)
}

/// Passwords kept in a JSON file readable only by the owner.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `~/.{service}/credentials`.
    pub fn new(service: &str) -> Result<Self> {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Ok(Self::with_path(
            home.join(format!(".{service}")).join("credentials"),
        ))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_secret(&self, account: &str, secret: &str) -> Result<()> {
        let mut creds = self.load()?;
        creds.insert(account.to_string(), secret.to_string());
        self.write(&creds)?;
        debug!(account, path = %self.path.display(), "Stored credential");
        Ok(())
    }

    pub fn get_secret(&self, account: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(account))
    }

    /// Removes a secret. Returns whether one was stored.
    pub fn delete_secret(&self, account: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let mut creds = self.load()?;
        let removed = creds.remove(account).is_some();
        if removed {
            self.write(&creds)?;
        }
        Ok(removed)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write(&self, creds: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let json = serde_json::to_string_pretty(creds)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::with_path(dir.path().join("nested").join("credentials"))
    }

    #[test]
    fn test_token_key() {
        assert_eq!(
            token_key("https://review.example.com/", "work"),
            "https://review.example.com|work"
        );
        assert_ne!(
            token_key("https://a.example.com", "work"),
            token_key("https://b.example.com", "work")
        );
    }

    #[test]
    fn test_set_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert_eq!(store.get_secret("work").unwrap(), None);

        store.set_secret("work", "s3cret").unwrap();
        store.set_secret("home", "other").unwrap();
        assert_eq!(store.get_secret("work").unwrap().as_deref(), Some("s3cret"));

        assert!(store.delete_secret("work").unwrap());
        assert!(!store.delete_secret("work").unwrap());
        assert_eq!(store.get_secret("work").unwrap(), None);
        assert_eq!(store.get_secret("home").unwrap().as_deref(), Some("other"));
    }

    #[test]
    fn test_delete_without_file() {
        let dir = TempDir::new().unwrap();
        assert!(!store(&dir).delete_secret("work").unwrap());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials");
        fs::write(&path, "not json").unwrap();

        let store = CredentialStore::with_path(&path);
        assert!(store.get_secret("work").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.set_secret("work", "s3cret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
