use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory under the home directory holding config and credentials.
pub const APP_DIR: &str = ".crucible-cli";

/// Represents the full CLI configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Persist the configuration to disk, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let serialized = serde_yaml::to_string(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Adds or replaces a profile. The first profile becomes the default.
    pub fn upsert_profile(&mut self, name: &str, profile: Profile) {
        self.profiles.insert(name.to_string(), profile);
        if self.default_profile.is_none() {
            self.default_profile = Some(name.to_string());
        }
    }

    /// Removes a profile and clears the default if it pointed there.
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        let removed = self.profiles.remove(name);
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        removed
    }

    /// Requested profile, else the default one, else the first by name.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        if let Some(name) = requested {
            self.profiles.get(name).map(|profile| (name, profile))
        } else if let Some(default_name) = self.default_profile.as_deref() {
            self.profiles
                .get(default_name)
                .map(|profile| (default_name, profile))
        } else {
            self.profiles
                .iter()
                .next()
                .map(|(name, profile)| (name.as_str(), profile))
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push("config.yaml");
        path
    }
}

/// Server address and login of one review server. Passwords live in the
/// credential store or the environment, never here.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Profile {
    pub base_url: Option<String>,
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn profile(base_url: &str) -> Profile {
        Profile {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load(Some("/nonexistent/config.yaml")).unwrap();
        assert!(config.profiles.is_empty());
        assert!(config.default_profile.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.upsert_profile(
            "work",
            Profile {
                base_url: Some("https://review.example.com/fecru".to_string()),
                username: Some("bob".to_string()),
            },
        );

        let temp_file = NamedTempFile::new().unwrap();
        config.save(Some(temp_file.path())).unwrap();
        let loaded = Config::load(Some(temp_file.path())).unwrap();

        assert_eq!(loaded.default_profile.as_deref(), Some("work"));
        let work = loaded.profile("work").unwrap();
        assert_eq!(work.base_url.as_deref(), Some("https://review.example.com/fecru"));
        assert_eq!(work.username.as_deref(), Some("bob"));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "invalid: yaml: [unclosed").unwrap();

        let err = Config::load(Some(temp_file.path())).unwrap_err();
        assert!(err.to_string().contains("Malformed YAML"));
    }

    #[test]
    fn test_resolve_profile_order() {
        let mut config = Config::default();
        config.profiles.insert("b".to_string(), profile("https://b.example.com"));
        config.profiles.insert("a".to_string(), profile("https://a.example.com"));

        let (name, _) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "a");

        config.default_profile = Some("b".to_string());
        let (name, _) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "b");

        let (name, found) = config.resolve_profile(Some("a")).unwrap();
        assert_eq!(name, "a");
        assert_eq!(found.base_url.as_deref(), Some("https://a.example.com"));

        assert!(config.resolve_profile(Some("missing")).is_none());
    }

    #[test]
    fn test_resolve_profile_none_available() {
        assert!(Config::default().resolve_profile(None).is_none());
    }

    #[test]
    fn test_remove_default_profile() {
        let mut config = Config::default();
        config.upsert_profile("work", profile("https://review.example.com"));
        config.upsert_profile("home", profile("https://home.example.com"));
        assert_eq!(config.default_profile.as_deref(), Some("work"));

        assert!(config.remove_profile("work").is_some());
        assert!(config.default_profile.is_none());
        assert!(config.remove_profile("work").is_none());
        assert_eq!(config.resolve_profile(None).unwrap().0, "home");
    }

    #[test]
    fn test_yaml_layout() {
        let mut config = Config::default();
        config.upsert_profile(
            "prod",
            Profile {
                base_url: Some("https://review.example.com".to_string()),
                username: Some("admin".to_string()),
            },
        );

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("default_profile: prod"));
        assert!(yaml.contains("base_url: https://review.example.com"));
        assert!(yaml.contains("username: admin"));
        assert!(!yaml.contains("password"));
    }
}
