use std::path::Path;

use anyhow::{anyhow, Context, Result};
use crucible_cli_api::{ClientConfig, CrucibleClient, Upload, UploadStream};
use crucible_cli_auth::{token_key, CredentialStore};
use crucible_cli_config::Config;
use crucible_cli_output::OutputRenderer;
use tokio_util::io::ReaderStream;

/// Generic password variable, consulted after the per-profile one.
pub const PASSWORD_ENV: &str = "CRUCIBLE_PASSWORD";

pub struct CrucibleContext<'a> {
    pub client: CrucibleClient,
    pub renderer: &'a OutputRenderer,
    /// Login of the active profile.
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct ActiveProfile {
    pub name: String,
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl ActiveProfile {
    pub fn client(&self) -> Result<CrucibleClient> {
        let config = ClientConfig::new(&self.base_url)
            .with_context(|| format!("Invalid base_url for profile '{}'", self.name))?
            .with_basic_auth(&self.username, &self.password);
        Ok(CrucibleClient::new(config)?)
    }
}

/// `CRUCIBLE_CLI_PASSWORD_WORK` for profile `work`.
pub fn profile_password_env(profile: &str) -> String {
    let suffix: String = profile
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("CRUCIBLE_CLI_PASSWORD_{suffix}")
}

pub fn resolve_active_profile(
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
) -> Result<ActiveProfile> {
    resolve_with_env(config, requested, store, |key| std::env::var(key).ok())
}

/// Password lookup: profile variable, then the generic variable, then the
/// credential store.
fn resolve_with_env(
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ActiveProfile> {
    let (name, profile) = config.resolve_profile(requested).ok_or_else(|| match requested {
        Some(name) => anyhow!("Profile '{name}' does not exist"),
        None => anyhow!("No profile configured. Run `crucible-cli auth login` first."),
    })?;

    let base_url = profile
        .base_url
        .clone()
        .ok_or_else(|| anyhow!("Profile '{name}' is missing a base_url."))?;
    let username = profile
        .username
        .clone()
        .ok_or_else(|| anyhow!("Profile '{name}' is missing a username."))?;

    let profile_env = profile_password_env(name);
    let from_env = env(&profile_env)
        .filter(|p| !p.is_empty())
        .or_else(|| env(PASSWORD_ENV).filter(|p| !p.is_empty()));

    let password = match from_env {
        Some(password) => password,
        None => store
            .get_secret(&token_key(&base_url, name))?
            .ok_or_else(|| {
                anyhow!(
                    "No password found for profile '{name}'. Set {profile_env} or run `crucible-cli auth login --profile {name}`"
                )
            })?,
    };

    Ok(ActiveProfile {
        name: name.to_string(),
        base_url,
        username,
        password,
    })
}

/// Streams a local file as an upload without reading it into memory.
pub async fn upload_from_path(path: &Path) -> Result<Upload> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let content: UploadStream = Box::pin(ReaderStream::new(file));
    Ok(Upload::new(file_name, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_cli_config::Profile;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config() -> Config {
        let mut config = Config::default();
        config.upsert_profile(
            "work",
            Profile {
                base_url: Some("https://review.example.com".to_string()),
                username: Some("bob".to_string()),
            },
        );
        config
    }

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_profile_password_env() {
        assert_eq!(profile_password_env("work"), "CRUCIBLE_CLI_PASSWORD_WORK");
        assert_eq!(profile_password_env("my-box"), "CRUCIBLE_CLI_PASSWORD_MY_BOX");
    }

    #[test]
    fn test_password_lookup_order() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials"));
        store
            .set_secret(&token_key("https://review.example.com", "work"), "stored")
            .unwrap();
        let config = config();

        let active = resolve_with_env(&config, None, &store, env_of(&[])).unwrap();
        assert_eq!(active.password, "stored");
        assert_eq!(active.username, "bob");

        let env = env_of(&[(PASSWORD_ENV, "generic")]);
        let active = resolve_with_env(&config, None, &store, env).unwrap();
        assert_eq!(active.password, "generic");

        let env = env_of(&[
            (PASSWORD_ENV, "generic"),
            ("CRUCIBLE_CLI_PASSWORD_WORK", "specific"),
        ]);
        let active = resolve_with_env(&config, Some("work"), &store, env).unwrap();
        assert_eq!(active.password, "specific");
    }

    #[test]
    fn test_missing_password() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials"));

        let err = resolve_with_env(&config(), None, &store, env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("CRUCIBLE_CLI_PASSWORD_WORK"));
    }

    #[test]
    fn test_unknown_profile() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials"));

        let err = resolve_with_env(&config(), Some("home"), &store, env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("'home' does not exist"));
    }

    #[tokio::test]
    async fn test_upload_from_path() {
        use futures::StreamExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diff.patch");
        std::fs::write(&path, "--- a\n+++ b\n").unwrap();

        let upload = upload_from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "diff.patch");

        let mut content = upload.content;
        let mut bytes = Vec::new();
        while let Some(chunk) = content.next().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(bytes, b"--- a\n+++ b\n");
    }
}
