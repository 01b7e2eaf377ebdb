use std::path::Path;

use anyhow::{anyhow, Context, Result};
use crucible_cli_auth::{token_key, CredentialStore};
use crucible_cli_config::{Config, Profile};
use crucible_cli_output::OutputRenderer;
use clap::{Args, Subcommand};
use serde::Serialize;
use url::Url;

use super::utils::resolve_active_profile;

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Add or update a profile and store its password
    Login(LoginArgs),
    /// Remove the stored password (and optionally the profile)
    Logout(LogoutArgs),
    /// List configured profiles
    List,
    /// Show the server-side profile of the current user
    Whoami,
    /// Check that the stored credentials are accepted by the server
    Test,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Server address including any context path (e.g. https://example.com/fecru).
    #[arg(long)]
    pub base_url: String,
    /// Crucible login name.
    #[arg(long)]
    pub username: String,
    /// Password to store (falls back to CRUCIBLE_PASSWORD or an interactive prompt).
    #[arg(long, env = "CRUCIBLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Mark this profile as the default one.
    #[arg(long)]
    pub default: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LogoutArgs {
    /// Remove the profile from config entirely (not just the stored password).
    #[arg(long)]
    pub remove_profile: bool,
}

/// Profile used by login when `--profile` is not given.
pub const DEFAULT_PROFILE: &str = "default";

pub async fn handle(
    command: AuthCommand,
    config: &mut Config,
    config_path: Option<&Path>,
    requested_profile: Option<&str>,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    match command {
        AuthCommand::Login(args) => {
            let profile = requested_profile.unwrap_or(DEFAULT_PROFILE);
            login(args, profile, config, config_path, store, renderer)
        }
        AuthCommand::Logout(args) => {
            let profile = match requested_profile {
                Some(name) => name.to_string(),
                None => config
                    .resolve_profile(None)
                    .map(|(name, _)| name.to_string())
                    .ok_or_else(|| anyhow!("No profile configured"))?,
            };
            logout(args, &profile, config, config_path, store, renderer)
        }
        AuthCommand::List => list_profiles(config, store, renderer),
        AuthCommand::Whoami => whoami(config, requested_profile, store, renderer).await,
        AuthCommand::Test => test_auth(config, requested_profile, store, renderer).await,
    }
}

fn login(
    args: LoginArgs,
    profile: &str,
    config: &mut Config,
    config_path: Option<&Path>,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    if profile.trim().is_empty() {
        return Err(anyhow!("Profile name cannot be empty"));
    }

    let base_url = Url::parse(&args.base_url)
        .with_context(|| format!("Invalid server URL: {}", args.base_url))?;
    let base_url = base_url.as_str().trim_end_matches('/').to_string();

    let password = match args.password {
        Some(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password(format!("Password for {}: ", args.username))
            .context("Failed to read password from prompt")?,
    };
    if password.is_empty() {
        return Err(anyhow!("Password cannot be empty"));
    }

    config.upsert_profile(
        profile,
        Profile {
            base_url: Some(base_url.clone()),
            username: Some(args.username.clone()),
        },
    );
    if args.default {
        config.default_profile = Some(profile.to_string());
    }

    store
        .set_secret(&token_key(&base_url, profile), &password)
        .context("Failed to store password")?;

    config
        .save(config_path)
        .context("Unable to persist configuration file")?;

    tracing::info!(profile, base_url = %base_url, "Profile saved");
    renderer.success(&format!("Profile '{profile}' saved"));
    Ok(())
}

fn logout(
    args: LogoutArgs,
    name: &str,
    config: &mut Config,
    config_path: Option<&Path>,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    let profile = config
        .profile(name)
        .ok_or_else(|| anyhow!("Profile '{name}' does not exist"))?;

    if let Some(base_url) = profile.base_url.as_deref() {
        store
            .delete_secret(&token_key(base_url, name))
            .context("Failed to delete stored password")?;
    }

    if args.remove_profile {
        config.remove_profile(name);
        config
            .save(config_path)
            .context("Unable to persist configuration file")?;
    }

    tracing::info!(profile = name, "Credentials removed");
    renderer.success(&format!("Logged out of '{name}'"));
    Ok(())
}

fn list_profiles(
    config: &Config,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        name: &'a str,
        base_url: &'a str,
        username: &'a str,
        has_password: bool,
        is_default: bool,
    }

    let mut rows = Vec::new();
    for (name, profile) in &config.profiles {
        let base_url = profile.base_url.as_deref().unwrap_or("");
        let has_password = store.get_secret(&token_key(base_url, name))?.is_some();
        rows.push(Row {
            name,
            base_url,
            username: profile.username.as_deref().unwrap_or(""),
            has_password,
            is_default: config.default_profile.as_deref() == Some(name.as_str()),
        });
    }

    if rows.is_empty() {
        tracing::info!("No profiles configured yet. Use `crucible-cli auth login` to add one.");
        return Ok(());
    }

    renderer.render(&rows)
}

async fn whoami(
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    let active = resolve_active_profile(config, requested, store)?;
    let profile = active
        .client()?
        .get_user_profile(&active.username)
        .await
        .with_context(|| format!("Failed to fetch profile of '{}'", active.username))?;

    #[derive(Serialize)]
    struct Row<'a> {
        profile: &'a str,
        user_name: &'a str,
        display_name: &'a str,
        email: &'a str,
        time_zone: &'a str,
    }

    renderer.render(&Row {
        profile: &active.name,
        user_name: &profile.user_data.user_name,
        display_name: &profile.user_data.display_name,
        email: profile.email.as_deref().unwrap_or(""),
        time_zone: profile
            .time_zone
            .as_ref()
            .map(|tz| tz.name.as_str())
            .unwrap_or(""),
    })
}

async fn test_auth(
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    let active = resolve_active_profile(config, requested, store)?;
    tracing::info!(profile = %active.name, base_url = %active.base_url, "Testing authentication");

    let client = active.client()?;
    let version = client
        .get_version_info()
        .await
        .context("Server did not answer")?;
    client
        .get_user_profile(&active.username)
        .await
        .context("Authentication test failed")?;

    renderer.success(&format!(
        "Authenticated as {} on {} (Crucible {})",
        active.username, active.base_url, version.release_number
    ));
    Ok(())
}
