use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use super::utils::CrucibleContext;

#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    #[command(subcommand)]
    command: UserCommands,
}

#[derive(Subcommand, Debug, Clone)]
enum UserCommands {
    /// List users, or look up the given user names
    List {
        #[arg(value_delimiter = ',')]
        usernames: Vec<String>,
    },
    /// Show a user's profile (defaults to the current user)
    Profile {
        username: Option<String>,
    },
    /// Find the user mapped to a repository committer name
    Committer {
        repository: String,
        committer: String,
    },
}

pub async fn execute(args: UserArgs, ctx: &CrucibleContext<'_>) -> Result<()> {
    match args.command {
        UserCommands::List { usernames } => list_users(ctx, &usernames).await,
        UserCommands::Profile { username } => {
            let username = username.as_deref().unwrap_or(&ctx.username);
            user_profile(ctx, username).await
        }
        UserCommands::Committer {
            repository,
            committer,
        } => committer_user(ctx, &repository, &committer).await,
    }
}

async fn list_users(ctx: &CrucibleContext<'_>, usernames: &[String]) -> Result<()> {
    let users = ctx
        .client
        .get_users(usernames)
        .await
        .context("Failed to list users")?;
    ctx.renderer.render(&users)
}

async fn user_profile(ctx: &CrucibleContext<'_>, username: &str) -> Result<()> {
    let profile = ctx
        .client
        .get_user_profile(username)
        .await
        .with_context(|| format!("Failed to get profile of {username}"))?;

    #[derive(Serialize)]
    struct Row<'a> {
        user_name: &'a str,
        display_name: &'a str,
        email: &'a str,
        time_zone: &'a str,
        committers: String,
    }

    let committers = profile
        .mapped_committers
        .committers
        .iter()
        .map(|c| format!("{}@{}", c.committer_name, c.repository_name))
        .collect::<Vec<_>>()
        .join(", ");

    ctx.renderer.render(&Row {
        user_name: &profile.user_data.user_name,
        display_name: &profile.user_data.display_name,
        email: profile.email.as_deref().unwrap_or(""),
        time_zone: profile
            .time_zone
            .as_ref()
            .map(|tz| tz.name.as_str())
            .unwrap_or(""),
        committers,
    })
}

async fn committer_user(
    ctx: &CrucibleContext<'_>,
    repository: &str,
    committer: &str,
) -> Result<()> {
    let user = ctx
        .client
        .get_user_committer(repository, committer)
        .await
        .with_context(|| format!("No user mapped to {committer} in {repository}"))?;
    ctx.renderer.render(&user)
}
