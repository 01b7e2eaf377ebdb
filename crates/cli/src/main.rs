mod commands;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use commands::auth::{self, AuthCommand};
use commands::utils::{resolve_active_profile, CrucibleContext};
use crucible_cli_api::ApiError;
use crucible_cli_auth::CredentialStore;
use crucible_cli_config::Config;
use crucible_cli_output::{OutputFormat, OutputRenderer};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crucible-cli", version, about = "Command line client for Crucible code reviews", long_about = None)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.crucible-cli/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: CrucibleCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum CrucibleCommand {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Review commands
    Review(commands::review::ReviewArgs),
    /// User commands
    User(commands::user::UserArgs),
    /// Repository commands
    Repo(commands::repo::RepoArgs),
    /// Pick a review awaiting you, or the create entry
    Pick(commands::pick::PickArgs),
    /// Show client and server versions
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let result = run(cli).await;
    if let Err(err) = &result {
        if let Some(hint) = err.downcast_ref::<ApiError>().and_then(ApiError::suggestion) {
            tracing::warn!("{hint}");
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    let mut config = Config::load(config_path.as_ref())?;
    let renderer = OutputRenderer::new(cli.output);
    let credential_store = CredentialStore::new("crucible-cli")?;

    let command = match cli.command {
        CrucibleCommand::Auth(command) => {
            return auth::handle(
                command,
                &mut config,
                config_path.as_deref(),
                cli.profile.as_deref(),
                &credential_store,
                &renderer,
            )
            .await;
        }
        other => other,
    };

    let profile = resolve_active_profile(&config, cli.profile.as_deref(), &credential_store)?;
    tracing::debug!(profile = %profile.name, base_url = %profile.base_url, "Using profile");
    let ctx = CrucibleContext {
        client: profile.client()?,
        renderer: &renderer,
        username: profile.username.clone(),
    };

    match command {
        CrucibleCommand::Review(args) => commands::review::execute(args, &ctx).await,
        CrucibleCommand::User(args) => commands::user::execute(args, &ctx).await,
        CrucibleCommand::Repo(args) => commands::repo::execute(args, &ctx).await,
        CrucibleCommand::Pick(args) => commands::pick::execute(args, &ctx).await,
        CrucibleCommand::Version => show_version(&ctx).await,
        CrucibleCommand::Auth(_) => unreachable!("auth commands return early"),
    }
}

async fn show_version(ctx: &CrucibleContext<'_>) -> Result<()> {
    let server = ctx.client.get_version_info().await?;

    #[derive(Serialize)]
    struct Row<'a> {
        client: &'a str,
        server: &'a str,
        build_date: &'a str,
    }

    ctx.renderer.render(&Row {
        client: env!("CARGO_PKG_VERSION"),
        server: &server.release_number,
        build_date: &server.build_date,
    })
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,crucible_cli=debug,crucible_cli_api=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}
