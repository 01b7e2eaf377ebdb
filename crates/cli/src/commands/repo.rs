use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use crucible_cli_api::models::Revision;
use crucible_cli_api::{ChangeSetSearch, RepositorySearch};
use serde::Serialize;

use super::utils::CrucibleContext;

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    #[command(subcommand)]
    command: RepoCommands,
}

#[derive(Subcommand, Debug, Clone)]
enum RepoCommands {
    /// List repositories
    List {
        /// Substring of the repository name
        #[arg(long)]
        name: Option<String>,
        /// Repository types (git, svn, hg, p4, cvs, plugin)
        #[arg(long = "type", value_delimiter = ',')]
        types: Vec<String>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        available: Option<bool>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Get repository details
    Get {
        repository: String,
    },
    /// List a directory of a repository
    Browse {
        repository: String,
        #[arg(default_value = "")]
        path: String,
    },
    /// Print the content of a file revision
    Content {
        repository: String,
        revision: String,
        path: String,
    },
    /// Show one changeset
    Changeset {
        repository: String,
        csid: String,
    },
    /// List changesets, newest first
    Changesets {
        repository: String,
        /// Only changesets touching this path
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        oldest: Option<String>,
        #[arg(long)]
        newest: Option<String>,
        #[arg(long)]
        max: Option<u32>,
    },
    /// Revision history of a file
    History {
        repository: String,
        revision: String,
        path: String,
    },
}

#[derive(Serialize)]
struct RevisionRow<'a> {
    path: &'a str,
    revision: &'a str,
}

fn revision_rows(revisions: &[Revision]) -> Vec<RevisionRow<'_>> {
    revisions
        .iter()
        .map(|r| RevisionRow {
            path: &r.path,
            revision: &r.revision,
        })
        .collect()
}

pub async fn execute(args: RepoArgs, ctx: &CrucibleContext<'_>) -> Result<()> {
    match args.command {
        RepoCommands::List {
            name,
            types,
            enabled,
            available,
            limit,
        } => {
            let search = RepositorySearch {
                name,
                enabled,
                available,
                types,
                limit,
            };
            let repositories = ctx
                .client
                .search_repositories(&search)
                .await
                .context("Failed to list repositories")?;

            #[derive(Serialize)]
            struct Row<'a> {
                name: &'a str,
                #[serde(rename = "type")]
                kind: &'a str,
                enabled: bool,
                available: bool,
            }

            let rows: Vec<Row<'_>> = repositories
                .repo_data
                .iter()
                .map(|r| Row {
                    name: &r.name,
                    kind: &r.kind,
                    enabled: r.enabled,
                    available: r.available,
                })
                .collect();
            ctx.renderer.render(&rows)
        }
        RepoCommands::Get { repository } => {
            let repository = ctx
                .client
                .get_repository(&repository)
                .await
                .with_context(|| format!("Failed to get repository {repository}"))?;
            ctx.renderer.render(&repository)
        }
        RepoCommands::Browse { repository, path } => {
            let listing = ctx
                .client
                .browse_repository(&repository, &path)
                .await
                .with_context(|| format!("Failed to browse {repository}/{path}"))?;

            #[derive(Serialize)]
            struct Row<'a> {
                kind: &'static str,
                path: &'a str,
            }

            let rows: Vec<Row<'_>> = listing
                .dir
                .iter()
                .map(|d| Row {
                    kind: "dir",
                    path: &d.path,
                })
                .chain(listing.file.iter().map(|f| Row {
                    kind: "file",
                    path: &f.path,
                }))
                .collect();
            ctx.renderer.render(&rows)
        }
        RepoCommands::Content {
            repository,
            revision,
            path,
        } => {
            let content = ctx
                .client
                .get_file_revision_content(&repository, &revision, &path)
                .await
                .with_context(|| format!("Failed to fetch {path}@{revision}"))?;
            print!("{content}");
            Ok(())
        }
        RepoCommands::Changeset { repository, csid } => {
            let change = ctx
                .client
                .get_change_set(&repository, &csid)
                .await
                .with_context(|| format!("Failed to get changeset {csid}"))?;
            ctx.renderer.render(&change)
        }
        RepoCommands::Changesets {
            repository,
            path,
            oldest,
            newest,
            max,
        } => {
            let search = ChangeSetSearch {
                path,
                oldest_csid: oldest,
                newest_csid: newest,
                max,
                ..Default::default()
            };
            let page = ctx
                .client
                .search_change_sets(&repository, &search)
                .await
                .with_context(|| format!("Failed to list changesets of {repository}"))?;

            #[derive(Serialize)]
            struct Row<'a> {
                csid: &'a str,
                author: &'a str,
                date: String,
                comment: &'a str,
            }

            let rows: Vec<Row<'_>> = page
                .change
                .iter()
                .map(|c| Row {
                    csid: &c.csid,
                    author: &c.author,
                    date: chrono::DateTime::from_timestamp_millis(c.date)
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_default(),
                    comment: c.comment.lines().next().unwrap_or(""),
                })
                .collect();
            if page.older_change_sets_exist {
                ctx.renderer
                    .warning("Older changesets exist; narrow with --oldest or raise --max");
            }
            ctx.renderer.render(&rows)
        }
        RepoCommands::History {
            repository,
            revision,
            path,
        } => {
            let history = ctx
                .client
                .get_versioned_entity_history(&repository, &revision, &path)
                .await
                .with_context(|| format!("Failed to get history of {path}"))?;
            ctx.renderer.render(&revision_rows(&history.revision))
        }
    }
}
