use anyhow::{Context, Result};
use crucible_cli_api::models::Reviewer;
use serde::Serialize;

use crate::commands::utils::CrucibleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    All,
    Completed,
    Uncompleted,
}

pub async fn list_reviewers(ctx: &CrucibleContext<'_>, id: &str, which: Which) -> Result<()> {
    let reviewers = match which {
        Which::All => ctx.client.get_reviewers(id).await,
        Which::Completed => ctx.client.get_completed_reviewers(id).await,
        Which::Uncompleted => ctx.client.get_uncompleted_reviewers(id).await,
    }
    .with_context(|| format!("Failed to list reviewers of review {id}"))?;

    #[derive(Serialize)]
    struct Row<'a> {
        user_name: &'a str,
        display_name: &'a str,
        completed: bool,
    }

    let rows: Vec<Row<'_>> = reviewers
        .reviewer
        .iter()
        .map(|r: &Reviewer| Row {
            user_name: &r.user_name,
            display_name: &r.display_name,
            completed: r.completed,
        })
        .collect();

    ctx.renderer.render(&rows)
}

pub async fn add_reviewers(ctx: &CrucibleContext<'_>, id: &str, users: &[String]) -> Result<()> {
    ctx.client
        .add_reviewers(id, users)
        .await
        .with_context(|| format!("Failed to add reviewers to review {id}"))?;
    ctx.renderer
        .success(&format!("Added {} to review {id}", users.join(", ")));
    Ok(())
}

pub async fn remove_reviewer(ctx: &CrucibleContext<'_>, id: &str, user: &str) -> Result<()> {
    ctx.client
        .remove_reviewer(id, user)
        .await
        .with_context(|| format!("Failed to remove {user} from review {id}"))?;
    ctx.renderer
        .success(&format!("Removed {user} from review {id}"));
    Ok(())
}

pub async fn remind(ctx: &CrucibleContext<'_>, id: &str) -> Result<()> {
    ctx.client
        .remind_incomplete_reviewers(id)
        .await
        .with_context(|| format!("Failed to remind reviewers of review {id}"))?;
    ctx.renderer
        .success(&format!("Reminded incomplete reviewers of {id}"));
    Ok(())
}
