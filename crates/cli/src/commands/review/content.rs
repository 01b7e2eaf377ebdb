use std::path::Path;

use anyhow::{Context, Result};
use crucible_cli_api::models::{Anchor, Patch};
use serde::Serialize;

use crate::commands::utils::{upload_from_path, CrucibleContext};

pub async fn list_items(ctx: &CrucibleContext<'_>, id: &str) -> Result<()> {
    let items = ctx
        .client
        .get_review_items(id)
        .await
        .with_context(|| format!("Failed to list items of review {id}"))?;

    #[derive(Serialize)]
    struct Row<'a> {
        id: &'a str,
        repository: &'a str,
        path: &'a str,
        from_revision: &'a str,
        to_revision: &'a str,
        commit_type: &'a str,
    }

    let rows: Vec<Row<'_>> = items
        .review_item
        .iter()
        .map(|item| Row {
            id: item.id(),
            repository: &item.repository_name,
            path: if item.to_path.is_empty() {
                &item.from_path
            } else {
                &item.to_path
            },
            from_revision: &item.from_revision,
            to_revision: &item.to_revision,
            commit_type: item.commit_type.as_deref().unwrap_or(""),
        })
        .collect();

    ctx.renderer.render(&rows)
}

pub async fn add_patch(
    ctx: &CrucibleContext<'_>,
    id: &str,
    file: &Path,
    anchor: Option<(String, String)>,
    strip: u32,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read patch {}", file.display()))?;

    let patch = Patch {
        patch: text,
        anchor: anchor.map(|(repository, path)| Anchor {
            anchor_path: path,
            anchor_repository: repository,
            strip_count: strip,
        }),
        source: None,
    };

    let review = ctx
        .client
        .add_patch(id, &patch)
        .await
        .with_context(|| format!("Failed to add patch to review {id}"))?;

    ctx.renderer
        .success(&format!("Added {} to review {}", file.display(), review.id()));
    Ok(())
}

pub async fn add_file(ctx: &CrucibleContext<'_>, id: &str, file: &Path) -> Result<()> {
    let upload = upload_from_path(file).await?;
    tracing::debug!(file = %file.display(), "Uploading file");

    let item = ctx
        .client
        .add_file(id, upload)
        .await
        .with_context(|| format!("Failed to upload {} to review {id}", file.display()))?;

    ctx.renderer
        .success(&format!("Added {} as item {}", file.display(), item.id()));
    Ok(())
}
