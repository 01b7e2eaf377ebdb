use anyhow::{Context, Result};
use crucible_cli_api::models::{Comment, GeneralComment};
use serde::Serialize;

use crate::commands::utils::CrucibleContext;

pub enum Scope {
    All,
    General,
    Versioned,
    Item(String),
}

#[derive(Serialize)]
struct Row {
    id: String,
    parent: String,
    author: String,
    created: String,
    draft: bool,
    defect: bool,
    message: String,
}

/// Comments with their replies, depth first.
fn flatten(comments: &[Comment], parent: &str, rows: &mut Vec<Row>) {
    for comment in comments {
        rows.push(Row {
            id: comment.id().to_string(),
            parent: parent.to_string(),
            author: comment
                .user
                .as_ref()
                .map(|u| u.user_name.clone())
                .unwrap_or_default(),
            created: comment
                .create_date
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            draft: comment.draft,
            defect: comment.defect_raised,
            message: comment.message.clone(),
        });
        flatten(&comment.replies, comment.id(), rows);
    }
}

pub async fn list_comments(
    ctx: &CrucibleContext<'_>,
    id: &str,
    scope: Scope,
    render: bool,
) -> Result<()> {
    let comments = match &scope {
        Scope::All => ctx.client.get_comments(id, render).await,
        Scope::General => ctx.client.get_general_comments(id, render).await,
        Scope::Versioned => ctx.client.get_versioned_comments(id, render).await,
        Scope::Item(item) => ctx.client.get_review_item_comments(id, item, render).await,
    }
    .with_context(|| format!("Failed to list comments of review {id}"))?;

    if render {
        return ctx.renderer.render(&comments.comments);
    }

    let mut rows = Vec::new();
    flatten(&comments.comments, "", &mut rows);
    ctx.renderer.render(&rows)
}

pub async fn add_comment(
    ctx: &CrucibleContext<'_>,
    id: &str,
    item: Option<&str>,
    message: &str,
    draft: bool,
    defect: bool,
) -> Result<()> {
    let comment = GeneralComment::new(message).draft(draft).defect(defect);
    let created = match item {
        Some(item) => ctx.client.add_review_item_comment(id, item, &comment).await,
        None => ctx.client.add_comment(id, &comment).await,
    }
    .with_context(|| format!("Failed to comment on review {id}"))?;

    ctx.renderer
        .success(&format!("Added comment {} to {id}", created.id()));
    Ok(())
}

pub async fn reply(
    ctx: &CrucibleContext<'_>,
    id: &str,
    comment_id: &str,
    message: &str,
    draft: bool,
) -> Result<()> {
    let reply = GeneralComment::new(message).draft(draft);
    let created = ctx
        .client
        .add_comment_reply(id, comment_id, &reply)
        .await
        .with_context(|| format!("Failed to reply to comment {comment_id}"))?;

    ctx.renderer
        .success(&format!("Added reply {} to {comment_id}", created.id()));
    Ok(())
}

pub async fn publish(ctx: &CrucibleContext<'_>, id: &str, comment: Option<&str>) -> Result<()> {
    match comment {
        Some(comment) => {
            ctx.client
                .publish_draft_comment(id, comment)
                .await
                .with_context(|| format!("Failed to publish comment {comment}"))?;
            ctx.renderer.success(&format!("Published comment {comment}"));
        }
        None => {
            ctx.client
                .publish_all_draft_comments(id)
                .await
                .with_context(|| format!("Failed to publish drafts of review {id}"))?;
            ctx.renderer
                .success(&format!("Published all draft comments of {id}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_includes_replies() {
        let comments: Vec<Comment> = serde_json::from_value(json!([
            {
                "permaId": {"id": "CMT:1"},
                "message": "Why?",
                "user": {"userName": "amy"},
                "createDate": 0,
                "replies": [
                    {"permaId": {"id": "CMT:2"}, "message": "Because", "user": {"userName": "bob"}}
                ]
            },
            {"permaId": {"id": "CMT:3"}, "message": "Fix typo", "defectRaised": true}
        ]))
        .unwrap();

        let mut rows = Vec::new();
        flatten(&comments, "", &mut rows);

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["CMT:1", "CMT:2", "CMT:3"]);
        assert_eq!(rows[1].parent, "CMT:1");
        assert_eq!(rows[1].author, "bob");
        assert_eq!(rows[0].created, "1970-01-01T00:00:00+00:00");
        assert!(rows[2].defect);
    }
}
