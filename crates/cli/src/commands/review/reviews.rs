use anyhow::{Context, Result};
use crucible_cli_api::models::{
    CreateReview, Review, ReviewFilter, ReviewState, ReviewTransition, Reviews, User,
};
use crucible_cli_api::ReviewSearch;
use serde::Serialize;

use crate::commands::utils::CrucibleContext;

#[derive(Serialize)]
struct Row<'a> {
    id: &'a str,
    name: &'a str,
    state: &'a str,
    author: &'a str,
    moderator: &'a str,
    project: &'a str,
}

impl<'a> From<&'a Review> for Row<'a> {
    fn from(review: &'a Review) -> Self {
        fn login(user: &Option<User>) -> &str {
            user.as_ref().map(|u| u.user_name.as_str()).unwrap_or("")
        }

        Row {
            id: review.id(),
            name: &review.name,
            state: review.state.as_str(),
            author: login(&review.author),
            moderator: login(&review.moderator),
            project: &review.project_key,
        }
    }
}

fn render_reviews(ctx: &CrucibleContext<'_>, reviews: &Reviews, detailed: bool) -> Result<()> {
    if detailed {
        return ctx.renderer.render(&reviews.review_data);
    }
    let rows: Vec<Row<'_>> = reviews.review_data.iter().map(Row::from).collect();
    ctx.renderer.render(&rows)
}

pub async fn list_reviews(
    ctx: &CrucibleContext<'_>,
    filter: Option<ReviewFilter>,
    state: Option<ReviewState>,
    detailed: bool,
) -> Result<()> {
    let reviews = match (filter, detailed) {
        (Some(filter), false) => ctx.client.filter_reviews(filter).await,
        (Some(filter), true) => ctx.client.filter_reviews_detailed(filter).await,
        (None, false) => ctx.client.get_reviews(state).await,
        (None, true) => ctx.client.get_reviews_detailed(state).await,
    }
    .context("Failed to list reviews")?;

    render_reviews(ctx, &reviews, detailed)
}

pub async fn get_review(ctx: &CrucibleContext<'_>, id: &str, detailed: bool) -> Result<()> {
    let review = if detailed {
        ctx.client.get_review_detailed(id).await
    } else {
        ctx.client.get_review(id).await
    }
    .with_context(|| format!("Failed to get review {id}"))?;

    ctx.renderer.render(&review)
}

pub struct NewReview {
    pub project: String,
    pub name: String,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub jira_issue: Option<String>,
    pub allow_join: bool,
}

impl NewReview {
    /// Review data for the create call. The current user becomes author and,
    /// unless another one is given, moderator.
    fn into_request(self, username: &str) -> CreateReview {
        let user = |name: &str| User {
            user_name: name.to_string(),
            ..Default::default()
        };

        let mut review = Review::new(self.project, self.name);
        review.description = self.description;
        review.author = Some(user(username));
        review.creator = Some(user(username));
        review.moderator = Some(user(self.moderator.as_deref().unwrap_or(username)));
        review.jira_issue_key = self.jira_issue;
        review.allow_reviewers_to_join = self.allow_join;
        CreateReview::new(review)
    }
}

pub async fn create_review(ctx: &CrucibleContext<'_>, request: NewReview) -> Result<()> {
    let request = request.into_request(&ctx.username);
    let review = ctx
        .client
        .create_review(&request)
        .await
        .context("Failed to create review")?;

    tracing::info!(id = review.id(), "Review created");
    ctx.renderer.success(&format!("Created review {}", review.id()));
    ctx.renderer.render(&Row::from(&review))
}

pub async fn delete_review(ctx: &CrucibleContext<'_>, id: &str) -> Result<()> {
    ctx.client
        .delete_review(id)
        .await
        .with_context(|| format!("Failed to delete review {id}"))?;
    ctx.renderer.success(&format!("Deleted review {id}"));
    Ok(())
}

pub async fn list_transitions(ctx: &CrucibleContext<'_>, id: &str) -> Result<()> {
    let transitions = ctx
        .client
        .get_review_transitions(id)
        .await
        .with_context(|| format!("Failed to get transitions of review {id}"))?;
    ctx.renderer.render(&transitions.transition_data)
}

pub async fn transition_review(
    ctx: &CrucibleContext<'_>,
    id: &str,
    transition: ReviewTransition,
    ignore_warnings: bool,
) -> Result<()> {
    let review = ctx
        .client
        .change_review_state(id, transition, ignore_warnings)
        .await
        .with_context(|| format!("Failed to apply {transition} to review {id}"))?;

    ctx.renderer
        .success(&format!("Review {} is now {}", id, review.state));
    Ok(())
}

pub async fn complete_review(
    ctx: &CrucibleContext<'_>,
    id: &str,
    complete: bool,
    ignore_warnings: bool,
) -> Result<()> {
    let result = if complete {
        ctx.client.complete_review(id, ignore_warnings).await
    } else {
        ctx.client.uncomplete_review(id, ignore_warnings).await
    };
    result.with_context(|| format!("Failed to update completion of review {id}"))?;

    let verb = if complete { "Completed" } else { "Uncompleted" };
    ctx.renderer.success(&format!("{verb} review {id}"));
    Ok(())
}

pub async fn close_review(ctx: &CrucibleContext<'_>, id: &str, summary: &str) -> Result<()> {
    ctx.client
        .close_review(id, summary)
        .await
        .with_context(|| format!("Failed to close review {id}"))?;
    ctx.renderer.success(&format!("Closed review {id}"));
    Ok(())
}

pub async fn search_by_term(ctx: &CrucibleContext<'_>, term: &str, max: u32) -> Result<()> {
    let reviews = ctx
        .client
        .search_reviews_by_term(term, max)
        .await
        .with_context(|| format!("Failed to search reviews for '{term}'"))?;
    render_reviews(ctx, &reviews, false)
}

pub async fn search_reviews(
    ctx: &CrucibleContext<'_>,
    search: &ReviewSearch,
    detailed: bool,
) -> Result<()> {
    let reviews = if detailed {
        ctx.client.search_reviews_detailed(search).await
    } else {
        ctx.client.search_reviews(search).await
    }
    .context("Failed to search reviews")?;
    render_reviews(ctx, &reviews, detailed)
}

pub async fn reviews_for_issue(ctx: &CrucibleContext<'_>, key: &str, max: u32) -> Result<()> {
    let reviews = ctx
        .client
        .get_reviews_for_issue(key, max)
        .await
        .with_context(|| format!("Failed to find reviews for issue {key}"))?;
    render_reviews(ctx, &reviews, false)
}

pub async fn reviews_for_file(
    ctx: &CrucibleContext<'_>,
    repository: &str,
    path: &str,
    detailed: bool,
) -> Result<()> {
    let reviews = if detailed {
        ctx.client
            .search_reviews_for_file_detailed(repository, path)
            .await
    } else {
        ctx.client.search_reviews_for_file(repository, path).await
    }
    .with_context(|| format!("Failed to find reviews containing {path}"))?;
    render_reviews(ctx, &reviews, detailed)
}
