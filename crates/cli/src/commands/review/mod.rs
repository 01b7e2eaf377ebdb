use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use crucible_cli_api::models::{ReviewFilter, ReviewState, ReviewTransition};
use crucible_cli_api::ReviewSearch;

mod comments;
mod content;
mod participants;
mod reviews;

use super::utils::CrucibleContext;

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    #[command(subcommand)]
    command: ReviewCommands,
}

#[derive(Subcommand, Debug, Clone)]
enum ReviewCommands {
    /// List reviews, optionally by predefined filter or state
    List {
        /// Predefined filter (toReview, outForReview, drafts, open, ...)
        #[arg(long, conflicts_with = "state")]
        filter: Option<ReviewFilter>,
        /// Only reviews in this state
        #[arg(long)]
        state: Option<ReviewState>,
        /// Include review items and comments
        #[arg(long)]
        detailed: bool,
    },
    /// Get review details
    Get {
        /// Review id (e.g. CR-45)
        id: String,
        /// Include review items, reviewers and comments
        #[arg(long)]
        detailed: bool,
    },
    /// Create a new review in Draft state
    Create {
        /// Project key
        #[arg(long)]
        project: String,
        /// Review name
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Moderator user name
        #[arg(long)]
        moderator: Option<String>,
        /// Linked Jira issue key
        #[arg(long)]
        jira_issue: Option<String>,
        /// Allow reviewers to join on their own
        #[arg(long)]
        allow_join: bool,
    },
    /// Delete a review
    Delete {
        id: String,
    },
    /// Apply a workflow transition, or list the available ones
    Transition {
        id: String,
        /// Transition name (submit, approve, summarize, close, reopen, abandon, ...)
        action: Option<ReviewTransition>,
        /// Proceed despite failed conditions
        #[arg(long)]
        ignore_warnings: bool,
    },
    /// Mark the review complete for the current reviewer
    Complete {
        id: String,
        #[arg(long)]
        ignore_warnings: bool,
    },
    /// Undo completing the review
    Uncomplete {
        id: String,
        #[arg(long)]
        ignore_warnings: bool,
    },
    /// Close a summarized review
    Close {
        id: String,
        /// Closing summary
        #[arg(long, default_value = "")]
        summary: String,
    },
    /// Remind reviewers who have not completed
    Remind {
        id: String,
    },
    /// Search reviews by criteria
    Search {
        /// Free text term matched against name, description, state and id
        #[arg(long, conflicts_with_all = ["title", "author", "moderator", "creator", "reviewer", "states", "project"])]
        term: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        moderator: Option<String>,
        #[arg(long)]
        creator: Option<String>,
        #[arg(long)]
        reviewer: Option<String>,
        /// Comma separated review states
        #[arg(long, value_delimiter = ',')]
        states: Vec<ReviewState>,
        /// Match any of the role criteria instead of all
        #[arg(long)]
        or_roles: bool,
        /// Only reviews the reviewer has (or has not) completed
        #[arg(long)]
        complete: Option<bool>,
        #[arg(long)]
        all_reviewers_complete: Option<bool>,
        #[arg(long)]
        project: Option<String>,
        /// Last activity after this RFC 3339 timestamp
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Last activity before this RFC 3339 timestamp
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Maximum number of results for term searches
        #[arg(long, default_value_t = 50)]
        max: u32,
        #[arg(long)]
        detailed: bool,
    },
    /// Reviews linked to a Jira issue
    ForIssue {
        /// Issue key (e.g. FOO-3453)
        key: String,
        #[arg(long, default_value_t = 50)]
        max: u32,
    },
    /// Reviews containing a file
    ForFile {
        /// Repository name
        repository: String,
        /// File path relative to the repository root
        path: String,
        #[arg(long)]
        detailed: bool,
    },
    /// List the review items (files) of a review
    Items {
        id: String,
    },
    /// List reviewers
    Reviewers {
        id: String,
        /// Only reviewers who completed
        #[arg(long, conflicts_with = "uncompleted")]
        completed: bool,
        /// Only reviewers who have not completed
        #[arg(long)]
        uncompleted: bool,
    },
    /// Add reviewers
    AddReviewers {
        id: String,
        /// User names, comma separated or repeated
        #[arg(required = true, value_delimiter = ',')]
        users: Vec<String>,
    },
    /// Remove a reviewer
    RemoveReviewer {
        id: String,
        user: String,
    },
    /// List comments
    Comments {
        id: String,
        /// Only general comments
        #[arg(long, conflicts_with_all = ["versioned", "item"])]
        general: bool,
        /// Only comments anchored to files
        #[arg(long, conflicts_with = "item")]
        versioned: bool,
        /// Only comments of this review item
        #[arg(long)]
        item: Option<String>,
        /// Include the HTML rendering of each message
        #[arg(long)]
        render: bool,
    },
    /// Add a comment to the review or to one of its items
    Comment {
        id: String,
        /// Comment text
        message: String,
        /// Attach to this review item instead of the review
        #[arg(long)]
        item: Option<String>,
        /// Keep the comment as a draft
        #[arg(long)]
        draft: bool,
        /// Raise a defect
        #[arg(long)]
        defect: bool,
    },
    /// Reply to a comment
    Reply {
        id: String,
        /// Comment to reply to
        comment_id: String,
        message: String,
        #[arg(long)]
        draft: bool,
    },
    /// Publish drafts: one comment, or all of them
    Publish {
        id: String,
        /// Publish only this comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Attach a patch file to a review
    AddPatch {
        id: String,
        /// Patch file
        file: PathBuf,
        /// Repository to anchor the patch to
        #[arg(long, requires = "anchor_path")]
        anchor_repository: Option<String>,
        /// Path inside the repository the patch applies to
        #[arg(long, requires = "anchor_repository")]
        anchor_path: Option<String>,
        /// Leading path components to strip
        #[arg(long, default_value_t = 0)]
        strip: u32,
    },
    /// Upload a file as a new review item
    AddFile {
        id: String,
        file: PathBuf,
    },
}

pub async fn execute(args: ReviewArgs, ctx: &CrucibleContext<'_>) -> Result<()> {
    match args.command {
        ReviewCommands::List {
            filter,
            state,
            detailed,
        } => reviews::list_reviews(ctx, filter, state, detailed).await,
        ReviewCommands::Get { id, detailed } => reviews::get_review(ctx, &id, detailed).await,
        ReviewCommands::Create {
            project,
            name,
            description,
            moderator,
            jira_issue,
            allow_join,
        } => {
            let request = reviews::NewReview {
                project,
                name,
                description,
                moderator,
                jira_issue,
                allow_join,
            };
            reviews::create_review(ctx, request).await
        }
        ReviewCommands::Delete { id } => reviews::delete_review(ctx, &id).await,
        ReviewCommands::Transition {
            id,
            action,
            ignore_warnings,
        } => match action {
            Some(action) => reviews::transition_review(ctx, &id, action, ignore_warnings).await,
            None => reviews::list_transitions(ctx, &id).await,
        },
        ReviewCommands::Complete {
            id,
            ignore_warnings,
        } => reviews::complete_review(ctx, &id, true, ignore_warnings).await,
        ReviewCommands::Uncomplete {
            id,
            ignore_warnings,
        } => reviews::complete_review(ctx, &id, false, ignore_warnings).await,
        ReviewCommands::Close { id, summary } => reviews::close_review(ctx, &id, &summary).await,
        ReviewCommands::Remind { id } => participants::remind(ctx, &id).await,
        ReviewCommands::Search {
            term,
            title,
            author,
            moderator,
            creator,
            reviewer,
            states,
            or_roles,
            complete,
            all_reviewers_complete,
            project,
            from,
            to,
            max,
            detailed,
        } => match term {
            Some(term) => reviews::search_by_term(ctx, &term, max).await,
            None => {
                let search = ReviewSearch {
                    title,
                    author,
                    moderator,
                    creator,
                    reviewer,
                    states,
                    or_roles: or_roles.then_some(true),
                    complete,
                    all_reviewers_complete,
                    project,
                    from_date: from,
                    to_date: to,
                };
                reviews::search_reviews(ctx, &search, detailed).await
            }
        },
        ReviewCommands::ForIssue { key, max } => reviews::reviews_for_issue(ctx, &key, max).await,
        ReviewCommands::ForFile {
            repository,
            path,
            detailed,
        } => reviews::reviews_for_file(ctx, &repository, &path, detailed).await,
        ReviewCommands::Items { id } => content::list_items(ctx, &id).await,
        ReviewCommands::Reviewers {
            id,
            completed,
            uncompleted,
        } => {
            let which = match (completed, uncompleted) {
                (true, _) => participants::Which::Completed,
                (_, true) => participants::Which::Uncompleted,
                _ => participants::Which::All,
            };
            participants::list_reviewers(ctx, &id, which).await
        }
        ReviewCommands::AddReviewers { id, users } => {
            participants::add_reviewers(ctx, &id, &users).await
        }
        ReviewCommands::RemoveReviewer { id, user } => {
            participants::remove_reviewer(ctx, &id, &user).await
        }
        ReviewCommands::Comments {
            id,
            general,
            versioned,
            item,
            render,
        } => {
            let scope = match (item, general, versioned) {
                (Some(item), _, _) => comments::Scope::Item(item),
                (None, true, _) => comments::Scope::General,
                (None, _, true) => comments::Scope::Versioned,
                _ => comments::Scope::All,
            };
            comments::list_comments(ctx, &id, scope, render).await
        }
        ReviewCommands::Comment {
            id,
            message,
            item,
            draft,
            defect,
        } => comments::add_comment(ctx, &id, item.as_deref(), &message, draft, defect).await,
        ReviewCommands::Reply {
            id,
            comment_id,
            message,
            draft,
        } => comments::reply(ctx, &id, &comment_id, &message, draft).await,
        ReviewCommands::Publish { id, comment } => {
            comments::publish(ctx, &id, comment.as_deref()).await
        }
        ReviewCommands::AddPatch {
            id,
            file,
            anchor_repository,
            anchor_path,
            strip,
        } => {
            let anchor = anchor_repository.zip(anchor_path);
            content::add_patch(ctx, &id, &file, anchor, strip).await
        }
        ReviewCommands::AddFile { id, file } => content::add_file(ctx, &id, &file).await,
    }
}
