//! Endpoint catalog for the review server REST API.
//!
//! Each method builds a fresh target, picks a verb on the
//! [`RequestDispatcher`] and turns the envelope into `Ok` or an
//! [`ApiError`]. Status interpretation lives here and nowhere else.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::ClientConfig;
use crate::dispatch::RequestDispatcher;
use crate::error::{ApiError, Result};
use crate::models::{
    Actions, AddChangeSet, Change, ChangeSetPage, CloseReviewSummary, Comment, Comments,
    CreateReview, GeneralComment, History, Listing, MetricsDefinitions, Patch, PatchGroups,
    Repository, RepositoryQuery, Review, ReviewError, ReviewFilter, ReviewItem, ReviewItems,
    ReviewRevisions, ReviewState, ReviewTransition, Reviewers, Reviews, Transitions, User,
    UserProfile, VersionInfo, VersionedEntity,
};
use crate::response::{Outcome, ResponseEnvelope};
use crate::transport::Upload;
use crate::uri::{ResourceRoot, UriBuilder};

const OK: &[StatusCode] = &[StatusCode::OK];
const CREATED: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED];

/// Criteria for the review search endpoint. Unset criteria are left out of
/// the query.
#[derive(Debug, Clone, Default)]
pub struct ReviewSearch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub moderator: Option<String>,
    pub creator: Option<String>,
    pub reviewer: Option<String>,
    pub states: Vec<ReviewState>,
    /// OR the role criteria together instead of AND.
    pub or_roles: Option<bool>,
    pub complete: Option<bool>,
    pub all_reviewers_complete: Option<bool>,
    pub project: Option<String>,
    /// Last activity after this instant, inclusive.
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct RepositorySearch {
    /// Case-insensitive substring of the repository key.
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub available: Option<bool>,
    /// `cvs`, `svn`, `p4`, `git`, `hg` or `plugin`; repeatable.
    pub types: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSetSearch {
    /// Only changesets touching this path. Use a trailing `/` for
    /// directories.
    pub path: Option<String>,
    pub oldest_csid: Option<String>,
    pub include_oldest: Option<bool>,
    pub newest_csid: Option<String>,
    pub include_newest: Option<bool>,
    pub max: Option<u32>,
}

#[derive(Clone)]
pub struct CrucibleClient {
    dispatcher: RequestDispatcher,
}

impl CrucibleClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            dispatcher: RequestDispatcher::new(config)?,
        })
    }

    pub fn from_dispatcher(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    // ---------------------------------------------------------------- users

    /// All users, or only the named ones that exist.
    pub async fn get_users(&self, usernames: &[String]) -> Result<Vec<User>> {
        let target = users().set_query_param("username", usernames).render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// The user mapped to a committer name in a repository.
    pub async fn get_user_committer(&self, repository: &str, username: &str) -> Result<User> {
        let target = users()
            .add_path_segment(repository)
            .add_path_segment(username)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_user_profile(&self, username: &str) -> Result<UserProfile> {
        let target = users().add_path_segment(username).render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    // --------------------------------------------------------------- search

    /// Reviews whose name, description, state or perma-id contain `term`.
    pub async fn search_reviews_by_term(&self, term: &str, max_return: u32) -> Result<Reviews> {
        let target = search()
            .add_path_segment("reviews")
            .set_query_param("term", term)
            .set_query_param("maxReturn", max_return)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Reviews linked to a Jira issue key such as `FOO-3453`.
    pub async fn get_reviews_for_issue(&self, jira_key: &str, max_return: u32) -> Result<Reviews> {
        let target = search()
            .add_path_segment("reviewsForIssue")
            .set_query_param("jiraKey", jira_key)
            .set_query_param("maxReturn", max_return)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    // --------------------------------------------------------- repositories

    pub async fn search_repositories(&self, search: &RepositorySearch) -> Result<RepositoryQuery> {
        let target = repositories()
            .set_query_param("name", search.name.as_deref())
            .set_query_param("enabled", search.enabled)
            .set_query_param("available", search.available)
            .set_query_param("type", search.types.as_slice())
            .set_query_param("limit", search.limit)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_repository(&self, repository: &str) -> Result<Repository> {
        let target = repositories().add_path_segment(repository).render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Raw content of a file revision.
    pub async fn get_file_revision_content(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<String> {
        let target = repositories()
            .add_path_segment("content")
            .add_path_segment(repository)
            .add_path_segment(revision)
            .add_path_segment(repository_path(path))
            .render();
        let envelope = self.dispatcher.download_raw(&target).await?;
        if envelope.is(StatusCode::OK) {
            return Ok(envelope.raw_text().unwrap_or_default().to_string());
        }
        Err(remote_error(&envelope))
    }

    pub async fn get_change_set(&self, repository: &str, revision: &str) -> Result<Change> {
        let target = repositories()
            .add_path_segment("change")
            .add_path_segment(repository)
            .add_path_segment(revision)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Changesets of a repository, newest first.
    pub async fn search_change_sets(
        &self,
        repository: &str,
        search: &ChangeSetSearch,
    ) -> Result<ChangeSetPage> {
        let mut uri = repositories()
            .add_path_segment("changes")
            .add_path_segment(repository);
        if let Some(path) = search.path.as_deref().map(repository_path) {
            uri = uri.add_path_segment_if(!path.is_empty(), path);
        }
        let target = uri
            .set_query_param("oldestCsid", search.oldest_csid.as_deref())
            .set_query_param("includeOldest", search.include_oldest)
            .set_query_param("newestCsid", search.newest_csid.as_deref())
            .set_query_param("includeNewest", search.include_newest)
            .set_query_param("max", search.max)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_versioned_entity(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<VersionedEntity> {
        let target = repositories()
            .add_path_segment(repository)
            .add_path_segment(revision)
            .add_path_segment(repository_path(path))
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn browse_repository(&self, repository: &str, path: &str) -> Result<Listing> {
        let path = repository_path(path);
        let target = repositories()
            .add_path_segment("browse")
            .add_path_segment(repository)
            .add_path_segment_if(!path.is_empty(), path)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_versioned_entity_history(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<History> {
        let target = repositories()
            .add_path_segment("history")
            .add_path_segment(repository)
            .add_path_segment(revision)
            .add_path_segment(repository_path(path))
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    // -------------------------------------------------------------- reviews

    pub async fn get_reviews(&self, state: Option<ReviewState>) -> Result<Reviews> {
        self.get_reviews_internal(false, state).await
    }

    /// Like [`Self::get_reviews`] with review items and comments included.
    pub async fn get_reviews_detailed(&self, state: Option<ReviewState>) -> Result<Reviews> {
        self.get_reviews_internal(true, state).await
    }

    async fn get_reviews_internal(
        &self,
        detailed: bool,
        state: Option<ReviewState>,
    ) -> Result<Reviews> {
        let target = reviews()
            .add_path_segment_if(detailed, "details")
            .set_query_param("state", state.map(|s| s.as_str()))
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn create_review(&self, review: &CreateReview) -> Result<Review> {
        let target = reviews().render();
        expect_payload(self.dispatcher.submit(&target, review).await?, CREATED)
    }

    pub async fn get_version_info(&self) -> Result<VersionInfo> {
        let target = reviews().add_path_segment("versionInfo").render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Comment metric definitions for a metrics version.
    pub async fn get_comment_metrics(&self, version: i64) -> Result<MetricsDefinitions> {
        let target = reviews()
            .add_path_segment("metrics")
            .add_path_segment(version.to_string())
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn filter_reviews(&self, filter: ReviewFilter) -> Result<Reviews> {
        self.filter_reviews_internal(false, filter).await
    }

    pub async fn filter_reviews_detailed(&self, filter: ReviewFilter) -> Result<Reviews> {
        self.filter_reviews_internal(true, filter).await
    }

    async fn filter_reviews_internal(&self, detailed: bool, filter: ReviewFilter) -> Result<Reviews> {
        let target = reviews()
            .add_path_segment("filter")
            .add_path_segment(filter.as_str())
            .add_path_segment_if(detailed, "details")
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn search_reviews(&self, search: &ReviewSearch) -> Result<Reviews> {
        self.search_reviews_internal(false, search).await
    }

    pub async fn search_reviews_detailed(&self, search: &ReviewSearch) -> Result<Reviews> {
        self.search_reviews_internal(true, search).await
    }

    async fn search_reviews_internal(&self, detailed: bool, search: &ReviewSearch) -> Result<Reviews> {
        let states = (!search.states.is_empty()).then(|| {
            search
                .states
                .iter()
                .map(ReviewState::as_str)
                .collect::<Vec<_>>()
                .join(",")
        });
        let target = reviews()
            .add_path_segment("filter")
            .add_path_segment_if(detailed, "details")
            .set_query_param("title", search.title.as_deref())
            .set_query_param("author", search.author.as_deref())
            .set_query_param("moderator", search.moderator.as_deref())
            .set_query_param("creator", search.creator.as_deref())
            .set_query_param("states", states)
            .set_query_param("reviewer", search.reviewer.as_deref())
            .set_query_param("orRoles", search.or_roles)
            .set_query_param("complete", search.complete)
            .set_query_param("allReviewersComplete", search.all_reviewers_complete)
            .set_query_param("project", search.project.as_deref())
            .set_query_param("fromDate", search.from_date.map(|d| d.timestamp_millis()))
            .set_query_param("toDate", search.to_date.map(|d| d.timestamp_millis()))
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Reviews containing a file; `path` is relative to the repository root.
    pub async fn search_reviews_for_file(&self, repository: &str, path: &str) -> Result<Reviews> {
        self.search_reviews_for_file_internal(false, repository, path)
            .await
    }

    pub async fn search_reviews_for_file_detailed(
        &self,
        repository: &str,
        path: &str,
    ) -> Result<Reviews> {
        self.search_reviews_for_file_internal(true, repository, path)
            .await
    }

    async fn search_reviews_for_file_internal(
        &self,
        detailed: bool,
        repository: &str,
        path: &str,
    ) -> Result<Reviews> {
        let target = reviews()
            .add_path_segment("search")
            .add_path_segment(repository)
            .add_path_segment_if(detailed, "details")
            .set_query_param("path", repository_path(path))
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_review(&self, review_id: &str) -> Result<Review> {
        self.get_review_internal(false, review_id).await
    }

    pub async fn get_review_detailed(&self, review_id: &str) -> Result<Review> {
        self.get_review_internal(true, review_id).await
    }

    async fn get_review_internal(&self, detailed: bool, review_id: &str) -> Result<Review> {
        let target = reviews()
            .add_path_segment(review_id)
            .add_path_segment_if(detailed, "details")
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn delete_review(&self, review_id: &str) -> Result<()> {
        let target = reviews().add_path_segment(review_id).render();
        expect_ack(self.dispatcher.remove(&target).await?)
    }

    /// Actions the current user may perform on the review.
    pub async fn get_review_actions(&self, review_id: &str) -> Result<Actions> {
        let target = review(review_id).add_path_segment("actions").render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Workflow transitions currently available for the review.
    pub async fn get_review_transitions(&self, review_id: &str) -> Result<Transitions> {
        let target = review(review_id).add_path_segment("transitions").render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn change_review_state(
        &self,
        review_id: &str,
        transition: ReviewTransition,
        ignore_warnings: bool,
    ) -> Result<Review> {
        let target = review(review_id)
            .add_path_segment("transition")
            .set_query_param("action", transition.action())
            .set_query_param("ignoreWarnings", ignore_warnings)
            .render();
        debug!(review_id, action = transition.action(), "Changing review state");
        expect_transition(self.dispatcher.submit_empty(&target).await?)
    }

    /// Marks the review complete for the current reviewer.
    pub async fn complete_review(&self, review_id: &str, ignore_warnings: bool) -> Result<()> {
        let target = review(review_id)
            .add_path_segment("complete")
            .set_query_param("ignoreWarnings", ignore_warnings)
            .render();
        expect_transition_ack(self.dispatcher.submit_empty(&target).await?)
    }

    pub async fn uncomplete_review(&self, review_id: &str, ignore_warnings: bool) -> Result<()> {
        let target = review(review_id)
            .add_path_segment("uncomplete")
            .set_query_param("ignoreWarnings", ignore_warnings)
            .render();
        expect_transition_ack(self.dispatcher.submit_empty(&target).await?)
    }

    /// Closes an open review with a summary.
    pub async fn close_review(&self, review_id: &str, summary: &str) -> Result<()> {
        let target = review(review_id).add_path_segment("close").render();
        let body = CloseReviewSummary {
            summary: summary.to_string(),
        };
        expect_ack(self.dispatcher.submit(&target, &body).await?)
    }

    pub async fn remind_incomplete_reviewers(&self, review_id: &str) -> Result<()> {
        let target = review(review_id).add_path_segment("remind").render();
        expect_ack(self.dispatcher.submit_empty(&target).await?)
    }

    pub async fn add_change_set(&self, review_id: &str, change_set: &AddChangeSet) -> Result<Review> {
        let target = review(review_id).add_path_segment("addChangeset").render();
        expect_payload(self.dispatcher.submit(&target, change_set).await?, CREATED)
    }

    pub async fn add_patch(&self, review_id: &str, patch: &Patch) -> Result<Review> {
        let target = review(review_id).add_path_segment("patch").render();
        expect_payload(self.dispatcher.submit(&target, patch).await?, CREATED)
    }

    pub async fn get_patch_groups(&self, review_id: &str) -> Result<PatchGroups> {
        let target = review(review_id).add_path_segment("patch").render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn remove_patch(&self, review_id: &str, patch_id: &str) -> Result<PatchGroups> {
        let target = review(review_id)
            .add_path_segment("patch")
            .add_path_segment(patch_id)
            .render();
        expect_payload(self.dispatcher.remove(&target).await?, OK)
    }

    /// Uploads a file (text or binary) as a new review item.
    pub async fn add_file(&self, review_id: &str, upload: Upload) -> Result<ReviewItem> {
        let target = review(review_id).add_path_segment("addFile").render();
        expect_payload(self.dispatcher.upload_stream(&target, upload).await?, CREATED)
    }

    // ------------------------------------------------------------ reviewers

    pub async fn get_reviewers(&self, review_id: &str) -> Result<Reviewers> {
        let target = review(review_id).add_path_segment("reviewers").render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn add_reviewers(&self, review_id: &str, usernames: &[String]) -> Result<()> {
        if usernames.is_empty() {
            return Err(ApiError::InvalidArgument(
                "at least one reviewer is required".to_string(),
            ));
        }
        let target = review(review_id).add_path_segment("reviewers").render();
        expect_ack(self.dispatcher.submit(&target, &usernames.join(",")).await?)
    }

    pub async fn get_completed_reviewers(&self, review_id: &str) -> Result<Reviewers> {
        let target = review(review_id)
            .add_path_segment("reviewers")
            .add_path_segment("completed")
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_uncompleted_reviewers(&self, review_id: &str) -> Result<Reviewers> {
        let target = review(review_id)
            .add_path_segment("reviewers")
            .add_path_segment("uncompleted")
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn remove_reviewer(&self, review_id: &str, username: &str) -> Result<()> {
        let target = review(review_id)
            .add_path_segment("reviewers")
            .add_path_segment(username)
            .render();
        expect_ack(self.dispatcher.remove(&target).await?)
    }

    // --------------------------------------------------------- review items

    pub async fn get_review_items(&self, review_id: &str) -> Result<ReviewItems> {
        let target = review(review_id).add_path_segment("reviewitems").render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Always creates a new item, replacing an existing one with the same
    /// data.
    pub async fn add_review_item(&self, review_id: &str, item: &ReviewItem) -> Result<ReviewItem> {
        self.add_review_item_internal(false, review_id, item).await
    }

    pub async fn add_review_item_detailed(
        &self,
        review_id: &str,
        item: &ReviewItem,
    ) -> Result<ReviewItem> {
        self.add_review_item_internal(true, review_id, item).await
    }

    async fn add_review_item_internal(
        &self,
        detailed: bool,
        review_id: &str,
        item: &ReviewItem,
    ) -> Result<ReviewItem> {
        let target = review(review_id)
            .add_path_segment("reviewitems")
            .add_path_segment_if(detailed, "details")
            .render();
        expect_payload(self.dispatcher.submit(&target, item).await?, CREATED)
    }

    pub async fn get_review_item(&self, review_id: &str, item_id: &str) -> Result<ReviewItem> {
        self.get_review_item_internal(false, review_id, item_id)
            .await
    }

    pub async fn get_review_item_detailed(
        &self,
        review_id: &str,
        item_id: &str,
    ) -> Result<ReviewItem> {
        self.get_review_item_internal(true, review_id, item_id)
            .await
    }

    async fn get_review_item_internal(
        &self,
        detailed: bool,
        review_id: &str,
        item_id: &str,
    ) -> Result<ReviewItem> {
        let target = review_item(review_id, item_id)
            .add_path_segment_if(detailed, "details")
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn remove_review_item(&self, review_id: &str, item_id: &str) -> Result<()> {
        let target = review_item(review_id, item_id).render();
        expect_ack(self.dispatcher.remove(&target).await?)
    }

    /// Adds one review item per revision entry, merging into existing items
    /// with the same path.
    pub async fn add_review_revisions(
        &self,
        review_id: &str,
        revisions: &ReviewRevisions,
    ) -> Result<Review> {
        let target = review(review_id)
            .add_path_segment("reviewitems")
            .add_path_segment("revisions")
            .render();
        expect_payload(self.dispatcher.submit(&target, revisions).await?, CREATED)
    }

    pub async fn add_revisions_to_review_item(
        &self,
        review_id: &str,
        item_id: &str,
        revisions: &[String],
    ) -> Result<ReviewItem> {
        let target = review_item(review_id, item_id)
            .add_path_segment("revisions")
            .set_query_param("rev", revisions)
            .render();
        expect_payload(self.dispatcher.submit_empty(&target).await?, CREATED)
    }

    pub async fn remove_revisions_from_review_item(
        &self,
        review_id: &str,
        item_id: &str,
        revisions: &[String],
    ) -> Result<ReviewItem> {
        let target = review_item(review_id, item_id)
            .add_path_segment("revisions")
            .set_query_param("rev", revisions)
            .render();
        expect_payload(self.dispatcher.remove(&target).await?, OK)
    }

    pub async fn get_review_item_comments(
        &self,
        review_id: &str,
        item_id: &str,
        render: bool,
    ) -> Result<Comments> {
        let target = review_item(review_id, item_id)
            .add_path_segment("comments")
            .set_query_param("render", render)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    /// Adds a versioned comment to a review item.
    pub async fn add_review_item_comment(
        &self,
        review_id: &str,
        item_id: &str,
        comment: &GeneralComment,
    ) -> Result<Comment> {
        let target = review_item(review_id, item_id)
            .add_path_segment("comments")
            .render();
        expect_payload(self.dispatcher.submit(&target, comment).await?, CREATED)
    }

    // ------------------------------------------------------------- comments

    /// All comments of a review; `render` adds `messageAsHtml`.
    pub async fn get_comments(&self, review_id: &str, render: bool) -> Result<Comments> {
        let target = comments(review_id).set_query_param("render", render).render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_general_comments(&self, review_id: &str, render: bool) -> Result<Comments> {
        let target = comments(review_id)
            .add_path_segment("general")
            .set_query_param("render", render)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn get_versioned_comments(&self, review_id: &str, render: bool) -> Result<Comments> {
        let target = comments(review_id)
            .add_path_segment("versioned")
            .set_query_param("render", render)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn add_comment(&self, review_id: &str, comment: &GeneralComment) -> Result<Comment> {
        let target = comments(review_id).render();
        expect_payload(self.dispatcher.submit(&target, comment).await?, CREATED)
    }

    pub async fn get_comment(&self, review_id: &str, comment_id: &str, render: bool) -> Result<Comment> {
        let target = comment(review_id, comment_id)
            .set_query_param("render", render)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn update_comment(
        &self,
        review_id: &str,
        comment_id: &str,
        update: &GeneralComment,
    ) -> Result<()> {
        let target = comment(review_id, comment_id).render();
        expect_ack(self.dispatcher.replace(&target, update).await?)
    }

    pub async fn delete_comment(&self, review_id: &str, comment_id: &str) -> Result<()> {
        let target = comment(review_id, comment_id).render();
        expect_ack(self.dispatcher.remove(&target).await?)
    }

    pub async fn get_comment_replies(
        &self,
        review_id: &str,
        comment_id: &str,
        render: bool,
    ) -> Result<Comments> {
        let target = comment(review_id, comment_id)
            .add_path_segment("replies")
            .set_query_param("render", render)
            .render();
        expect_payload(self.dispatcher.fetch(&target).await?, OK)
    }

    pub async fn add_comment_reply(
        &self,
        review_id: &str,
        comment_id: &str,
        reply: &GeneralComment,
    ) -> Result<Comment> {
        let target = comment(review_id, comment_id)
            .add_path_segment("replies")
            .render();
        expect_payload(self.dispatcher.submit(&target, reply).await?, CREATED)
    }

    /// Replaces the text of a reply. The server takes edits as POST here.
    pub async fn update_comment_reply(
        &self,
        review_id: &str,
        comment_id: &str,
        reply_id: &str,
        reply: &GeneralComment,
    ) -> Result<()> {
        let target = comment(review_id, comment_id)
            .add_path_segment("replies")
            .add_path_segment(reply_id)
            .render();
        expect_ack(self.dispatcher.submit(&target, reply).await?)
    }

    pub async fn delete_comment_reply(
        &self,
        review_id: &str,
        comment_id: &str,
        reply_id: &str,
    ) -> Result<()> {
        let target = comment(review_id, comment_id)
            .add_path_segment("replies")
            .add_path_segment(reply_id)
            .render();
        expect_ack(self.dispatcher.remove(&target).await?)
    }

    pub async fn mark_all_comments_read(&self, review_id: &str) -> Result<Review> {
        let target = comments(review_id).add_path_segment("markAllAsRead").render();
        expect_payload(self.dispatcher.submit_empty(&target).await?, OK)
    }

    pub async fn mark_comment_read(&self, review_id: &str, comment_id: &str) -> Result<Comment> {
        let target = comment(review_id, comment_id)
            .add_path_segment("markAsRead")
            .render();
        expect_payload(self.dispatcher.submit_empty(&target).await?, OK)
    }

    pub async fn mark_comment_leave_unread(
        &self,
        review_id: &str,
        comment_id: &str,
    ) -> Result<Comment> {
        let target = comment(review_id, comment_id)
            .add_path_segment("markAsLeaveUnread")
            .render();
        expect_payload(self.dispatcher.submit_empty(&target).await?, OK)
    }

    pub async fn publish_all_draft_comments(&self, review_id: &str) -> Result<()> {
        let target = review(review_id).add_path_segment("publish").render();
        expect_ack(self.dispatcher.submit_empty(&target).await?)
    }

    pub async fn publish_draft_comment(&self, review_id: &str, comment_id: &str) -> Result<()> {
        let target = review(review_id)
            .add_path_segment("publish")
            .add_path_segment(comment_id)
            .render();
        expect_ack(self.dispatcher.submit_empty(&target).await?)
    }
}

fn users() -> UriBuilder {
    UriBuilder::for_root(ResourceRoot::Users)
}

fn search() -> UriBuilder {
    UriBuilder::for_root(ResourceRoot::Search)
}

fn repositories() -> UriBuilder {
    UriBuilder::for_root(ResourceRoot::Repositories)
}

fn reviews() -> UriBuilder {
    UriBuilder::for_root(ResourceRoot::Reviews)
}

fn review(review_id: &str) -> UriBuilder {
    reviews().add_path_segment(review_id)
}

fn review_item(review_id: &str, item_id: &str) -> UriBuilder {
    review(review_id)
        .add_path_segment("reviewitems")
        .add_path_segment(item_id)
}

fn comments(review_id: &str) -> UriBuilder {
    review(review_id).add_path_segment("comments")
}

fn comment(review_id: &str, comment_id: &str) -> UriBuilder {
    comments(review_id).add_path_segment(comment_id)
}

fn remote_error(envelope: &ResponseEnvelope) -> ApiError {
    let status = envelope.status();
    let fallback = format!(
        "Request failed with status {}",
        status.canonical_reason().unwrap_or(status.as_str())
    );
    ApiError::Remote {
        status,
        error: envelope.extract_error(&fallback),
    }
}

/// Typed payload for any of the `expected` statuses, or the server error.
/// Repository paths are relative to the repository root.
fn repository_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn expect_payload<T: DeserializeOwned>(
    envelope: ResponseEnvelope,
    expected: &[StatusCode],
) -> Result<T> {
    let status = envelope.status();
    if expected.contains(&status) {
        match envelope.into_outcome(status) {
            Outcome::Success(payload) => return Ok(payload),
            Outcome::Failure(failure) => {
                return Err(ApiError::Remote {
                    status,
                    error: failure.error("Response body did not match the expected shape"),
                })
            }
        }
    }
    Err(remote_error(&envelope))
}

/// Success without a meaningful body.
fn expect_ack(envelope: ResponseEnvelope) -> Result<()> {
    match envelope.status() {
        StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
        _ => Err(remote_error(&envelope)),
    }
}

/// Like [`expect_payload`] but decodes a 409 as a refused transition.
fn expect_transition<T: DeserializeOwned>(envelope: ResponseEnvelope) -> Result<T> {
    if let Some(conflict) = envelope.extract::<ReviewError>(StatusCode::CONFLICT) {
        return Err(ApiError::ReviewConflict { conflict });
    }
    expect_payload(envelope, OK)
}

fn expect_transition_ack(envelope: ResponseEnvelope) -> Result<()> {
    if let Some(conflict) = envelope.extract::<ReviewError>(StatusCode::CONFLICT) {
        return Err(ApiError::ReviewConflict { conflict });
    }
    expect_ack(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expect_payload_accepts_listed_statuses() {
        let created = ResponseEnvelope::new(StatusCode::CREATED, Some(json!({"userName": "x"})));
        let user: User = expect_payload(created, CREATED).unwrap();
        assert_eq!(user.user_name, "x");

        let created = ResponseEnvelope::new(StatusCode::CREATED, Some(json!({"userName": "x"})));
        assert!(expect_payload::<User>(created, OK).is_err());
    }

    #[test]
    fn test_expect_payload_maps_remote_error() {
        let envelope = ResponseEnvelope::new(
            StatusCode::NOT_FOUND,
            Some(json!({"code": "NotFound", "message": "Review CR-9 not found"})),
        );
        match expect_payload::<Review>(envelope, OK) {
            Err(ApiError::Remote { status, error }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(error.message, "Review CR-9 not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_expect_payload_without_body() {
        let envelope = ResponseEnvelope::new(StatusCode::OK, None);
        match expect_payload::<Review>(envelope, OK) {
            Err(ApiError::Remote { status, error }) => {
                assert_eq!(status, StatusCode::OK);
                assert!(!error.message.is_empty());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_expect_ack() {
        assert!(expect_ack(ResponseEnvelope::new(StatusCode::OK, None)).is_ok());
        assert!(expect_ack(ResponseEnvelope::new(StatusCode::NO_CONTENT, None)).is_ok());

        let err = expect_ack(ResponseEnvelope::new(StatusCode::FORBIDDEN, None)).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.to_string().contains("Forbidden"));
    }

    #[test]
    fn test_transition_conflict() {
        let envelope = ResponseEnvelope::new(
            StatusCode::CONFLICT,
            Some(json!({
                "reviewId": "CR-1",
                "message": "blocked",
                "failedConditions": [{"message": "open defects"}]
            })),
        );
        match expect_transition_ack(envelope) {
            Err(ApiError::ReviewConflict { conflict }) => {
                assert_eq!(conflict.review_id, "CR-1");
                assert_eq!(conflict.failed_conditions.len(), 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_conflict_outside_transitions_is_generic() {
        let envelope = ResponseEnvelope::new(
            StatusCode::CONFLICT,
            Some(json!({"reviewId": "CR-1", "message": "blocked", "failedConditions": []})),
        );
        assert!(matches!(
            expect_ack(envelope),
            Err(ApiError::Remote { .. })
        ));
    }
}
