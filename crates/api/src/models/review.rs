use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::comment::Comments;
use super::common::PermaId;
use super::patch::Anchor;
use super::reviewer::Reviewers;
use super::user::User;
use crate::error::ApiError;

/// Predefined review filters, evaluated for the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFilter {
    AllReviews,
    AllOpenReviews,
    AllClosedReviews,
    DraftReviews,
    ToReview,
    RequireMyApproval,
    ToSummarize,
    OutForReview,
    Drafts,
    Open,
    Completed,
    Closed,
    Trash,
}

impl ReviewFilter {
    pub const ALL: [ReviewFilter; 13] = [
        ReviewFilter::AllReviews,
        ReviewFilter::AllOpenReviews,
        ReviewFilter::AllClosedReviews,
        ReviewFilter::DraftReviews,
        ReviewFilter::ToReview,
        ReviewFilter::RequireMyApproval,
        ReviewFilter::ToSummarize,
        ReviewFilter::OutForReview,
        ReviewFilter::Drafts,
        ReviewFilter::Open,
        ReviewFilter::Completed,
        ReviewFilter::Closed,
        ReviewFilter::Trash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewFilter::AllReviews => "allReviews",
            ReviewFilter::AllOpenReviews => "allOpenReviews",
            ReviewFilter::AllClosedReviews => "allClosedReviews",
            ReviewFilter::DraftReviews => "draftReviews",
            ReviewFilter::ToReview => "toReview",
            ReviewFilter::RequireMyApproval => "requireMyApproval",
            ReviewFilter::ToSummarize => "toSummarize",
            ReviewFilter::OutForReview => "outForReview",
            ReviewFilter::Drafts => "drafts",
            ReviewFilter::Open => "open",
            ReviewFilter::Completed => "completed",
            ReviewFilter::Closed => "closed",
            ReviewFilter::Trash => "trash",
        }
    }
}

impl fmt::Display for ReviewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewFilter {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewFilter::ALL
            .iter()
            .copied()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ApiError::InvalidArgument(format!("unknown review filter '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    Draft,
    Approval,
    Review,
    Summarize,
    Closed,
    Dead,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ReviewState {
    pub const ALL: [ReviewState; 8] = [
        ReviewState::Draft,
        ReviewState::Approval,
        ReviewState::Review,
        ReviewState::Summarize,
        ReviewState::Closed,
        ReviewState::Dead,
        ReviewState::Rejected,
        ReviewState::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Draft => "Draft",
            ReviewState::Approval => "Approval",
            ReviewState::Review => "Review",
            ReviewState::Summarize => "Summarize",
            ReviewState::Closed => "Closed",
            ReviewState::Dead => "Dead",
            ReviewState::Rejected => "Rejected",
            ReviewState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ApiError::InvalidArgument(format!("unknown review state '{s}'")))
    }
}

/// Workflow actions accepted by the transition endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTransition {
    Submit,
    Approve,
    Reject,
    Summarize,
    Close,
    Reopen,
    Abandon,
    Recover,
    Delete,
    Complete,
    Uncomplete,
}

impl ReviewTransition {
    pub const ALL: [ReviewTransition; 11] = [
        ReviewTransition::Submit,
        ReviewTransition::Approve,
        ReviewTransition::Reject,
        ReviewTransition::Summarize,
        ReviewTransition::Close,
        ReviewTransition::Reopen,
        ReviewTransition::Abandon,
        ReviewTransition::Recover,
        ReviewTransition::Delete,
        ReviewTransition::Complete,
        ReviewTransition::Uncomplete,
    ];

    /// Action name as sent in the `action` query parameter.
    pub fn action(&self) -> &'static str {
        match self {
            ReviewTransition::Submit => "action:submitReview",
            ReviewTransition::Approve => "action:approveReview",
            ReviewTransition::Reject => "action:rejectReview",
            ReviewTransition::Summarize => "action:summarizeReview",
            ReviewTransition::Close => "action:closeReview",
            ReviewTransition::Reopen => "action:reopenReview",
            ReviewTransition::Abandon => "action:abandonReview",
            ReviewTransition::Recover => "action:recoverReview",
            ReviewTransition::Delete => "action:deleteReview",
            ReviewTransition::Complete => "action:completeReview",
            ReviewTransition::Uncomplete => "action:uncompleteReview",
        }
    }

    fn short_name(&self) -> &'static str {
        self.action()
            .trim_start_matches("action:")
            .trim_end_matches("Review")
    }
}

impl fmt::Display for ReviewTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

impl FromStr for ReviewTransition {
    type Err = ApiError;

    /// Accepts `approve`, `approveReview` or `action:approveReview`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim_start_matches("action:");
        let wanted = wanted.strip_suffix("Review").unwrap_or(wanted);
        ReviewTransition::ALL
            .iter()
            .copied()
            .find(|transition| transition.short_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ApiError::InvalidArgument(format!("unknown review transition '{s}'")))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviews {
    #[serde(default)]
    pub review_data: Vec<Review>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perma_id: Option<PermaId>,
    #[serde(default)]
    pub project_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderator: Option<User>,
    #[serde(default)]
    pub state: ReviewState,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub allow_reviewers_to_join: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_issue_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub perma_id_history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Transitions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_items: Option<ReviewItems>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_comments: Option<Comments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewers: Option<Reviewers>,
}

impl Review {
    /// Minimal review data for creating a new review.
    pub fn new(project_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            name: name.into(),
            state: ReviewState::Draft,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        self.perma_id.as_ref().map(PermaId::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    pub review_data: Review,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changesets: Option<Changesets>,
}

impl CreateReview {
    pub fn new(review: Review) -> Self {
        Self {
            review_data: review,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changesets {
    #[serde(default)]
    pub changeset_data: Vec<PermaId>,
    pub repository: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItems {
    #[serde(default)]
    pub review_item: Vec<ReviewItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perm_id: Option<PermaId>,
    #[serde(default)]
    pub repository_name: String,
    #[serde(default)]
    pub from_path: String,
    #[serde(default)]
    pub from_revision: String,
    #[serde(default)]
    pub to_path: String,
    #[serde(default)]
    pub to_revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_date: Option<i64>,
    #[serde(default)]
    pub show_as_diff: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_data: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expanded_revisions: Vec<Value>,
}

impl ReviewItem {
    pub fn id(&self) -> &str {
        self.perm_id.as_ref().map(PermaId::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    pub user: User,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actions {
    #[serde(default)]
    pub action_data: Vec<Action>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transitions {
    #[serde(default)]
    pub transition_data: Vec<Transition>,
}

pub type Transition = Action;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseReviewSummary {
    pub summary: String,
}

/// Revisions to add as review items, merged into existing items with the
/// same path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRevisions {
    #[serde(default)]
    pub revision_data: Vec<RevisionData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevisionData {
    pub source: String,
    pub path: String,
    #[serde(default)]
    pub rev: Vec<String>,
}
