//! Wire records exchanged with the review server.
//!
//! These are plain data-transfer structs. Field names follow the server's
//! camelCase JSON; optional or frequently omitted fields default so that
//! partial payloads still decode.

mod changeset;
mod comment;
mod common;
mod error;
mod metrics;
mod patch;
mod repository;
mod review;
mod reviewer;
mod user;

pub use changeset::{
    AddChangeSet, Change, ChangeSetId, ChangeSetIds, ChangeSetPage, Directory, History, Link,
    Listing, Revision, VersionedEntity,
};
pub use comment::{Comment, Comments, GeneralComment};
pub use common::{PermaId, TimeZone, VersionInfo};
pub use error::{ErrorBody, ErrorCode, ReviewError};
pub use metrics::{MetricValue, MetricsDefinition, MetricsDefinitions};
pub use patch::{Anchor, Patch, PatchGroup, PatchGroups, UploadedPatch};
pub use repository::{Repository, RepositoryQuery};
pub use review::{
    Action, Actions, Changesets, CloseReviewSummary, CreateReview, Participant, Review,
    ReviewFilter, ReviewItem, ReviewItems, ReviewRevisions, ReviewState, ReviewTransition,
    Reviews, RevisionData, Transition, Transitions,
};
pub use reviewer::{Reviewer, Reviewers};
pub use user::{Committer, Committers, Preference, Preferences, User, UserProfile};
