use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::PermaId;
use super::user::User;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comments {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Creation time of a comment. The server sends epoch milliseconds or a
/// formatted date depending on the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommentDate {
    Millis(i64),
    Text(String),
}

impl fmt::Display for CommentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentDate::Millis(ms) => match chrono::DateTime::from_timestamp_millis(*ms) {
                Some(date) => write!(f, "{}", date.to_rfc3339()),
                None => write!(f, "{ms}"),
            },
            CommentDate::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perma_id: Option<PermaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perm_id: Option<PermaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<PermaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_item_id: Option<PermaId>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_as_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<CommentDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub defect_raised: bool,
    #[serde(default)]
    pub defect_approved: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_line_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_line_range: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn id(&self) -> &str {
        self.perma_id
            .as_ref()
            .or(self.perm_id.as_ref())
            .map(PermaId::as_str)
            .unwrap_or("")
    }
}

/// Payload for creating or editing a general comment or reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralComment {
    pub message: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub defect_raised: bool,
    #[serde(default)]
    pub defect_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<PermaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perma_id: Option<PermaId>,
}

impl GeneralComment {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn defect(mut self, raised: bool) -> Self {
        self.defect_raised = raised;
        self
    }
}
