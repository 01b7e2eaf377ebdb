use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

/// One page of changesets, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetPage {
    #[serde(default)]
    pub newer_change_sets_exist: bool,
    #[serde(default)]
    pub older_change_sets_exist: bool,
    #[serde(default)]
    pub change: Vec<Change>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Change {
    pub csid: String,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(default)]
    pub revision: Vec<Revision>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub path: String,
    pub revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_revision: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// A file or directory at a given revision.
pub type VersionedEntity = Revision;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub dir: Vec<Directory>,
    #[serde(default)]
    pub file: Vec<Revision>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Directory {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default, alias = "revisions")]
    pub revision: Vec<Revision>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddChangeSet {
    pub repository: String,
    pub changesets: ChangeSetIds,
}

impl AddChangeSet {
    pub fn new<I, S>(repository: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repository: repository.into(),
            changesets: ChangeSetIds {
                changeset_data: ids
                    .into_iter()
                    .map(|id| ChangeSetId { id: id.into() })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetIds {
    #[serde(default)]
    pub changeset_data: Vec<ChangeSetId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSetId {
    pub id: String,
}
