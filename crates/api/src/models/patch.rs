use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub anchor_path: String,
    pub anchor_repository: String,
    #[serde(default)]
    pub strip_count: u32,
}

/// Patch text to attach to a review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Patch {
    pub patch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchGroups {
    #[serde(default)]
    pub patch_group: Vec<PatchGroup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchGroup {
    #[serde(default)]
    pub patches: Vec<UploadedPatch>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub display_name: String,
}

/// A patch as stored on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPatch {
    pub id: i64,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub upload_date: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}
