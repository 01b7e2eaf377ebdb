use serde::{Deserialize, Serialize};

use super::common::TimeZone;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_data: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<TimeZone>,
    #[serde(default)]
    pub mapped_committers: Committers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Committers {
    #[serde(default)]
    pub committers: Vec<Committer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Committer {
    pub committer_name: String,
    pub repository_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub elements: Vec<Preference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preference {
    pub key: String,
    pub value: String,
}
