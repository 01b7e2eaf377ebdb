use serde::{Deserialize, Serialize};

/// Comment metric definitions for one metrics version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDefinitions {
    #[serde(default)]
    pub metrics_data: Vec<MetricsDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config_version: i64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<MetricValue>,
    #[serde(default)]
    pub values: Vec<MetricValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: i64,
}
