//! Wire types exchanged with the Statelessor API.
//!
//! The remote service owns these shapes; deserialization is lenient so a
//! partially populated payload still renders instead of failing the tool.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Analysis result
// ---------------------------------------------------------------------------

/// Result of a repository or local-archive analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "null_as_default")]
    pub project_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub project_type: String,
    /// RFC 3339 timestamp (or epoch millis) as sent by the service.
    pub scan_date: serde_json::Value,
    #[serde(deserialize_with = "null_as_default")]
    pub complexity_factor: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: Stats,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: Vec<SummaryFinding>,
    #[serde(deserialize_with = "null_as_default")]
    pub actions: Vec<RecommendedAction>,
}

/// Issue counts by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_issues: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub high_severity: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub medium_severity: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub low_severity: u64,
}

/// One aggregated pattern hit in the summary section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryFinding {
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pattern: String,
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub effort: f64,
}

/// A remediation action recommended for a category, with its steps.
///
/// Also the shape of entries in the bundled remediation catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendedAction {
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub effort_weight: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub sub_actions: Vec<SubAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubAction {
    #[serde(deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(deserialize_with = "null_as_default")]
    pub effort: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Historical findings
// ---------------------------------------------------------------------------

/// One past scan of a project, oldest first in a findings list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoricalFinding {
    pub scan_date: serde_json::Value,
    #[serde(deserialize_with = "null_as_default")]
    pub total_issues: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub complexity_factor: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_effort: f64,
}

// ---------------------------------------------------------------------------
// Script / SSH key
// ---------------------------------------------------------------------------

/// Flavour of offline analysis script.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    Bash,
    Powershell,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Powershell => "powershell",
        }
    }
}

impl std::fmt::Display for ScriptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key pair registered by the service for cloning private repositories.
///
/// Only the public half is ever returned; fields beyond the id and public
/// key are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyPair {
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn analysis_result_tolerates_missing_sections() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "projectName": "orders-api",
            "projectType": ".NET",
            "scanDate": "2026-03-01T10:00:00Z",
            "complexityFactor": 1.4,
            "detailed": [{"file": "Startup.cs"}]
        }))
        .unwrap();
        assert_eq!(result.project_name, "orders-api");
        assert_eq!(result.stats, Stats::default());
        assert!(result.summary.is_empty());
        assert!(result.actions.is_empty());
    }

    #[test]
    fn explicit_nulls_decode_as_defaults() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "projectName": "orders-api",
            "projectType": null,
            "scanDate": null,
            "complexityFactor": null,
            "stats": null,
            "summary": null,
            "actions": null
        }))
        .unwrap();
        assert_eq!(result.project_name, "orders-api");
        assert_eq!(result.project_type, "");
        assert_eq!(result.complexity_factor, 0.0);
        assert_eq!(result.stats, Stats::default());
        assert!(result.summary.is_empty());
        assert!(result.actions.is_empty());

        let stats: Stats = serde_json::from_value(json!({"totalIssues": 3, "highSeverity": null})).unwrap();
        assert_eq!(stats.total_issues, 3);
        assert_eq!(stats.high_severity, 0);

        let action: RecommendedAction = serde_json::from_value(json!({
            "category": "Session State",
            "effortWeight": null,
            "subActions": [{"action": "Move to Redis", "effort": null}]
        }))
        .unwrap();
        assert_eq!(action.effort_weight, 0.0);
        assert_eq!(action.sub_actions[0].effort, 0.0);

        let scan: HistoricalFinding = serde_json::from_value(json!({
            "totalIssues": null, "complexityFactor": null, "totalEffort": 4
        }))
        .unwrap();
        assert_eq!(scan.total_issues, 0);
        assert_eq!(scan.total_effort, 4.0);
    }

    #[test]
    fn sub_action_description_is_optional() {
        let action: RecommendedAction = serde_json::from_value(json!({
            "category": "Session State",
            "effortWeight": 8,
            "subActions": [
                {"action": "Move to Redis", "effort": 5, "description": "Use a distributed cache"},
                {"action": "Remove InProc mode", "effort": 3}
            ]
        }))
        .unwrap();
        assert_eq!(action.effort_weight, 8.0);
        assert_eq!(action.sub_actions[0].description.as_deref(), Some("Use a distributed cache"));
        assert_eq!(action.sub_actions[1].description, None);
    }

    #[test]
    fn script_type_wire_names() {
        assert_eq!(ScriptType::Bash.to_string(), "bash");
        assert_eq!(ScriptType::Powershell.as_str(), "powershell");
        let parsed: ScriptType = serde_json::from_value(json!("powershell")).unwrap();
        assert_eq!(parsed, ScriptType::Powershell);
        assert!(serde_json::from_value::<ScriptType>(json!("zsh")).is_err());
    }

    #[test]
    fn ssh_key_pair_keeps_unknown_fields() {
        let key: SshKeyPair = serde_json::from_value(json!({
            "keyId": "key-123",
            "publicKey": "ssh-ed25519 AAAA",
            "fingerprint": "SHA256:abc"
        }))
        .unwrap();
        assert_eq!(key.key_id, "key-123");
        assert_eq!(key.extra["fingerprint"], "SHA256:abc");
    }
}
