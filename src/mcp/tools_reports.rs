//! Reporting tool handlers: generate_analysis_script, get_project_findings,
//! and explain_remediation.

use crate::client::ApiClient;
use crate::error::ToolError;
use crate::formatter::{format_historical_findings, format_script};
use crate::remediation::RemediationCatalog;
use crate::types::ScriptType;

// generate_analysis_script
pub async fn handle_generate_script(
    api: &ApiClient,
    script_type: ScriptType,
) -> Result<String, ToolError> {
    let script = api.generate_script(script_type).await?;
    Ok(format_script(script_type, &script))
}

// get_project_findings
pub async fn handle_project_findings(
    api: &ApiClient,
    project_name: &str,
) -> Result<String, ToolError> {
    if project_name.is_empty() {
        return Err(ToolError::Validation(
            "Project name must not be empty".to_string(),
        ));
    }
    let findings = api.fetch_findings(project_name).await?;
    if findings.is_empty() {
        return Ok(format!(
            "No historical findings found for project: {project_name}"
        ));
    }
    Ok(format_historical_findings(&findings, project_name))
}

// explain_remediation
pub fn handle_explain_remediation(
    catalog: &RemediationCatalog,
    category: &str,
) -> Result<String, ToolError> {
    Ok(catalog.explain(category))
}
