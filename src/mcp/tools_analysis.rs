//! Analysis tool handlers: analyze_git_repository and analyze_local_project.

use std::path::{Path, PathBuf};

use crate::client::ApiClient;
use crate::error::ToolError;
use crate::formatter::format_analysis_result;
use crate::packager::{project_size, Packager};

/// URL schemes the service can clone from.
pub const GIT_URL_PREFIXES: [&str; 2] = ["https://", "git@"];

/// Accept only `https://` and `git@` (SSH) repository URLs.
pub fn validate_git_url(git_url: &str) -> Result<(), ToolError> {
    if GIT_URL_PREFIXES.iter().any(|p| git_url.starts_with(p)) {
        Ok(())
    } else {
        Err(ToolError::Validation(
            "Invalid Git URL. Must start with https:// or git@".to_string(),
        ))
    }
}

/// Resolve `project_path` to an existing directory.
pub async fn validate_project_dir(project_path: &str) -> Result<PathBuf, ToolError> {
    if project_path.trim().is_empty() {
        return Err(ToolError::Validation("Project path must not be empty".to_string()));
    }
    let path = Path::new(project_path);
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        ToolError::Validation(format!("Project path {project_path} is not accessible: {e}"))
    })?;
    if !metadata.is_dir() {
        return Err(ToolError::Validation(
            "Project path must be a directory".to_string(),
        ));
    }
    Ok(tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf()))
}

// analyze_git_repository
pub async fn handle_analyze_git(
    api: &ApiClient,
    git_url: &str,
    ssh_key_id: Option<&str>,
) -> Result<String, ToolError> {
    validate_git_url(git_url)?;
    let ssh_key_id = ssh_key_id.map(str::trim).filter(|k| !k.is_empty());
    let result = api.analyze_repository(git_url, ssh_key_id).await?;
    Ok(format_analysis_result(&result))
}

// analyze_local_project
//
// The archive is released on every path once it exists; a packaging failure
// aborts before any network call.
pub async fn handle_analyze_local(
    api: &ApiClient,
    packager: &Packager,
    project_path: &str,
) -> Result<String, ToolError> {
    let project_dir = validate_project_dir(project_path).await?;
    let walk_dir = project_dir.clone();
    let bytes = tokio::task::spawn_blocking(move || project_size(&walk_dir))
        .await
        .unwrap_or_default();
    tracing::info!(project = %project_dir.display(), bytes, "packaging local project");

    let archive = packager.package(&project_dir).await?;
    let outcome = api.analyze_local_archive(archive.path()).await;
    archive.release().await;

    Ok(format_analysis_result(&outcome?))
}
