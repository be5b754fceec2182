//! MCP server implementation using rmcp over stdio transport.
//!
//! Provides the five Statelessor tools. Definitions and routing come from
//! the `#[tool_router]` macro; `call_tool` validates each invocation against
//! the tool's schema first so bad arguments come back as tool errors, while
//! an unknown tool name is rejected at the protocol level.

use std::sync::Arc;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, JsonObject, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use serde::Deserialize;

use crate::client::ApiClient;
use crate::config::StatelessorConfig;
use crate::error::ToolError;
use crate::packager::Packager;
use crate::remediation;
use crate::types::ScriptType;

use super::registry;

// ---------------------------------------------------------------------------
// Server struct
// ---------------------------------------------------------------------------

/// Statelessor MCP server.
///
/// Holds the shared API client and the packager; both are immutable, so the
/// server clones cheaply per session and needs no locking.
#[derive(Clone)]
pub struct StatelessorServer {
    api: Arc<ApiClient>,
    packager: Packager,
    config: StatelessorConfig,
}

impl std::fmt::Debug for StatelessorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatelessorServer")
            .field("api", &self.api)
            .field("staging_dir", &self.packager.staging_dir())
            .field("config", &self.config)
            .finish()
    }
}

impl StatelessorServer {
    /// Create a server around an existing client, staging archives in the
    /// OS temp directory.
    pub fn new(api: Arc<ApiClient>, config: StatelessorConfig) -> Self {
        Self::with_packager(api, Packager::default(), config)
    }

    /// Create a server with an explicit packager.
    pub fn with_packager(api: Arc<ApiClient>, packager: Packager, config: StatelessorConfig) -> Self {
        Self {
            api,
            packager,
            config,
        }
    }

    /// Build the client from `config` and wrap it in a server.
    pub fn from_config(config: StatelessorConfig) -> Result<Self, ToolError> {
        let api = ApiClient::new(&config.api)?;
        Ok(Self::new(Arc::new(api), config))
    }

    /// Every registered tool definition.
    pub fn tool_definitions() -> Vec<Tool> {
        Self::tool_router().list_all()
    }

    /// Check that `name` is registered and `arguments` satisfy its schema.
    pub fn validate_invocation(name: &str, arguments: Option<&JsonObject>) -> Result<(), ToolError> {
        let tools = Self::tool_definitions();
        let tool = tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        registry::validate_arguments(tool, arguments)
    }
}

/// Wrap a handler outcome in the tool response envelope.
pub(crate) fn respond(tool_name: &str, outcome: Result<String, ToolError>) -> CallToolResult {
    match outcome {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            tracing::warn!(tool = tool_name, "tool call failed: {e}");
            CallToolResult::error(vec![Content::text(format!(
                "{}: {e}",
                registry::failure_context(tool_name)
            ))])
        }
    }
}

// ---------------------------------------------------------------------------
// Tool parameter structs
// ---------------------------------------------------------------------------

#[derive(Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeGitParams {
    #[schemars(description = "Git repository URL (HTTPS or SSH), e.g. https://github.com/org/repo.git or git@github.com:org/repo.git")]
    pub git_url: String,
    #[schemars(description = "SSH key ID for private repositories (optional)")]
    pub ssh_key_id: Option<String>,
}

#[derive(Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeLocalParams {
    #[schemars(description = "Absolute path to project directory")]
    pub project_path: String,
}

#[derive(Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateScriptParams {
    #[schemars(description = "Type of script to generate: 'bash' or 'powershell'")]
    pub script_type: ScriptType,
}

#[derive(Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectFindingsParams {
    #[schemars(description = "Name of the project")]
    pub project_name: String,
}

#[derive(Deserialize, schemars::JsonSchema)]
pub(crate) struct ExplainRemediationParams {
    #[schemars(description = "Pattern category (e.g. \"Session State\", \"Static Mutable Field\"), case-insensitive")]
    pub category: String,
}

// ---------------------------------------------------------------------------
// Tool implementations
// ---------------------------------------------------------------------------

#[tool_router]
impl StatelessorServer {
    #[tool(
        name = "analyze_git_repository",
        description = "Analyze a Git repository for stateful code patterns in .NET or Java projects. The repository is cloned and scanned by the Statelessor service."
    )]
    async fn analyze_git_repository(
        &self,
        Parameters(p): Parameters<AnalyzeGitParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome =
            super::tools_analysis::handle_analyze_git(&self.api, &p.git_url, p.ssh_key_id.as_deref())
                .await;
        Ok(respond(registry::ANALYZE_GIT_REPOSITORY, outcome))
    }

    #[tool(
        name = "analyze_local_project",
        description = "Analyze a local project directory for stateful code patterns. The directory is zipped, uploaded, and the temporary archive removed afterwards."
    )]
    async fn analyze_local_project(
        &self,
        Parameters(p): Parameters<AnalyzeLocalParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome =
            super::tools_analysis::handle_analyze_local(&self.api, &self.packager, &p.project_path)
                .await;
        Ok(respond(registry::ANALYZE_LOCAL_PROJECT, outcome))
    }

    #[tool(
        name = "generate_analysis_script",
        description = "Generate a bash or PowerShell script for offline analysis of a project that cannot be uploaded."
    )]
    async fn generate_analysis_script(
        &self,
        Parameters(p): Parameters<GenerateScriptParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = super::tools_reports::handle_generate_script(&self.api, p.script_type).await;
        Ok(respond(registry::GENERATE_ANALYSIS_SCRIPT, outcome))
    }

    #[tool(
        name = "get_project_findings",
        description = "Retrieve historical analysis findings for a project, with the trend in issue count across scans."
    )]
    async fn get_project_findings(
        &self,
        Parameters(p): Parameters<ProjectFindingsParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = super::tools_reports::handle_project_findings(&self.api, &p.project_name).await;
        Ok(respond(registry::GET_PROJECT_FINDINGS, outcome))
    }

    #[tool(
        name = "explain_remediation",
        description = "Get detailed remediation guidance for a specific stateful pattern category. Unknown categories return the list of known ones."
    )]
    async fn explain_remediation(
        &self,
        Parameters(p): Parameters<ExplainRemediationParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome =
            super::tools_reports::handle_explain_remediation(remediation::catalog(), &p.category);
        Ok(respond(registry::EXPLAIN_REMEDIATION, outcome))
    }
}

// ---------------------------------------------------------------------------
// ServerHandler impl — manual list_tools/call_tool for pre-dispatch validation
// ---------------------------------------------------------------------------

impl ServerHandler for StatelessorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Statelessor — finds stateful code patterns (session state, static mutable \
                 fields, in-memory caches, local file storage) that block horizontal scaling \
                 of .NET and Java services. Use analyze_git_repository or analyze_local_project \
                 to scan, get_project_findings for history, explain_remediation for fixes, and \
                 generate_analysis_script when code cannot leave the machine."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: Self::tool_definitions(),
        }))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        match Self::validate_invocation(&request.name, request.arguments.as_ref()) {
            Ok(()) => {}
            Err(e @ ToolError::UnknownTool(_)) => {
                tracing::warn!("rejecting call: {e}");
                return Err(McpError::invalid_params(e.to_string(), None));
            }
            Err(e) => return Ok(respond(&request.name, Err(e))),
        }

        let tool_context =
            rmcp::handler::server::tool::ToolCallContext::new(self, request, context);
        Self::tool_router().call(tool_context).await
    }
}

// ---------------------------------------------------------------------------
// Public entry point: run the MCP server over stdio
// ---------------------------------------------------------------------------

/// Start the MCP server on stdin/stdout.
///
/// Returns when the client disconnects or Ctrl-C / SIGTERM arrives.
/// Archives of in-flight calls are removed when their guards drop.
pub async fn run_server(server: StatelessorServer) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        api = server.api.base_url(),
        "Statelessor MCP server running on stdio"
    );
    let transport = rmcp::transport::io::stdio();
    let running = server.serve(transport).await.inspect_err(|e| {
        tracing::error!("MCP server error: {}", e);
    })?;

    tokio::select! {
        quit = running.waiting() => {
            if let Err(e) = quit {
                tracing::error!("MCP server task failed: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutting down MCP server");
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn setup_server() -> StatelessorServer {
        let config = StatelessorConfig {
            api: ApiConfig::with_base_url("http://127.0.0.1:9"),
            ..Default::default()
        };
        StatelessorServer::from_config(config).expect("client builds")
    }

    fn args(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn lists_every_registered_tool() {
        let mut listed: Vec<String> = StatelessorServer::tool_definitions()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        listed.sort();
        let mut expected: Vec<String> = registry::TOOLS.iter().map(|t| t.name.to_string()).collect();
        expected.sort();
        assert_eq!(listed, expected);
    }

    #[test]
    fn schemas_declare_required_arguments() {
        let required_for = |name: &str| -> Vec<String> {
            let tools = StatelessorServer::tool_definitions();
            let tool = tools.iter().find(|t| t.name == name).unwrap();
            tool.input_schema
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default()
        };
        assert_eq!(required_for(registry::ANALYZE_GIT_REPOSITORY), vec!["gitUrl"]);
        assert_eq!(required_for(registry::ANALYZE_LOCAL_PROJECT), vec!["projectPath"]);
        assert_eq!(required_for(registry::GENERATE_ANALYSIS_SCRIPT), vec!["scriptType"]);
        assert_eq!(required_for(registry::GET_PROJECT_FINDINGS), vec!["projectName"]);
        assert_eq!(required_for(registry::EXPLAIN_REMEDIATION), vec!["category"]);
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = StatelessorServer::validate_invocation("scan_everything", None).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref n) if n == "scan_everything"));
    }

    #[test]
    fn missing_argument_is_validation_error() {
        let err =
            StatelessorServer::validate_invocation(registry::ANALYZE_GIT_REPOSITORY, None).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn script_type_outside_enum_is_validation_error() {
        let a = args(json!({"scriptType": "zsh"}));
        let err = StatelessorServer::validate_invocation(registry::GENERATE_ANALYSIS_SCRIPT, Some(&a))
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)), "{err}");

        let ok = args(json!({"scriptType": "powershell"}));
        assert!(
            StatelessorServer::validate_invocation(registry::GENERATE_ANALYSIS_SCRIPT, Some(&ok)).is_ok()
        );
    }

    #[test]
    fn optional_ssh_key_may_be_omitted_or_null() {
        let a = args(json!({"gitUrl": "git@github.com:acme/app.git"}));
        assert!(StatelessorServer::validate_invocation(registry::ANALYZE_GIT_REPOSITORY, Some(&a)).is_ok());
        let b = args(json!({"gitUrl": "git@github.com:acme/app.git", "sshKeyId": null}));
        assert!(StatelessorServer::validate_invocation(registry::ANALYZE_GIT_REPOSITORY, Some(&b)).is_ok());
    }

    #[test]
    fn respond_wraps_errors_in_envelope() {
        let result = respond(
            registry::ANALYZE_GIT_REPOSITORY,
            Err(ToolError::Validation("Invalid Git URL. Must start with https:// or git@".into())),
        );
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            "Error analyzing Git repository: Invalid Git URL. Must start with https:// or git@"
        );

        let ok = respond(registry::EXPLAIN_REMEDIATION, Ok("fine".into()));
        assert_eq!(ok.is_error, Some(false));
        assert_eq!(text_of(&ok), "fine");
    }

    #[tokio::test]
    async fn invalid_git_url_returns_error_envelope() {
        let server = setup_server();
        let result = server
            .analyze_git_repository(Parameters(AnalyzeGitParams {
                git_url: "svn://example.com/repo".into(),
                ssh_key_id: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("Invalid Git URL"));
    }

    #[tokio::test]
    async fn explain_remediation_matches_case_insensitively() {
        let server = setup_server();
        let result = server
            .explain_remediation(Parameters(ExplainRemediationParams {
                category: "static mutable field".into(),
            }))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("# Remediation: Static Mutable Field"));
    }

    #[tokio::test]
    async fn unreachable_service_is_reported_not_raised() {
        let server = setup_server();
        let result = server
            .get_project_findings(Parameters(ProjectFindingsParams {
                project_name: "orders-api".into(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            "Error retrieving findings: fetchFindings failed: No response from server"
        );
    }

    #[test]
    fn server_info_uses_configured_identity() {
        let mut config = StatelessorConfig::default();
        config.server.name = "statelessor-test".into();
        let api = Arc::new(ApiClient::new(&config.api).unwrap());
        let info = StatelessorServer::new(api, config).get_info();
        assert_eq!(info.server_info.name, "statelessor-test");
        assert!(info.capabilities.tools.is_some());
    }
}
