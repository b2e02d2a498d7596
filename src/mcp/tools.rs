//! Knowledge tool implementations.
//!
//! Four tools mapping directly onto retrieval engine operations:
//! `search_knowledge`, `search_by_role`, `list_roles` and `get_stats`.
//! Every handler waits on the engine gate, so tool calls issued while the
//! index is still warming up simply block instead of failing.

use crate::KnowledgeError;
use crate::corpus::roles::{ROLES, is_known_role, role_info};
use crate::database::SearchResult;
use crate::engine::EngineGate;
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool};
use crate::mcp::server::{McpServer, ToolHandler};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error};

const DEFAULT_N_RESULTS: usize = 5;

/// Register all four knowledge tools on a server.
pub async fn register_knowledge_tools(server: &McpServer, gate: Arc<EngineGate>) {
    server
        .register_tool(
            SearchKnowledgeHandler::tool_definition(),
            SearchKnowledgeHandler::new(Arc::clone(&gate)),
        )
        .await;
    server
        .register_tool(
            SearchByRoleHandler::tool_definition(),
            SearchByRoleHandler::new(Arc::clone(&gate)),
        )
        .await;
    server
        .register_tool(
            ListRolesHandler::tool_definition(),
            ListRolesHandler::new(Arc::clone(&gate)),
        )
        .await;
    server
        .register_tool(
            GetStatsHandler::tool_definition(),
            GetStatsHandler::new(gate),
        )
        .await;
}

/// Cross-role knowledge search tool handler
pub struct SearchKnowledgeHandler {
    gate: Arc<EngineGate>,
}

/// Single-role knowledge search tool handler
pub struct SearchByRoleHandler {
    gate: Arc<EngineGate>,
}

/// Role listing tool handler
pub struct ListRolesHandler {
    gate: Arc<EngineGate>,
}

/// Index statistics tool handler
pub struct GetStatsHandler {
    gate: Arc<EngineGate>,
}

/// Stored distances are dissimilarities; clients read relevance more
/// naturally, so results render `1 - distance` as a percentage.
fn relevance_percent(distance: f32) -> String {
    format!("{:.2}%", (1.0 - distance) * 100.0)
}

fn n_results_arg(args: &std::collections::HashMap<String, serde_json::Value>) -> usize {
    args.get("n_results")
        .and_then(serde_json::Value::as_i64)
        .map_or(DEFAULT_N_RESULTS, |n| usize::try_from(n.max(1)).unwrap_or(1))
}

fn render_results(header: String, results: &[SearchResult], with_role: bool) -> String {
    let mut output = header;
    for (i, result) in results.iter().enumerate() {
        let rank = i + 1;
        if with_role {
            let _ = writeln!(output, "### [{rank}] {}", result.metadata.role_name);
            let _ = writeln!(
                output,
                "**Relevance**: {}\n",
                relevance_percent(result.distance)
            );
        } else {
            let _ = writeln!(
                output,
                "### [{rank}] Relevance: {}\n",
                relevance_percent(result.distance)
            );
        }
        let _ = writeln!(output, "{}\n\n---\n", result.content);
    }
    output
}

fn known_roles_listing() -> String {
    let mut listing = String::new();
    for role in ROLES {
        let _ = writeln!(listing, "- {}: {}", role.id, role.description);
    }
    listing
}

impl SearchKnowledgeHandler {
    #[inline]
    pub fn new(gate: Arc<EngineGate>) -> Self {
        Self { gate }
    }

    /// Create the search_knowledge tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "search_knowledge".to_string(),
            description: Some(
                "Search the team knowledge base across all expert roles".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Question or topic to search for"
                    },
                    "n_results": {
                        "type": "integer",
                        "description": "Number of results to return (default: 5)",
                        "default": 5
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchKnowledgeHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: query"))?;
        let n_results = n_results_arg(&args);

        debug!("search_knowledge: query='{}', n_results={}", query, n_results);
        let engine = self.gate.ready().await?;

        match engine.search(query, n_results, None).await {
            Ok(results) => {
                if results.is_empty() {
                    return Ok(CallToolResult::text(format!(
                        "No results found for '{query}'."
                    )));
                }
                let header = format!("## Search results for '{query}'\n\n");
                Ok(CallToolResult::text(render_results(header, &results, true)))
            }
            Err(e) => {
                error!("Error performing search: {}", e);
                Ok(CallToolResult::error(format!("Search error: {e}")))
            }
        }
    }
}

impl SearchByRoleHandler {
    #[inline]
    pub fn new(gate: Arc<EngineGate>) -> Self {
        Self { gate }
    }

    /// Create the search_by_role tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        let role_ids: Vec<&str> = ROLES.iter().map(|r| r.id).collect();
        Tool {
            name: "search_by_role".to_string(),
            description: Some(
                "Search knowledge restricted to a single expert role".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Question to search for"
                    },
                    "role": {
                        "type": "string",
                        "description": "Role id (e.g. backend_lead, security_lead)",
                        "enum": role_ids
                    },
                    "n_results": {
                        "type": "integer",
                        "description": "Number of results to return (default: 5)",
                        "default": 5
                    }
                },
                "required": ["query", "role"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchByRoleHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: query"))?;
        let role = args
            .get("role")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: role"))?;
        let n_results = n_results_arg(&args);

        if !is_known_role(role) {
            let err = KnowledgeError::UnknownRole(role.to_string());
            return Ok(CallToolResult::error(format!(
                "{err}\n\nAvailable roles:\n{}",
                known_roles_listing()
            )));
        }

        debug!(
            "search_by_role: query='{}', role={}, n_results={}",
            query, role, n_results
        );
        let engine = self.gate.ready().await?;

        match engine.search_by_role(query, role, n_results).await {
            Ok(results) => {
                if results.is_empty() {
                    return Ok(CallToolResult::text(format!(
                        "No results found for '{query}' in role '{role}'."
                    )));
                }
                let role_desc = role_info(role).map_or(role, |info| info.description);
                let header = format!("## [{role_desc}] Search results for '{query}'\n\n");
                Ok(CallToolResult::text(render_results(
                    header, &results, false,
                )))
            }
            Err(e) => {
                error!("Error performing role search: {}", e);
                Ok(CallToolResult::error(format!("Search error: {e}")))
            }
        }
    }
}

impl ListRolesHandler {
    #[inline]
    pub fn new(gate: Arc<EngineGate>) -> Self {
        Self { gate }
    }

    /// Create the list_roles tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "list_roles".to_string(),
            description: Some("List all known expert roles".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for ListRolesHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        debug!("Listing expert roles");
        let engine = self.gate.ready().await?;

        let mut output = String::from("## Expert roles\n\n");
        output.push_str("| Role id | Description |\n|---------|-------------|\n");
        for role in ROLES {
            let _ = writeln!(output, "| `{}` | {} |", role.id, role.description);
        }

        match engine.all_roles().await {
            Ok(stored_roles) => {
                let _ = write!(
                    output,
                    "\n\n**Roles present in the store**: {}",
                    stored_roles.len()
                );
                Ok(CallToolResult::text(output))
            }
            Err(e) => {
                error!("Error listing stored roles: {}", e);
                Ok(CallToolResult::error(format!("Error listing roles: {e}")))
            }
        }
    }
}

impl GetStatsHandler {
    #[inline]
    pub fn new(gate: Arc<EngineGate>) -> Self {
        Self { gate }
    }

    /// Create the get_stats tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "get_stats".to_string(),
            description: Some("Show knowledge base statistics".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetStatsHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        debug!("Collecting knowledge base statistics");
        let engine = self.gate.ready().await?;

        let chunk_count = match engine.count().await {
            Ok(count) => count,
            Err(e) => {
                error!("Error counting chunks: {}", e);
                return Ok(CallToolResult::error(format!("Error counting chunks: {e}")));
            }
        };
        let roles = match engine.all_roles().await {
            Ok(roles) => roles,
            Err(e) => {
                error!("Error listing stored roles: {}", e);
                return Ok(CallToolResult::error(format!("Error listing roles: {e}")));
            }
        };

        let mut output = String::from("## Knowledge base statistics\n\n");
        let _ = writeln!(output, "- **Total chunks**: {chunk_count}");
        let _ = writeln!(output, "- **Distinct roles**: {}", roles.len());
        let _ = writeln!(output, "- **Roles**: {}", roles.join(", "));

        Ok(CallToolResult::text(output))
    }
}
