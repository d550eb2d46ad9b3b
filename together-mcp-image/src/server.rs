//! MCP Server implementation for the Image server.
//!
//! This module provides the MCP server handler that exposes the
//! `generate_image` tool. Both hosting surfaces (stdio and HTTP) share one
//! `ImageServer`, which holds no per-invocation state.

use crate::handler::{ArgumentPolicy, GenerateImageArgs, ImageHandler, JsonObject, ValidationError, json_type_name};
use crate::registry::{self, TOOL_NAME};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolResult, Content, CustomRequest, CustomResult, ErrorCode, Implementation, ServerCapabilities,
        ServerInfo,
    },
};
use serde_json::Value;
use std::sync::Arc;
use together_mcp_common::config::Config;
use together_mcp_common::error::Error;
use tracing::{debug, info, warn};

/// Prefix of the text returned when the upstream API reports a failure.
pub const API_ERROR_PREFIX: &str = "API Error: ";

const CALL_TOOL_METHOD: &str = "tools/call";

/// MCP Server for image generation.
#[derive(Clone)]
pub struct ImageServer {
    /// Handler for image generation operations
    handler: Arc<ImageHandler>,
    /// How invocation arguments are parsed and merged
    policy: ArgumentPolicy,
}

impl ImageServer {
    /// Create a new ImageServer with the given configuration and the default argument policy.
    pub fn new(config: Config) -> Self {
        Self::with_handler(ImageHandler::new(config))
    }

    /// Create a new ImageServer around an existing handler.
    pub fn with_handler(handler: ImageHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            policy: ArgumentPolicy::default(),
        }
    }

    /// Replace the argument policy.
    pub fn with_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The argument policy in effect.
    pub fn policy(&self) -> ArgumentPolicy {
        self.policy
    }

    /// Dispatch one tool invocation.
    ///
    /// Unknown tool names fail with `METHOD_NOT_FOUND` before the arguments
    /// are looked at.
    pub async fn invoke(&self, name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult, McpError> {
        if name != TOOL_NAME {
            return Err(unknown_tool(name));
        }

        let arguments = arguments.ok_or_else(|| McpError::invalid_params("Missing parameters", None))?;
        self.generate_image(&arguments).await
    }

    /// Generate images from the raw invocation arguments.
    ///
    /// Upstream API failures come back as an `isError` result; only
    /// transport-level failures are returned as `Err`.
    pub async fn generate_image(&self, arguments: &JsonObject) -> Result<CallToolResult, McpError> {
        let request = GenerateImageArgs::parse(arguments, self.policy.mistyped)
            .map_err(invalid_params)?
            .resolve(self.policy.defaults);

        info!(model = %request.model, n = %request.n, "Generating image");

        match self.handler.generate_image(&request).await {
            Ok(body) => {
                let text = serde_json::to_string_pretty(&body).map_err(|e| {
                    McpError::internal_error(format!("Failed to serialize response: {}", e), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(Error::Api { message, .. }) => Ok(CallToolResult::error(vec![Content::text(format!(
                "{}{}",
                API_ERROR_PREFIX, message
            ))])),
            Err(e) => Err(McpError::internal_error(
                format!("Image generation failed: {}", e),
                None,
            )),
        }
    }
}

fn unknown_tool(name: &str) -> McpError {
    warn!(tool = %name, "Unknown tool requested");
    McpError::new(ErrorCode::METHOD_NOT_FOUND, format!("Unknown tool: {}", name), None)
}

/// Fault for a request rmcp could not parse into a known request type.
///
/// A `tools/call` lands here when its params do not fit the call shape, most
/// often because `arguments` is not an object. The tool identity is still
/// checked first.
pub fn reject_custom_request(request: &CustomRequest) -> McpError {
    if request.method != CALL_TOOL_METHOD {
        return McpError::new(ErrorCode::METHOD_NOT_FOUND, request.method.clone(), None);
    }

    let params = request.params.as_ref();
    match params.and_then(|p| p.get("name")).and_then(Value::as_str) {
        Some(name) if name != TOOL_NAME => unknown_tool(name),
        Some(_) => invalid_params(ValidationError {
            field: "arguments".to_string(),
            message: format!(
                "must be an object, got {}",
                params.and_then(|p| p.get("arguments")).map_or("nothing", json_type_name)
            ),
        }),
        None => invalid_params(ValidationError {
            field: "name".to_string(),
            message: "must be a string".to_string(),
        }),
    }
}

fn invalid_params(error: ValidationError) -> McpError {
    debug!(field = %error.field, message = %error.message, "Rejecting invocation arguments");
    McpError::invalid_params(
        format!("Invalid parameters: {}", error),
        Some(serde_json::json!({ "field": error.field })),
    )
}

impl ServerHandler for ImageServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Image generation server backed by the Together AI images API. \
                 Use generate_image with a text prompt; width, height, steps, n, model \
                 and response_format are optional."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing tools");
            Ok(registry::list_tools())
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.invoke(params.name.as_ref(), params.arguments).await }
    }

    fn on_custom_request(
        &self,
        request: CustomRequest,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CustomResult, McpError>> + Send + '_ {
        std::future::ready(Err(reject_custom_request(&request)))
    }
}
