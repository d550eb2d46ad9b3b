//! Tool registry for the MCP Image server.
//!
//! The `generate_image` descriptor is built once from the JSON schema of
//! [`ImageGenerationRequest`] and handed out unchanged on every discovery
//! request.

use crate::handler::{ImageGenerationRequest, JsonObject};
use rmcp::model::{ListToolsResult, Tool};
use schemars::r#gen::SchemaSettings;
use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

/// Name of the single tool exposed by the server.
pub const TOOL_NAME: &str = "generate_image";

/// Human-readable description of the tool.
pub const TOOL_DESCRIPTION: &str = "Generate images from a text prompt using the Together AI images API \
     (FLUX.1 schnell by default). Returns the API response as JSON text, with each image \
     either base64-encoded or as a URL depending on response_format.";

static GENERATE_IMAGE_TOOL: LazyLock<Tool> = LazyLock::new(|| Tool {
    name: Cow::Borrowed(TOOL_NAME),
    description: Some(Cow::Borrowed(TOOL_DESCRIPTION)),
    input_schema: Arc::new(input_schema()),
    annotations: None,
    icons: None,
    meta: None,
    output_schema: None,
    title: None,
});

/// Build the input schema with every subschema inlined, so enums and bounds
/// sit directly on each property.
fn input_schema() -> JsonObject {
    let generator = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<ImageGenerationRequest>();

    match serde_json::to_value(&schema) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}

/// The `generate_image` tool descriptor.
pub fn generate_image_tool() -> &'static Tool {
    &GENERATE_IMAGE_TOOL
}

/// All tools exposed by the server.
pub fn list_tools() -> ListToolsResult {
    ListToolsResult {
        tools: vec![generate_image_tool().clone()],
        next_cursor: None,
        meta: None,
    }
}
