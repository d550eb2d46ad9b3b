//! Image generation handler for the MCP Image server.
//!
//! This module turns the loosely typed arguments of a `generate_image`
//! invocation into a fully resolved [`ImageGenerationRequest`] and forwards it
//! to the Together AI images endpoint.
//!
//! Argument handling is deliberately lenient: bounds are advertised in the
//! tool schema but only types are checked here, and the upstream API remains
//! the authority on ranges. How mistyped and falsy values are treated is
//! selected through [`ArgumentPolicy`].

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use together_mcp_common::config::Config;
use together_mcp_common::error::Error;
use tracing::{debug, info, instrument, warn};

/// JSON object carrying the raw invocation arguments.
pub type JsonObject = Map<String, Value>;

/// Default model for image generation.
pub const DEFAULT_MODEL: &str = "black-forest-labs/FLUX.1-schnell-Free";

/// Default image width in pixels.
pub const DEFAULT_WIDTH: i64 = 1024;

/// Default image height in pixels.
pub const DEFAULT_HEIGHT: i64 = 768;

/// Default number of diffusion steps.
pub const DEFAULT_STEPS: i64 = 1;

/// Default number of images per request.
pub const DEFAULT_NUMBER_OF_IMAGES: i64 = 1;

/// Minimum advertised image dimension.
pub const MIN_DIMENSION: i64 = 128;

/// Maximum advertised image dimension.
pub const MAX_DIMENSION: i64 = 2048;

/// Maximum advertised number of steps.
pub const MAX_STEPS: i64 = 100;

/// Maximum advertised number of images.
pub const MAX_NUMBER_OF_IMAGES: i64 = 4;

/// How generated images are returned by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    B64Json,
    Url,
}

impl ResponseFormat {
    /// Wire name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::B64Json => "b64_json",
            ResponseFormat::Url => "url",
        }
    }
}

// Fully resolved request body sent upstream; every field is always
// serialized. The doc comment is the advertised schema description.

/// Generate an image from a text prompt using Together AI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageGenerationRequest {
    /// Model to use for generation (default: black-forest-labs/FLUX.1-schnell-Free)
    #[serde(default = "default_model")]
    pub model: String,

    /// Text prompt describing the image to generate
    #[schemars(length(min = 1))]
    pub prompt: String,

    /// Image width in pixels (default: 1024)
    #[serde(default = "default_width")]
    #[schemars(with = "i64")]
    #[schemars(range(min = 128, max = 2048))]
    pub width: Number,

    /// Image height in pixels (default: 768)
    #[serde(default = "default_height")]
    #[schemars(with = "i64")]
    #[schemars(range(min = 128, max = 2048))]
    pub height: Number,

    /// Number of inference steps (default: 1)
    #[serde(default = "default_steps")]
    #[schemars(with = "i64")]
    #[schemars(range(min = 1, max = 100))]
    pub steps: Number,

    /// Number of images to generate (default: 1)
    #[serde(default = "default_number_of_images")]
    #[schemars(with = "i64")]
    #[schemars(range(min = 1, max = 4))]
    pub n: Number,

    /// Format of the returned images: b64_json or url (default: b64_json)
    #[serde(default = "default_response_format")]
    #[schemars(with = "ResponseFormat")]
    pub response_format: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_width() -> Number {
    Number::from(DEFAULT_WIDTH)
}

fn default_height() -> Number {
    Number::from(DEFAULT_HEIGHT)
}

fn default_steps() -> Number {
    Number::from(DEFAULT_STEPS)
}

fn default_number_of_images() -> Number {
    Number::from(DEFAULT_NUMBER_OF_IMAGES)
}

fn default_response_format() -> String {
    ResponseFormat::default().as_str().to_string()
}

impl ImageGenerationRequest {
    /// A request carrying `prompt` and the default for every other field.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: default_model(),
            prompt: prompt.into(),
            width: default_width(),
            height: default_height(),
            steps: default_steps(),
            n: default_number_of_images(),
            response_format: default_response_format(),
        }
    }
}

// =============================================================================
// Argument policy
// =============================================================================

/// What to do with an optional argument whose JSON type does not match the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MistypedFieldPolicy {
    /// Discard the value and fall back to the default.
    #[default]
    #[value(name = "drop")]
    Drop,
    /// Fail the invocation with an invalid-parameters error naming the field.
    #[value(name = "reject")]
    Reject,
}

/// When a field falls back to its default during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DefaultMergePolicy {
    /// Absent fields and falsy values (`0`, `""`) both take the default.
    #[default]
    #[value(name = "falsy")]
    FalsyAsAbsent,
    /// Only absent (or dropped) fields take the default; `0` is forwarded.
    #[value(name = "absent")]
    AbsentOnly,
}

/// Named policy governing how invocation arguments are parsed and merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArgumentPolicy {
    /// Treatment of optional fields with the wrong JSON type
    pub mistyped: MistypedFieldPolicy,
    /// Treatment of falsy values during the default merge
    pub defaults: DefaultMergePolicy,
}

/// Validation error details for invocation arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Invocation arguments after type checking, before defaults are merged.
///
/// `None` means the field was absent, null, or dropped as mistyped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateImageArgs {
    /// Text prompt (required)
    pub prompt: String,
    /// Model identifier
    pub model: Option<String>,
    /// Image width
    pub width: Option<Number>,
    /// Image height
    pub height: Option<Number>,
    /// Inference steps
    pub steps: Option<Number>,
    /// Number of images
    pub n: Option<Number>,
    /// Response format wire name
    pub response_format: Option<String>,
}

impl GenerateImageArgs {
    /// Type-check the raw arguments object.
    ///
    /// `prompt` must be a non-blank string. Optional fields are carried only
    /// when they have the declared JSON type; anything else is handled per
    /// `policy`. Unknown keys are ignored.
    ///
    /// # Errors
    /// Returns a `ValidationError` naming `prompt` if it is missing, not a
    /// string, or blank, or naming the offending field when `policy` is
    /// `MistypedFieldPolicy::Reject`.
    pub fn parse(arguments: &JsonObject, policy: MistypedFieldPolicy) -> Result<Self, ValidationError> {
        let prompt = match arguments.get("prompt") {
            Some(Value::String(prompt)) => prompt.clone(),
            Some(other) => {
                return Err(ValidationError::new(
                    "prompt",
                    format!("must be a string, got {}", json_type_name(other)),
                ));
            }
            None => return Err(ValidationError::new("prompt", "is required")),
        };

        if prompt.trim().is_empty() {
            return Err(ValidationError::new("prompt", "cannot be empty"));
        }

        Ok(Self {
            prompt,
            model: string_field(arguments, "model", policy)?,
            width: number_field(arguments, "width", policy)?,
            height: number_field(arguments, "height", policy)?,
            steps: number_field(arguments, "steps", policy)?,
            n: number_field(arguments, "n", policy)?,
            response_format: string_field(arguments, "response_format", policy)?,
        })
    }

    /// Merge the parsed arguments with their defaults.
    pub fn resolve(self, policy: DefaultMergePolicy) -> ImageGenerationRequest {
        let keep_string = |value: &String| policy == DefaultMergePolicy::AbsentOnly || !value.is_empty();
        let keep_number = |value: &Number| policy == DefaultMergePolicy::AbsentOnly || value.as_f64() != Some(0.0);

        ImageGenerationRequest {
            model: self.model.filter(keep_string).unwrap_or_else(default_model),
            prompt: self.prompt,
            width: self.width.filter(keep_number).unwrap_or_else(default_width),
            height: self.height.filter(keep_number).unwrap_or_else(default_height),
            steps: self.steps.filter(keep_number).unwrap_or_else(default_steps),
            n: self.n.filter(keep_number).unwrap_or_else(default_number_of_images),
            response_format: self
                .response_format
                .filter(keep_string)
                .unwrap_or_else(default_response_format),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mistyped<T>(field: &str, expected: &str, value: &Value, policy: MistypedFieldPolicy) -> Result<Option<T>, ValidationError> {
    match policy {
        MistypedFieldPolicy::Drop => {
            debug!(field, expected, got = json_type_name(value), "Dropping mistyped argument");
            Ok(None)
        }
        MistypedFieldPolicy::Reject => Err(ValidationError::new(
            field,
            format!("must be {}, got {}", expected, json_type_name(value)),
        )),
    }
}

fn string_field(arguments: &JsonObject, field: &str, policy: MistypedFieldPolicy) -> Result<Option<String>, ValidationError> {
    match arguments.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => mistyped(field, "a string", other, policy),
    }
}

/// Any JSON number is carried as written; the upstream API judges its value.
fn number_field(arguments: &JsonObject, field: &str, policy: MistypedFieldPolicy) -> Result<Option<Number>, ValidationError> {
    match arguments.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(Some(number.clone())),
        Some(other) => mistyped(field, "a number", other, policy),
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Image generation handler.
///
/// Stateless apart from read-only configuration, so one instance can serve
/// any number of concurrent invocations.
pub struct ImageHandler {
    /// Application configuration.
    pub config: Config,
    /// HTTP client for API requests.
    pub http: reqwest::Client,
}

impl ImageHandler {
    /// Create a new ImageHandler with the given configuration.
    pub fn new(config: Config) -> Self {
        debug!("Initializing ImageHandler");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Create a new ImageHandler with a caller-supplied HTTP client.
    pub fn with_client(config: Config, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Get the Together AI images endpoint.
    pub fn endpoint(&self) -> String {
        self.config.images_endpoint()
    }

    /// Send one resolved request upstream.
    ///
    /// # Returns
    /// * `Ok(Value)` - The upstream response body, untouched
    /// * `Err(Error::Api)` - The API answered with a non-success status
    /// * `Err(Error::Transport)` - No usable response was received
    #[instrument(
        level = "info",
        name = "generate_image",
        skip(self, request),
        fields(model = %request.model, width = %request.width, height = %request.height, n = %request.n)
    )]
    pub async fn generate_image(&self, request: &ImageGenerationRequest) -> Result<Value, Error> {
        let endpoint = self.endpoint();
        debug!(endpoint = %endpoint, prompt = %request.prompt, "Calling Together images API");

        let response = self
            .http
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::transport(&endpoint, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(&endpoint, format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = upstream_error_message(&body)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            warn!(status = status.as_u16(), message = %message, "Together images API returned an error");
            return Err(Error::api(&endpoint, status.as_u16(), message));
        }

        let value = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        let count = value
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        info!(count, "Received images from API");

        Ok(value)
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// Accepts `{"message": ...}`, `{"error": {"message": ...}}` and
/// `{"error": "..."}`.
pub fn upstream_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/error/message").and_then(Value::as_str))
        .or_else(|| value.get("error").and_then(Value::as_str))?;

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

// =============================================================================
// Upstream response types
// =============================================================================

/// Typed view of a successful images API response.
///
/// The server forwards the raw body; this type exists for callers that want
/// to inspect it.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResult {
    /// Generation identifier
    pub id: String,
    /// Model that produced the images
    pub model: String,
    /// Object kind reported by the API
    #[serde(default)]
    pub object: Option<String>,
    /// Generated images
    pub data: Vec<GeneratedImage>,
}

/// One generated image entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    /// Position of the image in the batch
    pub index: u32,
    /// Base64-encoded image bytes (when `response_format` is `b64_json`)
    #[serde(default)]
    pub b64_json: Option<String>,
    /// Image URL (when `response_format` is `url`)
    #[serde(default)]
    pub url: Option<String>,
    /// Timing breakdown
    #[serde(default)]
    pub timings: Option<ImageTimings>,
}

/// Timing breakdown for one generated image.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageTimings {
    /// Inference time reported by the API
    pub inference: f64,
}
