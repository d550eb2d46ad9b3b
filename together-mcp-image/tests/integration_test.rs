//! Integration tests for together-mcp-image server.
//!
//! These tests call the real Together AI images API and require:
//! - TOGETHER_API_KEY environment variable set (a `.env` file is honored)
//!
//! Run with: `cargo test --package together-mcp-image --test integration_test`
//!
//! To skip integration tests in CI, set SKIP_INTEGRATION_TESTS or leave
//! TOGETHER_API_KEY unset.
//!
//! Generated images are saved to `./test_output/` directory for inspection.

use serde_json::{Value, json};
use std::env;
use std::path::PathBuf;
use std::sync::Once;
use together_mcp_common::config::Config;
use together_mcp_image::handler::{ImageGenerationRequest, JsonObject};
use together_mcp_image::{ImageGenerationResult, ImageHandler, ImageServer};

static INIT: Once = Once::new();

/// Output directory for test-generated images
const TEST_OUTPUT_DIR: &str = "test_output";

/// Initialize environment from .env file once
fn init_env() {
    INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

/// Get or create the test output directory
fn get_test_output_dir() -> PathBuf {
    let dir = PathBuf::from(TEST_OUTPUT_DIR);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).expect("Failed to create test output directory");
    }
    dir
}

/// Helper to get test configuration from environment.
fn get_test_config() -> Option<Config> {
    init_env();
    Config::from_env().ok()
}

/// Check if integration tests should run.
fn should_run_integration_tests() -> bool {
    if env::var("SKIP_INTEGRATION_TESTS").is_ok() {
        return false;
    }
    get_test_config().is_some()
}

/// Macro to skip test if integration tests are disabled.
macro_rules! skip_if_no_integration {
    () => {
        if !should_run_integration_tests() {
            eprintln!("Skipping integration test: TOGETHER_API_KEY not set");
            return;
        }
    };
}

/// Decode and save base64 images to the test output directory.
fn save_test_images(result: &ImageGenerationResult, prefix: &str) {
    let output_dir = get_test_output_dir();
    for image in &result.data {
        let Some(data) = &image.b64_json else { continue };
        let filename = if result.data.len() == 1 {
            format!("{}.png", prefix)
        } else {
            format!("{}_{}.png", prefix, image.index)
        };
        let path = output_dir.join(&filename);

        match base64::Engine::decode(&base64::engine::general_purpose::STANDARD, data) {
            Ok(bytes) => match std::fs::write(&path, &bytes) {
                Ok(()) => eprintln!("Saved: {}", path.display()),
                Err(e) => eprintln!("Failed to save {}: {}", filename, e),
            },
            Err(e) => eprintln!("Invalid base64 for {}: {}", filename, e),
        }
    }
}

mod together_api_tests {
    use super::*;

    /// Prompt-only generation through the handler, using every default.
    #[tokio::test]
    async fn test_generate_image_basic() {
        skip_if_no_integration!();

        let handler = ImageHandler::new(get_test_config().unwrap());
        let request = ImageGenerationRequest::new("A simple red circle on a white background");

        let body = handler
            .generate_image(&request)
            .await
            .unwrap_or_else(|e| panic!("Image generation failed: {}", e));

        let result: ImageGenerationResult =
            serde_json::from_value(body).expect("Response should match the images schema");
        assert_eq!(result.data.len(), 1, "Should generate exactly 1 image");

        let encoded = result.data[0].b64_json.as_deref().expect("Should return base64 data");
        let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .expect("Should be valid base64 data");
        assert!(bytes.len() > 8, "Image should have reasonable size");

        save_test_images(&result, "basic_red_circle");
    }

    /// Multiple images in one request.
    #[tokio::test]
    async fn test_generate_multiple_images() {
        skip_if_no_integration!();

        let handler = ImageHandler::new(get_test_config().unwrap());
        let request = ImageGenerationRequest {
            width: 512_i64.into(),
            height: 512_i64.into(),
            n: 2_i64.into(),
            ..ImageGenerationRequest::new("A blue square")
        };

        let body = handler.generate_image(&request).await.expect("Generation should succeed");
        let result: ImageGenerationResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.data.len(), 2, "Should generate exactly 2 images");

        save_test_images(&result, "multiple_blue_square");
    }

    /// URL output instead of inline bytes.
    #[tokio::test]
    async fn test_generate_image_as_url() {
        skip_if_no_integration!();

        let handler = ImageHandler::new(get_test_config().unwrap());
        let request = ImageGenerationRequest {
            response_format: "url".to_string(),
            ..ImageGenerationRequest::new("A landscape with mountains and a sunset")
        };

        let body = handler.generate_image(&request).await.expect("Generation should succeed");
        let result: ImageGenerationResult = serde_json::from_value(body).unwrap();
        let url = result.data[0].url.as_deref().expect("Should return a URL");
        assert!(url.starts_with("http"), "URL should be absolute: {}", url);
        eprintln!("Generated: {}", url);
    }
}

mod tool_tests {
    use super::*;

    fn arguments(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    /// Full tool invocation; the text content is the upstream JSON.
    #[tokio::test]
    async fn test_tool_invocation_returns_json_text() {
        skip_if_no_integration!();

        let server = ImageServer::new(get_test_config().unwrap());
        let result = server
            .invoke("generate_image", arguments(json!({"prompt": "A cat", "width": 512, "height": 512})))
            .await
            .expect("Invocation should not fault");
        assert_ne!(result.is_error, Some(true));

        let wire = serde_json::to_value(&result).unwrap();
        let text = wire["content"][0]["text"].as_str().expect("Should return text content");
        let parsed: ImageGenerationResult = serde_json::from_str(text).expect("Text should be the API JSON");
        save_test_images(&parsed, "tool_cat");
    }

    /// A bogus key is reported as an API error result, not a fault.
    #[tokio::test]
    async fn test_rejected_key_is_api_error() {
        skip_if_no_integration!();

        let config = get_test_config().unwrap();
        let bogus = Config::new("not-a-real-key").with_api_base_url(config.api_base_url);
        let result = ImageServer::new(bogus)
            .invoke("generate_image", arguments(json!({"prompt": "A cat"})))
            .await
            .expect("Upstream rejection should not fault");

        assert_eq!(result.is_error, Some(true));
        let wire = serde_json::to_value(&result).unwrap();
        let text = wire["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("API Error: "), "unexpected text: {}", text);
    }
}
