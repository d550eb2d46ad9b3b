//! Together MCP Image Server Library
//!
//! This library exposes Together AI image generation as a single MCP tool,
//! `generate_image`.

pub mod handler;
pub mod registry;
pub mod server;

pub use handler::{
    ArgumentPolicy, DefaultMergePolicy, GenerateImageArgs, ImageGenerationRequest, ImageGenerationResult,
    ImageHandler, MistypedFieldPolicy,
};
pub use server::ImageServer;
