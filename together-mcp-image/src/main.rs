//! Together MCP Image Server
//!
//! MCP server for image generation using the Together AI images API.

use anyhow::Result;
use clap::Parser;
use together_mcp_common::tracing::init_tracing;
use together_mcp_common::{Config, McpServerBuilder, TransportArgs};
use together_mcp_image::{ArgumentPolicy, DefaultMergePolicy, ImageServer, MistypedFieldPolicy};

/// Command-line arguments for the image server.
#[derive(Parser, Debug)]
#[command(name = "together-mcp-image")]
#[command(about = "MCP server for image generation using the Together AI images API")]
struct Args {
    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,

    /// How to treat optional arguments of the wrong JSON type
    #[arg(long, value_enum, env = "MISTYPED_FIELDS", default_value = "drop")]
    mistyped_fields: MistypedFieldPolicy,

    /// When optional arguments fall back to their defaults
    #[arg(long, value_enum, env = "DEFAULT_MERGE", default_value = "falsy")]
    default_merge: DefaultMergePolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("together-mcp-image server starting...");

    // Parse command-line arguments
    let args = Args::parse();

    // A missing API key stops the server before it accepts any invocation
    let config = Config::from_env()?;
    tracing::info!(endpoint = %config.images_endpoint(), "Configuration loaded");

    let policy = ArgumentPolicy {
        mistyped: args.mistyped_fields,
        defaults: args.default_merge,
    };
    tracing::info!(?policy, "Argument policy");

    let server = ImageServer::new(config).with_policy(policy);

    let transport = args.transport.into_transport();
    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
