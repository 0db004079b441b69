// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anthropic integration demo.
//!
//! Requires ANTHROPIC_API_KEY. Run with:
//!
//! ```bash
//! cargo run --example anthropic_demo
//! ```

use tapline::telemetry::{init_diagnostics, DiagnosticsConfig};
use tapline::{adapters, AnthropicClient, ChatRequest, Message, Settings};

#[tokio::main]
async fn main() -> tapline::Result<()> {
    let _guard = init_diagnostics(&DiagnosticsConfig::default())?;

    // Resolve settings from the environment; default to stderr records.
    let sink = tapline::init(&Settings::from_env()?)?;

    println!("Anthropic Integration Demo\n");

    let mut client = AnthropicClient::from_env()?;
    let report = adapters::anthropic::instrument(&mut client, sink);
    eprintln!("{report}");

    println!("Making request to Claude...");
    let request = ChatRequest::new(
        "claude-sonnet-4-20250514",
        vec![Message::user(
            "Hello, Claude! What are three interesting applications of machine learning in healthcare?",
        )],
    )
    .with_max_tokens(150);

    let response = client.create_message(request).await?;

    println!("\nResponse from Claude:");
    println!("{}", response.content);

    println!("\nAll interactions above have been recorded via tapline!");
    Ok(())
}
