// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI integration demo using the async call kind.
//!
//! Requires OPENAI_API_KEY. Run with:
//!
//! ```bash
//! cargo run --example openai_async_demo
//! ```

use tapline::telemetry::{init_diagnostics, DiagnosticsConfig};
use tapline::{adapters, ChatRequest, Message, OpenAiClient, Settings};

#[tokio::main]
async fn main() -> tapline::Result<()> {
    let _guard = init_diagnostics(&DiagnosticsConfig::default())?;

    let sink = tapline::init(&Settings::from_env()?)?;

    println!("OpenAI Async Integration Demo\n");

    let mut client = OpenAiClient::from_env()?;
    let report = adapters::openai::instrument(&mut client, sink);
    eprintln!("{report}");

    println!("Making async request to GPT...");
    let request = ChatRequest::new(
        "gpt-4o-mini",
        vec![Message::user(
            "Hello, async GPT! What are three emerging trends in data science?",
        )],
    )
    .with_max_tokens(150);

    let response = client.create_chat_completion(request).await?;

    println!("\nAsync Response from GPT:");
    println!("{}", response.content);

    println!("\nAll interactions above have been recorded via tapline!");
    Ok(())
}
