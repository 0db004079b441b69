// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Hot-path benchmarks: classification and record construction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use tapline::{classify, CallRecord, ChatRequest, ContentBlock, Message, Role, ToolDefinition};

fn tool_heavy_query() -> serde_json::Value {
    let request = ChatRequest::new(
        "model-x",
        vec![
            Message::user("list the files"),
            Message::with_blocks(
                Role::Assistant,
                vec![ContentBlock::tool_use("t1", "bash", json!({"command": "ls"}))],
            ),
            Message::with_blocks(
                Role::User,
                vec![ContentBlock::tool_result("t1", "README.md src tests", false)],
            ),
        ],
    )
    .with_tools(vec![
        ToolDefinition::new("bash", "Run a command"),
        ToolDefinition::new("read_file", "Read a file"),
    ]);

    serde_json::to_value(&request).unwrap()
}

fn bench_classify(c: &mut Criterion) {
    let query = tool_heavy_query();
    c.bench_function("classify_tool_heavy", |b| {
        b.iter(|| classify(black_box(&query)))
    });

    let plain = json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]});
    c.bench_function("classify_plain", |b| b.iter(|| classify(black_box(&plain))));
}

fn bench_record_build(c: &mut Criterion) {
    let query = tool_heavy_query();
    let response = json!({"content": "ok", "tool_calls": [], "stop_reason": "end_turn"});

    c.bench_function("record_success", |b| {
        b.iter(|| {
            CallRecord::success(black_box(query.clone()), black_box(response.clone()))
        })
    });

    c.bench_function("record_serialize", |b| {
        b.iter(|| {
            let record = CallRecord::success(query.clone(), response.clone());
            serde_json::to_string(black_box(&record)).unwrap()
        })
    });
}

criterion_group!(benches, bench_classify, bench_record_build);
criterion_main!(benches);
