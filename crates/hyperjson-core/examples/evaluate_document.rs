//! Evaluate a JSON-shaped HyperJSON document and print the result.
//!
//! Usage: cargo run -p hyperjson-core --example evaluate_document -- [doc.json]
//!
//! Without a path a built-in document is evaluated.

use hyperjson_core::Engine;
use serde_json::json;
use std::env;
use std::fs;
use std::process;

fn demo() -> serde_json::Value {
    json!({"tag": "record", "children": [
        {"tag": "string", "attributes": {"_key": "title"}, "children": [
            {"tag": "string", "children": ["Hello {{name}}"]},
            {"tag": "populate", "children": [
                {"tag": "string", "attributes": {"_key": "name"}, "children": ["world"]}
            ]}
        ]},
        {"tag": "array", "attributes": {"_key": "scores"}, "children": [
            {"tag": "number", "children": ["3"]},
            {"tag": "number", "children": ["1"]},
            {"tag": "map", "children": [
                {"tag": "method", "children": [
                    {"tag": "add", "children": [{"tag": "number", "children": ["10"]}]}
                ]}
            ]}
        ]},
        {"tag": "ref", "attributes": {"_key": "again"}, "children": ["/scores"]}
    ]})
}

fn main() {
    let doc = match env::args().nth(1) {
        Some(path) => {
            let src = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("read {}: {}", path, e);
                process::exit(1);
            });
            serde_json::from_str(&src).unwrap_or_else(|e| {
                eprintln!("parse {}: {}", path, e);
                process::exit(1);
            })
        }
        None => demo(),
    };

    let engine = Engine::new();
    let root = engine.check(&doc).unwrap_or_else(|e| {
        eprintln!("document: {}", e);
        process::exit(1);
    });
    let mut tree = engine.tree(&root);
    let value = tree.evaluate().unwrap_or_else(|e| {
        eprintln!("evaluate: {} ({})", e, e.code());
        process::exit(1);
    });
    let rendered = serde_json::to_string_pretty(&value.to_json()).unwrap_or_default();
    println!("value: {}", rendered);
    if let Some(perf) = tree.perf(tree.root()) {
        println!("root: {} evaluation(s) in {:?}", perf.evaluations, perf.elapsed);
    }
}
