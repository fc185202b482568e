//! CLI tool to parse behavior tree files and output preview JSON
//!
//! Usage: cargo run --bin tree_to_json <file.tree>

use btree_lang::{parse, ErrorReporter};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <file.tree>", args[0]);
        eprintln!("  Parses a behavior tree file and outputs its wire JSON to stdout");
        process::exit(1);
    }

    let filename = &args[1];

    let source = match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };

    let tree = parse(&source);

    if let Some(message) = tree.error() {
        let reporter = ErrorReporter::new(filename, &source);
        reporter.report_parse_error(message, tree.error_line().unwrap_or(1));
        process::exit(1);
    }

    match serde_json::to_string_pretty(&tree.to_wire()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing tree to JSON: {}", e);
            process::exit(1);
        }
    }
}
