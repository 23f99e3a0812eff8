use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use grafter_cli::{execute, Options};
use grafter_core::{init_tracing, ConversionMode, GrafterConfig, COMMON_LANGUAGE};

fn main() -> Result<()> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let matches = Command::new("grafter")
        .version(grafter_core::VERSION)
        .about("Applies Grafter transformation rules to a syntax tree")
        .arg(
            Arg::new("program")
                .long("program")
                .value_name("FILE")
                .help("JSON-serialized rule program")
                .required(true),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .value_name("FILE")
                .help("Input tree: JSON document or draft notation")
                .required(true),
        )
        .arg(
            Arg::new("language")
                .long("language")
                .value_name("NAME")
                .help("Language whose rules and types are used")
                .default_value(COMMON_LANGUAGE),
        )
        .arg(
            Arg::new("select")
                .long("select")
                .value_name("K")
                .help("Apply the first rule to its K-th (zero-based) conversion only")
                .value_parser(clap::value_parser!(usize))
                .conflicts_with("count"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .help("Count the nodes the first rule converts")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("draft")
                .long("draft")
                .help("Print the result in the draft notation")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write the result to a file instead of stdout"),
        )
        .arg(
            Arg::new("depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum depth of the input tree")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Print conversion statistics to stderr")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let mode = if let Some(&index) = matches.get_one::<usize>("select") {
        ConversionMode::Select(index)
    } else if matches.get_flag("count") {
        ConversionMode::Count
    } else {
        ConversionMode::Convert
    };
    let defaults = GrafterConfig::default();
    let config = GrafterConfig {
        language: matches
            .get_one::<String>("language")
            .cloned()
            .unwrap_or(defaults.language),
        mode,
        draft_output: matches.get_flag("draft"),
        max_tree_depth: matches
            .get_one::<usize>("depth")
            .copied()
            .unwrap_or(defaults.max_tree_depth),
    };
    let options = Options {
        program: matches
            .get_one::<String>("program")
            .map(PathBuf::from)
            .context("--program is required")?,
        tree: matches
            .get_one::<String>("tree")
            .map(PathBuf::from)
            .context("--tree is required")?,
        config,
    };

    let report = execute(&options)?;

    if matches.get_flag("debug") {
        if let Some(summary) = &report.summary {
            eprintln!("{}", serde_json::to_string_pretty(summary)?);
        }
    }

    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, &report.output)
            .with_context(|| format!("Failed to write output to {}", path))?,
        None => print!("{}", report.output),
    }
    Ok(())
}
