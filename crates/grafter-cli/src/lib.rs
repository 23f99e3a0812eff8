//! Driver behind the `grafter` command: loads a serialized rule program and a
//! tree, runs the interpreter and renders the result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use grafter_core::{
    prepare, write_tree, ConversionSummary, GrafterConfig, NodeRef, Outcome, Program,
};
use tracing::info;

/// Everything one invocation needs.
#[derive(Debug, Clone)]
pub struct Options {
    /// JSON-serialized rule program
    pub program: PathBuf,
    /// Input tree, as a JSON document or in the draft notation
    pub tree: PathBuf,
    pub config: GrafterConfig,
}

/// Rendered result of one invocation.
#[derive(Debug, Clone)]
pub struct Report {
    pub output: String,
    pub summary: Option<ConversionSummary>,
}

pub fn load_program(path: &Path) -> Result<Program> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid program {}", path.display()))
}

pub fn execute(options: &Options) -> Result<Report> {
    let program = load_program(&options.program)?;
    let interpreter = prepare(&program, &options.config)?;

    let text = fs::read_to_string(&options.tree)
        .with_context(|| format!("Failed to read tree {}", options.tree.display()))?;
    let tree = interpreter.load_tree(&text, options.config.max_tree_depth)?;
    info!(language = interpreter.language(), "running rules");

    match interpreter.run(&tree, options.config.mode) {
        Outcome::Converted(conversion) | Outcome::Selected(Some(conversion)) => Ok(Report {
            output: render(&conversion.root, options.config.draft_output)?,
            summary: Some(conversion.summary),
        }),
        Outcome::Selected(None) => bail!("The first rule has no conversion at the selected position"),
        Outcome::Counted(count) => Ok(Report {
            output: format!("{}\n", count),
            summary: None,
        }),
    }
}

fn render(root: &NodeRef, draft: bool) -> Result<String> {
    if draft {
        Ok(format!("{}\n", root))
    } else {
        Ok(write_tree(root)? + "\n")
    }
}
