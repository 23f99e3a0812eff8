/*!
# CLI Integration Tests

Runs the driver against programs and trees written to temporary files.
*/

use std::fs;
use std::path::PathBuf;

use grafter_cli::{execute, load_program, Options};
use grafter_core::model::{AbstractNode, ChildSlot, LiteralNode, RegularNode};
use grafter_core::{
    ConversionMode, Descriptor, GrafterConfig, Program, Transformation, COMMON_LANGUAGE,
};
use tempfile::TempDir;

fn program() -> Program {
    let mut program = Program::new();
    program
        .add_vertex(
            COMMON_LANGUAGE,
            AbstractNode::new("Expression", ["Addition", "Sum", "Name"]),
        )
        .add_vertex(
            COMMON_LANGUAGE,
            RegularNode::new(
                "Addition",
                vec![ChildSlot::mandatory("Expression"), ChildSlot::mandatory("Expression")],
            ),
        )
        .add_vertex(
            COMMON_LANGUAGE,
            RegularNode::new(
                "Sum",
                vec![ChildSlot::mandatory("Expression"), ChildSlot::mandatory("Expression")],
            ),
        )
        .add_vertex(COMMON_LANGUAGE, LiteralNode::new("Name", "String", "#", "#"))
        .add_transformation(
            COMMON_LANGUAGE,
            Transformation::new(
                Descriptor::new("Addition").hole(1).hole(2),
                Descriptor::new("Sum").hole(1).hole(2),
            ),
        );
    program
}

const TREE: &str = r#"{
    "root": {
        "type": "Addition",
        "children": [
            {"type": "Addition", "children": [{"type": "Name", "data": "a"}, {"type": "Name", "data": "b"}]},
            {"type": "Name", "data": "c"}
        ]
    }
}"#;

fn setup(tree: &str) -> anyhow::Result<(TempDir, Options)> {
    let dir = tempfile::tempdir()?;
    let program_path = dir.path().join("rules.json");
    let tree_path = dir.path().join("tree.json");
    fs::write(&program_path, serde_json::to_string(&program())?)?;
    fs::write(&tree_path, tree)?;
    let options = Options {
        program: program_path,
        tree: tree_path,
        config: GrafterConfig::default(),
    };
    Ok((dir, options))
}

#[test]
fn test_convert_to_json() -> anyhow::Result<()> {
    let (_dir, options) = setup(TREE)?;
    let report = execute(&options)?;
    let value: serde_json::Value = serde_json::from_str(&report.output)?;
    assert_eq!(value["root"]["type"], "Sum");
    assert_eq!(value["root"]["children"][0]["type"], "Sum");
    assert_eq!(value["root"]["children"][1]["data"], "c");
    let summary = report.summary.expect("full conversion has a summary");
    assert_eq!(summary.replacements, 2);
    Ok(())
}

#[test]
fn test_draft_output_and_draft_input() -> anyhow::Result<()> {
    let (_dir, mut options) = setup(r#"Addition(Name<"x">, Name<"y">)"#)?;
    options.config.draft_output = true;
    let report = execute(&options)?;
    assert_eq!(report.output, "Sum(Name<\"x\">, Name<\"y\">)\n");
    Ok(())
}

#[test]
fn test_count_and_select() -> anyhow::Result<()> {
    let (_dir, mut options) = setup(TREE)?;
    options.config.mode = ConversionMode::Count;
    assert_eq!(execute(&options)?.output, "2\n");

    options.config.mode = ConversionMode::Select(0);
    options.config.draft_output = true;
    assert_eq!(
        execute(&options)?.output,
        "Addition(Sum(Name<\"a\">, Name<\"b\">), Name<\"c\">)\n"
    );

    options.config.mode = ConversionMode::Select(2);
    assert!(execute(&options).is_err());
    Ok(())
}

#[test]
fn test_errors_are_reported() -> anyhow::Result<()> {
    let (dir, mut options) = setup(TREE)?;
    options.config.language = "rust".to_string();
    let error = execute(&options).unwrap_err();
    assert!(error.to_string().contains("Language 'rust' is not declared"));

    options.config.language = COMMON_LANGUAGE.to_string();
    options.config.max_tree_depth = 2;
    assert!(execute(&options).is_err());

    options.tree = dir.path().join("missing.json");
    let error = execute(&options).unwrap_err();
    assert!(error.to_string().contains("Failed to read tree"));
    Ok(())
}

#[test]
fn test_load_program_rejects_garbage() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path: PathBuf = dir.path().join("rules.json");
    fs::write(&path, "{\"statements\": 3}")?;
    assert!(load_program(&path).is_err());
    Ok(())
}
