/*!
# Conversion Integration Tests

End-to-end runs of analysis, matching, building and adaptation.
*/

use std::sync::Arc;

use anyhow::Context;
use grafter_core::model::{AbstractNode, ChildSlot, ListNode, LiteralNode, RegularNode};
use grafter_core::tree::draft::parse_tree;
use grafter_core::{
    prepare, Adapter, ConversionMode, Converter, Creator, Data, Descriptor, DescriptorCreator,
    DescriptorMatcher, DraftFactory, DraftNode, Environment, GrafterConfig, Hole, Interpreter,
    Matcher, Program, ProgramAnalyzer, ProgramFactory, Transformation, COMMON_LANGUAGE,
};
use pretty_assertions::assert_eq;

fn arithmetic() -> Program {
    let mut program = Program::new();
    program
        .add_vertex(
            COMMON_LANGUAGE,
            AbstractNode::new("Expression", ["Addition", "Sum", "Negation", "IntegerLiteral", "Name"]),
        )
        .add_vertex(
            COMMON_LANGUAGE,
            RegularNode::new(
                "Addition",
                vec![
                    ChildSlot::mandatory("Expression").with_tag("left"),
                    ChildSlot::mandatory("Expression").with_tag("right"),
                ],
            ),
        )
        .add_vertex(
            COMMON_LANGUAGE,
            RegularNode::new(
                "Sum",
                vec![ChildSlot::mandatory("Expression"), ChildSlot::mandatory("Expression")],
            ),
        )
        .add_vertex(
            COMMON_LANGUAGE,
            RegularNode::new("Negation", vec![ChildSlot::mandatory("Expression")]),
        )
        .add_vertex(
            COMMON_LANGUAGE,
            LiteralNode::new("IntegerLiteral", "int", "String.valueOf(#)", "Integer.parseInt(#)")
                .with_exception("NumberFormatException"),
        )
        .add_vertex(COMMON_LANGUAGE, LiteralNode::new("Name", "String", "#", "#"))
        .add_vertex(COMMON_LANGUAGE, ListNode::new("Block", "Expression"))
        .add_transformation(
            COMMON_LANGUAGE,
            Transformation::new(
                Descriptor::new("Addition").hole(1).hole(2),
                Descriptor::new("Sum").hole(1).hole(2),
            ),
        );
    program
}

#[test]
fn test_addition_becomes_sum() -> anyhow::Result<()> {
    let adapter = Adapter::new(Arc::new(DraftFactory::new())).with_converter(
        Converter::from_transformation(&Transformation::new(
            Descriptor::new("Addition").hole(1).hole(2),
            Descriptor::new("Sum").hole(1).hole(2),
        )),
    );
    let tree = DraftNode::parse("Addition(X, Y)")?;
    assert_eq!(adapter.convert(&tree).to_string(), "Sum(X, Y)");
    Ok(())
}

#[test]
fn test_nested_additions_typed() -> anyhow::Result<()> {
    let program = arithmetic();
    let interpreter = prepare(&program, &GrafterConfig::default())?;
    let tree = interpreter.load_tree(
        r#"Block(Addition(Addition(IntegerLiteral<"1">, Name<"x">), Negation(Addition(Name<"y">, Name<"z">))))"#,
        16,
    )?;
    let outcome = interpreter.run(&tree, ConversionMode::Convert);
    let converted = outcome.tree().context("conversion produced no tree")?;
    assert_eq!(
        converted.to_string(),
        r#"Block(Sum(Sum(IntegerLiteral<"1">, Name<"x">), Negation(Sum(Name<"y">, Name<"z">))))"#
    );
    Ok(())
}

#[test]
fn test_rejected_substitution_keeps_parent() -> anyhow::Result<()> {
    let mut program = arithmetic();
    program
        .add_vertex("java", RegularNode::new("Wrapper", vec![ChildSlot::mandatory("Negation")]))
        .add_vertex("java", RegularNode::new("Minus", vec![ChildSlot::mandatory("Expression")]))
        .add_transformation(
            "java",
            Transformation::new(Descriptor::new("Negation").hole(1), Descriptor::new("Minus").hole(1)),
        );
    let analyzed = ProgramAnalyzer::new(&program).analyze()?;
    let java = analyzed.language("java").context("java view")?;
    let interpreter = Interpreter::new(java);
    let tree = interpreter.load_tree(r#"Wrapper(Negation(Name<"a">))"#, 8)?;

    let grafter_core::Outcome::Converted(conversion) = interpreter.run(&tree, ConversionMode::Convert) else {
        anyhow::bail!("expected a full conversion");
    };
    assert_eq!(conversion.root.to_string(), r#"Wrapper(Negation(Name<"a">))"#);
    assert_eq!(conversion.summary.rejected_substitutions, 1);
    assert_eq!(conversion.summary.replacements, 1);
    Ok(())
}

#[test]
fn test_builder_rejection_is_no_result() -> anyhow::Result<()> {
    let program = arithmetic();
    let analyzed = ProgramAnalyzer::new(&program).analyze()?;
    let factory = ProgramFactory::new(analyzed.common().context("common view")?);

    let mut env = Environment::new();
    env.bind_children(1, vec![parse_tree(r#"Name<"a">"#, &factory)?]);
    let creator = DescriptorCreator::new(Descriptor::new("Sum").hole(1));
    assert!(creator.create(&env, &factory).is_none());

    let creator = DescriptorCreator::new(Descriptor::new("Expression").hole(1));
    assert!(creator.create(&env, &factory).is_none());

    let creator = DescriptorCreator::new(
        Descriptor::new("IntegerLiteral").with_data(Data::literal("7")),
    );
    let node = creator.create(&env, &factory).context("literal built")?;
    assert_eq!(node.data(), "7");
    Ok(())
}

#[test]
fn test_static_round_trip() -> anyhow::Result<()> {
    let program = arithmetic();
    let analyzed = ProgramAnalyzer::new(&program).analyze()?;
    let factory = ProgramFactory::new(analyzed.common().context("common view")?);
    let descriptor = Descriptor::new("Addition")
        .param(Descriptor::new("IntegerLiteral").with_data(Data::literal("1")))
        .param(Descriptor::new("Negation").param(Descriptor::new("Name").with_data(Data::literal("n"))));

    let node = DescriptorCreator::new(descriptor.clone())
        .create(&Environment::new(), &factory)
        .context("static descriptor built")?;
    let mut env = Environment::new();
    assert!(DescriptorMatcher::new(descriptor).match_node(&node, &mut env));
    assert!(env.is_empty());
    Ok(())
}

#[test]
fn test_ellipsis_and_typed_holes_end_to_end() -> anyhow::Result<()> {
    let adapter = Adapter::new(Arc::new(DraftFactory::new()))
        .with_converter(Converter::from_transformation(&Transformation::new(
            Descriptor::new("Call").typed_hole(1, "Name"),
            Descriptor::new("Names").hole(1),
        )))
        .with_converter(Converter::from_transformation(&Transformation::new(
            Descriptor::new("Block").ellipsis(1),
            Descriptor::new("Sequence").hole(1),
        )));
    let tree = DraftNode::parse(r#"Block(Call(Name<"a">, Name<"b">, Literal<"1">), Block)"#)?;
    assert_eq!(
        adapter.convert(&tree).to_string(),
        r#"Sequence(Names(Name<"a">, Name<"b">), Sequence)"#
    );
    Ok(())
}

#[test]
fn test_whole_hole_unwraps_parentheses() -> anyhow::Result<()> {
    let adapter = Adapter::new(Arc::new(DraftFactory::new())).with_converter(
        Converter::from_transformation(&Transformation::new(
            Descriptor::new("Parenthesized").hole(1),
            Hole::single(1),
        )),
    );
    let tree = DraftNode::parse("Parenthesized(Parenthesized(Parenthesized(x)))")?;
    assert_eq!(adapter.convert(&tree).to_string(), "x");
    Ok(())
}

#[test]
fn test_data_holes_carry_literals() -> anyhow::Result<()> {
    let rule = Transformation::new(
        Descriptor::new("Name").with_data(Data::Hole(1)),
        Descriptor::new("Identifier").with_data(Data::Hole(1)),
    );
    let matcher = DescriptorMatcher::new(rule.left.clone());
    let mut env = Environment::new();
    assert!(matcher.match_node(&DraftNode::parse(r#"Name<"count">"#)?, &mut env));
    let node = DescriptorCreator::new(rule.right)
        .create(&env, &DraftFactory::new())
        .context("identifier built")?;
    assert_eq!(node.to_string(), r#"Identifier<"count">"#);
    Ok(())
}

#[test]
fn test_select_and_count_modes() -> anyhow::Result<()> {
    let program = arithmetic();
    let interpreter = prepare(&program, &GrafterConfig::default())?;
    let tree = interpreter.load_tree(
        r#"Block(Addition(Name<"a">, Name<"b">), Addition(Name<"c">, Name<"d">))"#,
        8,
    )?;
    assert!(matches!(
        interpreter.run(&tree, ConversionMode::Count),
        grafter_core::Outcome::Counted(2)
    ));
    let selected = interpreter.run(&tree, ConversionMode::Select(1));
    assert_eq!(
        selected.tree().context("second conversion")?.to_string(),
        r#"Block(Addition(Name<"a">, Name<"b">), Sum(Name<"c">, Name<"d">))"#
    );
    Ok(())
}

#[test]
fn test_unknown_language_is_config_error() {
    let program = arithmetic();
    let config = GrafterConfig {
        language: "cobol".to_string(),
        ..GrafterConfig::default()
    };
    assert!(matches!(
        prepare(&program, &config),
        Err(grafter_core::GrafterError::Config(_))
    ));
}

#[test]
fn test_program_survives_json() -> anyhow::Result<()> {
    let program = arithmetic();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rules.json");
    std::fs::write(&path, serde_json::to_string_pretty(&program)?)?;

    let loaded: Program = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(loaded, program);
    assert_eq!(loaded.to_string(), program.to_string());
    Ok(())
}
