//! INSERT, UPDATE and DELETE generation.

use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{Binding, SetClause, Value};
use crate::error::XlateError;

fn target() -> Binding {
    posts().bind("Target")
}

fn column(target: &Binding, name: &str) -> Expr {
    target.var_ref().prop(name)
}

fn inline_constants() -> TranslatorConfig {
    TranslatorConfig {
        parameterize_dml_constants: false,
        ..TranslatorConfig::default()
    }
}

#[test]
fn test_insert_lifts_constants_and_returns_columns() {
    let target = target();
    let clauses = vec![
        SetClause::new(column(&target, "BlogId"), constant(7)),
        SetClause::new(column(&target, "Title"), constant("hello")),
    ];
    let returning = row(vec![("Id", column(&target, "Id"))]);

    let command = run(
        CommandTree::insert(target, clauses, Some(returning)),
        &TranslatorConfig::default(),
    );
    assert_eq!(
        command.text,
        "INSERT INTO \"dbo\".\"Posts\" (\"BlogId\", \"Title\") VALUES (@p_0, @p_1) RETURNING \"Id\""
    );
    let values: Vec<_> = command
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.value.clone()))
        .collect();
    assert_eq!(
        values,
        vec![
            ("p_0", Some(Value::Int32(7))),
            ("p_1", Some(Value::String("hello".into()))),
        ]
    );
    let names: Vec<_> = command.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Id"]);
}

#[test]
fn test_insert_without_values() {
    let command = run(CommandTree::insert(target(), vec![], None), &TranslatorConfig::default());
    assert_eq!(command.text, "INSERT INTO \"dbo\".\"Posts\" DEFAULT VALUES");
    assert!(command.parameters.is_empty());
    assert!(command.columns.is_empty());
}

#[test]
fn test_null_is_untyped_in_dml() {
    let target = target();
    let clauses = vec![SetClause::new(column(&target, "Title"), null(PrimitiveKind::String))];
    let command = run(CommandTree::insert(target, clauses, None), &inline_constants());
    assert_eq!(command.text, "INSERT INTO \"dbo\".\"Posts\" (\"Title\") VALUES (NULL)");
}

#[test]
fn test_update_with_predicate() {
    let target = target();
    let clauses = vec![
        SetClause::new(column(&target, "Title"), constant("x")),
        SetClause::new(
            column(&target, "BlogId"),
            add(column(&target, "BlogId"), constant(1)),
        ),
    ];
    let predicate = eq(column(&target, "Id"), constant(5));

    let command = run(
        CommandTree::update(target, clauses, Some(predicate), None),
        &inline_constants(),
    );
    assert_eq!(
        command.text,
        "UPDATE \"dbo\".\"Posts\" SET \"Title\" = E'x', \"BlogId\" = \"BlogId\" + 1 WHERE \"Id\" = 5"
    );
}

#[test]
fn test_update_without_set_clauses_is_unsupported() {
    let err = translate(
        &CommandTree::update(target(), vec![], None, None),
        &TranslatorConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, XlateError::Unsupported(_)));
}

#[test]
fn test_delete_puts_declared_parameters_first() {
    let target = target();
    let predicate = and(
        eq(column(&target, "BlogId"), param("blog", PrimitiveKind::Int32)),
        eq(column(&target, "Title"), constant("x")),
    );
    let tree = CommandTree::delete(target, Some(predicate)).with_parameter("blog", ty(PrimitiveKind::Int32));

    let command = run(tree, &TranslatorConfig::default());
    assert_eq!(
        command.text,
        "DELETE FROM \"dbo\".\"Posts\" WHERE \"BlogId\" = @blog AND \"Title\" = @p_0"
    );
    let names: Vec<_> = command.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["blog", "p_0"]);
    assert!(command.columns.is_empty());
}

#[test]
fn test_delete_everything() {
    let command = run(CommandTree::delete(target(), None), &TranslatorConfig::default());
    assert_eq!(command.text, "DELETE FROM \"dbo\".\"Posts\"");
}

#[test]
fn test_reference_to_other_variable_is_invalid() {
    let target = target();
    let other = posts().bind("Other");
    let predicate = eq(column(&other, "Id"), constant(1));

    let err = translate(
        &CommandTree::delete(target, Some(predicate)),
        &TranslatorConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, XlateError::InvalidBinding { .. }));
}

#[test]
fn test_target_must_be_a_table() {
    let input = posts().bind("Extent1");
    let predicate = gt(input.var_ref().prop("Id"), constant(1));
    let target = filter(input, predicate).bind("Target");

    let err = translate(&CommandTree::delete(target, None), &TranslatorConfig::default()).unwrap_err();
    assert!(matches!(err, XlateError::Unsupported(_)));
}
