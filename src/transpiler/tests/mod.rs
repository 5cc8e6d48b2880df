//! Translator tests: whole command trees in, SQL text out.

mod dml;

use crate::ast::builders::*;
use crate::ast::{CommandTree, Expr, PrimitiveKind};
use crate::config::TranslatorConfig;
use crate::transpiler::{Command, translate};

pub(super) fn blogs() -> Expr {
    scan("dbo", "Blogs")
        .with_column("Id", PrimitiveKind::Int32)
        .with_column("Name", PrimitiveKind::String)
        .with_column("Rating", PrimitiveKind::Int32)
}

pub(super) fn posts() -> Expr {
    scan("dbo", "Posts")
        .with_column("Id", PrimitiveKind::Int32)
        .with_column("BlogId", PrimitiveKind::Int32)
        .with_column("Title", PrimitiveKind::String)
}

pub(super) fn tags() -> Expr {
    scan("dbo", "Tags").with_column("Label", PrimitiveKind::String)
}

pub(super) fn items() -> Expr {
    scan("dbo", "Items")
        .with_column("Name", PrimitiveKind::String)
        .with_column("Rating", PrimitiveKind::Int32)
        .with_column("Start", PrimitiveKind::DateTime)
        .with_column("End", PrimitiveKind::DateTime)
        .with_column("Offset", PrimitiveKind::DateTimeOffset)
}

pub(super) fn run(tree: CommandTree, config: &TranslatorConfig) -> Command {
    translate(&tree, config).unwrap()
}

pub(super) fn sql(query: Expr) -> String {
    run(CommandTree::query(query), &TranslatorConfig::default()).text
}

/// Select-list text of `SELECT <value> AS "Value" FROM Items AS "Extent1"`,
/// where `value` is built from the row variable.
pub(super) fn select_value(value: impl FnOnce(&Expr) -> Expr) -> String {
    let input = items().bind("Extent1");
    let expr = value(&input.var_ref());
    let text = sql(project(input, vec![("Value", expr)]));
    text.strip_prefix("SELECT ")
        .and_then(|rest| rest.strip_suffix(" AS \"Value\" FROM \"dbo\".\"Items\" AS \"Extent1\""))
        .unwrap_or(&text)
        .to_string()
}

/// `row.name`, for brevity in tests.
pub(super) fn col(row: &Expr, name: &str) -> Expr {
    row.clone().prop(name)
}
