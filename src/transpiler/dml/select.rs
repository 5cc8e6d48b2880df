//! SELECT SQL generation.

use crate::ast::{Binding, Expr, TypeUsage};
use crate::config::TranslatorConfig;
use crate::error::{XlateError, XlateResult};
use crate::sql::SqlExpr;
use crate::transpiler::{Command, PropertyMode, ResultColumn, Translator};

pub fn build_select(query: &Expr, config: &TranslatorConfig) -> XlateResult<Command> {
    if !query.is_relational() {
        return Err(XlateError::unsupported(format!(
            "query root must be relational, found {:?}",
            query.kind()
        )));
    }

    let mut t = Translator::new(
        config.server_version.precedence(),
        PropertyMode::Query,
        config.parameterize_query_constants,
    );
    let alias = t.next_alias();
    let root = project_declared_columns(query, &alias);
    let node = t.visit_input_with_binding(root.as_ref().unwrap_or(query), &alias)?;

    let stage = t.nodes[node].last().stage;
    let columns = t.stages[stage]
        .projection
        .iter()
        .flatten()
        .map(|c| ResultColumn {
            name: c.name.clone(),
            ty: c.ty.clone(),
        })
        .collect();
    let text = SqlExpr::Stage(stage).to_sql(&t.stages);

    Ok(Command {
        text,
        parameters: t.into_parameters(),
        columns,
    })
}

/// A root without its own projection selects the declared columns of its
/// row type, so the result never degrades to `SELECT 1`.
fn project_declared_columns(query: &Expr, alias: &str) -> Option<Expr> {
    if matches!(query, Expr::Project { .. } | Expr::GroupBy { .. }) {
        return None;
    }
    let row = query.result_type().element_type()?.clone();
    let members = row.members()?;
    if members.is_empty() || members.iter().any(|m| m.ty.primitive_kind().is_none()) {
        return None;
    }

    let input = Binding::new(query.clone(), alias);
    let var = input.var_ref();
    let args = members
        .iter()
        .map(|m| Expr::Property {
            instance: Box::new(var.clone()),
            name: m.name.clone(),
            ty: m.ty.clone(),
        })
        .collect();
    Some(Expr::Project {
        input,
        projection: Box::new(Expr::NewInstance {
            ty: TypeUsage::row(members.to_vec()),
            args,
        }),
    })
}
