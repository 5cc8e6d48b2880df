//! Command builders: one entry point per command kind.

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

use crate::ast::{Binding, Expr};
use crate::config::TranslatorConfig;
use crate::error::{XlateError, XlateResult};
use crate::sql::{SqlExpr, Stages};

use super::relational::table_text;
use super::{PropertyMode, ResultColumn, Translator};

/// Translator for a single-table DML statement against `target`.
fn target_translator(target: &Binding, config: &TranslatorConfig) -> Translator {
    Translator::new(
        config.server_version.precedence(),
        PropertyMode::Target(target.var.clone()),
        config.parameterize_dml_constants,
    )
}

/// The table a DML statement writes to.
fn target_table(target: &Binding) -> XlateResult<String> {
    match target.expr.as_ref() {
        Expr::Scan(set) => Ok(table_text(set)),
        other => Err(XlateError::unsupported(format!(
            "DML target must be a table scan, found {:?}",
            other.kind()
        ))),
    }
}

/// Append ` WHERE <predicate>`.
fn write_where(t: &mut Translator, predicate: Option<&Expr>, sql: &mut String) -> XlateResult<()> {
    if let Some(predicate) = predicate {
        let predicate = t.visit(predicate)?;
        sql.push_str(" WHERE ");
        predicate.write_sql(&t.stages, sql);
    }
    Ok(())
}

/// Append ` RETURNING "a", "b"` and report the returned columns.
fn write_returning(
    t: &mut Translator,
    returning: Option<&Expr>,
    sql: &mut String,
) -> XlateResult<Vec<ResultColumn>> {
    let Some(returning) = returning else {
        return Ok(Vec::new());
    };
    let Expr::NewInstance { ty, args } = returning else {
        return Err(XlateError::unsupported("RETURNING must be a row constructor"));
    };
    let members = ty
        .members()
        .ok_or_else(|| XlateError::unsupported("RETURNING without a row type"))?;
    if members.len() != args.len() {
        return Err(XlateError::arity("RETURNING", members.len().to_string(), args.len()));
    }

    let values = t.visit_all(args)?;
    sql.push_str(" RETURNING ");
    SqlExpr::List(values).write_sql(&t.stages, sql);
    Ok(members
        .iter()
        .map(|m| ResultColumn {
            name: m.name.clone(),
            ty: m.ty.clone(),
        })
        .collect())
}

fn render(expr: &SqlExpr, stages: &Stages, sql: &mut String) {
    expr.write_sql(stages, sql);
}
