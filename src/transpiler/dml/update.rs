//! UPDATE SQL generation.

use crate::ast::UpdateCommand;
use crate::config::TranslatorConfig;
use crate::error::{XlateError, XlateResult};
use crate::sql::SqlExpr;
use crate::transpiler::Command;

use super::{render, target_table, target_translator, write_returning, write_where};

pub fn build_update(cmd: &UpdateCommand, config: &TranslatorConfig) -> XlateResult<Command> {
    if cmd.set_clauses.is_empty() {
        return Err(XlateError::unsupported("UPDATE without SET clauses"));
    }

    let mut t = target_translator(&cmd.target, config);
    let mut sql = String::from("UPDATE ");
    sql.push_str(&target_table(&cmd.target)?);
    sql.push_str(" SET ");

    let mut assignments = Vec::with_capacity(cmd.set_clauses.len());
    for clause in &cmd.set_clauses {
        let column = t.visit(&clause.property)?;
        let value = t.visit(&clause.value)?;
        assignments.push(SqlExpr::Seq(vec![column, SqlExpr::literal(" = "), value]));
    }
    render(&SqlExpr::List(assignments), &t.stages, &mut sql);

    write_where(&mut t, cmd.predicate.as_ref(), &mut sql)?;
    let columns = write_returning(&mut t, cmd.returning.as_ref(), &mut sql)?;
    Ok(Command {
        text: sql,
        parameters: t.into_parameters(),
        columns,
    })
}
