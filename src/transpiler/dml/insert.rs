//! INSERT SQL generation.

use crate::ast::InsertCommand;
use crate::config::TranslatorConfig;
use crate::error::XlateResult;
use crate::sql::SqlExpr;
use crate::transpiler::Command;

use super::{render, target_table, target_translator, write_returning};

pub fn build_insert(cmd: &InsertCommand, config: &TranslatorConfig) -> XlateResult<Command> {
    let mut t = target_translator(&cmd.target, config);
    let mut sql = String::from("INSERT INTO ");
    sql.push_str(&target_table(&cmd.target)?);

    if cmd.set_clauses.is_empty() {
        sql.push_str(" DEFAULT VALUES");
    } else {
        let mut columns = Vec::with_capacity(cmd.set_clauses.len());
        let mut values = Vec::with_capacity(cmd.set_clauses.len());
        for clause in &cmd.set_clauses {
            columns.push(t.visit(&clause.property)?);
            values.push(t.visit(&clause.value)?);
        }
        sql.push_str(" (");
        render(&SqlExpr::List(columns), &t.stages, &mut sql);
        sql.push_str(") VALUES (");
        render(&SqlExpr::List(values), &t.stages, &mut sql);
        sql.push(')');
    }

    let columns = write_returning(&mut t, cmd.returning.as_ref(), &mut sql)?;
    Ok(Command {
        text: sql,
        parameters: t.into_parameters(),
        columns,
    })
}
