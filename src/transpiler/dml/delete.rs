//! DELETE SQL generation.

use crate::ast::DeleteCommand;
use crate::config::TranslatorConfig;
use crate::error::XlateResult;
use crate::transpiler::Command;

use super::{target_table, target_translator, write_where};

pub fn build_delete(cmd: &DeleteCommand, config: &TranslatorConfig) -> XlateResult<Command> {
    let mut t = target_translator(&cmd.target, config);
    let mut sql = String::from("DELETE FROM ");
    sql.push_str(&target_table(&cmd.target)?);
    write_where(&mut t, cmd.predicate.as_ref(), &mut sql)?;

    Ok(Command {
        text: sql,
        parameters: t.into_parameters(),
        columns: Vec::new(),
    })
}
