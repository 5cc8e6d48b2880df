//! Command-tree to SQL translation.
//!
//! [`translate`] dispatches on the command kind to one of the builders in
//! [`dml`]; each builder drives a fresh [`Translator`] over its part of the
//! tree and renders the result.

pub mod coalesce;
pub mod dml;
pub mod functions;
pub mod pending;
mod relational;
mod visitor;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{CommandBody, CommandTree, PrimitiveKind, TypeUsage, Value};
use crate::config::TranslatorConfig;
use crate::dialect::{ParameterType, parameter_type};
use crate::error::{XlateError, XlateResult};
use crate::sql::{Precedence, StageId, Stages};
use pending::{NodeId, Nodes};

/// A bound parameter of the generated command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub kind: PrimitiveKind,
    pub db_type: ParameterType,
    /// Set for constants lifted out of the tree; declared parameters are
    /// bound by the caller.
    pub value: Option<Value>,
}

/// A column of the command's result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    pub ty: TypeUsage,
}

/// Generated SQL plus everything needed to execute it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub text: String,
    pub parameters: Vec<Parameter>,
    pub columns: Vec<ResultColumn>,
}

/// Translate a command tree to PostgreSQL.
pub fn translate(tree: &CommandTree, config: &TranslatorConfig) -> XlateResult<Command> {
    tracing::debug!(
        command = tree.body.name(),
        server_version = %config.server_version,
        regime = ?config.server_version.precedence(),
        "translating command tree"
    );

    let mut command = match &tree.body {
        CommandBody::Query(query) => dml::select::build_select(query, config)?,
        CommandBody::Insert(insert) => dml::insert::build_insert(insert, config)?,
        CommandBody::Update(update) => dml::update::build_update(update, config)?,
        CommandBody::Delete(delete) => dml::delete::build_delete(delete, config)?,
    };

    let mut parameters = Vec::with_capacity(tree.parameters.len() + command.parameters.len());
    for decl in &tree.parameters {
        let kind = decl.ty.primitive_kind().ok_or_else(|| {
            XlateError::UnsupportedType(format!("parameter '{}' is not of a primitive type", decl.name))
        })?;
        parameters.push(Parameter {
            name: decl.name.clone(),
            kind,
            db_type: parameter_type(kind),
            value: None,
        });
    }
    parameters.append(&mut command.parameters);
    command.parameters = parameters;

    tracing::debug!(sql = %command.text, parameters = command.parameters.len(), "translated");
    Ok(command)
}

/// How property accesses resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PropertyMode {
    /// Through pending nodes and stages of a query.
    Query,
    /// Unqualified columns of the single DML target bound to this variable.
    Target(String),
}

/// State of one translation pass.
pub(crate) struct Translator {
    pub(crate) regime: Precedence,
    pub(crate) mode: PropertyMode,
    pub(crate) stages: Stages,
    pub(crate) nodes: Nodes,
    /// Binding name to the node it resolves to.
    pub(crate) bindings: HashMap<String, NodeId>,
    /// Stages whose clauses are being built right now, innermost last.
    scopes: Vec<StageId>,
    alias_counter: usize,
    parameterize_constants: bool,
    parameters: Vec<Parameter>,
}

impl Translator {
    pub(crate) fn new(regime: Precedence, mode: PropertyMode, parameterize_constants: bool) -> Self {
        Self {
            regime,
            mode,
            stages: Stages::new(),
            nodes: Nodes::default(),
            bindings: HashMap::new(),
            scopes: Vec::new(),
            alias_counter: 0,
            parameterize_constants,
            parameters: Vec::new(),
        }
    }

    pub(crate) fn next_alias(&mut self) -> String {
        next_alias(&mut self.alias_counter)
    }

    /// Run `f` with `stage` pushed as the current scope, popping it on every
    /// exit path.
    pub(crate) fn in_scope<T>(
        &mut self,
        stage: StageId,
        f: impl FnOnce(&mut Self) -> XlateResult<T>,
    ) -> XlateResult<T> {
        self.scopes.push(stage);
        let result = f(self);
        self.scopes.pop();
        result
    }

    pub(crate) fn is_in_scope(&self, stage: StageId) -> bool {
        self.scopes.contains(&stage)
    }

    /// Register a lifted constant and return its placeholder name.
    pub(crate) fn push_constant(&mut self, value: &Value) -> String {
        let name = format!("p_{}", self.parameters.len());
        let kind = value.kind();
        tracing::trace!(parameter = %name, ?kind, "lifted constant into parameter");
        self.parameters.push(Parameter {
            name: name.clone(),
            kind,
            db_type: parameter_type(kind),
            value: Some(value.clone()),
        });
        name
    }

    pub(crate) fn parameterizes_constants(&self) -> bool {
        self.parameterize_constants
    }

    pub(crate) fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }
}

pub(crate) fn next_alias(counter: &mut usize) -> String {
    *counter += 1;
    format!("Alias{}", counter)
}
