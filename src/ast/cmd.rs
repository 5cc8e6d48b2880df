//! Command trees: one query or one data-manipulation statement.

use serde::{Deserialize, Serialize};

use super::expr::{Binding, Expr};
use super::types::TypeUsage;
use crate::error::XlateResult;

/// A declared command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    pub ty: TypeUsage,
}

/// `property = value` inside an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetClause {
    pub property: Expr,
    pub value: Expr,
}

impl SetClause {
    pub fn new(property: Expr, value: Expr) -> Self {
        Self { property, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertCommand {
    pub target: Binding,
    #[serde(default)]
    pub set_clauses: Vec<SetClause>,
    /// Row-typed `NewInstance` of target properties to send back.
    #[serde(default)]
    pub returning: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCommand {
    pub target: Binding,
    #[serde(default)]
    pub set_clauses: Vec<SetClause>,
    #[serde(default)]
    pub predicate: Option<Expr>,
    #[serde(default)]
    pub returning: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCommand {
    pub target: Binding,
    #[serde(default)]
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandBody {
    Query(Expr),
    Insert(InsertCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
}

impl CommandBody {
    pub fn name(&self) -> &'static str {
        match self {
            CommandBody::Query(_) => "query",
            CommandBody::Insert(_) => "insert",
            CommandBody::Update(_) => "update",
            CommandBody::Delete(_) => "delete",
        }
    }
}

/// Input of one translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTree {
    pub body: CommandBody,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
}

impl CommandTree {
    pub fn query(query: Expr) -> Self {
        Self {
            body: CommandBody::Query(query),
            parameters: Vec::new(),
        }
    }

    pub fn insert(target: Binding, set_clauses: Vec<SetClause>, returning: Option<Expr>) -> Self {
        Self {
            body: CommandBody::Insert(InsertCommand {
                target,
                set_clauses,
                returning,
            }),
            parameters: Vec::new(),
        }
    }

    pub fn update(
        target: Binding,
        set_clauses: Vec<SetClause>,
        predicate: Option<Expr>,
        returning: Option<Expr>,
    ) -> Self {
        Self {
            body: CommandBody::Update(UpdateCommand {
                target,
                set_clauses,
                predicate,
                returning,
            }),
            parameters: Vec::new(),
        }
    }

    pub fn delete(target: Binding, predicate: Option<Expr>) -> Self {
        Self {
            body: CommandBody::Delete(DeleteCommand { target, predicate }),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, ty: TypeUsage) -> Self {
        self.parameters.push(ParameterDecl {
            name: name.into(),
            ty,
        });
        self
    }

    /// Load a command tree from its JSON form.
    pub fn from_json(json: &str) -> XlateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> XlateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
