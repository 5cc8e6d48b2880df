//! `SELECT` stages and the arena that owns them.
//!
//! A stage is referenced both by the pending node that may still fold
//! clauses into it and by the FROM clause of any stage wrapping it, so
//! stages live in one arena per translation and are addressed by
//! [`StageId`].

use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;

use super::{ColumnExpr, SqlExpr};
use crate::ast::{JoinKind, SetOpKind};
use crate::dialect::write_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(usize);

#[derive(Debug, Default)]
pub struct Stages {
    stages: Vec<InputExpr>,
}

impl Stages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: InputExpr) -> StageId {
        self.stages.push(stage);
        StageId(self.stages.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Index<StageId> for Stages {
    type Output = InputExpr;

    fn index(&self, id: StageId) -> &InputExpr {
        &self.stages[id.0]
    }
}

impl IndexMut<StageId> for Stages {
    fn index_mut(&mut self, id: StageId) -> &mut InputExpr {
        &mut self.stages[id.0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub ascending: bool,
}

/// One `SELECT ... FROM ... WHERE ... GROUP BY ... ORDER BY ... OFFSET ... LIMIT`.
#[derive(Debug, Clone, Default)]
pub struct InputExpr {
    pub distinct: bool,
    pub projection: Option<Vec<ColumnExpr>>,
    /// Columns pulled up from the FROM source on demand, keyed by
    /// `(source alias, column)` and mapped to the exposed name.
    pub columns_to_project: IndexMap<(String, String), String>,
    /// Names already handed out in `columns_to_project`.
    pub project_new_names: HashSet<String>,
    pub from: Option<StageFrom>,
    pub where_clause: Option<SqlExpr>,
    pub group_by: Option<Vec<SqlExpr>>,
    pub order_by: Option<Vec<OrderItem>>,
    pub skip: Option<SqlExpr>,
    pub limit: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageFrom {
    Source(FromExpr),
    Join(JoinExpr),
}

/// `<source> AS "name"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FromExpr {
    pub source: FromSource,
    pub name: String,
    /// Render a stage source as a subquery even when it could be inlined.
    pub force_subquery: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    Stage(StageId),
    /// Qualified table name or parenthesized defining query.
    Table(String),
    /// Table-valued function call.
    Function(SqlExpr),
    /// Already-parenthesized constant rows.
    Rows(SqlExpr),
    SetOp { kind: SetOpKind, stages: Vec<StageId> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinExpr {
    pub left: JoinOperand,
    pub kind: JoinKind,
    pub right: JoinOperand,
    pub condition: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOperand {
    From(FromExpr),
    Join(Box<JoinExpr>),
}

impl FromExpr {
    pub fn new(source: FromSource, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            force_subquery: false,
        }
    }

    pub fn write_sql(&self, stages: &Stages, out: &mut String) {
        match &self.source {
            FromSource::Stage(id) => {
                let stage = &stages[*id];
                match &stage.from {
                    Some(StageFrom::Source(inner))
                        if !self.force_subquery && stage.is_passthrough() && inner.name == self.name =>
                    {
                        // Nothing to select from the stage itself; expose its source directly.
                        inner.write_sql(stages, out);
                        return;
                    }
                    _ => {
                        out.push('(');
                        stage.write_sql(stages, out);
                        out.push(')');
                    }
                }
            }
            FromSource::Table(text) => out.push_str(text),
            FromSource::Function(expr) | FromSource::Rows(expr) => expr.write_sql(stages, out),
            FromSource::SetOp { kind, stages: children } => {
                let keyword = match kind {
                    SetOpKind::UnionAll => " UNION ALL ",
                    SetOpKind::Intersect => " INTERSECT ",
                    SetOpKind::Except => " EXCEPT ",
                };
                out.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(keyword);
                    }
                    out.push('(');
                    stages[*child].write_sql(stages, out);
                    out.push(')');
                }
                out.push(')');
            }
        }
        out.push_str(" AS ");
        write_identifier(&self.name, out);
    }
}

impl JoinOperand {
    fn write_sql(&self, stages: &Stages, out: &mut String) {
        match self {
            JoinOperand::From(from) => from.write_sql(stages, out),
            JoinOperand::Join(join) => join.write_sql(stages, out),
        }
    }
}

impl JoinExpr {
    pub fn write_sql(&self, stages: &Stages, out: &mut String) {
        self.left.write_sql(stages, out);
        out.push_str(match self.kind {
            JoinKind::Inner => " INNER JOIN ",
            JoinKind::LeftOuter => " LEFT OUTER JOIN ",
            JoinKind::FullOuter => " FULL OUTER JOIN ",
            JoinKind::Cross => " CROSS JOIN ",
            JoinKind::CrossApply => " CROSS JOIN LATERAL ",
            JoinKind::OuterApply => " LEFT OUTER JOIN LATERAL ",
        });
        match &self.right {
            JoinOperand::Join(nested) => {
                out.push('(');
                nested.write_sql(stages, out);
                out.push(')');
            }
            from => from.write_sql(stages, out),
        }
        match (self.kind, &self.condition) {
            (JoinKind::Cross | JoinKind::CrossApply, _) => {}
            (JoinKind::OuterApply, _) | (_, None) => out.push_str(" ON TRUE"),
            (_, Some(condition)) => {
                out.push_str(" ON ");
                condition.write_sql(stages, out);
            }
        }
    }
}

impl StageFrom {
    fn write_sql(&self, stages: &Stages, out: &mut String) {
        match self {
            StageFrom::Source(from) => from.write_sql(stages, out),
            StageFrom::Join(join) => join.write_sql(stages, out),
        }
    }
}

impl InputExpr {
    pub fn new(from: StageFrom) -> Self {
        Self {
            from: Some(from),
            ..Self::default()
        }
    }

    /// Stage selecting from `source AS name`.
    pub fn from_source(source: FromSource, name: impl Into<String>) -> Self {
        Self::new(StageFrom::Source(FromExpr::new(source, name)))
    }

    /// True when the stage adds nothing over its FROM source.
    pub fn is_passthrough(&self) -> bool {
        self.projection.is_none()
            && self.where_clause.is_none()
            && !self.distinct
            && self.group_by.is_none()
            && self.order_by.is_none()
            && self.skip.is_none()
            && self.limit.is_none()
    }

    /// Names of the columns this stage exposes.
    pub fn output_names(&self) -> Vec<String> {
        match &self.projection {
            Some(columns) => columns.iter().map(|c| c.name.clone()).collect(),
            None => self.columns_to_project.values().cloned().collect(),
        }
    }

    /// Project `(from, name)` under a fresh exposed name and return that name.
    ///
    /// Collisions are renamed `name_<alias>` with aliases drawn from `next_alias`.
    pub fn pull_up_column(
        &mut self,
        from: &str,
        name: &str,
        mut next_alias: impl FnMut() -> String,
    ) -> String {
        let key = (from.to_string(), name.to_string());
        if let Some(existing) = self.columns_to_project.get(&key) {
            return existing.clone();
        }
        let mut new_name = name.to_string();
        while self.project_new_names.contains(&new_name) {
            new_name = format!("{}_{}", name, next_alias());
        }
        self.columns_to_project.insert(key, new_name.clone());
        self.project_new_names.insert(new_name.clone());
        new_name
    }

    pub fn write_sql(&self, stages: &Stages, out: &mut String) {
        out.push_str("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }

        match &self.projection {
            Some(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    column.write_sql(stages, out);
                }
            }
            None if !self.columns_to_project.is_empty() => {
                for (i, ((from, name), new_name)) in self.columns_to_project.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_identifier(from, out);
                    out.push('.');
                    write_identifier(name, out);
                    if name != new_name {
                        out.push_str(" AS ");
                        write_identifier(new_name, out);
                    }
                }
            }
            None => out.push('1'),
        }

        if let Some(from) = &self.from {
            out.push_str(" FROM ");
            from.write_sql(stages, out);
        }

        if let Some(predicate) = &self.where_clause {
            out.push_str(" WHERE ");
            predicate.write_sql(stages, out);
        }

        if let Some(keys) = self.group_by.as_ref().filter(|keys| !keys.is_empty()) {
            out.push_str(" GROUP BY ");
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                key.write_sql(stages, out);
            }
        }

        if let Some(items) = &self.order_by {
            out.push_str(" ORDER BY ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                item.expr.write_sql(stages, out);
                out.push_str(if item.ascending { " ASC" } else { " DESC" });
            }
        }

        if let Some(skip) = &self.skip {
            out.push_str(" OFFSET ");
            skip.write_sql(stages, out);
        }

        if let Some(limit) = &self.limit {
            out.push_str(" LIMIT ");
            limit.write_sql(stages, out);
        }
    }
}
