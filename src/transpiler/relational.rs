//! Relational node translation: stage construction, folding and wrapping.

use crate::ast::{Aggregate, Binding, EntitySet, Expr, GroupBinding, SetOpKind, SortKey, TypeUsage, Value};
use crate::dialect::{db_type_name, write_identifier};
use crate::error::{XlateError, XlateResult};
use crate::sql::{
    ColumnExpr, FromExpr, FromSource, InputExpr, JoinExpr, JoinOperand, Operator, OrderItem,
    SqlExpr, StageFrom, StageId,
};

use super::{Translator, next_alias};
use super::pending::{Clause, NamedStage, NodeId, PendingNode, is_compatible};

impl Translator {
    /// Translate a relational input and bind its rows to `binding`.
    pub(crate) fn visit_input_with_binding(&mut self, expr: &Expr, binding: &str) -> XlateResult<NodeId> {
        let node = match expr {
            Expr::Scan(set) => {
                let stage = self
                    .stages
                    .push(InputExpr::from_source(FromSource::Table(table_text(set)), binding));
                self.nodes.push(PendingNode::new(binding, stage))
            }
            Expr::Filter { input, predicate } => {
                let node = self.get_input(input, binding, Clause::Filter)?;
                let stage = self.nodes[node].last().stage;
                let condition = self.in_scope(stage, |t| t.visit(predicate))?;
                self.and_where(stage, condition)?;
                node
            }
            Expr::Sort { input, keys } => {
                let node = self.get_input(input, binding, Clause::Sort)?;
                let stage = self.nodes[node].last().stage;
                let items = self.in_scope(stage, |t| t.visit_sort_keys(keys))?;
                self.stages[stage].order_by = Some(items);
                node
            }
            Expr::Skip { input, keys, count } => {
                let node = self.get_input(input, binding, Clause::Skip)?;
                let stage = self.nodes[node].last().stage;
                let items = self.in_scope(stage, |t| t.visit_sort_keys(keys))?;
                self.stages[stage].order_by = Some(items);
                let count = self.visit(count)?;
                self.stages[stage].skip = Some(count);
                node
            }
            Expr::Distinct(input) => self.visit_distinct(input, binding)?,
            Expr::Limit { input, limit } => {
                let alias = self.next_alias();
                let node = self.visit_input_with_binding(input, &alias)?;
                let stage = self.nodes[node].last().stage;
                let limit = self.visit(limit)?;
                self.fuse_limit(stage, limit);
                node
            }
            Expr::NewInstance { ty, args } => self.visit_rows(ty, args, binding)?,
            Expr::SetOp { kind, .. } => self.visit_set_op(expr, *kind, binding)?,
            Expr::Project { input, projection } => self.visit_project(input, projection, binding)?,
            Expr::GroupBy {
                input,
                keys,
                aggregates,
                result_type,
            } => self.visit_group_by(input, keys, aggregates, result_type, binding)?,
            Expr::Join { .. } => self.visit_join(expr, binding)?,
            Expr::Function {
                function,
                args,
                result_type,
            } => {
                let call = self.visit_function(function, args, result_type)?;
                let stage = self
                    .stages
                    .push(InputExpr::from_source(FromSource::Function(call), binding));
                self.nodes.push(PendingNode::new(binding, stage))
            }
            other => {
                return Err(XlateError::unsupported(format!(
                    "{:?} used as a relational input",
                    other.kind()
                )));
            }
        };
        self.bindings.insert(binding.to_string(), node);
        Ok(node)
    }

    /// Visit `input` and make sure its open stage can take `clause`,
    /// wrapping it as a subquery named `parent` when it cannot.
    fn get_input(&mut self, input: &Binding, parent: &str, clause: Clause) -> XlateResult<NodeId> {
        let node = self.visit_input_with_binding(&input.expr, &input.var)?;
        let last = self.nodes[node].last().clone();
        if !is_compatible(&self.stages[last.stage], clause) {
            self.wrap(node, &last, parent, clause);
        }
        Ok(node)
    }

    fn wrap(&mut self, node: NodeId, last: &NamedStage, parent: &str, clause: Clause) -> StageId {
        tracing::trace!(?clause, inner = %last.name, outer = parent, "closing stage into a subquery");
        let wrapper = self
            .stages
            .push(InputExpr::from_source(FromSource::Stage(last.stage), last.name.clone()));
        self.nodes[node].selects.push(NamedStage {
            name: parent.to_string(),
            stage: wrapper,
        });
        wrapper
    }

    fn and_where(&mut self, stage: StageId, condition: SqlExpr) -> XlateResult<()> {
        let combined = match self.stages[stage].where_clause.take() {
            Some(existing) => SqlExpr::binary(Operator::And, self.regime, existing, condition)?,
            None => condition,
        };
        self.stages[stage].where_clause = Some(combined);
        Ok(())
    }

    fn fuse_limit(&mut self, stage: StageId, limit: SqlExpr) {
        let fused = match self.stages[stage].limit.take() {
            Some(existing) => SqlExpr::function("LEAST", vec![existing, limit]),
            None => limit,
        };
        self.stages[stage].limit = Some(fused);
    }

    fn visit_sort_keys(&mut self, keys: &[SortKey]) -> XlateResult<Vec<OrderItem>> {
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            items.push(OrderItem {
                expr: self.visit(&key.expr)?,
                ascending: key.ascending,
            });
        }
        Ok(items)
    }

    fn visit_distinct(&mut self, input: &Expr, binding: &str) -> XlateResult<NodeId> {
        let alias = self.next_alias();
        let node = self.visit_input_with_binding(input, &alias)?;
        let last = self.nodes[node].last().clone();
        if !is_compatible(&self.stages[last.stage], Clause::Distinct) {
            let names = self.stages[last.stage].output_names();
            let wrapper = self.wrap(node, &last, binding, Clause::Distinct);
            let stage = &mut self.stages[wrapper];
            for name in names {
                stage
                    .columns_to_project
                    .insert((last.name.clone(), name.clone()), name.clone());
                stage.project_new_names.insert(name);
            }
        }
        let stage = self.nodes[node].last().stage;
        self.stages[stage].distinct = true;
        Ok(node)
    }

    /// Constant rows: a single element, literal rows, or no rows at all.
    fn visit_rows(&mut self, ty: &TypeUsage, args: &[Expr], binding: &str) -> XlateResult<NodeId> {
        if let [Expr::Element(inner)] = args {
            let alias = self.next_alias();
            let node = self.visit_input_with_binding(inner, &alias)?;
            let stage = self.nodes[node].last().stage;
            self.fuse_limit(stage, SqlExpr::Constant(Value::Int32(1)));
            return Ok(node);
        }

        let rows = if args.is_empty() {
            let element = ty
                .element_type()
                .ok_or_else(|| XlateError::unsupported("constant rows without an element type"))?;
            SqlExpr::literal(format!("(SELECT CAST(NULL AS {}) LIMIT 0)", db_type_name(element)?))
        } else {
            let mut parts = vec![SqlExpr::literal("(")];
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    parts.push(SqlExpr::literal(" UNION ALL "));
                }
                parts.push(SqlExpr::literal("SELECT "));
                let columns = match arg {
                    Expr::NewInstance { .. } => self.visit_row_columns(arg)?,
                    scalar => vec![ColumnExpr::new(self.visit(scalar)?, "C", scalar.result_type())],
                };
                parts.push(SqlExpr::List(
                    columns.into_iter().map(|c| SqlExpr::Column(Box::new(c))).collect(),
                ));
            }
            parts.push(SqlExpr::literal(")"));
            SqlExpr::Seq(parts)
        };
        let stage = self
            .stages
            .push(InputExpr::from_source(FromSource::Rows(rows), binding));
        Ok(self.nodes.push(PendingNode::new(binding, stage)))
    }

    fn visit_set_op(&mut self, expr: &Expr, kind: SetOpKind, binding: &str) -> XlateResult<NodeId> {
        let mut operands = Vec::new();
        flatten_set_op(expr, kind, &mut operands);

        let mut children = Vec::with_capacity(operands.len());
        for (i, operand) in operands.into_iter().enumerate() {
            let node = self.visit_input_with_binding(operand, &format!("{}_{}", binding, i))?;
            let stage = self.nodes[node].last().stage;
            self.select_members(stage, &operand.result_type());
            children.push(stage);
        }
        let stage = self.stages.push(InputExpr::from_source(
            FromSource::SetOp {
                kind,
                stages: children,
            },
            binding,
        ));
        Ok(self.nodes.push(PendingNode::new(binding, stage)))
    }

    /// Set operations match columns by position, so a branch without a
    /// select list exposes every member of its row type in declared order.
    fn select_members(&mut self, stage: StageId, ty: &TypeUsage) {
        let target = &self.stages[stage];
        if target.projection.is_some() || !target.columns_to_project.is_empty() {
            return;
        }
        let Some(StageFrom::Source(from)) = &target.from else {
            return;
        };
        let alias = from.name.clone();
        let Some(members) = ty.element_type().unwrap_or(ty).members() else {
            return;
        };
        for member in members {
            let counter = &mut self.alias_counter;
            self.stages[stage].pull_up_column(&alias, &member.name, || next_alias(counter));
        }
    }

    fn visit_project(&mut self, input: &Binding, projection: &Expr, binding: &str) -> XlateResult<NodeId> {
        let child = self.visit_input_with_binding(&input.expr, &input.var)?;
        let last = self.nodes[child].last().clone();

        let columns = if is_compatible(&self.stages[last.stage], Clause::Project) {
            self.in_scope(last.stage, |t| t.visit_row_columns(projection))?
        } else {
            // Columns resolve through the closed child, outside any scope.
            let columns = self.visit_row_columns(projection)?;
            let wrapper = self.wrap(child, &last, binding, Clause::Project);
            self.stages[wrapper].projection = Some(columns);
            return Ok(self.nodes.push(PendingNode::new(binding, wrapper)));
        };
        self.stages[last.stage].projection = Some(columns);
        Ok(self.nodes.push(PendingNode::new(binding, last.stage)))
    }

    /// One select-list column per member of a row constructor.
    pub(crate) fn visit_row_columns(&mut self, row: &Expr) -> XlateResult<Vec<ColumnExpr>> {
        let Expr::NewInstance { ty, args } = row else {
            return Err(XlateError::unsupported(format!(
                "projection of {:?}; expected a row constructor",
                row.kind()
            )));
        };
        let members = ty
            .members()
            .ok_or_else(|| XlateError::unsupported("projection without a row type"))?;
        if members.len() != args.len() {
            return Err(XlateError::arity("row constructor", members.len().to_string(), args.len()));
        }

        let mut columns = Vec::with_capacity(args.len());
        for (member, arg) in members.iter().zip(args) {
            let mut value = self.visit(arg)?;
            if matches!(arg, Expr::Constant(Value::String(_))) {
                value = SqlExpr::cast(value, "varchar");
            }
            columns.push(ColumnExpr::new(value, member.name.clone(), member.ty.clone()));
        }
        Ok(columns)
    }

    fn visit_group_by(
        &mut self,
        input: &GroupBinding,
        keys: &[Expr],
        aggregates: &[Aggregate],
        result_type: &TypeUsage,
        binding: &str,
    ) -> XlateResult<NodeId> {
        let node = self.visit_input_with_binding(&input.expr, &input.var)?;
        let last = self.nodes[node].last().clone();
        if !is_compatible(&self.stages[last.stage], Clause::GroupBy) {
            self.wrap(node, &last, binding, Clause::GroupBy);
        }
        self.bindings.insert(input.group_var.clone(), node);

        let members = result_type
            .element_type()
            .unwrap_or(result_type)
            .members()
            .ok_or_else(|| XlateError::unsupported("grouping without a row result type"))?
            .to_vec();
        if members.len() != keys.len() + aggregates.len() {
            return Err(XlateError::arity(
                "group by",
                members.len().to_string(),
                keys.len() + aggregates.len(),
            ));
        }

        let stage = self.nodes[node].last().stage;
        let (columns, group_keys) = self.in_scope(stage, |t| {
            let mut columns = Vec::with_capacity(members.len());
            let mut group_keys = Vec::new();
            for (key, member) in keys.iter().zip(&members) {
                let value = t.visit(key)?;
                // A constant key would read as an ordinal in GROUP BY.
                if !matches!(key, Expr::Constant(_)) {
                    group_keys.push(value.clone());
                }
                columns.push(ColumnExpr::new(value, member.name.clone(), member.ty.clone()));
            }
            for (aggregate, member) in aggregates.iter().zip(&members[keys.len()..]) {
                let value = t.visit_aggregate(aggregate)?;
                columns.push(ColumnExpr::new(value, member.name.clone(), member.ty.clone()));
            }
            Ok((columns, group_keys))
        })?;

        self.stages[stage].projection = Some(columns);
        self.stages[stage].group_by = Some(group_keys);
        Ok(node)
    }

    fn visit_join(&mut self, expr: &Expr, binding: &str) -> XlateResult<NodeId> {
        let stage = self.stages.push(InputExpr::default());
        let node = self.nodes.push(PendingNode::new(binding, stage));
        let join = self.visit_join_children(expr, node)?;
        self.stages[stage].from = Some(StageFrom::Join(join));
        Ok(node)
    }

    fn visit_join_children(&mut self, expr: &Expr, node: NodeId) -> XlateResult<JoinExpr> {
        let Expr::Join {
            kind,
            left,
            right,
            condition,
        } = expr
        else {
            return Err(XlateError::unsupported(format!("{:?} as a join", expr.kind())));
        };

        let left = if left.expr.is_join() {
            JoinOperand::Join(Box::new(self.visit_join_children(&left.expr, node)?))
        } else {
            JoinOperand::From(self.visit_join_side(left, node)?)
        };

        let join_stage = self.nodes[node].last().stage;
        let right = if kind.is_apply() {
            // The right side of an apply sees the left side's columns.
            let mut from = self.in_scope(join_stage, |t| t.visit_join_side(right, node))?;
            from.force_subquery = true;
            JoinOperand::From(from)
        } else if right.expr.is_join() {
            JoinOperand::Join(Box::new(self.visit_join_children(&right.expr, node)?))
        } else {
            JoinOperand::From(self.visit_join_side(right, node)?)
        };

        let condition = match condition {
            Some(condition) => Some(self.in_scope(join_stage, |t| t.visit(condition))?),
            None => None,
        };

        Ok(JoinExpr {
            left,
            kind: *kind,
            right,
            condition,
        })
    }

    fn visit_join_side(&mut self, side: &Binding, parent: NodeId) -> XlateResult<FromExpr> {
        let child = self.visit_input_with_binding(&side.expr, &side.var)?;
        self.nodes[child].join_parent = Some(parent);
        let last = self.nodes[child].last().clone();
        Ok(FromExpr::new(FromSource::Stage(last.stage), last.name))
    }
}

/// Collect the operands of a chain of same-kind set operations.
/// `EXCEPT` is not associative and is never flattened.
fn flatten_set_op<'a>(expr: &'a Expr, kind: SetOpKind, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::SetOp {
            kind: k,
            left,
            right,
        } if *k == kind => {
            if kind == SetOpKind::Except {
                out.push(left);
                out.push(right);
                return;
            }
            flatten_set_op(left, kind, out);
            flatten_set_op(right, kind, out);
        }
        other => out.push(other),
    }
}

/// Scan text: a parenthesized defining query or a schema-qualified table.
pub(crate) fn table_text(set: &EntitySet) -> String {
    let annotations = &set.annotations;
    if let Some(query) = &annotations.defining_query {
        return format!("({})", query);
    }
    let table = annotations
        .store_name
        .as_deref()
        .or(annotations.table.as_deref())
        .unwrap_or(&set.name);
    let schema = annotations
        .store_schema
        .as_deref()
        .or(annotations.schema.as_deref())
        .unwrap_or(&set.container);

    let mut out = String::new();
    if !schema.is_empty() {
        write_identifier(schema, &mut out);
        out.push('.');
    }
    write_identifier(table, &mut out);
    out
}
