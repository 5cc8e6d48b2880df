//! Scalar expression translation and property resolution.

use crate::ast::{ArithmeticOp, ComparisonOp, Expr, Value};
use crate::dialect::db_type_name;
use crate::error::{XlateError, XlateResult};
use crate::sql::{Operator, SqlExpr};

use super::coalesce;
use super::{PropertyMode, Translator, next_alias};

impl Translator {
    /// Translate a scalar expression against the current scope.
    pub(crate) fn visit(&mut self, expr: &Expr) -> XlateResult<SqlExpr> {
        let regime = self.regime;
        match expr {
            Expr::Constant(value) => Ok(self.visit_constant(value)),
            Expr::Null(ty) => match self.mode {
                PropertyMode::Query => Ok(SqlExpr::cast(SqlExpr::literal("NULL"), db_type_name(ty)?)),
                PropertyMode::Target(_) => Ok(SqlExpr::literal("NULL")),
            },
            Expr::ParameterRef { name, .. } => Ok(SqlExpr::literal(format!("@{}", name))),
            Expr::VariableRef { name, .. } => Err(XlateError::binding(
                name.clone(),
                "a variable can only be used through a property access",
            )),
            Expr::Property { instance, name, .. } => self.visit_property(instance, name),

            Expr::Comparison { op, left, right } => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                SqlExpr::binary(comparison_operator(*op), regime, left, right)
            }
            Expr::Arithmetic { op, args } => self.visit_arithmetic(*op, args),
            Expr::And(left, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                SqlExpr::binary(Operator::And, regime, left, right)
            }
            Expr::Or(left, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                SqlExpr::binary(Operator::Or, regime, left, right)
            }
            Expr::Not(arg) => Ok(self.visit(arg)?.negate(regime)),
            Expr::IsNull(arg) => SqlExpr::postfix(Operator::IsNull, regime, self.visit(arg)?),
            Expr::IsEmpty(arg) => {
                let inner = self.visit(arg)?;
                Ok(SqlExpr::Exists(Box::new(inner)).negate(regime))
            }
            Expr::Like { argument, pattern } => {
                let argument = self.visit(argument)?;
                let pattern = self.visit(pattern)?;
                SqlExpr::binary(Operator::Like, regime, argument, pattern)
            }
            Expr::In { item, list } => {
                if list.is_empty() {
                    // Nothing can be a member of an empty list.
                    return Ok(SqlExpr::literal("FALSE"));
                }
                let item = self.visit(item)?;
                let list = self.visit_all(list)?;
                SqlExpr::binary(Operator::In, regime, item, SqlExpr::parenthesized(SqlExpr::List(list)))
            }
            Expr::Cast { argument, ty } => {
                let value = self.visit(argument)?;
                Ok(SqlExpr::cast(value, db_type_name(ty)?))
            }
            Expr::Case { .. } => self.visit_case(expr),
            Expr::Function {
                function,
                args,
                result_type,
            } => self.visit_function(function, args, result_type),
            Expr::Element(input) => {
                let inner = self.visit(input)?;
                Ok(SqlExpr::parenthesized(inner))
            }
            Expr::Limit { .. } => self.visit_scalar_limit(expr),
            Expr::NewInstance { ty, .. } if ty.element_type().is_none() => Err(XlateError::unsupported(
                "row constructor outside of a projection",
            )),
            relational => {
                let alias = self.next_alias();
                let node = self.visit_input_with_binding(relational, &alias)?;
                Ok(SqlExpr::Stage(self.nodes[node].last().stage))
            }
        }
    }

    pub(crate) fn visit_all(&mut self, exprs: &[Expr]) -> XlateResult<Vec<SqlExpr>> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            out.push(self.visit(expr)?);
        }
        Ok(out)
    }

    fn visit_constant(&mut self, value: &Value) -> SqlExpr {
        if self.parameterizes_constants() {
            let name = self.push_constant(value);
            SqlExpr::literal(format!("@{}", name))
        } else {
            SqlExpr::Constant(value.clone())
        }
    }

    fn visit_arithmetic(&mut self, op: ArithmeticOp, args: &[Expr]) -> XlateResult<SqlExpr> {
        let regime = self.regime;
        if op == ArithmeticOp::UnaryMinus {
            let [arg] = args else {
                return Err(XlateError::arity("unary minus", "1", args.len()));
            };
            return SqlExpr::prefix(Operator::UnaryMinus, regime, self.visit(arg)?);
        }
        let [left, right] = args else {
            return Err(XlateError::arity(format!("{:?}", op), "2", args.len()));
        };
        let operator = match op {
            ArithmeticOp::Plus => Operator::Add,
            ArithmeticOp::Minus => Operator::Sub,
            ArithmeticOp::Multiply => Operator::Mul,
            ArithmeticOp::Divide => Operator::Div,
            ArithmeticOp::Modulo => Operator::Mod,
            ArithmeticOp::UnaryMinus => Operator::UnaryMinus,
        };
        let left = self.visit(left)?;
        let right = self.visit(right)?;
        SqlExpr::binary(operator, regime, left, right)
    }

    fn visit_case(&mut self, expr: &Expr) -> XlateResult<SqlExpr> {
        let reduced = coalesce::reduce(expr);
        let Expr::Case {
            when,
            then,
            otherwise,
        } = &reduced
        else {
            return self.visit(&reduced);
        };
        if when.is_empty() || when.len() != then.len() {
            return Err(XlateError::arity(
                "CASE",
                format!("{} THEN branches", when.len()),
                then.len(),
            ));
        }

        let mut parts = vec![SqlExpr::literal("CASE")];
        for (w, t) in when.iter().zip(then) {
            parts.push(SqlExpr::literal(" WHEN ("));
            parts.push(self.visit(w)?);
            parts.push(SqlExpr::literal(") THEN ("));
            parts.push(self.visit(t)?);
            parts.push(SqlExpr::literal(")"));
        }
        if !matches!(**otherwise, Expr::Null(_)) {
            parts.push(SqlExpr::literal(" ELSE ("));
            parts.push(self.visit(otherwise)?);
            parts.push(SqlExpr::literal(")"));
        }
        parts.push(SqlExpr::literal(" END"));
        Ok(SqlExpr::Seq(parts))
    }

    /// A `Limit` used as a value: the subquery must expose exactly the first
    /// column of its innermost projection, so that column is carried through
    /// every wrapper stage.
    fn visit_scalar_limit(&mut self, expr: &Expr) -> XlateResult<SqlExpr> {
        let alias = self.next_alias();
        let node = self.visit_input_with_binding(expr, &alias)?;
        let selects = self.nodes[node].selects.clone();

        let first = self.stages[selects[0].stage]
            .projection
            .as_ref()
            .and_then(|columns| columns.first())
            .map(|column| column.name.clone());
        if let Some(mut name) = first {
            let mut from = selects[0].name.clone();
            for item in &selects[1..] {
                let counter = &mut self.alias_counter;
                name = self.stages[item.stage].pull_up_column(&from, &name, || next_alias(counter));
                from = item.name.clone();
            }
        }
        Ok(SqlExpr::Stage(self.nodes[node].last().stage))
    }

    fn visit_property(&mut self, instance: &Expr, name: &str) -> XlateResult<SqlExpr> {
        match &self.mode {
            PropertyMode::Target(target) => match instance {
                Expr::VariableRef { name: var, .. } if var == target => {
                    Ok(SqlExpr::Property(name.to_string()))
                }
                other => Err(XlateError::binding(
                    describe(other),
                    format!("only columns of the target '{}' can be referenced here", target),
                )),
            },
            PropertyMode::Query => self.resolve_column(instance, name),
        }
    }

    /// Resolve `binding.name` to a column reference valid in the current
    /// scope, projecting it through every stage closed in between.
    fn resolve_column(&mut self, instance: &Expr, name: &str) -> XlateResult<SqlExpr> {
        // `Join1.Extent1.Name` names the join member, which is itself a binding.
        let binding = match instance {
            Expr::VariableRef { name, .. } | Expr::Property { name, .. } => name,
            other => {
                return Err(XlateError::unsupported(format!(
                    "property access on {:?}",
                    other.kind()
                )));
            }
        };
        let mut node = *self.bindings.get(binding.as_str()).ok_or_else(|| {
            XlateError::binding(binding.clone(), "no input is bound to this name")
        })?;

        let mut from = self.nodes[node].top_name().to_string();
        let mut name = name.to_string();
        loop {
            let selects = self.nodes[node].selects.clone();
            for item in &selects {
                if self.is_in_scope(item.stage) {
                    return Ok(SqlExpr::column_ref(from, name));
                }
                let counter = &mut self.alias_counter;
                name = self.stages[item.stage].pull_up_column(&from, &name, || next_alias(counter));
                from = item.name.clone();
            }
            match self.nodes[node].join_parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
        Ok(SqlExpr::column_ref(from, name))
    }
}

fn comparison_operator(op: ComparisonOp) -> Operator {
    match op {
        ComparisonOp::Equals => Operator::Equals,
        ComparisonOp::NotEquals => Operator::NotEquals,
        ComparisonOp::LessThan => Operator::LessThan,
        ComparisonOp::LessThanOrEquals => Operator::LessThanOrEquals,
        ComparisonOp::GreaterThan => Operator::GreaterThan,
        ComparisonOp::GreaterThanOrEquals => Operator::GreaterThanOrEquals,
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::VariableRef { name, .. } | Expr::Property { name, .. } => name.clone(),
        other => format!("{:?}", other.kind()),
    }
}
