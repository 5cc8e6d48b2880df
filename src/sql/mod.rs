//! SQL expression tree produced by the translator.
//!
//! Nodes are plain data; [`SqlExpr::write_sql`] renders them against the
//! [`Stages`] arena that owns every `SELECT` stage of one translation.

pub mod operators;
pub mod stage;

use crate::ast::{TypeUsage, Value};
use crate::dialect::{literal, write_identifier};
use crate::error::{XlateError, XlateResult};

pub use operators::{Fixity, Operator, Precedence};
pub use stage::{
    FromExpr, FromSource, InputExpr, JoinExpr, JoinOperand, OrderItem, StageFrom, StageId, Stages,
};

/// A rendered-on-demand SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// Verbatim text.
    Literal(String),
    /// Fragments written back to back.
    Seq(Vec<SqlExpr>),
    /// Fragments separated by `, `.
    List(Vec<SqlExpr>),
    Parenthesized(Box<SqlExpr>),
    Constant(Value),
    Column(Box<ColumnExpr>),
    /// `"variable"."name"`
    ColumnRef { variable: String, name: String },
    /// Unqualified `"name"`, used against a DML target.
    Property(String),
    Function { name: String, args: Vec<SqlExpr> },
    Cast { value: Box<SqlExpr>, ty: String },
    Operator(Box<OperatorExpr>),
    Exists(Box<SqlExpr>),
    /// A whole `SELECT` stage.
    Stage(StageId),
}

/// `<expr> AS "name"` in a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnExpr {
    pub expr: SqlExpr,
    pub name: String,
    pub ty: TypeUsage,
}

impl ColumnExpr {
    pub fn new(expr: SqlExpr, name: impl Into<String>, ty: TypeUsage) -> Self {
        Self {
            expr,
            name: name.into(),
            ty,
        }
    }

    pub fn write_sql(&self, stages: &Stages, out: &mut String) {
        self.expr.write_sql(stages, out);
        let same_name = matches!(&self.expr, SqlExpr::ColumnRef { name, .. } if *name == self.name);
        if !same_name {
            out.push_str(" AS ");
            write_identifier(&self.name, out);
        }
    }
}

/// An operator application with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorExpr {
    pub op: Operator,
    pub regime: Precedence,
    pub left: Option<SqlExpr>,
    pub right: Option<SqlExpr>,
}

impl SqlExpr {
    pub fn literal(text: impl Into<String>) -> Self {
        SqlExpr::Literal(text.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn cast(value: SqlExpr, ty: impl Into<String>) -> Self {
        SqlExpr::Cast {
            value: Box::new(value),
            ty: ty.into(),
        }
    }

    pub fn parenthesized(inner: SqlExpr) -> Self {
        SqlExpr::Parenthesized(Box::new(inner))
    }

    pub fn column_ref(variable: impl Into<String>, name: impl Into<String>) -> Self {
        SqlExpr::ColumnRef {
            variable: variable.into(),
            name: name.into(),
        }
    }

    /// `self` followed by a verbatim suffix, e.g. a `::int4` cast.
    pub fn then(self, suffix: &str) -> Self {
        match self {
            SqlExpr::Seq(mut parts) => {
                parts.push(SqlExpr::literal(suffix));
                SqlExpr::Seq(parts)
            }
            other => SqlExpr::Seq(vec![other, SqlExpr::literal(suffix)]),
        }
    }

    pub fn binary(op: Operator, regime: Precedence, left: SqlExpr, right: SqlExpr) -> XlateResult<Self> {
        Self::operator(op, regime, Some(left), Some(right))
    }

    pub fn prefix(op: Operator, regime: Precedence, operand: SqlExpr) -> XlateResult<Self> {
        Self::operator(op, regime, None, Some(operand))
    }

    pub fn postfix(op: Operator, regime: Precedence, operand: SqlExpr) -> XlateResult<Self> {
        Self::operator(op, regime, Some(operand), None)
    }

    fn operator(
        op: Operator,
        regime: Precedence,
        left: Option<SqlExpr>,
        right: Option<SqlExpr>,
    ) -> XlateResult<Self> {
        let shape_ok = match op.fixity() {
            Fixity::Binary => left.is_some() && right.is_some(),
            Fixity::Prefix => left.is_none() && right.is_some(),
            Fixity::Postfix => left.is_some() && right.is_none(),
        };
        if !shape_ok {
            let expected = match op.fixity() {
                Fixity::Binary => "2 operands",
                Fixity::Prefix | Fixity::Postfix => "1 operand",
            };
            let actual = usize::from(left.is_some()) + usize::from(right.is_some());
            return Err(XlateError::arity(format!("operator {}", op.info().symbol), expected, actual));
        }
        Ok(SqlExpr::Operator(Box::new(OperatorExpr {
            op,
            regime,
            left,
            right,
        })))
    }

    /// Logical complement: swap a negatable operator, strip a `NOT`, or
    /// wrap in `NOT`. Never fails.
    pub fn negate(self, regime: Precedence) -> SqlExpr {
        match self {
            SqlExpr::Operator(mut expr) => {
                if let Some(opposite) = expr.op.negated() {
                    expr.op = opposite;
                    return SqlExpr::Operator(expr);
                }
                if expr.op == Operator::Not {
                    if let Some(inner) = expr.right.take() {
                        return inner;
                    }
                }
                Self::not(SqlExpr::Operator(expr), regime)
            }
            other => Self::not(other, regime),
        }
    }

    fn not(operand: SqlExpr, regime: Precedence) -> SqlExpr {
        SqlExpr::Operator(Box::new(OperatorExpr {
            op: Operator::Not,
            regime,
            left: None,
            right: Some(operand),
        }))
    }

    pub fn as_operator(&self) -> Option<&OperatorExpr> {
        match self {
            SqlExpr::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Render to a fresh string.
    pub fn to_sql(&self, stages: &Stages) -> String {
        let mut out = String::new();
        self.write_sql(stages, &mut out);
        out
    }

    pub fn write_sql(&self, stages: &Stages, out: &mut String) {
        match self {
            SqlExpr::Literal(text) => out.push_str(text),
            SqlExpr::Seq(parts) => {
                for part in parts {
                    part.write_sql(stages, out);
                }
            }
            SqlExpr::List(items) => write_list(items, stages, out),
            SqlExpr::Parenthesized(inner) => {
                out.push('(');
                inner.write_sql(stages, out);
                out.push(')');
            }
            SqlExpr::Constant(value) => literal::write_value(value, out),
            SqlExpr::Column(column) => column.write_sql(stages, out),
            SqlExpr::ColumnRef { variable, name } => {
                write_identifier(variable, out);
                out.push('.');
                write_identifier(name, out);
            }
            SqlExpr::Property(name) => write_identifier(name, out),
            SqlExpr::Function { name, args } => {
                out.push_str(name);
                out.push('(');
                write_list(args, stages, out);
                out.push(')');
            }
            SqlExpr::Cast { value, ty } => {
                out.push_str("CAST(");
                value.write_sql(stages, out);
                out.push_str(" AS ");
                out.push_str(ty);
                out.push(')');
            }
            SqlExpr::Operator(expr) => expr.write_sql(stages, out, None),
            SqlExpr::Exists(inner) => {
                out.push_str("EXISTS (");
                inner.write_sql(stages, out);
                out.push(')');
            }
            SqlExpr::Stage(id) => stages[*id].write_sql(stages, out),
        }
    }
}

fn write_list(items: &[SqlExpr], stages: &Stages, out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_sql(stages, out);
    }
}

impl OperatorExpr {
    /// Render with parentheses exactly where the active regime needs them.
    ///
    /// `right_parent` is the nearest enclosing operator whose right-hand
    /// side continues after this expression; it decides whether a trailing
    /// prefix operand may stay unparenthesized.
    fn write_sql(&self, stages: &Stages, out: &mut String, right_parent: Option<&OperatorExpr>) {
        let regime = self.regime;
        let op = self.op;
        let right_assoc = op.info().right_assoc;
        let non_assoc = op.is_non_assoc(regime);
        let left_op = self.left.as_ref().and_then(SqlExpr::as_operator);
        let right_op = self.right.as_ref().and_then(SqlExpr::as_operator);

        let wrap_left = left_op.is_some_and(|l| {
            let (child, parent) = (l.op.right_power(regime), op.left_power(regime));
            child < parent || (child == parent && (right_assoc || non_assoc))
        });
        let mut wrap_right = right_op.is_some_and(|r| {
            let (child, parent) = (r.op.left_power(regime), op.right_power(regime));
            child < parent || (child == parent && (!right_assoc || non_assoc))
        });

        // A trailing prefix operator cannot capture anything to its right,
        // so it only needs parentheses if the enclosing context binds tighter.
        if let Some(r) = right_op {
            if wrap_right && r.left.is_none() {
                let fits = match right_parent {
                    None => true,
                    Some(rp) => {
                        let (child, parent) = (r.op.right_power(regime), rp.op.left_power(regime));
                        if rp.op.info().right_assoc {
                            child > parent
                        } else {
                            child >= parent
                        }
                    }
                };
                if fits {
                    wrap_right = false;
                }
            }
        }

        if let Some(left) = &self.left {
            if wrap_left {
                out.push('(');
            }
            match left_op {
                Some(l) if !wrap_left => l.write_sql(stages, out, Some(self)),
                _ => left.write_sql(stages, out),
            }
            if wrap_left {
                out.push(')');
            }
        }

        out.push_str(&op.text());

        if let Some(right) = &self.right {
            if wrap_right {
                out.push('(');
            }
            match right_op {
                Some(r) if !wrap_right => r.write_sql(stages, out, right_parent),
                _ => right.write_sql(stages, out),
            }
            if wrap_right {
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests;
