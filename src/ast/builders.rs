//! Ergonomic constructors for command trees.
//!
//! ```
//! use pgxlate::ast::builders::*;
//! use pgxlate::ast::PrimitiveKind;
//!
//! let blogs = scan("dbo", "Blogs")
//!     .with_column("Name", PrimitiveKind::String)
//!     .with_column("Rating", PrimitiveKind::Int32);
//! let input = blogs.bind("Extent1");
//! let predicate = lt(input.var_ref().prop("Rating"), constant(3));
//! let query = filter(input, predicate);
//! assert!(query.is_relational());
//! ```

use super::expr::{
    Aggregate, ArithmeticOp, Binding, ComparisonOp, EntitySet, Expr, Function, GroupBinding,
    JoinKind, SetOpKind, SortKey,
};
use super::types::{Member, PrimitiveKind, TypeUsage};
use super::values::Value;

/// Scan of `schema.table`.
pub fn scan(container: &str, name: &str) -> Expr {
    Expr::Scan(EntitySet {
        name: name.to_string(),
        container: container.to_string(),
        annotations: Default::default(),
        columns: Vec::new(),
    })
}

impl Expr {
    /// Declare a column on a scan. No-op for other nodes.
    pub fn with_column(mut self, name: &str, ty: impl Into<TypeUsage>) -> Self {
        if let Expr::Scan(set) = &mut self {
            set.columns.push(Member::new(name, ty.into()));
        }
        self
    }

    /// Apply `f` to the annotations of a scan. No-op for other nodes.
    pub fn annotate(mut self, f: impl FnOnce(&mut super::expr::TableAnnotations)) -> Self {
        if let Expr::Scan(set) = &mut self {
            f(&mut set.annotations);
        }
        self
    }

    pub fn bind(self, var: &str) -> Binding {
        Binding::new(self, var)
    }

    pub fn group_bind(self, var: &str, group_var: &str) -> GroupBinding {
        GroupBinding::new(self, var, group_var)
    }

    /// Member access. The member type comes from the instance's row type,
    /// falling back to `String` for undeclared members.
    pub fn prop(self, name: &str) -> Expr {
        let ty = self
            .result_type()
            .members()
            .and_then(|members| members.iter().find(|m| m.name == name))
            .map(|m| m.ty.clone())
            .unwrap_or_else(TypeUsage::string);
        Expr::Property {
            instance: Box::new(self),
            name: name.to_string(),
            ty,
        }
    }
}

pub fn filter(input: Binding, predicate: Expr) -> Expr {
    Expr::Filter {
        input,
        predicate: Box::new(predicate),
    }
}

/// Row constructor whose member names and types follow `columns`.
pub fn row(columns: Vec<(&str, Expr)>) -> Expr {
    let members = columns
        .iter()
        .map(|(name, expr)| Member::new(*name, expr.result_type()))
        .collect();
    Expr::NewInstance {
        ty: TypeUsage::row(members),
        args: columns.into_iter().map(|(_, expr)| expr).collect(),
    }
}

pub fn project(input: Binding, columns: Vec<(&str, Expr)>) -> Expr {
    Expr::Project {
        input,
        projection: Box::new(row(columns)),
    }
}

pub fn asc(expr: Expr) -> SortKey {
    SortKey {
        expr,
        ascending: true,
    }
}

pub fn desc(expr: Expr) -> SortKey {
    SortKey {
        expr,
        ascending: false,
    }
}

pub fn sort(input: Binding, keys: Vec<SortKey>) -> Expr {
    Expr::Sort { input, keys }
}

pub fn skip(input: Binding, keys: Vec<SortKey>, count: Expr) -> Expr {
    Expr::Skip {
        input,
        keys,
        count: Box::new(count),
    }
}

pub fn limit(input: Expr, count: Expr) -> Expr {
    Expr::Limit {
        input: Box::new(input),
        limit: Box::new(count),
    }
}

pub fn distinct(input: Expr) -> Expr {
    Expr::Distinct(Box::new(input))
}

pub fn element(input: Expr) -> Expr {
    Expr::Element(Box::new(input))
}

pub fn join(kind: JoinKind, left: Binding, right: Binding, condition: Option<Expr>) -> Expr {
    Expr::Join {
        kind,
        left,
        right,
        condition: condition.map(Box::new),
    }
}

pub fn inner_join(left: Binding, right: Binding, condition: Expr) -> Expr {
    join(JoinKind::Inner, left, right, Some(condition))
}

pub fn set_op(kind: SetOpKind, left: Expr, right: Expr) -> Expr {
    Expr::SetOp {
        kind,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn union_all(left: Expr, right: Expr) -> Expr {
    set_op(SetOpKind::UnionAll, left, right)
}

/// Grouping with named key and aggregate columns.
pub fn group_by(
    input: GroupBinding,
    keys: Vec<(&str, Expr)>,
    aggregates: Vec<(&str, Aggregate)>,
) -> Expr {
    let mut members: Vec<Member> = keys
        .iter()
        .map(|(name, expr)| Member::new(*name, expr.result_type()))
        .collect();
    members.extend(
        aggregates
            .iter()
            .map(|(name, agg)| Member::new(*name, agg.result_type.clone())),
    );
    Expr::GroupBy {
        input,
        keys: keys.into_iter().map(|(_, expr)| expr).collect(),
        aggregates: aggregates.into_iter().map(|(_, agg)| agg).collect(),
        result_type: TypeUsage::collection(TypeUsage::row(members)),
    }
}

pub fn aggregate(name: &str, arg: Expr, result: impl Into<TypeUsage>) -> Aggregate {
    Aggregate {
        function: Function::canonical(name),
        args: vec![arg],
        distinct: false,
        result_type: result.into(),
    }
}

impl Aggregate {
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

pub fn constant(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

pub fn null(ty: impl Into<TypeUsage>) -> Expr {
    Expr::Null(ty.into())
}

pub fn param(name: &str, ty: impl Into<TypeUsage>) -> Expr {
    Expr::ParameterRef {
        name: name.to_string(),
        ty: ty.into(),
    }
}

pub fn var(name: &str, ty: impl Into<TypeUsage>) -> Expr {
    Expr::VariableRef {
        name: name.to_string(),
        ty: ty.into(),
    }
}

pub fn cast(argument: Expr, ty: impl Into<TypeUsage>) -> Expr {
    Expr::Cast {
        argument: Box::new(argument),
        ty: ty.into(),
    }
}

fn comparison(op: ComparisonOp, left: Expr, right: Expr) -> Expr {
    Expr::Comparison {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    comparison(ComparisonOp::Equals, left, right)
}

pub fn ne(left: Expr, right: Expr) -> Expr {
    comparison(ComparisonOp::NotEquals, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    comparison(ComparisonOp::LessThan, left, right)
}

pub fn le(left: Expr, right: Expr) -> Expr {
    comparison(ComparisonOp::LessThanOrEquals, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    comparison(ComparisonOp::GreaterThan, left, right)
}

pub fn ge(left: Expr, right: Expr) -> Expr {
    comparison(ComparisonOp::GreaterThanOrEquals, left, right)
}

fn arithmetic(op: ArithmeticOp, args: Vec<Expr>) -> Expr {
    Expr::Arithmetic { op, args }
}

pub fn add(left: Expr, right: Expr) -> Expr {
    arithmetic(ArithmeticOp::Plus, vec![left, right])
}

pub fn sub(left: Expr, right: Expr) -> Expr {
    arithmetic(ArithmeticOp::Minus, vec![left, right])
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    arithmetic(ArithmeticOp::Multiply, vec![left, right])
}

pub fn div(left: Expr, right: Expr) -> Expr {
    arithmetic(ArithmeticOp::Divide, vec![left, right])
}

pub fn neg(arg: Expr) -> Expr {
    arithmetic(ArithmeticOp::UnaryMinus, vec![arg])
}

pub fn and(left: Expr, right: Expr) -> Expr {
    Expr::And(Box::new(left), Box::new(right))
}

pub fn or(left: Expr, right: Expr) -> Expr {
    Expr::Or(Box::new(left), Box::new(right))
}

pub fn not(arg: Expr) -> Expr {
    Expr::Not(Box::new(arg))
}

pub fn is_null(arg: Expr) -> Expr {
    Expr::IsNull(Box::new(arg))
}

pub fn is_empty(arg: Expr) -> Expr {
    Expr::IsEmpty(Box::new(arg))
}

pub fn like(argument: Expr, pattern: Expr) -> Expr {
    Expr::Like {
        argument: Box::new(argument),
        pattern: Box::new(pattern),
    }
}

pub fn in_list(item: Expr, list: Vec<Expr>) -> Expr {
    Expr::In {
        item: Box::new(item),
        list,
    }
}

pub fn case(branches: Vec<(Expr, Expr)>, otherwise: Expr) -> Expr {
    let (when, then) = branches.into_iter().unzip();
    Expr::Case {
        when,
        then,
        otherwise: Box::new(otherwise),
    }
}

/// Call of a canonical function.
pub fn call(name: &str, args: Vec<Expr>, result: impl Into<TypeUsage>) -> Expr {
    Expr::Function {
        function: Function::canonical(name),
        args,
        result_type: result.into(),
    }
}

/// Call of a PostgreSQL-specific function.
pub fn store_call(name: &str, args: Vec<Expr>, result: impl Into<TypeUsage>) -> Expr {
    Expr::Function {
        function: Function::store(name),
        args,
        result_type: result.into(),
    }
}

/// Shorthand for a primitive type usage.
pub fn ty(kind: PrimitiveKind) -> TypeUsage {
    TypeUsage::primitive(kind)
}
