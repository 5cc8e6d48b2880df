//! Command-tree expression nodes.
//!
//! One closed sum type covers both relational nodes (which produce a row
//! stream) and scalar nodes (which produce a single value per row).

use serde::{Deserialize, Serialize};

use super::types::{Member, PrimitiveKind, TypeUsage};
use super::values::Value;

/// Namespace of the store-independent canonical functions.
pub const CANONICAL_NAMESPACE: &str = "Edm";
/// Namespace of PostgreSQL-specific functions.
pub const STORE_NAMESPACE: &str = "Postgres";

/// Table-mapping annotations attached to an entity set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableAnnotations {
    pub table: Option<String>,
    pub schema: Option<String>,
    /// Name override written by the store schema generator; wins over `table`.
    pub store_name: Option<String>,
    /// Schema override written by the store schema generator; wins over `schema`.
    pub store_schema: Option<String>,
    /// Raw SQL that stands in for the table.
    pub defining_query: Option<String>,
}

/// A scan target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub name: String,
    pub container: String,
    #[serde(default)]
    pub annotations: TableAnnotations,
    #[serde(default)]
    pub columns: Vec<Member>,
}

/// A relational input paired with the variable name its rows are bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub expr: Box<Expr>,
    pub var: String,
}

/// Input of a grouping: the row variable plus the group variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBinding {
    pub expr: Box<Expr>,
    pub var: String,
    pub group_var: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Function {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// Name to emit when it differs from `name`.
    #[serde(default)]
    pub store_name: Option<String>,
}

impl Function {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            schema: None,
            store_name: None,
        }
    }

    pub fn canonical(name: impl Into<String>) -> Self {
        Self::new(CANONICAL_NAMESPACE, name)
    }

    pub fn store(name: impl Into<String>) -> Self {
        Self::new(STORE_NAMESPACE, name)
    }

    pub fn is_canonical(&self) -> bool {
        self.namespace == CANONICAL_NAMESPACE
    }

    pub fn is_store(&self) -> bool {
        self.namespace == STORE_NAMESPACE
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: Function,
    pub args: Vec<Expr>,
    #[serde(default)]
    pub distinct: bool,
    pub result_type: TypeUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    FullOuter,
    Cross,
    CrossApply,
    OuterApply,
}

impl JoinKind {
    pub fn is_apply(self) -> bool {
        matches!(self, JoinKind::CrossApply | JoinKind::OuterApply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpKind {
    UnionAll,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    UnaryMinus,
}

/// A command-tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // Relational
    Scan(EntitySet),
    Filter {
        input: Binding,
        predicate: Box<Expr>,
    },
    Project {
        input: Binding,
        projection: Box<Expr>,
    },
    Sort {
        input: Binding,
        keys: Vec<SortKey>,
    },
    Skip {
        input: Binding,
        keys: Vec<SortKey>,
        count: Box<Expr>,
    },
    Limit {
        input: Box<Expr>,
        limit: Box<Expr>,
    },
    Distinct(Box<Expr>),
    GroupBy {
        input: GroupBinding,
        keys: Vec<Expr>,
        aggregates: Vec<Aggregate>,
        result_type: TypeUsage,
    },
    Join {
        kind: JoinKind,
        left: Binding,
        right: Binding,
        condition: Option<Box<Expr>>,
    },
    SetOp {
        kind: SetOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    NewInstance {
        ty: TypeUsage,
        args: Vec<Expr>,
    },
    Element(Box<Expr>),
    Function {
        function: Function,
        args: Vec<Expr>,
        result_type: TypeUsage,
    },

    // Scalar
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithmeticOp,
        args: Vec<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsEmpty(Box<Expr>),
    Like {
        argument: Box<Expr>,
        pattern: Box<Expr>,
    },
    In {
        item: Box<Expr>,
        list: Vec<Expr>,
    },
    Cast {
        argument: Box<Expr>,
        ty: TypeUsage,
    },
    Case {
        when: Vec<Expr>,
        then: Vec<Expr>,
        otherwise: Box<Expr>,
    },
    Constant(Value),
    Null(TypeUsage),
    ParameterRef {
        name: String,
        ty: TypeUsage,
    },
    VariableRef {
        name: String,
        ty: TypeUsage,
    },
    Property {
        instance: Box<Expr>,
        name: String,
        ty: TypeUsage,
    },
}

/// Flat discriminant of [`Expr`], with comparison and arithmetic operators
/// spelled out as distinct kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Scan,
    Filter,
    Project,
    Sort,
    Skip,
    Limit,
    Distinct,
    GroupBy,
    Join(JoinKind),
    SetOp(SetOpKind),
    NewInstance,
    Element,
    Function,
    Comparison(ComparisonOp),
    Arithmetic(ArithmeticOp),
    And,
    Or,
    Not,
    IsNull,
    IsEmpty,
    Like,
    In,
    Cast,
    Case,
    Constant,
    Null,
    ParameterRef,
    VariableRef,
    Property,
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Scan(_) => ExprKind::Scan,
            Expr::Filter { .. } => ExprKind::Filter,
            Expr::Project { .. } => ExprKind::Project,
            Expr::Sort { .. } => ExprKind::Sort,
            Expr::Skip { .. } => ExprKind::Skip,
            Expr::Limit { .. } => ExprKind::Limit,
            Expr::Distinct(_) => ExprKind::Distinct,
            Expr::GroupBy { .. } => ExprKind::GroupBy,
            Expr::Join { kind, .. } => ExprKind::Join(*kind),
            Expr::SetOp { kind, .. } => ExprKind::SetOp(*kind),
            Expr::NewInstance { .. } => ExprKind::NewInstance,
            Expr::Element(_) => ExprKind::Element,
            Expr::Function { .. } => ExprKind::Function,
            Expr::Comparison { op, .. } => ExprKind::Comparison(*op),
            Expr::Arithmetic { op, .. } => ExprKind::Arithmetic(*op),
            Expr::And(..) => ExprKind::And,
            Expr::Or(..) => ExprKind::Or,
            Expr::Not(_) => ExprKind::Not,
            Expr::IsNull(_) => ExprKind::IsNull,
            Expr::IsEmpty(_) => ExprKind::IsEmpty,
            Expr::Like { .. } => ExprKind::Like,
            Expr::In { .. } => ExprKind::In,
            Expr::Cast { .. } => ExprKind::Cast,
            Expr::Case { .. } => ExprKind::Case,
            Expr::Constant(_) => ExprKind::Constant,
            Expr::Null(_) => ExprKind::Null,
            Expr::ParameterRef { .. } => ExprKind::ParameterRef,
            Expr::VariableRef { .. } => ExprKind::VariableRef,
            Expr::Property { .. } => ExprKind::Property,
        }
    }

    /// True for nodes that produce a row stream.
    pub fn is_relational(&self) -> bool {
        match self {
            Expr::Scan(_)
            | Expr::Filter { .. }
            | Expr::Project { .. }
            | Expr::Sort { .. }
            | Expr::Skip { .. }
            | Expr::Limit { .. }
            | Expr::Distinct(_)
            | Expr::GroupBy { .. }
            | Expr::Join { .. }
            | Expr::SetOp { .. } => true,
            Expr::NewInstance { ty, .. } => ty.element_type().is_some(),
            Expr::Function { result_type, .. } => result_type.element_type().is_some(),
            _ => false,
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Expr::Join { .. })
    }

    /// The result shape of this node: a collection of rows for relational
    /// nodes, a single type for scalar nodes.
    pub fn result_type(&self) -> TypeUsage {
        match self {
            Expr::Scan(set) => TypeUsage::collection(TypeUsage::row(set.columns.clone())),
            Expr::Filter { input, .. }
            | Expr::Sort { input, .. }
            | Expr::Skip { input, .. } => input.expr.result_type(),
            Expr::Limit { input, .. } | Expr::Distinct(input) => input.result_type(),
            Expr::Project { projection, .. } => TypeUsage::collection(projection.result_type()),
            Expr::GroupBy { result_type, .. } | Expr::Function { result_type, .. } => {
                result_type.clone()
            }
            Expr::Join { left, right, .. } => TypeUsage::collection(TypeUsage::row(vec![
                Member::new(left.var.clone(), left.element_type()),
                Member::new(right.var.clone(), right.element_type()),
            ])),
            Expr::SetOp { left, .. } => left.result_type(),
            Expr::NewInstance { ty, .. } => ty.clone(),
            Expr::Element(input) => input
                .result_type()
                .element_type()
                .cloned()
                .unwrap_or_else(|| input.result_type()),
            Expr::Comparison { .. }
            | Expr::And(..)
            | Expr::Or(..)
            | Expr::Not(_)
            | Expr::IsNull(_)
            | Expr::IsEmpty(_)
            | Expr::Like { .. }
            | Expr::In { .. } => TypeUsage::boolean(),
            Expr::Arithmetic { args, .. } => args
                .first()
                .map(Expr::result_type)
                .unwrap_or_else(|| TypeUsage::primitive(PrimitiveKind::Int32)),
            Expr::Cast { ty, .. }
            | Expr::Null(ty)
            | Expr::ParameterRef { ty, .. }
            | Expr::VariableRef { ty, .. }
            | Expr::Property { ty, .. } => ty.clone(),
            Expr::Case { then, otherwise, .. } => then
                .first()
                .map(Expr::result_type)
                .unwrap_or_else(|| otherwise.result_type()),
            Expr::Constant(value) => TypeUsage::primitive(value.kind()),
        }
    }
}

impl Binding {
    pub fn new(expr: Expr, var: impl Into<String>) -> Self {
        Self {
            expr: Box::new(expr),
            var: var.into(),
        }
    }

    /// Row type the bound variable ranges over.
    pub fn element_type(&self) -> TypeUsage {
        let ty = self.expr.result_type();
        ty.element_type().cloned().unwrap_or(ty)
    }

    /// A reference to the bound variable.
    pub fn var_ref(&self) -> Expr {
        Expr::VariableRef {
            name: self.var.clone(),
            ty: self.element_type(),
        }
    }
}

impl GroupBinding {
    pub fn new(expr: Expr, var: impl Into<String>, group_var: impl Into<String>) -> Self {
        Self {
            expr: Box::new(expr),
            var: var.into(),
            group_var: group_var.into(),
        }
    }

    pub fn element_type(&self) -> TypeUsage {
        let ty = self.expr.result_type();
        ty.element_type().cloned().unwrap_or(ty)
    }

    pub fn var_ref(&self) -> Expr {
        Expr::VariableRef {
            name: self.var.clone(),
            ty: self.element_type(),
        }
    }

    pub fn group_var_ref(&self) -> Expr {
        Expr::VariableRef {
            name: self.group_var.clone(),
            ty: self.element_type(),
        }
    }
}
