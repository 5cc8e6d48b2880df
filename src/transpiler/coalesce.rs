//! `CASE WHEN x IS NULL THEN y ELSE x END` → `coalesce(x, y)`.
//!
//! Rewriting is bottom-up over CASE branches and IS NULL arguments, and
//! adjacent coalesce calls are flattened one level, so a chain of nested
//! null checks collapses into a single `coalesce(a, b, c)`.

use crate::ast::{Expr, Function};

const COALESCE: &str = "coalesce";

/// Rewrite `expr` if it is a reducible CASE; anything else is returned as is.
pub fn reduce(expr: &Expr) -> Expr {
    match expr {
        Expr::Case {
            when,
            then,
            otherwise,
        } => reduce_case(
            when.iter().map(reduce).collect(),
            then.iter().map(reduce).collect(),
            reduce(otherwise),
        ),
        Expr::IsNull(arg) => Expr::IsNull(Box::new(reduce(arg))),
        other => other.clone(),
    }
}

fn reduce_case(mut when: Vec<Expr>, mut then: Vec<Expr>, otherwise: Expr) -> Expr {
    let reducible = matches!(
        (when.last(), then.last()),
        (Some(Expr::IsNull(arg)), Some(_)) if when.len() == then.len() && deep_equal(arg, &otherwise)
    );
    if reducible {
        if let (Some(Expr::IsNull(arg)), Some(fallback)) = (when.pop(), then.pop()) {
            tracing::trace!(remaining = when.len(), "collapsed IS NULL branch into coalesce");
            let merged = coalesce(*arg, fallback);
            return if when.is_empty() {
                merged
            } else {
                reduce_case(when, then, merged)
            };
        }
    }
    Expr::Case {
        when,
        then,
        otherwise: Box::new(otherwise),
    }
}

fn coalesce(arg: Expr, fallback: Expr) -> Expr {
    let result_type = arg.result_type();
    let mut args = Vec::new();
    for expr in [arg, fallback] {
        match expr {
            Expr::Function {
                function,
                args: inner,
                ..
            } if is_coalesce(&function) => args.extend(inner),
            other => args.push(other),
        }
    }
    Expr::Function {
        function: Function::store(COALESCE),
        args,
        result_type,
    }
}

fn is_coalesce(function: &Function) -> bool {
    function.is_store() && function.name == COALESCE
}

/// Structural equality narrow enough to be cheap: expressions of the same
/// kind and result type whose relevant parts match. Kinds not listed are
/// never equal unless they are the same node.
pub fn deep_equal(a: &Expr, b: &Expr) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    if a.kind() != b.kind() || !a.result_type().same_type(&b.result_type()) {
        return false;
    }
    match (a, b) {
        (
            Expr::Function {
                function: f1,
                args: a1,
                ..
            },
            Expr::Function {
                function: f2,
                args: a2,
                ..
            },
        ) => f1.namespace == f2.namespace && f1.name == f2.name && all_equal(a1, a2),
        (Expr::Constant(v1), Expr::Constant(v2)) => v1 == v2,
        (
            Expr::Comparison {
                left: l1,
                right: r1,
                ..
            },
            Expr::Comparison {
                left: l2,
                right: r2,
                ..
            },
        )
        | (Expr::And(l1, r1), Expr::And(l2, r2))
        | (Expr::Or(l1, r1), Expr::Or(l2, r2)) => deep_equal(l1, l2) && deep_equal(r1, r2),
        (Expr::Arithmetic { args: a1, .. }, Expr::Arithmetic { args: a2, .. }) => all_equal(a1, a2),
        (Expr::Not(x), Expr::Not(y)) | (Expr::IsNull(x), Expr::IsNull(y)) => deep_equal(x, y),
        (Expr::Cast { argument: x, .. }, Expr::Cast { argument: y, .. }) => deep_equal(x, y),
        (
            Expr::Property {
                instance: i1,
                name: n1,
                ..
            },
            Expr::Property {
                instance: i2,
                name: n2,
                ..
            },
        ) => n1 == n2 && deep_equal(i1, i2),
        (Expr::VariableRef { name: n1, .. }, Expr::VariableRef { name: n2, .. })
        | (Expr::ParameterRef { name: n1, .. }, Expr::ParameterRef { name: n2, .. }) => n1 == n2,
        _ => false,
    }
}

fn all_equal(a: &[Expr], b: &[Expr]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::builders::*;
    use crate::ast::PrimitiveKind;

    fn int() -> crate::ast::TypeUsage {
        ty(PrimitiveKind::Int32)
    }

    fn x() -> Expr {
        param("x", int())
    }

    fn y() -> Expr {
        param("y", int())
    }

    fn coalesce_of(args: Vec<Expr>) -> Expr {
        Expr::Function {
            function: Function::store(COALESCE),
            args,
            result_type: int(),
        }
    }

    #[test]
    fn test_single_branch_becomes_coalesce() {
        let expr = case(vec![(is_null(x()), y())], x());
        assert_eq!(reduce(&expr), coalesce_of(vec![x(), y()]));
    }

    #[test]
    fn test_nested_chain_flattens() {
        let z = param("z", int());
        let inner = case(vec![(is_null(y()), z.clone())], y());
        let outer = case(vec![(is_null(x()), inner)], x());
        assert_eq!(reduce(&outer), coalesce_of(vec![x(), y(), z]));
    }

    #[test]
    fn test_earlier_branches_survive() {
        let flag = param("flag", ty(PrimitiveKind::Boolean));
        let one = constant(1);
        let expr = case(vec![(flag.clone(), one.clone()), (is_null(x()), y())], x());
        assert_eq!(
            reduce(&expr),
            case(vec![(flag, one)], coalesce_of(vec![x(), y()]))
        );
    }

    #[test]
    fn test_mismatched_else_is_kept() {
        let expr = case(vec![(is_null(x()), y())], y());
        assert_eq!(reduce(&expr), expr);
    }

    #[test]
    fn test_references_compare_both_names() {
        let a = var("a", int());
        let b = var("b", int());
        assert!(deep_equal(&a, &var("a", int())));
        assert!(!deep_equal(&a, &b));
        assert!(!deep_equal(&x(), &y()));
        // Same name, different type.
        assert!(!deep_equal(&a, &var("a", ty(PrimitiveKind::Int64))));
    }

    #[test]
    fn test_deep_equal_structural_cases() {
        assert!(deep_equal(&add(x(), constant(1)), &add(x(), constant(1))));
        assert!(!deep_equal(&add(x(), constant(1)), &add(x(), constant(2))));
        assert!(!deep_equal(&add(x(), y()), &sub(x(), y())));
        let row = var("Extent1", int());
        assert!(deep_equal(&row.clone().prop("Name"), &row.clone().prop("Name")));
        assert!(!deep_equal(&row.clone().prop("Name"), &row.prop("Title")));
        // Kinds outside the list only match themselves.
        let like_expr = like(x(), y());
        assert!(deep_equal(&like_expr, &like_expr));
        assert!(!deep_equal(&like_expr, &like(x(), y())));
    }

    /// Evaluate the small subset of expressions the rewrite touches.
    fn eval(expr: &Expr, env: &[(&str, Option<i64>)]) -> Option<i64> {
        match expr {
            Expr::ParameterRef { name, .. } => env
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .and_then(|(_, v)| *v),
            Expr::Constant(value) => value.as_i64(),
            Expr::Null(_) => None,
            Expr::Function { args, .. } => args.iter().find_map(|a| eval(a, env)),
            Expr::Case {
                when,
                then,
                otherwise,
            } => {
                for (w, t) in when.iter().zip(then) {
                    let Expr::IsNull(arg) = w else {
                        panic!("unexpected condition {:?}", w)
                    };
                    if eval(arg, env).is_none() {
                        return eval(t, env);
                    }
                }
                eval(otherwise, env)
            }
            other => panic!("unexpected node {:?}", other.kind()),
        }
    }

    #[test]
    fn test_rewrite_preserves_meaning() {
        let expr = case(vec![(is_null(x()), y())], x());
        let reduced = reduce(&expr);
        for xv in [None, Some(1)] {
            for yv in [None, Some(2)] {
                let env = [("x", xv), ("y", yv)];
                assert_eq!(eval(&expr, &env), eval(&reduced, &env), "x={:?} y={:?}", xv, yv);
            }
        }
    }
}
