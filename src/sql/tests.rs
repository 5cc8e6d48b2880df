use pretty_assertions::assert_eq;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::*;
use crate::ast::JoinKind;

const MODERN: Precedence = Precedence::Modern;
const LEGACY: Precedence = Precedence::Legacy;

fn leaf(name: &str) -> SqlExpr {
    SqlExpr::literal(name)
}

fn bin(op: Operator, regime: Precedence, l: SqlExpr, r: SqlExpr) -> SqlExpr {
    SqlExpr::binary(op, regime, l, r).unwrap()
}

fn render(expr: &SqlExpr) -> String {
    expr.to_sql(&Stages::new())
}

/// Fully parenthesized shape of our own tree.
fn expected_shape(expr: &SqlExpr) -> String {
    match expr {
        SqlExpr::Operator(o) => {
            let symbol = o.op.info().symbol;
            match (&o.left, &o.right) {
                (Some(l), Some(r)) => format!("({} {} {})", expected_shape(l), symbol, expected_shape(r)),
                (None, Some(r)) => format!("({} {})", symbol, expected_shape(r)),
                (Some(l), None) => format!("({} {})", expected_shape(l), symbol),
                (None, None) => unreachable!(),
            }
        }
        other => render(other),
    }
}

/// Fully parenthesized shape of what the reference parser read back.
fn parsed_shape(expr: &sqlparser::ast::Expr) -> String {
    use sqlparser::ast::Expr as E;
    match expr {
        E::Nested(inner) => parsed_shape(inner),
        E::BinaryOp { left, op, right } => {
            format!("({} {} {})", parsed_shape(left), op, parsed_shape(right))
        }
        E::UnaryOp { op, expr } => format!("({} {})", op, parsed_shape(expr)),
        E::IsNull(inner) => format!("({} IS NULL)", parsed_shape(inner)),
        E::IsNotNull(inner) => format!("({} IS NOT NULL)", parsed_shape(inner)),
        other => other.to_string(),
    }
}

fn parse_back(sql: &str) -> String {
    let dialect = PostgreSqlDialect {};
    let mut parser = Parser::new(&dialect).try_with_sql(sql).unwrap();
    parsed_shape(&parser.parse_expr().unwrap())
}

const BINARY: [Operator; 11] = [
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Mod,
    Operator::Equals,
    Operator::NotEquals,
    Operator::LessThan,
    Operator::GreaterThanOrEquals,
    Operator::And,
    Operator::Or,
];

fn operands(names: [&str; 2]) -> Vec<SqlExpr> {
    let mut out = vec![leaf(names[0])];
    for op in BINARY {
        out.push(bin(op, MODERN, leaf(names[0]), leaf(names[1])));
    }
    out.push(SqlExpr::prefix(Operator::UnaryMinus, MODERN, leaf(names[0])).unwrap());
    out.push(SqlExpr::prefix(Operator::Not, MODERN, leaf(names[0])).unwrap());
    out.push(SqlExpr::postfix(Operator::IsNull, MODERN, leaf(names[0])).unwrap());
    out
}

fn is_not(expr: &SqlExpr) -> bool {
    matches!(expr.as_operator(), Some(o) if o.op == Operator::Not)
}

#[test]
fn test_modern_rendering_parses_back_to_same_tree() {
    for op in BINARY {
        for left in operands(["a", "b"]) {
            for right in operands(["c", "d"]) {
                // NOT as a right operand only reads naturally under AND/OR.
                if is_not(&right) && !matches!(op, Operator::And | Operator::Or) {
                    continue;
                }
                let expr = bin(op, MODERN, left.clone(), right);
                let sql = render(&expr);
                assert_eq!(parse_back(&sql), expected_shape(&expr), "rendered: {}", sql);
            }
        }
    }
}

#[test]
fn test_modern_unary_operands_parse_back() {
    for inner in operands(["a", "b"]) {
        for op in [Operator::UnaryMinus, Operator::Not] {
            let expr = SqlExpr::prefix(op, MODERN, inner.clone()).unwrap();
            let sql = render(&expr);
            assert_eq!(parse_back(&sql), expected_shape(&expr), "rendered: {}", sql);
        }
        let expr = SqlExpr::postfix(Operator::IsNull, MODERN, inner.clone()).unwrap();
        let sql = render(&expr);
        assert_eq!(parse_back(&sql), expected_shape(&expr), "rendered: {}", sql);
    }
}

#[test]
fn test_no_redundant_parentheses() {
    let expr = bin(
        Operator::Or,
        MODERN,
        bin(Operator::And, MODERN, leaf("a"), leaf("b")),
        leaf("c"),
    );
    assert_eq!(render(&expr), "a AND b OR c");

    let expr = bin(
        Operator::Sub,
        MODERN,
        bin(Operator::Sub, MODERN, leaf("a"), leaf("b")),
        leaf("c"),
    );
    assert_eq!(render(&expr), "a - b - c");

    let expr = bin(
        Operator::Sub,
        MODERN,
        leaf("a"),
        bin(Operator::Sub, MODERN, leaf("b"), leaf("c")),
    );
    assert_eq!(render(&expr), "a - (b - c)");
}

#[test]
fn test_modern_comparisons_do_not_chain() {
    let expr = bin(
        Operator::LessThan,
        MODERN,
        bin(Operator::Equals, MODERN, leaf("a"), leaf("b")),
        leaf("c"),
    );
    assert_eq!(render(&expr), "(a = b) < c");
}

#[test]
fn test_is_null_moves_between_regimes() {
    let modern = bin(
        Operator::Equals,
        MODERN,
        SqlExpr::postfix(Operator::IsNull, MODERN, leaf("a")).unwrap(),
        leaf("b"),
    );
    assert_eq!(render(&modern), "(a IS NULL) = b");

    let legacy = bin(
        Operator::Equals,
        LEGACY,
        SqlExpr::postfix(Operator::IsNull, LEGACY, leaf("a")).unwrap(),
        leaf("b"),
    );
    assert_eq!(render(&legacy), "a IS NULL = b");

    let legacy = SqlExpr::postfix(
        Operator::IsNull,
        LEGACY,
        bin(Operator::Equals, LEGACY, leaf("a"), leaf("b")),
    )
    .unwrap();
    assert_eq!(render(&legacy), "(a = b) IS NULL");

    let modern = SqlExpr::postfix(
        Operator::IsNull,
        MODERN,
        bin(Operator::Equals, MODERN, leaf("a"), leaf("b")),
    )
    .unwrap();
    assert_eq!(render(&modern), "a = b IS NULL");
}

#[test]
fn test_legacy_equals_is_right_associative() {
    let expr = bin(
        Operator::Equals,
        LEGACY,
        leaf("a"),
        bin(Operator::Equals, LEGACY, leaf("b"), leaf("c")),
    );
    assert_eq!(render(&expr), "a = b = c");
    let expr = bin(
        Operator::Equals,
        LEGACY,
        bin(Operator::Equals, LEGACY, leaf("a"), leaf("b")),
        leaf("c"),
    );
    assert_eq!(render(&expr), "(a = b) = c");
}

#[test]
fn test_trailing_prefix_operand_stays_bare() {
    // `~` binds looser than `+` in the legacy table, but nothing follows it.
    let expr = bin(
        Operator::Add,
        LEGACY,
        leaf("a"),
        SqlExpr::prefix(Operator::BitwiseNot, LEGACY, leaf("b")).unwrap(),
    );
    assert_eq!(render(&expr), "a + ~ b");

    let expr = bin(
        Operator::Or,
        LEGACY,
        bin(
            Operator::Add,
            LEGACY,
            leaf("a"),
            SqlExpr::prefix(Operator::BitwiseNot, LEGACY, leaf("b")).unwrap(),
        ),
        leaf("c"),
    );
    assert_eq!(render(&expr), "a + ~ b OR c");

    // Followed by a tighter operator it must be wrapped.
    let expr = bin(
        Operator::Mul,
        LEGACY,
        bin(
            Operator::Mul,
            LEGACY,
            leaf("a"),
            SqlExpr::prefix(Operator::BitwiseNot, LEGACY, leaf("b")).unwrap(),
        ),
        leaf("c"),
    );
    assert_eq!(render(&expr), "a * (~ b) * c");
}

#[test]
fn test_prefix_operand_wrapped_when_followed() {
    let expr = bin(
        Operator::Add,
        MODERN,
        bin(
            Operator::Mul,
            MODERN,
            leaf("a"),
            SqlExpr::prefix(Operator::Not, MODERN, leaf("b")).unwrap(),
        ),
        leaf("c"),
    );
    assert_eq!(render(&expr), "a * (NOT b) + c");
}

#[test]
fn test_negation_swaps_registered_operators() {
    let cases = [
        (Operator::Equals, "a <> b"),
        (Operator::LessThan, "a >= b"),
        (Operator::GreaterThan, "a <= b"),
        (Operator::Like, "a NOT LIKE b"),
        (Operator::In, "a NOT IN b"),
    ];
    for (op, expected) in cases {
        let negated = bin(op, MODERN, leaf("a"), leaf("b")).negate(MODERN);
        assert_eq!(render(&negated), expected);
    }
    let negated = SqlExpr::postfix(Operator::IsNull, MODERN, leaf("a"))
        .unwrap()
        .negate(MODERN);
    assert_eq!(render(&negated), "a IS NOT NULL");
}

#[test]
fn test_negation_falls_back_to_not() {
    let and = bin(Operator::And, MODERN, leaf("a"), leaf("b"));
    assert_eq!(render(&and.clone().negate(MODERN)), "NOT (a AND b)");
    assert_eq!(render(&leaf("x").negate(MODERN)), "NOT x");
    let exists = SqlExpr::Exists(Box::new(leaf("SELECT 1")));
    assert_eq!(render(&exists.negate(MODERN)), "NOT EXISTS (SELECT 1)");
}

#[test]
fn test_negation_is_an_involution() {
    let mut samples = operands(["a", "b"]);
    samples.push(bin(Operator::Like, MODERN, leaf("a"), leaf("b")));
    samples.push(bin(Operator::In, MODERN, leaf("a"), leaf("(1, 2)")));
    for expr in samples {
        let twice = expr.clone().negate(MODERN).negate(MODERN);
        assert_eq!(render(&twice), render(&expr));
    }
}

#[test]
fn test_operator_shape_is_checked() {
    let err = SqlExpr::prefix(Operator::Add, MODERN, leaf("a")).unwrap_err();
    assert!(matches!(err, XlateError::InvalidArity { .. }));
    assert!(SqlExpr::postfix(Operator::Not, MODERN, leaf("a")).is_err());
}

#[test]
fn test_rendering_is_idempotent() {
    let mut stages = Stages::new();
    let inner = stages.push(InputExpr::from_source(
        FromSource::Table("\"dbo\".\"Blogs\"".into()),
        "Extent1",
    ));
    stages[inner].limit = Some(SqlExpr::Constant(Value::Int32(5)));
    let outer = stages.push(InputExpr::from_source(FromSource::Stage(inner), "Limit1"));
    let expr = SqlExpr::Stage(outer);
    let first = expr.to_sql(&stages);
    assert_eq!(first, expr.to_sql(&stages));
    assert_eq!(
        first,
        "SELECT 1 FROM (SELECT 1 FROM \"dbo\".\"Blogs\" AS \"Extent1\" LIMIT 5) AS \"Limit1\""
    );
}

#[test]
fn test_passthrough_stage_is_inlined() {
    let mut stages = Stages::new();
    let inner = stages.push(InputExpr::from_source(
        FromSource::Table("\"Blogs\"".into()),
        "Extent1",
    ));
    let mut outer = InputExpr::from_source(FromSource::Stage(inner), "Extent1");
    outer.where_clause = Some(leaf("TRUE"));
    let outer = stages.push(outer);
    assert_eq!(
        SqlExpr::Stage(outer).to_sql(&stages),
        "SELECT 1 FROM \"Blogs\" AS \"Extent1\" WHERE TRUE"
    );
}

#[test]
fn test_column_alias_elided_for_same_name() {
    let stages = Stages::new();
    let same = ColumnExpr::new(SqlExpr::column_ref("Extent1", "Name"), "Name", TypeUsage::string());
    let renamed = ColumnExpr::new(SqlExpr::column_ref("Extent1", "Name"), "Title", TypeUsage::string());
    assert_eq!(SqlExpr::Column(Box::new(same)).to_sql(&stages), "\"Extent1\".\"Name\"");
    assert_eq!(
        SqlExpr::Column(Box::new(renamed)).to_sql(&stages),
        "\"Extent1\".\"Name\" AS \"Title\""
    );
}

#[test]
fn test_nested_right_join_is_parenthesized() {
    let stages = Stages::new();
    let table = |name: &str, alias: &str| {
        JoinOperand::From(FromExpr::new(FromSource::Table(format!("\"{}\"", name)), alias))
    };
    let nested = JoinExpr {
        left: table("Posts", "Extent2"),
        kind: JoinKind::Inner,
        right: table("Tags", "Extent3"),
        condition: Some(leaf("TRUE")),
    };
    let join = JoinExpr {
        left: table("Blogs", "Extent1"),
        kind: JoinKind::LeftOuter,
        right: JoinOperand::Join(Box::new(nested)),
        condition: None,
    };
    let mut out = String::new();
    join.write_sql(&stages, &mut out);
    assert_eq!(
        out,
        "\"Blogs\" AS \"Extent1\" LEFT OUTER JOIN (\"Posts\" AS \"Extent2\" INNER JOIN \"Tags\" AS \"Extent3\" ON TRUE) ON TRUE"
    );
}
