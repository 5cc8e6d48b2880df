//! Operator metadata: symbols, binding power under both precedence regimes,
//! fixity, associativity and negation counterparts.

use serde::{Deserialize, Serialize};

/// Which precedence table governs parenthesization.
///
/// PostgreSQL 9.5 reworked operator precedence (IS, comparisons and
/// LIKE/IN moved). Servers older than that parse with the legacy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precedence {
    Legacy,
    #[default]
    Modern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    Binary,
    Prefix,
    Postfix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    UnaryMinus,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    IsNull,
    IsNotNull,
    LessThanOrEquals,
    GreaterThanOrEquals,
    NotEquals,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    /// String concatenation; also tsquery OR.
    Concat,
    In,
    NotIn,
    Like,
    NotLike,
    LessThan,
    GreaterThan,
    Equals,
    Not,
    And,
    Or,
    QueryMatch,
    QueryAnd,
    QueryNegate,
    QueryContains,
    QueryIsContained,
    RegexMatch,
}

/// Static description of one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    pub symbol: &'static str,
    /// Legacy binding power towards the left operand.
    pub left: u8,
    /// Legacy binding power towards the right operand.
    pub right: u8,
    /// Binding power from 9.5 on.
    pub modern: u8,
    pub fixity: Fixity,
    pub right_assoc: bool,
}

const fn info(
    symbol: &'static str,
    left: u8,
    right: u8,
    modern: u8,
    fixity: Fixity,
    right_assoc: bool,
) -> OperatorInfo {
    OperatorInfo {
        symbol,
        left,
        right,
        modern,
        fixity,
        right_assoc,
    }
}

impl Operator {
    pub const fn info(self) -> OperatorInfo {
        use Fixity::*;
        match self {
            Operator::UnaryMinus => info("-", 17, 17, 12, Prefix, true),
            Operator::Mul => info("*", 15, 15, 10, Binary, false),
            Operator::Div => info("/", 15, 15, 10, Binary, false),
            Operator::Mod => info("%", 15, 15, 10, Binary, false),
            Operator::Add => info("+", 14, 14, 9, Binary, false),
            Operator::Sub => info("-", 14, 14, 9, Binary, false),
            Operator::IsNull => info("IS NULL", 13, 13, 4, Postfix, false),
            Operator::IsNotNull => info("IS NOT NULL", 13, 13, 4, Postfix, false),
            Operator::LessThanOrEquals => info("<=", 10, 10, 5, Binary, false),
            Operator::GreaterThanOrEquals => info(">=", 10, 10, 5, Binary, false),
            Operator::NotEquals => info("<>", 10, 10, 5, Binary, false),
            Operator::BitwiseAnd => info("&", 10, 10, 8, Binary, false),
            Operator::BitwiseOr => info("|", 10, 10, 8, Binary, false),
            Operator::BitwiseXor => info("#", 10, 10, 8, Binary, false),
            Operator::BitwiseNot => info("~", 10, 10, 8, Prefix, false),
            Operator::Concat => info("||", 10, 10, 8, Binary, false),
            Operator::In => info("IN", 9, 9, 6, Binary, false),
            Operator::NotIn => info("NOT IN", 3, 9, 6, Binary, false),
            Operator::Like => info("LIKE", 6, 6, 6, Binary, false),
            Operator::NotLike => info("NOT LIKE", 3, 6, 6, Binary, false),
            Operator::LessThan => info("<", 5, 5, 5, Binary, false),
            Operator::GreaterThan => info(">", 5, 5, 5, Binary, false),
            Operator::Equals => info("=", 4, 4, 5, Binary, true),
            Operator::Not => info("NOT", 3, 3, 3, Prefix, true),
            Operator::And => info("AND", 2, 2, 2, Binary, false),
            Operator::Or => info("OR", 1, 1, 1, Binary, false),
            Operator::QueryMatch => info("@@", 10, 10, 8, Binary, false),
            Operator::QueryAnd => info("&&", 10, 10, 8, Binary, false),
            Operator::QueryNegate => info("!!", 10, 10, 8, Prefix, true),
            Operator::QueryContains => info("@>", 10, 10, 8, Binary, false),
            Operator::QueryIsContained => info("<@", 10, 10, 8, Binary, false),
            Operator::RegexMatch => info("~", 10, 10, 8, Binary, false),
        }
    }

    pub fn fixity(self) -> Fixity {
        self.info().fixity
    }

    /// The operator that yields the logical complement, if one exists.
    pub fn negated(self) -> Option<Operator> {
        use Operator::*;
        Some(match self {
            IsNull => IsNotNull,
            IsNotNull => IsNull,
            LessThanOrEquals => GreaterThan,
            GreaterThanOrEquals => LessThan,
            NotEquals => Equals,
            In => NotIn,
            NotIn => In,
            Like => NotLike,
            NotLike => Like,
            LessThan => GreaterThanOrEquals,
            GreaterThan => LessThanOrEquals,
            Equals => NotEquals,
            _ => return None,
        })
    }

    /// Operators PostgreSQL refuses to chain at equal precedence without
    /// parentheses (`a = b < c` is a syntax error from 9.5 on).
    pub fn is_non_assoc(self, regime: Precedence) -> bool {
        use Operator::*;
        match regime {
            Precedence::Modern => matches!(
                self,
                Equals
                    | NotEquals
                    | LessThan
                    | GreaterThan
                    | LessThanOrEquals
                    | GreaterThanOrEquals
                    | Like
                    | NotLike
                    | In
                    | NotIn
                    | IsNull
                    | IsNotNull
            ),
            Precedence::Legacy => matches!(
                self,
                LessThan | GreaterThan | Like | NotLike | In | NotIn | IsNull | IsNotNull
            ),
        }
    }

    /// Binding power towards the left operand in `regime`.
    pub fn left_power(self, regime: Precedence) -> u8 {
        match regime {
            Precedence::Legacy => self.info().left,
            Precedence::Modern => self.info().modern,
        }
    }

    /// Binding power towards the right operand in `regime`.
    pub fn right_power(self, regime: Precedence) -> u8 {
        match regime {
            Precedence::Legacy => self.info().right,
            Precedence::Modern => self.info().modern,
        }
    }

    /// Symbol padded for its fixity.
    pub fn text(self) -> String {
        let info = self.info();
        match info.fixity {
            Fixity::Binary => format!(" {} ", info.symbol),
            Fixity::Prefix => format!("{} ", info.symbol),
            Fixity::Postfix => format!(" {}", info.symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Operator; 32] = [
        Operator::UnaryMinus,
        Operator::Mul,
        Operator::Div,
        Operator::Mod,
        Operator::Add,
        Operator::Sub,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::LessThanOrEquals,
        Operator::GreaterThanOrEquals,
        Operator::NotEquals,
        Operator::BitwiseAnd,
        Operator::BitwiseOr,
        Operator::BitwiseXor,
        Operator::BitwiseNot,
        Operator::Concat,
        Operator::In,
        Operator::NotIn,
        Operator::Like,
        Operator::NotLike,
        Operator::LessThan,
        Operator::GreaterThan,
        Operator::Equals,
        Operator::Not,
        Operator::And,
        Operator::Or,
        Operator::QueryMatch,
        Operator::QueryAnd,
        Operator::QueryNegate,
        Operator::QueryContains,
        Operator::QueryIsContained,
        Operator::RegexMatch,
    ];

    #[test]
    fn test_negation_pairs_are_symmetric_for_comparisons() {
        for op in ALL {
            if let Some(opposite) = op.negated() {
                assert_eq!(opposite.negated(), Some(op), "{:?}", op);
                assert_eq!(op.fixity(), opposite.fixity());
            }
        }
    }

    #[test]
    fn test_logical_connectives_have_no_negation() {
        assert_eq!(Operator::And.negated(), None);
        assert_eq!(Operator::Or.negated(), None);
        assert_eq!(Operator::Not.negated(), None);
    }

    #[test]
    fn test_text_padding() {
        assert_eq!(Operator::Add.text(), " + ");
        assert_eq!(Operator::Not.text(), "NOT ");
        assert_eq!(Operator::IsNull.text(), " IS NULL");
    }

    #[test]
    fn test_modern_regime_moves_is_below_comparison() {
        assert!(Operator::IsNull.left_power(Precedence::Legacy) > Operator::Equals.left_power(Precedence::Legacy));
        assert!(Operator::IsNull.left_power(Precedence::Modern) < Operator::Equals.left_power(Precedence::Modern));
    }
}
