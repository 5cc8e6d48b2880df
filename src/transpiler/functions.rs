//! Function and aggregate dispatch.
//!
//! Canonical (`Edm`) functions map to PostgreSQL built-ins, store
//! (`Postgres`) functions cover full-text search, regex matching and a few
//! escape hatches, and anything else is emitted as a quoted call.

use bitflags::bitflags;

use crate::ast::{Aggregate, Expr, Function, TypeUsage, Value};
use crate::dialect::literal::write_string;
use crate::dialect::{StoreType, db_type_name, write_identifier};
use crate::error::{XlateError, XlateResult};
use crate::sql::{Operator, SqlExpr};

use super::Translator;

bitflags! {
    /// Regex options carried by `match_regex`, numbered as the host
    /// platform numbers them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegexOptions: u32 {
        const IGNORE_CASE = 1;
        const MULTILINE = 2;
        const EXPLICIT_CAPTURE = 4;
        const COMPILED = 8;
        const SINGLELINE = 16;
        const IGNORE_PATTERN_WHITESPACE = 32;
        const RIGHT_TO_LEFT = 64;
        const ECMA_SCRIPT = 256;
        const CULTURE_INVARIANT = 512;
    }
}

impl RegexOptions {
    /// Embedded-option letters for a PostgreSQL ARE, e.g. `ip`.
    pub fn embedded_flags(self) -> XlateResult<String> {
        if self.intersects(Self::RIGHT_TO_LEFT | Self::ECMA_SCRIPT) {
            return Err(XlateError::unsupported(format!("regex options {:?}", self)));
        }
        let mut flags = String::new();
        if self.contains(Self::IGNORE_CASE) {
            flags.push('i');
        }
        match (self.contains(Self::MULTILINE), self.contains(Self::SINGLELINE)) {
            (false, false) => flags.push('p'),
            (true, false) => flags.push('n'),
            (false, true) => {}
            (true, true) => flags.push('w'),
        }
        if self.contains(Self::IGNORE_PATTERN_WHITESPACE) {
            flags.push('x');
        }
        Ok(flags)
    }
}

/// Seconds in an average month, for month differences.
const SECONDS_PER_MONTH: &str = "2629800.0";

impl Translator {
    pub(crate) fn visit_function(
        &mut self,
        function: &Function,
        args: &[Expr],
        result_type: &TypeUsage,
    ) -> XlateResult<SqlExpr> {
        if function.is_canonical() {
            return self.visit_canonical(&function.name, args, result_type);
        }
        if function.is_store() {
            if let Some(expr) = self.visit_store_function(&function.name, args)? {
                return Ok(expr);
            }
        }

        let mut name = String::new();
        if let Some(schema) = &function.schema {
            write_identifier(schema, &mut name);
            name.push('.');
        }
        write_identifier(function.store_name.as_deref().unwrap_or(&function.name), &mut name);
        Ok(SqlExpr::function(name, self.visit_all(args)?))
    }

    /// Visit exactly `N` arguments.
    fn visit_args<const N: usize>(&mut self, name: &str, args: &[Expr]) -> XlateResult<[SqlExpr; N]> {
        if args.len() != N {
            return Err(XlateError::arity(name, N.to_string(), args.len()));
        }
        let visited = self.visit_all(args)?;
        visited
            .try_into()
            .map_err(|v: Vec<SqlExpr>| XlateError::arity(name, N.to_string(), v.len()))
    }

    fn visit_canonical(&mut self, name: &str, args: &[Expr], result_type: &TypeUsage) -> XlateResult<SqlExpr> {
        let regime = self.regime;
        let expr = match name {
            // Strings
            "Concat" => {
                let [a, b] = self.visit_args(name, args)?;
                SqlExpr::binary(Operator::Concat, regime, a, b)?
            }
            "Contains" => {
                let [a, b] = self.visit_args(name, args)?;
                SqlExpr::binary(Operator::GreaterThan, regime, position(b, a), int(0))?
            }
            "IndexOf" => {
                let [a, b] = self.visit_args(name, args)?;
                position(a, b)
            }
            "StartsWith" => {
                let [a, b] = self.visit_args(name, args)?;
                SqlExpr::binary(Operator::Equals, regime, position(b, a), int(1))?
            }
            "Left" => {
                let [a, n] = self.visit_args(name, args)?;
                SqlExpr::function("substr", vec![a, int(1), n])
            }
            "Right" => {
                let [a, n] = self.visit_args(name, args)?;
                let length = SqlExpr::function("char_length", vec![a.clone()]);
                let start = SqlExpr::binary(
                    Operator::Sub,
                    regime,
                    SqlExpr::binary(Operator::Add, regime, length, int(1))?,
                    n,
                )?;
                SqlExpr::function("substr", vec![a, start])
            }
            "Length" => {
                let [a] = self.visit_args(name, args)?;
                SqlExpr::cast(SqlExpr::function("char_length", vec![a]), "int4")
            }
            "LTrim" | "RTrim" | "Trim" | "ToLower" | "ToUpper" | "Reverse" => {
                let [a] = self.visit_args(name, args)?;
                let builtin = match name {
                    "LTrim" => "ltrim",
                    "RTrim" => "rtrim",
                    "Trim" => "btrim",
                    "ToLower" => "lower",
                    "ToUpper" => "upper",
                    _ => "reverse",
                };
                SqlExpr::function(builtin, vec![a])
            }
            "Replace" => SqlExpr::function("replace", self.visit_args::<3>(name, args)?.into()),
            "Substring" => SqlExpr::function("substr", self.visit_args::<3>(name, args)?.into()),

            // Date arithmetic
            "AddYears" | "AddMonths" | "AddDays" | "AddHours" | "AddMinutes" | "AddSeconds"
            | "AddMilliseconds" | "AddMicroseconds" | "AddNanoseconds" => {
                let [t, n] = self.visit_args(name, args)?;
                let (count, unit) = match name {
                    "AddNanoseconds" => (SqlExpr::binary(Operator::Div, regime, n, int(1000))?, "Microseconds"),
                    _ => (n, &name[3..]),
                };
                let step = SqlExpr::binary(
                    Operator::Mul,
                    regime,
                    count,
                    SqlExpr::literal(format!("INTERVAL '1 {}'", unit)),
                )?;
                SqlExpr::binary(Operator::Add, regime, t, step)?
            }
            "DiffYears" => {
                let [s, e] = self.visit_args(name, args)?;
                let span = age(trunc("year", e), trunc("year", s));
                SqlExpr::function("date_part", vec![SqlExpr::literal("'year'"), span]).then("::int4")
            }
            "DiffMonths" => {
                let [s, e] = self.visit_args(name, args)?;
                let seconds = SqlExpr::binary(
                    Operator::Div,
                    regime,
                    extract_epoch(age(trunc("month", e), trunc("month", s))),
                    SqlExpr::literal(SECONDS_PER_MONTH),
                )?;
                SqlExpr::function("round", vec![seconds]).then("::int4")
            }
            "DiffDays" => {
                let [s, e] = self.visit_args(name, args)?;
                let span = self.truncated_span("day", s, e)?;
                SqlExpr::function("date_part", vec![SqlExpr::literal("'day'"), span]).then("::int4")
            }
            "DiffHours" | "DiffMinutes" | "DiffSeconds" => {
                let [s, e] = self.visit_args(name, args)?;
                let (unit, divisor) = match name {
                    "DiffHours" => ("hour", Some(3600)),
                    "DiffMinutes" => ("minute", Some(60)),
                    _ => ("second", None),
                };
                let seconds = extract_epoch(self.truncated_span(unit, s, e)?).then("::int4");
                match divisor {
                    Some(d) => SqlExpr::binary(Operator::Div, regime, seconds, int(d))?,
                    None => seconds,
                }
            }
            "DiffMilliseconds" | "DiffMicroseconds" | "DiffNanoseconds" => {
                let [s, e] = self.visit_args(name, args)?;
                let (unit, factor) = match name {
                    "DiffMilliseconds" => ("milliseconds", "1000"),
                    "DiffMicroseconds" => ("microseconds", "1000000"),
                    _ => ("microseconds", "1000000000"),
                };
                let seconds = extract_epoch(self.truncated_span(unit, s, e)?);
                SqlExpr::cast(
                    SqlExpr::binary(Operator::Mul, regime, seconds, SqlExpr::literal(factor))?,
                    "int4",
                )
            }

            // Date parts
            "Year" | "Month" | "Day" | "Hour" | "Minute" | "Second" | "Millisecond" | "DayOfYear" => {
                let [x] = self.visit_args(name, args)?;
                let part = match name {
                    "Millisecond" => "milliseconds".to_string(),
                    "DayOfYear" => "doy".to_string(),
                    other => other.to_ascii_lowercase(),
                };
                SqlExpr::cast(extract(&part, x), "int4")
            }
            "GetTotalOffsetMinutes" => {
                let [x] = self.visit_args(name, args)?;
                let minutes = SqlExpr::cast(extract("timezone", x), "int4");
                SqlExpr::binary(Operator::Div, regime, minutes, int(60))?
            }
            "CurrentDateTime" => nullary(name, args, "LOCALTIMESTAMP")?,
            "CurrentUtcDateTime" => nullary(name, args, "CURRENT_TIMESTAMP AT TIME ZONE 'UTC'")?,
            "CurrentDateTimeOffset" => nullary(name, args, "CURRENT_TIMESTAMP")?,
            "TruncateTime" => {
                let [x] = self.visit_args(name, args)?;
                trunc("day", x)
            }

            // Bitwise
            "BitwiseAnd" | "BitwiseOr" | "BitwiseXor" => {
                let [a, b] = self.visit_args(name, args)?;
                let op = match name {
                    "BitwiseAnd" => Operator::BitwiseAnd,
                    "BitwiseOr" => Operator::BitwiseOr,
                    _ => Operator::BitwiseXor,
                };
                SqlExpr::binary(op, regime, a, b)?
            }
            "BitwiseNot" => {
                let [a] = self.visit_args(name, args)?;
                SqlExpr::prefix(Operator::BitwiseNot, regime, a)?
            }

            // Math
            "Abs" | "Ceiling" | "Floor" => {
                let [a] = self.visit_args(name, args)?;
                SqlExpr::function(name.to_ascii_lowercase(), vec![a])
            }
            "Round" => {
                if !(1..=2).contains(&args.len()) {
                    return Err(XlateError::arity(name, "1 or 2", args.len()));
                }
                SqlExpr::function("round", self.visit_all(args)?)
            }
            "Power" => SqlExpr::function("power", self.visit_args::<2>(name, args)?.into()),
            "Truncate" => SqlExpr::function("trunc", self.visit_args::<2>(name, args)?.into()),

            "NewGuid" => nullary(name, args, "uuid_generate_v4()")?,

            other => {
                return Err(XlateError::unsupported(format!(
                    "canonical function Edm.{} returning {:?}",
                    other, result_type.edm
                )));
            }
        };
        Ok(expr)
    }

    /// `end - start` with both sides truncated to `unit`.
    fn truncated_span(&self, unit: &str, start: SqlExpr, end: SqlExpr) -> XlateResult<SqlExpr> {
        SqlExpr::binary(Operator::Sub, self.regime, trunc(unit, end), trunc(unit, start))
    }

    /// Store functions with dedicated renderings; `None` falls through to a
    /// plain quoted call.
    fn visit_store_function(&mut self, name: &str, args: &[Expr]) -> XlateResult<Option<SqlExpr>> {
        let regime = self.regime;
        let binary = |op| (op, 2);
        let tsquery_op = match name {
            "@@" => Some(binary(Operator::QueryMatch)),
            "operator_tsquery_and" => Some(binary(Operator::QueryAnd)),
            "operator_tsquery_or" => Some(binary(Operator::Concat)),
            "operator_tsquery_contains" => Some(binary(Operator::QueryContains)),
            "operator_tsquery_is_contained" => Some(binary(Operator::QueryIsContained)),
            "operator_tsquery_negate" => Some((Operator::QueryNegate, 1)),
            _ => None,
        };
        if let Some((op, arity)) = tsquery_op {
            return if arity == 1 {
                let [a] = self.visit_args(name, args)?;
                Ok(Some(SqlExpr::prefix(op, regime, a)?))
            } else {
                let [a, b] = self.visit_args(name, args)?;
                Ok(Some(SqlExpr::binary(op, regime, a, b)?))
            };
        }

        let expr = match name {
            "coalesce" => SqlExpr::function("coalesce", self.visit_all(args)?),
            "ts_rank" | "ts_rank_cd" => self.visit_ts_rank(name, args)?,
            "setweight" => {
                let [vector, label] = args else {
                    return Err(XlateError::arity(name, "2", args.len()));
                };
                let label = weight_label(label)?;
                let vector = self.visit(vector)?;
                SqlExpr::function("setweight", vec![vector, SqlExpr::literal(format!("'{}'", label))])
            }
            "as_tsvector" => {
                let [a] = self.visit_args(name, args)?;
                SqlExpr::cast(a, "tsvector")
            }
            "as_tsquery" => {
                let [a] = self.visit_args(name, args)?;
                SqlExpr::cast(a, "tsquery")
            }
            "match_regex" => self.visit_match_regex(args)?,
            "cast" => {
                let [value, ty] = args else {
                    return Err(XlateError::arity(name, "2", args.len()));
                };
                let Expr::Constant(Value::String(type_name)) = ty else {
                    return Err(XlateError::unsupported("cast target must be a constant type name"));
                };
                let type_name = StoreType::check_name(type_name)?;
                SqlExpr::cast(self.visit(value)?, type_name)
            }
            _ => return Ok(None),
        };
        Ok(Some(expr))
    }

    /// `ts_rank([weights,] vector, query [, normalization])`, with four
    /// leading constant weights folded into a `{D, C, B, A}` array literal.
    fn visit_ts_rank(&mut self, name: &str, args: &[Expr]) -> XlateResult<SqlExpr> {
        let (weights, rest) = match args.len() {
            2 | 3 => (None, args),
            6 | 7 => {
                let (weights, rest) = args.split_at(4);
                let mut values = Vec::with_capacity(4);
                for weight in weights {
                    values.push(weight_value(weight)?);
                }
                (Some(format!("'{{{}}}'", values.join(", "))), rest)
            }
            n => return Err(XlateError::arity(name, "2, 3, 6 or 7", n)),
        };
        let mut visited = Vec::with_capacity(rest.len() + 1);
        if let Some(weights) = weights {
            visited.push(SqlExpr::literal(weights));
        }
        visited.extend(self.visit_all(rest)?);
        Ok(SqlExpr::function(name, visited))
    }

    fn visit_match_regex(&mut self, args: &[Expr]) -> XlateResult<SqlExpr> {
        let regime = self.regime;
        let (input, pattern, options) = match args {
            [input, pattern] => (input, pattern, RegexOptions::empty()),
            [input, pattern, Expr::Constant(options)] => {
                let bits = options
                    .as_i64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| XlateError::unsupported("regex options must be a non-negative integer"))?;
                (input, pattern, RegexOptions::from_bits_truncate(bits))
            }
            [_, _, _] => return Err(XlateError::unsupported("regex options must be a constant")),
            _ => return Err(XlateError::arity("match_regex", "2 or 3", args.len())),
        };
        let flags = options.embedded_flags()?;
        let input = self.visit(input)?;
        let mut pattern = self.visit(pattern)?;
        if !flags.is_empty() {
            let mut prefix = String::new();
            write_string(&format!("(?{})", flags), &mut prefix);
            pattern = SqlExpr::binary(Operator::Concat, regime, SqlExpr::literal(prefix), pattern)?;
        }
        SqlExpr::binary(Operator::RegexMatch, regime, input, pattern)
    }

    pub(crate) fn visit_aggregate(&mut self, aggregate: &Aggregate) -> XlateResult<SqlExpr> {
        let function = &aggregate.function;
        if function.is_store() && function.name == "StringAgg" {
            let (value, separator) = match aggregate.args.as_slice() {
                [value] => (value, None),
                [value, separator] => (value, Some(separator)),
                args => return Err(XlateError::arity("StringAgg", "1 or 2", args.len())),
            };
            let mut value = self.visit(value)?;
            if aggregate.distinct {
                value = SqlExpr::Seq(vec![SqlExpr::literal("DISTINCT "), value]);
            }
            let separator = match separator {
                Some(separator) => self.visit(separator)?,
                None => SqlExpr::literal("''"),
            };
            return Ok(SqlExpr::function("string_agg", vec![value, separator]));
        }

        let name = match (function.is_canonical(), function.name.as_str()) {
            (true, "Avg") => "avg",
            (true, "Count" | "BigCount") => "count",
            (true, "Max") => "max",
            (true, "Min") => "min",
            (true, "Sum") => "sum",
            (true, "StDev") => "stddev_samp",
            (true, "StDevP") => "stddev_pop",
            (true, "Var") => "var_samp",
            (true, "VarP") => "var_pop",
            _ => {
                return Err(XlateError::unsupported(format!(
                    "aggregate {}",
                    function.qualified_name()
                )));
            }
        };
        let [arg] = aggregate.args.as_slice() else {
            return Err(XlateError::arity(function.qualified_name(), "1", aggregate.args.len()));
        };
        let mut value = self.visit(arg)?;
        if aggregate.distinct {
            value = SqlExpr::Seq(vec![SqlExpr::literal("DISTINCT "), value]);
        }
        Ok(SqlExpr::cast(
            SqlExpr::function(name, vec![value]),
            db_type_name(&aggregate.result_type)?,
        ))
    }
}

fn int(value: i32) -> SqlExpr {
    SqlExpr::Constant(Value::Int32(value))
}

fn nullary(name: &str, args: &[Expr], text: &str) -> XlateResult<SqlExpr> {
    if !args.is_empty() {
        return Err(XlateError::arity(name, "0", args.len()));
    }
    Ok(SqlExpr::literal(text))
}

/// `position(needle in haystack)`.
fn position(needle: SqlExpr, haystack: SqlExpr) -> SqlExpr {
    SqlExpr::function(
        "position",
        vec![SqlExpr::Seq(vec![needle, SqlExpr::literal(" in "), haystack])],
    )
}

fn age(end: SqlExpr, start: SqlExpr) -> SqlExpr {
    SqlExpr::function("age", vec![end, start])
}

fn trunc(unit: &str, value: SqlExpr) -> SqlExpr {
    SqlExpr::function("date_trunc", vec![SqlExpr::literal(format!("'{}'", unit)), value])
}

fn extract(part: &str, value: SqlExpr) -> SqlExpr {
    SqlExpr::function(
        "extract",
        vec![SqlExpr::Seq(vec![SqlExpr::literal(format!("{} FROM ", part)), value])],
    )
}

fn extract_epoch(value: SqlExpr) -> SqlExpr {
    SqlExpr::function(
        "extract",
        vec![SqlExpr::Seq(vec![SqlExpr::literal("epoch from "), value])],
    )
}

/// A ts_rank weight, which must be a numeric constant.
fn weight_value(expr: &Expr) -> XlateResult<String> {
    match expr {
        Expr::Constant(Value::Single(v)) => Ok(v.to_string()),
        Expr::Constant(Value::Double(v)) => Ok(v.to_string()),
        Expr::Constant(Value::Decimal(v)) => Ok(v.to_string()),
        Expr::Constant(other) => other
            .as_i64()
            .map(|v| v.to_string())
            .ok_or_else(|| XlateError::unsupported("ts_rank weights must be numeric")),
        _ => Err(XlateError::unsupported("ts_rank weights must be constants")),
    }
}

/// A setweight label: 0..=3 for D..A, or the letter itself.
fn weight_label(expr: &Expr) -> XlateResult<char> {
    let label = match expr {
        Expr::Constant(Value::String(s)) => match s.as_str() {
            "A" | "a" => Some('A'),
            "B" | "b" => Some('B'),
            "C" | "c" => Some('C'),
            "D" | "d" => Some('D'),
            _ => None,
        },
        Expr::Constant(value) => match value.as_i64() {
            Some(0) => Some('D'),
            Some(1) => Some('C'),
            Some(2) => Some('B'),
            Some(3) => Some('A'),
            _ => None,
        },
        _ => None,
    };
    label.ok_or_else(|| XlateError::unsupported("setweight label must be a constant A-D or 0-3"))
}
