//! nom parsers for server version strings and store type names.

use nom::{
    IResult,
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0},
    combinator::{map_res, opt},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, preceded, tuple},
};

use crate::error::{XlateError, XlateResult};

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    preceded(
        multispace0,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )(input)
}

fn type_args(input: &str) -> IResult<&str, Vec<u32>> {
    delimited(
        preceded(multispace0, char('(')),
        separated_list1(
            preceded(multispace0, char(',')),
            preceded(multispace0, number),
        ),
        preceded(multispace0, char(')')),
    )(input)
}

/// `major[.minor[.patch]]`; anything after the numeric prefix is ignored
/// (`16beta1`, `9.6.3 (Debian 9.6.3-1)`).
pub(crate) fn server_version(input: &str) -> XlateResult<(u32, u32, u32)> {
    let trimmed = input.trim_start();
    let parsed: IResult<&str, (u32, Option<u32>, Option<u32>)> = tuple((
        number,
        opt(preceded(char('.'), number)),
        opt(preceded(char('.'), number)),
    ))(trimmed);

    match parsed {
        Ok((_, (major, minor, patch))) => Ok((major, minor.unwrap_or(0), patch.unwrap_or(0))),
        Err(_) => Err(XlateError::parse(
            input.len() - trimmed.len(),
            format!("expected a server version, found '{}'", input),
        )),
    }
}

/// A store type name split into its words and numeric arguments:
/// `timestamp(3) with time zone` → (`timestamp with time zone`, `[3]`).
pub(crate) fn store_type_name(input: &str) -> XlateResult<(String, Vec<u32>)> {
    let parsed: IResult<&str, (Vec<&str>, Option<Vec<u32>>, Vec<&str>)> =
        tuple((many1(word), opt(type_args), many0(word)))(input);

    match parsed {
        Ok((rest, (head, args, tail))) if rest.trim().is_empty() => {
            let name = head
                .iter()
                .chain(tail.iter())
                .map(|w| w.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            Ok((name, args.unwrap_or_default()))
        }
        Ok((rest, _)) => Err(XlateError::parse(
            input.len() - rest.len(),
            format!("unexpected trailing input '{}'", rest.trim()),
        )),
        Err(_) => Err(XlateError::parse(0, format!("expected a type name, found '{}'", input))),
    }
}
