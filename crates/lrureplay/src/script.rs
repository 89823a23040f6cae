//! Operation script parser using nom
//!
//! One operation per line, `#` starts a comment:
//! ```text
//! put 1 1
//! get 1 -> 1
//! get 2 -> absent
//! peek 3
//! remove 3
//! len -> 1
//! clear
//! ```
//!
//! Keys and values are signed 64-bit integers. A trailing `-> ...` turns the
//! line into an expectation checked during replay.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    sequence::{pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use thiserror::Error;

/// Parse failure with the 1-based line it happened on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    /// Line number (1-based)
    pub line: usize,
    /// What was wrong with it
    pub message: String,
}

/// Expected result of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// The key holds this value
    Value(i64),
    /// The key is not cached
    Absent,
}

impl Expect {
    /// Check a lookup result against this expectation
    pub fn matches(self, found: Option<i64>) -> bool {
        match self {
            Expect::Value(v) => found == Some(v),
            Expect::Absent => found.is_none(),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Value(v) => write!(f, "{}", v),
            Expect::Absent => write!(f, "absent"),
        }
    }
}

/// A single cache operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Insert or overwrite
    Put { key: i64, value: i64 },
    /// Promoting lookup
    Get { key: i64, expect: Option<Expect> },
    /// Lookup without promotion
    Peek { key: i64, expect: Option<Expect> },
    /// Explicit removal
    Remove { key: i64 },
    /// Entry count
    Len { expect: Option<usize> },
    /// Drop every entry
    Clear,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Put { key, value } => write!(f, "put({}, {})", key, value),
            Op::Get { key, .. } => write!(f, "get({})", key),
            Op::Peek { key, .. } => write!(f, "peek({})", key),
            Op::Remove { key } => write!(f, "remove({})", key),
            Op::Len { .. } => write!(f, "len"),
            Op::Clear => write!(f, "clear"),
        }
    }
}

/// An operation and the script line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Line number (1-based)
    pub line: usize,
    /// Parsed operation
    pub op: Op,
}

/// A parsed operation script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    /// Operations in file order
    pub steps: Vec<Step>,
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_script(text)
    }
}

/// Parse a whole script, skipping blank lines and comments
pub fn parse_script(text: &str) -> Result<Script, ScriptError> {
    let mut steps = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let (_, op) = parse_op(content).map_err(|_| ScriptError {
            line,
            message: format!("unrecognised operation `{}`", content),
        })?;
        steps.push(Step { line, op });
    }

    Ok(Script { steps })
}

/// Parse one trimmed, comment-free line
pub fn parse_op(input: &str) -> IResult<&str, Op> {
    all_consuming(terminated(op, space0))(input)
}

fn op(input: &str) -> IResult<&str, Op> {
    alt((
        map(
            preceded(pair(tag("put"), space1), separated_pair(integer, space1, integer)),
            |(key, value)| Op::Put { key, value },
        ),
        map(
            preceded(pair(tag("get"), space1), pair(integer, opt(expectation))),
            |(key, expect)| Op::Get { key, expect },
        ),
        map(
            preceded(pair(tag("peek"), space1), pair(integer, opt(expectation))),
            |(key, expect)| Op::Peek { key, expect },
        ),
        map(preceded(pair(tag("remove"), space1), integer), |key| {
            Op::Remove { key }
        }),
        map(
            preceded(tag("len"), opt(preceded(arrow, map_res(digit1, str::parse::<usize>)))),
            |expect| Op::Len { expect },
        ),
        value(Op::Clear, tag("clear")),
    ))(input)
}

fn arrow(input: &str) -> IResult<&str, &str> {
    recognize(tuple((space0, tag("->"), space0)))(input)
}

fn expectation(input: &str) -> IResult<&str, Expect> {
    preceded(
        arrow,
        alt((
            value(Expect::Absent, tag("absent")),
            map(integer, Expect::Value),
        )),
    )(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>)(input)
}
