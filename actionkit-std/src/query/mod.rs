//! Subscription query language.
//!
//! A subscription's `subscribe` string decides whether an action runs for an
//! event:
//!
//! ```text
//! type = "track" and (event = "Product Added" or event = "Order Completed")
//! properties.price >= 100 and traits.email != null
//! !contains(event, "Test") and match(userId, "admin-*")
//! ```
//!
//! # Grammar
//!
//! - Comparisons `path op literal` with `=`, `!=`, `<`, `<=`, `>`, `>=` over
//!   double-quoted strings, numbers, `true` and `false`.
//! - `path = null` / `path != null` test for absence / presence.
//! - `contains(path, "s")` and `match(path, "glob*")`, negatable with `!`.
//! - `and` / `or` fold strictly left to right with no precedence:
//!   `a or b and c` is `(a or b) and c`. Use parentheses to group.
//!
//! # Evaluation
//!
//! Evaluation is pure. A comparison against a missing (or null) path is
//! always false, including `!=`.

mod eval;
mod grammar;


use actionkit_core::{Event, FieldPath};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Errors raised while parsing a subscription query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query is empty or only whitespace.
    #[error("subscription query is empty")]
    Empty,

    /// The query does not follow the grammar.
    #[error("invalid subscription query `{query}` at line {line}, column {column}: expected {expected}")]
    Syntax {
        /// The offending query.
        query: String,
        /// 1-based line of the error.
        line: usize,
        /// 1-based column of the error.
        column: usize,
        /// Byte offset of the error.
        offset: usize,
        /// What the parser expected instead.
        expected: String,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator's source text.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Literal operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A double-quoted string.
    String(String),
    /// A number.
    Number(f64),
    /// `true` or `false`.
    Bool(bool),
}

/// Built-in string functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `contains(path, "needle")`
    Contains,
    /// `match(path, "prefix*")`, `match(path, "*suffix")`
    Match,
}

impl Function {
    /// The function's source name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Function::Contains => "contains",
            Function::Match => "match",
        }
    }
}

/// Boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    /// `and`
    And,
    /// `or`
    Or,
}

impl Conjunction {
    pub(crate) fn join(self, left: Expr, right: Expr) -> Expr {
        match self {
            Conjunction::And => Expr::And(Box::new(left), Box::new(right)),
            Conjunction::Or => Expr::Or(Box::new(left), Box::new(right)),
        }
    }
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `path op literal`
    Compare {
        /// The field compared.
        path: FieldPath,
        /// The operator.
        op: CompareOp,
        /// The literal operand.
        value: Literal,
    },
    /// `path != null`
    Exists(FieldPath),
    /// `path = null`
    Missing(FieldPath),
    /// `function(path, "pattern")`
    Call {
        /// The function.
        function: Function,
        /// The field inspected.
        path: FieldPath,
        /// The string argument.
        pattern: String,
    },
    /// `!expr`
    Not(Box<Expr>),
    /// `left and right`
    And(Box<Expr>, Box<Expr>),
    /// `left or right`
    Or(Box<Expr>, Box<Expr>),
}

/// Parse a query into an expression tree.
pub fn parse(query: &str) -> Result<Expr, QueryError> {
    if query.trim().is_empty() {
        return Err(QueryError::Empty);
    }
    grammar::subscription::query(query).map_err(|e| QueryError::Syntax {
        query: query.to_string(),
        line: e.location.line,
        column: e.location.column,
        offset: e.location.offset,
        expected: e.expected.to_string(),
    })
}

/// Evaluate an expression against an event.
pub fn evaluate(expr: &Expr, event: &Event) -> bool {
    eval::evaluate(expr, event)
}

/// A compiled subscription query.
///
/// # Example
///
/// ```rust
/// use actionkit_core::Event;
/// use actionkit_std::query::Query;
///
/// let query: Query = r#"type = "track" and event = "Order Completed""#.parse().unwrap();
/// assert!(query.matches(&Event::track("Order Completed")));
/// assert!(!query.matches(&Event::identify("u-1")));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    /// Parse and compile a query.
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        Ok(Self {
            source: query.to_string(),
            expr: parse(query)?,
        })
    }

    /// The original query text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Whether the event satisfies this query.
    pub fn matches(&self, event: &Event) -> bool {
        evaluate(&self.expr, event)
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write_quoted(f, s),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

// Renders back to query syntax. Only a binary right operand needs
// parentheses because folding is left to right.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { path, op, value } => write!(f, "{path} {} {value}", op.as_str()),
            Expr::Exists(path) => write!(f, "{path} != null"),
            Expr::Missing(path) => write!(f, "{path} = null"),
            Expr::Call {
                function,
                path,
                pattern,
            } => {
                write!(f, "{}({path}, ", function.as_str())?;
                write_quoted(f, pattern)?;
                f.write_str(")")
            }
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Call { .. } => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            Expr::And(left, right) => write_binary(f, left, "and", right),
            Expr::Or(left, right) => write_binary(f, left, "or", right),
        }
    }
}

fn write_binary(f: &mut fmt::Formatter<'_>, left: &Expr, word: &str, right: &Expr) -> fmt::Result {
    match right {
        Expr::And(..) | Expr::Or(..) => write!(f, "{left} {word} ({right})"),
        _ => write!(f, "{left} {word} {right}"),
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
