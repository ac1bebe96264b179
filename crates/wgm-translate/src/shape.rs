//! Shallow call shape.
//!
//! Reads the token stream into nested calls and atoms, then recognises the
//! only forms the dialect translators accept: a `ts()` selector under at most
//! two wrapping functions, optionally compared against a numeric literal.

use lazy_static::lazy_static;
use regex::Regex;

use wgm_core::MigrationIssue;

use crate::condition::Comparison;
use crate::lexer::{CmpOp, Token, TokenKind};

/// Deepest supported composition, e.g. `percentile(95, mavg(5m, ts(x)))`.
pub const MAX_WRAPPERS: usize = 2;
/// Call nesting the parser follows before giving up on a query.
pub const MAX_NESTING: usize = 32;

lazy_static! {
    static ref WINDOW: Regex = Regex::new(r"^\d+[smhd]$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Call { name: String, args: Vec<Arg> },
    Ident(String),
    Str(String),
    Number(f64),
    Duration(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Term(Term),
    Filters(Vec<TagFilter>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub key: String,
    pub value: String,
    pub negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Avg,
    Max,
    Min,
    Count,
    Stddev,
}

impl Aggregation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Aggregation::Sum),
            "avg" => Some(Aggregation::Avg),
            "max" => Some(Aggregation::Max),
            "min" => Some(Aggregation::Min),
            "count" => Some(Aggregation::Count),
            "stddev" => Some(Aggregation::Stddev),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Count => "count",
            Aggregation::Stddev => "stddev",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Wrapper {
    Aggregate { func: Aggregation, by: Vec<String> },
    Rate,
    Deriv,
    Last,
    MovingAvg { window: String },
    Percentile { p: u8 },
}

impl Wrapper {
    pub fn name(&self) -> &'static str {
        match self {
            Wrapper::Aggregate { func, .. } => func.name(),
            Wrapper::Rate => "rate",
            Wrapper::Deriv => "deriv",
            Wrapper::Last => "last",
            Wrapper::MovingAvg { .. } => "mavg",
            Wrapper::Percentile { .. } => "percentile",
        }
    }

    /// Functions that need a range selector over raw samples.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Wrapper::Rate | Wrapper::Deriv | Wrapper::Last | Wrapper::MovingAvg { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub metric: String,
    pub filters: Vec<TagFilter>,
}

impl Selector {
    pub fn has_wildcard(&self) -> bool {
        self.metric.contains('*') || self.filters.iter().any(|f| f.value.contains('*'))
    }
}

/// A recognised query: wrappers ordered outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryShape {
    pub wrappers: Vec<Wrapper>,
    pub selector: Selector,
}

/// Top-level expression: a series with an optional trailing comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub term: Term,
    pub comparison: Option<Comparison>,
}

/// Read a complete token stream as one expression.
pub fn parse_expression(tokens: &[Token]) -> Result<Expression, MigrationIssue> {
    let mut reader = Reader { tokens, pos: 0, depth: 0 };

    // literal-first comparison: `80 < ts(x)`
    if let (Some(TokenKind::Number(n)), Some(TokenKind::Cmp(op))) = (reader.peek(0), reader.peek(1)) {
        let (threshold, op) = (*n, *op);
        reader.pos += 2;
        let term = reader.term()?;
        reader.expect_end()?;
        return Ok(Expression {
            term,
            comparison: Some(Comparison { op: op.flip(), threshold }),
        });
    }

    let term = reader.term()?;
    let comparison = match reader.peek(0) {
        None => None,
        Some(TokenKind::Cmp(op)) => {
            let op = *op;
            reader.pos += 1;
            let threshold = reader.signed_number()?;
            Some(Comparison { op, threshold })
        }
        Some(TokenKind::And) | Some(TokenKind::Or) => {
            return Err(MigrationIssue::unsupported(
                "boolean combination of series; split the condition first",
            ))
        }
        Some(TokenKind::Arith(c)) => {
            return Err(MigrationIssue::unsupported(format!("arithmetic '{c}' between series")))
        }
        Some(other) => return Err(MigrationIssue::malformed(format!("unexpected {other:?} after series"))),
    };
    reader.expect_end()?;

    Ok(Expression { term, comparison })
}

/// Resolve a term into a selector under its wrappers.
pub fn query_shape(term: &Term) -> Result<QueryShape, MigrationIssue> {
    let mut wrappers = Vec::new();
    let mut current = term;

    loop {
        let (name, args) = match current {
            Term::Call { name, args } => (name.to_ascii_lowercase(), args),
            Term::Ident(id) => {
                return Err(MigrationIssue::malformed(format!("bare identifier '{id}', expected ts(...)")))
            }
            _ => return Err(MigrationIssue::unsupported("constant expression without a series")),
        };

        if name == "ts" {
            let selector = selector(args)?;
            if wrappers.len() > MAX_WRAPPERS {
                return Err(MigrationIssue::unsupported(format!(
                    "{} nested functions; at most {MAX_WRAPPERS} are translated",
                    wrappers.len()
                )));
            }
            return Ok(QueryShape { wrappers, selector });
        }

        let (wrapper, inner) = wrapper(&name, args)?;
        if wrapper.is_range() && !is_ts_call(inner) {
            return Err(MigrationIssue::unsupported(format!(
                "{}() over a derived series",
                wrapper.name()
            )));
        }
        wrappers.push(wrapper);
        current = inner;
    }
}

fn is_ts_call(term: &Term) -> bool {
    matches!(term, Term::Call { name, .. } if name.eq_ignore_ascii_case("ts"))
}

fn selector(args: &[Arg]) -> Result<Selector, MigrationIssue> {
    let mut args = args.iter();
    let metric = match args.next() {
        Some(Arg::Term(Term::Ident(m))) | Some(Arg::Term(Term::Str(m))) => m.clone(),
        Some(Arg::Filters(_)) | None => return Err(MigrationIssue::malformed("ts() without a metric name")),
        Some(Arg::Term(other)) => {
            return Err(MigrationIssue::unsupported(format!("ts() over {other:?}")))
        }
    };
    if metric.contains('$') {
        return Err(MigrationIssue::unsupported(format!("templated metric name '{metric}'")));
    }

    let mut filters = Vec::new();
    for arg in args {
        match arg {
            Arg::Filters(list) => filters.extend(list.iter().cloned()),
            Arg::Term(other) => {
                return Err(MigrationIssue::unsupported(format!("ts() argument {other:?}")))
            }
        }
    }

    Ok(Selector { metric, filters })
}

fn wrapper<'a>(name: &str, args: &'a [Arg]) -> Result<(Wrapper, &'a Term), MigrationIssue> {
    if let Some(func) = Aggregation::parse(name) {
        let (inner, rest) = match args.split_first() {
            Some((Arg::Term(inner), rest)) => (inner, rest),
            _ => return Err(MigrationIssue::malformed(format!("{name}() without a series"))),
        };
        let by = rest
            .iter()
            .map(|arg| match arg {
                Arg::Term(Term::Ident(label)) | Arg::Term(Term::Str(label)) => Ok(label.clone()),
                _ => Err(MigrationIssue::unsupported(format!("{name}() grouping argument {arg:?}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok((Wrapper::Aggregate { func, by }, inner));
    }

    match name {
        "rate" | "deriv" | "last" => {
            let inner = single_series(name, args)?;
            let wrapper = match name {
                "rate" => Wrapper::Rate,
                "deriv" => Wrapper::Deriv,
                _ => Wrapper::Last,
            };
            Ok((wrapper, inner))
        }
        "mavg" => match args {
            [Arg::Term(Term::Duration(window)), Arg::Term(inner)] if WINDOW.is_match(window) => {
                Ok((Wrapper::MovingAvg { window: window.clone() }, inner))
            }
            [Arg::Term(Term::Duration(window)), _] => Err(MigrationIssue::malformed(format!(
                "mavg() window '{window}' must be digits followed by s, m, h or d"
            ))),
            _ => Err(MigrationIssue::malformed("mavg() requires a window and a series")),
        },
        "percentile" => match args {
            [Arg::Term(Term::Number(p)), Arg::Term(inner)] => {
                if p.fract() != 0.0 || !(0.0..=100.0).contains(p) {
                    return Err(MigrationIssue::malformed(format!(
                        "percentile {p} must be an integer between 0 and 100"
                    )));
                }
                Ok((Wrapper::Percentile { p: *p as u8 }, inner))
            }
            _ => Err(MigrationIssue::malformed("percentile() requires a percentile and a series")),
        },
        other => Err(MigrationIssue::unsupported(format!("function {other}() has no mapping"))),
    }
}

fn single_series<'a>(name: &str, args: &'a [Arg]) -> Result<&'a Term, MigrationIssue> {
    match args {
        [Arg::Term(inner)] => Ok(inner),
        [] => Err(MigrationIssue::malformed(format!("{name}() without a series"))),
        _ => Err(MigrationIssue::unsupported(format!("{name}() with extra arguments"))),
    }
}

struct Reader<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self, ahead: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<&'a TokenKind> {
        let kind = self.peek(0);
        if kind.is_some() {
            self.pos += 1;
        }
        kind
    }

    fn expect_end(&self) -> Result<(), MigrationIssue> {
        match self.peek(0) {
            None => Ok(()),
            Some(TokenKind::And) | Some(TokenKind::Or) => Err(MigrationIssue::unsupported(
                "boolean combination of series; split the condition first",
            )),
            Some(other) => Err(MigrationIssue::unsupported(format!("trailing {other:?}"))),
        }
    }

    fn signed_number(&mut self) -> Result<f64, MigrationIssue> {
        match (self.next(), self.peek(0)) {
            (Some(TokenKind::Number(n)), _) => Ok(*n),
            (Some(TokenKind::Arith('-')), Some(TokenKind::Number(n))) => {
                self.pos += 1;
                Ok(-n)
            }
            (Some(TokenKind::Arith('+')), Some(TokenKind::Number(n))) => {
                self.pos += 1;
                Ok(*n)
            }
            (other, _) => Err(MigrationIssue::unsupported(format!(
                "comparison against {other:?} instead of a number"
            ))),
        }
    }

    fn term(&mut self) -> Result<Term, MigrationIssue> {
        match self.next() {
            Some(TokenKind::Ident(name)) if self.peek(0) == Some(&TokenKind::LParen) => {
                if self.depth >= MAX_NESTING {
                    return Err(MigrationIssue::unsupported(format!(
                        "function calls nested deeper than {MAX_NESTING}"
                    )));
                }
                self.pos += 1;
                self.depth += 1;
                let args = self.args(name);
                self.depth -= 1;
                Ok(Term::Call { name: name.clone(), args: args? })
            }
            Some(TokenKind::Ident(id)) => Ok(Term::Ident(id.clone())),
            Some(TokenKind::Str(s)) => Ok(Term::Str(s.clone())),
            Some(TokenKind::Number(n)) => Ok(Term::Number(*n)),
            Some(TokenKind::Duration(d)) => Ok(Term::Duration(d.clone())),
            Some(TokenKind::LParen) => Err(MigrationIssue::unsupported("parenthesised sub-expression")),
            Some(other) => Err(MigrationIssue::malformed(format!("unexpected {other:?}"))),
            None => Err(MigrationIssue::malformed("unexpected end of query")),
        }
    }

    /// Arguments after the opening parenthesis, consuming the closing one.
    fn args(&mut self, call: &str) -> Result<Vec<Arg>, MigrationIssue> {
        let mut args = Vec::new();
        if self.peek(0) == Some(&TokenKind::RParen) {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.arg()?);
            match self.next() {
                Some(TokenKind::Comma) => continue,
                Some(TokenKind::RParen) => return Ok(args),
                Some(TokenKind::Or) => {
                    return Err(MigrationIssue::unsupported(format!("OR inside {call}()")))
                }
                Some(other) => {
                    return Err(MigrationIssue::malformed(format!("unexpected {other:?} in {call}()")))
                }
                None => return Err(MigrationIssue::malformed(format!("unclosed {call}(")))
            }
        }
    }

    fn arg(&mut self) -> Result<Arg, MigrationIssue> {
        if self.at_filter() {
            let mut filters = vec![self.filter()?];
            while self.peek(0) == Some(&TokenKind::And) {
                self.pos += 1;
                filters.push(self.filter()?);
            }
            return Ok(Arg::Filters(filters));
        }
        self.term().map(Arg::Term)
    }

    fn at_filter(&self) -> bool {
        let offset = usize::from(self.peek(0) == Some(&TokenKind::Not));
        matches!(
            (self.peek(offset), self.peek(offset + 1)),
            (Some(TokenKind::Ident(_)), Some(TokenKind::Cmp(CmpOp::Eq | CmpOp::Neq)))
        )
    }

    fn filter(&mut self) -> Result<TagFilter, MigrationIssue> {
        let mut negated = false;
        if self.peek(0) == Some(&TokenKind::Not) {
            negated = true;
            self.pos += 1;
        }

        let key = match self.next() {
            Some(TokenKind::Ident(key)) => key.clone(),
            other => return Err(MigrationIssue::malformed(format!("expected tag key, found {other:?}"))),
        };
        match self.next() {
            Some(TokenKind::Cmp(CmpOp::Eq)) => {}
            Some(TokenKind::Cmp(CmpOp::Neq)) => negated = !negated,
            other => {
                return Err(MigrationIssue::malformed(format!("expected = after '{key}', found {other:?}")))
            }
        }
        let value = match self.tokens.get(self.pos) {
            Some(Token { kind: TokenKind::Ident(v) | TokenKind::Str(v), .. }) => v.clone(),
            // verbatim, so `2.0` and `08080` are not rewritten
            Some(Token { kind: TokenKind::Number(_) | TokenKind::Duration(_), text, .. }) => text.clone(),
            other => {
                let found = other.map(|t| &t.kind);
                return Err(MigrationIssue::malformed(format!("missing value for tag '{key}', found {found:?}")));
            }
        };
        self.pos += 1;

        Ok(TagFilter { key, value, negated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn shape(query: &str) -> Result<QueryShape, MigrationIssue> {
        let expr = parse_expression(&tokenize(query).unwrap())?;
        query_shape(&expr.term)
    }

    #[test]
    fn test_plain_selector_with_filters() {
        let s = shape(r#"ts(cpu.usage, env="prod" and not region=eu, host!=db-1)"#).unwrap();
        assert!(s.wrappers.is_empty());
        assert_eq!(s.selector.metric, "cpu.usage");
        assert_eq!(
            s.selector.filters,
            vec![
                TagFilter { key: "env".into(), value: "prod".into(), negated: false },
                TagFilter { key: "region".into(), value: "eu".into(), negated: true },
                TagFilter { key: "host".into(), value: "db-1".into(), negated: true },
            ]
        );
    }

    #[test]
    fn test_wrappers_outermost_first() {
        let s = shape("percentile(95, mavg(5m, ts(latency)))").unwrap();
        assert_eq!(
            s.wrappers,
            vec![Wrapper::Percentile { p: 95 }, Wrapper::MovingAvg { window: "5m".into() }]
        );
    }

    #[test]
    fn test_aggregation_group_by() {
        let s = shape("sum(ts(requests), env, region)").unwrap();
        assert_eq!(
            s.wrappers,
            vec![Wrapper::Aggregate { func: Aggregation::Sum, by: vec!["env".into(), "region".into()] }]
        );
    }

    #[test]
    fn test_depth_limit() {
        let err = shape("max(sum(avg(ts(x))))").unwrap_err();
        assert!(matches!(err, MigrationIssue::UnsupportedPattern(_)));
    }

    #[test]
    fn test_deep_call_nesting_is_rejected() {
        let query = format!("{}ts(x){}", "f(".repeat(5000), ")".repeat(5000));
        let err = parse_expression(&tokenize(&query).unwrap()).unwrap_err();
        assert!(matches!(err, MigrationIssue::UnsupportedPattern(_)));

        let at_limit = format!("{}ts(x){}", "f(".repeat(MAX_NESTING - 1), ")".repeat(MAX_NESTING - 1));
        assert!(parse_expression(&tokenize(&at_limit).unwrap()).is_ok());
    }

    #[test]
    fn test_numeric_tag_values_are_verbatim() {
        let s = shape("ts(svc.up, port=08080 and version=2.0, v=1.50)").unwrap();
        let values: Vec<&str> = s.selector.filters.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["08080", "2.0", "1.50"]);
    }

    #[test]
    fn test_range_function_needs_raw_series() {
        assert!(shape("rate(sum(ts(x)))").is_err());
        assert!(shape("sum(rate(ts(x)))").is_ok());
    }

    #[test]
    fn test_malformed_windows_and_percentiles() {
        assert!(matches!(shape("mavg(ts(x))"), Err(MigrationIssue::MalformedInput(_))));
        assert!(matches!(shape("mavg(2w, ts(x))"), Err(MigrationIssue::MalformedInput(_))));
        assert!(matches!(shape("percentile(99.9, ts(x))"), Err(MigrationIssue::MalformedInput(_))));
        assert!(matches!(shape("percentile(150, ts(x))"), Err(MigrationIssue::MalformedInput(_))));
    }

    #[test]
    fn test_unknown_function_is_unsupported() {
        assert!(matches!(shape("align(1m, ts(x))"), Err(MigrationIssue::UnsupportedPattern(_))));
        assert!(matches!(shape("hs(latency.hist)"), Err(MigrationIssue::UnsupportedPattern(_))));
    }

    #[test]
    fn test_comparisons() {
        let expr = parse_expression(&tokenize("ts(x) >= -2").unwrap()).unwrap();
        assert_eq!(expr.comparison, Some(Comparison { op: CmpOp::Gte, threshold: -2.0 }));

        let flipped = parse_expression(&tokenize("80 < ts(x)").unwrap()).unwrap();
        assert_eq!(flipped.comparison, Some(Comparison { op: CmpOp::Gt, threshold: 80.0 }));

        assert!(parse_expression(&tokenize("ts(a) > 1 and ts(b) > 2").unwrap()).is_err());
        assert!(parse_expression(&tokenize("ts(a) / ts(b)").unwrap()).is_err());
    }
}
