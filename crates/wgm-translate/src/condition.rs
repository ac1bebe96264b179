//! Alert condition splitting.
//!
//! Wavefront alert conditions are a boolean combination of comparisons
//! (`ts(a) > 80 and ts(b) < 5`). Grafana evaluates one query per clause, so
//! the condition is cut at depth-0 AND/OR and each side keeps its verbatim
//! query text plus the comparison applied to it.

use serde::{Deserialize, Serialize};

use wgm_core::MigrationIssue;

use crate::lexer::{tokenize, CmpOp, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub op: CmpOp,
    pub threshold: f64,
}

impl Default for Comparison {
    /// A bare series fires while it is non-zero.
    fn default() -> Self {
        Self { op: CmpOp::Gt, threshold: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BoolOp::And => "&&",
            BoolOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionClause {
    /// Query text exactly as written, without the comparison.
    pub query: String,
    pub comparison: Comparison,
    pub issue: Option<MigrationIssue>,
}

/// Clauses in source order; `joins[i]` sits between clause `i` and `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCondition {
    pub clauses: Vec<ConditionClause>,
    pub joins: Vec<BoolOp>,
}

/// Split an alert condition into independently evaluated clauses.
///
/// Never fails: a condition that cannot be tokenized comes back as one
/// clause carrying the whole text and the lexer's issue.
pub fn split_condition(condition: &str) -> SplitCondition {
    let tokens = match tokenize(condition) {
        Ok(tokens) => tokens,
        Err(issue) => {
            return SplitCondition {
                clauses: vec![ConditionClause {
                    query: condition.trim().to_string(),
                    comparison: Comparison::default(),
                    issue: Some(issue),
                }],
                joins: Vec::new(),
            }
        }
    };

    let mut clauses = Vec::new();
    let mut joins = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            TokenKind::And | TokenKind::Or if depth == 0 => {
                clauses.push(clause(condition, &tokens[start..i]));
                joins.push(if token.kind == TokenKind::And { BoolOp::And } else { BoolOp::Or });
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(clause(condition, &tokens[start..]));

    SplitCondition { clauses, joins }
}

fn clause(source: &str, tokens: &[Token]) -> ConditionClause {
    let mut depth = 0i32;
    let cmp_at = tokens.iter().position(|t| {
        match t.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            TokenKind::Cmp(_) if depth == 0 => return true,
            _ => {}
        }
        false
    });

    let Some(at) = cmp_at else {
        return ConditionClause {
            query: text_of(source, tokens),
            comparison: Comparison::default(),
            issue: None,
        };
    };

    let op = match tokens[at].kind {
        TokenKind::Cmp(op) => op,
        _ => CmpOp::Gt,
    };
    let (left, right) = (&tokens[..at], &tokens[at + 1..]);

    if let Some(threshold) = literal(right) {
        ConditionClause {
            query: text_of(source, left),
            comparison: Comparison { op, threshold },
            issue: None,
        }
    } else if let Some(threshold) = literal(left) {
        ConditionClause {
            query: text_of(source, right),
            comparison: Comparison { op: op.flip(), threshold },
            issue: None,
        }
    } else {
        ConditionClause {
            query: text_of(source, left),
            comparison: Comparison::default(),
            issue: Some(MigrationIssue::malformed(format!(
                "threshold '{}' is not a number",
                text_of(source, right)
            ))),
        }
    }
}

/// A (possibly signed) numeric literal spanning the whole token slice.
fn literal(tokens: &[Token]) -> Option<f64> {
    match tokens {
        [Token { kind: TokenKind::Number(n), .. }] => Some(*n),
        [Token { kind: TokenKind::Arith('-'), .. }, Token { kind: TokenKind::Number(n), .. }] => Some(-n),
        _ => None,
    }
}

fn text_of(source: &str, tokens: &[Token]) -> String {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => source[first.span.start..last.span.end].to_string(),
        _ => String::new(),
    }
}
