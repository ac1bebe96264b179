//! WQL tokenizer.
//!
//! Produces a flat token stream with byte spans into the source text. Spans
//! let the condition splitter hand back clauses verbatim.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::ops::Range;

use wgm_core::MigrationIssue;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"^\s+").unwrap();

    /// Metric paths, tag keys/values, function names and `${var}` references
    static ref WORD: Regex = Regex::new(r"^(\$\{\w+\}|[A-Za-z_~][\w.\-*~:]*)").unwrap();

    /// `*`-led wildcard in operand position (`ts(*)`, `env=*prod`)
    static ref WILDCARD: Regex = Regex::new(r"^\*[\w.\-*~]*").unwrap();

    /// Anything digit-led; classified after the match
    static ref NUMERIC: Regex = Regex::new(r"^\d[\w.\-*]*").unwrap();

    static ref NUMBER: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
    static ref DURATION: Regex = Regex::new(r"^\d+[smhdw]$").unwrap();
}

/// Comparison operators accepted in thresholds and tag filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl CmpOp {
    /// Operator as written in PromQL and Grafana math expressions.
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
        }
    }

    /// Mirror the operator for `N op expr` written as `expr op' N`.
    pub fn flip(&self) -> Self {
        match self {
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Gte => CmpOp::Lte,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Lte => CmpOp::Gte,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Neq => CmpOp::Neq,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    Duration(String),
    LParen,
    RParen,
    Comma,
    Cmp(CmpOp),
    Arith(char),
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    /// Source text exactly as written, e.g. `08080` for `Number(8080.0)`.
    pub text: String,
}

impl Token {
    /// Whether a following `*` or `-` is an operand rather than an operator.
    fn opens_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LParen
                | TokenKind::Comma
                | TokenKind::Cmp(_)
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
        )
    }
}

/// Tokenize a WQL expression.
pub fn tokenize(input: &str) -> Result<Vec<Token>, MigrationIssue> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];

        if let Some(m) = WHITESPACE.find(rest) {
            pos += m.end();
            continue;
        }

        let operand_position = tokens.last().map_or(true, Token::opens_operand);
        let (kind, len) = if let Some(m) = WORD.find(rest) {
            (word_kind(m.as_str()), m.end())
        } else if operand_position && rest.starts_with('*') {
            // WILDCARD always matches a leading '*'
            let len = WILDCARD.find(rest).map_or(1, |m| m.end());
            (TokenKind::Ident(rest[..len].to_string()), len)
        } else if let Some(m) = NUMERIC.find(rest) {
            (numeric_kind(m.as_str()), m.end())
        } else if rest.starts_with('"') || rest.starts_with('\'') {
            let (value, len) = read_string(rest, pos)?;
            (TokenKind::Str(value), len)
        } else {
            operator(rest, pos)?
        };

        tokens.push(Token { kind, span: pos..pos + len, text: input[pos..pos + len].to_string() });
        pos += len;
    }

    Ok(tokens)
}

fn word_kind(word: &str) -> TokenKind {
    match word.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        _ => TokenKind::Ident(word.to_string()),
    }
}

fn numeric_kind(text: &str) -> TokenKind {
    if DURATION.is_match(text) {
        return TokenKind::Duration(text.to_string());
    }
    if NUMBER.is_match(text) {
        if let Ok(n) = text.parse::<f64>() {
            return TokenKind::Number(n);
        }
    }
    // digit-led tag values such as 5xx or 10.0.0.1
    TokenKind::Ident(text.to_string())
}

fn read_string(rest: &str, offset: usize) -> Result<(String, usize), MigrationIssue> {
    let mut chars = rest.char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(MigrationIssue::malformed(format!("empty string at offset {offset}"))),
    };

    let mut value = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((value, i + c.len_utf8()));
        } else {
            value.push(c);
        }
    }

    Err(MigrationIssue::malformed(format!("unterminated string starting at offset {offset}")))
}

fn operator(rest: &str, offset: usize) -> Result<(TokenKind, usize), MigrationIssue> {
    for (text, op) in [
        (">=", CmpOp::Gte),
        ("<=", CmpOp::Lte),
        ("!=", CmpOp::Neq),
        ("==", CmpOp::Eq),
    ] {
        if rest.starts_with(text) {
            return Ok((TokenKind::Cmp(op), 2));
        }
    }

    let c = rest.chars().next().unwrap_or_default();
    let kind = match c {
        '>' => TokenKind::Cmp(CmpOp::Gt),
        '<' => TokenKind::Cmp(CmpOp::Lt),
        '=' => TokenKind::Cmp(CmpOp::Eq),
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        ',' => TokenKind::Comma,
        '+' | '-' | '*' | '/' | '%' => TokenKind::Arith(c),
        other => {
            return Err(MigrationIssue::malformed(format!(
                "unexpected character '{other}' at offset {offset}"
            )))
        }
    };
    Ok((kind, c.len_utf8()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_series_with_filters() {
        assert_eq!(
            kinds(r#"ts(cpu.usage, env="prod" and not region=eu-1)"#),
            vec![
                TokenKind::Ident("ts".into()),
                TokenKind::LParen,
                TokenKind::Ident("cpu.usage".into()),
                TokenKind::Comma,
                TokenKind::Ident("env".into()),
                TokenKind::Cmp(CmpOp::Eq),
                TokenKind::Str("prod".into()),
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Ident("region".into()),
                TokenKind::Cmp(CmpOp::Eq),
                TokenKind::Ident("eu-1".into()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_numbers_and_durations() {
        assert_eq!(
            kinds("mavg(10m, ts(x)) >= 0.5"),
            vec![
                TokenKind::Ident("mavg".into()),
                TokenKind::LParen,
                TokenKind::Duration("10m".into()),
                TokenKind::Comma,
                TokenKind::Ident("ts".into()),
                TokenKind::LParen,
                TokenKind::Ident("x".into()),
                TokenKind::RParen,
                TokenKind::RParen,
                TokenKind::Cmp(CmpOp::Gte),
                TokenKind::Number(0.5),
            ]
        );
        assert_eq!(kinds("5xx"), vec![TokenKind::Ident("5xx".into())]);
    }

    #[test]
    fn test_star_is_wildcard_or_multiply() {
        assert_eq!(
            kinds("ts(*) * 100"),
            vec![
                TokenKind::Ident("ts".into()),
                TokenKind::LParen,
                TokenKind::Ident("*".into()),
                TokenKind::RParen,
                TokenKind::Arith('*'),
                TokenKind::Number(100.0),
            ]
        );
    }

    #[test]
    fn test_spans_point_into_source() {
        let input = "ts(a) > 5 and ts(b) < 3";
        let tokens = tokenize(input).unwrap();
        assert_eq!(&input[tokens[0].span.start..tokens[3].span.end], "ts(a)");
        assert_eq!(tokens[6].kind, TokenKind::And);
    }

    #[test]
    fn test_numbers_keep_source_text() {
        let tokens = tokenize("port=08080, v=2.0").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Number(8080.0));
        assert_eq!(tokens[2].text, "08080");
        assert_eq!(tokens[6].text, "2.0");
    }

    #[test]
    fn test_template_variable_is_a_word() {
        assert_eq!(kinds("${env}"), vec![TokenKind::Ident("${env}".into())]);
    }

    #[test]
    fn test_errors_are_malformed_input() {
        assert!(matches!(tokenize(r#"ts("cpu)"#), Err(MigrationIssue::MalformedInput(_))));
        assert!(matches!(tokenize("ts(cpu)[5m]"), Err(MigrationIssue::MalformedInput(_))));
    }

    #[test]
    fn test_cmp_flip() {
        assert_eq!(CmpOp::Gt.flip(), CmpOp::Lt);
        assert_eq!(CmpOp::Lte.flip(), CmpOp::Gte);
        assert_eq!(CmpOp::Eq.symbol(), "==");
    }
}
