//! Arithmetic over a sanitized expression.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::json_number;
use crate::error::OrchestraError;
use crate::tools::{AgentTool, AgentToolParameters};

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9+\-*/().%\s]").expect("calculator sanitize regex must compile"))
}

/// Drop everything that is not a digit, operator, parenthesis, dot or space.
pub(crate) fn sanitize(expression: &str) -> String {
    disallowed_chars().replace_all(expression, "").into_owned()
}

/// `calculate { expression }` -> `{ expression, result }` or `{ error, expression }`.
pub fn calculate_tool() -> AgentTool {
    AgentTool::new(
        "calculate",
        "Perform a mathematical calculation",
        AgentToolParameters::object()
            .string("expression", "Math expression to evaluate", true)
            .build(),
        |args, _ctx| async move {
            let expression = args.get_str("expression")?.to_string();
            let sanitized = sanitize(&expression);
            if sanitized.trim().is_empty() {
                return Ok(json!({ "error": "Invalid result", "expression": expression }));
            }
            Ok(match evaluate_expression(&sanitized) {
                Ok(result) if result.is_finite() => {
                    json!({ "expression": expression, "result": json_number(result) })
                }
                Ok(_) => json!({ "error": "Invalid result", "expression": expression }),
                Err(err) => {
                    tracing::debug!(%expression, error = %err, "calculate failed to evaluate");
                    json!({ "error": "Failed to evaluate", "expression": expression })
                }
            })
        },
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, OrchestraError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                let mut seen_dot = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot)) {
                    seen_dot |= chars[i] == '.';
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| {
                    OrchestraError::InvalidArgument(format!("bad number literal '{literal}'"))
                })?;
                tokens.push(Token::Num(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::StarStar
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(OrchestraError::InvalidArgument(format!(
                    "unexpected character '{other}'"
                )))
            }
        };
        tokens.push(token);
        i += 1;
    }
    Ok(tokens)
}

/// Nesting allowed for parentheses, signs and exponents combined.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, OrchestraError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, OrchestraError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                Token::Slash => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // Every recursive path passes through here, so the depth is bounded in one place.
    fn unary(&mut self) -> Result<f64, OrchestraError> {
        if self.depth >= MAX_DEPTH {
            return Err(OrchestraError::InvalidArgument(format!(
                "expression nested deeper than {MAX_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let value = self.unary_inner();
        self.depth -= 1;
        value
    }

    fn unary_inner(&mut self) -> Result<f64, OrchestraError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // Right-associative: 2 ** 3 ** 2 == 2 ** 9.
    fn power(&mut self) -> Result<f64, OrchestraError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::StarStar) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, OrchestraError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(OrchestraError::InvalidArgument("unbalanced parenthesis".into())),
                }
            }
            Some(other) => Err(OrchestraError::InvalidArgument(format!(
                "unexpected token {other:?}"
            ))),
            None => Err(OrchestraError::InvalidArgument(
                "unexpected end of expression".into(),
            )),
        }
    }
}

/// Evaluate `+ - * / % **` with parentheses and unary signs.
///
/// Division by zero yields an infinite result rather than an error; callers
/// decide what a non-finite value means.
pub fn evaluate_expression(expression: &str) -> Result<f64, OrchestraError> {
    let mut parser = Parser {
        tokens: tokenize(expression)?,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(OrchestraError::InvalidArgument(format!(
            "unexpected trailing token {token:?}"
        )));
    }
    Ok(value)
}
