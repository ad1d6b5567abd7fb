//! Arithmetic entry for consumption readings, e.g. `1520.5 - 1270` for a
//! sub-meter read at two dates.

use thiserror::Error;

const CONSUMPTION_DECIMALS: i32 = 4;

/// Deepest nesting of parentheses and unary signs the parser will follow.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("consumption cannot be negative ({0})")]
    Negative(f64),
    #[error("expression nests deeper than {} levels", MAX_NESTING)]
    TooDeep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Evaluates `+ - * /` over decimal literals with the usual precedence.
pub fn evaluate(input: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::UnexpectedToken(parser.pos));
    }
    if !value.is_finite() {
        return Err(ExprError::NotFinite);
    }
    Ok(value)
}

/// Evaluates a consumption entry and rounds it to four decimal places.
pub fn evaluate_consumption(input: &str) -> Result<f64, ExprError> {
    let value = round_to(evaluate(input)?, CONSUMPTION_DECIMALS);
    if value < 0.0 {
        return Err(ExprError::Negative(value));
    }
    // Normalise -0.0.
    Ok(value + 0.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => {}
            '+' => tokens.push(Token::Plus),
            '-' | '−' => tokens.push(Token::Minus),
            '*' | '×' => tokens.push(Token::Star),
            '/' | '÷' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '0'..='9' | '.' => {
                let start = i;
                while i + 1 < chars.len() && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.')
                {
                    i += 1;
                }
                let literal: String = chars[start..=i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(ExprError::UnexpectedChar(other, i)),
        }
        i += 1;
    }
    Ok(tokens)
}

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
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        match self.next() {
            Some(Token::Number(v)) => Ok(v),
            Some(Token::Minus) => Ok(-self.nested(Self::factor)?),
            Some(Token::Plus) => self.nested(Self::factor),
            Some(Token::LParen) => {
                let value = self.nested(Self::expression)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(ExprError::UnexpectedToken(self.pos - 1)),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(_) => Err(ExprError::UnexpectedToken(self.pos - 1)),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<f64, ExprError>,
    ) -> Result<f64, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }
}
