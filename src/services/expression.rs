//! Binary arithmetic expressions of the form `"<a> <op> <b>"`.
//!
//! Parsed into a typed [`Expression`] and computed directly; expression text
//! is never executed.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder rendered for an expression that cannot be computed
pub const ERROR_MARKER: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("Malformed expression '{0}': expected '<number> <operator> <number>'")]
    Malformed(String),

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        }
    }
}

impl FromStr for Operator {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            other => Err(ExpressionError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub lhs: f64,
    pub operator: Operator,
    pub rhs: f64,
}

impl Expression {
    pub fn evaluate(&self) -> Result<f64, ExpressionError> {
        match self.operator {
            Operator::Add => Ok(self.lhs + self.rhs),
            Operator::Subtract => Ok(self.lhs - self.rhs),
            Operator::Multiply => Ok(self.lhs * self.rhs),
            Operator::Divide if self.rhs == 0.0 => Err(ExpressionError::DivisionByZero),
            Operator::Divide => Ok(self.lhs / self.rhs),
        }
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ExpressionError::Malformed(s.to_string());
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [lhs, operator, rhs] = tokens.as_slice() else {
            return Err(malformed());
        };

        let parse_operand = |token: &str| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(malformed)
        };

        Ok(Expression {
            lhs: parse_operand(lhs)?,
            operator: operator.parse()?,
            rhs: parse_operand(rhs)?,
        })
    }
}

/// Parse and compute `expression`.
pub fn evaluate_expression(expression: &str) -> Result<f64, ExpressionError> {
    expression.parse::<Expression>()?.evaluate()
}

/// Render `"<expression> = <value>"`, or `"<expression> = ERROR"` when the
/// expression is malformed or divides by zero.
pub fn render_result(expression: &str, precision: Option<usize>) -> String {
    let value = match evaluate_expression(expression) {
        Ok(value) => format_number(value, precision),
        Err(_) => ERROR_MARKER.to_string(),
    };
    format!("{expression} = {value}")
}

pub fn is_error_result(rendered: &str) -> bool {
    rendered.ends_with(&format!("= {ERROR_MARKER}"))
}

fn format_number(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(digits) => format!("{value:.digits$}"),
        None if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
            format!("{}", value as i64)
        }
        None => value.to_string(),
    }
}

/// `count` random expressions with operands in `1..=100`.
pub fn generate_expressions<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<String> {
    (0..count)
        .map(|_| {
            let lhs: u32 = rng.random_range(1..=100);
            let rhs: u32 = rng.random_range(1..=100);
            let operator = Operator::ALL[rng.random_range(0..Operator::ALL.len())];
            format!("{lhs} {operator} {rhs}")
        })
        .collect()
}
