//! Formula handles and evaluation.
//!
//! A [`Formula`] wraps a parsed expression tree and evaluates it against a
//! resolver that maps positions to the current value of the cell there.
//! Evaluation never fails: problems become in-band [`FormulaError`] values.

use std::sync::Arc;

use super::deps::extract_dependencies;
use super::parser::{self, BinaryOp, Expr, ParseError, UnaryOp};
use super::position::Position;
use super::value::{FormulaError, Value};

/// A parsed formula. Cloning shares the expression tree.
#[derive(Clone, Debug)]
pub struct Formula {
    ast: Arc<Expr>,
}

impl Formula {
    /// Parse formula text without the leading `=`.
    pub fn parse(expression: &str) -> Result<Formula, ParseError> {
        Ok(Formula {
            ast: Arc::new(parser::parse(expression)?),
        })
    }

    /// Evaluate the formula. `resolve` returns the value of the cell at a
    /// position, or `None` if no cell exists there.
    pub fn execute<F>(&self, mut resolve: F) -> Value
    where
        F: FnMut(Position) -> Option<Value>,
    {
        match eval_expr(&self.ast, &mut resolve) {
            Ok(n) => n.into(),
            Err(e) => e.into(),
        }
    }

    /// Canonical text of the formula, without the leading `=`.
    pub fn expression(&self) -> String {
        self.ast.to_string()
    }

    /// Raw leaf positions, possibly invalid or repeated.
    pub fn leaves(&self) -> Vec<Position> {
        self.ast.leaves()
    }

    /// Distinct valid positions the formula reads.
    pub fn referenced_cells(&self) -> Vec<Position> {
        extract_dependencies(&self.ast)
    }
}

fn eval_expr<F>(expr: &Expr, resolve: &mut F) -> Result<f64, FormulaError>
where
    F: FnMut(Position) -> Option<Value>,
{
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Cell(pos) => eval_leaf(*pos, resolve),
        Expr::Unary { op, operand } => {
            let n = eval_expr(operand, resolve)?;
            Ok(match op {
                UnaryOp::Plus => n,
                UnaryOp::Minus => -n,
            })
        }
        Expr::Binary { op, left, right } => {
            let lhs = eval_expr(left, resolve)?;
            let rhs = eval_expr(right, resolve)?;
            let result = match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => {
                    if rhs == 0.0 {
                        return Err(FormulaError::Arithm);
                    }
                    lhs / rhs
                }
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(FormulaError::Arithm)
            }
        }
    }
}

fn eval_leaf<F>(pos: Position, resolve: &mut F) -> Result<f64, FormulaError>
where
    F: FnMut(Position) -> Option<Value>,
{
    if !pos.is_valid() {
        return Err(FormulaError::Ref);
    }
    match resolve(pos) {
        None => Ok(0.0),
        Some(Value::Number(n)) => Ok(n),
        Some(Value::Text(s)) => coerce_text(&s),
        Some(Value::Error(e)) => Err(e),
    }
}

/// Interpret a text value as a number: empty text is 0, anything that is not
/// entirely a finite number is `#VALUE!`.
pub fn coerce_text(text: &str) -> Result<f64, FormulaError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(FormulaError::Value),
    }
}
