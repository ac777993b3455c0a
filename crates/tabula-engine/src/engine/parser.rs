//! Formula parser - converts formula text into an expression tree.
//!
//! Supports numbers (`12`, `1.5`, `.5`, `2e-3`), cell references (`A1`,
//! uppercase only), the binary operators `+ - * /`, unary `+ -` and
//! parentheses. Parentheses are not kept in the tree; [`Expr`]'s `Display`
//! re-inserts only the ones precedence requires. An unresolvable reference
//! displays as `#REF!`, which parses back to the same leaf.
//!
//! Trees deeper than [`MAX_DEPTH`] are rejected so that every later walk over
//! the tree stays within a bounded call depth.

use std::fmt;
use thiserror::Error;

use super::position::Position;
use super::value::FormulaError;

/// Deepest expression tree, and deepest nesting of parentheses and signs,
/// the parser accepts.
pub const MAX_DEPTH: usize = 512;

/// Errors produced while tokenizing or parsing formula text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Empty formula")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("Formula nests deeper than {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// A cell reference. Unresolvable references hold [`Position::NONE`].
    Cell(Position),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

const UNARY_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 4;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Cell(_) => ATOM_PRECEDENCE,
            Expr::Unary { .. } => UNARY_PRECEDENCE,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    /// Every cell reference in the tree, left to right, duplicates included.
    pub fn leaves(&self) -> Vec<Position> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Cell(pos) => out.push(*pos),
            Expr::Unary { operand, .. } => operand.collect_leaves(out),
            Expr::Binary { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Cell(pos) => write!(f, "{}", pos),
            Expr::Unary { op, operand } => {
                let sign = match op {
                    UnaryOp::Plus => '+',
                    UnaryOp::Minus => '-',
                };
                write!(f, "{}", sign)?;
                write_operand(f, operand, operand.precedence() < UNARY_PRECEDENCE)
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                write_operand(f, left, left.precedence() < prec)?;
                write!(f, "{}", op.symbol())?;
                // a-(b+c) and a/(b*c) must keep their grouping.
                let right_parens = right.precedence() < prec
                    || (right.precedence() == prec && matches!(op, BinaryOp::Sub | BinaryOp::Div));
                write_operand(f, right, right_parens)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Cell(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Cell(pos) => write!(f, "{}", pos),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '#' => {
                let marker = FormulaError::Ref.as_str();
                if !input[offset..].starts_with(marker) {
                    return Err(ParseError::UnexpectedChar { ch: c, offset });
                }
                for _ in 0..marker.chars().count() {
                    chars.next();
                }
                tokens.push(Token::Cell(Position::NONE));
            }
            'A'..='Z' => {
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_uppercase() {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let digits_start = name.len();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_digit() {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.len() == digits_start {
                    return Err(match chars.peek() {
                        Some(&(offset, ch)) => ParseError::UnexpectedChar { ch, offset },
                        None => ParseError::UnexpectedEnd,
                    });
                }
                // Syntactically a reference, but it may not name a real cell (A0).
                let pos = Position::from_a1(&name).unwrap_or(Position::NONE);
                tokens.push(Token::Cell(pos));
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(&(_, e @ ('e' | 'E'))) = chars.peek() {
                    num_str.push(e);
                    chars.next();
                    if let Some(&(_, sign @ ('+' | '-'))) = chars.peek() {
                        num_str.push(sign);
                        chars.next();
                    }
                    while let Some(&(_, d)) = chars.peek() {
                        if d.is_ascii_digit() {
                            num_str.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(num_str.clone()))?;
                if !num.is_finite() {
                    return Err(ParseError::InvalidNumber(num_str));
                }
                tokens.push(Token::Number(num));
            }
            _ => return Err(ParseError::UnexpectedChar { ch: c, offset }),
        }
    }

    Ok(tokens)
}

/// Parse formula text (without the leading `=`) into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let (expr, _) = parser.parse_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::UnexpectedToken(token.to_string())),
    }
}

/// A subtree and its height.
type Parsed = (Expr, usize);

fn check_height(height: usize) -> Result<usize, ParseError> {
    if height > MAX_DEPTH {
        Err(ParseError::TooDeep(MAX_DEPTH))
    } else {
        Ok(height)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open parentheses and signs above the current token.
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn parse_expr(&mut self) -> Result<Parsed, ParseError> {
        let (mut left, mut height) = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let (right, right_height) = self.parse_term()?;
            height = check_height(height.max(right_height) + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok((left, height))
    }

    fn parse_term(&mut self) -> Result<Parsed, ParseError> {
        let (mut left, mut height) = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let (right, right_height) = self.parse_unary()?;
            height = check_height(height.max(right_height) + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok((left, height))
    }

    fn parse_unary(&mut self) -> Result<Parsed, ParseError> {
        let op = match self.peek() {
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Minus) => UnaryOp::Minus,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        self.enter()?;
        let (operand, height) = self.parse_unary()?;
        self.leave();
        let expr = Expr::Unary {
            op,
            operand: Box::new(operand),
        };
        Ok((expr, check_height(height + 1)?))
    }

    fn parse_primary(&mut self) -> Result<Parsed, ParseError> {
        match self.next() {
            Some(Token::Number(n)) => Ok((Expr::Number(n), 1)),
            Some(Token::Cell(pos)) => Ok((Expr::Cell(pos), 1)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_expr()?;
                self.leave();
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ParseError::UnexpectedToken(other.to_string())),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ParseError::UnexpectedToken(other.to_string())),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(input: &str) -> String {
        parse(input).unwrap().to_string()
    }

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse("12").unwrap(), Expr::Number(12.0));
        assert_eq!(parse("1.5").unwrap(), Expr::Number(1.5));
        assert_eq!(parse(".5").unwrap(), Expr::Number(0.5));
        assert_eq!(parse("2e3").unwrap(), Expr::Number(2000.0));
        assert_eq!(parse("2.5E-1").unwrap(), Expr::Number(0.25));
    }

    #[test]
    fn test_parse_cell_reference() {
        assert_eq!(parse("B3").unwrap(), Expr::Cell(Position::new(2, 1)));
        assert_eq!(parse("A0").unwrap(), Expr::Cell(Position::NONE));
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1+2*3").unwrap();
        match expr {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_canonical_drops_redundant_parens() {
        assert_eq!(canonical("((A1))"), "A1");
        assert_eq!(canonical(" 1 + 2 "), "1+2");
        assert_eq!(canonical("(1-2)+3"), "1-2+3");
        assert_eq!(canonical("(1*2)/3"), "1*2/3");
        assert_eq!(canonical("1+(2*3)"), "1+2*3");
        assert_eq!(canonical("1+(2+3)"), "1+2+3");
    }

    #[test]
    fn test_canonical_keeps_required_parens() {
        assert_eq!(canonical("(1+2)*3"), "(1+2)*3");
        assert_eq!(canonical("1-(2-3)"), "1-(2-3)");
        assert_eq!(canonical("1-(2+3)"), "1-(2+3)");
        assert_eq!(canonical("1/(2*3)"), "1/(2*3)");
        assert_eq!(canonical("-(1+2)"), "-(1+2)");
        assert_eq!(canonical("2*-A1"), "2*-A1");
    }

    #[test]
    fn test_canonical_reparses_to_same_tree() {
        for input in ["(A1+B2)*-(C3/4)", "1-(2-(3-4))", "+1--2", "1e3/(.5+A1)"] {
            let expr = parse(input).unwrap();
            assert_eq!(parse(&expr.to_string()).unwrap(), expr);
        }
    }

    #[test]
    fn test_leaves_keep_order_and_duplicates() {
        let expr = parse("A1+B1*A1-A0").unwrap();
        assert_eq!(
            expr.leaves(),
            vec![
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(0, 0),
                Position::NONE,
            ]
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("1+"), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse("(1+2"), Err(ParseError::UnexpectedEnd));
        assert!(matches!(parse("1+2)"), Err(ParseError::UnexpectedToken(_))));
        assert!(matches!(parse("1 2"), Err(ParseError::UnexpectedToken(_))));
        assert!(matches!(parse("a1"), Err(ParseError::UnexpectedChar { .. })));
        assert!(matches!(parse("SUM(A1)"), Err(ParseError::UnexpectedChar { .. })));
        assert!(matches!(parse("1.2.3"), Err(ParseError::InvalidNumber(_))));
        assert!(matches!(parse("1e"), Err(ParseError::InvalidNumber(_))));
        assert!(matches!(parse("1%"), Err(ParseError::UnexpectedChar { .. })));
        assert!(matches!(parse("#REF"), Err(ParseError::UnexpectedChar { ch: '#', .. })));
        assert!(matches!(parse("#VALUE!"), Err(ParseError::UnexpectedChar { ch: '#', .. })));
    }

    #[test]
    fn test_invalid_reference_reparses() {
        let expr = parse("A0+1").unwrap();
        assert_eq!(expr.to_string(), "#REF!+1");
        assert_eq!(parse("#REF!+1").unwrap(), expr);
        assert_eq!(parse(" - #REF! ").unwrap().leaves(), vec![Position::NONE]);
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(MAX_DEPTH)).unwrap(), Expr::Number(1.0));
        assert_eq!(parse(&nested(MAX_DEPTH + 1)), Err(ParseError::TooDeep(MAX_DEPTH)));
        assert_eq!(parse(&nested(50_000)), Err(ParseError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(50_000));
        assert_eq!(parse(&signs), Err(ParseError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_tree_height_limit() {
        let sum = |terms: usize| vec!["A1"; terms].join("+");
        assert!(parse(&sum(MAX_DEPTH)).is_ok());
        assert_eq!(parse(&sum(MAX_DEPTH + 1)), Err(ParseError::TooDeep(MAX_DEPTH)));
        assert_eq!(parse(&sum(100_000)), Err(ParseError::TooDeep(MAX_DEPTH)));
    }
}
