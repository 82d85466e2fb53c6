//! Expression parsing by precedence climbing.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Assoc |
//! |-------|-----------|-------|
//! | 1 | `or` | left |
//! | 2 | `and` | left |
//! | 3 | `= == != < <= > >=` | left |
//! | 4 | `+ -` | left |
//! | 5 | `* /` | left |
//! | 6 | `**` | right |
//!
//! `=` is equality inside expressions; assignment consumes its `=` before
//! ever entering the expression parser. `and`/`or` arrive as ordinary
//! identifiers and are recognised here, case-insensitively. Unary minus
//! binds tighter than `*` but looser than `**`, so `-x**2` is `-(x**2)`.

use sable_lex::Token;

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::{ParseError, ParseResult, Parser};

/// Binding power levels. Higher numbers bind tighter.
pub(crate) mod bp {
    pub const MIN: u8 = 0;
    pub const OR: u8 = 2;
    pub const AND: u8 = 4;
    pub const COMPARISON: u8 = 6;
    pub const ADDITIVE: u8 = 8;
    pub const MULTIPLICATIVE: u8 = 10;
    pub const UNARY: u8 = 11;
    pub const POWER: u8 = 12;
}

impl<'a> Parser<'a> {
    /// Parse a complete expression.
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_expr_bp(bp::MIN)
    }

    /// Precedence-climbing core: parse an expression consuming only
    /// operators whose left binding power is at least `min_bp`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((op, left_bp, right_bp)) = self.peek_binop() else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.advance(); // operator
            let rhs = self.parse_expr_bp(right_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    /// The binary operator at the cursor, with its binding powers.
    fn peek_binop(&self) -> Option<(BinOp, u8, u8)> {
        let op = match self.current() {
            Token::Ident(word) if word.eq_ignore_ascii_case("or") => BinOp::Or,
            Token::Ident(word) if word.eq_ignore_ascii_case("and") => BinOp::And,
            Token::Eq | Token::EqEq => BinOp::Eq,
            Token::NotEq => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::LtEq => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::GtEq => BinOp::Ge,
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::StarStar => BinOp::Pow,
            _ => return None,
        };

        let powers = match op {
            BinOp::Or => (bp::OR, bp::OR + 1),
            BinOp::And => (bp::AND, bp::AND + 1),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                (bp::COMPARISON, bp::COMPARISON + 1)
            }
            BinOp::Add | BinOp::Sub => (bp::ADDITIVE, bp::ADDITIVE + 1),
            BinOp::Mul | BinOp::Div => (bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1),
            // Right-associative: recurse at the same level.
            BinOp::Pow => (bp::POWER, bp::POWER),
        };
        Some((op, powers.0, powers.1))
    }

    /// A prefix expression: literal, variable, call, array element,
    /// parenthesised expression or unary sign.
    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.current().clone() {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Token::Str(value) => {
                self.advance();
                Ok(Expr::Str(value))
            }
            Token::Dot => {
                self.advance();
                Ok(Expr::Missing)
            }
            Token::MacroVar(name) => {
                self.advance();
                Ok(Expr::MacroVar(name))
            }
            Token::Minus => {
                self.advance();
                let operand = self.parse_expr_bp(bp::UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Token::Plus => {
                // Unary plus is a no-op.
                self.advance();
                self.parse_expr_bp(bp::UNARY)
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "to close '('")?;
                Ok(inner)
            }
            Token::Eof => Err(ParseError::Incomplete),
            token => {
                let Some(name) = token.ident_text().map(str::to_string) else {
                    return Err(
                        self.syntax_error(format!("expected expression, found {token}"))
                    );
                };
                self.advance();

                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "to close the argument list")?;
                    Ok(Expr::FuncCall { name, args })
                } else if self.eat(&Token::LBracket) {
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "to close the subscript")?;
                    Ok(Expr::ArrayElem {
                        array: name,
                        index: Box::new(index),
                    })
                } else if self.eat(&Token::LBrace) {
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBrace, "to close the subscript")?;
                    Ok(Expr::ArrayElem {
                        array: name,
                        index: Box::new(index),
                    })
                } else {
                    Ok(Expr::Var(name))
                }
            }
        }
    }
}
