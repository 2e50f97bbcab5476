//! Recursive-descent parser for evaluator expressions.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('-' | '+') unary | power
//! power  := atom (('^' | '**') unary)?
//! atom   := number | ident | ident '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use super::{BinaryOp, Expr, UnaryOp};
use crate::errors::{ChimesError, ChimesResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Comma,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    position: usize,
}

fn error(input: &str, position: usize, message: impl Into<String>) -> ChimesError {
    ChimesError::Parse {
        input: input.to_string(),
        position,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> ChimesResult<Vec<SpannedToken>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 1;
                Token::Caret
            }
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'^' => Token::Caret,
            b',' => Token::Comma,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'0'..=b'9' | b'.' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                    pos += 1;
                }
                if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
                    let mut end = pos + 1;
                    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
                        end += 1;
                    }
                    if end < bytes.len() && bytes[end].is_ascii_digit() {
                        while end < bytes.len() && bytes[end].is_ascii_digit() {
                            end += 1;
                        }
                        pos = end;
                    }
                }
                let text = &input[start..pos];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| error(input, start, format!("invalid number '{}'", text)))?;
                tokens.push(SpannedToken {
                    token: Token::Number(value),
                    position: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push(SpannedToken {
                    token: Token::Ident(input[start..pos].to_string()),
                    position: start,
                });
                continue;
            }
            _ => {
                return Err(error(
                    input,
                    start,
                    format!("unexpected character '{}'", c as char),
                ))
            }
        };
        pos += 1;
        tokens.push(SpannedToken {
            token,
            position: start,
        });
    }

    tokens.push(SpannedToken {
        token: Token::Eof,
        position: input.len(),
    });
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

pub(super) fn parse(input: &str) -> ChimesResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected trailing input {:?}", other))),
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ChimesError {
        error(self.input, self.tokens[self.pos].position, message)
    }

    fn expect(&mut self, expected: Token) -> ChimesResult<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, got {:?}", expected, self.peek())))
        }
    }

    fn expr(&mut self) -> ChimesResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> ChimesResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> ChimesResult<Expr> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(match self.unary()? {
                    Expr::Constant(c) => Expr::Constant(-c),
                    other => Expr::unary(UnaryOp::Neg, other),
                })
            }
            Token::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> ChimesResult<Expr> {
        let base = self.atom()?;
        if *self.peek() == Token::Caret {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> ChimesResult<Expr> {
        let start = self.pos;
        match self.advance() {
            Token::Number(value) => Ok(Expr::Constant(value)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    self.advance();
                    let args = self.arguments()?;
                    self.call(&name, args)
                } else {
                    Ok(Expr::Var(name))
                }
            }
            other => {
                self.pos = start;
                Err(self.error(format!("expected a value, got {:?}", other)))
            }
        }
    }

    fn arguments(&mut self) -> ChimesResult<Vec<Expr>> {
        let mut args = vec![self.expr()?];
        while *self.peek() == Token::Comma {
            self.advance();
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn call(&self, name: &str, mut args: Vec<Expr>) -> ChimesResult<Expr> {
        let arity = match name {
            "exp" | "ln" | "log" | "sqrt" | "abs" | "transpose" => 1,
            "pow" | "min" | "max" | "sum_axis" | "matmul" | "dot" => 2,
            _ => return Err(self.error(format!("unknown function '{}'", name))),
        };
        if args.len() != arity {
            return Err(self.error(format!(
                "'{}' takes {} argument(s), got {}",
                name,
                arity,
                args.len()
            )));
        }

        if arity == 1 {
            let arg = args.remove(0);
            return Ok(match name {
                "exp" => Expr::unary(UnaryOp::Exp, arg),
                "ln" | "log" => Expr::unary(UnaryOp::Ln, arg),
                "sqrt" => Expr::unary(UnaryOp::Sqrt, arg),
                "abs" => Expr::unary(UnaryOp::Abs, arg),
                _ => Expr::Transpose(Box::new(arg)),
            });
        }

        let rhs = args.remove(1);
        let lhs = args.remove(0);
        Ok(match name {
            "pow" => Expr::binary(BinaryOp::Pow, lhs, rhs),
            "min" => Expr::binary(BinaryOp::Min, lhs, rhs),
            "max" => Expr::binary(BinaryOp::Max, lhs, rhs),
            "matmul" => Expr::MatVec(Box::new(lhs), Box::new(rhs)),
            "dot" => Expr::Dot(Box::new(lhs), Box::new(rhs)),
            _ => match rhs {
                Expr::Constant(axis) if axis == 0.0 || axis == 1.0 => {
                    Expr::SumAxis(Box::new(lhs), axis as usize)
                }
                _ => return Err(self.error("sum_axis expects a literal axis of 0 or 1")),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{dot, exp, matmul, pow, sum_axis, transpose, var};

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(
            parse("a + b * c").unwrap(),
            var("a") + var("b") * var("c")
        );
        assert_eq!(parse("a - b - c").unwrap(), var("a") - var("b") - var("c"));
        assert_eq!(
            parse("a ^ b ^ c").unwrap(),
            pow(var("a"), pow(var("b"), var("c")))
        );
        assert_eq!(parse("x ** 2").unwrap(), pow(var("x"), 2.0));
        assert_eq!(parse("-x ^ 2").unwrap(), -pow(var("x"), 2.0));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse("1.5e-3").unwrap(), Expr::Constant(1.5e-3));
        assert_eq!(parse("-2").unwrap(), Expr::Constant(-2.0));
        assert!(parse("1e").unwrap_err().to_string().contains("trailing"));
        assert!(parse("1..2").is_err());
    }

    #[test]
    fn function_calls() {
        assert_eq!(
            parse("k0 + k1 * exp(k2 * pi)").unwrap(),
            var("k0") + var("k1") * exp(var("k2") * var("pi"))
        );
        assert_eq!(
            parse("Y - matmul(transpose(Gamma), Y)").unwrap(),
            var("Y") - matmul(transpose(var("Gamma")), var("Y"))
        );
        assert_eq!(parse("sum_axis(M, 1)").unwrap(), sum_axis(var("M"), 1));
        assert_eq!(parse("dot(p, C)").unwrap(), dot(var("p"), var("C")));
    }

    #[test]
    fn errors_carry_position() {
        match parse("a + * b").unwrap_err() {
            ChimesError::Parse { position, .. } => assert_eq!(position, 4),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse("foo(a)").is_err());
        assert!(parse("exp(a, b)").is_err());
        assert!(parse("sum_axis(M, 2)").is_err());
        assert!(parse("sum_axis(M, axis)").is_err());
        assert!(parse("(a + b").is_err());
        assert!(parse("a $ b").is_err());
        assert!(parse("").is_err());
    }
}
