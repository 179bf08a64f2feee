//! Recursive-descent parser for formula source.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+'|'-') term)*
//! term    := factor (('*'|'/') factor)*
//! factor  := ('+'|'-') factor | primary
//! primary := NUMBER | CELL | '(' expr ')'
//! ```

use tabula_core::{FormulaParseError, Position};

use super::ast::{BinaryOp, Expr, RefNode, UnaryOp};
use super::lexer::{Token, tokenize};

/// Parse formula source into an expression tree.
pub fn parse(src: &str) -> Result<Expr, FormulaParseError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        index: 0,
    };
    let expr = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(FormulaParseError(format!(
            "unexpected {:?} after expression",
            token
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr, FormulaParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.index += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaParseError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.index += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, FormulaParseError> {
        let op = match self.peek() {
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Minus) => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.index += 1;
            let operand = self.factor()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FormulaParseError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Cell(text)) => {
                let pos = Position::parse(&text);
                Ok(Expr::Reference(RefNode { text, pos }))
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(FormulaParseError("missing closing parenthesis".to_string())),
                }
            }
            Some(token) => Err(FormulaParseError(format!("unexpected {:?}", token))),
            None => Err(FormulaParseError("unexpected end of formula".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_precedence() {
        let expr = parse("1+2*3").unwrap();
        // The multiplication binds tighter: 1+(2*3).
        let Expr::Binary {
            op: BinaryOp::Add,
            rhs,
            ..
        } = expr
        else {
            panic!("expected addition at the root");
        };
        assert!(matches!(
            *rhs,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_left_associativity() {
        let expr = parse("1-2-3").unwrap();
        // (1-2)-3, not 1-(2-3).
        let Expr::Binary {
            op: BinaryOp::Sub,
            lhs,
            rhs,
        } = expr
        else {
            panic!("expected subtraction at the root");
        };
        assert!(matches!(
            *lhs,
            Expr::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
        assert_eq!(*rhs, Expr::Number(3.0));
    }

    #[test]
    fn test_parse_parens_override_precedence() {
        let expr = parse("(1+2)*3").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unary_chain() {
        let expr = parse("--1").unwrap();
        let Expr::Unary {
            op: UnaryOp::Minus,
            operand,
        } = expr
        else {
            panic!("expected unary minus at the root");
        };
        assert!(matches!(
            *operand,
            Expr::Unary {
                op: UnaryOp::Minus,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_cell_references() {
        let expr = parse("A1").unwrap();
        let Expr::Reference(reference) = expr else {
            panic!("expected a reference");
        };
        assert_eq!(reference.text, "A1");
        assert_eq!(reference.pos, Some(Position::new(0, 0)));
    }

    #[test]
    fn test_parse_out_of_range_reference() {
        let expr = parse("ZZZ99999").unwrap();
        let Expr::Reference(reference) = expr else {
            panic!("expected a reference");
        };
        assert_eq!(reference.text, "ZZZ99999");
        assert_eq!(reference.pos, None);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse("").is_err());
        assert!(parse("1+").is_err());
        assert!(parse("(1").is_err());
        assert!(parse(")").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("*3").is_err());
        assert!(parse("1+*2").is_err());
    }
}
