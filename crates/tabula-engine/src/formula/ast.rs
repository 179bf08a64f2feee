//! The formula expression tree: canonical printing and evaluation.

use std::fmt;

use tabula_core::{CellValue, FormulaError, Position};

use crate::engine::Sheet;

/// Binary operators of the formula grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

/// Unary sign operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl UnaryOp {
    fn symbol(self) -> char {
        match self {
            UnaryOp::Plus => '+',
            UnaryOp::Minus => '-',
        }
    }
}

/// A cell reference as written in the formula.
///
/// An out-of-range reference keeps its source text so the canonical form
/// can reproduce it; its position is None and it evaluates to [`FormulaError::Ref`].
#[derive(Clone, Debug, PartialEq)]
pub struct RefNode {
    pub text: String,
    pub pos: Option<Position>,
}

/// A parsed formula expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Reference(RefNode),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

const PREC_ADDITIVE: u8 = 1;
const PREC_MULTIPLICATIVE: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_ATOM: u8 = 4;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Reference(_) => PREC_ATOM,
            Expr::Unary { .. } => PREC_UNARY,
            Expr::Binary {
                op: BinaryOp::Add | BinaryOp::Sub,
                ..
            } => PREC_ADDITIVE,
            Expr::Binary {
                op: BinaryOp::Mul | BinaryOp::Div,
                ..
            } => PREC_MULTIPLICATIVE,
        }
    }

    /// Evaluate against a sheet.
    ///
    /// Reference resolution: absent and empty cells read as 0, numeric text
    /// reads as its number, other text yields Value, out-of-range references
    /// yield Ref. Any non-finite intermediate result yields Div0.
    pub(crate) fn eval(&self, sheet: &Sheet) -> Result<f64, FormulaError> {
        match self {
            // Literal parsing saturates out-of-range input to infinity, so
            // even a bare literal needs the finiteness check.
            Expr::Number(value) => {
                if value.is_finite() {
                    Ok(*value)
                } else {
                    Err(FormulaError::Div0)
                }
            }
            Expr::Reference(reference) => resolve_reference(reference, sheet),
            Expr::Unary { op, operand } => {
                let value = operand.eval(sheet)?;
                let value = match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                };
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(FormulaError::Div0)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let left = lhs.eval(sheet)?;
                let right = rhs.eval(sheet)?;
                let value = match op {
                    BinaryOp::Add => left + right,
                    BinaryOp::Sub => left - right,
                    BinaryOp::Mul => left * right,
                    BinaryOp::Div => left / right,
                };
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(FormulaError::Div0)
                }
            }
        }
    }

    /// Collect every in-range referenced position, in evaluation order.
    pub(crate) fn collect_positions(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Reference(reference) => {
                if let Some(pos) = reference.pos {
                    out.push(pos);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_positions(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_positions(out);
                rhs.collect_positions(out);
            }
        }
    }
}

fn resolve_reference(reference: &RefNode, sheet: &Sheet) -> Result<f64, FormulaError> {
    let Some(pos) = reference.pos else {
        return Err(FormulaError::Ref);
    };
    let Some(cell) = sheet.cell_at(pos) else {
        return Ok(0.0);
    };
    match cell.value(sheet) {
        CellValue::Number(number) => Ok(number),
        CellValue::Error(error) => Err(error),
        CellValue::Text(text) if text.is_empty() => Ok(0.0),
        CellValue::Text(text) => match text.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(number),
            _ => Err(FormulaError::Value),
        },
    }
}

/// Canonical form: no whitespace, parentheses only where removing them
/// would change the parse.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{}", value),
            Expr::Reference(reference) => f.write_str(&reference.text),
            Expr::Unary { op, operand } => {
                write!(f, "{}", op.symbol())?;
                if operand.precedence() <= PREC_ADDITIVE {
                    write!(f, "({})", operand)
                } else {
                    write!(f, "{}", operand)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = self.precedence();
                if lhs.precedence() < prec {
                    write!(f, "({})", lhs)?;
                } else {
                    write!(f, "{}", lhs)?;
                }
                write!(f, "{}", op.symbol())?;
                // The right operand also needs parens at equal precedence
                // under the non-associative operators.
                let keep_parens = rhs.precedence() < prec
                    || (rhs.precedence() == prec
                        && matches!(op, BinaryOp::Sub | BinaryOp::Div));
                if keep_parens {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use crate::engine::Sheet;
    use tabula_core::FormulaError;

    fn canonical(src: &str) -> String {
        parse(src).unwrap().to_string()
    }

    #[test]
    fn test_eval_overflowing_literal_is_division_error() {
        // "1e400" saturates to infinity when lexed; the result set stays
        // closed over finite numbers and the three error codes.
        let sheet = Sheet::new();
        assert_eq!(
            parse("1e400").unwrap().eval(&sheet),
            Err(FormulaError::Div0)
        );
        assert_eq!(
            parse("-1e400").unwrap().eval(&sheet),
            Err(FormulaError::Div0)
        );
    }

    #[test]
    fn test_print_strips_whitespace() {
        assert_eq!(canonical(" 1 +  2 "), "1+2");
        assert_eq!(canonical("A1 * B2"), "A1*B2");
    }

    #[test]
    fn test_print_drops_redundant_parens() {
        assert_eq!(canonical("(1)"), "1");
        assert_eq!(canonical("((A1))"), "A1");
        assert_eq!(canonical("(1*2)+3"), "1*2+3");
        assert_eq!(canonical("1+(2*3)"), "1+2*3");
        assert_eq!(canonical("1+(2-3)"), "1+2-3");
        assert_eq!(canonical("(1/2)/3"), "1/2/3");
        assert_eq!(canonical("1*(2/3)"), "1*2/3");
    }

    #[test]
    fn test_print_keeps_required_parens() {
        assert_eq!(canonical("(1+2)*3"), "(1+2)*3");
        assert_eq!(canonical("1-(2+3)"), "1-(2+3)");
        assert_eq!(canonical("1-(2-3)"), "1-(2-3)");
        assert_eq!(canonical("1/(2*3)"), "1/(2*3)");
        assert_eq!(canonical("1/(2/3)"), "1/(2/3)");
        assert_eq!(canonical("2/(A1+B2)"), "2/(A1+B2)");
    }

    #[test]
    fn test_print_unary_signs() {
        assert_eq!(canonical("-1"), "-1");
        assert_eq!(canonical("+1"), "+1");
        assert_eq!(canonical("--1"), "--1");
        assert_eq!(canonical("-(1+2)"), "-(1+2)");
        assert_eq!(canonical("-(1*2)"), "-1*2");
        assert_eq!(canonical("2+(-3)"), "2+-3");
    }

    #[test]
    fn test_print_round_trips() {
        for src in ["(1+2)*3", "1-(2-3)", "-(A1+B2)/C3", "--1+2"] {
            let printed = canonical(src);
            assert_eq!(canonical(&printed), printed);
        }
    }
}
