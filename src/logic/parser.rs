//! Parser for the concrete CLTL syntax.
//!
//! Atoms match `[A-Za-z_][A-Za-z0-9_]*` with the connective names reserved;
//! the connectives are `!`, `&&`, `||`, `->`, parentheses, the temporal
//! operators `X U R G F` and the cost operators `UN RN GN FN`.

use std::fmt;

use logos::Logos;

use super::factory::FormulaFactory;
use super::formula::FormulaId;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("!")]
    Not,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("->")]
    Implies,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

/// An error describing why a CLTL string could not be parsed.
#[derive(Debug)]
pub struct ParseError {
    message: String,
    position: usize,
}

impl ParseError {
    fn new(message: String, position: usize) -> Self {
        Self { message, position }
    }

    /// Byte offset in the input at which the error was detected.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Parses a CLTL formula, allocating its terms in the given factory.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first offending position if the
/// input is not a well-formed formula.
pub fn parse_formula(input: &str, factory: &mut FormulaFactory) -> Result<FormulaId, ParseError> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.slice().to_owned(), lexer.span().start)),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", lexer.slice()),
                    lexer.span().start,
                ))
            }
        }
    }
    let end = input.len();
    let mut parser = Parser {
        factory,
        tokens,
        pos: 0,
        end,
    };
    let formula = parser.parse_imply()?;
    if let Some((_, text, at)) = parser.peek() {
        return Err(ParseError::new(
            format!("unexpected trailing input '{}'", text),
            at,
        ));
    }
    Ok(formula)
}

struct Parser<'f> {
    factory: &'f mut FormulaFactory,
    tokens: Vec<(Token, String, usize)>,
    pos: usize,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<(Token, String, usize)> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn here(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.2)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.tokens.get(self.pos) {
            Some((Token::Ident, text, _)) => Some(text),
            _ => None,
        }
    }

    // imply is right associative and binds weakest
    fn parse_imply(&mut self) -> Result<FormulaId, ParseError> {
        let left = self.parse_or()?;
        if let Some((Token::Implies, _, _)) = self.peek() {
            self.advance();
            let right = self.parse_imply()?;
            return Ok(self.factory.imply(left, right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<FormulaId, ParseError> {
        let mut result = self.parse_and()?;
        while let Some((Token::Or, _, _)) = self.peek() {
            self.advance();
            let right = self.parse_and()?;
            result = self.factory.or(result, right);
        }
        Ok(result)
    }

    fn parse_and(&mut self) -> Result<FormulaId, ParseError> {
        let mut result = self.parse_temporal()?;
        while let Some((Token::And, _, _)) = self.peek() {
            self.advance();
            let right = self.parse_temporal()?;
            result = self.factory.and(result, right);
        }
        Ok(result)
    }

    // binary temporal operators are right associative
    fn parse_temporal(&mut self) -> Result<FormulaId, ParseError> {
        let left = self.parse_unary()?;
        let op = match self.peek_ident() {
            Some("U") => BinaryKeyword::Until,
            Some("R") => BinaryKeyword::Release,
            Some("UN") => BinaryKeyword::CostUntil,
            Some("RN") => BinaryKeyword::CostRelease,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_temporal()?;
        Ok(match op {
            BinaryKeyword::Until => self.factory.until(left, right),
            BinaryKeyword::Release => self.factory.release(left, right),
            BinaryKeyword::CostUntil => self.factory.cost_until(left, right),
            BinaryKeyword::CostRelease => self.factory.cost_release(left, right),
        })
    }

    fn parse_unary(&mut self) -> Result<FormulaId, ParseError> {
        if let Some((Token::Not, _, _)) = self.peek() {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.factory.not(operand));
        }
        if let Some(keyword) = self.peek_ident() {
            let unary = match keyword {
                "X" => Some(UnaryKeyword::Next),
                "G" => Some(UnaryKeyword::Globally),
                "F" => Some(UnaryKeyword::Finally),
                "GN" => Some(UnaryKeyword::CostGlobally),
                "FN" => Some(UnaryKeyword::CostFinally),
                _ => None,
            };
            if let Some(op) = unary {
                self.advance();
                let operand = self.parse_unary()?;
                return Ok(match op {
                    UnaryKeyword::Next => self.factory.next(operand),
                    UnaryKeyword::Globally => self.factory.globally(operand),
                    UnaryKeyword::Finally => self.factory.finally(operand),
                    UnaryKeyword::CostGlobally => self.factory.cost_globally(operand),
                    UnaryKeyword::CostFinally => self.factory.cost_finally(operand),
                });
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FormulaId, ParseError> {
        match self.peek() {
            Some((Token::LeftParen, _, _)) => {
                self.advance();
                let inner = self.parse_imply()?;
                match self.peek() {
                    Some((Token::RightParen, _, _)) => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(ParseError::new("expected ')'".to_owned(), self.here())),
                }
            }
            Some((Token::Ident, text, at)) => {
                self.advance();
                match text.as_str() {
                    "true" => Ok(self.factory.constant(true)),
                    "false" => Ok(self.factory.constant(false)),
                    "U" | "R" | "UN" | "RN" | "X" | "G" | "F" | "GN" | "FN" => Err(
                        ParseError::new(format!("operator '{}' is not a formula", text), at),
                    ),
                    _ => Ok(self.factory.atomic(&text)),
                }
            }
            Some((token, text, at)) => Err(ParseError::new(
                format!("unexpected token '{}' ({:?})", text, token),
                at,
            )),
            None => Err(ParseError::new(
                "unexpected end of input".to_owned(),
                self.end,
            )),
        }
    }
}

enum UnaryKeyword {
    Next,
    Globally,
    Finally,
    CostGlobally,
    CostFinally,
}

enum BinaryKeyword {
    Until,
    Release,
    CostUntil,
    CostRelease,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_connectives_with_their_precedence() {
        let mut factory = FormulaFactory::new();
        let parsed = parse_formula("a -> b && c || d", &mut factory).unwrap();

        let a = factory.atomic("a");
        let b = factory.atomic("b");
        let c = factory.atomic("c");
        let d = factory.atomic("d");
        let bc = factory.and(b, c);
        let or = factory.or(bc, d);
        let expected = factory.imply(a, or);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parses_temporal_and_cost_operators() {
        let mut factory = FormulaFactory::new();
        let parsed = parse_formula("G (req -> F grant) && (a UN b)", &mut factory).unwrap();

        let req = factory.atomic("req");
        let grant = factory.atomic("grant");
        let fg = factory.finally(grant);
        let body = factory.imply(req, fg);
        let g = factory.globally(body);
        let a = factory.atomic("a");
        let b = factory.atomic("b");
        let cost = factory.cost_until(a, b);
        let expected = factory.and(g, cost);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn derived_cost_operators_expand() {
        let mut factory = FormulaFactory::new();
        let parsed = parse_formula("FN p", &mut factory).unwrap();
        let p = factory.atomic("p");
        let expected = factory.cost_finally(p);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn binary_temporal_is_right_associative() {
        let mut factory = FormulaFactory::new();
        let parsed = parse_formula("a U b U c", &mut factory).unwrap();
        let a = factory.atomic("a");
        let b = factory.atomic("b");
        let c = factory.atomic("c");
        let bc = factory.until(b, c);
        let expected = factory.until(a, bc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_malformed_input() {
        let mut factory = FormulaFactory::new();
        assert!(parse_formula("a &&", &mut factory).is_err());
        assert!(parse_formula("(a", &mut factory).is_err());
        assert!(parse_formula("a # b", &mut factory).is_err());
        assert!(parse_formula("U a", &mut factory).is_err());
        assert!(parse_formula("a b", &mut factory).is_err());
    }
}
