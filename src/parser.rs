use tracing::trace;

use crate::{
    ast::{BinaryOp, Expression},
    lex::{Error as LexerError, Lexer, Token, TokenType},
};

/// Maximum tree depth accepted by [parse]. Parentheses, function calls and
///  every applied binary operator each count as one level.
pub const DEFAULT_MAX_DEPTH: usize = 256;

impl TryFrom<TokenType> for BinaryOp {
    type Error = ();
    fn try_from(value: TokenType) -> Result<Self, Self::Error> {
        match value {
            TokenType::Asterisk => Ok(BinaryOp::Mul),
            TokenType::ForwardSlash => Ok(BinaryOp::Div),
            TokenType::Plus => Ok(BinaryOp::Add),
            TokenType::Minus => Ok(BinaryOp::Sub),
            TokenType::LT => Ok(BinaryOp::Lt),
            TokenType::LTE => Ok(BinaryOp::Le),
            TokenType::GT => Ok(BinaryOp::Gt),
            TokenType::GTE => Ok(BinaryOp::Ge),
            TokenType::DoubleEquals => Ok(BinaryOp::Eq),
            TokenType::NotEquals => Ok(BinaryOp::Ne),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Returned when the input is empty (or just whitespace)
    #[error("empty expression")]
    NoExpression,
    #[error("lexical error: {0}")]
    Lexical(#[from] LexerError),
    #[error("missing closing parenthesis at {position}")]
    MissingCloseParen { position: usize },
    #[error("unexpected '{text}' at {position}")]
    UnexpectedToken { text: String, position: usize },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expression is nested more than {max_depth} levels deep")]
    NestingTooDeep { max_depth: usize },
}

impl Error {
    /// Byte offset in the source where parsing failed, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::MissingCloseParen { position } | Self::UnexpectedToken { position, .. } => {
                Some(*position)
            }
            Self::Lexical(
                LexerError::UnexpectedCharacter(p)
                | LexerError::InvalidEscape(p)
                | LexerError::UnterminatedStringLiteral(p),
            ) => Some(*p),
            _ => None,
        }
    }
}

/// Parses a whole expression. The input is treated as though it were
///  wrapped in one pair of parentheses, but that implicit pair does not show
///  up in the returned tree.
pub fn parse(input: &str) -> Result<Expression<'_>, Error> {
    parse_with_depth(input, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_depth(input: &str, max_depth: usize) -> Result<Expression<'_>, Error> {
    let mut parser = Parser {
        lexer: Lexer::new(input),
        max_depth,
    };

    if parser.lexer.peek_token()?.is_none() {
        return Err(Error::NoExpression);
    }

    let root = parser.parse_binary_op(0, 0)?;

    // Make sure we've completely parsed the input
    if let Some(tok) = parser.lexer.next_token()? {
        return Err(parser.unexpected(&tok));
    }
    trace!(tree = %root, "parsed expression");
    Ok(root)
}

struct Parser<'input> {
    lexer: Lexer<'input>,
    max_depth: usize,
}

impl<'input> Parser<'input> {
    fn unexpected(&self, token: &Token) -> Error {
        Error::UnexpectedToken {
            text: self.lexer.source_of(token).to_string(),
            position: token.start(),
        }
    }

    fn expect_token(&mut self) -> Result<Token, Error> {
        self.lexer.next_token()?.ok_or(Error::UnexpectedEof)
    }

    // Operators chained in this loop build a left-deep tree, so each one
    //  applied nests `lhs` one level further.
    fn parse_binary_op(
        &mut self,
        min_binding_power: u8,
        mut depth: usize,
    ) -> Result<Expression<'input>, Error> {
        let mut lhs = self.parse_atom(depth)?;

        // now that we have our left side, expect a series of operators
        loop {
            let Some(op_tok) = self.lexer.peek_token()? else {
                break;
            };
            let Some((l_pow, r_pow)) = infix_binding(op_tok.ty) else {
                break;
            };
            if l_pow < min_binding_power {
                break;
            }
            let Ok(op) = BinaryOp::try_from(op_tok.ty) else {
                return Err(self.unexpected(&op_tok));
            };
            depth = self.descend(depth)?;

            // Consume the operator token
            _ = self.lexer.next_token()?;

            let rhs = self.parse_binary_op(r_pow, depth)?;
            lhs = Expression::binary(lhs, op, rhs);
        }

        Ok(lhs)
    }

    fn parse_atom(&mut self, depth: usize) -> Result<Expression<'input>, Error> {
        let tok = self.expect_token()?;
        match tok.ty {
            // Open paren: parse the internal expression and expect a closing paren
            TokenType::ParenLeft => {
                let depth = self.descend(depth)?;
                let inner = self.parse_binary_op(0, depth)?;
                match self.lexer.next_token()? {
                    Some(Token {
                        ty: TokenType::ParenRight,
                        ..
                    }) => Ok(Expression::parenthesized(inner)),
                    Some(other) => Err(Error::MissingCloseParen {
                        position: other.start(),
                    }),
                    None => Err(Error::MissingCloseParen {
                        position: self.lexer.position(),
                    }),
                }
            }

            // A sign is only part of a number when it touches the digits
            TokenType::Minus => match self.lexer.peek_token()? {
                Some(num) if num.ty == TokenType::Number && num.start() == tok.end() => {
                    _ = self.lexer.next_token()?;
                    Ok(Expression::NumberLiteral(
                        self.lexer.slice(tok.start(), num.end()),
                    ))
                }
                _ => Err(self.unexpected(&tok)),
            },

            TokenType::Number => Ok(Expression::NumberLiteral(self.lexer.source_of(&tok))),
            TokenType::String => Ok(Expression::StringLiteral(self.lexer.contents(&tok))),

            TokenType::Identifier => {
                let name = self.lexer.source_of(&tok);
                if name.eq_ignore_ascii_case("null") {
                    return Ok(Expression::Null);
                }
                match self.lexer.peek_token()? {
                    Some(Token {
                        ty: TokenType::ParenLeft,
                        ..
                    }) => self.parse_fn_call(name, depth),
                    Some(Token {
                        ty: TokenType::Dot, ..
                    }) => self.parse_related(name),
                    _ => Ok(Expression::Attribute(name)),
                }
            }

            _ => Err(self.unexpected(&tok)),
        }
    }

    // Handles `relationship.column` and `relationship.count`
    fn parse_related(&mut self, relationship: &'input str) -> Result<Expression<'input>, Error> {
        // We've only peeked the Dot, consume it now
        _ = self.lexer.next_token()?;
        let tok = self.expect_token()?;
        if tok.ty != TokenType::Identifier {
            return Err(self.unexpected(&tok));
        }
        let column = self.lexer.source_of(&tok);
        if column.eq_ignore_ascii_case("count") {
            Ok(Expression::RelatedCount(relationship))
        } else {
            Ok(Expression::RelatedAttribute {
                relationship,
                column,
            })
        }
    }

    // Arguments are atoms, not full expressions: `concat(a + b)` is rejected
    //  while `concat((a + b))` is fine.
    fn parse_fn_call(
        &mut self,
        name: &'input str,
        depth: usize,
    ) -> Result<Expression<'input>, Error> {
        let depth = self.descend(depth)?;
        // We've only peeked the ParenLeft
        _ = self.lexer.next_token()?;

        let mut args = Vec::new();
        if self.lexer.consume(TokenType::ParenRight)? {
            return Ok(Expression::FunctionCall { name, args });
        }
        loop {
            args.push(self.parse_atom(depth)?);
            let tok = self.expect_token()?;
            match tok.ty {
                TokenType::Comma => continue,
                TokenType::ParenRight => break,
                _ => return Err(self.unexpected(&tok)),
            }
        }
        Ok(Expression::FunctionCall { name, args })
    }

    fn descend(&self, depth: usize) -> Result<usize, Error> {
        if depth >= self.max_depth {
            Err(Error::NestingTooDeep {
                max_depth: self.max_depth,
            })
        } else {
            Ok(depth + 1)
        }
    }
}

// NOTE infix_binding specifies the "binding power" of the infix operators.
//  Binding power is a more intuitive version of "precedence": higher binding
//  power means the operator binds more tightly. The right side is one higher
//  than the left so that ties associate to the left.
fn infix_binding(ty: TokenType) -> Option<(u8, u8)> {
    match ty {
        TokenType::Asterisk | TokenType::ForwardSlash => Some((60, 61)),
        TokenType::Plus | TokenType::Minus => Some((50, 51)),
        TokenType::LT
        | TokenType::LTE
        | TokenType::GT
        | TokenType::GTE
        | TokenType::DoubleEquals
        | TokenType::NotEquals => Some((40, 41)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(input: &str) -> String {
        parse(input)
            .map(|root| format!("{root:#}"))
            .unwrap_or_else(|e| panic!("failed to parse {input:?}: {e}"))
    }

    #[test]
    fn precedence() {
        assert_eq!(tree("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(tree("1 * 2 + 3"), "((1 * 2) + 3)");
        assert_eq!(tree("a + 1 < b * 2"), "((a + 1) < (b * 2))");
        assert_eq!(tree("(1 + 2) * 3"), "(((1 + 2)) * 3)");
    }

    #[test]
    fn left_associative() {
        assert_eq!(tree("a - b - c"), "((a - b) - c)");
        assert_eq!(tree("a / b * c"), "((a / b) * c)");
        assert_eq!(tree("a == b != c"), "((a == b) != c)");
    }

    #[test]
    fn root_is_not_wrapped() {
        let root = parse("a == 1").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::Eq, rhs) = root else {
            panic!("Expected an Eq, got a {root:?}")
        };
        assert_eq!(*lhs, Expression::Attribute("a"));
        assert_eq!(*rhs, Expression::NumberLiteral("1"));

        let root = parse("(a)").expect("a valid parse");
        assert_eq!(
            root,
            Expression::parenthesized(Expression::Attribute("a"))
        );
    }

    #[test]
    fn atoms() {
        assert_eq!(parse("NuLL"), Ok(Expression::Null));
        assert_eq!(parse("nullable"), Ok(Expression::Attribute("nullable")));
        assert_eq!(parse("-0.50e2"), Ok(Expression::NumberLiteral("-0.50e2")));
        assert_eq!(parse(r#""a\"b""#), Ok(Expression::StringLiteral(r#"a\"b"#)));
        assert_eq!(parse("orders.COUNT"), Ok(Expression::RelatedCount("orders")));
        assert_eq!(
            parse("owner . name"),
            Ok(Expression::RelatedAttribute {
                relationship: "owner",
                column: "name"
            })
        );
        assert_eq!(
            parse("items.counts"),
            Ok(Expression::RelatedAttribute {
                relationship: "items",
                column: "counts"
            })
        );
    }

    #[test]
    fn signs() {
        assert_eq!(tree("a -1"), "(a - 1)");
        assert_eq!(tree("a - -1"), "(a - -1)");
        assert_eq!(tree("-1 + 2"), "(-1 + 2)");
        assert_eq!(
            parse("- 1"),
            Err(Error::UnexpectedToken {
                text: "-".into(),
                position: 0
            })
        );
        assert!(parse("-a").is_err());
    }

    #[test]
    fn fn_calls() {
        let root = parse(r#"concat(a, "-", owner.name)"#).expect("a valid parse");
        let Expression::FunctionCall { name, args } = root else {
            panic!("Expected a FunctionCall, got a {root:?}")
        };
        assert_eq!(name, "concat");
        assert_eq!(
            args,
            vec![
                Expression::Attribute("a"),
                Expression::StringLiteral("-"),
                Expression::RelatedAttribute {
                    relationship: "owner",
                    column: "name"
                },
            ]
        );

        assert_eq!(
            parse("concat()"),
            Ok(Expression::FunctionCall {
                name: "concat",
                args: vec![]
            })
        );
        assert_eq!(tree("concat((a + b), c)"), "concat(((a + b)), c)");
        // Parsing accepts any name; unknown functions fail during evaluation
        assert_eq!(tree("shout(a)"), "shout(a)");
    }

    #[test]
    fn fn_args_are_atoms() {
        assert_eq!(
            parse("concat(a + b)"),
            Err(Error::UnexpectedToken {
                text: "+".into(),
                position: 9
            })
        );
        assert_eq!(
            parse("concat(a,)"),
            Err(Error::UnexpectedToken {
                text: ")".into(),
                position: 9
            })
        );
        assert_eq!(parse("concat(a"), Err(Error::UnexpectedEof));
    }

    #[test]
    fn malformed() {
        assert_eq!(parse(""), Err(Error::NoExpression));
        assert_eq!(parse("   "), Err(Error::NoExpression));
        assert_eq!(parse("()"), Err(Error::UnexpectedToken {
            text: ")".into(),
            position: 1
        }));
        assert_eq!(parse("(a"), Err(Error::MissingCloseParen { position: 2 }));
        assert_eq!(parse("(a b)"), Err(Error::MissingCloseParen { position: 3 }));
        assert_eq!(
            parse("a)"),
            Err(Error::UnexpectedToken {
                text: ")".into(),
                position: 1
            })
        );
        assert_eq!(
            parse("a b"),
            Err(Error::UnexpectedToken {
                text: "b".into(),
                position: 2
            })
        );
        assert_eq!(parse("a +"), Err(Error::UnexpectedEof));
        assert_eq!(
            parse("007"),
            Err(Error::UnexpectedToken {
                text: "0".into(),
                position: 1
            })
        );
        assert_eq!(
            parse("owner.5"),
            Err(Error::UnexpectedToken {
                text: "5".into(),
                position: 6
            })
        );
        assert!(matches!(
            parse("a = 1"),
            Err(Error::Lexical(LexerError::UnexpectedCharacter(2)))
        ));
    }

    #[test]
    fn error_positions() {
        assert_eq!(parse("a b").unwrap_err().position(), Some(2));
        assert_eq!(parse(r#"a + "x"#).unwrap_err().position(), Some(4));
        assert_eq!(parse("a +").unwrap_err().position(), None);
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}a{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_with_depth(&deep, 10).is_ok());
        assert_eq!(
            parse_with_depth(&deep, 9),
            Err(Error::NestingTooDeep { max_depth: 9 })
        );

        let calls = format!("{}a{}", "concat(".repeat(5), ")".repeat(5));
        assert_eq!(
            parse_with_depth(&calls, 4),
            Err(Error::NestingTooDeep { max_depth: 4 })
        );
    }

    #[test]
    fn operator_chains_count_toward_depth() {
        assert!(parse_with_depth("a + b + c", 2).is_ok());
        assert_eq!(
            parse_with_depth("a + b + c + d", 2),
            Err(Error::NestingTooDeep { max_depth: 2 })
        );
        // The operand on the right is parsed one level down
        assert!(parse_with_depth("(a + b)", 2).is_ok());
        assert_eq!(
            parse_with_depth("(a + b)", 1),
            Err(Error::NestingTooDeep { max_depth: 1 })
        );

        let chain = vec!["a"; 100_000].join(" - ");
        assert_eq!(
            parse(&chain),
            Err(Error::NestingTooDeep {
                max_depth: DEFAULT_MAX_DEPTH
            })
        );
    }
}
