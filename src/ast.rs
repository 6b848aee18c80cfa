use std::fmt::{Display, Formatter, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    /// The operator as written in an expression.
    pub fn token(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    /// The operator as emitted into SQL. Only equality is rewritten.
    pub fn sql(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            other => other.token(),
        }
    }
}

/// One variant per grammar production. Identifiers and literals borrow from
///  the parsed source; string literals keep their escape sequences and are
///  only unescaped when evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression<'input> {
    Parenthesized(Box<Expression<'input>>),
    BinaryOperator(Box<Expression<'input>>, BinaryOp, Box<Expression<'input>>),
    Null,
    FunctionCall {
        name: &'input str,
        args: Vec<Expression<'input>>,
    },
    Attribute(&'input str),
    RelatedAttribute {
        relationship: &'input str,
        column: &'input str,
    },
    RelatedCount(&'input str),
    /// Contents between the quotes, still escaped
    StringLiteral(&'input str),
    NumberLiteral(&'input str),
}

impl<'input> Expression<'input> {
    pub fn binary(l: Expression<'input>, op: BinaryOp, r: Expression<'input>) -> Self {
        Expression::BinaryOperator(Box::new(l), op, Box::new(r))
    }

    pub fn parenthesized(inner: Expression<'input>) -> Self {
        Expression::Parenthesized(Box::new(inner))
    }
}

/// Undo the two escapes string literals support: `\"` and `\\`.
pub fn unescape(raw: &str) -> String {
    let mut res = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(next) = chars.next()
        {
            res.push(next);
        } else {
            res.push(c);
        }
    }
    res
}

/// Prints the tree back as expression text that parses to the same tree.
///  The alternate form (`{:#}`) also wraps every binary operator in
///  parentheses so the parsed structure is visible, e.g. `a + b * c` prints
///  as `(a + (b * c))`.
impl Display for Expression<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let alt = f.alternate();
        match self {
            Expression::Parenthesized(inner) if alt => write!(f, "({inner:#})"),
            Expression::Parenthesized(inner) => write!(f, "({inner})"),
            Expression::BinaryOperator(l, op, r) if alt => {
                write!(f, "({l:#} {} {r:#})", op.token())
            }
            Expression::BinaryOperator(l, op, r) => write!(f, "{l} {} {r}", op.token()),
            Expression::Null => write!(f, "null"),
            Expression::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                let mut first = true;
                for arg in args {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    if alt {
                        write!(f, "{arg:#}")?;
                    } else {
                        write!(f, "{arg}")?;
                    }
                }
                write!(f, ")")
            }
            Expression::Attribute(name) => write!(f, "{name}"),
            Expression::RelatedAttribute {
                relationship,
                column,
            } => write!(f, "{relationship}.{column}"),
            Expression::RelatedCount(relationship) => write!(f, "{relationship}.count"),
            Expression::StringLiteral(s) => write!(f, "\"{s}\""),
            Expression::NumberLiteral(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_quotes_and_backslashes() {
        assert_eq!(unescape(r#"a\"b"#), r#"a"b"#);
        assert_eq!(unescape(r"a\\b"), r"a\b");
        assert_eq!(unescape(r#"\\\""#), r#"\""#);
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn only_equality_is_rewritten() {
        assert_eq!(BinaryOp::Eq.sql(), "=");
        assert_eq!(BinaryOp::Ne.sql(), "!=");
        assert_eq!(BinaryOp::Le.sql(), "<=");
    }

    #[test]
    fn print_tree() {
        let expr = Expression::binary(
            Expression::Attribute("a"),
            BinaryOp::Add,
            Expression::binary(
                Expression::NumberLiteral("2"),
                BinaryOp::Mul,
                Expression::RelatedCount("items"),
            ),
        );
        assert_eq!(format!("{expr:#}"), "(a + (2 * items.count))");
        assert_eq!(expr.to_string(), "a + 2 * items.count");

        let grouped = Expression::binary(
            Expression::parenthesized(Expression::binary(
                Expression::Attribute("a"),
                BinaryOp::Sub,
                Expression::Attribute("b"),
            )),
            BinaryOp::Mul,
            Expression::parenthesized(Expression::Attribute("c")),
        );
        assert_eq!(grouped.to_string(), "(a - b) * (c)");
        assert_eq!(format!("{grouped:#}"), "(((a - b)) * (c))");

        let call = Expression::FunctionCall {
            name: "concat",
            args: vec![Expression::StringLiteral("x"), Expression::Null],
        };
        assert_eq!(call.to_string(), r#"concat("x", null)"#);
        assert_eq!(format!("{call:#}"), r#"concat("x", null)"#);
    }
}
