use crate::{
    ast::Expression,
    error::Result,
    evaluate::evaluate,
    scope::QueryScope,
};

/// Built-in functions callable from an expression. Names are matched
///  exactly; anything not listed here is rejected at evaluation time.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Concat,
}

impl TryFrom<&str> for Function {
    type Error = ();
    fn try_from(name: &str) -> std::result::Result<Self, Self::Error> {
        match name {
            "concat" => Ok(Function::Concat),
            _ => Err(()),
        }
    }
}

impl Function {
    pub fn call<S: QueryScope>(&self, args: &[Expression<'_>], scope: S) -> Result<(S, String)> {
        match self {
            Function::Concat => concat(args, scope),
        }
    }
}

// Arguments are evaluated left to right, each one seeing the joins added by
//  the ones before it.
fn concat<S: QueryScope>(args: &[Expression<'_>], mut scope: S) -> Result<(S, String)> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        let (next, sql) = evaluate(arg, scope)?;
        scope = next;
        parts.push(sql);
    }
    Ok((scope, parts.join(" || ")))
}
